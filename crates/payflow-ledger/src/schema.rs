//! SQL statements used by the ledger store.
//!
//! The tables themselves are created by the files under `migrations/`.

/// Name of the unique constraint on `(user_id, idempotency_key)`.
pub const IDEMPOTENCY_CONSTRAINT: &str = "payments_user_idempotency_key";

pub(crate) const INSERT_PAYMENT: &str = r"
INSERT INTO payments (
    payment_id, external_order_id, user_id, idempotency_key,
    amount, currency, status, created_at, updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
RETURNING id, payment_id, external_order_id, user_id, idempotency_key,
          amount, currency, status, created_at, updated_at
";

pub(crate) const INSERT_OUTBOX: &str = r"
INSERT INTO outbox (
    aggregate_id, aggregate_type, event_type, payload, status, created_at, updated_at
)
VALUES ($1, $2, $3, $4, 'PENDING', $5, $5)
";

pub(crate) const SELECT_PAYMENT_BY_IDEMPOTENCY_KEY: &str = r"
SELECT id, payment_id, external_order_id, user_id, idempotency_key,
       amount, currency, status, created_at, updated_at
FROM payments
WHERE user_id = $1 AND idempotency_key = $2
";

pub(crate) const SELECT_PAYMENT_BY_PAYMENT_ID: &str = r"
SELECT id, payment_id, external_order_id, user_id, idempotency_key,
       amount, currency, status, created_at, updated_at
FROM payments
WHERE payment_id = $1
";

pub(crate) const CLAIM_PENDING: &str = r"
SELECT id, aggregate_id, aggregate_type, event_type, payload, status,
       attempts, last_error, created_at, updated_at
FROM outbox
WHERE status = 'PENDING'
ORDER BY created_at, id
LIMIT $1
FOR UPDATE SKIP LOCKED
";

pub(crate) const MARK_PUBLISHED: &str = r"
UPDATE outbox
SET status = 'PUBLISHED', updated_at = $2
WHERE id = $1 AND status = 'PENDING'
";

pub(crate) const MARK_RETRY: &str = r"
UPDATE outbox
SET attempts = attempts + 1, last_error = $2, updated_at = $3
WHERE id = $1 AND status = 'PENDING'
";

pub(crate) const MARK_FAILED: &str = r"
UPDATE outbox
SET status = 'FAILED', attempts = attempts + 1, last_error = $2, updated_at = $3
WHERE id = $1 AND status = 'PENDING'
";
