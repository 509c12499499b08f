//! Test identifier generator.

use std::collections::VecDeque;
use std::sync::Mutex;

use payflow_core::id::IdGenerator;
use uuid::Uuid;

/// An identifier generator that hands out a predetermined sequence. Panics if
/// the sequence is exhausted.
#[derive(Debug)]
pub struct SequenceIdGenerator {
    ids: Mutex<VecDeque<Uuid>>,
}

impl SequenceIdGenerator {
    /// Create a generator that returns `ids` in order.
    #[must_use]
    pub fn new(ids: Vec<Uuid>) -> Self {
        Self {
            ids: Mutex::new(ids.into()),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&self) -> Uuid {
        self.ids
            .lock()
            .unwrap()
            .pop_front()
            .expect("SequenceIdGenerator exhausted")
    }
}
