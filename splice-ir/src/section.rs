//! Named containers of byte intervals.

use crate::ids::ByteIntervalId;

/// A named container of [`ByteInterval`](crate::ByteInterval)s, e.g.
/// `.text` or `.data`.
#[derive(Clone, Debug)]
pub struct Section {
    name: String,
    byte_intervals: Vec<ByteIntervalId>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            byte_intervals: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn byte_intervals(&self) -> &[ByteIntervalId] {
        &self.byte_intervals
    }

    pub fn add_byte_interval(&mut self, id: ByteIntervalId) {
        self.byte_intervals.push(id);
    }
}
