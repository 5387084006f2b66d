//! Keyboard input ring.
//!
//! Empty is encoded by both indices being absent rather than by a count,
//! because `head == tail` alone means "exactly one byte queued".

use crate::config::INPUT_BUFFER_CAPACITY;

pub const CAPACITY: usize = INPUT_BUFFER_CAPACITY;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBuffer {
    slots: [u8; CAPACITY],
    head: Option<usize>,
    tail: Option<usize>,
}

impl InputBuffer {
    pub const fn new() -> Self {
        InputBuffer {
            slots: [0; CAPACITY],
            head: None,
            tail: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn is_full(&self) -> bool {
        match (self.head, self.tail) {
            (Some(head), Some(tail)) => head == tail + 1 || (head == 0 && tail == CAPACITY - 1),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        match (self.head, self.tail) {
            (Some(head), Some(tail)) if tail >= head => tail - head + 1,
            (Some(head), Some(tail)) => CAPACITY - head + tail + 1,
            _ => 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// Appends a byte. A full buffer drops it and returns `false`.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }

        let tail = self.tail.map_or(0, |tail| (tail + 1) % CAPACITY);
        self.slots[tail] = byte;
        self.tail = Some(tail);
        if self.head.is_none() {
            self.head = Some(tail);
        }

        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        let head = self.head?;
        let byte = self.slots[head];

        if Some(head) == self.tail {
            self.head = None;
            self.tail = None;
        } else {
            self.head = Some((head + 1) % CAPACITY);
        }

        Some(byte)
    }

    pub fn peek(&self) -> Option<u8> {
        self.head.map(|head| self.slots[head])
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}
