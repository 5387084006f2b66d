//! FIFO process queues threaded through a fixed node arena.

use super::process::ProcessId;
use crate::config::MAX_PROCESSES;
use crate::{KernelError, KernelResult};

pub const ARENA_CAPACITY: usize = MAX_PROCESSES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    /// `None` marks a free node.
    process: Option<ProcessId>,
    next: Option<usize>,
}

impl Node {
    const FREE: Node = Node {
        process: None,
        next: None,
    };
}

/// Backing store shared by every queue. A node is either free or linked
/// into exactly one queue.
pub struct NodeArena {
    nodes: [Node; ARENA_CAPACITY],
}

impl NodeArena {
    pub const fn new() -> Self {
        NodeArena {
            nodes: [Node::FREE; ARENA_CAPACITY],
        }
    }

    fn alloc(&mut self, process: ProcessId) -> Option<usize> {
        let index = self.nodes.iter().position(|node| node.process.is_none())?;
        self.nodes[index] = Node {
            process: Some(process),
            next: None,
        };
        Some(index)
    }

    fn release(&mut self, index: usize) {
        self.nodes[index] = Node::FREE;
    }

    pub fn free_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.process.is_none()).count()
    }

    pub const fn capacity(&self) -> usize {
        ARENA_CAPACITY
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Head and tail indices into a [`NodeArena`]. Both are `None` exactly when
/// the queue is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessQueue {
    head: Option<usize>,
    tail: Option<usize>,
}

impl ProcessQueue {
    pub const fn new() -> Self {
        ProcessQueue {
            head: None,
            tail: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Appends `process` at the tail. Fails only when the arena has no
    /// free node, in which case nothing changes.
    pub fn push(&mut self, arena: &mut NodeArena, process: ProcessId) -> KernelResult<()> {
        let index = arena.alloc(process).ok_or(KernelError::ResourceExhausted)?;

        match self.tail {
            Some(tail) => arena.nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);

        Ok(())
    }

    pub fn pop(&mut self, arena: &mut NodeArena) -> Option<ProcessId> {
        let index = self.head?;
        let node = arena.nodes[index];

        self.head = node.next;
        if self.head.is_none() {
            self.tail = None;
        }
        arena.release(index);

        node.process
    }

    pub fn iter<'a>(&self, arena: &'a NodeArena) -> Iter<'a> {
        Iter {
            arena,
            cursor: self.head,
        }
    }

    pub fn len(&self, arena: &NodeArena) -> usize {
        self.iter(arena).count()
    }

    pub fn contains(&self, arena: &NodeArena, process: ProcessId) -> bool {
        self.iter(arena).any(|queued| queued == process)
    }
}

pub struct Iter<'a> {
    arena: &'a NodeArena,
    cursor: Option<usize>,
}

impl Iterator for Iter<'_> {
    type Item = ProcessId;

    fn next(&mut self) -> Option<ProcessId> {
        let node = self.arena.nodes[self.cursor?];
        self.cursor = node.next;
        node.process
    }
}
