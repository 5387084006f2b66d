//! Ready/blocked FIFO scheduling and the current-process slot.
//!
//! None of these operations transfers control. Each one that picks a new
//! process returns that process's saved [`StackPointer`]; the trampoline
//! that called into the kernel resumes it after the kernel lock is
//! released.

use log::{trace, warn};

use super::frame::StackPointer;
use super::process::{ProcessId, ProcessState, ProcessTable};
use super::queue::{NodeArena, ProcessQueue};
use crate::{KernelError, KernelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Ready,
    Blocked,
}

pub struct Scheduler {
    arena: NodeArena,
    ready: ProcessQueue,
    blocked: ProcessQueue,
    current: Option<ProcessId>,
}

impl Scheduler {
    pub const fn new() -> Self {
        Scheduler {
            arena: NodeArena::new(),
            ready: ProcessQueue::new(),
            blocked: ProcessQueue::new(),
            current: None,
        }
    }

    fn queue_mut(&mut self, kind: QueueKind) -> (&mut ProcessQueue, &mut NodeArena) {
        match kind {
            QueueKind::Ready => (&mut self.ready, &mut self.arena),
            QueueKind::Blocked => (&mut self.blocked, &mut self.arena),
        }
    }

    fn queue(&self, kind: QueueKind) -> &ProcessQueue {
        match kind {
            QueueKind::Ready => &self.ready,
            QueueKind::Blocked => &self.blocked,
        }
    }

    /// Appends `process` to a queue. When the node arena is exhausted the
    /// process is dropped from scheduling; callers are not told.
    pub fn enqueue(&mut self, kind: QueueKind, process: ProcessId) {
        let (queue, arena) = self.queue_mut(kind);
        if queue.push(arena, process).is_err() {
            warn!("no free queue node, {} dropped from {:?} queue", process, kind);
        }
    }

    pub fn dequeue(&mut self, kind: QueueKind) -> Option<ProcessId> {
        let (queue, arena) = self.queue_mut(kind);
        queue.pop(arena)
    }

    pub fn current(&self) -> Option<ProcessId> {
        self.current
    }

    pub fn queued(&self, kind: QueueKind) -> impl Iterator<Item = ProcessId> + '_ {
        self.queue(kind).iter(&self.arena)
    }

    pub fn is_empty(&self, kind: QueueKind) -> bool {
        self.queue(kind).is_empty()
    }

    pub fn free_nodes(&self) -> usize {
        self.arena.free_count()
    }

    pub fn node_capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Puts a process on the ready queue and marks it ready.
    pub fn make_ready(&mut self, table: &mut ProcessTable, process: ProcessId) {
        if let Some(pcb) = table.get_mut(process) {
            pcb.state = ProcessState::Ready;
        }
        self.enqueue(QueueKind::Ready, process);
    }

    /// Takes the current process off the CPU, recording where it stopped.
    fn suspend_current(&mut self, table: &mut ProcessTable, saved: StackPointer, state: ProcessState) -> KernelResult<ProcessId> {
        let current = self.current.take().ok_or(KernelError::NoCurrentProcess)?;
        if let Some(pcb) = table.get_mut(current) {
            pcb.stack_pointer = saved;
            pcb.state = state;
        }
        Ok(current)
    }

    /// Timer path: the current process goes to the back of the ready queue
    /// and the head of the ready queue runs next.
    pub fn preempt(&mut self, table: &mut ProcessTable, saved: StackPointer) -> KernelResult<StackPointer> {
        let current = self.suspend_current(table, saved, ProcessState::Ready)?;
        self.enqueue(QueueKind::Ready, current);
        self.resume_next(table)
    }

    /// Makes the ready head current and returns the stack pointer to
    /// resume it from. An empty ready queue means the idle process is
    /// missing, which the caller must treat as fatal.
    pub fn resume_next(&mut self, table: &mut ProcessTable) -> KernelResult<StackPointer> {
        let next = self.dequeue(QueueKind::Ready).ok_or(KernelError::NoRunnableProcess)?;
        let pcb = table.get_mut(next).ok_or(KernelError::NoRunnableProcess)?;

        pcb.state = ProcessState::Running;
        self.current = Some(next);
        trace!("resuming {} at {}", next, pcb.stack_pointer);

        Ok(pcb.stack_pointer)
    }

    /// Consumer path: the current process is parked as an input waiter and
    /// is not put back on the ready queue. Only [`Scheduler::wake_one`]
    /// makes it runnable again.
    pub fn block_current_without_requeue(&mut self, table: &mut ProcessTable, saved: StackPointer) -> KernelResult<StackPointer> {
        let current = self.suspend_current(table, saved, ProcessState::Blocked)?;
        self.enqueue(QueueKind::Blocked, current);
        trace!("{} blocked on input", current);
        self.resume_next(table)
    }

    /// Moves the longest-waiting blocked process to the ready tail.
    pub fn wake_one(&mut self, table: &mut ProcessTable) -> Option<ProcessId> {
        let woken = self.dequeue(QueueKind::Blocked)?;
        self.make_ready(table, woken);
        trace!("{} woken", woken);
        Some(woken)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
