//! Process control blocks and the fixed pool they are handed out from.

use core::fmt;

use super::frame::{build_initial_frame, FrameTemplate, Stack, StackPointer};
use crate::config::MAX_PROCESSES;
use crate::{KernelError, KernelResult};

/// Identity of a process. Equal to the registry slot it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    pub const fn new(id: u32) -> Self {
        ProcessId(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Owns the CPU.
    Running,
    /// On the ready queue.
    Ready,
    /// Parked on the blocked queue until input arrives.
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessControlBlock {
    pub id: ProcessId,
    pub stack_pointer: StackPointer,
    pub state: ProcessState,
}

impl ProcessControlBlock {
    const UNUSED: ProcessControlBlock = ProcessControlBlock {
        id: ProcessId(0),
        stack_pointer: StackPointer::NULL,
        state: ProcessState::Ready,
    };
}

/// PCBs and stacks share one index, so a reservation either gets both or
/// neither. Slots are never returned.
pub struct ProcessTable {
    pcbs: [ProcessControlBlock; MAX_PROCESSES],
    stacks: [Stack; MAX_PROCESSES],
    count: usize,
    template: FrameTemplate,
}

impl ProcessTable {
    pub const fn new() -> Self {
        ProcessTable {
            pcbs: [ProcessControlBlock::UNUSED; MAX_PROCESSES],
            stacks: [Stack::EMPTY; MAX_PROCESSES],
            count: 0,
            template: FrameTemplate::DEFAULT,
        }
    }

    pub fn set_template(&mut self, template: FrameTemplate) {
        self.template = template;
    }

    pub fn template(&self) -> &FrameTemplate {
        &self.template
    }

    /// Reserves the next slot, builds its initial frame and records the PCB
    /// as ready. Queueing it is the caller's job.
    pub fn allocate(&mut self, entry: usize) -> KernelResult<ProcessId> {
        if self.count >= MAX_PROCESSES {
            return Err(KernelError::ResourceExhausted);
        }

        let slot = self.count;
        let id = ProcessId(slot as u32);
        let stack_pointer = build_initial_frame(&mut self.stacks[slot], entry, &self.template);

        self.pcbs[slot] = ProcessControlBlock {
            id,
            stack_pointer,
            state: ProcessState::Ready,
        };
        self.count += 1;

        Ok(id)
    }

    pub fn get(&self, id: ProcessId) -> Option<&ProcessControlBlock> {
        self.pcbs[..self.count].get(id.slot())
    }

    pub fn get_mut(&mut self, id: ProcessId) -> Option<&mut ProcessControlBlock> {
        self.pcbs[..self.count].get_mut(id.slot())
    }

    pub fn stack(&self, id: ProcessId) -> Option<&Stack> {
        self.stacks[..self.count].get(id.slot())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessControlBlock> {
        self.pcbs[..self.count].iter()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == MAX_PROCESSES
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
