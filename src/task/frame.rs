//! Initial stack image for a process that has never run.
//!
//! The resume primitive pops, from the stack pointer upwards: four data
//! segment slots, eight general purpose registers, then returns through the
//! entry point / code selector / flags triple. The word above the flags is
//! the return address of the entry function, which is the dispatch loop.
//! A frame built here is indistinguishable from one saved by the preempt
//! trampoline, so the same resume path starts new processes and continues
//! interrupted ones.

use core::fmt;
use core::mem::size_of;

use crate::config::{CODE_SELECTOR, DATA_SELECTOR, INITIAL_FLAGS, STACK_WORDS};

pub const GENERAL_REGISTERS: usize = 8;
pub const SEGMENT_REGISTERS: usize = 4;

/// Words occupied by a freshly built frame.
pub const FRAME_WORDS: usize = SEGMENT_REGISTERS + GENERAL_REGISTERS + 4;

const WORD_BYTES: usize = size_of::<usize>();

/// Saved-context handle: the address of the lowest occupied stack word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct StackPointer(usize);

impl StackPointer {
    pub const NULL: StackPointer = StackPointer(0);

    pub const fn new(address: usize) -> Self {
        StackPointer(address)
    }

    pub const fn address(self) -> usize {
        self.0
    }
}

impl fmt::Display for StackPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A private process stack.
#[repr(C, align(16))]
pub struct Stack {
    words: [usize; STACK_WORDS],
}

impl Stack {
    pub const EMPTY: Stack = Stack { words: [0; STACK_WORDS] };

    pub fn words(&self) -> &[usize] {
        &self.words
    }

    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    /// One past the highest word; nothing is ever stored here.
    pub fn top(&self) -> StackPointer {
        StackPointer(self.base() + STACK_WORDS * WORD_BYTES)
    }

    pub fn contains(&self, sp: StackPointer) -> bool {
        sp.0 >= self.base() && sp.0 < self.top().0
    }

    /// Word index of `sp` within this stack.
    pub fn index_of(&self, sp: StackPointer) -> Option<usize> {
        if !self.contains(sp) || (sp.0 - self.base()) % WORD_BYTES != 0 {
            return None;
        }
        Some((sp.0 - self.base()) / WORD_BYTES)
    }
}

/// Values that are the same for every fresh frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTemplate {
    /// Where the entry function returns to: the dispatch loop.
    pub continuation: usize,
    pub flags: usize,
    pub code_selector: usize,
    pub data_selector: usize,
}

impl FrameTemplate {
    pub const DEFAULT: FrameTemplate = FrameTemplate {
        continuation: 0,
        flags: INITIAL_FLAGS,
        code_selector: CODE_SELECTOR,
        data_selector: DATA_SELECTOR,
    };

    pub const fn with_continuation(continuation: usize) -> Self {
        FrameTemplate {
            continuation,
            ..Self::DEFAULT
        }
    }
}

impl Default for FrameTemplate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The frame as it sits in memory, lowest address first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ContextFrame {
    pub segments: [usize; SEGMENT_REGISTERS],
    pub registers: [usize; GENERAL_REGISTERS],
    pub entry: usize,
    pub code_selector: usize,
    pub flags: usize,
    pub continuation: usize,
}

impl ContextFrame {
    /// Decodes the frame that `sp` points at.
    pub fn read(stack: &Stack, sp: StackPointer) -> Option<ContextFrame> {
        let start = stack.index_of(sp)?;
        let words = stack.words.get(start..start + FRAME_WORDS)?;

        let mut segments = [0; SEGMENT_REGISTERS];
        segments.copy_from_slice(&words[..SEGMENT_REGISTERS]);
        let mut registers = [0; GENERAL_REGISTERS];
        registers.copy_from_slice(&words[SEGMENT_REGISTERS..SEGMENT_REGISTERS + GENERAL_REGISTERS]);

        let rest = &words[SEGMENT_REGISTERS + GENERAL_REGISTERS..];
        Some(ContextFrame {
            segments,
            registers,
            entry: rest[0],
            code_selector: rest[1],
            flags: rest[2],
            continuation: rest[3],
        })
    }
}

/// Downward-growing write cursor over a stack.
struct Pusher<'a> {
    stack: &'a mut Stack,
    next: usize,
}

impl<'a> Pusher<'a> {
    fn new(stack: &'a mut Stack) -> Self {
        Pusher {
            stack,
            next: STACK_WORDS,
        }
    }

    fn push(&mut self, value: usize) {
        self.next -= 1;
        self.stack.words[self.next] = value;
    }

    fn stack_pointer(&self) -> StackPointer {
        StackPointer(self.stack.base() + self.next * WORD_BYTES)
    }
}

/// Writes the initial frame for `entry` at the top of `stack` and returns
/// the resulting stack pointer. The push order is the resume ABI.
pub fn build_initial_frame(stack: &mut Stack, entry: usize, template: &FrameTemplate) -> StackPointer {
    let mut pusher = Pusher::new(stack);

    pusher.push(template.continuation);
    pusher.push(template.flags);
    pusher.push(template.code_selector);
    pusher.push(entry);
    for _ in 0..GENERAL_REGISTERS {
        pusher.push(0);
    }
    for _ in 0..SEGMENT_REGISTERS {
        pusher.push(template.data_selector);
    }

    pusher.stack_pointer()
}
