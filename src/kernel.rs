//! The kernel context: every piece of process-wide state in one place.
//!
//! Interrupt handlers reach it through [`crate::KERNEL`]; process-side code
//! only locks it with interrupts masked, so the lock never spins on this
//! single core.

use log::{debug, trace};
use spin::Mutex;

use crate::arch::Cpu;
use crate::console::TextSink;
use crate::task::{
    FrameTemplate, InputBuffer, Modifiers, ProcessId, ProcessTable, QueueKind, ScancodeTranslator,
    Scheduler, StackPointer,
};
use crate::KernelResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinProcesses {
    pub idle: ProcessId,
    pub echo: ProcessId,
}

pub struct Kernel {
    processes: ProcessTable,
    scheduler: Scheduler,
    input: InputBuffer,
    keyboard: ScancodeTranslator,
}

impl Kernel {
    pub const fn new() -> Self {
        Kernel {
            processes: ProcessTable::new(),
            scheduler: Scheduler::new(),
            input: InputBuffer::new(),
            keyboard: ScancodeTranslator::new(),
        }
    }

    /// Installs the continuation and selectors used for processes created
    /// from now on.
    pub fn set_frame_template(&mut self, template: FrameTemplate) {
        self.processes.set_template(template);
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    pub fn modifiers(&self) -> Modifiers {
        self.keyboard.modifiers()
    }

    pub fn current(&self) -> Option<ProcessId> {
        self.scheduler.current()
    }

    /// Creates a process that starts at `entry` and queues it as ready.
    /// Fails with [`KernelError::ResourceExhausted`](crate::KernelError)
    /// once every slot is taken, leaving all state untouched.
    pub fn create_process(&mut self, entry: usize) -> KernelResult<ProcessId> {
        let id = self.processes.allocate(entry)?;
        self.scheduler.enqueue(QueueKind::Ready, id);
        debug!("created {} with entry {:#x}", id, entry);
        Ok(id)
    }

    /// Creates the idle process and then the keyboard echo process, so the
    /// idle process is always the first one scheduled.
    pub fn create_builtin_processes(&mut self, idle_entry: usize, echo_entry: usize) -> KernelResult<BuiltinProcesses> {
        let idle = self.create_process(idle_entry)?;
        let echo = self.create_process(echo_entry)?;
        Ok(BuiltinProcesses { idle, echo })
    }

    /// Picks the first process to run.
    pub fn start(&mut self) -> KernelResult<StackPointer> {
        self.scheduler.resume_next(&mut self.processes)
    }

    pub fn preempt(&mut self, saved: StackPointer) -> KernelResult<StackPointer> {
        self.scheduler.preempt(&mut self.processes, saved)
    }

    pub fn block_current_without_requeue(&mut self, saved: StackPointer) -> KernelResult<StackPointer> {
        self.scheduler.block_current_without_requeue(&mut self.processes, saved)
    }

    /// Producer side, interrupt context only. A full buffer drops the byte.
    /// Each accepted byte wakes at most one waiter.
    pub fn enqueue_char(&mut self, byte: u8) -> bool {
        if !self.input.push(byte) {
            trace!("input buffer full, dropped {:#04x}", byte);
            return false;
        }
        self.scheduler.wake_one(&mut self.processes);
        true
    }

    /// Consumer side without blocking. Callers must have interrupts masked.
    pub fn try_dequeue_char(&mut self) -> Option<u8> {
        self.input.pop()
    }

    /// Keyboard interrupt path: translate, then hand any character to the
    /// producer. Returns whether a byte was queued.
    pub fn handle_scancode(&mut self, scancode: u8) -> bool {
        match self.keyboard.translate(scancode) {
            Some(byte) => self.enqueue_char(byte),
            None => false,
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking read of one input byte, process context only.
///
/// Interrupts are masked before the emptiness check so a keystroke cannot
/// slip in between "buffer is empty" and "park this process". Emptiness is
/// checked again after every wake-up.
pub fn dequeue_char<C: Cpu>(kernel: &Mutex<Kernel>, cpu: &C) -> u8 {
    cpu.disable_interrupts();
    loop {
        let next = kernel.lock().try_dequeue_char();
        if let Some(byte) = next {
            cpu.enable_interrupts();
            return byte;
        }
        cpu.block();
    }
}

/// Reads one byte and renders it. Returns the byte.
pub fn echo_next<C: Cpu, S: TextSink>(kernel: &Mutex<Kernel>, cpu: &C, sink: &mut S) -> u8 {
    let byte = dequeue_char(kernel, cpu);
    sink.feed(byte);
    byte
}

/// Body of the keyboard echo process.
pub fn echo_input<C: Cpu, S: TextSink>(kernel: &Mutex<Kernel>, cpu: &C, sink: &mut S) -> ! {
    loop {
        echo_next(kernel, cpu, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_PROCESSES;
    use crate::task::keyboard::BACKSPACE;
    use crate::task::{ContextFrame, ProcessState, StackPointer};
    use crate::KernelError;
    use std::boxed::Box;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::vec::Vec;

    fn ids(iter: impl Iterator<Item = ProcessId>) -> Vec<u32> {
        iter.map(ProcessId::as_u32).collect()
    }

    fn booted(processes: usize) -> Box<Kernel> {
        let mut kernel = Box::new(Kernel::new());
        for n in 0..processes {
            kernel.create_process(0x1000 * (n + 1)).unwrap();
        }
        kernel.start().unwrap();
        kernel
    }

    #[test]
    fn created_processes_queue_in_order() {
        let mut kernel = Box::new(Kernel::new());
        for _ in 0..3 {
            kernel.create_process(0x4000).unwrap();
        }
        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Ready)), [0, 1, 2]);
        assert_eq!(kernel.current(), None);
    }

    #[test]
    fn builtin_processes_come_first_idle_then_echo() {
        let mut kernel = Box::new(Kernel::new());
        let builtins = kernel.create_builtin_processes(0x1000, 0x2000).unwrap();

        assert_eq!(builtins, BuiltinProcesses { idle: ProcessId::new(0), echo: ProcessId::new(1) });
        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Ready)), [0, 1]);

        let entry = |id| {
            let pcb = kernel.processes().get(id).unwrap();
            ContextFrame::read(kernel.processes().stack(id).unwrap(), pcb.stack_pointer).unwrap().entry
        };
        assert_eq!(entry(builtins.idle), 0x1000);
        assert_eq!(entry(builtins.echo), 0x2000);
    }

    #[test]
    fn exhausted_registry_leaves_everything_unchanged() {
        let mut kernel = Box::new(Kernel::new());
        for _ in 0..MAX_PROCESSES {
            kernel.create_process(0x4000).unwrap();
        }
        let ready_before = ids(kernel.scheduler().queued(QueueKind::Ready));
        let free_before = kernel.scheduler().free_nodes();

        assert_eq!(kernel.create_process(0x5000), Err(KernelError::ResourceExhausted));

        assert_eq!(kernel.processes().len(), MAX_PROCESSES);
        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Ready)), ready_before);
        assert_eq!(kernel.scheduler().free_nodes(), free_before);
    }

    #[test]
    fn start_without_processes_fails() {
        let mut kernel = Box::new(Kernel::new());
        assert_eq!(kernel.start(), Err(KernelError::NoRunnableProcess));
    }

    #[test]
    fn one_character_wakes_exactly_one_waiter() {
        // idle, p1, p2
        let mut kernel = booted(3);
        kernel.preempt(StackPointer::new(0x10)).unwrap();
        assert_eq!(kernel.current(), Some(ProcessId::new(1)));

        kernel.block_current_without_requeue(StackPointer::new(0x11)).unwrap();
        assert_eq!(kernel.current(), Some(ProcessId::new(2)));
        kernel.block_current_without_requeue(StackPointer::new(0x12)).unwrap();
        assert_eq!(kernel.current(), Some(ProcessId::new(0)));

        assert!(kernel.enqueue_char(b'k'));

        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Ready)), [1]);
        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Blocked)), [2]);
        assert_eq!(kernel.processes().get(ProcessId::new(2)).unwrap().state, ProcessState::Blocked);
    }

    #[test]
    fn n_characters_wake_at_most_n_waiters() {
        let mut kernel = booted(4);
        kernel.preempt(StackPointer::new(1)).unwrap();
        kernel.block_current_without_requeue(StackPointer::new(1)).unwrap();
        kernel.block_current_without_requeue(StackPointer::new(2)).unwrap();
        kernel.block_current_without_requeue(StackPointer::new(3)).unwrap();
        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Blocked)), [1, 2, 3]);

        kernel.enqueue_char(b'x');
        kernel.enqueue_char(b'y');

        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Ready)), [1, 2]);
        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Blocked)), [3]);
    }

    #[test]
    fn dropped_character_wakes_nobody() {
        let mut kernel = booted(2);
        for byte in b"0123456789" {
            assert!(kernel.enqueue_char(*byte));
        }
        kernel.preempt(StackPointer::new(1)).unwrap();
        kernel.block_current_without_requeue(StackPointer::new(2)).unwrap();

        assert!(!kernel.enqueue_char(b'!'));
        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Blocked)), [1]);
        assert_eq!(kernel.input().len(), 10);
    }

    #[test]
    fn scancodes_flow_into_the_buffer() {
        let mut kernel = booted(1);
        let scancodes = [0x2a, 0x23, 0xaa, 0x12, 0x26, 0x26, 0x18, 0x9e];
        let queued = scancodes.iter().filter(|&&code| kernel.handle_scancode(code)).count();

        assert_eq!(queued, 5);
        let text: Vec<u8> = core::iter::from_fn(|| kernel.try_dequeue_char()).collect();
        assert_eq!(text, b"Hello");
        assert_eq!(kernel.modifiers(), Modifiers::default());
    }

    #[test]
    fn modifier_scancodes_touch_neither_buffer_nor_queues() {
        let mut kernel = booted(2);
        kernel.preempt(StackPointer::new(1)).unwrap();
        kernel.block_current_without_requeue(StackPointer::new(2)).unwrap();

        assert!(!kernel.handle_scancode(0x3a));
        assert!(!kernel.handle_scancode(0x2a));
        assert!(!kernel.handle_scancode(0x9e));

        assert!(kernel.input().is_empty());
        assert_eq!(ids(kernel.scheduler().queued(QueueKind::Blocked)), [1]);
        assert_eq!(kernel.modifiers(), Modifiers { shift: true, caps_lock: true });
    }

    /// Stands in for the CPU while the consumer blocks: parks it, delivers
    /// the next scripted keystroke from "interrupt context", then ticks the
    /// timer until the consumer is scheduled again.
    struct ScriptedCpu<'a> {
        kernel: &'a Mutex<Kernel>,
        keystrokes: RefCell<VecDeque<u8>>,
        /// Another reader takes the first delivered byte before the consumer runs.
        steal_first: Cell<bool>,
        masked: Cell<bool>,
        blocks: Cell<usize>,
    }

    impl<'a> ScriptedCpu<'a> {
        fn new(kernel: &'a Mutex<Kernel>, keystrokes: &[u8]) -> Self {
            ScriptedCpu {
                kernel,
                keystrokes: RefCell::new(keystrokes.iter().copied().collect()),
                steal_first: Cell::new(false),
                masked: Cell::new(false),
                blocks: Cell::new(0),
            }
        }
    }

    impl Cpu for ScriptedCpu<'_> {
        fn disable_interrupts(&self) {
            self.masked.set(true);
        }

        fn enable_interrupts(&self) {
            self.masked.set(false);
        }

        fn block(&self) {
            assert!(self.masked.get(), "blocked with interrupts enabled");
            self.blocks.set(self.blocks.get() + 1);

            let mut kernel = self.kernel.lock();
            let consumer = kernel.current().unwrap();
            kernel.block_current_without_requeue(StackPointer::new(0xc000)).unwrap();
            assert!(kernel.scheduler().queued(QueueKind::Blocked).any(|id| id == consumer));

            if let Some(byte) = self.keystrokes.borrow_mut().pop_front() {
                kernel.enqueue_char(byte);
                if self.steal_first.replace(false) {
                    kernel.try_dequeue_char();
                }
            }

            for _ in 0..MAX_PROCESSES * 2 {
                if kernel.current() == Some(consumer) {
                    return;
                }
                kernel.preempt(StackPointer::new(0xd000)).unwrap();
            }
            panic!("consumer was never rescheduled");
        }
    }

    fn consumer_running() -> Mutex<Kernel> {
        let kernel = Mutex::new(Kernel::new());
        {
            let mut guard = kernel.lock();
            guard.create_process(0x1000).unwrap();
            guard.create_process(0x2000).unwrap();
            guard.start().unwrap();
            guard.preempt(StackPointer::new(0x10)).unwrap();
            assert_eq!(guard.current(), Some(ProcessId::new(1)));
        }
        kernel
    }

    #[test]
    fn dequeue_returns_buffered_input_without_blocking() {
        let kernel = consumer_running();
        kernel.lock().enqueue_char(b'z');
        let cpu = ScriptedCpu::new(&kernel, &[]);

        assert_eq!(dequeue_char(&kernel, &cpu), b'z');
        assert_eq!(cpu.blocks.get(), 0);
        assert!(!cpu.masked.get());
    }

    #[test]
    fn dequeue_blocks_until_a_keystroke_arrives() {
        let kernel = consumer_running();
        let cpu = ScriptedCpu::new(&kernel, b"q");

        assert_eq!(dequeue_char(&kernel, &cpu), b'q');
        assert_eq!(cpu.blocks.get(), 1);
        assert!(!cpu.masked.get());
        assert!(kernel.lock().input().is_empty());
    }

    #[test]
    fn dequeue_blocks_again_if_woken_to_an_empty_buffer() {
        let kernel = consumer_running();
        let cpu = ScriptedCpu::new(&kernel, b"ab");
        cpu.steal_first.set(true);

        assert_eq!(dequeue_char(&kernel, &cpu), b'b');
        assert_eq!(cpu.blocks.get(), 2);
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<&'static str>,
        printed: Vec<u8>,
    }

    impl TextSink for Recorder {
        fn write_byte(&mut self, byte: u8) {
            self.printed.push(byte);
            self.events.push("byte");
        }

        fn new_line(&mut self) {
            self.events.push("newline");
        }

        fn backspace(&mut self) {
            self.events.push("backspace");
        }

        fn tab(&mut self) {
            self.events.push("tab");
        }
    }

    #[test]
    fn echo_routes_control_bytes_to_the_sink() {
        let kernel = consumer_running();
        {
            let mut guard = kernel.lock();
            for byte in [b'h', b'\n', BACKSPACE, b'\t'] {
                guard.enqueue_char(byte);
            }
        }
        let cpu = ScriptedCpu::new(&kernel, &[]);
        let mut sink = Recorder::default();

        for _ in 0..4 {
            echo_next(&kernel, &cpu, &mut sink);
        }

        assert_eq!(sink.events, ["byte", "newline", "backspace", "tab"]);
        assert_eq!(sink.printed, b"h");
    }
}
