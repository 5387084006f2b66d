//! Kernel entry points for the assembly trampolines, and the [`Cpu`] they
//! provide to process code.
//!
//! Every hook returns the stack pointer the trampoline must resume. The
//! kernel lock is released before the hook returns, so no guard survives a
//! context switch.

use log::{debug, trace};
use spin::Once;
use x86_64::instructions::interrupts;
use x86_64::instructions::segmentation::{Segment, CS};

use super::Cpu;
use crate::console::Console;
use crate::hardware::{keyboard, pic, pit};
use crate::hardware::pic::InterruptIndex;
use crate::task::{FrameTemplate, StackPointer};
use crate::kernel::{self, BuiltinProcesses};
use crate::{KernelError, KernelResult, KERNEL};

/// Resumes the process returned by [`lumen_start`]; also the continuation
/// every entry function returns into.
pub type DispatchEntry = unsafe extern "C" fn() -> !;

/// Saves the caller's context, calls [`lumen_block`] and resumes whatever
/// it returns. Comes back once the caller is scheduled again.
pub type BlockTrampoline = unsafe extern "C" fn();

pub type ProcessEntry = extern "C" fn() -> !;

#[derive(Debug, Clone, Copy)]
pub struct Trampolines {
    pub dispatch: DispatchEntry,
    pub block: BlockTrampoline,
}

impl Trampolines {
    /// Fresh frames return into the dispatcher and run on the live code
    /// segment.
    pub fn frame_template(&self) -> FrameTemplate {
        FrameTemplate {
            code_selector: usize::from(CS::get_reg().0),
            ..FrameTemplate::with_continuation(self.dispatch as usize)
        }
    }
}

static TRAMPOLINES: Once<Trampolines> = Once::new();

/// Records the trampolines for process code. The first call wins.
pub fn install(trampolines: Trampolines) -> &'static Trampolines {
    TRAMPOLINES.call_once(|| trampolines)
}

pub struct X86Cpu {
    block: BlockTrampoline,
}

impl X86Cpu {
    pub const fn new(trampolines: &Trampolines) -> Self {
        X86Cpu {
            block: trampolines.block,
        }
    }

    pub fn installed() -> Option<Self> {
        TRAMPOLINES.get().map(X86Cpu::new)
    }
}

impl Cpu for X86Cpu {
    fn disable_interrupts(&self) {
        interrupts::disable();
    }

    fn enable_interrupts(&self) {
        interrupts::enable();
    }

    fn block(&self) {
        unsafe { (self.block)() }
    }
}

/// Boot-time setup once the trampolines are known: frame template, PIC,
/// PIT, then the idle and echo processes. Interrupts stay masked.
pub fn init(trampolines: Trampolines, timer_interval_ms: u32) -> KernelResult<BuiltinProcesses> {
    let template = install(trampolines).frame_template();
    debug!("frame template {:?}", template);

    interrupts::without_interrupts(|| KERNEL.lock().set_frame_template(template));

    pic::init();
    let divisor = pit::init(timer_interval_ms);
    debug!("PIT divisor {} for {} ms", divisor, timer_interval_ms);

    let idle_entry = idle as ProcessEntry as usize;
    let echo_entry = echo as ProcessEntry as usize;
    interrupts::without_interrupts(|| KERNEL.lock().create_builtin_processes(idle_entry, echo_entry))
}

#[no_mangle]
pub extern "C" fn lumen_start() -> StackPointer {
    let first = KERNEL.lock().start();
    match first {
        Ok(sp) => sp,
        Err(error) => panic!("cannot start scheduling: {}", error),
    }
}

/// Timer interrupt. Before the first process is started the interrupted
/// context is resumed unchanged.
#[no_mangle]
pub extern "C" fn lumen_preempt(saved: StackPointer) -> StackPointer {
    let next = KERNEL.lock().preempt(saved);
    let next = match next {
        Ok(sp) => sp,
        Err(KernelError::NoCurrentProcess) => saved,
        Err(error) => panic!("timer preemption failed: {}", error),
    };

    pic::notify_end_of_interrupt(InterruptIndex::Timer);
    next
}

#[no_mangle]
pub extern "C" fn lumen_block(saved: StackPointer) -> StackPointer {
    let next = KERNEL.lock().block_current_without_requeue(saved);
    match next {
        Ok(sp) => sp,
        Err(error) => panic!("cannot block: {}", error),
    }
}

#[no_mangle]
pub extern "C" fn lumen_keyboard() {
    let scancode = keyboard::read_scancode();
    if !KERNEL.lock().handle_scancode(scancode) {
        trace!("scancode {:#04x} queued nothing", scancode);
    }
    pic::notify_end_of_interrupt(InterruptIndex::Keyboard);
}

/// Always runnable, so the ready queue is never empty.
pub extern "C" fn idle() -> ! {
    interrupts::enable();
    crate::hlt_loop();
}

/// Echoes keyboard input to the screen forever.
pub extern "C" fn echo() -> ! {
    let Some(cpu) = X86Cpu::installed() else {
        crate::hlt_loop();
    };
    let mut console = Console;
    console.mark_input_start();
    kernel::echo_input(&KERNEL, &cpu, &mut console)
}
