#![cfg_attr(not(test), no_std)]

use core::fmt;

use spin::Mutex;

pub mod arch;
pub mod config;
pub mod console;
pub mod hardware;
pub mod kernel;
pub mod logger;
pub mod serial;
pub mod task;

pub use kernel::Kernel;

/// The one kernel context. Locked only with interrupts masked or from an
/// interrupt handler.
pub static KERNEL: Mutex<Kernel> = Mutex::new(Kernel::new());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Every process slot or queue node is taken.
    ResourceExhausted,
    /// The ready queue is empty, so not even the idle process can run.
    NoRunnableProcess,
    /// A context switch was requested before any process was started.
    NoCurrentProcess,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::ResourceExhausted => f.write_str("resource exhausted"),
            KernelError::NoRunnableProcess => f.write_str("no runnable process"),
            KernelError::NoCurrentProcess => f.write_str("no current process"),
        }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Brings up logging, the interrupt controller and the timer, and creates
/// the idle and keyboard echo processes. Interrupts stay masked; boot code
/// enables them by resuming the stack pointer from
/// [`arch::x86_64::lumen_start`].
#[cfg(target_arch = "x86_64")]
pub fn init(trampolines: arch::x86_64::Trampolines, timer_interval_ms: u32) -> KernelResult<()> {
    logger::init();

    let builtins = arch::x86_64::init(trampolines, timer_interval_ms)?;
    log::info!("kernel ready, idle is {}, echo is {}", builtins.idle, builtins.echo);
    crate::println!("lumen: {} ms time slice, type to echo", timer_interval_ms);

    Ok(())
}

#[cfg(target_arch = "x86_64")]
pub fn hlt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn errors_display() {
        assert_eq!(KernelError::ResourceExhausted.to_string(), "resource exhausted");
        assert_eq!(KernelError::NoRunnableProcess.to_string(), "no runnable process");
        assert_eq!(KernelError::NoCurrentProcess.to_string(), "no current process");
    }
}
