//! The narrow boundary between the kernel core and the machine.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

/// What the process-side kernel code needs from the CPU.
///
/// Interrupt masking is the only mutual exclusion the kernel uses: one core,
/// and interrupt handlers never block.
pub trait Cpu {
    fn disable_interrupts(&self);

    fn enable_interrupts(&self);

    /// Saves the calling process's context and enters
    /// [`Kernel::block_current_without_requeue`](crate::Kernel::block_current_without_requeue).
    /// Returns when the process has been woken and scheduled again, with
    /// interrupts still masked.
    fn block(&self);
}
