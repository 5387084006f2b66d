//! Compile-time kernel parameters.

use log::LevelFilter;

/// Upper bound on processes ever created. Slots are never reclaimed.
pub const MAX_PROCESSES: usize = 10;

/// Size of every process stack, in machine words.
pub const STACK_WORDS: usize = 1024;

/// Number of bytes the keyboard input buffer holds before dropping input.
pub const INPUT_BUFFER_CAPACITY: usize = 10;

/// Default timer period between preemptions.
pub const TIMER_INTERVAL_MS: u32 = 10;

/// Flags image of a fresh process: only the interrupt-enable bit.
pub const INITIAL_FLAGS: usize = 0x0200;

/// Code selector written into fresh frames until boot installs the live one.
pub const CODE_SELECTOR: usize = 0x10;

/// Value of the four data-segment slots in fresh frames.
pub const DATA_SELECTOR: usize = 0x08;

/// Vector base of the master 8259.
pub const PIC_1_OFFSET: u8 = 32;

/// Vector base of the slave 8259.
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

pub const LOG_LEVEL: LevelFilter = LevelFilter::Debug;
