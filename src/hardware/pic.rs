//! The chained 8259 pair.

use pic8259::ChainedPics;
use spin::Mutex;

use crate::config::{PIC_1_OFFSET, PIC_2_OFFSET};

/// Timer and keyboard only, every other line masked.
const PRIMARY_MASK: u8 = 0xFC;
const SECONDARY_MASK: u8 = 0xFF;

pub static PICS: Mutex<ChainedPics> = Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptIndex {
    Timer = PIC_1_OFFSET,
    Keyboard,
}

impl InterruptIndex {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

pub fn init() {
    let mut pics = PICS.lock();
    unsafe {
        pics.initialize();
        pics.write_masks(PRIMARY_MASK, SECONDARY_MASK);
    }
}

pub fn notify_end_of_interrupt(index: InterruptIndex) {
    unsafe {
        PICS.lock().notify_end_of_interrupt(index.as_u8());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_follow_the_remap() {
        assert_eq!(InterruptIndex::Timer.as_u8(), 32);
        assert_eq!(InterruptIndex::Keyboard.as_u8(), 33);
    }

    #[test]
    fn only_timer_and_keyboard_unmasked() {
        assert_eq!(!PRIMARY_MASK, 0b11);
        assert_eq!(SECONDARY_MASK, u8::MAX);
    }
}
