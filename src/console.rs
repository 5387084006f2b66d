//! VGA text mode output.
//!
//! The writer fills the screen top down and scrolls once the last row is
//! used. It remembers where each row ended so that backspace at column
//! zero can continue on the previous line, but never above the row the
//! keyboard input started on.

use core::fmt;

use volatile::Volatile;

use crate::task::keyboard::BACKSPACE;

/// Destination for echoed keyboard input.
pub trait TextSink {
    fn write_byte(&mut self, byte: u8);

    fn new_line(&mut self);

    fn backspace(&mut self);

    fn tab(&mut self);

    /// Routes one input byte to the matching operation.
    fn feed(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            BACKSPACE => self.backspace(),
            b'\t' => self.tab(),
            byte => self.write_byte(byte),
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ColorCode(u8);

impl ColorCode {
    pub const fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode((background as u8) << 4 | (foreground as u8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ScreenChar {
    pub ascii_character: u8,
    pub color_code: ColorCode,
}

pub const BUFFER_HEIGHT: usize = 25;
pub const BUFFER_WIDTH: usize = 80;
pub const TAB_SIZE: usize = 4;

const VGA_BUFFER: usize = 0xb8000;

#[repr(transparent)]
pub struct Buffer {
    chars: [[Volatile<ScreenChar>; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

impl Buffer {
    /// An all-zero buffer outside video memory.
    pub fn blank() -> Self {
        let blank = ScreenChar {
            ascii_character: 0,
            color_code: ColorCode(0),
        };
        Buffer {
            chars: core::array::from_fn(|_| core::array::from_fn(|_| Volatile::new(blank))),
        }
    }

    pub fn char_at(&self, row: usize, column: usize) -> ScreenChar {
        self.chars[row][column].read()
    }
}

pub struct Writer<'a> {
    row: usize,
    column: usize,
    /// Column each finished row ended at.
    row_tails: [usize; BUFFER_HEIGHT],
    start_row: usize,
    color_code: ColorCode,
    buffer: &'a mut Buffer,
}

impl<'a> Writer<'a> {
    pub fn new(buffer: &'a mut Buffer, color_code: ColorCode) -> Self {
        let mut writer = Writer {
            row: 0,
            column: 0,
            row_tails: [BUFFER_WIDTH; BUFFER_HEIGHT],
            start_row: 0,
            color_code,
            buffer,
        };
        writer.clear_screen();
        writer
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row, self.column)
    }

    pub fn buffer(&self) -> &Buffer {
        self.buffer
    }

    /// Backspace will not move above the current row from now on.
    pub fn mark_input_start(&mut self) {
        self.start_row = self.row;
    }

    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            match byte {
                0x20..=0x7e => self.write_byte(byte),
                b'\n' => self.new_line(),
                _ => self.write_byte(0xfe),
            }
        }
    }

    fn put(&mut self, byte: u8) {
        let color_code = self.color_code;
        self.buffer.chars[self.row][self.column].write(ScreenChar {
            ascii_character: byte,
            color_code,
        });
    }

    fn scroll(&mut self) {
        for row in 1..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                let character = self.buffer.chars[row][col].read();
                self.buffer.chars[row - 1][col].write(character);
            }
        }
        self.row_tails.copy_within(1.., 0);
        self.row_tails[BUFFER_HEIGHT - 1] = BUFFER_WIDTH;

        self.clear_row(BUFFER_HEIGHT - 1);
        self.start_row = self.start_row.saturating_sub(1);
    }

    fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: self.color_code,
        };
        for col in 0..BUFFER_WIDTH {
            self.buffer.chars[row][col].write(blank);
        }
    }

    pub fn clear_screen(&mut self) {
        for row in 0..BUFFER_HEIGHT {
            self.clear_row(row);
        }
        self.row_tails = [BUFFER_WIDTH; BUFFER_HEIGHT];
        self.row = 0;
        self.column = 0;
        self.start_row = 0;
    }
}

impl TextSink for Writer<'_> {
    fn write_byte(&mut self, byte: u8) {
        if self.column >= BUFFER_WIDTH {
            self.new_line();
        }
        self.put(byte);
        self.column += 1;
    }

    fn new_line(&mut self) {
        self.row_tails[self.row] = self.column;
        self.column = 0;
        if self.row + 1 < BUFFER_HEIGHT {
            self.row += 1;
        } else {
            self.scroll();
        }
    }

    fn backspace(&mut self) {
        if self.column == 0 {
            if self.row <= self.start_row {
                return;
            }
            self.row -= 1;
            self.column = self.row_tails[self.row];
            self.row_tails[self.row] = BUFFER_WIDTH;
            return;
        }

        self.column -= 1;
        self.put(b' ');
    }

    fn tab(&mut self) {
        if BUFFER_WIDTH - 1 - self.column.min(BUFFER_WIDTH - 1) <= TAB_SIZE {
            self.new_line();
            return;
        }
        for _ in 0..TAB_SIZE {
            self.write_byte(b' ');
        }
    }
}

impl fmt::Write for Writer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}

#[cfg(target_arch = "x86_64")]
pub use global::{Console, WRITER};

#[cfg(target_arch = "x86_64")]
mod global {
    use lazy_static::lazy_static;
    use spin::Mutex;
    use x86_64::instructions::interrupts;

    use super::{Buffer, Color, ColorCode, TextSink, Writer, VGA_BUFFER};

    lazy_static! {
        pub static ref WRITER: Mutex<Writer<'static>> = Mutex::new(Writer::new(
            unsafe { &mut *(VGA_BUFFER as *mut Buffer) },
            ColorCode::new(Color::LightGray, Color::Black),
        ));
    }

    /// The global writer as a [`TextSink`]. The writer lock is taken per
    /// call with interrupts masked, never across a blocking read.
    pub struct Console;

    impl Console {
        fn with<R>(f: impl FnOnce(&mut Writer<'static>) -> R) -> R {
            interrupts::without_interrupts(|| f(&mut *WRITER.lock()))
        }

        pub fn mark_input_start(&mut self) {
            Self::with(|writer| writer.mark_input_start());
        }
    }

    impl TextSink for Console {
        fn write_byte(&mut self, byte: u8) {
            Self::with(|writer| writer.write_byte(byte));
        }

        fn new_line(&mut self) {
            Self::with(|writer| writer.new_line());
        }

        fn backspace(&mut self) {
            Self::with(|writer| writer.backspace());
        }

        fn tab(&mut self) {
            Self::with(|writer| writer.tab());
        }
    }
}

// ----------------------------------------------------------------------------------------
// Macros

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::console::_print(format_args!($($arg)*)));
}

#[cfg(target_arch = "x86_64")]
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    use x86_64::instructions::interrupts;

    interrupts::without_interrupts(|| {
        let _ = WRITER.lock().write_fmt(args);
    });
}

// ----------------------------------------------------------------------------------------
// Tests
