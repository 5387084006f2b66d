use x86_64::instructions::port::Port;

const DATA_PORT: u16 = 0x60;

/// Reads the pending scancode. Must be called once per keyboard interrupt.
pub fn read_scancode() -> u8 {
    let mut port = Port::<u8>::new(DATA_PORT);
    unsafe { port.read() }
}
