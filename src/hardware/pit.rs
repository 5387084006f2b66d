use x86_64::instructions::port::Port;

pub const PIT_FREQUENCY: u64 = 1_193_182;
const PIT_COMMAND_PORT: u16 = 0x43;
const PIT_CHANNEL_0_PORT: u16 = 0x40;
/// Channel 0, lobyte/hibyte access, rate generator.
const PIT_RATE_GENERATOR: u8 = 0x34;

/// Reload value for one interrupt every `interval_ms`. Out of range
/// intervals are clamped to what the 16 bit counter can express.
pub fn divisor_for_interval(interval_ms: u32) -> u16 {
    let divisor = PIT_FREQUENCY * u64::from(interval_ms) / 1000;
    divisor.clamp(1, u64::from(u16::MAX)) as u16
}

/// Programs channel 0 and returns the divisor written.
pub fn init(interval_ms: u32) -> u16 {
    let divisor = divisor_for_interval(interval_ms);

    let mut command_port = Port::<u8>::new(PIT_COMMAND_PORT);
    let mut channel_port = Port::<u8>::new(PIT_CHANNEL_0_PORT);

    unsafe {
        command_port.write(PIT_RATE_GENERATOR);
        channel_port.write((divisor & 0xFF) as u8);
        channel_port.write((divisor >> 8) as u8);
    }

    divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_milliseconds() {
        assert_eq!(divisor_for_interval(10), 11_931);
    }

    #[test]
    fn one_millisecond() {
        assert_eq!(divisor_for_interval(1), 1_193);
    }

    #[test]
    fn long_intervals_clamp_to_the_counter() {
        assert_eq!(divisor_for_interval(54), 64_431);
        assert_eq!(divisor_for_interval(55), u16::MAX);
        assert_eq!(divisor_for_interval(1_000), u16::MAX);
    }

    #[test]
    fn zero_never_yields_a_zero_divisor() {
        assert_eq!(divisor_for_interval(0), 1);
    }
}
