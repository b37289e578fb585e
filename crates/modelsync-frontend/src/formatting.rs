/// IEC units for byte quantities.
const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// IEC units for transfer speeds.
const SPEED_UNITS: [&str; 7] = ["B/s", "KiB/s", "MiB/s", "GiB/s", "TiB/s", "PiB/s", "EiB/s"];

/// Bytes in one mebibyte, the unit download speeds are tracked in.
pub const BYTES_PER_MEBIBYTE: f64 = 1024.0 * 1024.0;

/// Internal helper that formats a byte value using a custom array of unit
/// strings.
///
/// Scales the value by dividing by 1024 repeatedly until it falls below 1024,
/// then formats it with either exact bytes (for < 1024) or two decimal places.
fn format_bytes_with_units(bytes: u64, units: [&str; 7]) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < units.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, units[unit])
    } else {
        format!("{:.2} {}", value, units[unit])
    }
}

/// Formats a byte count into a human-readable string using IEC units.
pub fn format_bytes(bytes: u64) -> String {
    format_bytes_with_units(bytes, UNITS)
}

/// Formats a transfer rate given in MiB/s into a human-readable string.
pub fn format_speed(mebibytes_per_second: f64) -> String {
    let bytes_per_second = (mebibytes_per_second.max(0.0) * BYTES_PER_MEBIBYTE).round();
    format_bytes_with_units(bytes_per_second as u64, SPEED_UNITS)
}

/// Formats a remaining duration as `HH:MM:SS` or `MM:SS`.
pub fn format_eta(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Rounds a reported download percentage to a whole number inside `0..=100`.
/// Non-finite input is treated as no progress.
pub fn clamp_percentage(percentage: f64) -> u8 {
    if !percentage.is_finite() {
        return 0;
    }
    percentage.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_clamped_and_rounded() {
        assert_eq!(clamp_percentage(133.7), 100);
        assert_eq!(clamp_percentage(-5.0), 0);
        assert_eq!(clamp_percentage(42.4), 42);
        assert_eq!(clamp_percentage(42.5), 43);
        assert_eq!(clamp_percentage(f64::NAN), 0);
        assert_eq!(clamp_percentage(f64::INFINITY), 0);
    }

    #[test]
    fn bytes_scale_through_iec_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MiB");
    }

    #[test]
    fn speed_is_given_in_mebibytes() {
        assert_eq!(format_speed(2.5), "2.50 MiB/s");
        assert_eq!(format_speed(-1.0), "0 B/s");
    }

    #[test]
    fn eta_drops_hours_when_short() {
        assert_eq!(format_eta(35.9), "00:35");
        assert_eq!(format_eta(3725.0), "01:02:05");
        assert_eq!(format_eta(-3.0), "00:00");
    }
}
