//! Signal samples exchanged with the drive path are 8-bit two's complement
//! in Q6 (6 fractional bits), covering [-2.0, 1.984375].

pub const Q6_FRAC_BITS: u32 = 6;

/// Convert a raw drive-path sample to its Q6 value. Only the low byte is
/// significant; bit 7 is the sign.
pub fn q6_to_f64(sample: i64) -> f64 {
    let byte = (sample & 0xFF) as u8 as i8;
    f64::from(byte) / f64::from(1u32 << Q6_FRAC_BITS)
}

/// Text form used in output vector files: always carries a decimal point.
pub fn format_q6(sample: i64) -> String {
    format!("{:?}", q6_to_f64(sample))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q6_reference_points() {
        assert_eq!(q6_to_f64(0x00), 0.0);
        assert_eq!(q6_to_f64(0x40), 1.0);
        assert_eq!(q6_to_f64(0x7F), 1.984375);
        assert_eq!(q6_to_f64(0x80), -2.0);
        assert_eq!(q6_to_f64(0xFF), -0.015625);
    }

    #[test]
    fn test_q6_ignores_high_bits() {
        assert_eq!(q6_to_f64(0x140), 1.0);
        assert_eq!(q6_to_f64(-1), -0.015625);
    }

    #[test]
    fn test_format_keeps_decimal_point() {
        assert_eq!(format_q6(0x40), "1.0");
        assert_eq!(format_q6(0x00), "0.0");
        assert_eq!(format_q6(0xC0), "-1.0");
        assert_eq!(format_q6(0x01), "0.015625");
    }
}
