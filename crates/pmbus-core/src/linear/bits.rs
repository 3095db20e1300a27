//! Two's-complement and unsigned bit-field packing for fields up to 16 bits.

/// Mask covering the low `width` bits.
pub fn field_mask(width: u32) -> u32 {
    if width >= u32::BITS {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Inclusive range of integers representable in `width` bits.
///
/// A zero-width field only holds zero.
pub fn field_range(width: u32, signed: bool) -> (i64, i64) {
    match (width, signed) {
        (0, _) => (0, 0),
        (_, true) => (-(1i64 << (width - 1)), (1i64 << (width - 1)) - 1),
        (_, false) => (0, (1i64 << width) - 1),
    }
}

/// Pack `value` into a `width`-bit field, or `None` when it does not fit.
pub fn pack(value: i64, width: u32, signed: bool) -> Option<u32> {
    let (min, max) = field_range(width, signed);
    if value < min || value > max {
        return None;
    }
    Some((value as u32) & field_mask(width))
}

/// Interpret the low `width` bits of `field` as two's complement.
pub fn unpack_signed(field: u32, width: u32) -> i64 {
    if width == 0 {
        return 0;
    }
    let field = field & field_mask(width);
    let sign_bit = 1u32 << (width - 1);
    if field & sign_bit != 0 {
        field as i64 - (1i64 << width)
    } else {
        field as i64
    }
}

/// Interpret the low `width` bits of `field` as unsigned.
pub fn unpack_unsigned(field: u32, width: u32) -> i64 {
    (field & field_mask(width)) as i64
}

#[cfg(test)]
mod tests {
    use super::{field_range, pack, unpack_signed, unpack_unsigned};

    #[test]
    fn ranges_by_width() {
        assert_eq!(field_range(5, true), (-16, 15));
        assert_eq!(field_range(8, false), (0, 255));
        assert_eq!(field_range(0, true), (0, 0));
    }

    #[test]
    fn pack_negative_values_as_twos_complement() {
        assert_eq!(pack(-3, 5, true), Some(0b11101));
        assert_eq!(pack(-16, 5, true), Some(0b10000));
        assert_eq!(pack(-17, 5, true), None);
        assert_eq!(pack(-1, 8, false), None);
        assert_eq!(pack(0, 0, false), Some(0));
        assert_eq!(pack(1, 0, true), None);
    }

    #[test]
    fn unpack_reverses_pack() {
        for value in -16..=15 {
            let field = pack(value, 5, true).unwrap();
            assert_eq!(unpack_signed(field, 5), value);
        }
        assert_eq!(unpack_unsigned(0b1_0000_0000_0001, 11), 1);
        assert_eq!(unpack_signed(0, 0), 0);
    }
}
