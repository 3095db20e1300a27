pub const BINARY_PREFIX: &str = "0b";
pub const HEX_PREFIX: &str = "0x";
pub const SIGN_PREFIX: char = '-';

pub const BINARY_DIGITS: usize = 8;
pub const HEX_DIGITS: usize = 2;

pub const BINARY_LEN: usize = BINARY_PREFIX.len() + BINARY_DIGITS;
pub const HEX_LEN: usize = HEX_PREFIX.len() + HEX_DIGITS;

pub const SIGNED_RANGE: std::ops::RangeInclusive<i64> = -128..=127;
pub const UNSIGNED_RANGE: std::ops::RangeInclusive<i64> = 0..=255;
