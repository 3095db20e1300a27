pub const FIELD_COUNT: usize = 10;

pub const NAME_INDEX: usize = 0;
pub const ADDRESS_INDEX: usize = 1;
pub const READ_ENABLED_INDEX: usize = 2;
pub const WRITE_ENABLED_INDEX: usize = 3;
pub const NUM_DATA_BYTES_INDEX: usize = 4;
pub const LINEAR_INDEX: usize = 5;
pub const EXPONENT_INDEX: usize = 6;
pub const MANTISSA_BITS_INDEX: usize = 7;
pub const EXPONENT_BITS_INDEX: usize = 8;
pub const DATA_SIGNED_INDEX: usize = 9;

pub const TRUE_TOKEN: &str = "T";
pub const FALSE_TOKEN: &str = "F";

pub const FIELD_SEPARATOR: char = ',';
pub const HEADER_LINES: usize = 1;

/// Width of a linear word; mantissa and exponent fields must fill it exactly.
pub const LINEAR_WORD_BITS: i64 = 16;
