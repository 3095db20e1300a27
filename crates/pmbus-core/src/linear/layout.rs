pub const WORD_BYTES: usize = 2;
pub const WORD_BITS: u32 = 16;

/// Index of the least significant byte in the wire sequence.
pub const LOWER_BYTE_INDEX: usize = 0;
/// Index of the most significant byte in the wire sequence.
pub const UPPER_BYTE_INDEX: usize = 1;

/// Weight of the first fractional bit.
pub const FIRST_FRACTION_WEIGHT: f64 = 0.5;
