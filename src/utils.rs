//! Provides utility functions for assembling numbers from the nibbles and bytes of an instruction stream. Everything here is _Big Endian_,
//! matching the byte order CHIP-8 uses for instruction words.

/// Converts two 4-bit unsigned integers into a _Big Endian_ encoded 8-bit unsigned integer.
///
/// The 4-bit integers are passed as `u8` because smaller datatypes are not supported. Only the low nibble of each argument is used.
///
/// # Examples
/// ```
/// use chip8_core::utils::big_endian_4_2;
///
/// assert_eq!(big_endian_4_2(0xA, 0x8), 0xA8);
/// ```
pub fn big_endian_4_2(n1: u8, n2: u8) -> u8 {
    ((n1 & 0xF) << 4) | (n2 & 0xF)
}

/// Converts three 4-bit unsigned integers into a _Big Endian_ encoded 12-bit unsigned integer.
///
/// The result is expressed as a `u16` because `u12` is not supported by rust. Only the low nibble of each argument is used.
///
/// # Examples
/// ```
/// use chip8_core::utils::big_endian_4_3;
///
/// assert_eq!(big_endian_4_3(0xA, 0x2, 0x8), 0xA28);
/// ```
pub fn big_endian_4_3(n1: u8, n2: u8, n3: u8) -> u16 {
    ((n1 as u16 & 0xF) << 8) | ((n2 as u16 & 0xF) << 4) | (n3 as u16 & 0xF)
}

/// Converts two 8-bit unsigned integers into a _Big Endian_ encoded 16-bit unsigned integer.
///
/// # Examples
/// ```
/// use chip8_core::utils::big_endian_8_2;
///
/// assert_eq!(big_endian_8_2(0xA4, 0x8E), 0xA48E);
/// ```
pub fn big_endian_8_2(n1: u8, n2: u8) -> u16 {
    u16::from_be_bytes([n1, n2])
}

/// Splits a 16-bit word into its four nibbles, most significant first.
pub fn nibbles(word: u16) -> (u8, u8, u8, u8) {
    (
        ((word & 0xF000) >> 12) as u8,
        ((word & 0x0F00) >> 8) as u8,
        ((word & 0x00F0) >> 4) as u8,
        (word & 0x000F) as u8,
    )
}
