// src/utils/otp.rs

use rand::{
    RngCore,
    distributions::{Distribution, Uniform},
    rngs::OsRng,
};

pub const OTP_LENGTH: usize = 6;

/// Generates a numeric one-time code of `OTP_LENGTH` digits.
///
/// Leading zeros are allowed, so every code is exactly six characters.
pub fn generate_otp() -> String {
    let digit = Uniform::from(0..=9u8);
    let mut rng = OsRng;
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + digit.sample(&mut rng)))
        .collect()
}

/// Generates a 32-byte random token, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
