//! Public lead identifiers.
//!
//! A public id is `LEAD-` followed by 6 random bytes from the operating
//! system's CSPRNG, hex-encoded in upper case. Ids are not checked against
//! storage; the `UNIQUE` constraint on `leads.public_id` rejects a collision.

use rand::{rngs::OsRng, RngCore};

/// Prefix of every public lead id
pub const PUBLIC_ID_PREFIX: &str = "LEAD-";

const RANDOM_BYTES: usize = 6;

/// Length of a public id: the prefix plus two hex digits per random byte
pub const PUBLIC_ID_LEN: usize = PUBLIC_ID_PREFIX.len() + RANDOM_BYTES * 2;

/// Generates a fresh public id such as `LEAD-9F2C04A1B7E3`
pub fn generate_public_id() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{}{}", PUBLIC_ID_PREFIX, hex::encode_upper(bytes))
}

/// Whether `value` has the shape of a public id
pub fn is_public_id(value: &str) -> bool {
    value.len() == PUBLIC_ID_LEN
        && value.starts_with(PUBLIC_ID_PREFIX)
        && value[PUBLIC_ID_PREFIX.len()..]
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'))
}
