//! ID generation utilities.

use rand::Rng;
use ulid::Ulid;
use uuid::Uuid;

const REGISTRATION_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a gallery registration code.
pub const REGISTRATION_CODE_LEN: usize = 8;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Monotonically increasing within the same millisecond
    /// - Shorter than UUIDs when represented as strings
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a random token id (used as the JWT `jti`).
    #[must_use]
    pub fn generate_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Generate an 8-character gallery registration code from `A-Z0-9`.
    ///
    /// Uniqueness is checked by the caller against the gallery table.
    #[must_use]
    pub fn generate_registration_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..REGISTRATION_CODE_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..REGISTRATION_CODE_CHARSET.len());
                char::from(REGISTRATION_CODE_CHARSET[idx])
            })
            .collect()
    }

    /// Six-digit phone verification code, never starting with `0`.
    #[must_use]
    pub fn generate_verification_code(&self) -> String {
        rand::thread_rng().gen_range(100_000..=999_999).to_string()
    }
}
