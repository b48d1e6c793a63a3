//! ID generation utilities.

use ulid::Ulid;
use uuid::Uuid;

/// Prefix carried by every room id.
pub const ROOM_ID_PREFIX: &str = "room_";

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

    /// Generate a globally unique room id.
    ///
    /// Room ids carry no time component so they cannot be guessed from the
    /// session schedule.
    #[must_use]
    pub fn generate_room_id(&self) -> String {
        format!("{ROOM_ID_PREFIX}{}", Uuid::new_v4().simple())
    }
}
