//! Locally generated record identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Prefix for optimistic records that the remote store has not confirmed.
pub const TEMP_PREFIX: &str = "tmp_";

/// Issues identifiers of the form `{prefix}{salt}-{counter}`.
///
/// The counter makes ids unique within one generator; the random salt keeps
/// generators created in different processes or sessions apart.
#[derive(Debug)]
pub struct IdGenerator {
    prefix: &'static str,
    salt: String,
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Generator for temporary ids (`tmp_…`).
    pub fn temporary() -> Self {
        Self::with_prefix(TEMP_PREFIX)
    }

    fn with_prefix(prefix: &'static str) -> Self {
        let salt = Uuid::new_v4().simple().to_string()[..8].to_string();
        IdGenerator {
            prefix,
            salt,
            counter: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{}-{}", self.prefix, self.salt, n)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
