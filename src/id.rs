//! Unique HTML id generation.
//!
//! An [`IdGenerator`] hands out ids that are unique for its own lifetime.
//! Callers that build one page per generator get per-page uniqueness;
//! [`html_id`] wraps a process-wide generator for the cases where that is
//! good enough.

use std::collections::HashSet;
use std::sync::{LazyLock, Mutex};

/// Hands out ids unique within this generator.
#[derive(Debug, Default)]
pub struct IdGenerator {
    used: HashSet<String>,
    counter: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `prefix` itself when still free, otherwise `prefix-N` for
    /// the first free N. The returned id is recorded as used.
    pub fn next_id(&mut self, prefix: &str) -> String {
        if self.used.insert(prefix.to_string()) {
            return prefix.to_string();
        }
        loop {
            self.counter += 1;
            let candidate = format!("{prefix}-{}", self.counter);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Record an externally-assigned id so `next_id` never collides with
    /// it.
    pub fn reserve(&mut self, id: impl Into<String>) {
        self.used.insert(id.into());
    }
}

static GLOBAL: LazyLock<Mutex<IdGenerator>> = LazyLock::new(|| Mutex::new(IdGenerator::new()));

/// Process-wide [`IdGenerator::next_id`]. Ids are unique for the life of
/// the process, never per page.
pub fn html_id(prefix: &str) -> String {
    let mut generator = GLOBAL.lock().expect("id generator lock poisoned");
    generator.next_id(prefix)
}
