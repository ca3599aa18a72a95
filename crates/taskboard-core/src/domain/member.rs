//! TeamMember - static reference data.

use serde::{Deserialize, Serialize};

use super::ids::MemberId;

/// A person tasks can be assigned to. Loaded once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: MemberId,
    pub name: String,
    pub role: String,
}

impl TeamMember {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(id),
            name: name.into(),
            role: role.into(),
        }
    }

    /// First letter of each word of the name (`Alice Smith` -> `AS`).
    pub fn initials(&self) -> String {
        initials(&self.name)
    }
}

pub(crate) fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect()
}
