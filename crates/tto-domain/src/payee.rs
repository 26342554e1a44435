//! Payee identity: the owner of a balance account.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A party eligible to hold a balance and receive payment instructions.
///
/// A balance belongs to exactly one user or one personnel record, never both.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Payee {
    User(Uuid),
    Personnel(Uuid),
}

impl Payee {
    pub fn id(&self) -> Uuid {
        match self {
            Payee::User(id) | Payee::Personnel(id) => *id,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Payee::User(_) => "user",
            Payee::Personnel(_) => "personnel",
        }
    }
}

impl fmt::Display for Payee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind_label(), self.id())
    }
}
