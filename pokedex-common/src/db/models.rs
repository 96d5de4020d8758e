//! Record model shared by the cache, the record store and the lookup API

use serde::{Deserialize, Serialize};

/// A persisted record, keyed by its normalized name.
///
/// This is also the cache wire format: a flat JSON object
/// `{"id":1,"name":"pikachu","height":4,"weight":60}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned surrogate key
    pub id: i64,
    /// Natural key, lower-cased; unique in the store
    pub name: String,
    pub height: i64,
    pub weight: i64,
}

/// A record that has not been persisted yet (no id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub height: i64,
    pub weight: i64,
}

impl NewRecord {
    pub fn new(name: impl Into<String>, height: i64, weight: i64) -> Self {
        Self {
            name: name.into(),
            height,
            weight,
        }
    }

    /// Attach the id assigned by the store
    pub fn with_id(self, id: i64) -> Record {
        Record {
            id,
            name: self.name,
            height: self.height,
            weight: self.weight,
        }
    }
}
