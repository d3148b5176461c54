use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::account::AccountId;

/// Session key holding the signed-in account's id.
pub const IDENTITY_KEY: &str = "user";

/// What the session says about the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRef {
    Missing,
    Id(AccountId),
    /// Something is stored under the key but it is not an account id.
    Malformed,
}

/// Server-side session values for one caller. Persisted by the surrounding server
/// between requests; identity resolution only touches `IDENTITY_KEY`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    values: HashMap<String, Value>,
    #[serde(skip)]
    dirty: bool,
}

impl Session {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, key: &str) -> Option<&Value> { self.values.get(key) }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.dirty = true;
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let old = self.values.remove(key);
        if old.is_some() { self.dirty = true; }
        old
    }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// True once anything changed since load (or since `mark_clean`).
    pub fn is_dirty(&self) -> bool { self.dirty }

    pub fn mark_clean(&mut self) { self.dirty = false; }

    pub fn identity_reference(&self) -> IdentityRef {
        match self.values.get(IDENTITY_KEY) {
            None | Some(Value::Null) => IdentityRef::Missing,
            Some(v) => v.as_i64().map(IdentityRef::Id).unwrap_or(IdentityRef::Malformed),
        }
    }

    pub fn set_identity_reference(&mut self, id: AccountId) {
        self.insert(IDENTITY_KEY, Value::from(id));
    }

    pub fn clear_identity_reference(&mut self) {
        self.remove(IDENTITY_KEY);
    }
}
