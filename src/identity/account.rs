use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type AccountId = i64;

/// The authenticated actor. Tokens are accepted on input (seed files) but never echoed back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    #[serde(default, skip_serializing)]
    pub public_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub private_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account {0} not found")]
    NotFound(AccountId),
    #[error("account store failure: {0}")]
    Backend(String),
}

/// Account persistence as seen by identity resolution. Implementations may block;
/// callers invoke these synchronously and never retry.
pub trait AccountStore: Send + Sync {
    /// Load by primary key; `StoreError::NotFound` when no such account exists.
    fn find_by_reference(&self, id: AccountId) -> Result<Account, StoreError>;
    /// Match either the shareable public token or the private token.
    fn find_by_public_or_private_token(&self, token: &str) -> Option<Account>;
    /// Match the private token only; a public token never matches here.
    fn find_by_private_token(&self, token: &str) -> Option<Account>;
}

fn token_matches(slot: &Option<String>, token: &str) -> bool {
    matches!(slot, Some(t) if !t.is_empty() && t == token)
}

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_accounts<I: IntoIterator<Item = Account>>(accounts: I) -> Self {
        let map = accounts.into_iter().map(|a| (a.id, a)).collect();
        Self { accounts: RwLock::new(map) }
    }

    /// Load a JSON array of accounts (tokens included).
    pub fn load_json(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading account seed file {}", path.display()))?;
        let accounts: Vec<Account> = serde_json::from_str(&text)
            .with_context(|| format!("parsing account seed file {}", path.display()))?;
        Ok(Self::from_accounts(accounts))
    }

    pub fn insert(&self, account: Account) -> Option<Account> {
        self.accounts.write().insert(account.id, account)
    }

    pub fn remove(&self, id: AccountId) -> Option<Account> {
        self.accounts.write().remove(&id)
    }

    pub fn len(&self) -> usize { self.accounts.read().len() }

    pub fn is_empty(&self) -> bool { self.accounts.read().is_empty() }

    fn find_first(&self, pred: impl Fn(&Account) -> bool) -> Option<Account> {
        // lowest id wins so duplicate tokens resolve deterministically
        self.accounts.read().values().filter(|&a| pred(a)).min_by_key(|a| a.id).cloned()
    }
}

impl AccountStore for MemoryAccountStore {
    fn find_by_reference(&self, id: AccountId) -> Result<Account, StoreError> {
        self.accounts.read().get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn find_by_public_or_private_token(&self, token: &str) -> Option<Account> {
        self.find_first(|a| token_matches(&a.public_token, token) || token_matches(&a.private_token, token))
    }

    fn find_by_private_token(&self, token: &str) -> Option<Account> {
        self.find_first(|a| token_matches(&a.private_token, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Account {
        Account { id: 1, name: "alice".into(), public_token: Some("pub-a".into()), private_token: Some("priv-a".into()) }
    }

    #[test]
    fn find_by_reference_reports_missing() {
        let store = MemoryAccountStore::from_accounts([alice()]);
        assert_eq!(store.find_by_reference(1).unwrap().name, "alice");
        match store.find_by_reference(2) {
            Err(StoreError::NotFound(id)) => assert_eq!(id, 2),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn private_lookup_rejects_public_token() {
        let store = MemoryAccountStore::from_accounts([alice()]);
        assert!(store.find_by_private_token("pub-a").is_none());
        assert_eq!(store.find_by_private_token("priv-a").map(|a| a.id), Some(1));
        assert_eq!(store.find_by_public_or_private_token("pub-a").map(|a| a.id), Some(1));
        assert_eq!(store.find_by_public_or_private_token("priv-a").map(|a| a.id), Some(1));
    }

    #[test]
    fn empty_tokens_never_match() {
        let store = MemoryAccountStore::from_accounts([Account { id: 7, name: "blank".into(), public_token: Some(String::new()), private_token: None }]);
        assert!(store.find_by_public_or_private_token("").is_none());
        assert!(store.find_by_private_token("").is_none());
    }

    #[test]
    fn insert_and_remove() {
        let store = MemoryAccountStore::new();
        assert!(store.is_empty());
        assert!(store.insert(alice()).is_none());
        assert_eq!(store.len(), 1);
        assert!(store.remove(1).is_some());
        assert!(store.find_by_reference(1).is_err());
    }

    #[test]
    fn load_seed_file() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"[{{"id": 3, "name": "carol", "private_token": "priv-c"}}, {{"id": 4, "name": "dan"}}]"#).unwrap();
        let store = MemoryAccountStore::load_json(f.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.find_by_private_token("priv-c").map(|a| a.id), Some(3));
        assert!(store.find_by_reference(4).unwrap().public_token.is_none());
    }

    #[test]
    fn bad_seed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MemoryAccountStore::load_json(&dir.path().join("missing.json")).is_err());
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        let err = MemoryAccountStore::load_json(&bad).unwrap_err();
        assert!(err.to_string().contains("parsing account seed file"));
    }

    #[test]
    fn tokens_are_not_serialized() {
        let v = serde_json::to_value(alice()).unwrap();
        assert_eq!(v, serde_json::json!({"id": 1, "name": "alice"}));
    }
}
