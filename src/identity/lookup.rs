use tracing::{debug, error, warn};

use super::account::{Account, AccountStore, StoreError};
use super::request::{RequestIntent, RequestParams};
use super::session::{IdentityRef, Session};

/// Resolve the account referenced by the session. The store is not consulted when the
/// session holds no reference. A reference the store cannot resolve counts as no identity.
pub fn lookup_from_session(session: &Session, store: &dyn AccountStore) -> Option<Account> {
    let id = match session.identity_reference() {
        IdentityRef::Missing => return None,
        IdentityRef::Malformed => {
            warn!(target: "identity", "session identity reference is not an account id; ignoring");
            return None;
        }
        IdentityRef::Id(id) => id,
    };
    match store.find_by_reference(id) {
        Ok(account) => {
            debug!(target: "identity", account_id = account.id, "identity from session");
            Some(account)
        }
        Err(StoreError::NotFound(_)) => {
            // stale session: the account was removed after sign-in
            warn!(target: "identity", account_id = id, "session references a missing account");
            None
        }
        Err(e) => {
            error!(target: "identity", account_id = id, "session identity lookup failed: {e}");
            None
        }
    }
}

/// Resolve the account owning the request's `token` parameter. Reads accept public or
/// private tokens; writes accept private tokens only.
pub fn lookup_from_token(params: &RequestParams, intent: RequestIntent, store: &dyn AccountStore) -> Option<Account> {
    let token = params.token()?;
    let found = match intent {
        RequestIntent::Read => store.find_by_public_or_private_token(token),
        RequestIntent::Write => store.find_by_private_token(token),
    };
    match &found {
        Some(account) => debug!(target: "identity", account_id = account.id, ?intent, "identity from token"),
        None => debug!(target: "identity", ?intent, "token did not match an account"),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryAccountStore;

    fn store() -> MemoryAccountStore {
        MemoryAccountStore::from_accounts([Account {
            id: 4,
            name: "brewer".into(),
            public_token: Some("share-me".into()),
            private_token: Some("keep-secret".into()),
        }])
    }

    #[test]
    fn session_hit_and_miss() {
        let store = store();
        let mut session = Session::new();
        assert!(lookup_from_session(&session, &store).is_none());
        session.set_identity_reference(4);
        assert_eq!(lookup_from_session(&session, &store).map(|a| a.id), Some(4));
        session.set_identity_reference(99);
        assert!(lookup_from_session(&session, &store).is_none());
    }

    #[test]
    fn public_token_reads_but_does_not_write() {
        let store = store();
        let params = RequestParams::from_query(Some("token=share-me"));
        assert_eq!(lookup_from_token(&params, RequestIntent::Read, &store).map(|a| a.id), Some(4));
        assert!(lookup_from_token(&params, RequestIntent::Write, &store).is_none());
    }

    #[test]
    fn private_token_reads_and_writes() {
        let store = store();
        let params = RequestParams::from_query(Some("token=keep-secret"));
        assert!(lookup_from_token(&params, RequestIntent::Read, &store).is_some());
        assert!(lookup_from_token(&params, RequestIntent::Write, &store).is_some());
    }
}
