use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::account::{Account, AccountStore};
use super::lookup::{lookup_from_session, lookup_from_token};
use super::request::{RequestIntent, RequestParams};
use super::session::Session;

/// Per-request identity state. Created at request start, dropped with the request.
///
/// `resolved` is tri-state: `None` means nothing has been looked up yet,
/// `Some(None)` means lookups ran and found nobody, `Some(Some(_))` holds the account.
/// Keeping the negative answer stops repeated checks within one request from
/// hitting the store again.
pub struct RequestContext {
    store: Arc<dyn AccountStore>,
    session: Session,
    params: RequestParams,
    intent: RequestIntent,
    resolved: Option<Option<Account>>,
}

impl RequestContext {
    pub fn new(store: Arc<dyn AccountStore>, session: Session, params: RequestParams, intent: RequestIntent) -> Self {
        Self { store, session, params, intent, resolved: None }
    }

    /// The signed-in account, resolving session first and token second on first use.
    pub fn current_identity(&mut self) -> Option<&Account> {
        if self.resolved.is_none() {
            let store = self.store.as_ref();
            let found = lookup_from_session(&self.session, store)
                .or_else(|| lookup_from_token(&self.params, self.intent, store));
            self.resolved = Some(found);
        }
        self.resolved.as_ref().and_then(Option::as_ref)
    }

    pub fn is_signed_in(&mut self) -> bool {
        self.current_identity().is_some()
    }

    /// Sign an account in (stores its id in the session) or, with `None`, sign out.
    /// Signing out also forgets any cached answer, so the next `current_identity`
    /// call resolves again from scratch.
    pub fn set_current_identity(&mut self, account: Option<Account>) {
        match account {
            Some(account) => {
                info!(target: "identity", account_id = account.id, "signed in");
                self.session.set_identity_reference(account.id);
                self.resolved = Some(Some(account));
            }
            None => {
                info!(target: "identity", "signed out");
                self.session.clear_identity_reference();
                self.resolved = None;
            }
        }
    }

    /// Whether an answer (present or absent) is cached for this request.
    pub fn is_resolved(&self) -> bool { self.resolved.is_some() }

    pub fn session(&self) -> &Session { &self.session }

    pub fn into_session(self) -> Session { self.session }
}

/// Request-extension handle onto the request's `RequestContext`.
///
/// axum extensions must be `Clone`, so the context sits behind an `Arc<Mutex<_>>`.
/// Every clone belongs to the same request; the lock is never held across an await.
#[derive(Clone)]
pub struct IdentityHandle(Arc<Mutex<RequestContext>>);

impl IdentityHandle {
    pub fn new(ctx: RequestContext) -> Self { Self(Arc::new(Mutex::new(ctx))) }

    pub fn with<R>(&self, f: impl FnOnce(&mut RequestContext) -> R) -> R {
        let mut guard = self.0.lock();
        f(&mut guard)
    }

    pub fn current_identity(&self) -> Option<Account> {
        self.with(|ctx| ctx.current_identity().cloned())
    }

    pub fn is_signed_in(&self) -> bool {
        self.with(|ctx| ctx.is_signed_in())
    }

    pub fn set_current_identity(&self, account: Option<Account>) {
        self.with(|ctx| ctx.set_current_identity(account))
    }

    /// Copy of the session as it stands now, for persisting after the handler ran.
    pub fn session_snapshot(&self) -> Session {
        self.with(|ctx| ctx.session().clone())
    }
}
