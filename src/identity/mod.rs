//! Request identity resolution: who, if anyone, is making this request.
//! Keep the public surface thin and split implementation across sub-modules.
//!
//! Per request the flow is guard -> resolver -> (session lookup, then token lookup)
//! -> account store. The resolver memoizes its answer for the rest of the request,
//! including a negative answer.

mod account;
mod session;
mod request;
mod lookup;
mod context;
mod guard;
mod extract;

pub use account::{Account, AccountId, AccountStore, MemoryAccountStore, StoreError};
pub use session::{IdentityRef, Session, IDENTITY_KEY};
pub use request::{RequestIntent, RequestParams, TOKEN_PARAM};
pub use lookup::{lookup_from_session, lookup_from_token};
pub use context::{IdentityHandle, RequestContext};
pub use guard::{access_denied, authenticate, require_authentication, GuardOutcome};
pub use extract::{CurrentAccount, MaybeAccount};
