//! Sign-in for both surfaces: PKCE, the persisted session, and the
//! authorization-code flow against the identity provider.

pub mod callback;
pub mod claims;
pub mod flow;
pub mod pkce;
pub mod session;
pub mod storage;

pub use self::claims::Claims;
pub use self::flow::{AuthFlow, AuthState, CallbackParams};
pub use self::session::Session;
pub use self::storage::{FileStorage, MemoryStorage, Storage};
