//! Session module - authenticated sessions with sliding expiry and
//! one live session per user

pub mod clock;
pub mod credentials;
pub mod store;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialValidator, NoCredentialBackend};
pub use store::{Identity, SessionInfo, SessionStore, SessionStoreConfig};
pub use token::{fingerprint, generate_session_token};
