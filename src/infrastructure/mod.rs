pub mod account_store;
pub mod credential_store;
pub mod log_redact;
pub mod logging;

pub use account_store::InMemoryAccountStore;
pub use credential_store::{CredentialKind, InMemoryCredentialStore};
