mod session;

pub use session::CredentialStore;
pub use session::PendingLogins;
