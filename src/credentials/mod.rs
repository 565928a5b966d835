//! Credential lookup for the Confluence connection.
//!
//! Configuration files may leave `username`/`apiToken` empty so secrets stay
//! out of them; the missing values are then resolved per host through a
//! [`CredentialsProvider`]. The default provider reads `~/.netrc`:
//!
//! ```text
//! machine your-instance.atlassian.net
//!   login your.email@example.com
//!   password your-api-token-here
//! ```

mod netrc;
mod provider;
mod types;

pub use netrc::NetrcProvider;
pub use provider::CredentialsProvider;
pub use types::{Credential, CredentialError};
