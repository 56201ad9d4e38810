//! Request signing for the processing service.

mod none;
pub mod service_account;

pub use none::NoAuth;
pub use service_account::{ServiceAccount, ServiceAccountAuth, CREDENTIALS_ENV};

use crate::error::Result;

/// Trait for signing HTTP requests to the processing service.
///
/// Implementations add authentication headers to outgoing requests before
/// they are sent.
pub trait CloudAuth: Send + Sync {
    /// Sign a request by adding authentication headers.
    ///
    /// `url` is the full request URL, `headers` is a mutable map where
    /// auth headers should be inserted.
    fn sign_request(
        &self,
        url: &str,
        method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()>;
}
