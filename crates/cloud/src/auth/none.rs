//! No-op authentication for local or open deployments.

use crate::auth::CloudAuth;
use crate::error::Result;

/// No authentication, for a service that does not require credentials.
pub struct NoAuth;

impl CloudAuth for NoAuth {
    fn sign_request(
        &self,
        _url: &str,
        _method: &str,
        _headers: &mut Vec<(String, String)>,
    ) -> Result<()> {
        Ok(())
    }
}
