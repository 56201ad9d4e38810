//! Service-account credentials.
//!
//! Credentials are a JSON document with the account's `client_email`, the
//! billing `project_id` and a bearer `access_token`:
//!
//! ```json
//! { "client_email": "runner@proj.iam.example", "project_id": "proj", "access_token": "..." }
//! ```
//!
//! They are read from a file given on the command line, or from the
//! `SARWATCH_CREDENTIALS` environment variable, which holds either the JSON
//! document itself or a path to it.

use std::path::Path;

use serde::Deserialize;

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};

/// Environment variable consulted by [`ServiceAccount::from_env`].
pub const CREDENTIALS_ENV: &str = "SARWATCH_CREDENTIALS";

/// Service-account identity and token.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub project_id: String,
    #[serde(default)]
    access_token: Option<String>,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("project_id", &self.project_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ServiceAccount {
    /// Create credentials with explicit values.
    pub fn new(
        client_email: impl Into<String>,
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client_email: client_email.into(),
            project_id: project_id.into(),
            access_token: Some(access_token.into()),
        }
    }

    /// Parse a credentials JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let account: Self = serde_json::from_str(json)
            .map_err(|e| CloudError::Configuration(format!("invalid service-account JSON: {e}")))?;
        account.validate()?;
        Ok(account)
    }

    /// Load credentials from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CloudError::Configuration(format!("cannot read credentials {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Load credentials from [`CREDENTIALS_ENV`].
    pub fn from_env() -> Result<Self> {
        let value = std::env::var(CREDENTIALS_ENV)
            .map_err(|_| CloudError::Configuration(format!("{CREDENTIALS_ENV} not set")))?;
        if value.trim_start().starts_with('{') {
            Self::from_json(&value)
        } else {
            Self::from_file(value.trim())
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn validate(&self) -> Result<()> {
        if self.client_email.trim().is_empty() {
            return Err(CloudError::Configuration("client_email is empty".into()));
        }
        if self.project_id.trim().is_empty() {
            return Err(CloudError::Configuration("project_id is empty".into()));
        }
        match self.access_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(()),
            _ => Err(CloudError::Configuration(format!(
                "credentials for {} carry no access_token",
                self.client_email
            ))),
        }
    }
}

/// Bearer-token signing with the account's billing project.
pub struct ServiceAccountAuth {
    account: ServiceAccount,
}

impl ServiceAccountAuth {
    pub fn new(account: ServiceAccount) -> Result<Self> {
        account.validate()?;
        Ok(Self { account })
    }

    pub fn account(&self) -> &ServiceAccount {
        &self.account
    }
}

impl CloudAuth for ServiceAccountAuth {
    fn sign_request(
        &self,
        _url: &str,
        _method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()> {
        let token = self
            .account
            .access_token()
            .ok_or_else(|| CloudError::Auth("no access token".into()))?;
        headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        headers.push(("x-goog-user-project".to_string(), self.account.project_id.clone()));
        Ok(())
    }
}
