//! Auth worker
//!
//! Forwards login attempts to the credential service that owns user records.
//! `POST {base}/auth/validate` with `{email, password}` answers 200 with the
//! identity, 404 for an unknown user and 401 for a wrong password.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::CredentialError;
use crate::session::{CredentialValidator, Identity};

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    email: &'a str,
    password: &'a str,
}

pub struct AuthWorker {
    backend_url: String,
    http_client: reqwest::Client,
}

impl AuthWorker {
    pub fn new(backend_url: impl Into<String>) -> Self {
        let backend_url = backend_url.into().trim_end_matches('/').to_string();
        info!("Auth worker initialized with backend: {}", backend_url);
        Self {
            backend_url,
            http_client: reqwest::Client::new(),
        }
    }

    fn validate_url(&self) -> String {
        format!("{}/auth/validate", self.backend_url)
    }
}

#[async_trait]
impl CredentialValidator for AuthWorker {
    async fn validate(&self, email: &str, password: &str) -> Result<Identity, CredentialError> {
        debug!("Validating credentials for {}", email);
        let response = self
            .http_client
            .post(self.validate_url())
            .json(&ValidateRequest { email, password })
            .send()
            .await
            .map_err(|e| CredentialError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(CredentialError::UnknownUser),
            StatusCode::UNAUTHORIZED => Err(CredentialError::WrongPassword),
            status if status.is_success() => response
                .json::<Identity>()
                .await
                .map_err(|e| CredentialError::Unavailable(format!("bad identity payload: {}", e))),
            status => Err(CredentialError::Unavailable(format!("credential service returned {}", status))),
        }
    }
}
