//! Identity token verification against a tokeninfo-style endpoint.
//!
//! `GET {endpoint}?id_token=<token>`; a 200 carries the claims, a 4xx
//! means the token is invalid.

use std::time::Duration;

use log::warn;
use reqwest::blocking::Client;
use serde::Deserialize;
use taskhub_core::model::user::VerifiedClaims;
use taskhub_core::{CollaboratorError, IdentityTokenVerifier};

pub struct HttpTokenVerifier {
    client: Client,
    endpoint: String,
    audience: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    aud: Option<String>,
}

impl HttpTokenVerifier {
    /// Builds the blocking client. Must be called outside an async runtime.
    pub fn new(
        endpoint: impl Into<String>,
        audience: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("taskhub/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| CollaboratorError::Unavailable(format!("client setup: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            audience,
        })
    }

    fn claims_from(&self, info: TokenInfo) -> Result<VerifiedClaims, CollaboratorError> {
        if let Some(expected) = self.audience.as_deref() {
            if info.aud.as_deref() != Some(expected) {
                return Err(CollaboratorError::Rejected("audience mismatch".to_string()));
            }
        }
        let (Some(subject), Some(email)) = (info.sub, info.email) else {
            return Err(CollaboratorError::Rejected("missing claims".to_string()));
        };
        Ok(VerifiedClaims {
            subject,
            email,
            name: info.name,
            picture: info.picture,
        })
    }
}

impl IdentityTokenVerifier for HttpTokenVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedClaims, CollaboratorError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", token)])
            .send()
            .map_err(classify)?;

        let status = response.status();
        if status.is_client_error() {
            return Err(CollaboratorError::Rejected(format!("status {status}")));
        }
        if !status.is_success() {
            warn!("event=token_verify module=verifier status=error http_status={status}");
            return Err(CollaboratorError::Unavailable(format!("status {status}")));
        }

        let info = response.json::<TokenInfo>().map_err(classify)?;
        self.claims_from(info)
    }
}

fn classify(err: reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Timeout(err.to_string())
    } else {
        CollaboratorError::Unavailable(err.to_string())
    }
}
