use std::future::Future;
use std::pin::Pin;

use actix_web::{Error, FromRequest, HttpRequest, dev::Payload, http::header, web};
use anyhow::Context;
use common::{ServiceError, User};
use ed25519_compact::{KeyPair, PublicKey, SecretKey};
use jwt_compact::{AlgorithmExt, Claims, Header, TimeOptions, Token, UntrustedToken, alg::Ed25519};
use serde::{Deserialize, Serialize};

use crate::handlers::error_response;
use crate::state::AppState;

/// Custom claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub sub: String,
}

/// Signs and verifies Ed25519 bearer tokens whose subject is the user's email.
pub struct TokenIssuer {
    signing_key: SecretKey,
    verifying_key: PublicKey,
    lifetime: chrono::Duration,
    time_options: TimeOptions,
}

impl TokenIssuer {
    /// Uses a fresh key pair, so tokens do not survive a restart.
    pub fn generate(lifetime: chrono::Duration) -> Self {
        let KeyPair {
            pk: verifying_key,
            sk: signing_key,
        } = KeyPair::generate();
        Self {
            signing_key,
            verifying_key,
            lifetime,
            time_options: TimeOptions::default(),
        }
    }

    pub fn issue(&self, email: &str) -> anyhow::Result<String> {
        let claims = Claims::new(Subject {
            sub: email.to_string(),
        })
        .set_duration_and_issuance(&self.time_options, self.lifetime);
        let header = Header::empty().with_token_type("JWT");
        Ed25519
            .token(&header, &claims, &self.signing_key)
            .context("Failed to sign access token")
    }

    /// Checks signature and expiry, returning the subject email.
    pub fn verify(&self, token: &str) -> anyhow::Result<String> {
        let untrusted = UntrustedToken::new(token).context("Malformed access token")?;
        let token: Token<Subject> = Ed25519
            .validator::<Subject>(&self.verifying_key)
            .validate(&untrusted)
            .context("Access token signature is invalid")?;
        token
            .claims()
            .validate_expiration(&self.time_options)
            .context("Access token expired")?;
        Ok(token.claims().custom.sub.clone())
    }
}

/// Extractor for handlers that require a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let app_state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let app_state = app_state.ok_or_else(|| {
                error_response(ServiceError::Internal(anyhow::anyhow!(
                    "AppState is not registered"
                )))
            })?;
            let token = token.ok_or_else(unauthorized)?;

            let email = app_state.tokens.verify(&token).map_err(|e| {
                log::warn!("Rejected bearer token: {:#}", e);
                unauthorized()
            })?;

            let user = app_state
                .identity
                .find_by_email(&email)
                .await
                .map_err(error_response)?
                .ok_or_else(|| {
                    log::warn!("Bearer token subject no longer exists: {}", email);
                    unauthorized()
                })?;

            Ok(AuthenticatedUser(user))
        })
    }
}

fn unauthorized() -> Error {
    error_response(ServiceError::Unauthorized(
        "Could not validate credentials".to_string(),
    ))
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim().to_string())
    } else {
        None
    }
}
