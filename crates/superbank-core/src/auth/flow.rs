//! Two-step login: phone and password, then an MFA code.
//!
//! The access token issued by the password step is held in a staging
//! session until the code is verified. Only then is it written to the real
//! session, so the stored credential always belongs to a fully verified
//! login.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::session::Session;
use super::store::{TokenStore, WriteOutcome};
use crate::api::{ApiClient, ApiError};

/// Shortest phone input accepted before calling the server.
const MIN_PHONE_LEN: usize = 5;

/// Shortest MFA code accepted before calling the server.
const MIN_CODE_LEN: usize = 4;

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Enter a phone number")]
    PhoneTooShort,

    #[error("Enter the confirmation code")]
    CodeTooShort,

    #[error("No login in progress")]
    NotAwaitingCode,

    #[error("Login token was lost, please sign in again")]
    TokenMissing,

    #[error("Could not save the session: {0}")]
    NotPersisted(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    Credentials,
    AwaitingCode {
        /// Code echoed back by demo deployments.
        demo_code: Option<String>,
    },
    Complete,
}

pub struct LoginFlow {
    client: ApiClient,
    step: LoginStep,
    phone: Option<String>,
    staging: Option<ApiClient>,
}

impl LoginFlow {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            step: LoginStep::Credentials,
            phone: None,
            staging: None,
        }
    }

    pub fn step(&self) -> &LoginStep {
        &self.step
    }

    /// Phone number of the login in progress or just completed.
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Step 1: check the password and request an MFA code.
    ///
    /// Returns the demo code when the server sends one.
    pub async fn submit_credentials(
        &mut self,
        phone: &str,
        password: &str,
    ) -> Result<Option<String>, LoginError> {
        let phone = phone.trim();
        if phone.chars().count() < MIN_PHONE_LEN {
            return Err(LoginError::PhoneTooShort);
        }
        self.reset();

        // The stored login is untouched until the code is verified
        let staging_session = Arc::new(Session::new(TokenStore::in_memory()));
        let staging = self.client.with_session(Arc::clone(&staging_session));
        let login = staging.login(phone, password).await?;

        let staged = staging_session.establish(&login.access_token).await;
        if let WriteOutcome::Failed(reason) = staged {
            return Err(LoginError::NotPersisted(reason));
        }

        let challenge = staging.generate_mfa().await?;
        debug!(demo = challenge.demo_code.is_some(), "MFA code requested");

        self.phone = Some(phone.to_string());
        self.staging = Some(staging);
        self.step = LoginStep::AwaitingCode {
            demo_code: challenge.demo_code.clone(),
        };
        Ok(challenge.demo_code)
    }

    /// Step 2: verify the code and persist the credential.
    pub async fn submit_code(&mut self, code: &str) -> Result<(), LoginError> {
        let staging = match (&self.step, &self.staging) {
            (LoginStep::AwaitingCode { .. }, Some(staging)) => staging.clone(),
            _ => return Err(LoginError::NotAwaitingCode),
        };

        let code = code.trim();
        if code.chars().count() < MIN_CODE_LEN {
            return Err(LoginError::CodeTooShort);
        }

        // A 401 here clears the staging session; that is caught below
        let verified = staging.verify_mfa(code).await;

        let credential = staging.session().credential().await;
        let Some(credential) = credential else {
            self.reset();
            return Err(LoginError::TokenMissing);
        };
        verified?;

        let persisted = self.client.session().establish(&credential.token).await;
        if let WriteOutcome::Failed(reason) = persisted {
            return Err(LoginError::NotPersisted(reason));
        }

        info!("Login completed");
        self.staging = None;
        self.step = LoginStep::Complete;
        Ok(())
    }

    /// Abandon any login in progress.
    pub fn reset(&mut self) {
        self.staging = None;
        self.step = LoginStep::Credentials;
    }
}
