//! Sign-up / sign-in dispatch and the per-interaction session.
//!
//! The hosted identity provider stays behind [`AuthBackend`]. Each supported
//! operation is a variant of [`AuthRequest`] with its own argument struct, so
//! the set of calls that can reach the backend is closed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::FetchError;
use crate::fetch::{Fetched, RetryingFetcher};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Who is acting during one user interaction. Built at the edge, passed
/// explicitly to everything that needs it, dropped when the interaction ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
}

impl Session {
    pub fn new(user: User) -> Self {
        Session { user }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpArgs {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub attribution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

/// Without a token the backend mails a one-time code; with one it verifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRequest {
    pub email: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    SignUp(SignUpArgs),
    SignInWithPassword(PasswordCredentials),
    SignInWithOtp(OtpRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthResponse {
    pub user: Option<User>,
}

/// Hosted identity provider.
pub trait AuthBackend: Send + Sync {
    fn sign_up(&self, args: &SignUpArgs) -> Result<AuthResponse, FetchError>;
    fn sign_in_with_password(&self, creds: &PasswordCredentials) -> Result<AuthResponse, FetchError>;
    fn sign_in_with_otp(&self, request: &OtpRequest) -> Result<AuthResponse, FetchError>;
    fn sign_out(&self, user: &User) -> Result<(), FetchError>;
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an email address is required")]
    MissingEmail,
    #[error("password must be at least 6 characters")]
    PasswordTooShort,
    #[error("authentication service unavailable, try again later")]
    Unavailable,
    #[error("backend did not return a user")]
    NoUser,
    #[error(transparent)]
    Backend(#[from] FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub message: String,
    pub session: Option<Session>,
}

fn check_email(email: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::MissingEmail);
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    Ok(())
}

impl AuthRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        match self {
            AuthRequest::SignUp(a) => {
                check_email(&a.email)?;
                check_password(&a.password)
            }
            AuthRequest::SignInWithPassword(c) => {
                check_email(&c.email)?;
                check_password(&c.password)
            }
            AuthRequest::SignInWithOtp(o) => check_email(&o.email),
        }
    }
}

/// Validate, dispatch to the matching backend call through `fetcher`, and
/// open a session when the backend returns a user.
pub fn authenticate(
    backend: &dyn AuthBackend,
    fetcher: &RetryingFetcher,
    request: &AuthRequest,
) -> Result<AuthOutcome, AuthError> {
    request.validate()?;

    let fetched = fetcher.fetch(|| match request {
        AuthRequest::SignUp(args) => backend.sign_up(args),
        AuthRequest::SignInWithPassword(creds) => backend.sign_in_with_password(creds),
        AuthRequest::SignInWithOtp(otp) => backend.sign_in_with_otp(otp),
    })?;
    let Fetched::Data(response) = fetched else {
        return Err(AuthError::Unavailable);
    };

    let outcome = match request {
        AuthRequest::SignUp(args) => AuthOutcome {
            message: format!(
                "User created. Welcome {}",
                args.first_name.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string(),
            session: response.user.map(Session::new),
        },
        AuthRequest::SignInWithPassword(_)
        | AuthRequest::SignInWithOtp(OtpRequest { token: Some(_), .. }) => {
            let user = response.user.ok_or(AuthError::NoUser)?;
            AuthOutcome {
                message: "Logged in. Welcome".to_string(),
                session: Some(Session::new(user)),
            }
        }
        AuthRequest::SignInWithOtp(OtpRequest { email, token: None }) => AuthOutcome {
            message: format!("One-time code sent to {}", email),
            session: None,
        },
    };

    if let Some(session) = &outcome.session {
        info!("Session opened for {}", session.user.email);
    }
    Ok(outcome)
}

/// End the interaction's session.
pub fn sign_out(backend: &dyn AuthBackend, session: Session) -> Result<(), AuthError> {
    backend.sign_out(&session.user)?;
    info!("Session closed for {}", session.user.email);
    Ok(())
}
