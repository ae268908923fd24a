//! Login, sign-up and password recovery, with the checks that run before any
//! request is made.

use std::sync::Arc;

use crate::backend::models::{AuthUser, Session, SignUpOutcome};
use crate::backend::{AuthApi, ProfileTable};
use crate::error::{AppError, AppResult};

const FILL_ALL_FIELDS: &str = "Please fill in all fields";
const PASSWORDS_DIFFER: &str = "Passwords do not match";
const ENTER_EMAIL: &str = "Please enter your email";

pub const CONNECTION_HELP: &str = "Could not reach the server. Try:\n\n\
• Checking your network connection\n\
• Turning off VPN or proxy\n\
• Checking backend.url in your config\n\
• Running the command again, or from another network";

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
}

pub fn validate_login(email: &str, password: &str) -> AppResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::validation(FILL_ALL_FIELDS));
    }
    Ok(())
}

pub fn validate_sign_up(form: &SignUpForm) -> AppResult<()> {
    if form.email.trim().is_empty() || form.password.is_empty() || form.full_name.trim().is_empty()
    {
        return Err(AppError::validation(FILL_ALL_FIELDS));
    }
    if form.password != form.confirm_password {
        return Err(AppError::validation(PASSWORDS_DIFFER));
    }
    Ok(())
}

pub fn validate_recovery(email: &str) -> AppResult<()> {
    if email.trim().is_empty() {
        return Err(AppError::validation(ENTER_EMAIL));
    }
    Ok(())
}

/// Title and body to show for a failed account action.
pub fn friendly_message(err: &AppError) -> (&'static str, String) {
    if err.is_network() {
        return ("Connection error", CONNECTION_HELP.to_string());
    }
    let message = match err {
        AppError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
        AppError::Api { .. } => String::new(),
        other => other.to_string(),
    };
    if message.trim().is_empty() {
        ("Error", "An unexpected error occurred".to_string())
    } else {
        ("Error", message)
    }
}

/// Render a failed account action as its title and body.
pub fn account_failure(err: AppError) -> anyhow::Error {
    let (title, body) = friendly_message(&err);
    anyhow::anyhow!("{title}: {body}")
}

#[derive(Clone)]
pub struct AccountService {
    auth: Arc<dyn AuthApi>,
    profiles: Arc<dyn ProfileTable>,
}

impl AccountService {
    pub fn new(auth: Arc<dyn AuthApi>, profiles: Arc<dyn ProfileTable>) -> Self {
        Self { auth, profiles }
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        validate_login(email, password)?;
        let session = self.auth.sign_in(email.trim(), password).await?;
        tracing::info!("signed in as {}", session.user.id);
        Ok(session)
    }

    /// Create the account, then its profile row. A profile write failure is
    /// logged; the account exists either way.
    pub async fn sign_up(&self, form: &SignUpForm) -> AppResult<SignUpOutcome> {
        validate_sign_up(form)?;
        let outcome = self.auth.sign_up(form.email.trim(), &form.password).await?;
        let user = outcome.user();
        if let Err(e) = self
            .profiles
            .upsert_name(&user.id, form.full_name.trim())
            .await
        {
            tracing::warn!("creating profile for {} failed: {e}", user.id);
        }
        Ok(outcome)
    }

    pub async fn recover(&self, email: &str) -> AppResult<()> {
        validate_recovery(email)?;
        self.auth.request_password_reset(email.trim()).await
    }

    pub async fn sign_out(&self) -> AppResult<()> {
        self.auth.sign_out().await
    }

    pub async fn current_user(&self) -> AppResult<Option<AuthUser>> {
        self.auth.current_user().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use std::sync::atomic::Ordering;

    fn form() -> SignUpForm {
        SignUpForm {
            email: "ada@example.com".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
            full_name: "  Ada Lovelace ".into(),
        }
    }

    #[test]
    fn validation_messages() {
        assert_eq!(
            validate_login("", "x").unwrap_err().to_string(),
            "Please fill in all fields"
        );
        let mut f = form();
        f.full_name = " ".into();
        assert_eq!(
            validate_sign_up(&f).unwrap_err().to_string(),
            "Please fill in all fields"
        );
        let mut f = form();
        f.confirm_password = "other".into();
        assert_eq!(
            validate_sign_up(&f).unwrap_err().to_string(),
            "Passwords do not match"
        );
        assert_eq!(
            validate_recovery("  ").unwrap_err().to_string(),
            "Please enter your email"
        );
        assert!(validate_sign_up(&form()).is_ok());
    }

    #[tokio::test]
    async fn sign_up_creates_a_trimmed_profile() {
        let backend = Arc::new(MemoryBackend::default());
        let accounts = AccountService::new(backend.clone(), backend.clone());
        let outcome = accounts.sign_up(&form()).await.unwrap();
        let id = outcome.user().id.clone();
        assert_eq!(
            backend.profiles.lock().unwrap()[&id].full_name.as_deref(),
            Some("Ada Lovelace")
        );
    }

    #[tokio::test]
    async fn profile_write_failure_does_not_fail_sign_up() {
        let backend = Arc::new(MemoryBackend::default());
        backend.fail_writes.store(true, Ordering::SeqCst);
        let accounts = AccountService::new(backend.clone(), backend.clone());
        assert!(accounts.sign_up(&form()).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_backend() {
        let backend = Arc::new(MemoryBackend::default());
        let accounts = AccountService::new(backend.clone(), backend.clone());
        assert!(accounts.login("ada@example.com", "").await.is_err());
        assert!(backend.user.lock().unwrap().is_none());
    }

    #[test]
    fn non_network_errors_show_their_message() {
        let err = AppError::Api {
            service: "auth",
            status: 400,
            message: "Invalid login credentials".into(),
        };
        assert_eq!(
            friendly_message(&err),
            ("Error", "Invalid login credentials".to_string())
        );
        let blank = AppError::Api {
            service: "auth",
            status: 500,
            message: String::new(),
        };
        assert_eq!(friendly_message(&blank).1, "An unexpected error occurred");
    }

    #[tokio::test]
    async fn unreachable_server_gets_connection_guidance() {
        let http = reqwest::Client::new();
        let err = AppError::from(http.get("http://127.0.0.1:1/").send().await.unwrap_err());
        assert!(err.is_network());
        assert_eq!(
            friendly_message(&err),
            ("Connection error", CONNECTION_HELP.to_string())
        );
        assert!(account_failure(err)
            .to_string()
            .starts_with("Connection error: Could not reach the server."));
    }

    #[test]
    fn validation_failures_keep_their_text() {
        let err = account_failure(AppError::validation("Passwords do not match"));
        assert_eq!(err.to_string(), "Error: Passwords do not match");
    }

    #[tokio::test]
    async fn login_trims_the_email_and_keeps_the_session_user() {
        let backend = Arc::new(MemoryBackend::default());
        let accounts = AccountService::new(backend.clone(), backend.clone());
        let session = accounts.login(" ada@example.com ", "secret").await.unwrap();
        assert_eq!(session.user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(backend.user.lock().unwrap().as_ref(), Some(&session.user));
    }
}
