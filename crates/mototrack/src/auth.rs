//! Sign-in and account registration against the identity provider.
//!
//! [`IdentityProvider`] is the seam for the remote service. [`AuthService`]
//! validates forms locally, translates provider error codes into localized
//! messages and keeps the signed-in session in [`Preferences`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::i18n::{Language, Messages};
use crate::preferences::{keys, Preferences};
use crate::validation::{validate_login, validate_registration};

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider-assigned user id.
    pub uid: String,
    /// Account email.
    pub email: String,
}

/// Persisted sign-in state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The signed-in user.
    pub user: User,
    /// Bearer token issued by the provider.
    pub id_token: String,
    /// Token used to renew `id_token`, when the provider issues one.
    pub refresh_token: Option<String>,
    /// When the session started.
    pub signed_in_at: DateTime<Utc>,
}

/// Failure reported by an identity provider, before localization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Normalized code such as `auth/wrong-password`.
    pub code: String,
    /// Raw provider message.
    pub message: String,
}

impl ProviderError {
    /// Build a provider error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result of a provider call.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Remote identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> ProviderResult<Session>;

    /// Create an account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> ProviderResult<Session>;

    /// End the session on the provider side.
    async fn sign_out(&self, session: &Session) -> ProviderResult<()>;
}

/// Network failure code shared by both flows.
pub const NETWORK_REQUEST_FAILED: &str = "auth/network-request-failed";

fn login_message(code: &str, messages: &Messages) -> Option<&'static str> {
    Some(match code {
        "auth/user-not-found" => messages.user_not_found,
        "auth/wrong-password" => messages.wrong_password,
        "auth/invalid-email" => messages.email_invalid,
        "auth/user-disabled" => messages.user_disabled,
        "auth/too-many-requests" => messages.too_many_requests,
        NETWORK_REQUEST_FAILED => messages.network_request_failed,
        "auth/invalid-credential" => messages.invalid_credential,
        _ => return None,
    })
}

fn register_message(code: &str, messages: &Messages) -> Option<&'static str> {
    Some(match code {
        "auth/email-already-in-use" => messages.email_in_use,
        "auth/invalid-email" => messages.email_invalid,
        "auth/weak-password" => messages.weak_password,
        NETWORK_REQUEST_FAILED => messages.network_request_failed,
        _ => return None,
    })
}

/// Which form a provider error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    /// Email and password sign-in.
    Login,
    /// Account creation.
    Register,
}

impl AuthFlow {
    fn known_message(self, code: &str, messages: &Messages) -> Option<&'static str> {
        match self {
            Self::Login => login_message(code, messages),
            Self::Register => register_message(code, messages),
        }
    }

    fn fallback(self, messages: &Messages) -> &'static str {
        match self {
            Self::Login => messages.login_failed,
            Self::Register => messages.register_failed,
        }
    }
}

/// Localized message for a provider error.
///
/// Known codes map through the flow's table. Anything else shows the
/// provider's own message, or the flow's generic failure when that is empty.
#[must_use]
pub fn localize(flow: AuthFlow, err: &ProviderError, lang: Language) -> String {
    let messages = lang.messages();
    if let Some(message) = flow.known_message(&err.code, messages) {
        return message.to_string();
    }
    if err.message.trim().is_empty() {
        flow.fallback(messages).to_string()
    } else {
        err.message.clone()
    }
}

/// Sign-in state machine over an [`IdentityProvider`].
pub struct AuthService {
    provider: Box<dyn IdentityProvider>,
    preferences: Preferences,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("preferences", &self.preferences)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Create the service.
    pub fn new(provider: Box<dyn IdentityProvider>, preferences: Preferences) -> Self {
        Self {
            provider,
            preferences,
        }
    }

    fn language(&self) -> Language {
        self.preferences.language()
    }

    fn start_session(&self, session: Session) -> Result<User> {
        self.preferences.store_json(keys::SESSION, &session)?;
        info!(uid = %session.user.uid, "signed in");
        Ok(session.user)
    }

    fn rejected(&self, flow: AuthFlow, err: &ProviderError) -> Error {
        warn!(code = %err.code, ?flow, "identity provider rejected request");
        Error::Auth {
            code: err.code.clone(),
            message: localize(flow, err, self.language()),
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed form without calling the
    /// provider, or [`Error::Auth`] when the provider rejects the credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim();
        validate_login(email, password, self.language())?;
        match self.provider.sign_in(email, password).await {
            Ok(session) => self.start_session(session),
            Err(err) => Err(self.rejected(AuthFlow::Login, &err)),
        }
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed form (including a
    /// confirmation mismatch) without calling the provider, or
    /// [`Error::Auth`] when the provider refuses the account.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User> {
        let email = email.trim();
        validate_registration(email, password, confirm_password, self.language())?;
        match self.provider.sign_up(email, password).await {
            Ok(session) => self.start_session(session),
            Err(err) => Err(self.rejected(AuthFlow::Register, &err)),
        }
    }

    /// Sign out. Provider failures are logged and the local session is
    /// cleared regardless.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local session cannot be removed.
    pub async fn logout(&self) -> Result<()> {
        if let Some(session) = self.session()? {
            if let Err(err) = self.provider.sign_out(&session).await {
                warn!(code = %err.code, message = %err.message, "sign-out failed at provider");
            }
        }
        self.preferences.remove(keys::SESSION)?;
        debug!("session cleared");
        Ok(())
    }

    /// Stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn session(&self) -> Result<Option<Session>> {
        self.preferences.load_json(keys::SESSION)
    }

    /// Signed-in user, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn current_user(&self) -> Result<Option<User>> {
        Ok(self.session()?.map(|session| session.user))
    }

    /// Signed-in user, or [`Error::NotAuthenticated`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] when nobody is signed in.
    pub fn require_user(&self) -> Result<User> {
        self.current_user()?.ok_or(Error::NotAuthenticated)
    }

    /// Check whether a session is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.session()?.is_some())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Normalize an identity toolkit error string to an `auth/...` code.
///
/// The toolkit appends details after a colon (`WEAK_PASSWORD : Password
/// should be at least 6 characters`); only the leading token is matched.
#[must_use]
pub fn normalize_toolkit_error(raw: &str) -> &'static str {
    let token = raw.split(':').next().unwrap_or_default().trim();
    match token {
        "EMAIL_NOT_FOUND" => "auth/user-not-found",
        "INVALID_PASSWORD" => "auth/wrong-password",
        "INVALID_EMAIL" => "auth/invalid-email",
        "USER_DISABLED" => "auth/user-disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "auth/too-many-requests",
        "INVALID_LOGIN_CREDENTIALS" => "auth/invalid-credential",
        "EMAIL_EXISTS" => "auth/email-already-in-use",
        "WEAK_PASSWORD" => "auth/weak-password",
        _ => "auth/internal-error",
    }
}

/// Identity toolkit REST client.
#[derive(Debug, Clone)]
pub struct FirebaseIdentity {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl FirebaseIdentity {
    /// Build a client from the auth configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] when no API key is configured, or
    /// a network error if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig, timeout: std::time::Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::ConfigValidation {
                message: "auth.api_key must be set to sign in".to_string(),
            })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> ProviderResult<Session> {
        let url = format!("{}/v1/accounts:{action}", self.endpoint);
        debug!(action, "identity request");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|err| ProviderError::new(NETWORK_REQUEST_FAILED, err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ProviderError::new(NETWORK_REQUEST_FAILED, err.to_string()))?;

        if !status.is_success() {
            let raw = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_default();
            return Err(ProviderError::new(normalize_toolkit_error(&raw), raw));
        }

        let account: AccountResponse = serde_json::from_str(&body)
            .map_err(|err| ProviderError::new("auth/internal-error", err.to_string()))?;
        Ok(Session {
            user: User {
                uid: account.local_id,
                email: account.email,
            },
            id_token: account.id_token,
            refresh_token: account.refresh_token,
            signed_in_at: Utc::now(),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> ProviderResult<Session> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> ProviderResult<Session> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_out(&self, _session: &Session) -> ProviderResult<()> {
        // ID tokens are stateless; dropping the local session is enough.
        Ok(())
    }
}
