//! Authentication session and the login form flow

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::io::HttpClient;
use crate::models::{LoginResponse, User};
use crate::navigation::{Navigator, Route};

/// Bearer token shared between the session and the data provider
pub type TokenHandle = Arc<RwLock<Option<String>>>;

pub fn new_token_handle() -> TokenHandle {
    Arc::new(RwLock::new(None))
}

/// Authentication session collaborator
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Session: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> crate::Result<LoginResponse>;

    async fn current_user(&self) -> Option<User>;

    async fn logout(&self);

    async fn is_authenticated(&self) -> bool;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Session backed by the dashboard REST API
pub struct HttpSession {
    login_url: String,
    http: Arc<dyn HttpClient>,
    token: TokenHandle,
    user: RwLock<Option<User>>,
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("login_url", &self.login_url)
            .finish()
    }
}

impl HttpSession {
    pub fn new(base_url: &str, http: Arc<dyn HttpClient>, token: TokenHandle) -> Self {
        Self {
            login_url: format!("{}/api/auth/login", base_url.trim_end_matches('/')),
            http,
            token,
            user: RwLock::new(None),
        }
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn login(&self, email: &str, password: &str) -> crate::Result<LoginResponse> {
        let body = serde_json::to_string(&LoginRequest { email, password })?;
        tracing::debug!("Logging in as {}", email);
        let response = self.http.post_json(&self.login_url, &body).await?;

        if !response.is_success() {
            return Err(crate::SitewatchError::Status {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: LoginResponse = serde_json::from_str(&response.body)?;
        if let Some(token) = &parsed.auth_token {
            *self.token.write().await = Some(token.clone());
            *self.user.write().await = parsed.user.clone();
            tracing::info!("Logged in as {}", email);
        }
        Ok(parsed)
    }

    async fn current_user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    async fn logout(&self) {
        *self.token.write().await = None;
        *self.user.write().await = None;
        tracing::info!("Logged out");
    }

    async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }
}

/// Result of submitting the login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated,
    Rejected(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    msg: Option<String>,
}

fn server_msg(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.msg)
        .filter(|m| !m.is_empty())
}

/// Translate a failed login request into the message shown to the user
pub fn login_error_message(err: &crate::SitewatchError) -> String {
    match err {
        crate::SitewatchError::Status { status: 401, body } => server_msg(body)
            .unwrap_or_else(|| "Invalid email or password. Please try again.".to_string()),
        crate::SitewatchError::Status { status: 403, body } => server_msg(body).unwrap_or_else(
            || "Your account is inactive. Please contact your administrator.".to_string(),
        ),
        crate::SitewatchError::Status { body, .. } => server_msg(body).unwrap_or_else(|| {
            "Login failed. Please check your connection and try again.".to_string()
        }),
        _ => "Login failed. Please check your connection and try again.".to_string(),
    }
}

/// State of the login view
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub show_password: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            ..Self::default()
        }
    }

    /// Skip the form entirely when a session already exists
    pub async fn on_enter(&self, session: &dyn Session, navigator: &dyn Navigator) -> bool {
        if session.is_authenticated().await {
            tracing::debug!("Already authenticated, redirecting to projects");
            navigator.navigate(Route::Projects);
            return true;
        }
        false
    }

    pub fn toggle_password_visibility(&mut self) {
        self.show_password = !self.show_password;
    }

    pub async fn submit(
        &mut self,
        session: &dyn Session,
        navigator: &dyn Navigator,
    ) -> LoginOutcome {
        if self.email.is_empty() || self.password.is_empty() {
            return self.reject("Please enter both email and password".to_string());
        }

        self.is_loading = true;
        self.error = None;
        let result = session.login(&self.email, &self.password).await;
        self.is_loading = false;

        match result {
            Ok(response) if response.phone_required => self.reject(response.msg.unwrap_or_else(
                || "Phone verification required. Please contact your administrator.".to_string(),
            )),
            Ok(response) if response.auth_token.is_some() => {
                navigator.navigate(Route::Projects);
                LoginOutcome::Authenticated
            }
            Ok(_) => self.reject("Login failed: No authentication token received".to_string()),
            Err(e) => {
                tracing::error!("Login error: {}", e);
                self.reject(login_error_message(&e))
            }
        }
    }

    fn reject(&mut self, message: String) -> LoginOutcome {
        self.error = Some(message.clone());
        LoginOutcome::Rejected(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};
    use crate::testing::RecordingNavigator;

    fn status(status: u16, body: &str) -> crate::SitewatchError {
        crate::SitewatchError::Status {
            status,
            body: body.to_string(),
        }
    }

    fn session_returning(
        result: impl Fn() -> crate::Result<LoginResponse> + Send + 'static,
    ) -> MockSession {
        let mut session = MockSession::new();
        session.expect_login().returning(move |_, _| {
            let r = result();
            Box::pin(async move { r })
        });
        session
    }

    #[tokio::test]
    async fn empty_fields_never_reach_the_session() {
        let session = MockSession::new();
        let navigator = RecordingNavigator::default();
        let mut form = LoginForm::new("", "secret");

        let outcome = form.submit(&session, &navigator).await;
        assert_eq!(
            outcome,
            LoginOutcome::Rejected("Please enter both email and password".to_string())
        );
        assert!(navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn token_navigates_to_projects() {
        let session = session_returning(|| {
            Ok(LoginResponse {
                auth_token: Some("tok".to_string()),
                ..LoginResponse::default()
            })
        });
        let navigator = RecordingNavigator::default();
        let mut form = LoginForm::new("a@b.c", "pw");

        assert_eq!(
            form.submit(&session, &navigator).await,
            LoginOutcome::Authenticated
        );
        assert_eq!(navigator.routes(), vec![Route::Projects]);
        assert!(!form.is_loading);
        assert!(form.error.is_none());
    }

    #[tokio::test]
    async fn phone_verification_uses_server_message() {
        let session = session_returning(|| {
            Ok(LoginResponse {
                phone_required: true,
                msg: Some("Verify your phone".to_string()),
                ..LoginResponse::default()
            })
        });
        let navigator = RecordingNavigator::default();
        let mut form = LoginForm::new("a@b.c", "pw");

        let outcome = form.submit(&session, &navigator).await;
        assert_eq!(outcome, LoginOutcome::Rejected("Verify your phone".to_string()));
        assert_eq!(form.error.as_deref(), Some("Verify your phone"));
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let session = session_returning(|| Ok(LoginResponse::default()));
        let navigator = RecordingNavigator::default();
        let mut form = LoginForm::new("a@b.c", "pw");

        assert_eq!(
            form.submit(&session, &navigator).await,
            LoginOutcome::Rejected("Login failed: No authentication token received".to_string())
        );
    }

    #[test]
    fn error_messages_by_status() {
        assert_eq!(
            login_error_message(&status(401, "")),
            "Invalid email or password. Please try again."
        );
        assert_eq!(
            login_error_message(&status(401, r#"{"msg": "Wrong password"}"#)),
            "Wrong password"
        );
        assert_eq!(
            login_error_message(&status(403, "{}")),
            "Your account is inactive. Please contact your administrator."
        );
        assert_eq!(
            login_error_message(&status(500, r#"{"msg": "Database down"}"#)),
            "Database down"
        );
        assert_eq!(
            login_error_message(&crate::SitewatchError::Http("refused".to_string())),
            "Login failed. Please check your connection and try again."
        );
    }

    #[tokio::test]
    async fn authenticated_user_skips_login() {
        let mut session = MockSession::new();
        session
            .expect_is_authenticated()
            .returning(|| Box::pin(async { true }));
        let navigator = RecordingNavigator::default();

        assert!(LoginForm::default().on_enter(&session, &navigator).await);
        assert_eq!(navigator.routes(), vec![Route::Projects]);
    }

    #[tokio::test]
    async fn http_session_stores_token_and_logs_out() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|url, body| url == "http://api.test/api/auth/login" && body.contains("a@b.c"))
            .returning(|_, _| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: r#"{"authToken": "tok", "user": {"name": "Amar", "email": "a@b.c"}}"#
                            .to_string(),
                    })
                })
            });

        let token = new_token_handle();
        let session = HttpSession::new("http://api.test", Arc::new(mock), Arc::clone(&token));
        session.login("a@b.c", "pw").await.unwrap();

        assert!(session.is_authenticated().await);
        assert_eq!(token.read().await.as_deref(), Some("tok"));
        assert_eq!(session.current_user().await.unwrap().name, "Amar");

        session.logout().await;
        assert!(!session.is_authenticated().await);
        assert!(session.current_user().await.is_none());
    }

    #[tokio::test]
    async fn http_session_surfaces_status_errors() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json().returning(|_, _| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 401,
                    body: r#"{"msg": "nope"}"#.to_string(),
                })
            })
        });

        let session = HttpSession::new("http://api.test", Arc::new(mock), new_token_handle());
        let err = session.login("a@b.c", "pw").await.unwrap_err();
        assert_eq!(login_error_message(&err), "nope");
        assert!(!session.is_authenticated().await);
    }
}
