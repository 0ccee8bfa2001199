use std::sync::LazyLock;

use regex::Regex;
use taskpad_shared::{LoginRequest, LoginResponse, RegisterRequest, User};
use tracing::{info, instrument, warn};

use crate::client::{ApiClient, Call};
use crate::error::ApiError;
use crate::storage::TokenStore;
use crate::transport::Transport;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email pattern compiles"));

/// Current authentication state. A `user` is only ever held together with the
/// token it was resolved from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    token: Option<String>,
    user: Option<User>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

pub struct SessionStore<S> {
    session: Session,
    storage: S,
}

impl<S: TokenStore> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            session: Session::default(),
            storage,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Picks up a token left by an earlier run. Identity stays unresolved
    /// until `refresh`.
    #[instrument(skip(self))]
    pub fn restore(&mut self) -> Result<bool, ApiError> {
        let token = self
            .storage
            .load()
            .map_err(|err| ApiError::Storage(format!("{err:#}")))?;
        let found = token.is_some();
        self.session = Session { token, user: None };
        info!(found, "restored session token");
        Ok(found)
    }

    #[instrument(skip(self, api, password))]
    pub async fn register<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, ApiError> {
        let email = email.trim();
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("name is required"));
        }
        check_credentials(email, password)?;

        let user: User = api
            .fetch(Call::post("/auth/register").credentials().json(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
            })?)
            .await?;
        info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    #[instrument(skip(self, api, password))]
    pub async fn login<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let email = email.trim();
        check_credentials(email, password)?;

        let response: LoginResponse = api
            .fetch(Call::post("/auth/login").credentials().json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?)
            .await?;

        self.storage
            .save(&response.token)
            .map_err(|err| ApiError::Storage(format!("{err:#}")))?;
        self.session = Session {
            token: Some(response.token.clone()),
            user: Some(response.user.clone()),
        };
        info!(user_id = %response.user.id, role = response.user.role.as_str(), "logged in");
        Ok(response)
    }

    /// Re-resolves identity from the stored token. A rejected token collapses
    /// the session before the error is returned.
    #[instrument(skip(self, api))]
    pub async fn refresh<T: Transport>(&mut self, api: &ApiClient<T>) -> Result<User, ApiError> {
        let Some(token) = self.session.token.clone() else {
            return Err(ApiError::Unauthenticated);
        };

        match api.fetch::<User>(Call::get("/auth/me").bearer(Some(&token))).await {
            Ok(user) => {
                self.session.user = Some(user.clone());
                Ok(user)
            }
            Err(err) => {
                self.absorb(&err);
                Err(err)
            }
        }
    }

    /// Local only; always leaves the session unauthenticated.
    #[instrument(skip(self))]
    pub fn logout(&mut self) {
        self.session = Session::default();
        if let Err(err) = self.storage.clear() {
            warn!(error = %err, "failed clearing stored token");
        }
        info!("logged out");
    }

    /// Collapses the session when `err` says the token is no longer accepted.
    /// Returns whether that happened.
    pub fn absorb(&mut self, err: &ApiError) -> bool {
        if err.is_unauthenticated() {
            warn!("token rejected by the server; clearing session");
            self.logout();
            true
        } else {
            false
        }
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if !EMAIL_SHAPE.is_match(email) {
        return Err(ApiError::validation("a valid email address is required"));
    }
    if password.is_empty() {
        return Err(ApiError::validation("password is required"));
    }
    Ok(())
}
