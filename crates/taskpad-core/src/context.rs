use taskpad_shared::User;
use tracing::debug;

use crate::admin::AdminClient;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::session::SessionStore;
use crate::storage::TokenStore;
use crate::tasks::TaskClient;
use crate::transport::Transport;

/// API client plus the one session, handed to every view controller.
pub struct AppContext<T, S> {
    pub api: ApiClient<T>,
    pub session: SessionStore<S>,
}

impl<T: Transport, S: TokenStore> AppContext<T, S> {
    pub fn new(transport: T, storage: S) -> Self {
        Self {
            api: ApiClient::new(transport),
            session: SessionStore::new(storage),
        }
    }

    pub fn tasks(&self) -> TaskClient<'_, T> {
        TaskClient::new(&self.api, self.session.session())
    }

    pub fn admin(&self) -> AdminClient<'_, T> {
        AdminClient::new(&self.api, self.session.session())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, ApiError> {
        self.session
            .login(&self.api, email, password)
            .await
            .map(|response| response.user)
    }

    pub async fn register(&mut self, email: &str, password: &str, name: &str) -> Result<User, ApiError> {
        self.session.register(&self.api, email, password, name).await
    }

    pub fn logout(&mut self) {
        self.session.logout();
    }

    /// Page gate: the signed-in user, resolving it from the token if needed.
    /// `Unauthenticated` means the page should send the user to login.
    pub async fn current_user(&mut self) -> Result<User, ApiError> {
        if let Some(user) = self.session.session().user() {
            return Ok(user.clone());
        }
        if self.session.session().token().is_none() {
            debug!("no token; page needs login");
            return Err(ApiError::Unauthenticated);
        }
        self.session.refresh(&self.api).await
    }
}
