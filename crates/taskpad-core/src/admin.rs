use taskpad_shared::{Task, TaskId, User, UserId};
use tracing::{info, instrument};

use crate::client::{ApiClient, Call};
use crate::error::ApiError;
use crate::session::Session;
use crate::transport::Transport;

/// Privileged operations. Role checks are the server's; a 403 comes back as
/// `ApiError::Authorization`.
pub struct AdminClient<'a, T> {
    api: &'a ApiClient<T>,
    session: &'a Session,
}

impl<'a, T: Transport> AdminClient<'a, T> {
    pub fn new(api: &'a ApiClient<T>, session: &'a Session) -> Self {
        Self { api, session }
    }

    fn call(&self, call: Call) -> Call {
        call.bearer(self.session.token())
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.api.fetch(self.call(Call::get("/admin/users"))).await
    }

    #[instrument(skip(self))]
    pub async fn list_all_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.api.fetch(self.call(Call::get("/admin/tasks"))).await
    }

    /// Returns the user as stored after the change. Promoting an admin again
    /// is harmless.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn promote_user(&self, user_id: UserId) -> Result<User, ApiError> {
        let user: User = self
            .api
            .fetch(self.call(Call::post(format!("/admin/promote/{user_id}"))))
            .await?;
        info!(role = user.role.as_str(), "promoted user");
        Ok(user)
    }

    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn force_delete_task(&self, task_id: TaskId) -> Result<(), ApiError> {
        self.api
            .execute_discarding(self.call(Call::delete(format!("/admin/tasks/{task_id}"))))
            .await?;
        info!("force-deleted task");
        Ok(())
    }
}
