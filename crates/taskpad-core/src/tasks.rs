use taskpad_shared::{NewTask, Task, TaskId, TaskPatch, TaskStatus};
use tracing::{debug, instrument};

use crate::client::{ApiClient, Call};
use crate::error::ApiError;
use crate::session::Session;
use crate::transport::Transport;

/// Task CRUD for the signed-in user. Ownership scoping comes from the bearer
/// token alone.
pub struct TaskClient<'a, T> {
    api: &'a ApiClient<T>,
    session: &'a Session,
}

impl<'a, T: Transport> TaskClient<'a, T> {
    pub fn new(api: &'a ApiClient<T>, session: &'a Session) -> Self {
        Self { api, session }
    }

    fn call(&self, call: Call) -> Call {
        call.bearer(self.session.token())
    }

    #[instrument(skip(self, task), fields(title_len = task.title.len(), priority = %task.priority, has_due = task.due_date.is_some()))]
    pub async fn create(&self, task: &NewTask) -> Result<Task, ApiError> {
        ensure_title(&task.title)?;
        let created: Task = self.api.fetch(self.call(Call::post("/tasks")).json(task)?).await?;
        debug!(task_id = %created.id, "created task");
        Ok(created)
    }

    /// Delivered order is kept as-is.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Task>, ApiError> {
        let tasks: Vec<Task> = self.api.fetch(self.call(Call::get("/tasks"))).await?;
        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn get_by_id(&self, id: TaskId) -> Result<Task, ApiError> {
        self.api.fetch(self.call(Call::get(format!("/tasks/{id}")))).await
    }

    #[instrument(skip(self, patch), fields(task_id = %id))]
    pub async fn update(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        if let Some(title) = patch.title.as_deref() {
            ensure_title(title)?;
        }
        self.api
            .fetch(self.call(Call::put(format!("/tasks/{id}"))).json(patch)?)
            .await
    }

    pub async fn set_status(&self, id: TaskId, status: TaskStatus) -> Result<Task, ApiError> {
        self.update(id, &TaskPatch::status(status)).await
    }

    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn delete(&self, id: TaskId) -> Result<(), ApiError> {
        self.api
            .execute_discarding(self.call(Call::delete(format!("/tasks/{id}"))))
            .await
    }
}

pub(crate) fn ensure_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::validation("title is required"));
    }
    Ok(())
}
