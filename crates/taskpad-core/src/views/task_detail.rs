use taskpad_shared::{Task, TaskId, TaskPatch, TaskPriority, TaskStatus};
use tracing::{debug, info, instrument};

use super::{Failure, Navigation, PageState, classify, optional_text, parse_due_date};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::storage::TokenStore;
use crate::tasks::ensure_title;
use crate::transport::Transport;

/// Form copy of a task's editable fields. Edits stay here until a save is
/// confirmed by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: String,
    baseline: Task,
}

impl EditBuffer {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            status: task.status,
            priority: task.priority,
            due_date: task
                .due_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            baseline: task.clone(),
        }
    }

    /// The task as it was when editing began.
    pub fn baseline(&self) -> &Task {
        &self.baseline
    }

    /// Only the fields changed since editing began. Changes made meanwhile
    /// through the status fast path are not undone.
    pub fn to_patch(&self) -> Result<TaskPatch, ApiError> {
        let base = &self.baseline;
        let mut patch = TaskPatch::default();

        // Stored text is compared in the same trimmed form the form submits,
        // so untouched fields never go out.
        let title = self.title.trim();
        ensure_title(title)?;
        if title != base.title.trim() {
            patch.title = Some(title.to_string());
        }

        let description = optional_text(&self.description);
        if description != base.description.as_deref().and_then(optional_text) {
            patch.description = Some(description);
        }

        if self.status != base.status {
            patch.status = Some(self.status);
        }
        if self.priority != base.priority {
            patch.priority = Some(self.priority);
        }

        let due_date = parse_due_date(&self.due_date)?;
        if due_date != base.due_date {
            patch.due_date = Some(due_date);
        }

        Ok(patch)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditMode {
    Viewing,
    Editing(EditBuffer),
}

/// One task, with view and edit modes.
#[derive(Debug, Clone)]
pub struct TaskDetail {
    task_id: TaskId,
    state: PageState<Task>,
    mode: EditMode,
    message: Option<String>,
}

impl TaskDetail {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            state: PageState::Loading,
            mode: EditMode::Viewing,
            message: None,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn state(&self) -> &PageState<Task> {
        &self.state
    }

    pub fn task(&self) -> Option<&Task> {
        self.state.ready()
    }

    pub fn mode(&self) -> &EditMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, EditMode::Editing(_))
    }

    pub fn buffer_mut(&mut self) -> Option<&mut EditBuffer> {
        match &mut self.mode {
            EditMode::Editing(buffer) => Some(buffer),
            EditMode::Viewing => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.state.error_message().or(self.message.as_deref())
    }

    #[instrument(skip_all, fields(task_id = %self.task_id))]
    pub async fn load<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        self.state = PageState::Loading;
        if let Err(err) = ctx.current_user().await {
            return self.fail_load(ctx, err);
        }
        self.reload(ctx).await
    }

    async fn reload<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        let result = ctx.tasks().get_by_id(self.task_id).await;
        match result {
            Ok(task) => {
                self.state = PageState::Ready(task);
                Navigation::Stay
            }
            Err(err) => self.fail_load(ctx, err),
        }
    }

    /// No-op unless the task is loaded.
    pub fn begin_edit(&mut self) -> bool {
        let Some(task) = self.state.ready() else {
            return false;
        };
        self.mode = EditMode::Editing(EditBuffer::from_task(task));
        self.message = None;
        true
    }

    pub fn cancel_edit(&mut self) {
        self.mode = EditMode::Viewing;
        self.message = None;
    }

    /// Sends the changed fields. Success leaves edit mode and refetches; any
    /// failure other than an expired session keeps the buffer and shows the
    /// error inline.
    #[instrument(skip_all, fields(task_id = %self.task_id))]
    pub async fn save<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        let EditMode::Editing(buffer) = &self.mode else {
            return Navigation::Stay;
        };

        let patch = match buffer.to_patch() {
            Ok(patch) => patch,
            Err(err) => {
                self.message = Some(err.to_string());
                return Navigation::Stay;
            }
        };

        if patch.is_empty() {
            debug!("nothing changed; leaving edit mode");
            self.cancel_edit();
            return Navigation::Stay;
        }

        let result = ctx.tasks().update(self.task_id, &patch).await;
        match result {
            Ok(_) => {
                info!("saved task edits");
                self.cancel_edit();
                self.reload(ctx).await
            }
            Err(err) => match classify(&mut ctx.session, err) {
                Failure::Redirect => self.redirect(),
                Failure::Forbidden(message) | Failure::Inline(message) => {
                    self.message = Some(message);
                    Navigation::Stay
                }
            },
        }
    }

    /// Status selector fast path, independent of the edit mode. An open edit
    /// buffer is left as it is.
    #[instrument(skip(self, ctx), fields(task_id = %self.task_id))]
    pub async fn set_status<T: Transport, S: TokenStore>(
        &mut self,
        ctx: &mut AppContext<T, S>,
        status: TaskStatus,
    ) -> Navigation {
        let result = ctx.tasks().set_status(self.task_id, status).await;
        match result {
            Ok(_) => {
                self.message = None;
                self.reload(ctx).await
            }
            Err(err) => self.fail_action(ctx, err),
        }
    }

    #[instrument(skip_all, fields(task_id = %self.task_id))]
    pub async fn delete<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        let result = ctx.tasks().delete(self.task_id).await;
        match result {
            Ok(()) => {
                info!("deleted task");
                self.state = PageState::Loading;
                self.mode = EditMode::Viewing;
                self.message = None;
                Navigation::Dashboard
            }
            Err(err) => self.fail_action(ctx, err),
        }
    }

    fn redirect(&mut self) -> Navigation {
        self.state = PageState::Unauthenticated;
        self.mode = EditMode::Viewing;
        Navigation::Login
    }

    fn fail_load<T, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>, err: ApiError) -> Navigation {
        match classify(&mut ctx.session, err) {
            Failure::Redirect => self.redirect(),
            Failure::Forbidden(message) | Failure::Inline(message) => {
                self.state = PageState::Error(message);
                Navigation::Stay
            }
        }
    }

    fn fail_action<T, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>, err: ApiError) -> Navigation {
        match classify(&mut ctx.session, err) {
            Failure::Redirect => self.redirect(),
            Failure::Forbidden(message) | Failure::Inline(message) => {
                self.message = Some(message);
                Navigation::Stay
            }
        }
    }
}
