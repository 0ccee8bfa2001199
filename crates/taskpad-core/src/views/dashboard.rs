use taskpad_shared::{NewTask, Task, TaskId, TaskPriority, TaskStatus};
use tracing::{info, instrument};

use super::{Failure, Navigation, PageState, classify, optional_text, parse_due_date};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::storage::TokenStore;
use crate::tasks::ensure_title;
use crate::transport::Transport;

/// Local list filters. They hide rows but never reorder them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub search: String,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }

        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }

        let query = self.search.trim().to_lowercase();
        if !query.is_empty() {
            let in_title = task.title.to_lowercase().contains(&query);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query));
            if !in_title && !in_description {
                return false;
            }
        }

        true
    }
}

/// The create form, as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub due_date: String,
}

impl TaskDraft {
    pub fn to_new_task(&self) -> Result<NewTask, ApiError> {
        ensure_title(&self.title)?;
        Ok(NewTask {
            title: self.title.trim().to_string(),
            description: optional_text(&self.description),
            priority: self.priority,
            due_date: parse_due_date(&self.due_date)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed
    }
}

/// The signed-in user's own task list.
#[derive(Debug, Clone)]
pub struct Dashboard {
    state: PageState<Vec<Task>>,
    pub filter: TaskFilter,
    pub draft: TaskDraft,
    message: Option<String>,
    last_created: Option<TaskId>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            state: PageState::Loading,
            filter: TaskFilter::default(),
            draft: TaskDraft::default(),
            message: None,
            last_created: None,
        }
    }

    pub fn state(&self) -> &PageState<Vec<Task>> {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        self.state.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks().iter().filter(|task| self.filter.matches(task)).collect()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for task in self.tasks() {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }

    /// Id of the task the last successful draft submission created, as the
    /// server returned it. The list order says nothing about this.
    pub fn last_created(&self) -> Option<TaskId> {
        self.last_created
    }

    /// The one message this page shows: a load failure, else the last
    /// failed action.
    pub fn message(&self) -> Option<&str> {
        self.state.error_message().or(self.message.as_deref())
    }

    #[instrument(skip_all)]
    pub async fn load<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        self.state = PageState::Loading;
        if let Err(err) = ctx.current_user().await {
            return self.fail_load(ctx, err);
        }
        self.reload(ctx).await
    }

    async fn reload<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        self.state = PageState::Loading;
        let result = ctx.tasks().list().await;
        match result {
            Ok(tasks) => {
                self.state = PageState::Ready(tasks);
                Navigation::Stay
            }
            Err(err) => self.fail_load(ctx, err),
        }
    }

    /// Creates a task from the draft. The draft is kept when anything fails.
    #[instrument(skip_all)]
    pub async fn submit_draft<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        self.last_created = None;
        let new_task = match self.draft.to_new_task() {
            Ok(new_task) => new_task,
            Err(err) => {
                self.message = Some(err.to_string());
                return Navigation::Stay;
            }
        };

        let result = ctx.tasks().create(&new_task).await;
        match result {
            Ok(task) => {
                info!(task_id = %task.id, "task created from dashboard");
                self.last_created = Some(task.id);
                self.draft = TaskDraft::default();
                self.message = None;
                self.reload(ctx).await
            }
            Err(err) => self.fail_action(ctx, err),
        }
    }

    /// Status selector fast path: a single-field update, no edit form.
    #[instrument(skip(self, ctx))]
    pub async fn set_status<T: Transport, S: TokenStore>(
        &mut self,
        ctx: &mut AppContext<T, S>,
        id: TaskId,
        status: TaskStatus,
    ) -> Navigation {
        let result = ctx.tasks().set_status(id, status).await;
        match result {
            Ok(_) => {
                self.message = None;
                self.reload(ctx).await
            }
            Err(err) => self.fail_action(ctx, err),
        }
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>, id: TaskId) -> Navigation {
        let result = ctx.tasks().delete(id).await;
        match result {
            Ok(()) => {
                self.message = None;
                self.reload(ctx).await
            }
            Err(err) => self.fail_action(ctx, err),
        }
    }

    fn fail_load<T, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>, err: ApiError) -> Navigation {
        match classify(&mut ctx.session, err) {
            Failure::Redirect => {
                self.state = PageState::Unauthenticated;
                Navigation::Login
            }
            Failure::Forbidden(message) | Failure::Inline(message) => {
                self.state = PageState::Error(message);
                Navigation::Stay
            }
        }
    }

    fn fail_action<T, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>, err: ApiError) -> Navigation {
        match classify(&mut ctx.session, err) {
            Failure::Redirect => {
                self.state = PageState::Unauthenticated;
                Navigation::Login
            }
            Failure::Forbidden(message) | Failure::Inline(message) => {
                self.message = Some(message);
                Navigation::Stay
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use taskpad_shared::UserId;

    use super::*;

    fn task(id: i64, title: &str, status: TaskStatus, priority: TaskPriority) -> Task {
        Task {
            id: TaskId(id),
            user_id: UserId(1),
            title: title.to_string(),
            description: None,
            status,
            priority,
            due_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filters_keep_delivered_order() {
        let mut dashboard = Dashboard::new();
        dashboard.state = PageState::Ready(vec![
            task(3, "Water plants", TaskStatus::Pending, TaskPriority::Low),
            task(1, "File taxes", TaskStatus::Completed, TaskPriority::High),
            task(2, "water the lawn", TaskStatus::Pending, TaskPriority::Medium),
        ]);

        dashboard.filter.search = "WATER".to_string();
        let ids: Vec<i64> = dashboard.visible_tasks().iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![3, 2]);

        dashboard.filter.priority = Some(TaskPriority::Medium);
        let ids: Vec<i64> = dashboard.visible_tasks().iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![2]);

        let counts = dashboard.counts();
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn draft_rejects_blank_title_and_bad_date() {
        let mut draft = TaskDraft {
            title: "   ".to_string(),
            ..TaskDraft::default()
        };
        assert_eq!(draft.to_new_task(), Err(ApiError::validation("title is required")));

        draft.title = " Buy milk ".to_string();
        draft.due_date = "tomorrow".to_string();
        assert!(draft.to_new_task().is_err());

        draft.due_date = String::new();
        draft.description = "  ".to_string();
        let new_task = draft.to_new_task().expect("valid draft");
        assert_eq!(new_task.title, "Buy milk");
        assert_eq!(new_task.description, None);
        assert_eq!(new_task.priority, TaskPriority::Medium);
    }
}
