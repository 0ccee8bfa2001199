use taskpad_shared::{Task, TaskId, User, UserId};
use tracing::{info, instrument, warn};

use super::{Failure, Navigation, PageState, classify};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::storage::TokenStore;
use crate::transport::Transport;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminData {
    pub users: Vec<User>,
    pub tasks: Vec<Task>,
}

impl AdminData {
    pub fn owner_of(&self, task: &Task) -> Option<&User> {
        self.users.iter().find(|user| user.id == task.user_id)
    }
}

/// Users and every task, for administrators. Any 403 switches the page to
/// `Forbidden` and the privileged data is dropped.
#[derive(Debug, Clone)]
pub struct AdminPanel {
    state: PageState<AdminData>,
    message: Option<String>,
}

impl Default for AdminPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminPanel {
    pub fn new() -> Self {
        Self {
            state: PageState::Loading,
            message: None,
        }
    }

    pub fn state(&self) -> &PageState<AdminData> {
        &self.state
    }

    pub fn data(&self) -> Option<&AdminData> {
        self.state.ready()
    }

    pub fn message(&self) -> Option<&str> {
        self.state.error_message().or(self.message.as_deref())
    }

    #[instrument(skip_all)]
    pub async fn load<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        self.state = PageState::Loading;
        let mut user = match ctx.current_user().await {
            Ok(user) => user,
            Err(err) => return self.fail_load(ctx, err),
        };
        if !user.is_admin() {
            // The cached role may predate a promotion.
            let refreshed = ctx.session.refresh(&ctx.api).await;
            user = match refreshed {
                Ok(user) => user,
                Err(err) => return self.fail_load(ctx, err),
            };
        }
        if !user.is_admin() {
            warn!(user_id = %user.id, "admin panel opened without admin role");
            self.state = PageState::Forbidden("admin access required".to_string());
            return Navigation::Stay;
        }

        let users = ctx.admin().list_users().await;
        let users = match users {
            Ok(users) => users,
            Err(err) => return self.fail_load(ctx, err),
        };
        let tasks = ctx.admin().list_all_tasks().await;
        let tasks = match tasks {
            Ok(tasks) => tasks,
            Err(err) => return self.fail_load(ctx, err),
        };

        self.state = PageState::Ready(AdminData { users, tasks });
        Navigation::Stay
    }

    #[instrument(skip(self, ctx))]
    pub async fn promote<T: Transport, S: TokenStore>(
        &mut self,
        ctx: &mut AppContext<T, S>,
        user_id: UserId,
    ) -> Navigation {
        if !self.ensure_ready() {
            return Navigation::Stay;
        }
        let result = ctx.admin().promote_user(user_id).await;
        match result {
            Ok(_) => {
                info!(%user_id, "user promoted from admin panel");
                self.message = None;
                self.reload_users(ctx).await
            }
            Err(err) => self.fail_action(ctx, err),
        }
    }

    #[instrument(skip(self, ctx))]
    pub async fn force_delete<T: Transport, S: TokenStore>(
        &mut self,
        ctx: &mut AppContext<T, S>,
        task_id: TaskId,
    ) -> Navigation {
        if !self.ensure_ready() {
            return Navigation::Stay;
        }
        let result = ctx.admin().force_delete_task(task_id).await;
        match result {
            Ok(()) => {
                info!(%task_id, "task removed from admin panel");
                self.message = None;
                self.reload_tasks(ctx).await
            }
            Err(err) => self.fail_action(ctx, err),
        }
    }

    async fn reload_users<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        let result = ctx.admin().list_users().await;
        match result {
            Ok(users) => {
                if let PageState::Ready(data) = &mut self.state {
                    data.users = users;
                }
                Navigation::Stay
            }
            Err(err) => self.fail_load(ctx, err),
        }
    }

    async fn reload_tasks<T: Transport, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>) -> Navigation {
        let result = ctx.admin().list_all_tasks().await;
        match result {
            Ok(tasks) => {
                if let PageState::Ready(data) = &mut self.state {
                    data.tasks = tasks;
                }
                Navigation::Stay
            }
            Err(err) => self.fail_load(ctx, err),
        }
    }

    fn ensure_ready(&mut self) -> bool {
        if self.state.ready().is_some() {
            return true;
        }
        if self.state.error_message().is_none() {
            self.message = Some("admin panel is not loaded".to_string());
        }
        false
    }

    fn fail_load<T, S: TokenStore>(&mut self, ctx: &mut AppContext<T, S>, err: ApiError) -> Navigation {
        match classify(&mut ctx.session, err) {
            Failure::Redirect => {
                self.state = PageState::Unauthenticated;
                Navigation::Login
            }
            Failure::Forbidden(message) => {
                self.state = PageState::Forbidden(message);
                Navigation::Stay
            }
            Failure::Inline(message) => {
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
            Failure::Forbidden(message) => {
                self.state = PageState::Forbidden(message);
                self.message = None;
                Navigation::Stay
            }
            Failure::Inline(message) => {
                self.message = Some(message);
                Navigation::Stay
            }
        }
    }
}
