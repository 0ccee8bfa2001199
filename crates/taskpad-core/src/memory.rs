//! In-process stand-in for the task API.
//!
//! Speaks the same routes, status codes and JSON bodies as the real backend,
//! which makes it usable for tests and offline demos. Nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use taskpad_shared::{
    ErrorBody, LoginRequest, LoginResponse, NewTask, RegisterRequest, Role, Task, TaskId, TaskPatch, TaskStatus,
    User, UserId,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

type Reply = (u16, String);

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug, Default)]
struct BackendState {
    accounts: Vec<Account>,
    tasks: Vec<Task>,
    tokens: HashMap<String, UserId>,
    next_user_id: i64,
    next_task_id: i64,
    requests: Vec<ApiRequest>,
}

/// Cloning shares the same backend state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account directly, bypassing registration rules.
    pub fn seed_user(&self, email: &str, password: &str, name: &str, role: Role) -> User {
        let mut state = self.state.lock();
        state.next_user_id += 1;
        let user = User {
            id: UserId(state.next_user_id),
            email: email.to_string(),
            name: name.to_string(),
            role,
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        user
    }

    /// Invalidates every issued token, as an expiry would.
    pub fn revoke_tokens(&self) {
        self.state.lock().tokens.clear();
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        let state = self.state.lock();
        state.accounts.iter().find(|a| a.user.id == id).map(|a| a.user.clone())
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().requests.clone()
    }

    fn handle(&self, request: &ApiRequest) -> Reply {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        let segments: Vec<&str> = request.path.split('/').filter(|s| !s.is_empty()).collect();
        let body = request.body.as_deref();
        let bearer = request.bearer.as_deref();

        let outcome = match (request.method, segments.as_slice()) {
            (Method::Post, ["auth", "register"]) => state.register(body),
            (Method::Post, ["auth", "login"]) => state.login(body),
            (Method::Get, ["auth", "me"]) => state.authenticate(bearer).and_then(|user| reply(200, &user)),
            (Method::Post, ["tasks"]) => state.create_task(bearer, body),
            (Method::Get, ["tasks"]) => state.list_tasks(bearer),
            (Method::Get, ["tasks", id]) => state.get_task(bearer, id),
            (Method::Put, ["tasks", id]) => state.update_task(bearer, id, body),
            (Method::Delete, ["tasks", id]) => state.delete_task(bearer, id),
            (Method::Get, ["admin", "users"]) => state.admin_users(bearer),
            (Method::Get, ["admin", "tasks"]) => state.admin_tasks(bearer),
            (Method::Post, ["admin", "promote", id]) => state.promote(bearer, id),
            (Method::Delete, ["admin", "tasks", id]) => state.force_delete(bearer, id),
            _ => Err(error(404, format!("no route for {} {}", request.method, request.path))),
        };

        match outcome {
            Ok(reply) | Err(reply) => reply,
        }
    }
}

impl Transport for MemoryBackend {
    #[instrument(skip(self, request), fields(request_id = %request.request_id, method = %request.method, path = %request.path))]
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let (status, body) = self.handle(&request);
        debug!(status, "memory backend replied");
        Ok(ApiResponse { status, body })
    }
}

impl BackendState {
    fn authenticate(&self, bearer: Option<&str>) -> Result<User, Reply> {
        let user_id = bearer
            .and_then(|token| self.tokens.get(token))
            .ok_or_else(|| error(401, "missing or invalid token"))?;
        self.accounts
            .iter()
            .find(|a| a.user.id == *user_id)
            .map(|a| a.user.clone())
            .ok_or_else(|| error(401, "missing or invalid token"))
    }

    fn require_admin(&self, bearer: Option<&str>) -> Result<User, Reply> {
        let user = self.authenticate(bearer)?;
        if !user.is_admin() {
            return Err(error(403, "admin role required"));
        }
        Ok(user)
    }

    fn register(&mut self, body: Option<&str>) -> Result<Reply, Reply> {
        let req: RegisterRequest = parse_body(body)?;
        let email = req.email.trim();
        if !email.contains('@') || req.password.is_empty() || req.name.trim().is_empty() {
            return Err(error(400, "email, password and name are required"));
        }
        if self.accounts.iter().any(|a| a.user.email.eq_ignore_ascii_case(email)) {
            return Err(error(409, "email already registered"));
        }

        self.next_user_id += 1;
        let user = User {
            id: UserId(self.next_user_id),
            email: email.to_string(),
            name: req.name.trim().to_string(),
            role: Role::User,
        };
        self.accounts.push(Account {
            user: user.clone(),
            password: req.password,
        });
        reply(201, &user)
    }

    fn login(&mut self, body: Option<&str>) -> Result<Reply, Reply> {
        let req: LoginRequest = parse_body(body)?;
        let user = self
            .accounts
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(req.email.trim()) && a.password == req.password)
            .map(|a| a.user.clone())
            .ok_or_else(|| error(401, "invalid email or password"))?;

        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user.id);
        reply(200, &LoginResponse { token, user })
    }

    fn create_task(&mut self, bearer: Option<&str>, body: Option<&str>) -> Result<Reply, Reply> {
        let user = self.authenticate(bearer)?;
        let new_task: NewTask = parse_body(body)?;
        if new_task.title.trim().is_empty() {
            return Err(error(400, "title is required"));
        }

        self.next_task_id += 1;
        let task = Task {
            id: TaskId(self.next_task_id),
            user_id: user.id,
            title: new_task.title,
            description: new_task.description,
            status: TaskStatus::Pending,
            priority: new_task.priority,
            due_date: new_task.due_date,
            created_at: Utc::now(),
        };
        self.tasks.push(task.clone());
        reply(201, &task)
    }

    fn list_tasks(&self, bearer: Option<&str>) -> Result<Reply, Reply> {
        let user = self.authenticate(bearer)?;
        let own: Vec<&Task> = self.tasks.iter().filter(|t| t.user_id == user.id).collect();
        reply(200, &own)
    }

    fn owned_index(&self, user: &User, raw_id: &str) -> Result<usize, Reply> {
        let id = parse_id(raw_id)?;
        self.tasks
            .iter()
            .position(|t| t.id.0 == id && t.user_id == user.id)
            .ok_or_else(|| error(404, "task not found"))
    }

    fn get_task(&self, bearer: Option<&str>, raw_id: &str) -> Result<Reply, Reply> {
        let user = self.authenticate(bearer)?;
        let idx = self.owned_index(&user, raw_id)?;
        reply(200, &self.tasks[idx])
    }

    fn update_task(&mut self, bearer: Option<&str>, raw_id: &str, body: Option<&str>) -> Result<Reply, Reply> {
        let user = self.authenticate(bearer)?;
        let idx = self.owned_index(&user, raw_id)?;
        let patch: TaskPatch = parse_body(body)?;
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(error(400, "title is required"));
        }
        let task = &mut self.tasks[idx];
        patch.apply_to(task);
        reply(200, &*task)
    }

    fn delete_task(&mut self, bearer: Option<&str>, raw_id: &str) -> Result<Reply, Reply> {
        let user = self.authenticate(bearer)?;
        let idx = self.owned_index(&user, raw_id)?;
        self.tasks.remove(idx);
        Ok((204, String::new()))
    }

    fn admin_users(&self, bearer: Option<&str>) -> Result<Reply, Reply> {
        self.require_admin(bearer)?;
        let users: Vec<&User> = self.accounts.iter().map(|a| &a.user).collect();
        reply(200, &users)
    }

    fn admin_tasks(&self, bearer: Option<&str>) -> Result<Reply, Reply> {
        self.require_admin(bearer)?;
        reply(200, &self.tasks)
    }

    fn promote(&mut self, bearer: Option<&str>, raw_id: &str) -> Result<Reply, Reply> {
        self.require_admin(bearer)?;
        let id = parse_id(raw_id)?;
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.user.id.0 == id)
            .ok_or_else(|| error(404, "user not found"))?;
        account.user.role = Role::Admin;
        reply(200, &account.user)
    }

    fn force_delete(&mut self, bearer: Option<&str>, raw_id: &str) -> Result<Reply, Reply> {
        self.require_admin(bearer)?;
        let id = parse_id(raw_id)?;
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id.0 == id)
            .ok_or_else(|| error(404, "task not found"))?;
        self.tasks.remove(idx);
        Ok((204, String::new()))
    }
}

fn reply<T: Serialize + ?Sized>(status: u16, value: &T) -> Result<Reply, Reply> {
    serde_json::to_string(value)
        .map(|body| (status, body))
        .map_err(|err| error(500, format!("failed encoding response: {err}")))
}

fn error(status: u16, message: impl Into<String>) -> Reply {
    let body = serde_json::to_string(&ErrorBody::new(message)).unwrap_or_default();
    (status, body)
}

fn parse_body<T: DeserializeOwned>(body: Option<&str>) -> Result<T, Reply> {
    let raw = body.ok_or_else(|| error(400, "request body is required"))?;
    serde_json::from_str(raw).map_err(|err| error(400, format!("malformed request body: {err}")))
}

fn parse_id(raw: &str) -> Result<i64, Reply> {
    raw.parse::<i64>().map_err(|_| error(400, format!("invalid id: {raw}")))
}
