use chrono::NaiveDate;
use taskpad_core::memory::MemoryBackend;
use taskpad_core::storage::{FileTokenStore, MemoryTokenStore, TOKEN_FILE_NAME, TokenStore};
use taskpad_core::transport::Method;
use taskpad_core::{AppContext, ApiError};
use taskpad_shared::{NewTask, Role, TaskId, TaskPatch, TaskPriority, TaskStatus, User, UserId};

const PASSWORD: &str = "correct horse";

type Ctx = AppContext<MemoryBackend, MemoryTokenStore>;

fn seeded() -> (MemoryBackend, User, User, User) {
    let backend = MemoryBackend::new();
    let alice = backend.seed_user("alice@example.org", PASSWORD, "Alice", Role::User);
    let bob = backend.seed_user("bob@example.org", PASSWORD, "Bob", Role::User);
    let root = backend.seed_user("root@example.org", PASSWORD, "Root", Role::Admin);
    (backend, alice, bob, root)
}

async fn login_as(backend: &MemoryBackend, email: &str) -> Ctx {
    let mut ctx = AppContext::new(backend.clone(), MemoryTokenStore::new());
    ctx.login(email, PASSWORD).await.expect("login");
    ctx
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: Some("from the corner shop".to_string()),
        priority: TaskPriority::High,
        due_date: NaiveDate::from_ymd_opt(2026, 11, 1),
    }
}

#[tokio::test]
async fn create_then_get_returns_same_fields() {
    let (backend, alice, _, _) = seeded();
    let ctx = login_as(&backend, "alice@example.org").await;

    let created = ctx.tasks().create(&new_task("Buy bread")).await.expect("create");
    let fetched = ctx.tasks().get_by_id(created.id).await.expect("get");

    assert_eq!(fetched.title, "Buy bread");
    assert_eq!(fetched.description.as_deref(), Some("from the corner shop"));
    assert_eq!(fetched.priority, TaskPriority::High);
    assert_eq!(fetched.due_date, NaiveDate::from_ymd_opt(2026, 11, 1));
    assert_eq!(fetched.user_id, alice.id);
    assert_eq!(fetched.created_at, created.created_at);
}

#[tokio::test]
async fn buy_milk_lands_pending_with_supplied_priority() {
    let (backend, _, _, _) = seeded();
    let ctx = login_as(&backend, "alice@example.org").await;

    let milk = NewTask {
        title: "Buy milk".to_string(),
        description: None,
        priority: TaskPriority::Low,
        due_date: None,
    };
    let created = ctx.tasks().create(&milk).await.expect("create");

    let listed = ctx.tasks().list().await.expect("list");
    let found = listed.iter().find(|t| t.id == created.id).expect("task listed");
    assert_eq!(found.status, TaskStatus::Pending);
    assert_eq!(found.priority, TaskPriority::Low);
}

#[tokio::test]
async fn partial_update_leaves_omitted_fields_alone() {
    let (backend, _, _, _) = seeded();
    let ctx = login_as(&backend, "alice@example.org").await;
    let created = ctx.tasks().create(&new_task("Call plumber")).await.expect("create");

    let updated = ctx
        .tasks()
        .set_status(created.id, TaskStatus::Completed)
        .await
        .expect("status update");
    assert_eq!(updated.status, TaskStatus::Completed);

    let patch = TaskPatch {
        description: Some(None),
        ..TaskPatch::default()
    };
    ctx.tasks().update(created.id, &patch).await.expect("clear description");

    let fetched = ctx.tasks().get_by_id(created.id).await.expect("get");
    assert_eq!(fetched.title, "Call plumber");
    assert_eq!(fetched.status, TaskStatus::Completed);
    assert_eq!(fetched.priority, TaskPriority::High);
    assert_eq!(fetched.due_date, created.due_date);
    assert_eq!(fetched.description, None);

    let sent = backend
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::Put)
        .map(|r| r.body.unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(sent, vec![r#"{"status":"completed"}"#, r#"{"description":null}"#]);
}

#[tokio::test]
async fn deleted_task_is_not_found_afterwards() {
    let (backend, _, _, _) = seeded();
    let ctx = login_as(&backend, "alice@example.org").await;
    let created = ctx.tasks().create(&new_task("Old chore")).await.expect("create");

    ctx.tasks().delete(created.id).await.expect("delete");
    assert!(ctx.tasks().get_by_id(created.id).await.expect_err("gone").is_not_found());
    assert!(ctx.tasks().delete(created.id).await.expect_err("second delete").is_not_found());
}

#[tokio::test]
async fn blank_title_never_reaches_the_server() {
    let (backend, _, _, _) = seeded();
    let ctx = login_as(&backend, "alice@example.org").await;
    let before = backend.requests().len();

    let err = ctx.tasks().create(&new_task("   ")).await.expect_err("blank title");
    assert_eq!(err, ApiError::validation("title is required"));

    let patch = TaskPatch {
        title: Some(String::new()),
        ..TaskPatch::default()
    };
    assert!(matches!(
        ctx.tasks().update(TaskId(1), &patch).await,
        Err(ApiError::Validation(_))
    ));
    assert_eq!(backend.requests().len(), before);
}

#[tokio::test]
async fn list_is_scoped_to_the_signed_in_user() {
    let (backend, alice, bob, _) = seeded();
    let alice_ctx = login_as(&backend, "alice@example.org").await;
    let bob_ctx = login_as(&backend, "bob@example.org").await;

    alice_ctx.tasks().create(&new_task("Alice one")).await.expect("create");
    let bobs = bob_ctx.tasks().create(&new_task("Bob one")).await.expect("create");
    alice_ctx.tasks().create(&new_task("Alice two")).await.expect("create");

    let listed = alice_ctx.tasks().list().await.expect("list");
    let titles: Vec<&str> = listed.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Alice one", "Alice two"]);
    assert!(listed.iter().all(|t| t.user_id == alice.id));

    let err = alice_ctx.tasks().get_by_id(bobs.id).await.expect_err("foreign task");
    assert!(err.is_not_found());
    assert_eq!(bob_ctx.tasks().list().await.expect("list")[0].user_id, bob.id);
}

#[tokio::test]
async fn non_admin_gets_authorization_error_without_side_effects() {
    let (backend, alice, bob, _) = seeded();
    let bob_ctx = login_as(&backend, "bob@example.org").await;
    let task = bob_ctx.tasks().create(&new_task("Keep me")).await.expect("create");
    let alice_ctx = login_as(&backend, "alice@example.org").await;

    assert!(alice_ctx.admin().list_users().await.expect_err("users").is_forbidden());
    assert!(alice_ctx.admin().list_all_tasks().await.expect_err("tasks").is_forbidden());
    assert!(alice_ctx.admin().promote_user(alice.id).await.expect_err("promote").is_forbidden());
    assert!(alice_ctx.admin().force_delete_task(task.id).await.expect_err("delete").is_forbidden());

    assert_eq!(backend.user(alice.id).expect("alice").role, Role::User);
    assert_eq!(backend.user(bob.id).expect("bob").role, Role::User);
    assert_eq!(backend.tasks().len(), 1);
}

#[tokio::test]
async fn promotion_is_idempotent() {
    let (backend, alice, _, _) = seeded();
    let root_ctx = login_as(&backend, "root@example.org").await;

    let promoted = root_ctx.admin().promote_user(alice.id).await.expect("first promote");
    assert_eq!(promoted.role, Role::Admin);
    let again = root_ctx.admin().promote_user(alice.id).await.expect("second promote");
    assert_eq!(again, promoted);
    assert_eq!(backend.user(alice.id).expect("alice").role, Role::Admin);

    let err = root_ctx.admin().promote_user(UserId(999)).await.expect_err("unknown user");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn admin_sees_and_removes_any_task() {
    let (backend, _, _, _) = seeded();
    let bob_ctx = login_as(&backend, "bob@example.org").await;
    let task = bob_ctx.tasks().create(&new_task("Spam")).await.expect("create");
    let root_ctx = login_as(&backend, "root@example.org").await;

    assert_eq!(root_ctx.admin().list_all_tasks().await.expect("all tasks").len(), 1);
    assert_eq!(root_ctx.admin().list_users().await.expect("users").len(), 3);
    root_ctx.admin().force_delete_task(task.id).await.expect("force delete");
    assert!(bob_ctx.tasks().get_by_id(task.id).await.expect_err("gone").is_not_found());
}

#[tokio::test]
async fn bad_credentials_are_an_auth_error_and_store_nothing() {
    let (backend, _, _, _) = seeded();
    let tokens = MemoryTokenStore::new();
    let mut ctx = AppContext::new(backend.clone(), tokens.clone());

    let err = ctx.login("alice@example.org", "wrong").await.expect_err("bad password");
    assert_eq!(err, ApiError::Auth("invalid email or password".to_string()));
    assert_eq!(tokens.current(), None);
    assert!(!ctx.session.session().is_authenticated());
}

#[tokio::test]
async fn registration_conflicts_surface_as_validation() {
    let (backend, _, _, _) = seeded();
    let mut ctx = AppContext::new(backend.clone(), MemoryTokenStore::new());

    let user = ctx.register("carol@example.org", "pw", "Carol").await.expect("register");
    assert_eq!(user.role, Role::User);

    let err = ctx.register("ALICE@example.org", "pw", "Other").await.expect_err("taken");
    assert_eq!(err, ApiError::Validation("email already registered".to_string()));

    let err = ctx.register("not-an-email", "pw", "X").await.expect_err("malformed");
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn login_persists_token_and_refresh_restores_identity() {
    let (backend, alice, _, _) = seeded();
    let tokens = MemoryTokenStore::new();
    let mut first = AppContext::new(backend.clone(), tokens.clone());
    first.login("alice@example.org", PASSWORD).await.expect("login");
    let stored = tokens.current().expect("token stored");
    assert_eq!(first.session.session().token(), Some(stored.as_str()));

    let mut second = AppContext::new(backend.clone(), tokens.clone());
    assert!(second.session.restore().expect("restore"));
    assert_eq!(second.session.session().user(), None);
    let user = second.session.refresh(&second.api).await.expect("refresh");
    assert_eq!(user, alice);
    assert!(second.session.session().is_authenticated());
}

#[tokio::test]
async fn rejected_token_collapses_the_session() {
    let (backend, _, _, _) = seeded();
    let tokens = MemoryTokenStore::new();
    let mut ctx = AppContext::new(backend.clone(), tokens.clone());
    ctx.login("alice@example.org", PASSWORD).await.expect("login");

    backend.revoke_tokens();
    let err = ctx.session.refresh(&ctx.api).await.expect_err("revoked");
    assert!(err.is_unauthenticated());
    assert_eq!(ctx.session.session().token(), None);
    assert_eq!(ctx.session.session().user(), None);
    assert_eq!(tokens.load().expect("load"), None);
}

#[tokio::test]
async fn requests_without_token_omit_the_header() {
    let (backend, _, _, _) = seeded();
    let mut ctx = AppContext::new(backend.clone(), MemoryTokenStore::new());

    let err = ctx.tasks().list().await.expect_err("server refuses");
    assert!(err.is_unauthenticated());
    assert_eq!(backend.requests().last().and_then(|r| r.bearer.clone()), None);

    ctx.login("alice@example.org", PASSWORD).await.expect("login");
    ctx.tasks().list().await.expect("list");
    let last = backend.requests().last().cloned().expect("request");
    assert_eq!(last.bearer.as_deref(), ctx.session.session().token());

    ctx.logout();
    assert!(!ctx.session.session().is_authenticated());
    assert_eq!(ctx.session.storage().current(), None);
}

#[tokio::test]
async fn file_token_survives_a_restart() {
    let (backend, alice, _, _) = seeded();
    let temp = tempfile::tempdir().expect("tempdir");

    let store = FileTokenStore::open(temp.path()).expect("open store");
    let mut first = AppContext::new(backend.clone(), store);
    first.login("alice@example.org", PASSWORD).await.expect("login");
    assert!(temp.path().join(TOKEN_FILE_NAME).exists());

    let store = FileTokenStore::open(temp.path()).expect("reopen store");
    let mut second = AppContext::new(backend.clone(), store);
    assert!(second.session.restore().expect("restore"));
    assert_eq!(second.current_user().await.expect("current user"), alice);

    second.logout();
    assert!(!temp.path().join(TOKEN_FILE_NAME).exists());
    let store = FileTokenStore::open(temp.path()).expect("reopen store");
    let mut third = AppContext::new(backend, store);
    assert!(!third.session.restore().expect("restore"));
    assert_eq!(third.current_user().await, Err(ApiError::Unauthenticated));
}
