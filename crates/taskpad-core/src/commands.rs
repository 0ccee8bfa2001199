use anyhow::{anyhow, bail};
use taskpad_shared::TaskPriority;
use tracing::{debug, instrument};

use crate::cli::{AdminCommand, Command, EditArgs, TasksCommand};
use crate::context::AppContext;
use crate::render::Renderer;
use crate::storage::TokenStore;
use crate::transport::Transport;
use crate::views::{AdminPanel, Dashboard, Navigation, PageState, TaskDetail};

const LOGIN_HINT: &str = "not logged in; run `taskpad login <email>` first";

#[instrument(skip(ctx, renderer, command))]
pub async fn dispatch<T: Transport, S: TokenStore>(
    ctx: &mut AppContext<T, S>,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::Register { email, name, password } => {
            let user = ctx.register(&email, &password.password, &name).await?;
            println!("registered {} (id {})", user.email, user.id);
            Ok(())
        }
        Command::Login { email, password } => {
            let user = ctx.login(&email, &password.password).await?;
            println!("logged in as {} <{}>", user.name, user.email);
            Ok(())
        }
        Command::Logout => {
            ctx.logout();
            println!("logged out");
            Ok(())
        }
        Command::Whoami => match ctx.current_user().await {
            Ok(user) => renderer.print_user(&user),
            Err(err) if err.is_unauthenticated() => Err(anyhow!(LOGIN_HINT)),
            Err(err) => Err(err.into()),
        },
        Command::Tasks(cmd) => cmd_tasks(ctx, renderer, cmd).await,
        Command::Admin(cmd) => cmd_admin(ctx, renderer, cmd).await,
    }
}

async fn cmd_tasks<T: Transport, S: TokenStore>(
    ctx: &mut AppContext<T, S>,
    renderer: &mut Renderer,
    cmd: TasksCommand,
) -> anyhow::Result<()> {
    match cmd {
        TasksCommand::List { status, priority, search } => {
            let mut dashboard = Dashboard::new();
            dashboard.filter.status = status;
            dashboard.filter.priority = priority;
            dashboard.filter.search = search.unwrap_or_default();
            settle(dashboard.load(ctx).await, dashboard.message())?;
            renderer.print_task_table(&dashboard.visible_tasks(), dashboard.counts())
        }
        TasksCommand::Add { title, description, priority, due } => {
            let mut dashboard = Dashboard::new();
            settle(dashboard.load(ctx).await, dashboard.message())?;

            dashboard.draft.title = title;
            dashboard.draft.description = description.unwrap_or_default();
            dashboard.draft.priority = priority.unwrap_or(TaskPriority::Medium);
            dashboard.draft.due_date = due.unwrap_or_default();
            settle(dashboard.submit_draft(ctx).await, dashboard.message())?;

            let id = dashboard
                .last_created()
                .ok_or_else(|| anyhow!("task was not created"))?;
            println!("created task {id}");
            Ok(())
        }
        TasksCommand::Show { id } => {
            let mut detail = TaskDetail::new(id);
            settle(detail.load(ctx).await, detail.message())?;
            let task = detail.task().ok_or_else(|| anyhow!("task {id} is not available"))?;
            renderer.print_task_info(task)
        }
        TasksCommand::Edit(args) => cmd_edit(ctx, renderer, args).await,
        TasksCommand::Status { id, status } => {
            let mut detail = TaskDetail::new(id);
            settle(detail.load(ctx).await, detail.message())?;
            settle(detail.set_status(ctx, status).await, detail.message())?;
            println!("task {id} is now {}", status.label().to_lowercase());
            Ok(())
        }
        TasksCommand::Delete { id } => {
            let mut detail = TaskDetail::new(id);
            settle(detail.load(ctx).await, detail.message())?;
            match detail.delete(ctx).await {
                Navigation::Dashboard => {
                    println!("deleted task {id}");
                    Ok(())
                }
                other => settle(other, detail.message()),
            }
        }
    }
}

async fn cmd_edit<T: Transport, S: TokenStore>(
    ctx: &mut AppContext<T, S>,
    renderer: &mut Renderer,
    args: EditArgs,
) -> anyhow::Result<()> {
    let mut detail = TaskDetail::new(args.id);
    settle(detail.load(ctx).await, detail.message())?;
    if !detail.begin_edit() {
        bail!("task {} is not available", args.id);
    }

    if let Some(buffer) = detail.buffer_mut() {
        if let Some(title) = args.title {
            buffer.title = title;
        }
        if let Some(description) = args.description {
            buffer.description = description;
        }
        if args.clear_description {
            buffer.description.clear();
        }
        if let Some(status) = args.status {
            buffer.status = status;
        }
        if let Some(priority) = args.priority {
            buffer.priority = priority;
        }
        if let Some(due) = args.due {
            buffer.due_date = due;
        }
        if args.clear_due {
            buffer.due_date.clear();
        }
    }

    settle(detail.save(ctx).await, detail.message())?;
    if detail.is_editing() {
        bail!(detail.message().unwrap_or("failed to save task").to_string());
    }
    let task = detail.task().ok_or_else(|| anyhow!("task {} is not available", args.id))?;
    renderer.print_task_info(task)
}

async fn cmd_admin<T: Transport, S: TokenStore>(
    ctx: &mut AppContext<T, S>,
    renderer: &mut Renderer,
    cmd: AdminCommand,
) -> anyhow::Result<()> {
    let mut panel = AdminPanel::new();
    settle(panel.load(ctx).await, panel.message())?;
    if let PageState::Forbidden(message) = panel.state() {
        bail!("admin panel unavailable: {message}");
    }

    match cmd {
        AdminCommand::Users => {}
        AdminCommand::Tasks => {}
        AdminCommand::Promote { user_id } => {
            settle(panel.promote(ctx, user_id).await, panel.message())?;
            println!("user {user_id} is an admin");
        }
        AdminCommand::DeleteTask { task_id } => {
            settle(panel.force_delete(ctx, task_id).await, panel.message())?;
            println!("deleted task {task_id}");
        }
    }

    let data = panel
        .data()
        .ok_or_else(|| anyhow!(panel.message().unwrap_or("admin panel unavailable").to_string()))?;
    match cmd {
        AdminCommand::Tasks | AdminCommand::DeleteTask { .. } => renderer.print_admin_tasks(data),
        AdminCommand::Users | AdminCommand::Promote { .. } => renderer.print_user_table(&data.users),
    }
}

/// Maps a page outcome onto the command result. Any message left on the page
/// counts as failure.
fn settle(nav: Navigation, message: Option<&str>) -> anyhow::Result<()> {
    if nav == Navigation::Login {
        bail!(LOGIN_HINT);
    }
    if let Some(message) = message {
        bail!(message.to_string());
    }
    Ok(())
}
