use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use taskpad_shared::{TaskId, TaskPriority, TaskStatus, UserId};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskpad",
    version,
    about = "Taskpad: personal task manager client",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the task API.
    #[arg(long = "api-url")]
    pub api_url: Option<String>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account.
    Register {
        email: String,
        name: String,
        #[command(flatten)]
        password: PasswordArg,
    },
    /// Sign in and remember the session token.
    Login {
        email: String,
        #[command(flatten)]
        password: PasswordArg,
    },
    /// Forget the stored session token.
    Logout,
    /// Show the signed-in user.
    Whoami,
    #[command(subcommand)]
    Tasks(TasksCommand),
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Args, Debug, Clone)]
pub struct PasswordArg {
    #[arg(long = "password", env = "TASKPAD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TasksCommand {
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,
        /// YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },
    Show {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },
    Edit(EditArgs),
    Status {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    Delete {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(value_parser = parse_task_id)]
    pub id: TaskId,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    #[arg(long)]
    pub clear_description: bool,
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<TaskPriority>,
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    #[arg(long)]
    pub clear_due: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    Users,
    Tasks,
    Promote {
        #[arg(value_parser = parse_user_id)]
        user_id: UserId,
    },
    DeleteTask {
        #[arg(value_parser = parse_task_id)]
        task_id: TaskId,
    },
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    s.parse()
}

fn parse_priority(s: &str) -> Result<TaskPriority, String> {
    s.parse()
}

fn parse_task_id(s: &str) -> Result<TaskId, String> {
    s.parse()
}

fn parse_user_id(s: &str) -> Result<UserId, String> {
    s.parse()
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edit_flags() {
        let cli = GlobalCli::try_parse_from([
            "taskpad",
            "--api-url",
            "http://api.test/api",
            "tasks",
            "edit",
            "12",
            "--priority",
            "high",
            "--clear-due",
        ])
        .expect("parse");
        assert_eq!(cli.api_url.as_deref(), Some("http://api.test/api"));
        let Command::Tasks(TasksCommand::Edit(args)) = cli.command else {
            panic!("expected tasks edit");
        };
        assert_eq!(args.id, TaskId(12));
        assert_eq!(args.priority, Some(TaskPriority::High));
        assert!(args.clear_due);
        assert_eq!(args.due, None);
    }

    #[test]
    fn rejects_unknown_status() {
        let parsed = GlobalCli::try_parse_from(["taskpad", "tasks", "status", "3", "someday"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn rc_overrides_accumulate() {
        let cli = GlobalCli::try_parse_from([
            "taskpad",
            "--rc",
            "color=off",
            "--rc",
            "api.timeout=5",
            "-vv",
            "logout",
        ])
        .expect("parse");
        assert_eq!(cli.rc_overrides.len(), 2);
        assert_eq!(cli.rc_overrides[1].key, "api.timeout");
        assert_eq!(cli.verbose, 2);
    }
}
