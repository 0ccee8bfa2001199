use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use serde::{
  Deserialize,
  Deserializer,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for UserId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for UserId {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    s.trim()
      .parse::<i64>()
      .map(UserId)
      .map_err(|_| {
        format!("invalid user id: {s}")
      })
  }
}

impl FromStr for TaskId {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    s.trim()
      .parse::<i64>()
      .map(TaskId)
      .map_err(|_| {
        format!("invalid task id: {s}")
      })
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      | Role::User => "user",
      | Role::Admin => "admin"
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct User {
  pub id:    UserId,
  pub email: String,
  #[serde(default)]
  pub name:  String,
  #[serde(default)]
  pub role:  Role
}

impl User {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  #[default]
  Pending,
  InProgress,
  Completed
}

impl TaskStatus {
  pub const ALL: [TaskStatus; 3] = [
    TaskStatus::Pending,
    TaskStatus::InProgress,
    TaskStatus::Completed
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskStatus::Pending => "pending",
      | TaskStatus::InProgress => {
        "in_progress"
      }
      | TaskStatus::Completed => {
        "completed"
      }
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | TaskStatus::Pending => "Pending",
      | TaskStatus::InProgress => {
        "In progress"
      }
      | TaskStatus::Completed => {
        "Completed"
      }
    }
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TaskStatus {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "pending" => Ok(Self::Pending),
      | "in_progress"
      | "in-progress"
      | "inprogress" => {
        Ok(Self::InProgress)
      }
      | "completed" | "done" => {
        Ok(Self::Completed)
      }
      | other => Err(format!(
        "unknown task status: {other}"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
  Low,
  #[default]
  Medium,
  High
}

impl TaskPriority {
  pub const ALL: [TaskPriority; 3] = [
    TaskPriority::Low,
    TaskPriority::Medium,
    TaskPriority::High
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskPriority::Low => "low",
      | TaskPriority::Medium => "medium",
      | TaskPriority::High => "high"
    }
  }
}

impl fmt::Display for TaskPriority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TaskPriority {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "low" | "l" => Ok(Self::Low),
      | "medium" | "m" => {
        Ok(Self::Medium)
      }
      | "high" | "h" => Ok(Self::High),
      | other => Err(format!(
        "unknown task priority: {other}"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Task {
  pub id:          TaskId,
  pub user_id:     UserId,
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub status:      TaskStatus,
  #[serde(default)]
  pub priority:    TaskPriority,
  #[serde(default)]
  pub due_date:    Option<NaiveDate>,
  #[serde(with = "timestamp")]
  pub created_at:  DateTime<Utc>
}

/// Payload for `POST /tasks`. Status is
/// left to the server default.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct NewTask {
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub priority:    TaskPriority,
  #[serde(default)]
  pub due_date:    Option<NaiveDate>
}

/// Optional field set for `PUT
/// /tasks/{id}`.
///
/// `None` leaves the field untouched and
/// is never serialized. For the nullable
/// fields `Some(None)` goes out as JSON
/// `null` and clears the value.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub title:       Option<String>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub description:
    Option<Option<String>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:      Option<TaskStatus>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub priority:    Option<TaskPriority>,
  #[serde(
    default,
    deserialize_with = "double_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date:
    Option<Option<NaiveDate>>
}

impl TaskPatch {
  pub fn status(
    status: TaskStatus
  ) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.status.is_none()
      && self.priority.is_none()
      && self.due_date.is_none()
  }

  /// Applies the supplied fields to
  /// `task`, leaving the rest as they
  /// are.
  pub fn apply_to(
    &self,
    task: &mut Task
  ) {
    if let Some(title) =
      self.title.as_ref()
    {
      task.title = title.clone();
    }
    if let Some(description) =
      self.description.as_ref()
    {
      task.description =
        description.clone();
    }
    if let Some(status) = self.status {
      task.status = status;
    }
    if let Some(priority) =
      self.priority
    {
      task.priority = priority;
    }
    if let Some(due_date) =
      self.due_date
    {
      task.due_date = due_date;
    }
  }
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct RegisterRequest {
  pub email:    String,
  pub password: String,
  pub name:     String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct LoginRequest {
  pub email:    String,
  pub password: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct LoginResponse {
  pub token: String,
  pub user:  User
}

/// Error envelope returned by the API.
/// Backends use either key.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
pub struct ErrorBody {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub error:   Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub message: Option<String>
}

impl ErrorBody {
  pub fn new(
    message: impl Into<String>
  ) -> Self {
    Self {
      error:   Some(message.into()),
      message: None
    }
  }

  pub fn text(&self) -> Option<&str> {
    self
      .error
      .as_deref()
      .or(self.message.as_deref())
      .map(str::trim)
      .filter(|text| !text.is_empty())
  }
}

fn double_option<'de, T, D>(
  deserializer: D
) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>
{
  Option::<T>::deserialize(deserializer)
    .map(Some)
}

pub mod timestamp {
  use chrono::{
    DateTime,
    NaiveDateTime,
    SecondsFormat,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt.to_rfc3339_opts(
        SecondsFormat::AutoSi,
        true
      )
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    parse(&raw)
      .map_err(serde::de::Error::custom)
  }

  /// Accepts RFC 3339 or a zone-less
  /// `YYYY-MM-DDTHH:MM:SS[.fff]`, the
  /// latter read as UTC.
  pub fn parse(
    raw: &str
  ) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(dt) =
      DateTime::parse_from_rfc3339(
        trimmed
      )
    {
      return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(
      trimmed,
      "%Y-%m-%dT%H:%M:%S%.f"
    )
    .map(|ndt| ndt.and_utc())
    .map_err(|err| {
      format!(
        "invalid timestamp \
         {trimmed:?}: {err}"
      )
    })
  }
}
