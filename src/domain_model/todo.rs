use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct TodoId(pub u64);

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted as a TINYINT: 1 pending, 2 in progress, 3 completed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TodoStatus {
    Pending = 1,
    InProgress = 2,
    Completed = 3,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid status: {0}")]
pub struct InvalidTodoStatus(pub String);

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
        }
    }

    pub fn as_i8(&self) -> i8 {
        *self as i8
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TodoStatus {
    type Err = InvalidTodoStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TodoStatus::Pending),
            "in_progress" => Ok(TodoStatus::InProgress),
            "completed" => Ok(TodoStatus::Completed),
            other => Err(InvalidTodoStatus(other.to_string())),
        }
    }
}

impl TryFrom<i8> for TodoStatus {
    type Error = InvalidTodoStatus;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TodoStatus::Pending),
            2 => Ok(TodoStatus::InProgress),
            3 => Ok(TodoStatus::Completed),
            other => Err(InvalidTodoStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_round_trip_through_from_str() {
        for status in [
            TodoStatus::Pending,
            TodoStatus::InProgress,
            TodoStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<TodoStatus>().unwrap(), status);
            assert_eq!(TodoStatus::try_from(status.as_i8()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "unknown".parse::<TodoStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid status: unknown");
        assert!(TodoStatus::try_from(0).is_err());
    }
}
