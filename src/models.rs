use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub topic_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub task_id: i32,
    pub topic_id: i32,
    pub user_id: i32,
    pub date: NaiveDate,
    pub task_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDrive {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub company_name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown attendance status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for AttendanceStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub user_id: i32,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Programme role of a user. Roles other than the two the reports care about
/// are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Student,
    Mentor,
    Other(String),
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "student" => Role::Student,
            "mentor" => Role::Mentor,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => f.write_str("student"),
            Role::Mentor => f.write_str("mentor"),
            Role::Other(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub user_id: i32,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codekata {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub user_id: i32,
    pub problem_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentor {
    #[serde(rename = "_id", default = "Uuid::new_v4")]
    pub id: Uuid,
    pub user_id: i32,
    pub mentee_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicTask {
    pub topic: String,
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveStudents {
    pub company: String,
    pub students: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProblems {
    pub user: Option<String>,
    pub problem_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_keep_unknown_values() {
        assert_eq!(Role::from("student".to_string()), Role::Student);
        assert_eq!(Role::from("mentor".to_string()), Role::Mentor);
        let admin = Role::from("admin".to_string());
        assert_eq!(admin, Role::Other("admin".to_string()));
        assert_eq!(admin.to_string(), "admin");
    }

    #[test]
    fn status_parses_known_values_only() {
        assert_eq!("absent".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Absent);
        assert_eq!("present".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Present);
        assert!("late".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn documents_serialize_with_document_id() {
        let mentor = Mentor {
            id: Uuid::nil(),
            user_id: 7,
            mentee_count: 20,
        };
        let value = serde_json::to_value(&mentor).unwrap();
        assert_eq!(value["_id"], Uuid::nil().to_string());
        assert_eq!(value["mentee_count"], 20);
    }
}
