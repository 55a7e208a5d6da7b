use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Course {
    pub id: i64,
    pub name: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            name: name.into(),
            email: email.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCourse {
    pub name: Option<String>,
    pub user_id: Option<i64>,
}

impl NewCourse {
    pub fn new(name: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: Some(name.into()),
            user_id: Some(user_id),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User: {}>", self.name)
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Course: {}>", self.name.as_deref().unwrap_or("None"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_record_labels() {
        let user = User {
            id: 1,
            name: "alice".to_string(),
            email: None,
        };
        assert_eq!(user.to_string(), "<User: alice>");

        let course = Course {
            id: 1,
            name: Some("Algebra".to_string()),
            user_id: Some(1),
        };
        assert_eq!(course.to_string(), "<Course: Algebra>");

        let unnamed = Course {
            name: None,
            ..course
        };
        assert_eq!(unnamed.to_string(), "<Course: None>");
    }
}
