use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
        }
    }

    /// Unknown values fall back to the least privileged role.
    pub fn parse(value: &str) -> Self {
        match value {
            "instructor" => Role::Instructor,
            _ => Role::Student,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Learner or instructor profile. `id` is the identity provider subject.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    #[serde(rename = "userId")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub avatar: Option<String>,
    #[sqlx(default)]
    pub serie_subscribe: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    pub fn is_subscribed_to(&self, serie_id: &str) -> bool {
        self.serie_subscribe.iter().any(|id| id == serie_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub avatar: Option<String>,
}

/// Mutable profile fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub avatar: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.username.is_none()
            && self.gender.is_none()
            && self.birthdate.is_none()
            && self.avatar.is_none()
    }
}

/// Outcome of a role promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    NotFound,
    Unchanged,
    Updated,
}
