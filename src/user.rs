/*!
Registry users and the active session record.
*/
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let token = match self {
            Role::Admin   => "Admin",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        };

        write!(f, "{}", token)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin"   => Ok(Role::Admin),
            "Teacher" => Ok(Role::Teacher),
            "Student" => Ok(Role::Student),
            _ => Err(format!("{:?} is not a valid Role.", s)),
        }
    }
}

/// A registry record. Created once at signup (or seeding); never
/// updated, never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique id, assigned at creation.
    pub id: String,
    /// Unique across the registry.
    pub uname: String,
    /// Also unique across the registry.
    pub email: String,
    /// Full display name.
    pub name: String,
    pub role: Role,
    /// Only meaningful when `role` is `Student`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    /// Per-user random salt fed into the credential digest.
    pub salt: String,
    /// Derived credential digest; the password itself is never stored.
    pub digest: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

/// The persisted shape of an authenticated identity: a copy of the
/// `User` record with the credential material stripped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub uname: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl From<&User> for Session {
    fn from(u: &User) -> Session {
        Session {
            id: u.id.clone(),
            uname: u.uname.clone(),
            email: u.email.clone(),
            name: u.name.clone(),
            role: u.role,
            grade: u.grade.clone(),
            created: u.created,
        }
    }
}
