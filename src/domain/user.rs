/// User identity records and the caller-facing DTO

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::role::Role;

/// Account status. The numeric values are persisted and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Activated,
    Deleted,
    Deactivated,
    Locked,
}

impl UserStatus {
    pub fn code(&self) -> i16 {
        match self {
            UserStatus::Activated => 0,
            UserStatus::Deleted => 1,
            UserStatus::Deactivated => 2,
            UserStatus::Locked => 3,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(UserStatus::Activated),
            1 => Some(UserStatus::Deleted),
            2 => Some(UserStatus::Deactivated),
            3 => Some(UserStatus::Locked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub roles: Vec<Role>,
    pub created_on: DateTime<Utc>,
    pub last_update_on: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    pub fn touch(&mut self) {
        self.last_update_on = Some(Utc::now());
    }
}

/// Fields needed to create a user; the store assigns nothing, ids are
/// generated here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub roles: Vec<Role>,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            password_hash: self.password_hash,
            status: self.status,
            roles: self.roles,
            created_on: Utc::now(),
            last_update_on: None,
        }
    }
}

/// User as returned to callers. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub status: i16,
    pub roles: Vec<Role>,
    pub created_on: DateTime<Utc>,
    pub last_update_on: Option<DateTime<Utc>>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            status: user.status.code(),
            roles: user.roles.clone(),
            created_on: user.created_on,
            last_update_on: user.last_update_on,
        }
    }
}
