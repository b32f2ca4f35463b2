//! User, role and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Normalized role claim, resolved once when the user row is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Learner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Learner => "learner",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "learner" => Ok(Role::Learner),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// The authenticated caller: a user row with its role parsed up front.
/// Unknown role strings demote to learner rather than failing the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        let role = user.role.parse().unwrap_or(Role::Learner);
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<&AuthUser> for UserResponse {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_normalized() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("learner".parse::<Role>().unwrap(), Role::Learner);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn unknown_role_demotes_to_learner() {
        let user = User {
            id: "u1".into(),
            email: "x@example.com".into(),
            password_hash: String::new(),
            name: "X".into(),
            role: "owner".into(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let auth: AuthUser = user.into();
        assert_eq!(auth.role, Role::Learner);
        assert!(!auth.role.is_admin());
    }
}
