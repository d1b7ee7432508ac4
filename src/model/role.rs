use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const USER_AUTHORITIES: &[&str] = &["user:read"];
const HR_AUTHORITIES: &[&str] = &["user:read", "user:update"];
const MANAGER_AUTHORITIES: &[&str] = &["user:read", "user:update"];
const ADMIN_AUTHORITIES: &[&str] = &["user:read", "user:update", "user:create"];
const SUPER_ADMIN_AUTHORITIES: &[&str] =
    &["user:read", "user:update", "user:create", "user:delete"];

/// Roles known by the backend, each granting a fixed set of authorities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    RoleUser,
    RoleHr,
    RoleManager,
    RoleAdmin,
    RoleSuperAdmin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::RoleUser,
        Role::RoleHr,
        Role::RoleManager,
        Role::RoleAdmin,
        Role::RoleSuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::RoleUser => "ROLE_USER",
            Role::RoleHr => "ROLE_HR",
            Role::RoleManager => "ROLE_MANAGER",
            Role::RoleAdmin => "ROLE_ADMIN",
            Role::RoleSuperAdmin => "ROLE_SUPER_ADMIN",
        }
    }

    /// Permission strings carried by tokens issued for this role.
    pub fn authorities(&self) -> &'static [&'static str] {
        match self {
            Role::RoleUser => USER_AUTHORITIES,
            Role::RoleHr => HR_AUTHORITIES,
            Role::RoleManager => MANAGER_AUTHORITIES,
            Role::RoleAdmin => ADMIN_AUTHORITIES,
            Role::RoleSuperAdmin => SUPER_ADMIN_AUTHORITIES,
        }
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
        let wanted = s.trim().to_uppercase();
        let wanted = if wanted.starts_with("ROLE_") {
            wanted
        } else {
            format!("ROLE_{wanted}")
        };

        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| format!("unknown role `{s}`"))
    }
}
