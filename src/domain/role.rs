/// Roles and their permissions
///
/// The role → permission relation is a static table; `authorities` is a pure
/// function over it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
    Enterprise,
    Association,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    AdminRead,
    AdminUpdate,
    AdminCreate,
    AdminDelete,
    EnterpriseRead,
    EnterpriseUpdate,
    EnterpriseCreate,
    EnterpriseDelete,
    AssociationRead,
    AssociationUpdate,
    AssociationCreate,
    AssociationDelete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AdminRead => "admin:read",
            Permission::AdminUpdate => "admin:update",
            Permission::AdminCreate => "admin:create",
            Permission::AdminDelete => "admin:delete",
            Permission::EnterpriseRead => "enterprise:read",
            Permission::EnterpriseUpdate => "enterprise:update",
            Permission::EnterpriseCreate => "enterprise:create",
            Permission::EnterpriseDelete => "enterprise:delete",
            Permission::AssociationRead => "association:read",
            Permission::AssociationUpdate => "association:update",
            Permission::AssociationCreate => "association:create",
            Permission::AssociationDelete => "association:delete",
        }
    }
}

const USER_PERMISSIONS: &[Permission] = &[];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AdminRead,
    Permission::AdminUpdate,
    Permission::AdminDelete,
    Permission::AdminCreate,
];

const ENTERPRISE_PERMISSIONS: &[Permission] = &[
    Permission::EnterpriseRead,
    Permission::EnterpriseUpdate,
    Permission::EnterpriseDelete,
    Permission::EnterpriseCreate,
];

const ASSOCIATION_PERMISSIONS: &[Permission] = &[
    Permission::AssociationRead,
    Permission::AssociationUpdate,
    Permission::AssociationDelete,
    Permission::AssociationCreate,
];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Enterprise => "ENTERPRISE",
            Role::Association => "ASSOCIATION",
        }
    }

    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::User => USER_PERMISSIONS,
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Enterprise => ENTERPRISE_PERMISSIONS,
            Role::Association => ASSOCIATION_PERMISSIONS,
        }
    }

    pub fn as_authority(&self) -> String {
        format!("ROLE_{}", self.as_str())
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
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "ENTERPRISE" => Ok(Role::Enterprise),
            "ASSOCIATION" => Ok(Role::Association),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Granted authorities for a role list: each role's permissions followed by
/// its `ROLE_` authority, deduplicated, in role order.
pub fn authorities(roles: &[Role]) -> Vec<String> {
    let mut granted: Vec<String> = Vec::new();
    for role in roles {
        let role_authorities = role
            .permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .chain(std::iter::once(role.as_authority()));
        for authority in role_authorities {
            if !granted.contains(&authority) {
                granted.push(authority);
            }
        }
    }
    granted
}
