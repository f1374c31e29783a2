use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Id;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Cfo,
    IcMember,
    Accountant,
    Viewer,
}

impl Role {
    /// Investment-committee members and viewers are read-only.
    pub fn can_mutate(self) -> bool {
        matches!(self, Role::Admin | Role::Cfo | Role::Accountant)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cfo => "cfo",
            Role::IcMember => "ic_member",
            Role::Accountant => "accountant",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "cfo" => Ok(Role::Cfo),
            "ic_member" => Ok(Role::IcMember),
            "accountant" => Ok(Role::Accountant),
            "viewer" => Ok(Role::Viewer),
            other => Err(Error::validation(format!("unknown role {other:?}"))),
        }
    }
}

/// An already-authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Id,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Id::new(),
            name: name.into(),
            role,
        }
    }

    pub(crate) fn ensure_can_mutate(&self, action: &'static str) -> Result<()> {
        if self.role.can_mutate() {
            Ok(())
        } else {
            Err(Error::Forbidden {
                role: self.role,
                action,
            })
        }
    }
}
