// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolved directory identities.
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Directory context a principal was resolved in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DirectoryContext {
    /// Network-backed directory (for example a domain).
    #[default]
    Primary,

    /// Accounts of the local machine.
    Machine,
}

/// Handle which can be passed back to the directory a principal came from to query its
/// memberships.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipalRef {
    pub context: DirectoryContext,

    /// Directory specific identifier, for example a distinguished name or a security identifier.
    pub id: String,
}

impl PrincipalRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            context: DirectoryContext::default(),
            id: id.into(),
        }
    }
}

/// Kind of a principal without its record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalKind {
    User,
    Group,
}

impl Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "User"),
            PrincipalKind::Group => write!(f, "Group"),
        }
    }
}

/// An individual account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account (login) name.
    pub name: String,
    pub enabled: bool,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,

    /// Organizational path, for example `CN=Alice Doe,OU=Finance,DC=corp,DC=example`.
    pub distinguished_name: Option<String>,
    pub reference: PrincipalRef,
}

impl UserRecord {
    /// Returns an enabled user without any names, referenced by its account name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            reference: PrincipalRef::new(name.clone()),
            name,
            enabled: true,
            display_name: None,
            given_name: None,
            surname: None,
            distinguished_name: None,
        }
    }

    pub fn with_names(
        mut self,
        display_name: impl Into<String>,
        given_name: impl Into<String>,
        surname: impl Into<String>,
    ) -> Self {
        self.display_name = Some(display_name.into());
        self.given_name = Some(given_name.into());
        self.surname = Some(surname.into());
        self
    }

    pub fn with_distinguished_name(mut self, distinguished_name: impl Into<String>) -> Self {
        self.distinguished_name = Some(distinguished_name.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A group of users and other groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Account name of the group.
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub distinguished_name: Option<String>,
    pub reference: PrincipalRef,
}

impl GroupRecord {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            reference: PrincipalRef::new(name.clone()),
            name,
            display_name: None,
            description: None,
            distinguished_name: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Description of the group, falling back to its display and then its account name.
    pub fn describe(&self) -> String {
        self.description
            .as_deref()
            .filter(|description| !description.is_empty())
            .or(self.display_name.as_deref().filter(|name| !name.is_empty()))
            .unwrap_or(&self.name)
            .to_string()
    }
}

/// A resolved identity, either an individual or a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    User(UserRecord),
    Group(GroupRecord),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::Group(_) => PrincipalKind::Group,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Principal::User(user) => &user.name,
            Principal::Group(group) => &group.name,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Principal::User(user) => user.display_name.as_deref(),
            Principal::Group(group) => group.display_name.as_deref(),
        }
    }

    pub fn reference(&self) -> &PrincipalRef {
        match self {
            Principal::User(user) => &user.reference,
            Principal::Group(group) => &group.reference,
        }
    }

    /// Move the principal into the directory context it was found in.
    pub(crate) fn in_context(mut self, context: DirectoryContext) -> Self {
        match &mut self {
            Principal::User(user) => user.reference.context = context,
            Principal::Group(group) => group.reference.context = context,
        }
        self
    }
}

impl From<UserRecord> for Principal {
    fn from(user: UserRecord) -> Self {
        Principal::User(user)
    }
}

impl From<GroupRecord> for Principal {
    fn from(group: GroupRecord) -> Self {
        Principal::Group(group)
    }
}
