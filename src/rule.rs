// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access rules read from a resource and the catalog interface they are fetched through.
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{RightsSummary, classify, enumerate_rights};
use crate::principal::PrincipalKind;
use crate::rights::{FileSystemRights, InheritanceFlags};

/// Whether a rule grants or withholds its rights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    Allow,
    Deny,
}

impl AccessType {
    pub fn is_deny(&self) -> bool {
        matches!(self, AccessType::Deny)
    }
}

/// A resource either contains other resources (folder) or does not (file).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Container,
    Leaf,
}

impl ResourceKind {
    pub fn is_container(&self) -> bool {
        matches!(self, ResourceKind::Container)
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Container => write!(f, "container"),
            ResourceKind::Leaf => write!(f, "leaf"),
        }
    }
}

/// A single access control entry as read from a resource. Never modified after it was read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    /// Identity name as stored in the entry, for example `BANK\Finance`.
    pub identity: String,
    pub access: AccessType,
    pub rights: FileSystemRights,
    pub inheritance: InheritanceFlags,
    pub inherited: bool,
    pub resource_kind: ResourceKind,
}

impl AccessRule {
    /// Returns a rule which propagates to all children and is set directly on the resource.
    pub fn new(
        identity: impl Into<String>,
        access: AccessType,
        rights: FileSystemRights,
        resource_kind: ResourceKind,
    ) -> Self {
        Self {
            identity: identity.into(),
            access,
            rights,
            inheritance: InheritanceFlags::CONTAINER_INHERIT | InheritanceFlags::OBJECT_INHERIT,
            inherited: false,
            resource_kind,
        }
    }

    pub fn allow(
        identity: impl Into<String>,
        rights: FileSystemRights,
        resource_kind: ResourceKind,
    ) -> Self {
        Self::new(identity, AccessType::Allow, rights, resource_kind)
    }

    pub fn deny(
        identity: impl Into<String>,
        rights: FileSystemRights,
        resource_kind: ResourceKind,
    ) -> Self {
        Self::new(identity, AccessType::Deny, rights, resource_kind)
    }

    pub fn with_inheritance(mut self, inheritance: InheritanceFlags) -> Self {
        self.inheritance = inheritance;
        self
    }

    pub fn with_inherited(mut self, inherited: bool) -> Self {
        self.inherited = inherited;
        self
    }

    /// Simplified rights summary of this rule.
    pub fn summary(&self) -> RightsSummary {
        classify(
            self.rights,
            self.access,
            self.inheritance,
            self.resource_kind,
        )
    }
}

/// Errors occurring when reading the access control list of a resource.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("access to {0} was denied")]
    AccessDenied(PathBuf),

    #[error("{0} is unreachable")]
    Unreachable(PathBuf),

    #[error("failed reading access rules of {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of access rules for file-system resources.
///
/// Implementations are thin wrappers around the operating system and are allowed to block.
pub trait RuleCatalog: Send + Sync {
    /// Ordered access rules of the resource, explicit entries first as the OS reports them.
    ///
    /// Implementations fill in `resource_kind` of every returned rule.
    fn access_rules(&self, path: &Path) -> Result<Vec<AccessRule>, CatalogError>;

    /// Identity name of the resource owner.
    fn owner(&self, path: &Path) -> Result<Option<String>, CatalogError>;

    /// Returns true if the resource is a container.
    fn is_container(&self, path: &Path) -> Result<bool, CatalogError>;
}

/// Row of the Rules view: an access rule together with everything derived from it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleInfo {
    pub rule: AccessRule,

    /// Account name for display, with the configured domain prefix removed.
    pub account: String,

    /// True if the identity carried the configured domain prefix.
    pub domain: bool,

    /// Kind of the resolved principal, `None` if the identity could not be resolved.
    pub kind: Option<PrincipalKind>,

    pub summary: RightsSummary,

    /// Enumeration of the named rights contained in the mask.
    pub details: String,

    /// The identity is on the skip-list and is not expanded into members.
    pub noise: bool,

    pub selected: bool,
}

impl RuleInfo {
    pub fn new(
        rule: AccessRule,
        account: String,
        domain: bool,
        kind: Option<PrincipalKind>,
        noise: bool,
        verbose: bool,
    ) -> Self {
        let summary = rule.summary();
        let details = enumerate_rights(rule.rights, rule.inheritance, verbose);
        Self {
            rule,
            account,
            domain,
            kind,
            summary,
            details,
            noise,
            selected: false,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, Some(PrincipalKind::Group))
    }

    pub fn is_deny(&self) -> bool {
        self.rule.access.is_deny()
    }
}

#[cfg(test)]
mod tests {
    use crate::principal::PrincipalKind;
    use crate::rights::{FileSystemRights, InheritanceFlags};

    use super::{AccessRule, AccessType, ResourceKind, RuleInfo};

    #[test]
    fn rule_defaults_propagate() {
        let rule = AccessRule::allow(
            "Finance",
            FileSystemRights::READ_AND_EXECUTE,
            ResourceKind::Container,
        );
        assert_eq!(rule.access, AccessType::Allow);
        assert!(!rule.inheritance.is_this_object_only());
        assert!(!rule.inherited);

        let rule = rule
            .with_inheritance(InheritanceFlags::empty())
            .with_inherited(true);
        assert!(rule.inheritance.is_this_object_only());
        assert!(rule.inherited);
    }

    #[test]
    fn rule_info_derives_summary() {
        let rule = AccessRule::deny("contractor", FileSystemRights::WRITE, ResourceKind::Leaf);
        let info = RuleInfo::new(
            rule,
            "contractor".into(),
            false,
            Some(PrincipalKind::User),
            false,
            false,
        );
        assert_eq!(info.summary.flags, "xW");
        assert_eq!(info.details, "CreateDirectories, CreateFiles, Write");
        assert!(info.is_deny());
        assert!(!info.is_group());
        assert!(!info.selected);
    }
}
