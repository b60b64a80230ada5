// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blocking engine combining the rule catalog, identity resolution, classification and
//! membership expansion.
//!
//! Every operation absorbs failures into empty or partial results and reports them through
//! [`Completeness`]. All methods may block on directory or file-system calls and are meant to be
//! run off the caller's thread, see [`QueryCoordinator`](crate::QueryCoordinator).
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::completeness::Completeness;
use crate::config::Config;
use crate::directory::{Directory, IdentityResolver};
use crate::expand::{Expansion, MembershipExpander};
use crate::grant::{GrantSet, GroupGrant, UserGrant};
use crate::noise::NoiseFilter;
use crate::rule::{ResourceKind, RuleCatalog, RuleInfo};

/// Header information about the selected resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub path: PathBuf,

    /// `None` if the resource could not be read.
    pub kind: Option<ResourceKind>,

    /// Owner identity, followed by its display name in parentheses when the directory knows it.
    pub owner: Option<String>,
}

/// Rules of one resource.
#[derive(Clone, Debug)]
pub struct RuleListing {
    pub resource: ResourceSummary,
    pub rules: Vec<RuleInfo>,
    pub completeness: Completeness,
}

pub struct AccessEngine<C, P, M> {
    catalog: C,
    resolver: IdentityResolver<P, M>,
    noise: NoiseFilter,
    config: Config,
}

impl<C, P, M> AccessEngine<C, P, M>
where
    C: RuleCatalog,
    P: Directory,
    M: Directory,
{
    /// Set up the engine. The noise skip-list is resolved here once, depending on whether the
    /// primary directory could be reached.
    pub fn new(config: Config, catalog: C, resolver: IdentityResolver<P, M>) -> Self {
        let noise = NoiseFilter::new(&config.noise, resolver.primary_reachable());
        Self {
            catalog,
            resolver,
            noise,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn noise(&self) -> &NoiseFilter {
        &self.noise
    }

    pub fn resolver(&self) -> &IdentityResolver<P, M> {
        &self.resolver
    }

    /// Fetch and classify the access rules of a resource.
    ///
    /// An unreadable resource yields no rules and an `Unavailable` marker. Rules whose identity
    /// can't be resolved are kept, without a principal kind.
    pub fn list_rules(&self, path: &Path, cancel: &CancellationToken) -> RuleListing {
        let mut resource = ResourceSummary {
            path: path.to_path_buf(),
            kind: None,
            owner: None,
        };

        let rules = match self.catalog.access_rules(path) {
            Ok(rules) => rules,
            Err(err) => {
                warn!("could not read access rules: {err}");
                return RuleListing {
                    resource,
                    rules: Vec::new(),
                    completeness: Completeness::Unavailable {
                        reason: err.to_string(),
                    },
                };
            }
        };

        match self.catalog.is_container(path) {
            Ok(true) => resource.kind = Some(ResourceKind::Container),
            Ok(false) => resource.kind = Some(ResourceKind::Leaf),
            Err(err) => warn!("could not determine kind of {}: {err}", path.display()),
        }

        match self.catalog.owner(path) {
            Ok(owner) => resource.owner = owner.map(|owner| self.describe_owner(&owner)),
            Err(err) => warn!("could not read owner of {}: {err}", path.display()),
        }

        let mut issues = Vec::new();
        let mut infos = Vec::with_capacity(rules.len());
        for rule in rules {
            let kind = if cancel.is_cancelled() {
                None
            } else {
                match self.resolver.resolve_identity(&rule.identity) {
                    Ok(principal) => principal.map(|principal| principal.kind()),
                    Err(err) => {
                        warn!("could not resolve {}: {err}", rule.identity);
                        issues.push(err.to_string());
                        None
                    }
                }
            };

            let noise = match kind {
                Some(kind) => self.noise.is_noise(kind, &rule.identity),
                None => self.noise.is_noise_name(&rule.identity),
            };
            let (account, domain) = self.config.labels.short_account(&rule.identity);
            infos.push(RuleInfo::new(
                rule,
                account,
                domain,
                kind,
                noise,
                self.config.verbose_rights,
            ));
        }

        if cancel.is_cancelled() {
            debug!("rule listing of {} cancelled", path.display());
            issues.push("rule listing cancelled".into());
        }

        RuleListing {
            resource,
            rules: infos,
            completeness: Completeness::from_issues(issues),
        }
    }

    /// Users and groups granted access through the given rules.
    pub fn expand_rules<'r>(
        &self,
        rules: impl IntoIterator<Item = &'r RuleInfo>,
        cancel: &CancellationToken,
    ) -> Expansion {
        let mut expander = self.expander(cancel);
        for rule in rules {
            expander.add_rule(rule);
        }
        expander.finish()
    }

    /// Groups authorizing the given users.
    pub fn groups_of_users<'u>(
        &self,
        users: impl IntoIterator<Item = &'u UserGrant>,
        cancel: &CancellationToken,
    ) -> Expansion {
        let mut expander = self.expander(cancel);
        for user in users {
            expander.add_user_groups(user);
        }
        expander.finish()
    }

    /// Transitive user members of the given groups, with danger and transit taken from
    /// `baseline`.
    pub fn members_of_groups<'g>(
        &self,
        groups: impl IntoIterator<Item = &'g GroupGrant>,
        baseline: &GrantSet<UserGrant>,
        cancel: &CancellationToken,
    ) -> Expansion {
        let mut expander = self.expander(cancel);
        for group in groups {
            expander.add_group_members(group, baseline);
        }
        expander.finish()
    }

    pub fn expander<'a>(&'a self, cancel: &'a CancellationToken) -> MembershipExpander<'a, P, M> {
        MembershipExpander::new(&self.resolver, &self.noise, &self.config.labels, cancel)
    }

    fn describe_owner(&self, owner: &str) -> String {
        match self.resolver.resolve_identity(owner) {
            Ok(Some(principal)) => match principal.display_name() {
                Some(display_name) if !display_name.is_empty() => {
                    format!("{owner} ({display_name})")
                }
                _ => owner.to_string(),
            },
            Ok(None) => owner.to_string(),
            Err(err) => {
                debug!("could not resolve owner {owner}: {err}");
                owner.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;
    use tokio_util::sync::CancellationToken;

    use crate::completeness::Completeness;
    use crate::config::Config;
    use crate::directory::{DirectoryError, IdentityResolver};
    use crate::labels::LabelConfig;
    use crate::principal::{GroupRecord, PrincipalKind, UserRecord};
    use crate::rights::{FileSystemRights, InheritanceFlags};
    use crate::rule::{AccessRule, ResourceKind};
    use crate::test_utils::{MemoryCatalog, MemoryDirectory};

    use super::AccessEngine;

    type TestEngine = AccessEngine<MemoryCatalog, MemoryDirectory, MemoryDirectory>;

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new()
            .user(UserRecord::new("alice").with_names("Alice Doe", "Alice", "Doe"))
            .user(UserRecord::new("bob"))
            .group(GroupRecord::new("Finance"), &["alice", "bob"])
    }

    fn catalog() -> MemoryCatalog {
        let rule = |identity: &str, rights| AccessRule::allow(identity, rights, ResourceKind::Leaf);

        MemoryCatalog::new()
            .container(
                "/srv/finance",
                "BANK\\alice",
                vec![
                    rule("BANK\\Finance", FileSystemRights::FULL_CONTROL),
                    AccessRule::deny("contractor", FileSystemRights::WRITE, ResourceKind::Leaf),
                    rule("BUILTIN\\Administrators", FileSystemRights::FULL_CONTROL),
                    rule("S-1-5-21-1004", FileSystemRights::READ_AND_EXECUTE),
                ],
            )
            .leaf(
                "/srv/finance/report.xlsx",
                "",
                vec![
                    rule("Finance", FileSystemRights::READ_AND_EXECUTE)
                        .with_inheritance(InheritanceFlags::empty()),
                ],
            )
            .denied("/srv/secret")
    }

    fn engine() -> TestEngine {
        let config = Config {
            labels: LabelConfig {
                account_prefix: Some("BANK\\".into()),
                strip_segments: Vec::new(),
            },
            ..Config::default()
        };
        let resolver = IdentityResolver::connect(Ok(directory()), MemoryDirectory::new());
        AccessEngine::new(config, catalog(), resolver)
    }

    #[test]
    fn lists_classified_rules() {
        let engine = engine();
        let listing = engine.list_rules(Path::new("/srv/finance"), &CancellationToken::new());

        assert!(listing.completeness.is_complete());
        assert_eq!(listing.resource.kind, Some(ResourceKind::Container));
        assert_eq!(
            listing.resource.owner.as_deref(),
            Some("BANK\\alice (Alice Doe)")
        );

        let rules = &listing.rules;
        assert_eq!(rules.len(), 4);

        assert_eq!(rules[0].account, "Finance");
        assert!(rules[0].domain);
        assert_eq!(rules[0].kind, Some(PrincipalKind::Group));
        assert_eq!(rules[0].summary.flags, "F");
        // The catalog stamps the kind of the resource on every rule.
        assert_eq!(rules[0].rule.resource_kind, ResourceKind::Container);

        assert_eq!(rules[1].summary.flags, "xW");
        assert_eq!(rules[1].kind, None);

        // Noise rules stay listed.
        assert!(rules[2].noise);
        assert!(!rules[0].noise);

        // Unresolved identities stay listed without a kind.
        assert_eq!(rules[3].kind, None);
        assert_eq!(rules[3].summary.flags, "R");
    }

    #[test]
    fn leaf_resources_never_transit() {
        let engine = engine();
        let listing = engine.list_rules(
            Path::new("/srv/finance/report.xlsx"),
            &CancellationToken::new(),
        );

        assert_eq!(listing.resource.kind, Some(ResourceKind::Leaf));
        assert_eq!(listing.resource.owner, None);
        assert_eq!(listing.rules[0].summary.flags, "R");
        assert!(!listing.rules[0].summary.transit);
        assert!(listing.rules[0].details.starts_with('['));
    }

    #[test]
    fn unreadable_resource() {
        let engine = engine();
        let cancel = CancellationToken::new();

        let denied = engine.list_rules(Path::new("/srv/secret"), &cancel);
        assert!(denied.rules.is_empty());
        assert_matches!(denied.completeness, Completeness::Unavailable { .. });

        let missing = engine.list_rules(Path::new("//fileserver/gone"), &cancel);
        assert!(missing.rules.is_empty());
        assert_matches!(missing.completeness, Completeness::Unavailable { .. });
    }

    #[test]
    fn expands_listed_rules() {
        let engine = engine();
        let cancel = CancellationToken::new();
        let listing = engine.list_rules(Path::new("/srv/finance"), &cancel);

        let expansion = engine.expand_rules(&listing.rules, &cancel);
        let mut users: Vec<_> = expansion.users.keys().collect();
        users.sort();
        assert_eq!(users, vec!["alice", "bob"]);
        assert!(expansion.users.iter().all(|user| user.danger));
        assert_eq!(expansion.groups.keys().collect::<Vec<_>>(), vec!["Finance"]);

        let groups = engine.groups_of_users(expansion.users.get("bob"), &cancel);
        assert_eq!(groups.groups.keys().collect::<Vec<_>>(), vec!["Finance"]);
        assert_eq!(
            groups.groups.get("Finance").unwrap().origin.as_ref().unwrap().username,
            "bob"
        );

        let members =
            engine.members_of_groups(&expansion.groups, &expansion.users, &cancel);
        assert_eq!(members.users.len(), 2);
        assert!(members.users.iter().all(|user| user.danger));
    }

    #[test]
    fn machine_accounts_without_primary_directory() {
        let machine = MemoryDirectory::new()
            .user(UserRecord::new("operator"))
            .user(UserRecord::new("Administrator"))
            .group(GroupRecord::new("Users"), &["operator"])
            .group(GroupRecord::new("Administrators"), &["Administrator"]);
        let catalog = MemoryCatalog::new().container(
            "C:\\data",
            "",
            vec![
                AccessRule::allow("BUILTIN\\Users", FileSystemRights::MODIFY, ResourceKind::Leaf),
                AccessRule::allow(
                    "BUILTIN\\Administrators",
                    FileSystemRights::FULL_CONTROL,
                    ResourceKind::Leaf,
                ),
            ],
        );
        let resolver: IdentityResolver<MemoryDirectory, _> = IdentityResolver::connect(
            Err(DirectoryError::Unavailable("no domain".into())),
            machine,
        );
        let engine = AccessEngine::new(Config::default(), catalog, resolver);
        let cancel = CancellationToken::new();

        let listing = engine.list_rules(Path::new("C:\\data"), &cancel);
        // "Users" is only noise when the primary directory is reachable.
        assert!(!listing.rules[0].noise);
        assert!(listing.rules[1].noise);

        let expansion = engine.expand_rules(&listing.rules, &cancel);
        assert_eq!(expansion.users.keys().collect::<Vec<_>>(), vec!["operator"]);
        assert!(expansion.users.get("operator").unwrap().danger);
    }
}
