// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expansion of access rules into the users and groups they grant access to.
//!
//! Groups are expanded into their full transitive membership by walking the containment graph
//! breadth-first, asking the directory for the direct members of every group exactly once. A group
//! which is reached a second time (through a cycle or through a second path) is not queried again.
//!
//! User grants are merged following a "first writer wins" policy:
//!
//! - A user which is not yet known is added, unless the grant comes from a deny rule. Deny rules
//!   never make a user visible.
//! - A user which is already known is never changed, except that an enabled user which is not yet
//!   marked as dangerous is escalated when a dangerous grant arrives. Danger is never removed.
//!
//! As a consequence a user is listed if and only if it is reachable through at least one allow
//! rule, independent of the order in which rules are processed. Deny rules do not remove users
//! which are also reachable through an allow rule.
//!
//! Failures while talking to the directory and cancellation don't abort an expansion, the
//! expander continues with whatever it can still reach and reports the expansion as partial.
use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::completeness::Completeness;
use crate::directory::{Directory, IdentityResolver};
use crate::grant::{GrantOrigin, GrantSet, GroupGrant, UserGrant};
use crate::graph::{MembershipGraph, NodeId};
use crate::labels::LabelConfig;
use crate::noise::NoiseFilter;
use crate::principal::{GroupRecord, Principal, PrincipalKind, UserRecord};
use crate::rule::{AccessType, RuleInfo};

/// What a rule contributes to every user it reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrantSource {
    pub access: AccessType,
    pub danger: bool,
    pub transit: bool,
}

impl From<&RuleInfo> for GrantSource {
    fn from(rule: &RuleInfo) -> Self {
        Self {
            access: rule.rule.access,
            danger: rule.summary.danger,
            transit: rule.summary.transit,
        }
    }
}

/// Result of an expansion.
#[derive(Clone, Debug, Default)]
pub struct Expansion {
    pub users: GrantSet<UserGrant>,
    pub groups: GrantSet<GroupGrant>,
    pub completeness: Completeness,
}

/// Accumulates user and group grants for one rebuild of the views.
pub struct MembershipExpander<'a, P, M> {
    resolver: &'a IdentityResolver<P, M>,
    noise: &'a NoiseFilter,
    labels: &'a LabelConfig,
    cancel: &'a CancellationToken,
    users: GrantSet<UserGrant>,
    groups: GrantSet<GroupGrant>,
    issues: Vec<String>,
    cancelled: bool,
}

impl<'a, P, M> MembershipExpander<'a, P, M>
where
    P: Directory,
    M: Directory,
{
    pub fn new(
        resolver: &'a IdentityResolver<P, M>,
        noise: &'a NoiseFilter,
        labels: &'a LabelConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            resolver,
            noise,
            labels,
            cancel,
            users: GrantSet::new(),
            groups: GrantSet::new(),
            issues: Vec::new(),
            cancelled: false,
        }
    }

    /// Expand a rule into user grants for every user it reaches and group grants for its group
    /// and all groups nested in it.
    pub fn add_rule(&mut self, rule: &RuleInfo) {
        if rule.noise {
            debug!("not expanding noise principal {}", rule.rule.identity);
            return;
        }

        // A deny rule can neither add a user nor escalate one, skip the directory round trips.
        if rule.is_deny() {
            debug!("deny rule for {} contributes no grants", rule.rule.identity);
            return;
        }

        let Some(principal) = self.resolve(&rule.rule.identity) else {
            return;
        };
        let source = GrantSource::from(rule);

        match principal {
            Principal::User(user) => self.add_grant(source, &user),
            Principal::Group(group) => {
                if self.noise.is_noise(PrincipalKind::Group, &group.name) {
                    return;
                }

                let (graph, root) = self.walk(&group);
                for user in graph.users(root) {
                    self.add_grant(source, user);
                }

                self.groups.insert(GroupGrant::new(&group));
                self.register_groups(&graph, root);
            }
        }
    }

    /// Merge the grant of one user reached through a rule.
    pub fn add_grant(&mut self, source: GrantSource, user: &UserRecord) {
        if self.noise.is_noise(PrincipalKind::User, &user.name) {
            return;
        }

        let grant = UserGrant::new(
            user,
            self.labels,
            user.enabled && source.danger,
            source.transit,
        );

        match self.users.get_mut(&grant.username) {
            Some(existing) => {
                if existing.enabled && !existing.danger && grant.danger {
                    existing.danger = true;
                }
            }
            None => {
                if !source.access.is_deny() {
                    self.users.insert(grant);
                }
            }
        }
    }

    /// Register every group nested in the rule's group, at any depth.
    pub fn add_nested_groups(&mut self, rule: &RuleInfo) {
        if rule.noise || rule.is_deny() {
            return;
        }

        if let Some(Principal::Group(group)) = self.resolve(&rule.rule.identity) {
            let (graph, root) = self.walk(&group);
            self.register_groups(&graph, root);
        }
    }

    /// Register all groups which authorize the given user.
    pub fn add_user_groups(&mut self, user: &UserGrant) {
        let record = match self.resolve(&user.username) {
            Some(Principal::User(record)) => record,
            Some(Principal::Group(_)) => {
                debug!("{} is not a user", user.username);
                return;
            }
            None => return,
        };

        if self.check_cancelled() {
            return;
        }

        let groups = match self.resolver.authorization_groups(&record) {
            Ok(groups) => groups,
            Err(err) => {
                warn!("authorization groups of {} unavailable: {err}", user.username);
                self.issues.push(err.to_string());
                return;
            }
        };

        let origin = GrantOrigin {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        };
        for group in groups {
            if self.noise.is_noise(PrincipalKind::Group, &group.name) {
                continue;
            }
            self.groups
                .insert(GroupGrant::new(&group).with_origin(origin.clone()));
        }
    }

    /// Add all transitive user members of a group.
    ///
    /// Danger and transit of every user are taken from `baseline`, the users of the whole
    /// resource. Members which are not in the baseline don't have access through the resource and
    /// are listed as harmless.
    pub fn add_group_members(&mut self, group: &GroupGrant, baseline: &GrantSet<UserGrant>) {
        let record = match self.resolve(&group.name) {
            Some(Principal::Group(record)) => record,
            Some(Principal::User(_)) => {
                debug!("{} is not a group", group.name);
                return;
            }
            None => return,
        };

        let (graph, root) = self.walk(&record);
        for user in graph.users(root) {
            if self.noise.is_noise(PrincipalKind::User, &user.name) {
                continue;
            }

            let (danger, transit) = baseline
                .get(&user.name)
                .map(|known| (known.danger, known.transit))
                .unwrap_or((false, false));
            self.users
                .insert(UserGrant::new(user, self.labels, danger, transit));
        }
    }

    pub fn finish(self) -> Expansion {
        Expansion {
            users: self.users,
            groups: self.groups,
            completeness: Completeness::from_issues(self.issues),
        }
    }

    /// Discover the containment graph below a group.
    ///
    /// Noise principals are neither recorded nor descended into.
    fn walk(&mut self, group: &GroupRecord) -> (MembershipGraph, NodeId) {
        let mut graph = MembershipGraph::new();
        let (root, _) = graph.add_principal(Principal::Group(group.clone()));

        let mut queue = VecDeque::from([(root, group.clone())]);
        while let Some((node, current)) = queue.pop_front() {
            if self.check_cancelled() {
                break;
            }

            let members = match self.resolver.members(&current) {
                Ok(members) => members,
                Err(err) => {
                    warn!("members of {} unavailable: {err}", current.name);
                    self.issues.push(err.to_string());
                    continue;
                }
            };

            for member in members {
                if self.noise.is_noise(member.kind(), member.name()) {
                    debug!("skipping noise member {} of {}", member.name(), current.name);
                    continue;
                }

                let nested = match &member {
                    Principal::Group(nested) => Some(nested.clone()),
                    Principal::User(_) => None,
                };
                let (child, new) = graph.add_principal(member);
                graph.add_membership(node, child);

                if let (true, Some(nested)) = (new, nested) {
                    queue.push_back((child, nested));
                }
            }
        }

        (graph, root)
    }

    fn register_groups(&mut self, graph: &MembershipGraph, root: NodeId) {
        for nested in graph.groups(root) {
            self.groups.insert(GroupGrant::new(nested));
        }
    }

    fn resolve(&mut self, name: &str) -> Option<Principal> {
        if self.check_cancelled() {
            return None;
        }

        match self.resolver.resolve_identity(name) {
            Ok(Some(principal)) => Some(principal),
            Ok(None) => {
                debug!("skipping unresolved principal {name}");
                None
            }
            Err(err) => {
                warn!("could not resolve {name}: {err}");
                self.issues.push(err.to_string());
                None
            }
        }
    }

    fn check_cancelled(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            if !self.cancelled {
                debug!("expansion cancelled");
                self.issues.push("expansion cancelled".into());
                self.cancelled = true;
            }
            return true;
        }
        false
    }
}
