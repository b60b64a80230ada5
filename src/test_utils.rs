// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory directories and catalogs for tests.
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::directory::{Directory, DirectoryError};
use crate::labels::account_part;
use crate::principal::{GroupRecord, Principal, UserRecord};
use crate::rule::{AccessRule, CatalogError, ResourceKind, RuleCatalog};

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Directory holding a fixed set of principals.
///
/// Group members are given by name and resolved on every query, so groups can refer to
/// principals which are added later. Clones share their query counters.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
    principals: HashMap<String, Principal>,
    members: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    offline: bool,
    queries: Arc<Mutex<HashMap<String, usize>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user: UserRecord) -> Self {
        self.principals.insert(key(&user.name), Principal::User(user));
        self
    }

    pub fn group(mut self, group: GroupRecord, members: &[&str]) -> Self {
        self.members.insert(
            key(&group.name),
            members.iter().map(|member| member.to_string()).collect(),
        );
        self.principals.insert(key(&group.name), Principal::Group(group));
        self
    }

    /// Every query fails as if the directory could not be reached.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Member queries of this group fail.
    pub fn fail_members_of(mut self, group: &str) -> Self {
        self.failing.insert(key(group));
        self
    }

    /// Number of member queries issued for a group.
    pub fn member_queries(&self, group: &str) -> usize {
        self.queries
            .lock()
            .map(|queries| queries.get(&key(group)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn check_online(&self) -> Result<(), DirectoryError> {
        if self.offline {
            return Err(DirectoryError::Unavailable("directory is offline".into()));
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&Principal> {
        self.principals
            .get(&key(name))
            .or_else(|| self.principals.get(&key(account_part(name))))
    }
}

impl Directory for MemoryDirectory {
    fn find(&self, name: &str) -> Result<Option<Principal>, DirectoryError> {
        self.check_online()?;
        Ok(self.lookup(name).cloned())
    }

    fn members(&self, group: &GroupRecord) -> Result<Vec<Principal>, DirectoryError> {
        self.check_online()?;

        let group_key = key(&group.name);
        if let Ok(mut queries) = self.queries.lock() {
            *queries.entry(group_key.clone()).or_default() += 1;
        }

        if self.failing.contains(&group_key) {
            return Err(DirectoryError::Query {
                name: group.name.clone(),
                reason: "server is not operational".into(),
            });
        }

        Ok(self
            .members
            .get(&group_key)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|member| self.lookup(member).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn authorization_groups(&self, user: &UserRecord) -> Result<Vec<GroupRecord>, DirectoryError> {
        self.check_online()?;

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([key(&user.name)]);
        let mut groups = Vec::new();

        while let Some(member) = queue.pop_front() {
            for (group, members) in &self.members {
                if visited.contains(group) {
                    continue;
                }
                if !members.iter().any(|name| key(name) == member) {
                    continue;
                }

                visited.insert(group.clone());
                queue.push_back(group.clone());
                if let Some(Principal::Group(record)) = self.principals.get(group) {
                    groups.push(record.clone());
                }
            }
        }

        Ok(groups)
    }
}

/// Directory which blocks inside every member query until the test releases it.
pub struct GatedDirectory {
    inner: MemoryDirectory,
    entered: mpsc::UnboundedSender<String>,
    release: Mutex<mpsc::UnboundedReceiver<()>>,
}

/// Test side of a [`GatedDirectory`].
pub struct Gate {
    entered: mpsc::UnboundedReceiver<String>,
    release: mpsc::UnboundedSender<()>,
}

impl GatedDirectory {
    pub fn new(inner: MemoryDirectory) -> (Self, Gate) {
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::unbounded_channel();

        let directory = Self {
            inner,
            entered: entered_tx,
            release: Mutex::new(release_rx),
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (directory, gate)
    }
}

impl Gate {
    /// Wait until a member query is blocked, returning the queried group.
    pub async fn entered(&mut self) -> Option<String> {
        self.entered.recv().await
    }

    /// Let one blocked member query continue.
    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

impl Directory for GatedDirectory {
    fn find(&self, name: &str) -> Result<Option<Principal>, DirectoryError> {
        self.inner.find(name)
    }

    fn members(&self, group: &GroupRecord) -> Result<Vec<Principal>, DirectoryError> {
        let _ = self.entered.send(group.name.clone());
        if let Ok(mut release) = self.release.lock() {
            // A dropped gate releases all queries.
            let _ = release.blocking_recv();
        }
        self.inner.members(group)
    }

    fn authorization_groups(&self, user: &UserRecord) -> Result<Vec<GroupRecord>, DirectoryError> {
        self.inner.authorization_groups(user)
    }
}

#[derive(Clone, Debug)]
struct MemoryResource {
    kind: ResourceKind,
    owner: Option<String>,
    rules: Vec<AccessRule>,
}

/// Catalog of resources with fixed access rules.
#[derive(Clone, Debug, Default)]
pub struct MemoryCatalog {
    resources: HashMap<PathBuf, MemoryResource>,
    denied: HashSet<PathBuf>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(self, path: impl AsRef<Path>, owner: &str, rules: Vec<AccessRule>) -> Self {
        self.resource(path, ResourceKind::Container, owner, rules)
    }

    pub fn leaf(self, path: impl AsRef<Path>, owner: &str, rules: Vec<AccessRule>) -> Self {
        self.resource(path, ResourceKind::Leaf, owner, rules)
    }

    /// Reading the access rules of this path is denied.
    pub fn denied(mut self, path: impl AsRef<Path>) -> Self {
        self.denied.insert(path.as_ref().to_path_buf());
        self
    }

    fn resource(
        mut self,
        path: impl AsRef<Path>,
        kind: ResourceKind,
        owner: &str,
        rules: Vec<AccessRule>,
    ) -> Self {
        let owner = (!owner.is_empty()).then(|| owner.to_string());
        self.resources
            .insert(path.as_ref().to_path_buf(), MemoryResource { kind, owner, rules });
        self
    }

    fn get(&self, path: &Path) -> Result<&MemoryResource, CatalogError> {
        if self.denied.contains(path) {
            return Err(CatalogError::AccessDenied(path.to_path_buf()));
        }
        self.resources
            .get(path)
            .ok_or_else(|| CatalogError::Unreachable(path.to_path_buf()))
    }
}

impl RuleCatalog for MemoryCatalog {
    fn access_rules(&self, path: &Path) -> Result<Vec<AccessRule>, CatalogError> {
        let resource = self.get(path)?;
        Ok(resource
            .rules
            .iter()
            .cloned()
            .map(|mut rule| {
                rule.resource_kind = resource.kind;
                rule
            })
            .collect())
    }

    fn owner(&self, path: &Path) -> Result<Option<String>, CatalogError> {
        Ok(self.get(path)?.owner.clone())
    }

    fn is_container(&self, path: &Path) -> Result<bool, CatalogError> {
        Ok(self.get(path)?.kind.is_container())
    }
}

fn key(name: &str) -> String {
    name.to_lowercase()
}
