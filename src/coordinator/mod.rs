// SPDX-License-Identifier: MIT OR Apache-2.0

//! Selection-driven coordinator owning the Rules, Users and Groups views.
//!
//! ```text
//!                  select_path
//!   Idle ──────────────────────────────▶ PathSelected
//!                                          │  ▲
//!               select_rules / users /     │  │ select_path
//!               groups                     ▼  │
//!                           RuleFocused / UserFocused / GroupFocused
//! ```
//!
//! Every selection is one computation run on the blocking thread pool. Only one computation is
//! in flight at a time: with [`SelectionPolicy::Supersede`] a new selection cancels the running
//! one, with [`SelectionPolicy::DropWhileBusy`] the new selection is ignored and has to be
//! re-issued by the caller. Each computation is tagged with a generation number, a completion
//! whose generation is not the latest one is discarded instead of published.
//!
//! A computation runs to completion and publishes its results even if the caller stops waiting
//! for the selection, for example because it was wrapped in a timeout.
//!
//! The views are only ever written by the coordinator. Users and groups are always derived from
//! the rules of the same path selection.
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::completeness::Completeness;
use crate::config::SelectionPolicy;
use crate::directory::Directory;
use crate::engine::{AccessEngine, ResourceSummary, RuleListing};
use crate::expand::Expansion;
use crate::grant::{GrantSet, GroupGrant, UserGrant};
use crate::rule::{RuleCatalog, RuleInfo};


#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// Nothing was selected yet.
    #[default]
    Idle,

    /// All views show everything derived from the selected resource.
    PathSelected,

    /// Users and groups are derived from the checked rules.
    RuleFocused,

    /// Groups are derived from the checked users.
    UserFocused,

    /// Users are derived from the checked groups.
    GroupFocused,
}

/// Published views together with how completely each of them could be computed.
#[derive(Clone, Debug, Default)]
pub struct Views {
    pub resource: Option<ResourceSummary>,
    pub rules: Vec<RuleInfo>,
    pub users: GrantSet<UserGrant>,
    pub groups: GrantSet<GroupGrant>,
    pub rules_status: Completeness,
    pub users_status: Completeness,
    pub groups_status: Completeness,
}

/// What happened to a selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The views were recomputed and published, the coordinator is now in the given state.
    Published(State),

    /// A newer selection arrived while this one was computed, its results were discarded.
    Superseded,

    /// Another selection was in flight and the policy drops new selections while busy.
    Dropped,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("no resource is selected")]
    NoResource,

    #[error("unknown selection: {0}")]
    UnknownSelection(String),

    #[error("background computation failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    views: Views,

    /// All users granted through the selected resource, used for danger of group members.
    baseline: GrantSet<UserGrant>,

    generation: u64,
    in_flight: Option<CancellationToken>,
}

pub struct QueryCoordinator<C, P, M> {
    engine: Arc<AccessEngine<C, P, M>>,
    policy: SelectionPolicy,
    inner: Arc<Mutex<Inner>>,
}

impl<C, P, M> QueryCoordinator<C, P, M>
where
    C: RuleCatalog + 'static,
    P: Directory + 'static,
    M: Directory + 'static,
{
    pub fn new(engine: AccessEngine<C, P, M>) -> Self {
        let policy = engine.config().selection_policy;
        Self {
            engine: Arc::new(engine),
            policy,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn engine(&self) -> &AccessEngine<C, P, M> {
        &self.engine
    }

    pub async fn state(&self) -> State {
        self.inner.lock().await.state
    }

    /// Snapshot of the published views.
    pub async fn views(&self) -> Views {
        self.inner.lock().await.views.clone()
    }

    /// Returns true if a selection is being computed.
    pub async fn is_busy(&self) -> bool {
        self.inner.lock().await.in_flight.is_some()
    }

    /// Select a resource and rebuild all views from its access rules.
    pub async fn select_path(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<Outcome, CoordinatorError> {
        let path = path.into();

        let (generation, cancel) = {
            let mut inner = self.inner.lock().await;
            if self.drop_while_busy(&inner) {
                return Ok(Outcome::Dropped);
            }
            let ticket = self.begin(&mut inner);
            inner.views = Views::default();
            inner.baseline = GrantSet::new();
            ticket
        };

        self.execute(
            generation,
            move |engine| {
                let listing = engine.list_rules(&path, &cancel);
                let expansion = engine.expand_rules(&listing.rules, &cancel);
                (listing, expansion)
            },
            |inner: &mut Inner, (listing, expansion): (RuleListing, Expansion)| {
                let derived_status = listing.completeness.clone().merge(expansion.completeness);
                inner.baseline = expansion.users.clone();
                inner.views = Views {
                    resource: Some(listing.resource),
                    rules: listing.rules,
                    users: expansion.users,
                    groups: expansion.groups,
                    rules_status: listing.completeness,
                    users_status: derived_status.clone(),
                    groups_status: derived_status,
                };
                State::PathSelected
            },
        )
        .await
    }

    /// Check the rules at the given positions and rebuild users and groups from them only.
    pub async fn select_rules(&self, checked: &[usize]) -> Result<Outcome, CoordinatorError> {
        let (generation, cancel, selected) = {
            let mut inner = self.inner.lock().await;
            if self.drop_while_busy(&inner) {
                return Ok(Outcome::Dropped);
            }
            if inner.views.resource.is_none() {
                return Err(CoordinatorError::NoResource);
            }
            if let Some(position) = checked
                .iter()
                .find(|position| **position >= inner.views.rules.len())
            {
                return Err(CoordinatorError::UnknownSelection(format!("rule {position}")));
            }

            let (generation, cancel) = self.begin(&mut inner);
            for (position, rule) in inner.views.rules.iter_mut().enumerate() {
                rule.selected = checked.contains(&position);
            }
            let selected: Vec<RuleInfo> = inner
                .views
                .rules
                .iter()
                .filter(|rule| rule.selected)
                .cloned()
                .collect();

            inner.views.users = GrantSet::new();
            inner.views.groups = GrantSet::new();
            (generation, cancel, selected)
        };

        self.execute(
            generation,
            move |engine| engine.expand_rules(&selected, &cancel),
            |inner: &mut Inner, expansion: Expansion| {
                let derived_status = inner
                    .views
                    .rules_status
                    .clone()
                    .merge(expansion.completeness);
                inner.views.users = expansion.users;
                inner.views.groups = expansion.groups;
                inner.views.users_status = derived_status.clone();
                inner.views.groups_status = derived_status;
                State::RuleFocused
            },
        )
        .await
    }

    /// Check the given users and rebuild the groups from their authorization groups.
    pub async fn select_users(&self, checked: &[&str]) -> Result<Outcome, CoordinatorError> {
        let (generation, cancel, selected) = {
            let mut inner = self.inner.lock().await;
            if self.drop_while_busy(&inner) {
                return Ok(Outcome::Dropped);
            }
            if inner.views.resource.is_none() {
                return Err(CoordinatorError::NoResource);
            }
            if let Some(unknown) = checked
                .iter()
                .find(|username| !inner.views.users.contains(username))
            {
                return Err(CoordinatorError::UnknownSelection(unknown.to_string()));
            }

            let (generation, cancel) = self.begin(&mut inner);
            let mut selected = Vec::new();
            for user in inner.views.users.iter_mut() {
                user.selected = checked.contains(&user.username.as_str());
                if user.selected {
                    selected.push(user.clone());
                }
            }

            inner.views.groups = GrantSet::new();
            (generation, cancel, selected)
        };

        self.execute(
            generation,
            move |engine| engine.groups_of_users(&selected, &cancel),
            |inner: &mut Inner, expansion: Expansion| {
                inner.views.groups = expansion.groups;
                inner.views.groups_status = expansion.completeness;
                State::UserFocused
            },
        )
        .await
    }

    /// Check the given groups and rebuild the users from their transitive members.
    ///
    /// Danger of every member is taken from the users of the whole resource.
    pub async fn select_groups(&self, checked: &[&str]) -> Result<Outcome, CoordinatorError> {
        let (generation, cancel, selected, baseline) = {
            let mut inner = self.inner.lock().await;
            if self.drop_while_busy(&inner) {
                return Ok(Outcome::Dropped);
            }
            if inner.views.resource.is_none() {
                return Err(CoordinatorError::NoResource);
            }
            if let Some(unknown) = checked
                .iter()
                .find(|name| !inner.views.groups.contains(name))
            {
                return Err(CoordinatorError::UnknownSelection(unknown.to_string()));
            }

            let (generation, cancel) = self.begin(&mut inner);
            let mut selected = Vec::new();
            for group in inner.views.groups.iter_mut() {
                group.selected = checked.contains(&group.name.as_str());
                if group.selected {
                    selected.push(group.clone());
                }
            }

            inner.views.users = GrantSet::new();
            (generation, cancel, selected, inner.baseline.clone())
        };

        self.execute(
            generation,
            move |engine| engine.members_of_groups(&selected, &baseline, &cancel),
            |inner: &mut Inner, expansion: Expansion| {
                inner.views.users = expansion.users;
                inner.views.users_status = expansion.completeness;
                State::GroupFocused
            },
        )
        .await
    }

    fn drop_while_busy(&self, inner: &Inner) -> bool {
        if self.policy == SelectionPolicy::DropWhileBusy && inner.in_flight.is_some() {
            debug!("selection dropped, generation {} is in flight", inner.generation);
            return true;
        }
        false
    }

    /// Start a new generation, cancelling the one in flight.
    fn begin(&self, inner: &mut Inner) -> (u64, CancellationToken) {
        if let Some(previous) = inner.in_flight.take() {
            debug!("superseding generation {}", inner.generation);
            previous.cancel();
        }

        inner.generation += 1;
        let cancel = CancellationToken::new();
        inner.in_flight = Some(cancel.clone());
        (inner.generation, cancel)
    }

    /// Run `task` on the blocking thread pool and `apply` its result to the views.
    ///
    /// Both happen in a detached task, so the in-flight marker is cleared and fresh results are
    /// published even if the returned future is dropped.
    async fn execute<T, F, A>(
        &self,
        generation: u64,
        task: F,
        apply: A,
    ) -> Result<Outcome, CoordinatorError>
    where
        T: Send + 'static,
        F: FnOnce(&AccessEngine<C, P, M>) -> T + Send + 'static,
        A: FnOnce(&mut Inner, T) -> State + Send + 'static,
    {
        let engine = self.engine.clone();
        let inner = self.inner.clone();

        let handle = tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || task(&engine)).await;
            let mut inner = inner.lock().await;
            match result {
                Ok(result) => {
                    if !inner.finish(generation) {
                        return Ok(Outcome::Superseded);
                    }
                    let state = apply(&mut *inner, result);
                    Ok(inner.publish(state))
                }
                Err(err) => {
                    if inner.generation == generation {
                        inner.in_flight = None;
                    }
                    Err(CoordinatorError::from(err))
                }
            }
        });

        handle.await?
    }
}

impl Inner {
    /// Returns false if the generation is stale and its results must be discarded.
    fn finish(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            debug!(
                "discarding stale results of generation {generation}, latest is {}",
                self.generation
            );
            return false;
        }

        self.in_flight = None;
        true
    }

    fn publish(&mut self, state: State) -> Outcome {
        self.state = state;
        debug!("published generation {} in state {state:?}", self.generation);
        Outcome::Published(state)
    }
}
