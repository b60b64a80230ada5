// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only review of who can access a file-system resource.
//!
//! The access rules of a resource are fetched through a [`RuleCatalog`], their identities are
//! resolved against a primary directory with the local machine as fallback
//! ([`IdentityResolver`]), their rights masks are classified into short flag codes
//! ([`classify`]) and group principals are expanded into the full, transitive set of users they
//! contain ([`MembershipExpander`]). Administrative and well-known system principals are filtered
//! through a configurable [`NoiseFilter`].
//!
//! [`QueryCoordinator`] ties everything together behind four selection events and owns the
//! resulting Rules, Users and Groups views:
//!
//! ```ignore
//! let resolver = IdentityResolver::connect(DomainDirectory::connect(), MachineDirectory::new());
//! let engine = AccessEngine::new(Config::from_file(&path)?, AclCatalog, resolver);
//! let coordinator = QueryCoordinator::new(engine);
//!
//! coordinator.select_path("//fileserver/finance").await?;
//! coordinator.select_rules(&[0]).await?;
//!
//! let views = coordinator.views().await;
//! println!("{}", export::users_tsv(&views.resource.unwrap().path, &views.users));
//! ```
//!
//! Directories and catalogs are thin wrappers around blocking OS calls and are implemented
//! outside of this crate.
pub mod classify;
pub mod completeness;
pub mod config;
pub mod coordinator;
pub mod directory;
pub mod engine;
pub mod expand;
pub mod export;
pub mod grant;
pub mod graph;
pub mod labels;
pub mod noise;
pub mod principal;
pub mod rights;
pub mod rule;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use classify::{RightsSummary, classify, enumerate_rights};
pub use completeness::Completeness;
pub use config::{Config, ConfigError, SelectionPolicy};
pub use coordinator::{CoordinatorError, Outcome, QueryCoordinator, State, Views};
pub use directory::{Directory, DirectoryError, IdentityResolver};
pub use engine::{AccessEngine, ResourceSummary, RuleListing};
pub use expand::{Expansion, GrantSource, MembershipExpander};
pub use grant::{GrantOrigin, GrantSet, GroupGrant, IdentityKey, UserGrant};
pub use graph::MembershipGraph;
pub use labels::LabelConfig;
pub use noise::{NoiseConfig, NoiseFilter};
pub use principal::{DirectoryContext, GroupRecord, Principal, PrincipalKind, PrincipalRef, UserRecord};
pub use rights::{FileSystemRights, InheritanceFlags};
pub use rule::{AccessRule, AccessType, CatalogError, ResourceKind, RuleCatalog, RuleInfo};
