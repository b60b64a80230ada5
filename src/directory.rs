// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory services and the two-tier identity resolution on top of them.
//!
//! Names are looked up in the primary (networked) directory first. If that directory could not
//! be reached when the resolver was set up, or it does not know the name, the machine directory
//! is asked instead. This keeps the engine usable, in degraded form, without any network
//! directory at all.
use thiserror::Error;
use tracing::{debug, warn};

use crate::principal::{DirectoryContext, GroupRecord, Principal, UserRecord};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory context could not be established: {0}")]
    Unavailable(String),

    #[error("directory query for {name} failed: {reason}")]
    Query { name: String, reason: String },
}

/// Interface of one directory context.
///
/// Implementations wrap blocking OS or network calls. Every returned principal is tagged with the
/// context it was found in by the [`IdentityResolver`], implementations don't need to set it.
pub trait Directory: Send + Sync {
    /// Look up a principal by its (optionally domain qualified) account name.
    fn find(&self, name: &str) -> Result<Option<Principal>, DirectoryError>;

    /// Direct members of a group, users and groups alike.
    fn members(&self, group: &GroupRecord) -> Result<Vec<Principal>, DirectoryError>;

    /// All groups which authorize the given user, including groups it is a member of through
    /// nesting.
    fn authorization_groups(&self, user: &UserRecord) -> Result<Vec<GroupRecord>, DirectoryError>;
}

/// Resolves names against a primary directory with the local machine as fallback.
#[derive(Debug)]
pub struct IdentityResolver<P, M> {
    primary: Option<P>,
    machine: M,
}

impl<P, M> IdentityResolver<P, M>
where
    P: Directory,
    M: Directory,
{
    /// Set up the resolver from the outcome of connecting to the primary directory.
    ///
    /// A failed connection is not an error, the resolver continues with the machine context only.
    pub fn connect(primary: Result<P, DirectoryError>, machine: M) -> Self {
        let primary = match primary {
            Ok(primary) => Some(primary),
            Err(err) => {
                warn!("primary directory unavailable, using machine accounts only: {err}");
                None
            }
        };

        Self { primary, machine }
    }

    /// Resolver without a primary directory.
    pub fn machine_only(machine: M) -> Self {
        Self {
            primary: None,
            machine,
        }
    }

    /// Returns true if the primary directory context was established.
    pub fn primary_reachable(&self) -> bool {
        self.primary.is_some()
    }

    /// Resolve a name into a principal.
    ///
    /// Returns `Ok(None)` if neither context knows the name. A failed primary lookup is only
    /// absorbed when the machine context knows the name, otherwise the primary error is returned
    /// since the name may well exist in the unreachable directory.
    pub fn resolve_identity(&self, name: &str) -> Result<Option<Principal>, DirectoryError> {
        let mut primary_error = None;
        if let Some(primary) = &self.primary {
            match primary.find(name) {
                Ok(Some(principal)) => {
                    return Ok(Some(principal.in_context(DirectoryContext::Primary)));
                }
                Ok(None) => debug!("{name} not found in primary directory"),
                Err(err) => {
                    warn!("primary directory lookup failed, trying machine: {err}");
                    primary_error = Some(err);
                }
            }
        }

        match (self.machine.find(name)?, primary_error) {
            (Some(principal), _) => Ok(Some(principal.in_context(DirectoryContext::Machine))),
            (None, Some(err)) => Err(err),
            (None, None) => {
                debug!("{name} not found in any directory context");
                Ok(None)
            }
        }
    }

    /// Direct members of a group, asked from the context the group was resolved in.
    pub fn members(&self, group: &GroupRecord) -> Result<Vec<Principal>, DirectoryError> {
        let context = group.reference.context;
        let members = self.context(context)?.members(group)?;
        Ok(members
            .into_iter()
            .map(|member| member.in_context(context))
            .collect())
    }

    /// Groups authorizing a user, asked from the context the user was resolved in.
    pub fn authorization_groups(
        &self,
        user: &UserRecord,
    ) -> Result<Vec<GroupRecord>, DirectoryError> {
        let context = user.reference.context;
        let groups = self.context(context)?.authorization_groups(user)?;
        Ok(groups
            .into_iter()
            .map(|mut group| {
                group.reference.context = context;
                group
            })
            .collect())
    }

    fn context(&self, context: DirectoryContext) -> Result<&dyn Directory, DirectoryError> {
        match context {
            DirectoryContext::Primary => match &self.primary {
                Some(primary) => Ok(primary as &dyn Directory),
                None => Err(DirectoryError::Unavailable(
                    "primary directory is not connected".into(),
                )),
            },
            DirectoryContext::Machine => Ok(&self.machine as &dyn Directory),
        }
    }
}
