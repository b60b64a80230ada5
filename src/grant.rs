// SPDX-License-Identifier: MIT OR Apache-2.0

//! User and group grants derived from access rules.
//!
//! Grants are identified by a single key (the account name). All other fields are payload: two
//! grants with the same key are the same grant, whatever their payload says. This policy is made
//! explicit through [`IdentityKey`] and enforced by [`GrantSet`] instead of through `PartialEq`.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::labels::LabelConfig;
use crate::principal::{GroupRecord, UserRecord};

/// Key under which an item is identified in a [`GrantSet`].
pub trait IdentityKey {
    fn identity_key(&self) -> &str;
}

/// A user which has access to the selected resource.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserGrant {
    pub username: String,
    pub enabled: bool,
    pub display_name: String,
    pub given_name: String,
    pub surname: String,

    /// Short "Name, Department" label derived from the organizational path.
    pub comment: String,

    /// The user can modify or delete content.
    pub danger: bool,

    /// The user can only pass through the resource.
    pub transit: bool,

    pub selected: bool,
}

impl UserGrant {
    pub fn new(user: &UserRecord, labels: &LabelConfig, danger: bool, transit: bool) -> Self {
        Self {
            username: user.name.clone(),
            enabled: user.enabled,
            display_name: user.display_name.clone().unwrap_or_default(),
            given_name: user.given_name.clone().unwrap_or_default(),
            surname: user.surname.clone().unwrap_or_default(),
            comment: user
                .distinguished_name
                .as_deref()
                .map(|dn| labels.org_label(dn))
                .unwrap_or_default(),
            danger,
            transit,
            selected: false,
        }
    }
}

impl IdentityKey for UserGrant {
    fn identity_key(&self) -> &str {
        &self.username
    }
}

/// The user a group grant was derived from in a user to group drill-down.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantOrigin {
    pub username: String,
    pub display_name: String,
}

/// A group which is involved in granting access to the selected resource.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupGrant {
    pub name: String,

    /// Description, falling back to the display name and then the account name.
    pub description: String,

    /// User whose authorization groups produced this grant.
    pub origin: Option<GrantOrigin>,

    pub selected: bool,
}

impl GroupGrant {
    pub fn new(group: &GroupRecord) -> Self {
        Self {
            name: group.name.clone(),
            description: group.describe(),
            origin: None,
            selected: false,
        }
    }

    pub fn with_origin(mut self, origin: GrantOrigin) -> Self {
        self.origin = Some(origin);
        self
    }
}

impl IdentityKey for GroupGrant {
    fn identity_key(&self) -> &str {
        &self.name
    }
}

/// Insertion ordered collection of grants, unique by identity key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrantSet<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for GrantSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> GrantSet<T>
where
    T: IdentityKey,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item unless an item with the same key is already present.
    ///
    /// Returns `false` and leaves the set untouched if the key was taken.
    pub fn insert(&mut self, item: T) -> bool {
        let key = item.identity_key();
        if self.index.contains_key(key) {
            return false;
        }

        self.index.insert(key.to_string(), self.items.len());
        self.items.push(item);
        true
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|position| &self.items[*position])
    }

    /// Mutable access to the payload of an item. Changing its identity key is not allowed.
    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.index.get(key).map(|position| &mut self.items[*position])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Mutable iteration over the payloads. Changing identity keys is not allowed.
    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.identity_key())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> FromIterator<T> for GrantSet<T>
where
    T: IdentityKey,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = GrantSet::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<'a, T> IntoIterator for &'a GrantSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
