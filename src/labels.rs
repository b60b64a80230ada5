// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short labels for accounts and organizational paths.
use serde::{Deserialize, Serialize};

/// Configuration for shortening names shown to the reviewer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Domain prefix removed from account names, for example `BANK\`.
    pub account_prefix: Option<String>,

    /// Boilerplate segments of a distinguished name which never carry information for the
    /// reviewer, for example `OU=Bank`. Domain components (`DC=`) are always removed.
    pub strip_segments: Vec<String>,
}

impl LabelConfig {
    /// Remove the domain prefix from an account name.
    ///
    /// Returns the shortened name and whether the prefix was present.
    pub fn short_account(&self, identity: &str) -> (String, bool) {
        match self.account_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => match strip_prefix_ignore_case(identity, prefix)
            {
                Some(rest) => (rest.to_string(), true),
                None => (identity.to_string(), false),
            },
            _ => (identity.to_string(), false),
        }
    }

    /// Derive a "Name, Department" style label from a distinguished name.
    ///
    /// `CN=Alice Doe,OU=Finance,OU=Bank,DC=corp,DC=example` becomes `Alice Doe, Finance` when
    /// `OU=Bank` is a configured strip segment.
    pub fn org_label(&self, distinguished_name: &str) -> String {
        split_dn(distinguished_name)
            .into_iter()
            .filter(|segment| !segment.is_empty())
            .filter(|segment| !has_attribute(segment, "DC"))
            .filter(|segment| {
                !self
                    .strip_segments
                    .iter()
                    .any(|strip| strip.trim().eq_ignore_ascii_case(segment))
            })
            .map(|segment| match segment.split_once('=') {
                Some((_, value)) => value.trim().to_string(),
                None => segment,
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Account part of a `DOMAIN\account` identity.
pub fn account_part(identity: &str) -> &str {
    identity
        .rsplit_once('\\')
        .map(|(_, account)| account)
        .unwrap_or(identity)
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.to_lowercase() == prefix.to_lowercase() {
        value.get(prefix.len()..)
    } else {
        None
    }
}

fn has_attribute(segment: &str, attribute: &str) -> bool {
    segment
        .split_once('=')
        .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case(attribute))
}

/// Split a distinguished name at unescaped commas, unescaping `\,` on the way.
fn split_dn(distinguished_name: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = distinguished_name.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' => segments.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    segments.push(current.trim().to_string());

    segments
}
