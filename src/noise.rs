// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exclusion of system and administrative principals which are not meaningful for a review.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::labels::account_part;
use crate::principal::PrincipalKind;

/// Skip-lists of noise principal names. Matching ignores case and any `DOMAIN\` qualifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Built-in and administrative accounts.
    pub skip_users: Vec<String>,

    /// Well-known and administrative groups.
    pub skip_groups: Vec<String>,

    /// Administrative and default-user groups of the primary directory. Only skipped when the
    /// primary directory is reachable.
    pub directory_groups: Vec<String>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        fn owned(names: &[&str]) -> Vec<String> {
            names.iter().map(|name| name.to_string()).collect()
        }

        Self {
            skip_users: owned(&[
                "admin",
                "Administrator",
                "Администратор",
                "SYSTEM",
                "СИСТЕМА",
            ]),
            skip_groups: owned(&[
                "admins",
                "Administrators",
                "Администраторы",
                "Everyone",
                "Все",
                "Authenticated Users",
                "Прошедшие проверку",
                "This Organization",
                "Данная организация",
                "Service asserted identity",
                "Подтвержденное службой удостоверение",
                "Mandatory Label\\High Mandatory Level",
                "Высокий обязательный уровень",
                "Mandatory Label\\Medium Mandatory Level",
                "Средний обязательный уровень",
                "Performance Log Users",
                "Пользователи журналов производительности",
                "Remote Desktop Users",
                "Пользователи удаленного рабочего стола",
            ]),
            directory_groups: owned(&[
                "Domain Admins",
                "Администраторы домена",
                "Enterprise Admins",
                "Администраторы предприятия",
                "Domain Users",
                "Пользователи домена",
                "Users",
                "Пользователи",
            ]),
        }
    }
}

/// Immutable skip-list lookup, resolved once from configuration.
#[derive(Clone, Debug, Default)]
pub struct NoiseFilter {
    users: HashSet<String>,
    groups: HashSet<String>,
}

impl NoiseFilter {
    /// Build the filter, including the directory groups only when the primary directory is
    /// reachable.
    pub fn new(config: &NoiseConfig, primary_reachable: bool) -> Self {
        let users = config.skip_users.iter().map(|name| normalize(name)).collect();

        let directory_groups: &[String] = if primary_reachable {
            &config.directory_groups
        } else {
            &[]
        };
        let groups = config
            .skip_groups
            .iter()
            .chain(directory_groups)
            .map(|name| normalize(name))
            .collect();

        Self { users, groups }
    }

    /// Returns true if the principal is on the skip-list for its kind.
    pub fn is_noise(&self, kind: PrincipalKind, name: &str) -> bool {
        let list = match kind {
            PrincipalKind::User => &self.users,
            PrincipalKind::Group => &self.groups,
        };

        list.contains(&normalize(name)) || list.contains(&normalize(account_part(name)))
    }

    /// Returns true if a principal of unknown kind is on either skip-list.
    pub fn is_noise_name(&self, name: &str) -> bool {
        self.is_noise(PrincipalKind::User, name) || self.is_noise(PrincipalKind::Group, name)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use crate::principal::PrincipalKind;

    use super::{NoiseConfig, NoiseFilter};

    #[test]
    fn default_skip_lists() {
        let filter = NoiseFilter::new(&NoiseConfig::default(), false);

        assert!(filter.is_noise(PrincipalKind::Group, "Administrators"));
        assert!(filter.is_noise(PrincipalKind::Group, "BUILTIN\\Администраторы"));
        assert!(filter.is_noise(PrincipalKind::User, "NT AUTHORITY\\SYSTEM"));
        assert!(filter.is_noise(PrincipalKind::User, "administrator"));
        assert!(filter.is_noise(
            PrincipalKind::Group,
            "Mandatory Label\\High Mandatory Level"
        ));

        // Lists are per kind.
        assert!(!filter.is_noise(PrincipalKind::User, "Administrators"));
        assert!(!filter.is_noise(PrincipalKind::Group, "Finance"));
        assert!(filter.is_noise_name("SYSTEM"));
    }

    #[test]
    fn directory_groups_need_primary_directory() {
        let config = NoiseConfig::default();

        let offline = NoiseFilter::new(&config, false);
        assert!(!offline.is_noise(PrincipalKind::Group, "Domain Users"));
        assert!(!offline.is_noise(PrincipalKind::Group, "Users"));

        let online = NoiseFilter::new(&config, true);
        assert!(online.is_noise(PrincipalKind::Group, "Domain Users"));
        assert!(online.is_noise(PrincipalKind::Group, "BANK\\Пользователи домена"));
    }

    #[test]
    fn configured_lists() {
        let config = NoiseConfig {
            skip_users: vec!["svc-backup".into()],
            skip_groups: vec![],
            directory_groups: vec![],
        };
        let filter = NoiseFilter::new(&config, true);
        assert!(filter.is_noise(PrincipalKind::User, "BANK\\SVC-Backup"));
        assert!(!filter.is_noise(PrincipalKind::Group, "Administrators"));
    }
}
