// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tab-separated export of the three views, one header row followed by one row per item.
use std::path::Path;

use crate::grant::{GrantSet, GroupGrant, UserGrant};
use crate::principal::PrincipalKind;
use crate::rule::RuleInfo;

const RULES_HEADER: [&str; 5] = ["Resource", "Type", "Account", "Flags", "Comment"];

const USERS_HEADER: [&str; 7] = [
    "Resource", "Login", "Rights", "Name", "Family", "FullName", "Comment",
];

const GROUPS_HEADER: [&str; 4] = ["User", "FullName", "Group", "Comment"];

/// Rules of a resource. Identities which couldn't be resolved are exported as users.
pub fn rules_tsv(resource: &Path, rules: &[RuleInfo]) -> String {
    let resource = resource.display().to_string();
    let mut output = String::new();
    push_row(&mut output, &RULES_HEADER);

    for rule in rules {
        let kind = if rule.is_group() {
            PrincipalKind::Group
        } else {
            PrincipalKind::User
        }
        .to_string();
        push_row(
            &mut output,
            &[
                resource.as_str(),
                kind.as_str(),
                rule.account.as_str(),
                rule.summary.flags.as_str(),
                rule.summary.comment.as_str(),
            ],
        );
    }

    output
}

pub fn users_tsv(resource: &Path, users: &GrantSet<UserGrant>) -> String {
    let resource = resource.display().to_string();
    let mut output = String::new();
    push_row(&mut output, &USERS_HEADER);

    for user in users {
        let rights = if user.danger { "RW" } else { "R" };
        push_row(
            &mut output,
            &[
                resource.as_str(),
                user.username.as_str(),
                rights,
                user.given_name.as_str(),
                user.surname.as_str(),
                user.display_name.as_str(),
                user.comment.as_str(),
            ],
        );
    }

    output
}

/// Groups with the user they were derived from. Groups derived from rules have no user and
/// leave these columns empty.
pub fn groups_tsv(groups: &GrantSet<GroupGrant>) -> String {
    let mut output = String::new();
    push_row(&mut output, &GROUPS_HEADER);

    for group in groups {
        let (username, display_name) = group
            .origin
            .as_ref()
            .map(|origin| (origin.username.as_str(), origin.display_name.as_str()))
            .unwrap_or(("", ""));
        push_row(
            &mut output,
            &[
                username,
                display_name,
                group.name.as_str(),
                group.description.as_str(),
            ],
        );
    }

    output
}

fn push_row(output: &mut String, fields: &[&str]) {
    for (position, field) in fields.iter().enumerate() {
        if position > 0 {
            output.push('\t');
        }
        // Separators inside a field would shift all following columns.
        for c in field.chars() {
            match c {
                '\t' | '\r' | '\n' => output.push(' '),
                c => output.push(c),
            }
        }
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::grant::{GrantOrigin, GrantSet, GroupGrant, UserGrant};
    use crate::labels::LabelConfig;
    use crate::principal::{GroupRecord, PrincipalKind, UserRecord};
    use crate::rights::FileSystemRights;
    use crate::rule::{AccessRule, ResourceKind, RuleInfo};

    use super::{groups_tsv, rules_tsv, users_tsv};

    #[test]
    fn rules() {
        let rules = vec![
            RuleInfo::new(
                AccessRule::allow(
                    "BANK\\Finance",
                    FileSystemRights::FULL_CONTROL,
                    ResourceKind::Container,
                ),
                "Finance".into(),
                true,
                Some(PrincipalKind::Group),
                false,
                false,
            ),
            RuleInfo::new(
                AccessRule::deny(
                    "S-1-5-21-1004",
                    FileSystemRights::WRITE,
                    ResourceKind::Container,
                ),
                "S-1-5-21-1004".into(),
                false,
                None,
                false,
                false,
            ),
        ];

        assert_eq!(
            rules_tsv(Path::new("/srv/finance"), &rules),
            "Resource\tType\tAccount\tFlags\tComment\n\
             /srv/finance\tGroup\tFinance\tF\tFullControl\n\
             /srv/finance\tUser\tS-1-5-21-1004\txW\tDeny Write\n"
        );
    }

    #[test]
    fn users() {
        let labels = LabelConfig::default();
        let users: GrantSet<UserGrant> = [
            UserGrant::new(
                &UserRecord::new("alice")
                    .with_names("Alice Doe", "Alice", "Doe")
                    .with_distinguished_name("CN=Alice Doe,OU=Finance,DC=bank"),
                &labels,
                true,
                false,
            ),
            UserGrant::new(&UserRecord::new("bob"), &labels, false, false),
        ]
        .into_iter()
        .collect();

        let export = users_tsv(Path::new("/srv/finance"), &users);
        let lines: Vec<&str> = export.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Resource\tLogin\tRights\tName\tFamily\tFullName\tComment",
                "/srv/finance\talice\tRW\tAlice\tDoe\tAlice Doe\tAlice Doe, Finance",
                "/srv/finance\tbob\tR\t\t\t\t",
            ]
        );
    }

    #[test]
    fn groups() {
        let groups: GrantSet<GroupGrant> = [
            GroupGrant::new(&GroupRecord::new("Finance").with_description("Finance\tdepartment"))
                .with_origin(GrantOrigin {
                    username: "alice".into(),
                    display_name: "Alice Doe".into(),
                }),
            GroupGrant::new(&GroupRecord::new("Auditors")),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            groups_tsv(&groups),
            "User\tFullName\tGroup\tComment\n\
             alice\tAlice Doe\tFinance\tFinance department\n\
             \t\tAuditors\tAuditors\n"
        );
    }
}
