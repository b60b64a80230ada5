// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of raw rights masks into a simplified, reviewer-friendly summary.
//!
//! The flag code is a short string of ordered letters:
//!
//! - `x` the rule denies access
//! - `F` full control
//! - `R` read and execute
//! - `T` transit: read and execute on a container which does not propagate to its children, the
//!   principal can pass through the folder but has no effective read access below it
//! - `W` write, modify or delete
//!
//! Allow rules with full control, modify or delete rights are "dangerous" as the principal can
//! change or destroy content.
use serde::{Deserialize, Serialize};

use crate::rights::{FileSystemRights, InheritanceFlags};
use crate::rule::{AccessType, ResourceKind};

const RIGHT_DENY: char = 'x';
const RIGHT_FULL: char = 'F';
const RIGHT_READ: char = 'R';
const RIGHT_TRANSIT: char = 'T';
const RIGHT_WRITE: char = 'W';

/// Simplified rights of one access rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RightsSummary {
    pub flags: String,
    pub danger: bool,
    pub transit: bool,
    pub comment: String,
}

/// Derive the rights summary of a rule.
///
/// Full control subsumes read and write, so a full control rule is summarised as `F` alone.
pub fn classify(
    rights: FileSystemRights,
    access: AccessType,
    inheritance: InheritanceFlags,
    resource_kind: ResourceKind,
) -> RightsSummary {
    let mut summary = RightsSummary::default();

    match access {
        AccessType::Deny => {
            summary.flags.push(RIGHT_DENY);
            if rights.contains(FileSystemRights::WRITE) || rights.contains(FileSystemRights::DELETE)
            {
                summary.flags.push(RIGHT_WRITE);
            }
            summary.comment = format!("Deny {}", rights);
        }
        AccessType::Allow => {
            if rights.contains(FileSystemRights::FULL_CONTROL) {
                summary.flags.push(RIGHT_FULL);
                summary.danger = true;
            } else {
                if rights.contains(FileSystemRights::READ_AND_EXECUTE) {
                    // Transit only exists on containers, a leaf has no children to hide.
                    if resource_kind.is_container() && inheritance.is_this_object_only() {
                        summary.flags.push(RIGHT_TRANSIT);
                        summary.transit = true;
                    } else {
                        summary.flags.push(RIGHT_READ);
                    }
                }

                if rights.contains(FileSystemRights::MODIFY)
                    || rights.contains(FileSystemRights::DELETE)
                {
                    summary.flags.push(RIGHT_WRITE);
                    summary.danger = true;
                }
            }
            summary.comment = rights.to_string();
        }
    }

    summary
}

/// Rights which are always listed in a rights enumeration, in order.
const BASIC_RIGHTS: [(&str, FileSystemRights); 10] = [
    ("CreateDirectories", FileSystemRights::CREATE_DIRECTORIES),
    ("CreateFiles", FileSystemRights::CREATE_FILES),
    ("Delete", FileSystemRights::DELETE),
    (
        "DeleteSubdirectoriesAndFiles",
        FileSystemRights::DELETE_SUBDIRECTORIES_AND_FILES,
    ),
    ("FullControl", FileSystemRights::FULL_CONTROL),
    ("ListDirectory", FileSystemRights::LIST_DIRECTORY),
    ("Modify", FileSystemRights::MODIFY),
    ("Read", FileSystemRights::READ),
    ("Traverse", FileSystemRights::TRAVERSE),
    ("Write", FileSystemRights::WRITE),
];

/// Finer rights which are only listed in verbose enumerations.
const VERBOSE_RIGHTS: [(&str, FileSystemRights); 13] = [
    ("AppendData", FileSystemRights::APPEND_DATA),
    ("ChangePermissions", FileSystemRights::CHANGE_PERMISSIONS),
    ("ExecuteFile", FileSystemRights::EXECUTE_FILE),
    ("ReadAndExecute", FileSystemRights::READ_AND_EXECUTE),
    ("ReadAttributes", FileSystemRights::READ_ATTRIBUTES),
    ("ReadData", FileSystemRights::READ_DATA),
    (
        "ReadExtendedAttributes",
        FileSystemRights::READ_EXTENDED_ATTRIBUTES,
    ),
    ("ReadPermissions", FileSystemRights::READ_PERMISSIONS),
    ("Synchronize", FileSystemRights::SYNCHRONIZE),
    ("TakeOwnership", FileSystemRights::TAKE_OWNERSHIP),
    ("WriteAttributes", FileSystemRights::WRITE_ATTRIBUTES),
    ("WriteData", FileSystemRights::WRITE_DATA),
    (
        "WriteExtendedAttributes",
        FileSystemRights::WRITE_EXTENDED_ATTRIBUTES,
    ),
];

/// List the named rights contained in the mask, alphabetically and separated by `", "`.
///
/// Rules which apply to "this object only" are wrapped in brackets. A mask without any named
/// right falls back to the inheritance flags.
pub fn enumerate_rights(
    rights: FileSystemRights,
    inheritance: InheritanceFlags,
    verbose: bool,
) -> String {
    let verbose_rights: &[(&str, FileSystemRights)] = if verbose { &VERBOSE_RIGHTS } else { &[] };

    let mut names: Vec<&str> = BASIC_RIGHTS
        .iter()
        .chain(verbose_rights.iter())
        .filter(|(_, flag)| rights.contains(*flag))
        .map(|(name, _)| *name)
        .collect();

    if names.is_empty() {
        return inheritance.to_string();
    }

    names.sort_unstable();
    let joined = names.join(", ");

    if inheritance.is_this_object_only() {
        format!("[{joined}]")
    } else {
        joined
    }
}
