// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw file-system rights bitmasks and inheritance flags as they are read from an access control
//! entry.
//!
//! Bit values follow the well-known Windows file-system rights layout so masks read from a real
//! ACL can be wrapped without translation. Several rights share a bit and only differ in name
//! depending on whether they apply to a folder or a file (for example `ListDirectory` and
//! `ReadData`); the folder-flavoured name is the canonical one here.
use std::fmt::{self, Display};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Rights granted or denied by a single access rule.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FileSystemRights: u32 {
        const LIST_DIRECTORY = 0x0000_0001;
        const CREATE_FILES = 0x0000_0002;
        const CREATE_DIRECTORIES = 0x0000_0004;
        const READ_EXTENDED_ATTRIBUTES = 0x0000_0008;
        const WRITE_EXTENDED_ATTRIBUTES = 0x0000_0010;
        const TRAVERSE = 0x0000_0020;
        const DELETE_SUBDIRECTORIES_AND_FILES = 0x0000_0040;
        const READ_ATTRIBUTES = 0x0000_0080;
        const WRITE_ATTRIBUTES = 0x0000_0100;
        const DELETE = 0x0001_0000;
        const READ_PERMISSIONS = 0x0002_0000;
        const CHANGE_PERMISSIONS = 0x0004_0000;
        const TAKE_OWNERSHIP = 0x0008_0000;
        const SYNCHRONIZE = 0x0010_0000;

        const READ = Self::LIST_DIRECTORY.bits()
            | Self::READ_EXTENDED_ATTRIBUTES.bits()
            | Self::READ_ATTRIBUTES.bits()
            | Self::READ_PERMISSIONS.bits();
        const WRITE = Self::CREATE_FILES.bits()
            | Self::CREATE_DIRECTORIES.bits()
            | Self::WRITE_EXTENDED_ATTRIBUTES.bits()
            | Self::WRITE_ATTRIBUTES.bits();
        const READ_AND_EXECUTE = Self::READ.bits() | Self::TRAVERSE.bits();
        const MODIFY = Self::WRITE.bits() | Self::READ_AND_EXECUTE.bits() | Self::DELETE.bits();
        const FULL_CONTROL = 0x001F_01FF;

        // Generic and other unnamed bits survive a round trip through the mask.
        const _ = !0;
    }
}

impl FileSystemRights {
    /// File-flavoured aliases of the folder-flavoured bits.
    pub const READ_DATA: Self = Self::LIST_DIRECTORY;
    pub const WRITE_DATA: Self = Self::CREATE_FILES;
    pub const APPEND_DATA: Self = Self::CREATE_DIRECTORIES;
    pub const EXECUTE_FILE: Self = Self::TRAVERSE;
}

/// Named rights used to decompose a mask into readable text, largest composites first.
const DECOMPOSITION: [(&str, FileSystemRights); 19] = [
    ("FullControl", FileSystemRights::FULL_CONTROL),
    ("Synchronize", FileSystemRights::SYNCHRONIZE),
    ("TakeOwnership", FileSystemRights::TAKE_OWNERSHIP),
    ("ChangePermissions", FileSystemRights::CHANGE_PERMISSIONS),
    ("Modify", FileSystemRights::MODIFY),
    ("ReadAndExecute", FileSystemRights::READ_AND_EXECUTE),
    ("Read", FileSystemRights::READ),
    ("ReadPermissions", FileSystemRights::READ_PERMISSIONS),
    ("Delete", FileSystemRights::DELETE),
    ("Write", FileSystemRights::WRITE),
    ("WriteAttributes", FileSystemRights::WRITE_ATTRIBUTES),
    ("ReadAttributes", FileSystemRights::READ_ATTRIBUTES),
    (
        "DeleteSubdirectoriesAndFiles",
        FileSystemRights::DELETE_SUBDIRECTORIES_AND_FILES,
    ),
    ("Traverse", FileSystemRights::TRAVERSE),
    (
        "WriteExtendedAttributes",
        FileSystemRights::WRITE_EXTENDED_ATTRIBUTES,
    ),
    (
        "ReadExtendedAttributes",
        FileSystemRights::READ_EXTENDED_ATTRIBUTES,
    ),
    ("CreateDirectories", FileSystemRights::CREATE_DIRECTORIES),
    ("CreateFiles", FileSystemRights::CREATE_FILES),
    ("ListDirectory", FileSystemRights::LIST_DIRECTORY),
];

impl Display for FileSystemRights {
    /// Render the mask as its canonical flag decomposition, for example `Modify, Synchronize`.
    ///
    /// Masks carrying bits without a name are printed as their decimal value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }

        let mut remaining = *self;
        let mut names = Vec::new();
        for (name, flag) in DECOMPOSITION {
            if remaining.contains(flag) {
                names.push(name);
                remaining.remove(flag);
            }
        }

        if !remaining.is_empty() {
            return write!(f, "{}", self.bits());
        }

        names.reverse();
        write!(f, "{}", names.join(", "))
    }
}

bitflags! {
    /// How a rule propagates to the children of a container.
    ///
    /// The empty set means the rule applies to "this object only".
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct InheritanceFlags: u8 {
        const CONTAINER_INHERIT = 0b01;
        const OBJECT_INHERIT = 0b10;
    }
}

impl InheritanceFlags {
    /// Returns true if the rule does not propagate to any child.
    pub fn is_this_object_only(&self) -> bool {
        self.is_empty()
    }
}

impl Display for InheritanceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::with_capacity(2);
        if self.contains(InheritanceFlags::CONTAINER_INHERIT) {
            names.push("ContainerInherit");
        }
        if self.contains(InheritanceFlags::OBJECT_INHERIT) {
            names.push("ObjectInherit");
        }

        if names.is_empty() {
            write!(f, "None")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSystemRights, InheritanceFlags};

    #[test]
    fn composite_masks() {
        assert_eq!(FileSystemRights::READ.bits(), 0x0002_0089);
        assert_eq!(FileSystemRights::WRITE.bits(), 0x0000_0116);
        assert_eq!(FileSystemRights::READ_AND_EXECUTE.bits(), 0x0002_00A9);
        assert_eq!(FileSystemRights::MODIFY.bits(), 0x0003_01BF);
        assert!(FileSystemRights::FULL_CONTROL.contains(FileSystemRights::MODIFY));
        assert!(FileSystemRights::FULL_CONTROL.contains(FileSystemRights::SYNCHRONIZE));
    }

    #[test]
    fn readable_masks() {
        assert_eq!(FileSystemRights::FULL_CONTROL.to_string(), "FullControl");
        assert_eq!(
            (FileSystemRights::MODIFY | FileSystemRights::SYNCHRONIZE).to_string(),
            "Modify, Synchronize"
        );
        assert_eq!(
            (FileSystemRights::READ_AND_EXECUTE | FileSystemRights::SYNCHRONIZE).to_string(),
            "ReadAndExecute, Synchronize"
        );
        assert_eq!(
            (FileSystemRights::WRITE | FileSystemRights::DELETE).to_string(),
            "Write, Delete"
        );
        assert_eq!(FileSystemRights::empty().to_string(), "0");

        // Generic rights have no name, the raw value is printed instead.
        let generic = FileSystemRights::from_bits_retain(0x1000_0000);
        assert_eq!(generic.to_string(), "268435456");
    }

    #[test]
    fn inheritance_display() {
        assert_eq!(InheritanceFlags::empty().to_string(), "None");
        assert_eq!(
            InheritanceFlags::CONTAINER_INHERIT.to_string(),
            "ContainerInherit"
        );
        assert_eq!(
            InheritanceFlags::all().to_string(),
            "ContainerInherit, ObjectInherit"
        );
        assert!(InheritanceFlags::empty().is_this_object_only());
    }
}
