//! POSIX-style ACL permissions and permission sets.
//!
//! A [`PermissionSet`] is a three-bit mask. Its textual form is the
//! familiar `rwx` triple, most significant bit first, with `-` in place
//! of every absent permission:
//!
//! ```text
//! READ (4) | WRITE (2)  ->  "rw-"
//! EXECUTE (1)           ->  "--x"
//! (empty)               ->  "---"
//! ```

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    #[error("unknown ACL permission {0:?}")]
    UnknownPermission(String),
}

/// A single ACL permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AclPermission {
    Execute,
    Write,
    Read,
}

impl AclPermission {
    /// All permissions, lowest bit first.
    pub const ALL: [AclPermission; 3] = [Self::Execute, Self::Write, Self::Read];

    /// The bit this permission occupies in a [`PermissionSet`].
    pub fn bit(self) -> PermissionSet {
        match self {
            Self::Execute => PermissionSet::EXECUTE,
            Self::Write => PermissionSet::WRITE,
            Self::Read => PermissionSet::READ,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Execute => "Execute",
            Self::Write => "Write",
            Self::Read => "Read",
        }
    }
}

impl fmt::Display for AclPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AclPermission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PermissionError::UnknownPermission(s.to_string()))
    }
}

bitflags! {
    /// A set of [`AclPermission`]s.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PermissionSet: u8 {
        const EXECUTE = 0b001;
        const WRITE   = 0b010;
        const READ    = 0b100;
    }
}

impl PermissionSet {
    /// Width of the rendered form.
    pub const WIDTH: usize = 3;

    /// Build a set from permission names.
    ///
    /// Fails on the first name that is not a known permission; a bitmask
    /// has no way to carry an unrecognised name along.
    pub fn encode<I, S>(names: I) -> Result<Self, PermissionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::empty(), |set, name| {
            Ok(set.add(name.as_ref().parse::<AclPermission>()?))
        })
    }

    /// Returns a copy of this set with `permission` present.
    #[must_use]
    pub fn add(self, permission: AclPermission) -> Self {
        self | permission.bit()
    }

    /// Returns a copy of this set with `permission` absent.
    #[must_use]
    pub fn without(self, permission: AclPermission) -> Self {
        self.difference(permission.bit())
    }

    pub fn has(self, permission: AclPermission) -> bool {
        self.contains(permission.bit())
    }

    /// Canonical `rwx` rendering.
    pub fn render(self) -> String {
        [
            (AclPermission::Read, 'r'),
            (AclPermission::Write, 'w'),
            (AclPermission::Execute, 'x'),
        ]
        .into_iter()
        .map(|(p, c)| if self.has(p) { c } else { '-' })
        .collect()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
