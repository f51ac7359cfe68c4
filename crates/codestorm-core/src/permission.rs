//! Permission codes and permission sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An opaque identifier for one grantable capability.
///
/// Codes are compared by exact value only; numeric ranges carry no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(pub u32);

impl PermissionCode {
    /// Browse and submit to problems.
    pub const PROBLEMS: PermissionCode = PermissionCode(200);
    /// Work the judge queue.
    pub const JUDGE_QUEUE: PermissionCode = PermissionCode(300);
    /// Manage user accounts.
    pub const USER_MANAGEMENT: PermissionCode = PermissionCode(500);
    /// Start, pause and stop contests.
    pub const CONTEST_CONTROL: PermissionCode = PermissionCode(800);
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PermissionCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// The permissions held by an authenticated identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<PermissionCode>);

impl PermissionSet {
    /// Create an empty permission set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a single code is held.
    #[must_use]
    pub fn contains(&self, code: PermissionCode) -> bool {
        self.0.contains(&code)
    }

    /// Add a code to the set. Returns `true` if it was not already present.
    pub fn insert(&mut self, code: PermissionCode) -> bool {
        self.0.insert(code)
    }

    /// Number of held codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no codes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over held codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = PermissionCode> + '_ {
        self.0.iter().copied()
    }

    /// True if at least one of `required` is held. False for an empty `required`.
    #[must_use]
    pub fn has_any<'a>(&self, required: impl IntoIterator<Item = &'a PermissionCode>) -> bool {
        required.into_iter().any(|code| self.contains(*code))
    }

    /// True if every code in `required` is held. Vacuously true when empty.
    #[must_use]
    pub fn has_all<'a>(&self, required: impl IntoIterator<Item = &'a PermissionCode>) -> bool {
        required.into_iter().all(|code| self.contains(*code))
    }
}

impl FromIterator<PermissionCode> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionCode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromIterator<u32> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        iter.into_iter().map(PermissionCode).collect()
    }
}

impl Extend<PermissionCode> for PermissionSet {
    fn extend<I: IntoIterator<Item = PermissionCode>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
