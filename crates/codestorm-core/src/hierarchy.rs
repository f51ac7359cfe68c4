//! Hierarchical permissions.
//!
//! A code may name a parent code; holding the parent grants every descendant.
//! Parent chains are walked iteratively and a repeated code is reported as a
//! cycle rather than looping forever.

use crate::permission::{PermissionCode, PermissionSet};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::warn;

/// Hierarchy errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// The parent chain starting at a code revisits a code.
    #[error("Permission hierarchy cycle through {0}")]
    Cycle(PermissionCode),
}

/// Child-to-parent links between permission codes.
#[derive(Debug, Clone, Default)]
pub struct PermissionHierarchy {
    parents: HashMap<PermissionCode, PermissionCode>,
}

impl PermissionHierarchy {
    /// Create an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parent of `child`, replacing any previous parent.
    pub fn set_parent(&mut self, child: PermissionCode, parent: PermissionCode) {
        self.parents.insert(child, parent);
    }

    /// Get the direct parent of a code.
    #[must_use]
    pub fn parent(&self, code: PermissionCode) -> Option<PermissionCode> {
        self.parents.get(&code).copied()
    }

    /// Ancestors of `code`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Cycle`] if the chain loops.
    pub fn ancestors(&self, code: PermissionCode) -> Result<Vec<PermissionCode>, HierarchyError> {
        let mut visited = HashSet::from([code]);
        let mut chain = Vec::new();
        let mut current = code;

        while let Some(parent) = self.parent(current) {
            if !visited.insert(parent) {
                warn!(code = %code, repeated = %parent, "Permission hierarchy cycle");
                return Err(HierarchyError::Cycle(parent));
            }
            chain.push(parent);
            current = parent;
        }

        Ok(chain)
    }

    /// Check whether `code` is granted, directly or through an ancestor.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Cycle`] if the chain loops before a grant is found.
    pub fn is_granted(
        &self,
        permissions: &PermissionSet,
        code: PermissionCode,
    ) -> Result<bool, HierarchyError> {
        if permissions.contains(code) {
            return Ok(true);
        }
        Ok(self
            .ancestors(code)?
            .into_iter()
            .any(|ancestor| permissions.contains(ancestor)))
    }

    /// Expand a permission set with every code it grants through the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Cycle`] if any known chain loops.
    pub fn effective_permissions(
        &self,
        permissions: &PermissionSet,
    ) -> Result<PermissionSet, HierarchyError> {
        let mut effective = permissions.clone();
        for &child in self.parents.keys() {
            if self.is_granted(permissions, child)? {
                effective.insert(child);
            }
        }
        Ok(effective)
    }
}

impl FromIterator<(PermissionCode, PermissionCode)> for PermissionHierarchy {
    fn from_iter<I: IntoIterator<Item = (PermissionCode, PermissionCode)>>(iter: I) -> Self {
        Self {
            parents: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contest_hierarchy() -> PermissionHierarchy {
        // 800 (contest control) > 500 (users) > 300 (judge queue)
        let mut hierarchy = PermissionHierarchy::new();
        hierarchy.set_parent(PermissionCode(300), PermissionCode(500));
        hierarchy.set_parent(PermissionCode(500), PermissionCode(800));
        hierarchy
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let hierarchy = contest_hierarchy();
        assert_eq!(
            hierarchy.ancestors(PermissionCode(300)).unwrap(),
            vec![PermissionCode(500), PermissionCode(800)]
        );
        assert!(hierarchy.ancestors(PermissionCode(800)).unwrap().is_empty());
    }

    #[test]
    fn test_parent_grants_descendants() {
        let hierarchy = contest_hierarchy();
        let held: PermissionSet = [800u32].into_iter().collect();

        assert!(hierarchy.is_granted(&held, PermissionCode(300)).unwrap());
        assert!(!hierarchy.is_granted(&held, PermissionCode(200)).unwrap());

        let effective = hierarchy.effective_permissions(&held).unwrap();
        let codes: Vec<u32> = effective.iter().map(|c| c.0).collect();
        assert_eq!(codes, vec![300, 500, 800]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut hierarchy = contest_hierarchy();
        hierarchy.set_parent(PermissionCode(800), PermissionCode(300));

        assert!(matches!(
            hierarchy.ancestors(PermissionCode(300)),
            Err(HierarchyError::Cycle(_))
        ));
        assert!(hierarchy
            .is_granted(&PermissionSet::new(), PermissionCode(500))
            .is_err());
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let mut hierarchy = PermissionHierarchy::new();
        hierarchy.set_parent(PermissionCode(1), PermissionCode(1));
        assert_eq!(
            hierarchy.ancestors(PermissionCode(1)),
            Err(HierarchyError::Cycle(PermissionCode(1)))
        );
    }
}
