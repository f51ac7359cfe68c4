//! Route descriptors and the route manifest returned by the route provider.

use crate::hierarchy::{HierarchyError, PermissionHierarchy};
use crate::permission::{PermissionCode, PermissionSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A navigable page and the permissions it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    /// URL path, unique within a route table.
    pub path: String,
    /// UI component rendered for this path.
    pub component_ref: String,
    /// Codes that must all be held to access the route.
    #[serde(default)]
    pub required_permissions: BTreeSet<PermissionCode>,
    /// Optional display rank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl RouteDescriptor {
    /// Create a route with no permission requirements.
    #[must_use]
    pub fn new(path: impl Into<String>, component_ref: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            component_ref: component_ref.into(),
            required_permissions: BTreeSet::new(),
            priority: None,
        }
    }

    /// Require a permission code.
    #[must_use]
    pub fn requires(mut self, code: PermissionCode) -> Self {
        self.required_permissions.insert(code);
        self
    }

    /// Set the display rank.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Check if the route is accessible with the given permissions.
    ///
    /// Every required code must be held; a route without requirements is
    /// accessible to everyone.
    #[must_use]
    pub fn is_accessible(&self, permissions: &PermissionSet) -> bool {
        permissions.has_all(&self.required_permissions)
    }
}

/// The route provider's answer for an authenticated session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifest {
    /// Full route table, in navigation order.
    pub routes: Vec<RouteDescriptor>,
    /// Permissions held by the session's identity.
    #[serde(default)]
    pub permissions: PermissionSet,
    /// Child-to-parent grants; holding a parent grants the child.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parents: BTreeMap<PermissionCode, PermissionCode>,
}

impl RouteManifest {
    /// Parse a manifest from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a manifest.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The permission hierarchy described by `parents`.
    #[must_use]
    pub fn hierarchy(&self) -> PermissionHierarchy {
        self.parents
            .iter()
            .map(|(&child, &parent)| (child, parent))
            .collect()
    }

    /// Held permissions expanded through the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Cycle`] if `parents` loops.
    pub fn effective_permissions(&self) -> Result<PermissionSet, HierarchyError> {
        self.hierarchy().effective_permissions(&self.permissions)
    }

    /// Look up a route by exact path.
    #[must_use]
    pub fn route(&self, path: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_without_requirements_is_public() {
        let route = RouteDescriptor::new("/", "Dashboard");
        assert!(route.is_accessible(&PermissionSet::new()));
    }

    #[test]
    fn test_route_requires_all_codes() {
        let route = RouteDescriptor::new("/admin/control", "ControlPanel")
            .requires(PermissionCode::CONTEST_CONTROL)
            .requires(PermissionCode::USER_MANAGEMENT);

        let admin: PermissionSet = [500u32, 800].into_iter().collect();
        let controller: PermissionSet = [800u32].into_iter().collect();

        assert!(route.is_accessible(&admin));
        assert!(!route.is_accessible(&controller));
    }

    #[test]
    fn test_manifest_from_json() {
        let manifest = RouteManifest::from_json(
            r#"{
                "routes": [
                    {"path": "/", "componentRef": "Dashboard"},
                    {"path": "/problems", "componentRef": "ProblemList", "requiredPermissions": [200], "priority": 2}
                ],
                "permissions": [200]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.routes.len(), 2);
        let problems = manifest.route("/problems").unwrap();
        assert_eq!(problems.component_ref, "ProblemList");
        assert_eq!(problems.priority, Some(2));
        assert!(problems.required_permissions.contains(&PermissionCode(200)));
        assert!(manifest.route("/missing").is_none());
        assert!(manifest.permissions.contains(PermissionCode::PROBLEMS));
    }

    #[test]
    fn test_manifest_parents_expand_permissions() {
        let manifest = RouteManifest::from_json(
            r#"{
                "routes": [{"path": "/judge/queue", "componentRef": "JudgeQueue", "requiredPermissions": [300]}],
                "permissions": [800],
                "parents": {"300": 500, "500": 800}
            }"#,
        )
        .unwrap();

        assert_eq!(
            manifest.hierarchy().parent(PermissionCode(300)),
            Some(PermissionCode(500))
        );
        let effective = manifest.effective_permissions().unwrap();
        assert!(effective.contains(PermissionCode::JUDGE_QUEUE));
        assert!(effective.contains(PermissionCode::USER_MANAGEMENT));
        assert!(!manifest.permissions.contains(PermissionCode::JUDGE_QUEUE));
    }

    #[test]
    fn test_manifest_parent_cycle() {
        let mut manifest = RouteManifest::default();
        manifest.parents.insert(PermissionCode(1), PermissionCode(2));
        manifest.parents.insert(PermissionCode(2), PermissionCode(1));
        assert!(manifest.effective_permissions().is_err());
    }
}
