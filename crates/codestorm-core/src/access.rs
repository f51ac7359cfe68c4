//! Permission-driven navigation.
//!
//! Maps a permission set and a route table to the routes a user may see and
//! the page they should land on after login. Everything here is a pure
//! function of its inputs.

use crate::permission::{PermissionCode, PermissionSet};
use crate::route::RouteDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Path returned when nothing is accessible.
pub const UNAUTHENTICATED_PATH: &str = "/login";

/// Root dashboard path.
pub const DASHBOARD_PATH: &str = "/";

/// Advisory role label derived from a permission set.
///
/// This is for display only and never grants access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    Admin,
    Judge,
    Participant,
    Viewer,
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoleType::Admin => "admin",
            RoleType::Judge => "judge",
            RoleType::Participant => "participant",
            RoleType::Viewer => "viewer",
        };
        f.write_str(label)
    }
}

/// One step of the landing cascade: holders of `permission` land on `path`
/// when that route is accessible to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingRule {
    /// Permission that selects this rule.
    pub permission: PermissionCode,
    /// Landing path for holders of the permission.
    pub path: String,
}

impl LandingRule {
    /// Create a landing rule.
    #[must_use]
    pub fn new(permission: PermissionCode, path: impl Into<String>) -> Self {
        Self {
            permission,
            path: path.into(),
        }
    }
}

/// Landing-route policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingPolicy {
    /// Rules evaluated top to bottom; the first match wins.
    pub cascade: Vec<LandingRule>,
    /// Fallback when no rule matches and the dashboard is accessible.
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,
    /// Returned when no route at all is accessible.
    #[serde(default = "default_unauthenticated_path")]
    pub unauthenticated_path: String,
}

fn default_dashboard_path() -> String {
    DASHBOARD_PATH.to_string()
}

fn default_unauthenticated_path() -> String {
    UNAUTHENTICATED_PATH.to_string()
}

impl Default for LandingPolicy {
    fn default() -> Self {
        Self {
            cascade: vec![
                LandingRule::new(PermissionCode::CONTEST_CONTROL, "/admin/control"),
                LandingRule::new(PermissionCode::USER_MANAGEMENT, "/admin/users"),
                LandingRule::new(PermissionCode::JUDGE_QUEUE, "/judge/queue"),
                LandingRule::new(PermissionCode::PROBLEMS, "/problems"),
            ],
            dashboard_path: default_dashboard_path(),
            unauthenticated_path: default_unauthenticated_path(),
        }
    }
}

/// Resolves navigation decisions under a [`LandingPolicy`].
#[derive(Debug, Clone, Default)]
pub struct AccessResolver {
    policy: LandingPolicy,
}

impl AccessResolver {
    /// Create a resolver with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with a custom policy.
    #[must_use]
    pub fn with_policy(policy: LandingPolicy) -> Self {
        Self { policy }
    }

    /// Get the policy.
    #[must_use]
    pub fn policy(&self) -> &LandingPolicy {
        &self.policy
    }

    /// Routes whose requirements are all held, in table order.
    #[must_use]
    pub fn accessible_routes<'a>(
        &self,
        permissions: &PermissionSet,
        routes: &'a [RouteDescriptor],
    ) -> Vec<&'a RouteDescriptor> {
        routes
            .iter()
            .filter(|route| route.is_accessible(permissions))
            .collect()
    }

    /// Check a path against the table. Unknown paths are never accessible.
    #[must_use]
    pub fn is_route_accessible(
        &self,
        path: &str,
        permissions: &PermissionSet,
        routes: &[RouteDescriptor],
    ) -> bool {
        routes
            .iter()
            .find(|route| route.path == path)
            .is_some_and(|route| route.is_accessible(permissions))
    }

    /// Pick the landing path for a session.
    #[must_use]
    pub fn default_route(
        &self,
        permissions: &PermissionSet,
        routes: &[RouteDescriptor],
    ) -> String {
        let accessible = self.accessible_routes(permissions, routes);

        let Some(first) = accessible.first() else {
            trace!("No accessible routes, landing on unauthenticated path");
            return self.policy.unauthenticated_path.clone();
        };

        let reachable = |path: &str| accessible.iter().any(|route| route.path == path);

        for rule in &self.policy.cascade {
            if permissions.contains(rule.permission) && reachable(&rule.path) {
                trace!(permission = %rule.permission, path = %rule.path, "Landing rule matched");
                return rule.path.clone();
            }
        }

        if reachable(&self.policy.dashboard_path) {
            return self.policy.dashboard_path.clone();
        }

        first.path.clone()
    }
}

/// Routes whose requirements are all held, in table order.
#[must_use]
pub fn accessible_routes<'a>(
    permissions: &PermissionSet,
    routes: &'a [RouteDescriptor],
) -> Vec<&'a RouteDescriptor> {
    AccessResolver::new().accessible_routes(permissions, routes)
}

/// Check a path against the table. Unknown paths are never accessible.
#[must_use]
pub fn is_route_accessible(
    path: &str,
    permissions: &PermissionSet,
    routes: &[RouteDescriptor],
) -> bool {
    AccessResolver::new().is_route_accessible(path, permissions, routes)
}

/// Pick the landing path for a session using the default policy.
#[must_use]
pub fn default_route(permissions: &PermissionSet, routes: &[RouteDescriptor]) -> String {
    AccessResolver::new().default_route(permissions, routes)
}

/// Classify a permission set for display.
#[must_use]
pub fn role_type(permissions: &PermissionSet) -> RoleType {
    if permissions.contains(PermissionCode::USER_MANAGEMENT) {
        RoleType::Admin
    } else if permissions.contains(PermissionCode::JUDGE_QUEUE) {
        RoleType::Judge
    } else if permissions.contains(PermissionCode::PROBLEMS) {
        RoleType::Participant
    } else {
        RoleType::Viewer
    }
}

/// True if at least one of `required` is held.
#[must_use]
pub fn has_any(permissions: &PermissionSet, required: &[PermissionCode]) -> bool {
    permissions.has_any(required)
}

/// True if every code in `required` is held; true for an empty `required`.
#[must_use]
pub fn has_all(permissions: &PermissionSet, required: &[PermissionCode]) -> bool {
    permissions.has_all(required)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(codes: &[u32]) -> PermissionSet {
        codes.iter().copied().collect()
    }

    fn contest_routes() -> Vec<RouteDescriptor> {
        vec![
            RouteDescriptor::new("/", "Dashboard"),
            RouteDescriptor::new("/problems", "ProblemList").requires(PermissionCode::PROBLEMS),
            RouteDescriptor::new("/submissions", "Submissions").requires(PermissionCode::PROBLEMS),
            RouteDescriptor::new("/judge/queue", "JudgeQueue")
                .requires(PermissionCode::JUDGE_QUEUE),
            RouteDescriptor::new("/admin/users", "UserAdmin")
                .requires(PermissionCode::USER_MANAGEMENT),
            RouteDescriptor::new("/admin/control", "ControlPanel")
                .requires(PermissionCode::CONTEST_CONTROL),
        ]
    }

    fn paths<'a>(routes: &[&'a RouteDescriptor]) -> Vec<&'a str> {
        routes.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn test_accessible_routes_preserves_order() {
        let routes = contest_routes();

        let visible = accessible_routes(&perms(&[300, 200]), &routes);
        assert_eq!(
            paths(&visible),
            vec!["/", "/problems", "/submissions", "/judge/queue"]
        );

        let visible = accessible_routes(&PermissionSet::new(), &routes);
        assert_eq!(paths(&visible), vec!["/"]);
    }

    #[test]
    fn test_accessible_routes_requires_every_code() {
        let routes = vec![RouteDescriptor::new("/admin/audit", "Audit")
            .requires(PermissionCode::USER_MANAGEMENT)
            .requires(PermissionCode::CONTEST_CONTROL)];

        assert!(accessible_routes(&perms(&[500]), &routes).is_empty());
        assert_eq!(accessible_routes(&perms(&[500, 800]), &routes).len(), 1);
    }

    #[test]
    fn test_unknown_path_is_never_accessible() {
        let routes = contest_routes();
        let everything = perms(&[200, 300, 500, 800]);

        assert!(!is_route_accessible("/secret", &everything, &routes));
        assert!(!is_route_accessible("/problems/", &everything, &routes));
        assert!(is_route_accessible("/problems", &everything, &routes));
        assert!(!is_route_accessible("/problems", &PermissionSet::new(), &[]));
    }

    #[test]
    fn test_default_route_contest_control_wins() {
        let routes = contest_routes();
        assert_eq!(default_route(&perms(&[800]), &routes), "/admin/control");
        assert_eq!(
            default_route(&perms(&[200, 300, 500, 800]), &routes),
            "/admin/control"
        );
    }

    #[test]
    fn test_default_route_user_management() {
        let routes = contest_routes();
        assert_eq!(default_route(&perms(&[500]), &routes), "/admin/users");
    }

    #[test]
    fn test_default_route_judge_queue() {
        let routes = contest_routes();
        assert_eq!(default_route(&perms(&[300, 200]), &routes), "/judge/queue");
    }

    #[test]
    fn test_default_route_problems_outranks_dashboard() {
        let routes = vec![
            RouteDescriptor::new("/", "Dashboard"),
            RouteDescriptor::new("/problems", "ProblemList").requires(PermissionCode::PROBLEMS),
        ];
        assert_eq!(default_route(&perms(&[200]), &routes), "/problems");
    }

    #[test]
    fn test_default_route_dashboard_fallback() {
        let routes = contest_routes();
        assert_eq!(default_route(&perms(&[999]), &routes), "/");
    }

    #[test]
    fn test_default_route_empty_permissions() {
        let routes: Vec<RouteDescriptor> = contest_routes()
            .into_iter()
            .filter(|r| !r.required_permissions.is_empty())
            .collect();
        assert_eq!(default_route(&PermissionSet::new(), &routes), UNAUTHENTICATED_PATH);
        assert_eq!(default_route(&PermissionSet::new(), &[]), UNAUTHENTICATED_PATH);
    }

    #[test]
    fn test_default_route_permission_without_route() {
        // Holding 800 does not help when the control route is absent.
        let routes = vec![
            RouteDescriptor::new("/scoreboard", "Scoreboard"),
            RouteDescriptor::new("/problems", "ProblemList").requires(PermissionCode::PROBLEMS),
        ];
        assert_eq!(default_route(&perms(&[800, 200]), &routes), "/problems");
        assert_eq!(default_route(&perms(&[800]), &routes), "/scoreboard");
    }

    #[test]
    fn test_custom_policy() {
        let policy = LandingPolicy {
            cascade: vec![LandingRule::new(PermissionCode(42), "/staff")],
            dashboard_path: "/home".to_string(),
            unauthenticated_path: "/signin".to_string(),
        };
        let resolver = AccessResolver::with_policy(policy);
        let routes = vec![
            RouteDescriptor::new("/home", "Home"),
            RouteDescriptor::new("/staff", "Staff").requires(PermissionCode(42)),
        ];

        assert_eq!(resolver.default_route(&perms(&[42]), &routes), "/staff");
        assert_eq!(resolver.default_route(&PermissionSet::new(), &routes), "/home");
        assert_eq!(resolver.default_route(&PermissionSet::new(), &[]), "/signin");
    }

    #[test]
    fn test_role_type_order() {
        assert_eq!(role_type(&perms(&[200, 300, 500])), RoleType::Admin);
        assert_eq!(role_type(&perms(&[200, 300])), RoleType::Judge);
        assert_eq!(role_type(&perms(&[200])), RoleType::Participant);
        assert_eq!(role_type(&perms(&[800])), RoleType::Viewer);
        assert_eq!(role_type(&PermissionSet::new()), RoleType::Viewer);
        assert_eq!(RoleType::Participant.to_string(), "participant");
    }

    #[test]
    fn test_has_any_has_all_free_functions() {
        let held = perms(&[200]);
        assert!(has_all(&held, &[]));
        assert!(!has_any(&held, &[]));
        assert!(has_any(&held, &[PermissionCode(200), PermissionCode(300)]));
        assert!(!has_all(&held, &[PermissionCode(200), PermissionCode(300)]));
    }
}
