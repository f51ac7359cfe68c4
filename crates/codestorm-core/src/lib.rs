//! # codestorm-core
//!
//! Navigation and event-dispatch building blocks for CodeStorm.
//!
//! - **Access** - Permission-driven route visibility and landing pages
//! - **Hierarchy** - Parent/child permission grants with cycle detection
//! - **Dispatch** - Ordered per-kind handler tables for realtime events
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────────┐
//! │  Route Manifest  │────▶│ Access Resolver │────▶ landing route
//! └──────────────────┘     └─────────────────┘
//!
//! ┌──────────────────┐     ┌─────────────────┐
//! │  Inbound Event   │────▶│ HandlerRegistry │────▶ handlers (in order)
//! └──────────────────┘     └─────────────────┘
//! ```

pub mod access;
pub mod dispatch;
pub mod hierarchy;
pub mod permission;
pub mod route;

pub use access::{
    accessible_routes, default_route, has_all, has_any, is_route_accessible, role_type,
    AccessResolver, LandingPolicy, LandingRule, RoleType,
};
pub use dispatch::{handler, Handler, HandlerRegistry};
pub use hierarchy::{HierarchyError, PermissionHierarchy};
pub use permission::{PermissionCode, PermissionSet};
pub use route::{RouteDescriptor, RouteManifest};
