/// Navigation Module Index
///
/// Role-based navigation: a static route registry, the pure access resolver that
/// filters it for a role, and the builders that turn the result into menu schemas.
///
/// Every function here fails closed: an unresolved role sees nothing.

/// Static route and group tables.
pub mod registry;

/// Visibility predicates, ordering and lookups over the registry.
pub mod resolver;

/// UI-ready menu schemas built from resolver output.
pub mod menu;

pub use registry::{GroupDescriptor, GroupId, Presentation, RouteDescriptor, Visibility};
pub use resolver::{
    NavigationSection, Registry, can_access_route, can_see_group, flat_routes_for_role,
    group_config, mobile_quick_actions, resolve_path_for_role, route_by_path, routes_for_role,
    visible_children,
};
