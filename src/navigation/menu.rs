use crate::models::{NavGroupView, NavItem, NavLink, NavSection, Role, RouteAccess};

use super::{
    registry::{GroupDescriptor, RouteDescriptor},
    resolver::{self, NavigationSection},
};

// Builders turning resolved descriptors into the UI-ready schemas served to the
// front end. Path overrides are applied here so clients never see the defaults
// of entries that moved for their role.

pub fn group_view(group: &GroupDescriptor) -> NavGroupView {
    NavGroupView {
        id: group.id.as_str().to_string(),
        label_key: group.display.label_key.to_string(),
        icon: group.display.icon.to_string(),
        order: group.order,
        collapsible: group.collapsible,
    }
}

fn nav_link(route: &RouteDescriptor, role: Option<Role>) -> NavLink {
    NavLink {
        path: resolver::resolve_path_for_role(route, role).to_string(),
        label_key: route.display.label_key.to_string(),
        icon: route.display.icon.to_string(),
        badge_key: route.display.badge_key.map(str::to_string),
    }
}

pub fn nav_item(route: &RouteDescriptor, role: Option<Role>) -> NavItem {
    NavItem {
        path: resolver::resolve_path_for_role(route, role).to_string(),
        route_path: route.path.to_string(),
        label_key: route.display.label_key.to_string(),
        icon: route.display.icon.to_string(),
        badge_key: route.display.badge_key.map(str::to_string),
        order: route.order,
        children: resolver::visible_children(route, role)
            .into_iter()
            .map(|child| nav_link(child, role))
            .collect(),
    }
}

pub fn nav_sections(sections: Vec<NavigationSection<'_>>, role: Option<Role>) -> Vec<NavSection> {
    sections
        .into_iter()
        .map(|section| NavSection {
            group: group_view(section.group),
            items: section
                .routes
                .into_iter()
                .map(|route| nav_item(route, role))
                .collect(),
        })
        .collect()
}

/// The grouped menu for `role`.
pub fn menu_for_role(role: Option<Role>) -> Vec<NavSection> {
    nav_sections(resolver::routes_for_role(role), role)
}

pub fn flat_menu_for_role(role: Option<Role>) -> Vec<NavItem> {
    resolver::flat_routes_for_role(role)
        .into_iter()
        .map(|route| nav_item(route, role))
        .collect()
}

pub fn quick_actions_for_role(role: Option<Role>) -> Vec<NavItem> {
    resolver::mobile_quick_actions(role)
        .into_iter()
        .map(|route| nav_item(route, role))
        .collect()
}

/// route_access
///
/// Page guard check for a direct navigation. Unknown paths and unresolved roles
/// are denied; hidden routes are allowed when the role passes their rule.
pub fn route_access(path: &str, role: Option<Role>) -> RouteAccess {
    match resolver::route_by_path(path) {
        Some(route) if resolver::can_access_route(route, role) => RouteAccess {
            path: path.to_string(),
            allowed: true,
            resolved_path: Some(resolver::resolve_path_for_role(route, role).to_string()),
        },
        _ => RouteAccess {
            path: path.to_string(),
            allowed: false,
            resolved_path: None,
        },
    }
}
