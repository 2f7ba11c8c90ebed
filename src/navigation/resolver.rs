use crate::models::Role;

use super::registry::{
    GROUPS, GroupDescriptor, GroupId, MANAGER_QUICK_ACTIONS, ROUTES, RouteDescriptor,
    STAFF_QUICK_ACTIONS, Visibility,
};

/// Upper bound on mobile quick actions.
pub const MAX_QUICK_ACTIONS: usize = 5;

/// NavigationSection
///
/// A visible group and its visible, listed routes in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationSection<'a> {
    pub group: &'a GroupDescriptor,
    pub routes: Vec<&'a RouteDescriptor>,
}

fn admits(access: &Visibility, role: Option<Role>) -> bool {
    let Some(role) = role else {
        return false;
    };
    match access {
        Visibility::All => true,
        Visibility::Only(roles) => roles.contains(&role),
    }
}

/// can_access_route
///
/// True iff the role is resolved and the route admits it (or admits everyone).
pub fn can_access_route(route: &RouteDescriptor, role: Option<Role>) -> bool {
    admits(&route.access, role)
}

pub fn can_see_group(group: &GroupDescriptor, role: Option<Role>) -> bool {
    admits(&group.access, role)
}

/// resolve_path_for_role
///
/// The role's override destination when one is declared, otherwise the route's
/// own path. A null role always gets the default path.
pub fn resolve_path_for_role(route: &RouteDescriptor, role: Option<Role>) -> &'static str {
    role.and_then(|role| {
        route
            .path_overrides
            .iter()
            .find(|(candidate, _)| *candidate == role)
            .map(|(_, path)| *path)
    })
    .unwrap_or(route.path)
}

/// Registry
///
/// A pair of group and route tables the resolver runs over. The free functions in
/// this module use [`Registry::builtin`]; other tables can be resolved the same way.
#[derive(Debug, Clone, Copy)]
pub struct Registry<'a> {
    pub groups: &'a [GroupDescriptor],
    pub routes: &'a [RouteDescriptor],
}

impl Registry<'static> {
    pub fn builtin() -> Self {
        Registry {
            groups: GROUPS,
            routes: ROUTES,
        }
    }
}

impl<'a> Registry<'a> {
    pub fn new(groups: &'a [GroupDescriptor], routes: &'a [RouteDescriptor]) -> Self {
        Self { groups, routes }
    }

    /// routes_for_role
    ///
    /// Groups ascending by order, routes ascending by order within each group,
    /// empty groups dropped. Both sorts are stable so equal orders keep their
    /// declaration order. A route only shows up when its group is visible too.
    pub fn routes_for_role(&self, role: Option<Role>) -> Vec<NavigationSection<'a>> {
        if role.is_none() {
            return Vec::new();
        }

        let mut groups: Vec<&'a GroupDescriptor> = self
            .groups
            .iter()
            .filter(|group| can_see_group(group, role))
            .collect();
        groups.sort_by(|a, b| a.order.total_cmp(&b.order));

        let mut routes: Vec<&'a RouteDescriptor> = self
            .routes
            .iter()
            .filter(|route| !route.hidden && can_access_route(route, role))
            .collect();
        routes.sort_by(|a, b| a.order.total_cmp(&b.order));

        groups
            .into_iter()
            .map(|group| NavigationSection {
                group,
                routes: routes
                    .iter()
                    .copied()
                    .filter(|route| route.group == group.id)
                    .collect(),
            })
            .filter(|section| !section.routes.is_empty())
            .collect()
    }

    /// Same filter as [`Registry::routes_for_role`], flattened by (group order, route order).
    pub fn flat_routes_for_role(&self, role: Option<Role>) -> Vec<&'a RouteDescriptor> {
        self.routes_for_role(role)
            .into_iter()
            .flat_map(|section| section.routes)
            .collect()
    }

    /// mobile_quick_actions
    ///
    /// Walks the fixed priority list for the role's category, keeps entries the
    /// role can open, and stops at [`MAX_QUICK_ACTIONS`]. Paths missing from the
    /// registry are skipped.
    pub fn mobile_quick_actions(&self, role: Option<Role>) -> Vec<&'a RouteDescriptor> {
        let Some(resolved) = role else {
            return Vec::new();
        };
        let priority = if resolved == Role::Staff {
            STAFF_QUICK_ACTIONS
        } else {
            MANAGER_QUICK_ACTIONS
        };

        priority
            .iter()
            .filter_map(|path| self.route_by_path(path))
            .filter(|route| can_access_route(route, role))
            .take(MAX_QUICK_ACTIONS)
            .collect()
    }

    /// Looks a route up by its default path, children included.
    pub fn route_by_path(&self, path: &str) -> Option<&'a RouteDescriptor> {
        find_route(self.routes, path)
    }

    pub fn group_config(&self, id: GroupId) -> Option<&'a GroupDescriptor> {
        self.groups.iter().find(|group| group.id == id)
    }
}

fn find_route<'a>(routes: &'a [RouteDescriptor], path: &str) -> Option<&'a RouteDescriptor> {
    routes.iter().find_map(|route| {
        if route.path == path {
            Some(route)
        } else {
            find_route(route.children, path)
        }
    })
}

/// Listed children of `route` the role can see, in display order.
pub fn visible_children(route: &RouteDescriptor, role: Option<Role>) -> Vec<&'static RouteDescriptor> {
    let mut children: Vec<&'static RouteDescriptor> = route
        .children
        .iter()
        .filter(|child| !child.hidden && can_access_route(child, role))
        .collect();
    children.sort_by(|a, b| a.order.total_cmp(&b.order));
    children
}

pub fn routes_for_role(role: Option<Role>) -> Vec<NavigationSection<'static>> {
    Registry::builtin().routes_for_role(role)
}

pub fn flat_routes_for_role(role: Option<Role>) -> Vec<&'static RouteDescriptor> {
    Registry::builtin().flat_routes_for_role(role)
}

pub fn mobile_quick_actions(role: Option<Role>) -> Vec<&'static RouteDescriptor> {
    Registry::builtin().mobile_quick_actions(role)
}

pub fn route_by_path(path: &str) -> Option<&'static RouteDescriptor> {
    Registry::builtin().route_by_path(path)
}

pub fn group_config(id: GroupId) -> Option<&'static GroupDescriptor> {
    Registry::builtin().group_config(id)
}
