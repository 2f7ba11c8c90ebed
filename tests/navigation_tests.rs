use hotel_ops_portal::{
    models::Role,
    navigation::{
        GroupDescriptor, GroupId, Registry, RouteDescriptor, Visibility, can_access_route,
        can_see_group, flat_routes_for_role, group_config, menu, mobile_quick_actions,
        registry::{GROUPS, ROUTES, show},
        resolve_path_for_role, resolver::MAX_QUICK_ACTIONS, route_by_path, routes_for_role,
        visible_children,
    },
};
use std::collections::HashSet;

// --- Helpers ---

fn all_routes() -> Vec<&'static RouteDescriptor> {
    fn walk(routes: &'static [RouteDescriptor], out: &mut Vec<&'static RouteDescriptor>) {
        for route in routes {
            out.push(route);
            walk(route.children, out);
        }
    }
    let mut out = Vec::new();
    walk(ROUTES, &mut out);
    out
}

fn roles_and_none() -> Vec<Option<Role>> {
    std::iter::once(None)
        .chain(Role::ALL.into_iter().map(Some))
        .collect()
}

fn paths(routes: &[&RouteDescriptor]) -> Vec<&'static str> {
    routes.iter().map(|route| route.path).collect()
}

fn route(path: &str) -> &'static RouteDescriptor {
    route_by_path(path).unwrap_or_else(|| panic!("{path} missing from registry"))
}

// --- Registry invariants ---

#[test]
fn test_route_paths_are_unique() {
    let mut seen = HashSet::new();
    for route in all_routes() {
        assert!(seen.insert(route.path), "duplicate route path {}", route.path);
    }
}

#[test]
fn test_every_route_belongs_to_a_declared_group() {
    let declared: HashSet<GroupId> = GROUPS.iter().map(|group| group.id).collect();
    for route in all_routes() {
        assert!(declared.contains(&route.group), "{} has an undeclared group", route.path);
    }
    assert_eq!(declared.len(), GROUPS.len(), "group ids must be unique");
}

#[test]
fn test_role_restrictions_are_never_empty() {
    for route in all_routes() {
        if let Visibility::Only(roles) = route.access {
            assert!(!roles.is_empty(), "{} admits nobody", route.path);
        }
    }
    for group in GROUPS {
        if let Visibility::Only(roles) = group.access {
            assert!(!roles.is_empty(), "{} admits nobody", group.id);
        }
    }
}

#[test]
fn test_path_overrides_target_reachable_routes() {
    for route in all_routes() {
        for (role, target) in route.path_overrides {
            let destination = route_by_path(target)
                .unwrap_or_else(|| panic!("{} overrides to unknown {target}", route.path));
            assert!(
                can_access_route(destination, Some(*role)),
                "{role} is sent to {target} but cannot open it"
            );
        }
    }
}

// --- Access predicates ---

#[test]
fn test_unresolved_role_is_denied_everything() {
    for route in all_routes() {
        assert!(!can_access_route(route, None), "{} admitted a null role", route.path);
    }
    for group in GROUPS {
        assert!(!can_see_group(group, None));
    }
    assert!(routes_for_role(None).is_empty());
    assert!(flat_routes_for_role(None).is_empty());
    assert!(mobile_quick_actions(None).is_empty());
}

#[test]
fn test_route_access_matches_allowed_roles() {
    for route in all_routes() {
        for role in Role::ALL {
            let expected = match route.access {
                Visibility::All => true,
                Visibility::Only(roles) => roles.contains(&role),
            };
            assert_eq!(can_access_route(route, Some(role)), expected, "{} / {role}", route.path);
        }
    }
}

#[test]
fn test_restricted_routes() {
    assert!(can_access_route(route("/admin/users"), Some(Role::RegionalAdmin)));
    assert!(!can_access_route(route("/admin/users"), Some(Role::PropertyManager)));
    assert!(can_access_route(route("/sop/editor"), Some(Role::DepartmentHead)));
    assert!(!can_access_route(route("/sop/editor"), Some(Role::Staff)));
    assert!(can_access_route(route("/onboarding/my"), Some(Role::Staff)));
    assert!(!can_access_route(route("/onboarding/my"), Some(Role::RegionalHr)));
}

// --- Menu resolution ---

#[test]
fn test_menu_never_lists_hidden_routes_or_invisible_groups() {
    for role in Role::ALL.into_iter().map(Some) {
        for section in routes_for_role(role) {
            assert!(can_see_group(section.group, role));
            assert!(!section.routes.is_empty(), "empty group {} shown", section.group.id);
            for route in &section.routes {
                assert!(!route.hidden, "hidden {} listed", route.path);
                assert!(can_access_route(route, role));
                assert_eq!(route.group, section.group.id);
            }
        }
    }
}

#[test]
fn test_group_visibility_overrides_route_visibility() {
    // Every role may open the maintenance board, but frontline staff never see
    // the operations group it lives in.
    let maintenance = route("/maintenance");
    assert!(can_access_route(maintenance, Some(Role::Staff)));

    let staff_paths = paths(&flat_routes_for_role(Some(Role::Staff)));
    assert!(!staff_paths.contains(&"/maintenance"));
    assert!(
        routes_for_role(Some(Role::Staff))
            .iter()
            .all(|section| section.group.id != GroupId::Operations)
    );

    let head_paths = paths(&flat_routes_for_role(Some(Role::DepartmentHead)));
    assert!(head_paths.contains(&"/maintenance"));
}

#[test]
fn test_staff_menu() {
    let sections = routes_for_role(Some(Role::Staff));
    let groups: Vec<GroupId> = sections.iter().map(|section| section.group.id).collect();
    assert_eq!(
        groups,
        vec![
            GroupId::Home,
            GroupId::MyWork,
            GroupId::Communication,
            GroupId::KnowledgeBase,
            GroupId::Settings,
        ]
    );

    assert_eq!(
        paths(&sections[1].routes),
        vec![
            "/tasks",
            "/training",
            "/performance",
            "/onboarding/my",
            "/schedule",
            "/leave-requests",
            "/maintenance/report",
        ]
    );
    assert_eq!(paths(&sections[3].routes), vec!["/sop", "/knowledge/search"]);
}

#[test]
fn test_regional_admin_sees_every_group() {
    let groups: Vec<GroupId> = routes_for_role(Some(Role::RegionalAdmin))
        .iter()
        .map(|section| section.group.id)
        .collect();
    assert_eq!(groups, GroupId::ALL.to_vec());
}

#[test]
fn test_groups_and_routes_are_sorted_by_order() {
    for role in Role::ALL.into_iter().map(Some) {
        let sections = routes_for_role(role);
        for pair in sections.windows(2) {
            assert!(pair[0].group.order <= pair[1].group.order);
        }
        for section in &sections {
            for pair in section.routes.windows(2) {
                assert!(pair[0].order <= pair[1].order);
            }
        }
    }
}

#[test]
fn test_fractional_order_slots_between_neighbours() {
    let my_work = paths(&routes_for_role(Some(Role::PropertyHr))[1].routes);
    let training = my_work.iter().position(|path| *path == "/training");
    let performance = my_work.iter().position(|path| *path == "/performance");
    let schedule = my_work.iter().position(|path| *path == "/schedule");
    assert!(training < performance && performance < schedule);
}

#[test]
fn test_equal_orders_keep_declaration_order() {
    static GROUPS_UNDER_TEST: &[GroupDescriptor] = &[
        GroupDescriptor {
            id: GroupId::Settings,
            access: Visibility::All,
            order: 2.0,
            collapsible: false,
            display: show("group.b", "b"),
        },
        GroupDescriptor {
            id: GroupId::Home,
            access: Visibility::All,
            order: 2.0,
            collapsible: false,
            display: show("group.a", "a"),
        },
    ];
    static ROUTES_UNDER_TEST: &[RouteDescriptor] = &[
        RouteDescriptor::new("/zeta", GroupId::Home, 1.0, Visibility::All, show("z", "z")),
        RouteDescriptor::new("/alpha", GroupId::Home, 1.0, Visibility::All, show("a", "a")),
        RouteDescriptor::new("/first", GroupId::Home, 0.5, Visibility::All, show("f", "f")),
        RouteDescriptor::new("/prefs", GroupId::Settings, 1.0, Visibility::All, show("p", "p")),
    ];

    let registry = Registry::new(GROUPS_UNDER_TEST, ROUTES_UNDER_TEST);
    let sections = registry.routes_for_role(Some(Role::Staff));

    // Tied groups keep declaration order: settings was declared first.
    assert_eq!(sections[0].group.id, GroupId::Settings);
    assert_eq!(sections[1].group.id, GroupId::Home);
    assert_eq!(paths(&sections[1].routes), vec!["/first", "/zeta", "/alpha"]);

    let flat = paths(&registry.flat_routes_for_role(Some(Role::Staff)));
    assert_eq!(flat, vec!["/prefs", "/first", "/zeta", "/alpha"]);
}

#[test]
fn test_builtin_ties_keep_declaration_order() {
    let my_work = paths(&routes_for_role(Some(Role::Staff))[1].routes);
    let schedule = my_work.iter().position(|path| *path == "/schedule");
    let leave = my_work.iter().position(|path| *path == "/leave-requests");
    assert!(schedule < leave);
}

#[test]
fn test_flat_routes_follow_group_then_route_order() {
    for role in roles_and_none() {
        let expected: Vec<&str> = routes_for_role(role)
            .into_iter()
            .flat_map(|section| section.routes)
            .map(|route| route.path)
            .collect();
        assert_eq!(paths(&flat_routes_for_role(role)), expected);
    }
}

// --- Path overrides ---

#[test]
fn test_path_override_resolution() {
    let dashboard = route("/dashboard");
    assert_eq!(resolve_path_for_role(dashboard, Some(Role::RegionalAdmin)), "/admin/dashboard");
    assert_eq!(resolve_path_for_role(dashboard, Some(Role::RegionalHr)), "/hr/dashboard");
    assert_eq!(resolve_path_for_role(dashboard, Some(Role::PropertyHr)), "/hr/dashboard");
    assert_eq!(
        resolve_path_for_role(dashboard, Some(Role::PropertyManager)),
        "/manager/dashboard"
    );
    assert_eq!(resolve_path_for_role(dashboard, Some(Role::Staff)), "/dashboard");
    assert_eq!(resolve_path_for_role(dashboard, None), "/dashboard");
}

#[test]
fn test_routes_without_overrides_resolve_to_their_own_path() {
    for route in all_routes().into_iter().filter(|r| r.path_overrides.is_empty()) {
        for role in roles_and_none() {
            assert_eq!(resolve_path_for_role(route, role), route.path);
        }
    }
}

#[test]
fn test_menu_items_carry_resolved_paths() {
    let sections = menu::menu_for_role(Some(Role::DepartmentHead));
    let tasks = sections
        .iter()
        .flat_map(|section| &section.items)
        .find(|item| item.route_path == "/tasks")
        .expect("tasks listed for department heads");
    assert_eq!(tasks.path, "/tasks/team");
    assert_eq!(tasks.badge_key.as_deref(), Some("open_tasks"));
}

// --- Children ---

#[test]
fn test_children_restate_their_own_visibility() {
    let training = route("/training");

    let staff: Vec<&str> = visible_children(training, Some(Role::Staff))
        .iter()
        .map(|child| child.path)
        .collect();
    assert_eq!(staff, vec!["/training/courses", "/training/certificates"]);

    let hr: Vec<&str> = visible_children(training, Some(Role::PropertyHr))
        .iter()
        .map(|child| child.path)
        .collect();
    assert_eq!(
        hr,
        vec!["/training/courses", "/training/certificates", "/training/manage"]
    );

    assert!(visible_children(training, None).is_empty());
}

#[test]
fn test_children_are_found_by_path() {
    let manage = route("/training/manage");
    assert_eq!(manage.group, GroupId::MyWork);
    assert!(route_by_path("/does-not-exist").is_none());
}

// --- Quick actions ---

#[test]
fn test_quick_actions_for_staff() {
    assert_eq!(
        paths(&mobile_quick_actions(Some(Role::Staff))),
        vec!["/tasks", "/messages", "/sop", "/maintenance/report", "/training"]
    );
}

#[test]
fn test_quick_actions_for_managers_skip_inaccessible_entries() {
    assert_eq!(
        paths(&mobile_quick_actions(Some(Role::RegionalAdmin))),
        vec!["/dashboard", "/approvals", "/messages", "/maintenance", "/hr/staff"]
    );
    // Department heads cannot open staff management, so the next entry moves up.
    assert_eq!(
        paths(&mobile_quick_actions(Some(Role::DepartmentHead))),
        vec!["/dashboard", "/approvals", "/messages", "/maintenance", "/announcements"]
    );
}

#[test]
fn test_quick_actions_are_bounded_and_accessible() {
    for role in Role::ALL.into_iter().map(Some) {
        let actions = mobile_quick_actions(role);
        assert!(actions.len() <= MAX_QUICK_ACTIONS);
        assert!(actions.iter().all(|route| can_access_route(route, role)));
    }
}

// --- Group lookup and page guard ---

#[test]
fn test_group_config_lookup() {
    let settings = group_config(GroupId::Settings).expect("settings group");
    assert_eq!(settings.order, 99.0);
    assert!(!settings.collapsible);
    assert_eq!("hr_management".parse::<GroupId>(), Ok(GroupId::HrManagement));
    assert!("nope".parse::<GroupId>().is_err());
}

#[test]
fn test_route_access_guard() {
    let allowed = menu::route_access("/dashboard", Some(Role::RegionalAdmin));
    assert!(allowed.allowed);
    assert_eq!(allowed.resolved_path.as_deref(), Some("/admin/dashboard"));

    // Hidden routes stay reachable for roles that pass their rule.
    let hidden = menu::route_access("/hr/dashboard", Some(Role::RegionalHr));
    assert!(hidden.allowed);

    let denied = menu::route_access("/admin/users", Some(Role::Staff));
    assert!(!denied.allowed);
    assert!(denied.resolved_path.is_none());

    assert!(!menu::route_access("/dashboard", None).allowed);
    assert!(!menu::route_access("/unknown", Some(Role::RegionalAdmin)).allowed);
}
