use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::models::Role::{
    self, DepartmentHead, PropertyHr, PropertyManager, RegionalAdmin, RegionalHr, Staff,
};

/// Visibility
///
/// Who may see an entry. `All` admits any resolved role; it never admits an
/// unresolved (null) role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visibility {
    All,
    Only(&'static [Role]),
}

/// Presentation
///
/// Display metadata. The resolver never reads this.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub label_key: &'static str,
    pub icon: &'static str,
    pub badge_key: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupId {
    Home,
    MyWork,
    Communication,
    KnowledgeBase,
    Operations,
    HrManagement,
    Administration,
    Settings,
}

impl GroupId {
    pub const ALL: [GroupId; 8] = [
        GroupId::Home,
        GroupId::MyWork,
        GroupId::Communication,
        GroupId::KnowledgeBase,
        GroupId::Operations,
        GroupId::HrManagement,
        GroupId::Administration,
        GroupId::Settings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GroupId::Home => "home",
            GroupId::MyWork => "my_work",
            GroupId::Communication => "communication",
            GroupId::KnowledgeBase => "knowledge_base",
            GroupId::Operations => "operations",
            GroupId::HrManagement => "hr_management",
            GroupId::Administration => "administration",
            GroupId::Settings => "settings",
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupId::ALL
            .into_iter()
            .find(|group| group.as_str() == s)
            .ok_or(())
    }
}

/// GroupDescriptor
///
/// A navigation bucket with its own visibility rule and display order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupDescriptor {
    pub id: GroupId,
    pub access: Visibility,
    pub order: f64,
    pub collapsible: bool,
    pub display: Presentation,
}

/// RouteDescriptor
///
/// One navigable destination. `order` is only compared within the same group and
/// may be fractional to slot an entry between two existing ones. A `hidden` route
/// stays reachable (and can be the target of an override) but is never listed.
/// Children restate their own visibility; nothing is inherited from the parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteDescriptor {
    pub path: &'static str,
    pub access: Visibility,
    pub group: GroupId,
    pub order: f64,
    pub hidden: bool,
    pub children: &'static [RouteDescriptor],
    /// Same logical entry, different destination for the listed roles.
    pub path_overrides: &'static [(Role, &'static str)],
    pub display: Presentation,
}

impl RouteDescriptor {
    pub const fn new(
        path: &'static str,
        group: GroupId,
        order: f64,
        access: Visibility,
        display: Presentation,
    ) -> Self {
        Self {
            path,
            access,
            group,
            order,
            hidden: false,
            children: &[],
            path_overrides: &[],
            display,
        }
    }

    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub const fn children(mut self, children: &'static [RouteDescriptor]) -> Self {
        self.children = children;
        self
    }

    pub const fn overrides(mut self, overrides: &'static [(Role, &'static str)]) -> Self {
        self.path_overrides = overrides;
        self
    }
}

pub const fn show(label_key: &'static str, icon: &'static str) -> Presentation {
    Presentation {
        label_key,
        icon,
        badge_key: None,
    }
}

pub const fn badged(label_key: &'static str, icon: &'static str, badge: &'static str) -> Presentation {
    Presentation {
        label_key,
        icon,
        badge_key: Some(badge),
    }
}

// Role sets shared by several entries.
const MANAGEMENT: &[Role] = &[
    RegionalAdmin,
    RegionalHr,
    PropertyManager,
    PropertyHr,
    DepartmentHead,
];
const HR_AND_MANAGERS: &[Role] = &[RegionalAdmin, RegionalHr, PropertyManager, PropertyHr];
const HR_TEAM: &[Role] = &[RegionalAdmin, RegionalHr, PropertyHr];
const REGIONAL: &[Role] = &[RegionalAdmin, RegionalHr];
const ADMIN_ONLY: &[Role] = &[RegionalAdmin];
const PROPERTY_ADMIN: &[Role] = &[RegionalAdmin, PropertyManager];
const SOP_AUTHORS: &[Role] = &[RegionalAdmin, PropertyManager, PropertyHr, DepartmentHead];
const TEAM_LEADS: &[Role] = &[RegionalAdmin, PropertyManager, DepartmentHead];
const REPORT_READERS: &[Role] = &[RegionalAdmin, RegionalHr, PropertyManager];
const FRONTLINE: &[Role] = &[DepartmentHead, Staff];

pub static GROUPS: &[GroupDescriptor] = &[
    GroupDescriptor {
        id: GroupId::Home,
        access: Visibility::All,
        order: 1.0,
        collapsible: false,
        display: show("nav.group.home", "home"),
    },
    GroupDescriptor {
        id: GroupId::MyWork,
        access: Visibility::All,
        order: 2.0,
        collapsible: true,
        display: show("nav.group.my_work", "briefcase"),
    },
    GroupDescriptor {
        id: GroupId::Communication,
        access: Visibility::All,
        order: 3.0,
        collapsible: true,
        display: show("nav.group.communication", "message-circle"),
    },
    GroupDescriptor {
        id: GroupId::KnowledgeBase,
        access: Visibility::All,
        order: 4.0,
        collapsible: true,
        display: show("nav.group.knowledge_base", "library"),
    },
    GroupDescriptor {
        id: GroupId::Operations,
        access: Visibility::Only(MANAGEMENT),
        order: 5.0,
        collapsible: true,
        display: show("nav.group.operations", "settings-2"),
    },
    GroupDescriptor {
        id: GroupId::HrManagement,
        access: Visibility::Only(HR_AND_MANAGERS),
        order: 6.0,
        collapsible: true,
        display: show("nav.group.hr_management", "users"),
    },
    GroupDescriptor {
        id: GroupId::Administration,
        access: Visibility::Only(PROPERTY_ADMIN),
        order: 7.0,
        collapsible: true,
        display: show("nav.group.administration", "shield"),
    },
    GroupDescriptor {
        id: GroupId::Settings,
        access: Visibility::All,
        order: 99.0,
        collapsible: false,
        display: show("nav.group.settings", "settings"),
    },
];

const TRAINING_CHILDREN: &[RouteDescriptor] = &[
    RouteDescriptor::new(
        "/training/courses",
        GroupId::MyWork,
        1.0,
        Visibility::All,
        show("nav.training.courses", "book"),
    ),
    RouteDescriptor::new(
        "/training/certificates",
        GroupId::MyWork,
        2.0,
        Visibility::All,
        show("nav.training.certificates", "award"),
    ),
    RouteDescriptor::new(
        "/training/manage",
        GroupId::MyWork,
        3.0,
        Visibility::Only(HR_TEAM),
        show("nav.training.manage", "clipboard-check"),
    ),
];

pub static ROUTES: &[RouteDescriptor] = &[
    // home
    RouteDescriptor::new(
        "/dashboard",
        GroupId::Home,
        1.0,
        Visibility::All,
        show("nav.dashboard", "layout-dashboard"),
    )
    .overrides(&[
        (RegionalAdmin, "/admin/dashboard"),
        (RegionalHr, "/hr/dashboard"),
        (PropertyHr, "/hr/dashboard"),
        (PropertyManager, "/manager/dashboard"),
    ]),
    RouteDescriptor::new(
        "/admin/dashboard",
        GroupId::Home,
        1.0,
        Visibility::Only(ADMIN_ONLY),
        show("nav.dashboard", "layout-dashboard"),
    )
    .hidden(),
    RouteDescriptor::new(
        "/hr/dashboard",
        GroupId::Home,
        1.0,
        Visibility::Only(HR_TEAM),
        show("nav.dashboard", "layout-dashboard"),
    )
    .hidden(),
    RouteDescriptor::new(
        "/manager/dashboard",
        GroupId::Home,
        1.0,
        Visibility::Only(PROPERTY_ADMIN),
        show("nav.dashboard", "layout-dashboard"),
    )
    .hidden(),
    RouteDescriptor::new(
        "/notifications",
        GroupId::Home,
        2.0,
        Visibility::All,
        badged("nav.notifications", "bell", "unread_notifications"),
    ),
    // my_work
    RouteDescriptor::new(
        "/tasks",
        GroupId::MyWork,
        1.0,
        Visibility::All,
        badged("nav.my_tasks", "check-square", "open_tasks"),
    )
    .overrides(&[(DepartmentHead, "/tasks/team"), (PropertyManager, "/tasks/team")]),
    RouteDescriptor::new(
        "/tasks/team",
        GroupId::MyWork,
        1.0,
        Visibility::Only(TEAM_LEADS),
        show("nav.team_tasks", "list-checks"),
    )
    .hidden(),
    RouteDescriptor::new(
        "/training",
        GroupId::MyWork,
        2.0,
        Visibility::All,
        show("nav.training", "graduation-cap"),
    )
    .children(TRAINING_CHILDREN),
    RouteDescriptor::new(
        "/performance",
        GroupId::MyWork,
        2.5,
        Visibility::All,
        show("nav.my_performance", "trending-up"),
    ),
    RouteDescriptor::new(
        "/onboarding/my",
        GroupId::MyWork,
        3.0,
        Visibility::Only(FRONTLINE),
        show("nav.my_onboarding", "user-plus"),
    ),
    RouteDescriptor::new(
        "/schedule",
        GroupId::MyWork,
        4.0,
        Visibility::All,
        show("nav.my_schedule", "calendar"),
    ),
    RouteDescriptor::new(
        "/leave-requests",
        GroupId::MyWork,
        4.0,
        Visibility::All,
        show("nav.leave_requests", "plane"),
    ),
    RouteDescriptor::new(
        "/maintenance/report",
        GroupId::MyWork,
        5.0,
        Visibility::All,
        show("nav.report_issue", "alert-circle"),
    ),
    // communication
    RouteDescriptor::new(
        "/messages",
        GroupId::Communication,
        1.0,
        Visibility::All,
        badged("nav.messages", "message-square", "unread_messages"),
    ),
    RouteDescriptor::new(
        "/announcements",
        GroupId::Communication,
        2.0,
        Visibility::All,
        show("nav.announcements", "megaphone"),
    ),
    RouteDescriptor::new(
        "/directory",
        GroupId::Communication,
        3.0,
        Visibility::All,
        show("nav.staff_directory", "contact"),
    ),
    // knowledge_base
    RouteDescriptor::new(
        "/sop",
        GroupId::KnowledgeBase,
        1.0,
        Visibility::All,
        show("nav.sop_library", "book-open"),
    ),
    RouteDescriptor::new(
        "/knowledge/search",
        GroupId::KnowledgeBase,
        2.0,
        Visibility::All,
        show("nav.knowledge_search", "search"),
    ),
    RouteDescriptor::new(
        "/sop/editor",
        GroupId::KnowledgeBase,
        3.0,
        Visibility::Only(SOP_AUTHORS),
        show("nav.sop_editor", "file-edit"),
    ),
    // operations
    // Open to everyone at route level so ticket links resolve, but the group
    // keeps it out of frontline menus.
    RouteDescriptor::new(
        "/maintenance",
        GroupId::Operations,
        1.0,
        Visibility::All,
        badged("nav.maintenance", "wrench", "open_tickets"),
    ),
    RouteDescriptor::new(
        "/approvals",
        GroupId::Operations,
        2.0,
        Visibility::Only(MANAGEMENT),
        badged("nav.approvals", "check-circle", "pending_approvals"),
    ),
    RouteDescriptor::new(
        "/escalation-rules",
        GroupId::Operations,
        3.0,
        Visibility::Only(PROPERTY_ADMIN),
        show("nav.escalation_rules", "alert-triangle"),
    ),
    RouteDescriptor::new(
        "/reports",
        GroupId::Operations,
        4.0,
        Visibility::Only(REPORT_READERS),
        show("nav.reports", "bar-chart"),
    ),
    // hr_management
    RouteDescriptor::new(
        "/hr/staff",
        GroupId::HrManagement,
        1.0,
        Visibility::Only(HR_AND_MANAGERS),
        show("nav.staff_management", "users-cog"),
    ),
    RouteDescriptor::new(
        "/hr/jobs",
        GroupId::HrManagement,
        2.0,
        Visibility::Only(HR_TEAM),
        badged("nav.job_postings", "briefcase", "open_applications"),
    ),
    RouteDescriptor::new(
        "/hr/onboarding",
        GroupId::HrManagement,
        3.0,
        Visibility::Only(HR_TEAM),
        show("nav.onboarding_management", "clipboard-list"),
    ),
    RouteDescriptor::new(
        "/hr/certificates",
        GroupId::HrManagement,
        4.0,
        Visibility::Only(REGIONAL),
        show("nav.certificate_issuance", "award"),
    ),
    // administration
    RouteDescriptor::new(
        "/admin/properties",
        GroupId::Administration,
        1.0,
        Visibility::Only(ADMIN_ONLY),
        show("nav.properties", "building"),
    ),
    RouteDescriptor::new(
        "/admin/departments",
        GroupId::Administration,
        2.0,
        Visibility::Only(PROPERTY_ADMIN),
        show("nav.departments", "layers"),
    ),
    RouteDescriptor::new(
        "/admin/users",
        GroupId::Administration,
        3.0,
        Visibility::Only(ADMIN_ONLY),
        show("nav.user_roles", "shield-check"),
    ),
    RouteDescriptor::new(
        "/admin/audit-log",
        GroupId::Administration,
        4.0,
        Visibility::Only(ADMIN_ONLY),
        show("nav.audit_log", "scroll"),
    ),
    // settings
    RouteDescriptor::new(
        "/settings/profile",
        GroupId::Settings,
        1.0,
        Visibility::All,
        show("nav.profile", "user"),
    ),
    RouteDescriptor::new(
        "/settings/preferences",
        GroupId::Settings,
        2.0,
        Visibility::All,
        show("nav.preferences", "sliders"),
    ),
    RouteDescriptor::new(
        "/help",
        GroupId::Settings,
        3.0,
        Visibility::All,
        show("nav.help", "life-buoy"),
    ),
];

/// Quick-action priority for the lowest-privilege role.
pub static STAFF_QUICK_ACTIONS: &[&str] = &[
    "/tasks",
    "/messages",
    "/sop",
    "/maintenance/report",
    "/training",
    "/announcements",
];

/// Quick-action priority for every other role.
pub static MANAGER_QUICK_ACTIONS: &[&str] = &[
    "/dashboard",
    "/approvals",
    "/messages",
    "/maintenance",
    "/hr/staff",
    "/announcements",
];
