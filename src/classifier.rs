//! Route classification: which capability a path requires, and which
//! navigation chrome the renderer should draw around it.
//!
//! Everything here is a pure, total function of the path string.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Capability
///
/// The access level a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    Public,
    Authenticated,
    Admin,
    AdminOrInstructor,
}

/// RouteDescriptor
#[derive(Debug, Clone, Copy)]
pub struct RouteDescriptor {
    pub root: &'static str,
    pub capability: Capability,
}

/// Public route roots. Each one also covers everything below it.
pub const PUBLIC_ROOTS: &[&str] = &[
    "/",
    "/courses",
    "/formations",
    "/panier",
    "/blog",
    "/login",
    "/reset-password",
    "/checkout",
    "/paiement",
    "/api/webhooks",
];

const PROTECTED: &[RouteDescriptor] = &[
    RouteDescriptor {
        root: "/tableau-de-bord/admin",
        capability: Capability::Admin,
    },
    RouteDescriptor {
        root: "/api/admin",
        capability: Capability::Admin,
    },
    RouteDescriptor {
        root: "/tableau-de-bord/instructeur",
        capability: Capability::AdminOrInstructor,
    },
    // Pre-rename admin pages still served under the old shape.
    RouteDescriptor {
        root: "/dashboard/admin",
        capability: Capability::Admin,
    },
    RouteDescriptor {
        root: "/dashboard/admin/cohorts",
        capability: Capability::AdminOrInstructor,
    },
];

/// Non-public descriptors, in declaration order.
pub fn protected_descriptors() -> &'static [RouteDescriptor] {
    PROTECTED
}

/// Whether `root` covers `path`: equal, or a prefix ending on a segment boundary.
/// The site root `/` therefore only covers itself.
pub fn covers(root: &str, path: &str) -> bool {
    if root == "/" {
        return path == "/";
    }
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn descriptors() -> impl Iterator<Item = RouteDescriptor> {
    PUBLIC_ROOTS
        .iter()
        .map(|&root| RouteDescriptor {
            root,
            capability: Capability::Public,
        })
        .chain(PROTECTED.iter().copied())
}

/// classify
///
/// Most specific (longest) matching descriptor wins; unmatched paths
/// require `Authenticated`.
pub fn classify(path: &str) -> Capability {
    descriptors()
        .filter(|descriptor| covers(descriptor.root, path))
        .max_by_key(|descriptor| descriptor.root.len())
        .map_or(Capability::Authenticated, |descriptor| descriptor.capability)
}

/// RouteChrome
///
/// Navigation variant the renderer wraps a page in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChrome {
    Default,
    Brutalist,
}

impl RouteChrome {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteChrome::Default => "default",
            RouteChrome::Brutalist => "brutalist",
        }
    }
}

/// chrome_for
///
/// Marketing pages carry their own navbar; investor waitlists and the cohort
/// learning interface keep the default one.
pub fn chrome_for(path: &str) -> RouteChrome {
    let brutalist = path == "/"
        || path == "/contact"
        || path.starts_with("/formations")
        || (path.starts_with("/investisseur") && !path.contains("/waitlist"))
        || (path.starts_with("/cohorte") && !path.contains("/apprendre"));

    if brutalist {
        RouteChrome::Brutalist
    } else {
        RouteChrome::Default
    }
}
