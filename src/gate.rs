//! Access gate: the per-request authorization decision and the role-based
//! dashboard dispatch.

use crate::{
    classifier::Capability,
    models::{Identity, Role},
};
use std::fmt;

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_HOME: &str = "/tableau-de-bord/admin";
pub const STUDENT_HOME: &str = "/tableau-de-bord/etudiant";
pub const INSTRUCTOR_HOME: &str = "/tableau-de-bord/instructeur";

/// Decision
///
/// Outcome of gate evaluation. Produced per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect { destination: String },
    Deny { reason: DenyReason },
}

/// DenyReason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    InsufficientRole { required: Capability, role: Role },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::InsufficientRole { required, role } => {
                write!(f, "role {role} does not satisfy {required:?}")
            }
        }
    }
}

/// login_redirect
///
/// Login URL carrying the originally requested path (and query) as `returnTo`.
pub fn login_redirect(return_to: &str) -> String {
    serde_urlencoded::to_string([("returnTo", return_to)])
        .map(|query| format!("{LOGIN_PATH}?{query}"))
        .unwrap_or_else(|_| LOGIN_PATH.to_string())
}

/// authorize
///
/// Decides whether `identity` may reach a route requiring `capability`.
/// `requested` is the path (with query) used as the login return target.
///
/// Identities whose role is not one of STUDENT/INSTRUCTOR/ADMIN are treated
/// as unauthenticated.
pub fn authorize(identity: Option<&Identity>, capability: Capability, requested: &str) -> Decision {
    if capability == Capability::Public {
        return Decision::Allow;
    }

    let member = identity.filter(|identity| {
        let recognized = identity.role.is_recognized_member();
        if !recognized {
            tracing::warn!(
                user_id = %identity.user_id,
                role = %identity.role,
                "Unrecognized role on session, treating as unauthenticated"
            );
        }
        recognized
    });

    let Some(member) = member else {
        return Decision::Redirect {
            destination: login_redirect(requested),
        };
    };

    let allowed = match capability {
        Capability::Public | Capability::Authenticated => true,
        Capability::Admin => member.role == Role::Admin,
        Capability::AdminOrInstructor => matches!(member.role, Role::Admin | Role::Instructor),
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny {
            reason: DenyReason::InsufficientRole {
                required: capability,
                role: member.role.clone(),
            },
        }
    }
}

/// dispatch_role
///
/// Landing page of the generic dashboard entry point. Total over `Role`:
/// anything that is not ADMIN/STUDENT/INSTRUCTOR is an anomaly, logged once,
/// and sent to login.
pub fn dispatch_role(role: &Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_HOME,
        Role::Student => STUDENT_HOME,
        Role::Instructor => INSTRUCTOR_HOME,
        Role::Guest | Role::Unrecognized(_) => {
            tracing::error!(role = %role, "Unknown user role, redirecting to login");
            LOGIN_PATH
        }
    }
}
