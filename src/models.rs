use crate::classifier::Capability;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity ---

/// User
///
/// Identity-store row for an authenticated account. `role` is the raw column
/// value; it is only ever interpreted through [`Role::parse`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

/// Role
///
/// Closed set of platform roles. Values the gateway does not know about land
/// in `Unrecognized` so every `match` has to decide what to do with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Guest,
    Student,
    Instructor,
    Admin,
    Unrecognized(String),
}

impl Role {
    /// Parses the identity-store representation (`"ADMIN"`, `"STUDENT"`, ...).
    /// Matching is exact; anything else is kept verbatim as `Unrecognized`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "GUEST" => Role::Guest,
            "STUDENT" => Role::Student,
            "INSTRUCTOR" => Role::Instructor,
            "ADMIN" => Role::Admin,
            other => Role::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Guest => "GUEST",
            Role::Student => "STUDENT",
            Role::Instructor => "INSTRUCTOR",
            Role::Admin => "ADMIN",
            Role::Unrecognized(raw) => raw,
        }
    }

    /// Whether the gate may treat a holder of this role as signed in.
    pub fn is_recognized_member(&self) -> bool {
        matches!(self, Role::Student | Role::Instructor | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity
///
/// The resolved identity attached to a request. Created by the session
/// resolver and never mutated for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Identity {
            user_id: user.id,
            role: Role::parse(&user.role),
            email: user.email,
        }
    }
}

/// MeResponse
///
/// Output schema for `GET /api/me`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    /// Where the dashboard entry point sends this user.
    pub landing_path: String,
}

// --- Enrollment / progress rows (read-only) ---

/// CourseModule
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq, Eq)]
#[ts(export)]
pub struct CourseModule {
    pub id: Uuid,
    pub title: String,
    pub order: i32,
}

/// TaskType
///
/// Kind of work a plan entry schedules. Mirrors the `"TaskType"` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "\"TaskType\"", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Learn,
    Review,
    Practice,
}

/// TaskStatus
///
/// PENDING -> IN_PROGRESS -> COMPLETED. Written only by the activity-completion
/// handler of the renderer; this service reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "\"PlanEntryStatus\"", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

/// PlanSettings
///
/// Per-user, per-course planning dates. Either may be unset while the student
/// has not finished the orientation form.
#[derive(Debug, Clone, Default, FromRow)]
pub struct PlanSettings {
    pub week1_start_date: Option<NaiveDate>,
    pub exam_date: Option<NaiveDate>,
}

/// PlanEntry
///
/// One scheduled block of the daily plan.
#[derive(Debug, Clone, FromRow)]
pub struct PlanEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub module_id: Option<Uuid>,
    pub module_title: Option<String>,
    pub module_number: Option<i32>,
    pub blocks: i32,
}

// --- Derivations (views, never persisted) ---

/// DerivationResult
///
/// Envelope for every derived view. Callers check `success` before reading `data`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DerivationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> DerivationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// ModuleRef
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct ModuleRef {
    pub id: Uuid,
    pub title: String,
    pub order: i32,
}

impl From<CourseModule> for ModuleRef {
    fn from(module: CourseModule) -> Self {
        ModuleRef {
            id: module.id,
            title: module.title,
            order: module.order,
        }
    }
}

/// Phase3Access
///
/// Output of the phase-3 gate derivation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Phase3Access {
    pub can_access: bool,
    pub learned_modules: usize,
    pub total_modules: usize,
    pub unlearned_modules: Vec<ModuleRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// WeekPhase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeekPhase {
    Learn,
    Review,
    Practice,
    Mixed,
}

impl From<TaskType> for WeekPhase {
    fn from(task_type: TaskType) -> Self {
        match task_type {
            TaskType::Learn => WeekPhase::Learn,
            TaskType::Review => WeekPhase::Review,
            TaskType::Practice => WeekPhase::Practice,
        }
    }
}

/// PlanTask
///
/// Entries of one week collapsed by (task type, module).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub description: String,
    pub module_id: Option<Uuid>,
    pub module_title: Option<String>,
    pub module_number: Option<i32>,
    pub item_count: usize,
    pub status: TaskStatus,
    pub entry_ids: Vec<Uuid>,
}

/// WeekPlan
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WeekPlan {
    pub week_number: u32,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub tasks: Vec<PlanTask>,
    pub phase: WeekPhase,
    pub estimated_blocks: i64,
    pub completed_tasks: usize,
    pub total_tasks: usize,
}

/// WeeklyPlan
///
/// `Unavailable` is a normal outcome (dates not configured yet), not an error.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum WeeklyPlan {
    #[serde(rename_all = "camelCase")]
    Unavailable { reason: String },
    #[serde(rename_all = "camelCase")]
    Available {
        week1_start_date: NaiveDate,
        exam_date: NaiveDate,
        weeks: Vec<WeekPlan>,
    },
}

// --- Admin console ---

/// RouteDescriptorView
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteDescriptorView {
    pub root: String,
    pub capability: Capability,
}

/// LegacyRouteView
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LegacyRouteView {
    pub pattern: String,
    pub target: String,
    pub forwarded: Vec<String>,
}

/// RouteTableResponse
///
/// Output schema for `GET /api/admin/routes`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableResponse {
    pub descriptors: Vec<RouteDescriptorView>,
    pub legacy: Vec<LegacyRouteView>,
    pub login_path: String,
}
