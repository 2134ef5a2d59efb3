use crate::{
    error::RepositoryError,
    models::{CourseModule, PlanEntry, PlanSettings, User},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Read-only contract over the identity store and the enrollment/progress
/// tables written by the renderer. Handlers, the session resolver and the
/// derivations only ever see this trait, so tests swap in hand-written mocks.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    // Platform user linked to a Supabase auth id (the session token's `sub`).
    async fn get_user_by_auth_id(&self, auth_id: &str) -> Result<Option<User>, RepositoryError>;

    // --- Course structure ---
    // Modules of a course, ordered by their `order` column.
    async fn get_course_modules(&self, course_id: Uuid) -> Result<Vec<CourseModule>, RepositoryError>;
    async fn get_course_slug(&self, course_id: Uuid) -> Result<Option<String>, RepositoryError>;

    // --- Progress ---
    // Modules whose every content item has a completed progress row for the user.
    async fn get_learned_module_ids(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<Uuid>, RepositoryError>;

    // --- Study plan ---
    async fn get_plan_settings(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<PlanSettings>, RepositoryError>;
    // Entries ordered by date then plan order.
    async fn get_plan_entries(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<PlanEntry>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the platform's PostgreSQL database. Table and column
/// names follow the ORM's quoted PascalCase/camelCase convention.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// get_user_by_auth_id
    ///
    /// Retrieves the identity fields needed for authentication and role dispatch.
    /// The role enum is read as text so unknown values survive to `Role::parse`.
    async fn get_user_by_auth_id(&self, auth_id: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, role::text AS role FROM "User" WHERE "supabaseId" = $1"#,
        )
        .bind(auth_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_course_modules(&self, course_id: Uuid) -> Result<Vec<CourseModule>, RepositoryError> {
        let modules = sqlx::query_as::<_, CourseModule>(
            r#"SELECT id, title, "order" FROM "Module" WHERE "courseId" = $1 ORDER BY "order" ASC"#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(modules)
    }

    async fn get_course_slug(&self, course_id: Uuid) -> Result<Option<String>, RepositoryError> {
        let slug = sqlx::query_scalar::<_, Option<String>>(r#"SELECT slug FROM "Course" WHERE id = $1"#)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        // Row missing and slug column NULL both mean "no slug".
        Ok(slug.flatten())
    }

    /// get_learned_module_ids
    ///
    /// A module counts as learned when it has content and none of its content
    /// items lacks a completed `ProgressTracking` row for the user.
    async fn get_learned_module_ids(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT m.id
            FROM "Module" m
            WHERE m."courseId" = $2
              AND EXISTS (SELECT 1 FROM "ContentItem" ci WHERE ci."moduleId" = m.id)
              AND NOT EXISTS (
                  SELECT 1
                  FROM "ContentItem" ci
                  LEFT JOIN "ProgressTracking" pt
                         ON pt."contentItemId" = ci.id
                        AND pt."userId" = $1
                        AND pt."completedAt" IS NOT NULL
                  WHERE ci."moduleId" = m.id AND pt.id IS NULL
              )
            ORDER BY m."order" ASC
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn get_plan_settings(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<PlanSettings>, RepositoryError> {
        let settings = sqlx::query_as::<_, PlanSettings>(
            r#"
            SELECT "planCreatedAt"::date AS week1_start_date,
                   "examDate"::date AS exam_date
            FROM "UserCourseSettings"
            WHERE "userId" = $1 AND "courseId" = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(settings)
    }

    /// get_plan_entries
    ///
    /// Joins the target module so the weekly view can label tasks without a
    /// second round trip.
    async fn get_plan_entries(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<PlanEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, PlanEntry>(
            r#"
            SELECT e.id,
                   e.date::date AS date,
                   e."taskType" AS task_type,
                   e.status,
                   e."targetModuleId" AS module_id,
                   m.title AS module_title,
                   m."order" AS module_number,
                   e."estimatedBlocks" AS blocks
            FROM "DailyPlanEntry" e
            LEFT JOIN "Module" m ON m.id = e."targetModuleId"
            WHERE e."userId" = $1 AND e."courseId" = $2
            ORDER BY e.date ASC, e."order" ASC
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
