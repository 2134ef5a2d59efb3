use crate::{
    error::RepositoryError,
    models::{CourseModule, PlanEntry, PlanSettings, User},
    repository::Repository,
};
use async_trait::async_trait;
use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};
use uuid::Uuid;

/// QueryStats
///
/// Snapshot of the counters kept by [`InstrumentedRepository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryStats {
    pub total: u64,
    pub slow: u64,
}

/// InstrumentedRepository
///
/// Timing decorator around any `Repository`. It is wired in at construction
/// time (see `main.rs`); the inner repository and every other caller stay
/// untouched.
pub struct InstrumentedRepository<R> {
    inner: R,
    slow_threshold: Duration,
    total: AtomicU64,
    slow: AtomicU64,
}

impl<R: Repository> InstrumentedRepository<R> {
    pub fn new(inner: R, slow_threshold: Duration) -> Self {
        Self {
            inner,
            slow_threshold,
            total: AtomicU64::new(0),
            slow: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> QueryStats {
        QueryStats {
            total: self.total.load(Ordering::Relaxed),
            slow: self.slow.load(Ordering::Relaxed),
        }
    }

    async fn timed<T, F>(&self, operation: &'static str, call: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = Instant::now();
        let result = call.await;
        let elapsed = start.elapsed();

        self.total.fetch_add(1, Ordering::Relaxed);
        if elapsed > self.slow_threshold {
            self.slow.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                operation,
                elapsed_ms = elapsed.as_millis() as u64,
                "[DB Query] Slow query detected"
            );
        } else {
            tracing::debug!(operation, elapsed_ms = elapsed.as_millis() as u64, "db query");
        }

        result
    }
}

#[async_trait]
impl<R: Repository> Repository for InstrumentedRepository<R> {
    async fn get_user_by_auth_id(&self, auth_id: &str) -> Result<Option<User>, RepositoryError> {
        self.timed("get_user_by_auth_id", self.inner.get_user_by_auth_id(auth_id))
            .await
    }

    async fn get_course_modules(&self, course_id: Uuid) -> Result<Vec<CourseModule>, RepositoryError> {
        self.timed("get_course_modules", self.inner.get_course_modules(course_id))
            .await
    }

    async fn get_course_slug(&self, course_id: Uuid) -> Result<Option<String>, RepositoryError> {
        self.timed("get_course_slug", self.inner.get_course_slug(course_id))
            .await
    }

    async fn get_learned_module_ids(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        self.timed(
            "get_learned_module_ids",
            self.inner.get_learned_module_ids(user_id, course_id),
        )
        .await
    }

    async fn get_plan_settings(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<PlanSettings>, RepositoryError> {
        self.timed(
            "get_plan_settings",
            self.inner.get_plan_settings(user_id, course_id),
        )
        .await
    }

    async fn get_plan_entries(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<PlanEntry>, RepositoryError> {
        self.timed(
            "get_plan_entries",
            self.inner.get_plan_entries(user_id, course_id),
        )
        .await
    }
}
