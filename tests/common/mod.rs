#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Json, Router,
    http::{HeaderMap, Method, Uri},
};
use dojo_portal::{
    AppState,
    auth::issue_token,
    config::AppConfig,
    error::RepositoryError,
    models::{CourseModule, PlanEntry, PlanSettings, User},
    proxy,
    repository::{Repository, RepositoryState},
};
use serde_json::{Value, json};
use std::{collections::HashMap, sync::Arc};
use tokio::net::TcpListener;
use uuid::Uuid;

// --- MOCK REPOSITORY ---

// Canned identity store and enrollment rows. `progress_down` makes every
// course/progress/plan read fail while identity lookups keep working.
#[derive(Default)]
pub struct MockRepo {
    // Keyed by Supabase auth id.
    pub users: HashMap<String, User>,
    pub identity_down: bool,
    pub progress_down: bool,
    pub modules: Vec<CourseModule>,
    pub slugs: HashMap<Uuid, String>,
    pub learned: Vec<Uuid>,
    pub settings: Option<PlanSettings>,
    pub entries: Vec<PlanEntry>,
}

impl MockRepo {
    /// User whose auth id is the string form of its platform id.
    pub fn with_user(self, id: Uuid, role: &str) -> Self {
        self.with_linked_user(&id.to_string(), id, role)
    }

    pub fn with_linked_user(mut self, auth_id: &str, id: Uuid, role: &str) -> Self {
        self.users.insert(
            auth_id.to_string(),
            User {
                id,
                email: format!("{}@dojo.test", role.to_lowercase()),
                role: role.to_string(),
            },
        );
        self
    }

    fn progress(&self) -> Result<(), RepositoryError> {
        if self.progress_down {
            Err(RepositoryError::Unavailable("progress store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_user_by_auth_id(&self, auth_id: &str) -> Result<Option<User>, RepositoryError> {
        if self.identity_down {
            return Err(RepositoryError::Unavailable("identity store offline".to_string()));
        }
        Ok(self.users.get(auth_id).cloned())
    }
    async fn get_course_modules(&self, _course_id: Uuid) -> Result<Vec<CourseModule>, RepositoryError> {
        self.progress()?;
        Ok(self.modules.clone())
    }
    async fn get_course_slug(&self, course_id: Uuid) -> Result<Option<String>, RepositoryError> {
        self.progress()?;
        Ok(self.slugs.get(&course_id).cloned())
    }
    async fn get_learned_module_ids(
        &self,
        _user_id: Uuid,
        _course_id: Uuid,
    ) -> Result<Vec<Uuid>, RepositoryError> {
        self.progress()?;
        Ok(self.learned.clone())
    }
    async fn get_plan_settings(
        &self,
        _user_id: Uuid,
        _course_id: Uuid,
    ) -> Result<Option<PlanSettings>, RepositoryError> {
        self.progress()?;
        Ok(self.settings.clone())
    }
    async fn get_plan_entries(
        &self,
        _user_id: Uuid,
        _course_id: Uuid,
    ) -> Result<Vec<PlanEntry>, RepositoryError> {
        self.progress()?;
        Ok(self.entries.clone())
    }
}

// --- Fixtures ---

pub const STUDENT_ID: Uuid = Uuid::from_u128(0x5700);
pub const INSTRUCTOR_ID: Uuid = Uuid::from_u128(0x1257);
pub const ADMIN_ID: Uuid = Uuid::from_u128(0xad31);
pub const GUEST_ID: Uuid = Uuid::from_u128(0x6e57);

pub fn populated_repo() -> MockRepo {
    MockRepo::default()
        .with_user(STUDENT_ID, "STUDENT")
        .with_user(INSTRUCTOR_ID, "INSTRUCTOR")
        .with_user(ADMIN_ID, "ADMIN")
        .with_user(GUEST_ID, "GUEST")
}

pub fn module(n: u128, title: &str) -> CourseModule {
    CourseModule {
        id: Uuid::from_u128(n),
        title: title.to_string(),
        order: n as i32,
    }
}

pub fn state_with(repo: MockRepo, config: AppConfig) -> AppState {
    AppState {
        repo: Arc::new(repo) as RepositoryState,
        config,
        http: proxy::renderer_client().unwrap(),
    }
}

pub fn test_state(repo: MockRepo) -> AppState {
    state_with(repo, AppConfig::default())
}

/// Session token for `user_id` (registered through `with_user`) expiring in `ttl_secs`.
pub fn token_for(user_id: Uuid, config: &AppConfig, ttl_secs: u64) -> String {
    issue_token(
        &user_id.to_string(),
        &config.jwt_audience,
        &config.jwt_secret,
        ttl_secs,
    )
    .unwrap()
}

/// `Cookie` header value carrying a fresh session token for `user_id`.
pub fn session_cookie_for(user_id: Uuid, config: &AppConfig) -> String {
    let token = token_for(user_id, config, config.session_ttl_secs);
    format!("{}={token}", config.session_cookie)
}

// --- Fake renderer ---

/// Starts a renderer stand-in on an ephemeral port. Every request is answered
/// with a JSON echo of its method, path and headers, plus a marker header.
pub async fn spawn_renderer() -> String {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> ([(&'static str, &'static str); 1], Json<Value>) {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_string()))
            .collect();
        (
            [("x-rendered-by", "fake-renderer")],
            Json(json!({
                "method": method.as_str(),
                "uri": uri.to_string(),
                "headers": headers,
            })),
        )
    }

    let app = Router::new().fallback(echo);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}
