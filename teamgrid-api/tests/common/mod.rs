/// Common test utilities for integration tests
///
/// Shared infrastructure for integration tests:
/// - Test database setup
/// - Test user creation and token minting
/// - Organization bootstrap helpers
/// - Request builder helpers
///
/// These tests need a reachable PostgreSQL (DATABASE_URL) and are marked
/// `#[ignore]`; run them with `cargo test -- --ignored`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use teamgrid_api::app::{build_router, AppState};
use teamgrid_api::config::Config;
use teamgrid_shared::auth::jwt::{create_token, Claims};
use teamgrid_shared::auth::password;
use teamgrid_shared::models::org_membership::{OrgMembership, OrgRole};
use teamgrid_shared::models::organization::Organization;
use teamgrid_shared::models::user::{CreateUser, User};
use tower::Service as _;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "Test-Passw0rd!";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Creates a new test context against the configured database
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Run migrations (path relative to Cargo.toml, not this file)
        sqlx::migrate!("../migrations").run(&db).await?;

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext { db, app, config })
    }

    /// Creates a user with a real password hash and mints an access token
    pub async fn create_user(&self, label: &str) -> anyhow::Result<(User, String)> {
        let email = format!("{}-{}@example.com", label, Uuid::new_v4());
        let hash = password::hash_password(TEST_PASSWORD)?;

        let user = User::create(
            &self.db,
            CreateUser {
                email: Some(email.clone()),
                username: None,
                phone: None,
                password_hash: Some(hash),
                name: Some(format!("Test {}", label)),
            },
        )
        .await?;

        let claims = Claims::new(user.id, &email, user.token_version, self.config.access_ttl());
        let token = create_token(&claims, &self.config.jwt.secret)?;

        Ok((user, token))
    }

    /// Creates an organization with the given user as active OWNER
    pub async fn create_org(&self, owner: &User) -> anyhow::Result<Organization> {
        let org =
            Organization::create(&self.db, &format!("Test Org {}", Uuid::new_v4())).await?;

        let email = owner.email.clone().expect("test users have emails");
        OrgMembership::create_active(&self.db, org.id, owner.id, &email, OrgRole::Owner).await?;

        Ok(org)
    }

    /// Adds a user to an organization as an active member with a role
    pub async fn add_member(
        &self,
        org: &Organization,
        user: &User,
        role: OrgRole,
    ) -> anyhow::Result<OrgMembership> {
        let email = user.email.clone().expect("test users have emails");
        let membership =
            OrgMembership::create_active(&self.db, org.id, user.id, &email, role).await?;
        Ok(membership)
    }

    /// Sends a request through the router and returns (status, parsed body)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, body)
    }
}

/// Builds a JSON request with optional bearer token and org header
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    org_id: Option<Uuid>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    if let Some(org_id) = org_id {
        builder = builder.header("x-org-id", org_id.to_string());
    }

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
