/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use teamgrid_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = teamgrid_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use teamgrid_shared::invites::InvitationManager;
use teamgrid_shared::realtime::ConnectionRegistry;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Realtime connection registry
    pub registry: ConnectionRegistry,

    /// Invitation lifecycle manager
    pub invites: InvitationManager,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        let registry = ConnectionRegistry::new();
        let invites = InvitationManager::new(db.clone(), registry.clone(), config.invite_ttl());

        Self {
            db,
            config: Arc::new(config),
            registry,
            invites,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                        # Health check (public)
/// ├── /v1/
/// │   ├── /auth/                     # Authentication
/// │   │   ├── POST /register
/// │   │   ├── POST /login
/// │   │   ├── POST /refresh
/// │   │   ├── POST /logout
/// │   │   └── POST /password         # (authenticated)
/// │   ├── /orgs                      # Authenticated, no tenant header
/// │   │   ├── POST /                 # Create organization
/// │   │   └── GET  /                 # List caller's organizations
/// │   ├── /org/                      # Authenticated + X-Org-Id header
/// │   │   ├── GET    /
/// │   │   ├── DELETE /
/// │   │   ├── GET    /members
/// │   │   ├── PUT    /members/:id
/// │   │   ├── DELETE /members/:id
/// │   │   ├── POST   /invites
/// │   │   ├── GET    /invites
/// │   │   └── POST   /invites/:id/resend
/// │   ├── /projects                  # Authenticated + X-Org-Id header
/// │   │   ├── POST   /
/// │   │   ├── GET    /
/// │   │   ├── GET    /:id
/// │   │   ├── DELETE /:id
/// │   │   ├── GET    /:id/members
/// │   │   └── PUT    /:id/members/:user_id
/// │   ├── /invites/                  # Authenticated, token in body
/// │   │   ├── POST /accept
/// │   │   └── POST /reject
/// │   └── /notifications             # Authenticated
/// │       ├── GET  /
/// │       ├── POST /:id/read
/// │       └── GET  /stream           # SSE
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication and tenant resolution (per-group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public except password change)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout))
        .route(
            "/password",
            post(routes::auth::change_password).layer(axum::middleware::from_fn_with_state(
                state.clone(),
                crate::middleware::auth::require_auth,
            )),
        );

    // Organization bootstrap routes: identity only, no tenant header
    let orgs_routes = Router::new()
        .route("/", post(routes::orgs::create_org))
        .route("/", get(routes::orgs::list_orgs))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::require_auth,
        ));

    // Org-scoped routes: full guard chain (auth + tenant context)
    let org_routes = Router::new()
        .route("/", get(routes::orgs::get_org))
        .route("/", delete(routes::orgs::delete_org))
        .route("/members", get(routes::orgs::list_members))
        .route("/members/:id", put(routes::orgs::update_member_role))
        .route("/members/:id", delete(routes::orgs::deactivate_member))
        .route("/invites", post(routes::invites::send_invite))
        .route("/invites", get(routes::invites::list_pending))
        .route("/invites/:id/resend", post(routes::invites::resend_invite))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::org::require_org_context,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::require_auth,
        ));

    // Project routes: full guard chain, project access resolved per handler
    let project_routes = Router::new()
        .route("/", post(routes::projects::create_project))
        .route("/", get(routes::projects::list_projects))
        .route("/:id", get(routes::projects::get_project))
        .route("/:id", delete(routes::projects::delete_project))
        .route("/:id/members", get(routes::projects::list_project_members))
        .route(
            "/:id/members/:user_id",
            put(routes::projects::upsert_project_member),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::org::require_org_context,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::require_auth,
        ));

    // Invitation resolution: authenticated, addressed by token, no org header
    let invite_routes = Router::new()
        .route("/accept", post(routes::invites::accept_invite))
        .route("/reject", post(routes::invites::reject_invite))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::require_auth,
        ));

    // Notification routes: authenticated, always scoped to the caller
    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/:id/read", post(routes::notifications::mark_read))
        .route("/stream", get(routes::notifications::stream_notifications))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::require_auth,
        ));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/orgs", orgs_routes)
        .nest("/org", org_routes)
        .nest("/projects", project_routes)
        .nest("/invites", invite_routes)
        .nest("/notifications", notification_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-org-id"),
            ])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
