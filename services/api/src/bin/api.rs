//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, ImageApiAdapter, OpenAiCompanionAdapter, OpenAiGuidanceAdapter,
        OpenAiInsightAdapter, OpenAiMoodAdapter, OpenAiTitleAdapter,
    },
    cache::DailyCache,
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler, update_account_handler},
        delete_session_handler,
        guidance::{
            artwork_handler, breakdown_handler, home_handler, reframe_handler, tip_handler,
        },
        insights::{insight_progress_handler, list_insights_handler},
        list_sessions_handler,
        moods::{list_moods_handler, log_mood_handler},
        require_auth,
        rest::ApiDoc,
        session_messages_handler,
        state::AppState,
        ws_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            config.log_level.to_string(),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    // A missing completion-service credential is fatal at startup.
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key.clone())
        .with_api_base(config.openai_base_url.clone());
    let openai_client = Client::with_config(openai_config);

    let companion = Arc::new(OpenAiCompanionAdapter::new(
        openai_client.clone(),
        config.chat_model.clone(),
    ));
    let title_adapter = Arc::new(OpenAiTitleAdapter::new(
        openai_client.clone(),
        config.title_model.clone(),
    ));
    let mood_adapter = Arc::new(OpenAiMoodAdapter::new(
        openai_client.clone(),
        config.mood_model.clone(),
    ));
    let insight_adapter = Arc::new(OpenAiInsightAdapter::new(
        openai_client.clone(),
        config.insight_model.clone(),
    ));
    let guidance_adapter = Arc::new(OpenAiGuidanceAdapter::new(
        openai_client.clone(),
        config.guidance_model.clone(),
    ));
    let image_adapter = Arc::new(ImageApiAdapter::new(
        config.openai_base_url.clone(),
        api_key,
        config.image_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        companion,
        title_adapter,
        mood_adapter,
        insight_adapter,
        guidance_adapter,
        image_adapter,
        home_cache: Arc::new(DailyCache::new()),
        tip_cache: Arc::new(DailyCache::new()),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/account", put(update_account_handler))
        .route("/ws", get(ws_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/sessions/{id}", delete(delete_session_handler))
        .route("/sessions/{id}/messages", get(session_messages_handler))
        .route("/moods", get(list_moods_handler).post(log_mood_handler))
        .route("/insights", get(list_insights_handler))
        .route("/insights/progress", get(insight_progress_handler))
        .route("/home", get(home_handler))
        .route("/tip", get(tip_handler))
        .route("/tools/breakdown", post(breakdown_handler))
        .route("/tools/reframe", post(reframe_handler))
        .route("/artwork", post(artwork_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
