use std::path::Path;

use crate::auth::hash_password;
use crate::model::entity::{Session, UserEntity, UserEntityCreate};
use crate::model::{CrudRepository, DbConnection, ModelManager};
use crate::utils::signal::shutdown_signal;
use crate::web::{AuthenticatedUser, UserRole};
use crate::{error::AppResult, web::AppState};
use axum::Router;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod error;
pub mod model;
pub mod utils;
pub mod web;

pub static APPLICATION_NAME: &str = "coursehub";

pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = config::Config::get_or_init(use_local).await;
    let db = DbConnection::connect(config.app().database_uri())?;

    let migrator = Migrator::new(Path::new("./migrations"))
        .await
        .map_err(model::DatabaseError::from)?;
    tracing::debug!("applying migrations...");
    migrator
        .run(db.pool())
        .await
        .map_err(model::DatabaseError::from)?;

    bootstrap(ModelManager::new(db), config).await
}

pub async fn build_server_with_pool(db: DbConnection) -> AppResult<(AppState, Router)> {
    let config = config::Config::get_or_init(true).await;
    bootstrap(ModelManager::new(db), config).await
}

async fn bootstrap(mm: ModelManager, config: &'static Config) -> AppResult<(AppState, Router)> {
    ensure_admin(&mm, config).await?;

    let removed = Session::cleanup_expired(&mm, &AuthenticatedUser::admin()).await?;
    tracing::debug!(removed, "expired sessions removed");

    let state = AppState::new(mm, config);
    let app = web::routes::build_app(state.clone(), config);
    Ok((state, app))
}

/// Creates the `[admin]` account from the config when no user holds its username yet.
#[tracing::instrument(skip_all)]
pub async fn ensure_admin(mm: &ModelManager, config: &Config) -> AppResult<()> {
    let Some(admin) = config.admin() else {
        return Ok(());
    };

    let system = AuthenticatedUser::admin();
    if UserEntity::find_by_username(mm, &system, admin.username())
        .await?
        .is_some()
    {
        return Ok(());
    }

    let created = UserEntity::create(
        mm,
        &system,
        UserEntityCreate {
            username: admin.username().to_string(),
            email: auth::validate::normalize_email(admin.email()),
            password_hash: hash_password(admin.password())?,
            first_name: String::new(),
            last_name: String::new(),
            role: UserRole::Admin,
            address: None,
            phone_no: None,
            profile_picture: None,
        },
    )
    .await?;

    tracing::info!(user_id = %created.id(), username = created.username(), "admin account created");
    Ok(())
}

#[tracing::instrument]
pub async fn setup_workers() -> AppResult<()> {
    let (state, app) = build_server().await?;
    let bindto = state.config().host().bindto();
    let listener = TcpListener::bind(bindto).await?;

    tracing::info!("{APPLICATION_NAME} is starting at: {bindto}");
    let axum_handle = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    axum_handle.await?;
    Ok(())
}

fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    setup_workers().await?;
    Ok(())
}
