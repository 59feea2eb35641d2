//! Storekeep web layer
//!
//! Server-rendered administration pages over [`StoreAdmin`]. The router holds
//! no business rules: it parses forms, calls the facade, and turns each
//! [`AdminError`](storekeep::AdminError) into a redirect, a re-rendered form,
//! or an error page.
//!
//! # Example
//!
//! ```ignore
//! let admin = StoreAdmin::new(postgres_repository, mongo_directory);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, storekeep_web::app(admin)).await?;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod views;

use axum::routing::get;
use axum::Router;
use storekeep::{ManagerDirectory, StoreAdmin, StoreRepository};

pub use config::{AppConfig, ConfigError, LogFormat};
pub use routes::AppState;

/// Build the application router.
pub fn app<R, D>(admin: StoreAdmin<R, D>) -> Router
where
    R: StoreRepository + Send + Sync + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(routes::home))
        .route("/stores", get(routes::list_stores::<R, D>))
        .route(
            "/stores/add",
            get(routes::add_store_form).post(routes::add_store::<R, D>),
        )
        .route(
            "/stores/edit/{sid}",
            get(routes::edit_store_form::<R, D>).post(routes::edit_store::<R, D>),
        )
        .route("/products", get(routes::list_products::<R, D>))
        .route(
            "/products/delete/{pid}",
            get(routes::delete_product::<R, D>),
        )
        .route("/managers", get(routes::list_managers::<R, D>))
        .route(
            "/managers/add",
            get(routes::add_manager_form).post(routes::add_manager::<R, D>),
        )
        .layer(axum::middleware::from_fn(routes::content_security_policy))
        .with_state(AppState::new(admin))
}
