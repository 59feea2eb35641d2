use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use storekeep::QueryError;
use thiserror::Error;
use tracing::error;

use crate::views;

/// Failures that end a request with an error page instead of the page asked
/// for.
#[derive(Debug, Error)]
pub enum PageError {
    /// A datastore call failed. Details stay in the log.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The addressed record does not exist.
    #[error("{0} not found")]
    NotFound(String),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            Self::Query(query_error) => {
                error!(
                    error = %query_error,
                    "[web.query_failed] rendering generic error page"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(views::server_error()),
                )
                    .into_response()
            }
            Self::NotFound(what) => {
                (StatusCode::NOT_FOUND, Html(views::not_found(&what))).into_response()
            }
        }
    }
}
