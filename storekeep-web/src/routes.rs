use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::http::header::CONTENT_SECURITY_POLICY;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use storekeep::{
    AdminError, ManagerDirectory, NewManager, ProductId, StoreAdmin, StoreId, StoreProposal,
    StoreRepository, ValidationError,
};
use tracing::{info, instrument};
use url::form_urlencoded;

use crate::error::PageError;
use crate::views::{self, ManagerFormValues, StoreFormValues};

/// Policy attached to every response.
pub const CONTENT_SECURITY_POLICY_VALUE: &str =
    "default-src 'self'; style-src 'self' 'unsafe-inline'; script-src 'self' 'unsafe-inline'";

/// Shared handler state: the admin facade built at startup.
pub struct AppState<R, D> {
    admin: Arc<StoreAdmin<R, D>>,
}

impl<R, D> AppState<R, D> {
    /// Share `admin` across handlers.
    pub fn new(admin: StoreAdmin<R, D>) -> Self {
        Self {
            admin: Arc::new(admin),
        }
    }
}

// Manual impl: cloning the Arc must not require R: Clone or D: Clone.
impl<R, D> Clone for AppState<R, D> {
    fn clone(&self) -> Self {
        Self {
            admin: Arc::clone(&self.admin),
        }
    }
}

/// Query of a form page reached through a rejection redirect.
#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    error: Option<String>,
}

/// Query of the add-store page. A rejected submission comes back with its
/// message and the values that were entered.
#[derive(Debug, Deserialize)]
pub struct AddStoreQuery {
    error: Option<String>,
    #[serde(default)]
    location: String,
    #[serde(default)]
    mgrid: String,
}

/// Body of the add-store and edit-store forms.
#[derive(Debug, Deserialize)]
pub struct StoreForm {
    #[serde(default)]
    location: String,
    #[serde(default)]
    mgrid: String,
}

/// Body of the add-manager form.
#[derive(Debug, Deserialize)]
pub struct ManagerForm {
    #[serde(rename = "managerId", default)]
    manager_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    salary: String,
}

/// Attach [`CONTENT_SECURITY_POLICY_VALUE`] to the response.
pub async fn content_security_policy(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
    );
    response
}

/// Redirect back to a form, carrying `message` in the `error` query parameter
/// followed by any `fields` to refill the form with.
fn redirect_with_error(path: &str, message: &str, fields: &[(&str, &str)]) -> Redirect {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("error", message);
    for (name, value) in fields {
        query.append_pair(name, value);
    }
    Redirect::to(&format!("{path}?{}", query.finish()))
}

/// `GET /`
pub async fn home() -> Html<String> {
    Html(views::home())
}

/// `GET /stores`
pub async fn list_stores<R, D>(
    State(state): State<AppState<R, D>>,
) -> Result<Html<String>, PageError>
where
    R: StoreRepository + Send + Sync + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    let stores = state.admin.stores().await.map_err(into_page_error)?;
    Ok(Html(views::stores(&stores)))
}

/// `GET /stores/add`
pub async fn add_store_form(Query(query): Query<AddStoreQuery>) -> Html<String> {
    let values = StoreFormValues {
        location: &query.location,
        manager_id: &query.mgrid,
    };
    Html(views::add_store(&values, query.error.as_deref()))
}

/// `POST /stores/add`: insert after the manager checks, or send the form
/// back with the reason and the entered values.
#[instrument(name = "web.add_store", skip(state, form))]
pub async fn add_store<R, D>(
    State(state): State<AppState<R, D>>,
    Form(form): Form<StoreForm>,
) -> Result<Redirect, PageError>
where
    R: StoreRepository + Send + Sync + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    let outcome = match StoreProposal::parse(&form.location, &form.mgrid) {
        Ok(proposal) => state.admin.add_store(&proposal).await.map(|_| ()),
        Err(invalid) => Err(invalid.into()),
    };

    match outcome {
        Ok(()) => Ok(Redirect::to("/stores")),
        Err(AdminError::Validation(rejection)) => Ok(redirect_with_error(
            "/stores/add",
            &views::validation_message(&rejection),
            &[("location", form.location.as_str()), ("mgrid", form.mgrid.as_str())],
        )),
        Err(AdminError::Query(query_error)) => Err(query_error.into()),
    }
}

/// `GET /stores/edit/{sid}`
pub async fn edit_store_form<R, D>(
    State(state): State<AppState<R, D>>,
    Path(store_id): Path<i32>,
    Query(query): Query<ErrorQuery>,
) -> Result<Html<String>, PageError>
where
    R: StoreRepository + Send + Sync + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    let store_id = StoreId::new(store_id);
    let store = state
        .admin
        .store(store_id)
        .await
        .map_err(into_page_error)?
        .ok_or_else(|| PageError::NotFound(format!("Store {store_id}")))?;

    Ok(Html(views::edit_store(&store, query.error.as_deref())))
}

/// `POST /stores/edit/{sid}`: update after the manager checks, or redirect
/// back to the edit page with the reason.
#[instrument(name = "web.edit_store", skip(state, form))]
pub async fn edit_store<R, D>(
    State(state): State<AppState<R, D>>,
    Path(store_id): Path<i32>,
    Form(form): Form<StoreForm>,
) -> Result<Redirect, PageError>
where
    R: StoreRepository + Send + Sync + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    let store_id = StoreId::new(store_id);
    let outcome = match StoreProposal::parse(&form.location, &form.mgrid) {
        Ok(proposal) => state.admin.edit_store(store_id, &proposal).await,
        Err(invalid) => Err(invalid.into()),
    };

    match outcome {
        Ok(()) => Ok(Redirect::to("/stores")),
        Err(AdminError::Validation(rejection)) => Ok(redirect_with_error(
            &views::edit_store_path(store_id),
            &views::validation_message(&rejection),
            &[],
        )),
        Err(AdminError::Query(query_error)) => Err(query_error.into()),
    }
}

/// `GET /products`
pub async fn list_products<R, D>(
    State(state): State<AppState<R, D>>,
) -> Result<Html<String>, PageError>
where
    R: StoreRepository + Send + Sync + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    let listings = state.admin.products().await.map_err(into_page_error)?;
    Ok(Html(views::products(&listings, None)))
}

/// `POST /products/delete/{pid}`: a product still sold somewhere re-renders
/// the listing with 409.
#[instrument(name = "web.delete_product", skip(state))]
pub async fn delete_product<R, D>(
    State(state): State<AppState<R, D>>,
    Path(product_id): Path<String>,
) -> Result<Response, PageError>
where
    R: StoreRepository + Send + Sync + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    let product_id = ProductId::try_new(product_id.as_str())
        .map_err(|_| PageError::NotFound(format!("Product '{product_id}'")))?;

    match state.admin.delete_product(&product_id).await {
        Ok(()) => {
            info!(product_id = %product_id, "[web.product_deleted] redirecting to listing");
            Ok(Redirect::to("/products").into_response())
        }
        Err(AdminError::Validation(rejection)) => {
            let listings = state.admin.products().await.map_err(into_page_error)?;
            let page = views::products(&listings, Some(&views::validation_message(&rejection)));
            Ok((StatusCode::CONFLICT, Html(page)).into_response())
        }
        Err(AdminError::Query(query_error)) => Err(query_error.into()),
    }
}

/// `GET /managers`
pub async fn list_managers<R, D>(
    State(state): State<AppState<R, D>>,
) -> Result<Html<String>, PageError>
where
    R: StoreRepository + Send + Sync + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    let managers = state.admin.managers().await.map_err(into_page_error)?;
    Ok(Html(views::managers(&managers)))
}

/// `GET /managers/add`
pub async fn add_manager_form() -> Html<String> {
    Html(views::add_manager(&ManagerFormValues::default(), None))
}

/// `POST /managers/add`: a rejected manager re-renders the form with 422.
#[instrument(name = "web.add_manager", skip(state, form))]
pub async fn add_manager<R, D>(
    State(state): State<AppState<R, D>>,
    Form(form): Form<ManagerForm>,
) -> Result<Response, PageError>
where
    R: StoreRepository + Send + Sync + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    let outcome = match NewManager::parse(&form.manager_id, &form.name, &form.salary) {
        Ok(manager) => state.admin.add_manager(&manager).await,
        Err(invalid) => Err(invalid.into()),
    };

    match outcome {
        Ok(()) => Ok(Redirect::to("/managers").into_response()),
        Err(AdminError::Validation(rejection)) => {
            let values = ManagerFormValues {
                manager_id: &form.manager_id,
                name: &form.name,
                salary: &form.salary,
            };
            let page = views::add_manager(&values, Some(&views::validation_message(&rejection)));
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        Err(AdminError::Query(query_error)) => Err(query_error.into()),
    }
}

/// Listing and lookup paths have no validation outcome; a rejection there
/// means the record is gone.
fn into_page_error(error: AdminError) -> PageError {
    match error {
        AdminError::Query(query_error) => PageError::Query(query_error),
        AdminError::Validation(rejection) => match rejection {
            ValidationError::StoreNotFound(store_id) => {
                PageError::NotFound(format!("Store {store_id}"))
            }
            other => PageError::NotFound(views::validation_message(&other)),
        },
    }
}
