use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde::Deserialize;

use crate::{
    model::{
        CrudRepository, DatabaseError, Page, PaginatableRepository, Permission, ResourceTyped,
        entity::{Category, CategoryCreate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, ValidJson, WebError, WebResult,
        dto::{Pagination, categories::CategoryBody},
        error::ErrorResponse,
        middlewares,
    },
};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/add", post(category_add_handler))
        .route("/edit/{name}", put(category_edit_handler))
        .route("/delete/{name}", delete(category_delete_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/list", get(category_list_handler))
        .merge(protected)
        .with_state(state)
}

fn fetch_err(e: DatabaseError) -> WebError {
    WebError::resource_fetch_error(Category::get_resource_type(), e)
}

fn write_err(e: DatabaseError) -> WebError {
    WebError::resource_write_error(Category::get_resource_type(), e)
}

async fn find_category(state: &AppState, actor: &AuthenticatedUser, name: &str) -> WebResult<Category> {
    Category::find_by_name(state.pool(), actor, name)
        .await
        .map_err(fetch_err)?
        .ok_or_else(|| WebError::resource_not_found(Category::get_resource_type()))
}

#[utoipa::path(
    get,
    path = "/api/categories/list",
    params(CategoryListQuery),
    responses(
        (status = 200, description = "Requested page", body = Page<Category>),
        (status = 400, description = "Malformed pagination", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "categories"
)]
async fn category_list_handler(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> WebResult<impl IntoResponse> {
    let page = Pagination::parse(query.limit.as_deref(), query.offset.as_deref())
        .map_err(WebError::bad_request)?;

    let categories = Category::page(state.pool(), &AuthenticatedUser::admin(), page.limit, page.offset)
        .await
        .map_err(fetch_err)?;

    Ok((StatusCode::OK, Json(categories)))
}

#[utoipa::path(
    post,
    path = "/api/categories/add",
    request_body = CategoryBody,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Validation failed or name taken", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Missing `add_category` permission", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "categories",
    security(
        ("bearer" = [])
    )
)]
async fn category_add_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CategoryBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::AddCategory, Category::get_resource_type())?;

    let data = CategoryCreate::from(payload);
    if Category::find_by_name(state.pool(), user, &data.name)
        .await
        .map_err(fetch_err)?
        .is_some()
    {
        return Err(WebError::resource_already_exists(Category::get_resource_type()));
    }

    let created = Category::create(state.pool(), user, data)
        .await
        .map_err(write_err)?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/categories/edit/{name}",
    request_body = CategoryBody,
    params(("name" = String, Path, description = "Current category name")),
    responses(
        (status = 200, description = "Category renamed", body = Category),
        (status = 400, description = "Validation failed or name taken", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Missing `edit_category` permission", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "categories",
    security(
        ("bearer" = [])
    )
)]
async fn category_edit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(name): Path<String>,
    ValidJson(payload): ValidJson<CategoryBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::EditCategory, Category::get_resource_type())?;

    let found = find_category(&state, user, &name).await?;
    let data = CategoryCreate::from(payload);
    if let Some(other) = Category::find_by_name(state.pool(), user, &data.name)
        .await
        .map_err(fetch_err)?
    {
        if other.id() != found.id() {
            return Err(WebError::resource_already_exists(Category::get_resource_type()));
        }
    }

    let updated = found.update(state.pool(), user, data).await.map_err(write_err)?;
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/categories/delete/{name}",
    params(("name" = String, Path, description = "Category name")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Missing `delete_category` permission", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "categories",
    security(
        ("bearer" = [])
    )
)]
async fn category_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require(Permission::DeleteCategory, Category::get_resource_type())?;

    let found = find_category(&state, user, &name).await?;
    found.delete(state.pool(), user).await.map_err(write_err)?;

    Ok(StatusCode::NO_CONTENT)
}
