use crate::{
    Config,
    web::{AppState, doc::ApiDoc},
};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod categories;
pub mod courses;
pub mod enrollments;
pub mod ratings;
pub mod users;

pub fn build_app<S: Send + Sync + Clone + 'static>(
    state: AppState,
    config: &'static Config,
) -> Router<S> {
    let mut router = Router::new()
        .nest(
            "/api/auth",
            auth::routes(state.clone()).merge(users::routes(state.clone())),
        )
        .nest("/api/courses", courses::routes(state.clone()))
        .nest("/api/categories", categories::routes(state.clone()))
        .nest("/api/ratings", ratings::routes(state.clone()))
        .nest("/api/enrollment", enrollments::routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    if config.app().docs() {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}
