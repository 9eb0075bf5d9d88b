use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{
    auth::{self, TokenKind},
    model::{
        CrudRepository, ResourceTyped,
        entity::{Session, UserEntity},
    },
    web::{AppState, RequestContext, context::AuthenticatedUser, error::WebError},
};

pub static AUTH_HEADER_SCHEME: &str = "Bearer";

/// Resolves the `Authorization: Bearer <access>` header into a [`RequestContext`].
///
/// Requests without the header continue anonymously. A header that is present
/// but does not resolve to a live session of an active user is rejected with 401.
pub async fn extract_context_fn(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let header = match req.headers().get(AUTHORIZATION) {
        Some(header) => header,
        None => {
            req.extensions_mut().insert(RequestContext::new(None));
            return Ok(next.run(req).await);
        }
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(AUTH_HEADER_SCHEME))
        .and_then(|rest| rest.strip_prefix(' '))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(WebError::auth_required)?;

    let user = authenticate(&state, token).await?;
    req.extensions_mut()
        .insert(RequestContext::new(Some(user)));

    Ok(next.run(req).await)
}

async fn authenticate(state: &AppState, token: &str) -> Result<AuthenticatedUser, WebError> {
    let claims = auth::process_token(token, state.config().app().jwt())
        .map_err(WebError::auth_token_invalid)?
        .claims;

    if claims.kind != TokenKind::Access {
        return Err(WebError::auth_token_wrong_kind());
    }

    let (user_id, session_id) = match (claims.user_id(), claims.session_id()) {
        (Some(user_id), Some(session_id)) => (user_id, session_id),
        _ => return Err(WebError::auth_required()),
    };

    let system = AuthenticatedUser::admin();
    let session = Session::find_by_id(state.pool(), &system, session_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Session::get_resource_type(), e))?;

    match session {
        Some(session) if session.user_id() == user_id && session.is_live(chrono::Utc::now()) => {}
        _ => return Err(WebError::auth_session_revoked()),
    }

    let user = UserEntity::find_by_id(state.pool(), &system, user_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(WebError::auth_invalid_credentials)?;

    if !user.is_active() {
        return Err(WebError::auth_account_inactive());
    }

    Ok(AuthenticatedUser::new(user_id, user.role(), session_id))
}
