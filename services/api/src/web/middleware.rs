//! services/api/src/web/middleware.rs
//!
//! Authentication middleware. Both layers resolve the `session` cookie to an
//! `Identity` and insert it into the request extensions for handlers to use.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use festival_planner_core::domain::Identity;
use std::sync::Arc;
use tracing::{debug, error};

use crate::web::{auth::session_cookie, state::AppState};

async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    let auth_session_id = session_cookie(headers)?;
    match state.accounts.validate_auth_session(auth_session_id).await {
        Ok(user_id) => Some(Identity { id: user_id }),
        Err(e) => {
            debug!("Ignoring invalid auth session: {:?}", e);
            None
        }
    }
}

/// Attaches the identity when the request carries a live session. Guests pass through.
pub async fn attach_identity(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(identity) = resolve_identity(&state, req.headers()).await {
        req.extensions_mut().insert(identity);
    }
    next.run(req).await
}

/// Rejects requests without a live session with 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let identity = resolve_identity(&state, req.headers()).await.ok_or_else(|| {
        error!("Rejected request to {} without a valid session", req.uri().path());
        StatusCode::UNAUTHORIZED
    })?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
