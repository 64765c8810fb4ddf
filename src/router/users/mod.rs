//! Users-related HTTP API.
mod avatar;
mod delete;
mod get;
mod password;
mod update;

use axum::extract::{Request, State};
use axum::http::header;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Router, middleware};

use crate::{AppState, ServerError};

const BEARER: &str = "Bearer ";

/// Custom middleware for authentification.
///
/// Resolves the session token of `Authorization` header into a [`User`]
/// extension.
///
/// [`User`]: crate::user::User
async fn auth(
    State(state): State<AppState>,
    mut req: Request,
    next: middleware::Next,
) -> Result<Response, ServerError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER))
        .ok_or(ServerError::Unauthorized)?;

    let user = state
        .users()
        .from_session(token.trim())
        .await?
        .ok_or(ServerError::Unauthorized)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub fn router(state: AppState) -> Router<AppState> {
    let me = Router::new()
        // `GET /users/@me` goes to `get`, `PATCH` to `update`, `DELETE` to
        // `delete`. Authorization required.
        .route(
            "/",
            get(get::me).patch(update::handler).delete(delete::handler),
        )
        // `POST /users/@me/password` changes password.
        .route("/password", post(password::handler))
        // `PUT /users/@me/avatar` uploads a new avatar.
        .route("/avatar", put(avatar::handler))
        .route_layer(middleware::from_fn_with_state(state, auth));

    Router::new()
        // `GET /users` lists users, most recently joined first.
        .route("/", get(get::list))
        // `GET /users/{username}` goes to `get`.
        .route("/{username}", get(get::handler))
        .nest("/@me", me)
}
