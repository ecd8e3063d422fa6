pub mod auth;
pub mod comments;
pub mod credits;
pub mod dashboard;
pub mod friends;
pub mod matches;
pub mod posts;
pub mod reactions;

use axum::Router;

use crate::state::AppState;

/// Every API route, without layers or state attached.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(friends::router())
        .merge(matches::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(reactions::router())
        .merge(credits::router())
        .merge(dashboard::router())
}
