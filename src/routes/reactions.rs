use axum::extract::State;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::domain::ReactionKind;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, JsonBody, PathParams};
use crate::ledger::reactions::{self, ReactionState, ReactionTarget};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReactionRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/matches/{id}/reactions", post(react_to_match))
        .route("/matches/{id}/reactions/{kind}", delete(unreact_match))
        .route("/posts/{id}/reactions", post(react_to_post))
        .route("/posts/{id}/reactions/{kind}", delete(unreact_post))
        .route("/comments/{id}/reactions", post(react_to_comment))
        .route("/comments/{id}/reactions/{kind}", delete(unreact_comment))
}

fn add(
    state: &AppState,
    user: &CurrentUser,
    target: ReactionTarget,
    kind: &str,
) -> AppResult<Json<ReactionState>> {
    let kind: ReactionKind = kind.trim().parse()?;
    let mut conn = state.db.get()?;
    Ok(Json(reactions::add_reaction(&mut conn, user.id, target, kind)?))
}

fn remove(
    state: &AppState,
    user: &CurrentUser,
    target: ReactionTarget,
    kind: &str,
) -> AppResult<Json<ReactionState>> {
    let kind: ReactionKind = kind.trim().parse()?;
    let mut conn = state.db.get()?;
    Ok(Json(reactions::remove_reaction(&mut conn, user.id, target, kind)?))
}

async fn react_to_match(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
    JsonBody(req): JsonBody<ReactionRequest>,
) -> AppResult<Json<ReactionState>> {
    add(&state, &user, ReactionTarget::Match(id), &req.kind)
}

async fn unreact_match(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((id, kind)): PathParams<(i64, String)>,
) -> AppResult<Json<ReactionState>> {
    remove(&state, &user, ReactionTarget::Match(id), &kind)
}

async fn react_to_post(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
    JsonBody(req): JsonBody<ReactionRequest>,
) -> AppResult<Json<ReactionState>> {
    add(&state, &user, ReactionTarget::Post(id), &req.kind)
}

async fn unreact_post(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((id, kind)): PathParams<(i64, String)>,
) -> AppResult<Json<ReactionState>> {
    remove(&state, &user, ReactionTarget::Post(id), &kind)
}

async fn react_to_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
    JsonBody(req): JsonBody<ReactionRequest>,
) -> AppResult<Json<ReactionState>> {
    add(&state, &user, ReactionTarget::Comment(id), &req.kind)
}

async fn unreact_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams((id, kind)): PathParams<(i64, String)>,
) -> AppResult<Json<ReactionState>> {
    remove(&state, &user, ReactionTarget::Comment(id), &kind)
}
