use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::content::matches::{self, NewMatch};
use crate::content::venues::{self, NewVenue};
use crate::db::models::{Invitation, Match, Venue};
use crate::domain::{MatchStatus, Team};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, JsonBody, PathParams, QueryParams};
use crate::state::AppState;

// --- Requests ---

#[derive(Deserialize)]
pub struct ListMatchesQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ListVenuesQuery {
    #[serde(default)]
    pub mine: bool,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub team: String,
    pub position: String,
}

#[derive(Deserialize)]
pub struct InviteRequest {
    pub friend_id: i64,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/venues", get(list_venues).post(create_venue))
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/status", post(update_status))
        .route(
            "/matches/{id}/participation",
            post(join_team).delete(cancel_participation),
        )
        .route("/matches/{id}/invitations", post(invite_friend))
        .route("/invitations", get(list_invitations))
}

// --- Handlers ---

async fn list_venues(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<ListVenuesQuery>,
) -> AppResult<Json<Vec<Venue>>> {
    let conn = state.db.get()?;
    let owner = query.mine.then_some(user.id);
    Ok(Json(venues::list_venues(&conn, owner)?))
}

async fn create_venue(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<NewVenue>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let venue = venues::create_venue(&conn, &user, &req)?;
    Ok((StatusCode::CREATED, Json(venue)).into_response())
}

async fn list_matches(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<ListMatchesQuery>,
) -> AppResult<Json<Vec<Match>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<MatchStatus>)
        .transpose()?;

    let conn = state.db.get()?;
    Ok(Json(matches::list_matches(&conn, status, Some(user.id))?))
}

async fn create_match(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(req): JsonBody<NewMatch>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let created = matches::create_match(&conn, &user, &req)?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn get_match(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<Match>> {
    let conn = state.db.get()?;
    Ok(Json(matches::get_match(&conn, id, Some(user.id))?))
}

async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
    JsonBody(req): JsonBody<StatusRequest>,
) -> AppResult<Json<Match>> {
    let next: MatchStatus = req.status.trim().parse()?;
    let mut conn = state.db.get()?;
    Ok(Json(matches::update_status(&mut conn, &user, id, next)?))
}

async fn join_team(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
    JsonBody(req): JsonBody<JoinRequest>,
) -> AppResult<Json<Match>> {
    let team: Team = req.team.trim().parse()?;
    let mut conn = state.db.get()?;
    Ok(Json(matches::join_team(
        &mut conn,
        &user,
        id,
        team,
        &req.position,
    )?))
}

async fn cancel_participation(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<Match>> {
    let mut conn = state.db.get()?;
    Ok(Json(matches::cancel_participation(&mut conn, &user, id)?))
}

async fn invite_friend(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<i64>,
    JsonBody(req): JsonBody<InviteRequest>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let invitation = matches::invite_friend(&mut conn, &user, id, req.friend_id)?;
    Ok((StatusCode::CREATED, Json(invitation)).into_response())
}

async fn list_invitations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Invitation>>> {
    let conn = state.db.get()?;
    Ok(Json(matches::list_invitations(&conn, user.id)?))
}
