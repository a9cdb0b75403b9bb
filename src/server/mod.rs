//! HTTP surface
//!
//! A thin axum adapter over [`crate::views`]. Request bodies are
//! form-encoded, responses are JSON. The acting account comes from the
//! `x-hunchworks-account` header set by the authenticating proxy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context};
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::collab::InvitationBatch;
use crate::config::Config;
use crate::db::{Database, GroupPage};
use crate::models::{Account, Connection, Evidence, Hunch, HunchUser, Identity, UserProfile};
use crate::views::{self, GroupDetail, HunchDetail, ProfileDetail, ViewError, ViewResult};

mod error;

pub use error::{ErrorBody, ErrorCode};

pub const ACCOUNT_HEADER: &str = "x-hunchworks-account";

type Fields = Form<HashMap<String, String>>;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
        }
    }

    fn db(&self) -> ViewResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| ViewError::Storage(anyhow!("database lock poisoned")))
    }
}

/// The authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ViewError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .map(|id| CurrentUser(Identity::new(id)))
            .ok_or(ViewError::Unauthenticated)
    }
}

#[derive(Debug, Serialize)]
pub struct Registration {
    pub account: Account,
    pub profile: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/groups", get(group_index).post(create_group))
        .route("/groups/:id", get(show_group).post(edit_group))
        .route("/hunches", get(hunch_index).post(create_hunch))
        .route("/hunches/:id", get(show_hunch).post(edit_hunch))
        .route("/hunches/:id/delete", post(destroy_hunch))
        .route("/hunches/:id/join", post(join_hunch))
        .route("/hunches/:id/evidence", get(list_evidence).post(add_evidence))
        .route("/evidence/:id", post(edit_evidence))
        .route("/accounts", post(create_account))
        .route("/profiles/:id", get(show_profile).post(edit_profile))
        .route("/connections", get(list_connections).post(connect))
        .route("/invitations", post(invite))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process is stopped
pub async fn serve(config: Config, db: Database) -> anyhow::Result<()> {
    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "hunchworks listening");
    axum::serve(listener, router(AppState::new(db, config)))
        .await
        .context("Server error")?;
    Ok(())
}

// Groups

async fn group_index(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(query): Query<PageQuery>,
) -> ViewResult<Json<GroupPage>> {
    let page_size = state.config.groups.page_size;
    let db = state.db()?;
    views::group_index(&db, query.page.unwrap_or(1), page_size).map(Json)
}

async fn show_group(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<i64>,
) -> ViewResult<Json<GroupDetail>> {
    let db = state.db()?;
    views::show_group(&db, id).map(Json)
}

async fn create_group(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Form(data): Fields,
) -> ViewResult<(StatusCode, Json<GroupDetail>)> {
    let db = state.db()?;
    let detail = views::create_group(&db, &identity, &data)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn edit_group(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Form(data): Fields,
) -> ViewResult<Json<GroupDetail>> {
    let db = state.db()?;
    views::edit_group(&db, &identity, id, &data).map(Json)
}

// Hunches

async fn hunch_index(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> ViewResult<Json<Vec<Hunch>>> {
    let db = state.db()?;
    views::hunch_index(&db, &identity).map(Json)
}

async fn show_hunch(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> ViewResult<Json<HunchDetail>> {
    let db = state.db()?;
    views::show_hunch(&db, &identity, id).map(Json)
}

async fn create_hunch(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Form(data): Fields,
) -> ViewResult<(StatusCode, Json<Hunch>)> {
    let db = state.db()?;
    let hunch = views::create_hunch(&db, &identity, &data)?;
    Ok((StatusCode::CREATED, Json(hunch)))
}

async fn edit_hunch(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Form(data): Fields,
) -> ViewResult<Json<Hunch>> {
    let db = state.db()?;
    views::edit_hunch(&db, &identity, id, &data).map(Json)
}

async fn destroy_hunch(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> ViewResult<StatusCode> {
    let db = state.db()?;
    views::destroy_hunch(&db, &identity, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn join_hunch(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
) -> ViewResult<Json<HunchUser>> {
    let db = state.db()?;
    views::join_hunch(&db, &identity, id).map(Json)
}

// Evidence

async fn list_evidence(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(hunch_id): Path<i64>,
) -> ViewResult<Json<Vec<Evidence>>> {
    let db = state.db()?;
    views::list_evidence(&db, &identity, hunch_id).map(Json)
}

async fn add_evidence(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(hunch_id): Path<i64>,
    Form(data): Fields,
) -> ViewResult<(StatusCode, Json<Evidence>)> {
    let db = state.db()?;
    let evidence = views::add_evidence(&db, &identity, hunch_id, &data)?;
    Ok((StatusCode::CREATED, Json(evidence)))
}

async fn edit_evidence(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Form(data): Fields,
) -> ViewResult<Json<Evidence>> {
    let db = state.db()?;
    views::edit_evidence(&db, &identity, id, &data).map(Json)
}

// Accounts and profiles

async fn create_account(
    State(state): State<AppState>,
    Form(data): Fields,
) -> ViewResult<(StatusCode, Json<Registration>)> {
    let db = state.db()?;
    let (account, profile) = views::create_account(&db, &data)?;
    Ok((StatusCode::CREATED, Json(Registration { account, profile })))
}

async fn show_profile(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<i64>,
) -> ViewResult<Json<ProfileDetail>> {
    let db = state.db()?;
    views::show_profile(&db, id).map(Json)
}

async fn edit_profile(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<i64>,
    Form(data): Fields,
) -> ViewResult<Json<UserProfile>> {
    let db = state.db()?;
    views::edit_profile(&db, &identity, id, &data).map(Json)
}

async fn list_connections(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> ViewResult<Json<Vec<Connection>>> {
    let db = state.db()?;
    views::list_connections(&db, &identity).map(Json)
}

async fn connect(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Form(data): Fields,
) -> ViewResult<(StatusCode, Json<Connection>)> {
    let db = state.db()?;
    let connection = views::connect(&db, &identity, &data)?;
    Ok((StatusCode::CREATED, Json(connection)))
}

/// Invitations are recorded against the configured inviter, not the caller
async fn invite(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Form(data): Fields,
) -> ViewResult<(StatusCode, Json<InvitationBatch>)> {
    let inviter = Identity::new(state.config.invitations.inviter_id);
    let db = state.db()?;
    let batch = views::invite(&db, &inviter, &data)?;
    Ok((StatusCode::CREATED, Json(batch)))
}
