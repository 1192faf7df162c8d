//! Development-only introspection; mounted by `app::build_app` only when
//! `APP_ENV` is development.

use axum::{extract::State, routing::get, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{
    db::{
        models::{Role, User},
        object_id::ObjectId,
        StorageMode,
    },
    error::{ApiResponse, ApiResult},
    state::AppState,
};

const LISTED_USERS: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugStatus {
    pub database: StorageMode,
    pub user_count: u64,
    pub users: Vec<DebugUser>,
}

#[derive(Debug, Serialize)]
pub struct DebugUser {
    pub id: ObjectId,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<User> for DebugUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/debug/status", get(status))
}

#[instrument(skip(state))]
pub async fn status(State(state): State<AppState>) -> ApiResult<ApiResponse<DebugStatus>> {
    let user_count = state.db.count_users().await?;
    let users = state.db.list_users(LISTED_USERS).await?;
    Ok(ApiResponse::ok(DebugStatus {
        database: state.db.mode(),
        user_count,
        users: users.into_iter().map(DebugUser::from).collect(),
    }))
}
