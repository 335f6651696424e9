use axum::{Json, Router, extract::State, routing::get};

use crate::error::ApiError;
use crate::middleware::auth_context::AuthContext;
use crate::models::AppState;

#[derive(serde::Serialize)]
pub struct HomeResponse {
    pub data: HomeData,
}

#[derive(serde::Serialize)]
pub struct HomeData {
    pub view: String,
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/home", get(home))
}

pub async fn home(
    State(_state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<HomeResponse>, ApiError> {
    // users.role: 0 citizen, 1 government officer, 2 admin
    let view = match auth.role {
        0 => "citizen",
        1 => "officer",
        2 => "admin",
        _ => "unknown",
    };

    Ok(Json(HomeResponse {
        data: HomeData {
            view: view.to_string(),
            message: "role-based portal home".to_string(),
        },
    }))
}
