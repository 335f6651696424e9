// src/routes/service_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ServiceRow},
    slots,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services))
        .route("/{service_id}/available-slots", get(get_available_slots))
}

/* ============================================================
   GET /services
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ServiceListQuery {
    pub department_id: Option<Uuid>,
    pub category: Option<String>,
    /// Substring match on the service name.
    pub search: Option<String>,
}

pub async fn list_services(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<ServiceListQuery>,
) -> Result<Json<Vec<ServiceRow>>, ApiError> {
    let mut sql = String::from(
        r#"
        SELECT
          service_id,
          department_id,
          name,
          description,
          category,
          duration_minutes,
          is_active,
          created_at,
          updated_at
        FROM services
        WHERE is_active = true
        "#,
    );

    let mut next_param = 1;
    if q.department_id.is_some() {
        sql.push_str(&format!(" AND department_id = ${next_param}"));
        next_param += 1;
    }
    if q.category.is_some() {
        sql.push_str(&format!(" AND category = ${next_param}"));
        next_param += 1;
    }
    let search_pattern = q.search.as_deref().map(|s| format!("%{}%", s.trim()));
    if search_pattern.is_some() {
        sql.push_str(&format!(" AND name ILIKE ${next_param}"));
    }
    sql.push_str(" ORDER BY name ASC");

    let mut query = sqlx::query_as::<_, ServiceRow>(&sql);
    if let Some(department_id) = q.department_id {
        query = query.bind(department_id);
    }
    if let Some(category) = &q.category {
        query = query.bind(category);
    }
    if let Some(pattern) = &search_pattern {
        query = query.bind(pattern);
    }

    let rows = query
        .fetch_all(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(rows))
}

/* ============================================================
   GET /services/{service_id}/available-slots
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    /// YYYY-MM-DD
    pub date: String,
}

/// Public endpoint: citizens browse open slots before registering. The
/// result is advisory only; booking re-validates at commit time.
pub async fn get_available_slots(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    Query(q): Query<AvailableSlotsQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let date = NaiveDate::parse_from_str(q.date.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest("VALIDATION_ERROR", "date must be YYYY-MM-DD".into()))?;

    let available = slots::available_slots(&state, service_id, date).await?;
    Ok(Json(available))
}
