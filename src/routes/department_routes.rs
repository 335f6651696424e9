// src/routes/department_routes.rs

use axum::{extract::State, routing::get, Json, Router};

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, DepartmentRow},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_departments))
}

pub async fn list_departments(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<Vec<DepartmentRow>>, ApiError> {
    let rows: Vec<DepartmentRow> = sqlx::query_as::<_, DepartmentRow>(
        r#"
        SELECT
          department_id,
          name,
          description,
          contact_email,
          contact_phone,
          address,
          created_at,
          updated_at
        FROM departments
        ORDER BY name ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(rows))
}
