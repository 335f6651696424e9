use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    auth::{generate_access_token, hash_access_token, hash_password, verify_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{role_to_string, *},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

fn validate_new_password(pw: &str) -> Result<(), ApiError> {
    if pw.trim().len() < 8 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

fn profile_from_row(user: &UserRow) -> UserProfile {
    UserProfile {
        user_id: user.user_id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        role: role_to_string(user.role),
        department_id: user.department_id,
    }
}

/* ============================================================
   POST /auth/register (citizen self-service)
   ============================================================ */

#[derive(Debug, serde::Serialize)]
pub struct RegisterResponse {
    pub data: RegisterData,
}

#[derive(Debug, serde::Serialize)]
pub struct RegisterData {
    pub user: UserProfile,
}

/// Self-registration always produces a citizen account. Officer and admin
/// accounts are seeded out-of-band (see bin/hashpass.rs).
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "a valid email is required".into(),
        ));
    }
    if req.display_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "display_name is required".into(),
        ));
    }
    validate_new_password(&req.password)?;

    let existing: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT user_id
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if existing.is_some() {
        return Err(ApiError::BadRequest(
            "EMAIL_IN_USE",
            "Email address already in use".into(),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::Internal)?;

    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users
            (email, display_name, password_hash, role, phone_number)
        VALUES
            ($1, $2, $3, $4, $5)
        RETURNING user_id, email, display_name, password_hash, role,
                  department_id, phone_number, receives_email_notifications, is_active
        "#,
    )
    .bind(&email)
    .bind(req.display_name.trim())
    .bind(&password_hash)
    .bind(ROLE_CITIZEN)
    .bind(req.phone_number.as_deref())
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(RegisterResponse {
        data: RegisterData {
            user: profile_from_row(&user),
        },
    }))
}

/* ============================================================
   POST /auth/login
   ============================================================ */

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "email and password are required".into(),
        ));
    }

    // 1) Load user
    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, email, display_name, password_hash, role,
               department_id, phone_number, receives_email_notifications, is_active
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::invalid_credentials)?;

    if !user.is_active {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Account is disabled".into(),
        ));
    }

    // 2) Verify password
    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    // 3) Create session_token
    let access_token = generate_access_token();
    let token_hash = hash_access_token(&access_token);
    let expires_at = Utc::now() + Duration::hours(state.session_ttl_hours);

    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        INSERT INTO session_token
            (user_id, session_token_hash, device_name, expires_at)
        VALUES
            ($1, $2, $3, $4)
        RETURNING session_token_id, expires_at
        "#,
    )
    .bind(user.user_id)
    .bind(&token_hash)
    .bind(req.device_name.as_deref())
    .bind(expires_at)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(LoginResponse {
        data: LoginResponseData {
            access_token,
            expires_at: session.expires_at,
            user: profile_from_row(&user),
        },
    }))
}

/* ============================================================
   GET /auth/me
   ============================================================ */

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, email, display_name, password_hash, role,
               department_id, phone_number, receives_email_notifications, is_active
        FROM users
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    if !user.is_active {
        return Err(ApiError::session_expired());
    }

    // Ensure the session itself is still live
    let session: SessionTokenRow = sqlx::query_as::<_, SessionTokenRow>(
        r#"
        SELECT session_token_id, expires_at
        FROM session_token
        WHERE session_token_id = $1
          AND user_id = $2
          AND revoked_at IS NULL
          AND expires_at > now()
        "#,
    )
    .bind(auth.session_token_id)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(ApiError::session_expired)?;

    Ok(Json(MeResponse {
        data: MeResponseData {
            user: profile_from_row(&user),
            session: SessionInfo {
                session_token_id: session.session_token_id,
                expires_at: session.expires_at,
            },
        },
    }))
}

/* ============================================================
   POST /auth/logout
   ============================================================ */

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OkResponse>, ApiError> {
    let rows = sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE session_token_id = $1
          AND user_id = $2
          AND revoked_at IS NULL
        "#,
    )
    .bind(auth.session_token_id)
    .bind(auth.user_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if rows.rows_affected() == 0 {
        return Err(ApiError::session_expired());
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}
