// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    codes,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{
        AppState, AppointmentStatus, ACTIVE_STATUSES, ROLE_ADMIN, ROLE_CITIZEN, ROLE_OFFICER,
    },
    notifications::AppointmentNotice,
    slots,
};

/*
Roles (users.role):
0 citizen
1 government officer
2 admin
*/

fn is_citizen(auth: &AuthContext) -> bool {
    auth.role == ROLE_CITIZEN
}
fn is_officer(auth: &AuthContext) -> bool {
    auth.role == ROLE_OFFICER
}
fn is_admin(auth: &AuthContext) -> bool {
    auth.role == ROLE_ADMIN
}

fn ensure_citizen(auth: &AuthContext) -> Result<(), ApiError> {
    if is_citizen(auth) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(
            "NOT_A_CITIZEN",
            "Only citizens can book appointments".into(),
        ))
    }
}

fn ensure_officer_or_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if is_officer(auth) || is_admin(auth) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(
            "NOT_AN_OFFICER",
            "Only officers and admins can manage appointment status".into(),
        ))
    }
}

/// Officer queue and status updates are scoped to the officer's own
/// department. An actor without the officer role, or an officer not
/// assigned to a department, is rejected outright.
fn resolve_officer_department(auth: &AuthContext) -> Result<Uuid, ApiError> {
    if !is_officer(auth) {
        return Err(ApiError::Unauthorized(
            "NOT_AN_OFFICER",
            "User is not a valid government officer".into(),
        ));
    }
    auth.department_id.ok_or_else(|| {
        ApiError::Unauthorized(
            "NO_DEPARTMENT",
            "Officer is not assigned to a department".into(),
        )
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(create_appointment))
        .route("/appointments/{appointment_id}", get(get_appointment))
        .route(
            "/appointments/{appointment_id}/status",
            patch(update_appointment_status),
        )
        .route("/citizens/me/appointments", get(list_my_citizen_appointments))
        .route(
            "/officers/me/appointments",
            get(list_my_department_appointments),
        )
}

/* ============================================================
   Response DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct CitizenBrief {
    pub id: Uuid,
    pub display: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceBrief {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct DepartmentBrief {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AppointmentDto {
    pub appointment_id: Uuid,
    pub appointment_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub confirmation_reference: String,
    pub qr_code_data_url: Option<String>,
    pub officer_notes: Option<String>,
    pub citizen: CitizenBrief,
    pub service: ServiceBrief,
    pub department: DepartmentBrief,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct AppointmentDetailRow {
    appointment_id: Uuid,
    appointment_at: DateTime<Utc>,
    status: AppointmentStatus,
    confirmation_reference: String,
    qr_code_data_url: Option<String>,
    officer_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    citizen_id: Uuid,
    citizen_display: String,
    citizen_email: String,
    service_id: Uuid,
    service_name: String,
    service_duration: Option<i32>,
    department_id: Uuid,
    department_name: String,
}

impl From<AppointmentDetailRow> for AppointmentDto {
    fn from(r: AppointmentDetailRow) -> Self {
        AppointmentDto {
            appointment_id: r.appointment_id,
            appointment_at: r.appointment_at,
            status: r.status,
            confirmation_reference: r.confirmation_reference,
            qr_code_data_url: r.qr_code_data_url,
            officer_notes: r.officer_notes,
            citizen: CitizenBrief {
                id: r.citizen_id,
                display: r.citizen_display,
                email: r.citizen_email,
            },
            service: ServiceBrief {
                id: r.service_id,
                name: r.service_name,
                duration_minutes: r.service_duration,
            },
            department: DepartmentBrief {
                id: r.department_id,
                name: r.department_name,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const APPOINTMENT_DETAIL_SELECT: &str = r#"
    SELECT
      a.appointment_id,
      a.appointment_at,
      a.status,
      a.confirmation_reference,
      a.qr_code_data_url,
      a.officer_notes,
      a.created_at,
      a.updated_at,

      u.user_id AS citizen_id,
      u.display_name AS citizen_display,
      u.email AS citizen_email,

      s.service_id,
      s.name AS service_name,
      s.duration_minutes AS service_duration,

      d.department_id,
      d.name AS department_name

    FROM appointments a
    JOIN users u ON u.user_id = a.citizen_id
    JOIN services s ON s.service_id = a.service_id
    JOIN departments d ON d.department_id = a.department_id
"#;

async fn load_appointment_detail(
    state: &AppState,
    appointment_id: Uuid,
) -> Result<Option<AppointmentDto>, ApiError> {
    let sql = format!("{APPOINTMENT_DETAIL_SELECT} WHERE a.appointment_id = $1");
    let row = sqlx::query_as::<_, AppointmentDetailRow>(&sql)
        .bind(appointment_id)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(row.map(AppointmentDto::from))
}

#[derive(Debug, sqlx::FromRow)]
struct CitizenContactRow {
    display_name: String,
    email: String,
    phone_number: Option<String>,
    receives_email_notifications: bool,
}

async fn load_citizen_contact(
    state: &AppState,
    user_id: Uuid,
) -> Result<CitizenContactRow, ApiError> {
    sqlx::query_as::<_, CitizenContactRow>(
        r#"
        SELECT display_name, email, phone_number, receives_email_notifications
        FROM users
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::Internal(format!("citizen {user_id} missing for notification")))
}

/* ============================================================
   POST /appointments (citizen booking)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub service_id: Uuid,
    pub appointment_at: DateTime<Utc>,
}

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<Json<ApiOk<AppointmentDto>>, ApiError> {
    ensure_citizen(&auth)?;

    // Normalize to minute precision: the slot index can only catch two
    // bookings of the same slot if they store the same instant.
    let appointment_at = req
        .appointment_at
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(req.appointment_at);

    if appointment_at <= Utc::now() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "appointment_at must be in the future".into(),
        ));
    }

    // Department is copied from the service at booking time and never
    // changes afterwards.
    let service: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT department_id
        FROM services
        WHERE service_id = $1
        "#,
    )
    .bind(req.service_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let Some((department_id,)) = service else {
        return Err(ApiError::NotFound(
            "SERVICE_NOT_FOUND",
            format!("Service {} not found", req.service_id),
        ));
    };

    // Re-check availability at call time; the earlier slot query the client
    // saw may already be stale. This is the fast-path check only -- the
    // partial unique index on (service_id, appointment_at) is the actual
    // guard against two bookings racing past it.
    let requested_slot = appointment_at.format("%H:%M").to_string();
    let available =
        slots::available_slots(&state, req.service_id, appointment_at.date_naive()).await?;
    if !available.contains(&requested_slot) {
        return Err(ApiError::slot_not_available(&requested_slot));
    }

    let reference = codes::generate_confirmation_reference();
    let qr_data_url = codes::confirmation_qr_data_url(&reference)
        .map_err(|e| ApiError::Internal(format!("visual code error: {e}")))?;

    let inserted: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO appointments (
          citizen_id,
          service_id,
          department_id,
          appointment_at,
          confirmation_reference,
          qr_code_data_url,
          status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING appointment_id
        "#,
    )
    .bind(auth.user_id)
    .bind(req.service_id)
    .bind(department_id)
    .bind(appointment_at)
    .bind(&reference)
    .bind(&qr_data_url)
    .bind(AppointmentStatus::Pending as i16)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::from_appointment_insert(e, &requested_slot))?;

    let appointment = load_appointment_detail(&state, inserted.0)
        .await?
        .ok_or_else(|| ApiError::Internal("appointment vanished after insert".into()))?;

    // Best-effort; the booking stands whether or not this goes out.
    let contact = load_citizen_contact(&state, auth.user_id).await?;
    state.notifier.spawn_booking_received(AppointmentNotice {
        citizen_name: contact.display_name,
        citizen_email: contact.email,
        citizen_phone: contact.phone_number,
        receives_email: contact.receives_email_notifications,
        service_name: appointment.service.name.clone(),
        appointment_at: appointment.appointment_at,
        confirmation_reference: appointment.confirmation_reference.clone(),
        status: appointment.status,
        officer_notes: None,
    });

    Ok(Json(ApiOk { data: appointment }))
}

/* ============================================================
   GET /citizens/me/appointments
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct CitizenListQuery {
    /// Comma-separated status names, e.g. "pending,confirmed".
    pub status: Option<String>,
}

pub async fn list_my_citizen_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<CitizenListQuery>,
) -> Result<Json<ApiOk<Vec<AppointmentDto>>>, ApiError> {
    ensure_citizen(&auth)?;

    let statuses = match q.status.as_deref() {
        Some(csv) => Some(
            AppointmentStatus::parse_filter(csv)
                .map_err(|msg| ApiError::BadRequest("VALIDATION_ERROR", msg))?,
        ),
        None => None,
    };

    let rows = match statuses {
        Some(statuses) => {
            let params: Vec<i16> = statuses.iter().map(|s| *s as i16).collect();
            let sql = format!(
                "{APPOINTMENT_DETAIL_SELECT} \
                 WHERE a.citizen_id = $1 AND a.status = ANY($2) \
                 ORDER BY a.appointment_at ASC"
            );
            sqlx::query_as::<_, AppointmentDetailRow>(&sql)
                .bind(auth.user_id)
                .bind(&params)
                .fetch_all(&state.db)
                .await
        }
        None => {
            let sql = format!(
                "{APPOINTMENT_DETAIL_SELECT} \
                 WHERE a.citizen_id = $1 \
                 ORDER BY a.appointment_at ASC"
            );
            sqlx::query_as::<_, AppointmentDetailRow>(&sql)
                .bind(auth.user_id)
                .fetch_all(&state.db)
                .await
        }
    }
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk {
        data: rows.into_iter().map(AppointmentDto::from).collect(),
    }))
}

/* ============================================================
   GET /officers/me/appointments
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct OfficerListQuery {
    /// YYYY-MM-DD; restricts to that calendar day.
    pub date: Option<String>,
    /// Comma-separated status names.
    pub status: Option<String>,
}

pub async fn list_my_department_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<OfficerListQuery>,
) -> Result<Json<ApiOk<Vec<AppointmentDto>>>, ApiError> {
    let department_id = resolve_officer_department(&auth)?;

    let day = match q.date.as_deref() {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                ApiError::BadRequest("VALIDATION_ERROR", "date must be YYYY-MM-DD".into())
            })?,
        ),
        None => None,
    };

    let explicit_statuses = match q.status.as_deref() {
        Some(csv) => Some(
            AppointmentStatus::parse_filter(csv)
                .map_err(|msg| ApiError::BadRequest("VALIDATION_ERROR", msg))?,
        ),
        None => None,
    };

    // Date given: that day's full window, statuses only when asked for.
    // No date: everything from today onward, defaulting to the active set
    // unless the caller picked statuses. The default deliberately applies
    // only when no date was given.
    let (window_start, window_end, statuses) = match day {
        Some(day) => {
            let start = day.and_hms_opt(0, 0, 0).unwrap().and_utc();
            (start, Some(start + Duration::days(1)), explicit_statuses)
        }
        None => {
            let today = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
            let statuses = explicit_statuses.unwrap_or_else(|| ACTIVE_STATUSES.to_vec());
            (today, None, Some(statuses))
        }
    };

    let mut sql = format!(
        "{APPOINTMENT_DETAIL_SELECT} \
         WHERE a.department_id = $1 AND a.appointment_at >= $2"
    );
    let mut next_param = 3;
    if window_end.is_some() {
        sql.push_str(&format!(" AND a.appointment_at < ${next_param}"));
        next_param += 1;
    }
    let status_params: Option<Vec<i16>> =
        statuses.map(|list| list.iter().map(|s| *s as i16).collect());
    if status_params.is_some() {
        sql.push_str(&format!(" AND a.status = ANY(${next_param})"));
    }
    sql.push_str(" ORDER BY a.appointment_at ASC");

    let mut query = sqlx::query_as::<_, AppointmentDetailRow>(&sql)
        .bind(department_id)
        .bind(window_start);
    if let Some(end) = window_end {
        query = query.bind(end);
    }
    if let Some(params) = &status_params {
        query = query.bind(params);
    }

    let rows = query
        .fetch_all(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk {
        data: rows.into_iter().map(AppointmentDto::from).collect(),
    }))
}

/* ============================================================
   PATCH /appointments/{id}/status
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    /// Overwrites existing notes only when supplied.
    pub officer_notes: Option<String>,
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiOk<AppointmentDto>>, ApiError> {
    ensure_officer_or_admin(&auth)?;

    let current: Option<(Uuid, AppointmentStatus)> = sqlx::query_as(
        r#"
        SELECT department_id, status
        FROM appointments
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let Some((department_id, current_status)) = current else {
        return Err(ApiError::NotFound(
            "APPOINTMENT_NOT_FOUND",
            format!("Appointment {appointment_id} not found"),
        ));
    };

    // Officers act only inside their own department; admins are unscoped.
    if !is_admin(&auth) {
        let officer_department = resolve_officer_department(&auth)?;
        if officer_department != department_id {
            return Err(ApiError::Unauthorized(
                "DEPARTMENT_MISMATCH",
                "Officer cannot manage appointments of another department".into(),
            ));
        }
    }

    if state.strict_status_transitions && !current_status.can_transition_to(req.status) {
        return Err(ApiError::BadRequest(
            "INVALID_STATUS_TRANSITION",
            format!(
                "cannot move appointment from {} to {}",
                current_status.as_str(),
                req.status.as_str()
            ),
        ));
    }

    sqlx::query(
        r#"
        UPDATE appointments
        SET status = $2,
            officer_notes = COALESCE($3, officer_notes),
            updated_at = now()
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .bind(req.status as i16)
    .bind(req.officer_notes.as_deref())
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let appointment = load_appointment_detail(&state, appointment_id)
        .await?
        .ok_or_else(|| ApiError::Internal("appointment vanished after update".into()))?;

    let contact = load_citizen_contact(&state, appointment.citizen.id).await?;
    state.notifier.spawn_status_changed(AppointmentNotice {
        citizen_name: contact.display_name,
        citizen_email: contact.email,
        citizen_phone: contact.phone_number,
        receives_email: contact.receives_email_notifications,
        service_name: appointment.service.name.clone(),
        appointment_at: appointment.appointment_at,
        confirmation_reference: appointment.confirmation_reference.clone(),
        status: appointment.status,
        officer_notes: appointment.officer_notes.clone(),
    });

    Ok(Json(ApiOk { data: appointment }))
}

/* ============================================================
   GET /appointments/{id}
   ============================================================ */

pub async fn get_appointment(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentDto>>, ApiError> {
    let appointment = load_appointment_detail(&state, appointment_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(
                "APPOINTMENT_NOT_FOUND",
                format!("Appointment {appointment_id} not found"),
            )
        })?;

    Ok(Json(ApiOk { data: appointment }))
}
