use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::notifications::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
    pub strict_status_transitions: bool,
    pub notifier: Notifier,
}

/* -------------------------
   Roles
--------------------------*/

/// Role mapping (users.role):
/// 0 citizen, 1 government officer, 2 admin
pub const ROLE_CITIZEN: i16 = 0;
pub const ROLE_OFFICER: i16 = 1;
pub const ROLE_ADMIN: i16 = 2;

pub fn role_to_string(role: i16) -> String {
    match role {
        0 => "citizen",
        1 => "government_officer",
        2 => "admin",
        _ => "unknown",
    }
    .to_string()
}

/* -------------------------
   Appointment status
--------------------------*/

/// Stored as smallint; serialized as the snake_case names below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending = 0,
    Confirmed = 1,
    CancelledByCitizen = 2,
    CancelledByOfficer = 3,
    Completed = 4,
    Rescheduled = 5,
}

/// Statuses that count against a slot's availability.
pub const SLOT_OCCUPYING: [AppointmentStatus; 2] =
    [AppointmentStatus::Pending, AppointmentStatus::Confirmed];

/// Default filter for the officer work queue when no date is given.
pub const ACTIVE_STATUSES: [AppointmentStatus; 3] = [
    AppointmentStatus::Pending,
    AppointmentStatus::Confirmed,
    AppointmentStatus::Rescheduled,
];

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::CancelledByCitizen => "cancelled_by_citizen",
            AppointmentStatus::CancelledByOfficer => "cancelled_by_officer",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled_by_citizen" => Some(AppointmentStatus::CancelledByCitizen),
            "cancelled_by_officer" => Some(AppointmentStatus::CancelledByOfficer),
            "completed" => Some(AppointmentStatus::Completed),
            "rescheduled" => Some(AppointmentStatus::Rescheduled),
            _ => None,
        }
    }

    /// Parse a comma-separated status filter ("pending,confirmed").
    /// Every token must name a known status.
    pub fn parse_filter(csv: &str) -> Result<Vec<AppointmentStatus>, String> {
        let mut out = Vec::new();
        for token in csv.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match AppointmentStatus::parse(token) {
                Some(s) => out.push(s),
                None => return Err(format!("unknown status: {token}")),
            }
        }
        if out.is_empty() {
            return Err("status filter is empty".into());
        }
        Ok(out)
    }

    /// Lifecycle table. Completed and both cancelled states are terminal;
    /// a rescheduled appointment is replaced by a new booking, not mutated.
    pub fn allowed_transitions(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::Pending => &[
                AppointmentStatus::Confirmed,
                AppointmentStatus::CancelledByOfficer,
                AppointmentStatus::CancelledByCitizen,
                AppointmentStatus::Rescheduled,
            ],
            AppointmentStatus::Confirmed => &[
                AppointmentStatus::Completed,
                AppointmentStatus::CancelledByOfficer,
                AppointmentStatus::Rescheduled,
            ],
            AppointmentStatus::CancelledByCitizen
            | AppointmentStatus::CancelledByOfficer
            | AppointmentStatus::Completed
            | AppointmentStatus::Rescheduled => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// "cancelled_by_officer" -> "Cancelled By Officer", for message bodies.
    pub fn display_name(&self) -> String {
        self.as_str()
            .split('_')
            .map(|w| {
                let mut c = w.chars();
                match c.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub data: MeResponseData,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub user: UserProfile,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: i16,
    pub department_id: Option<Uuid>,
    pub phone_number: Option<String>,
    pub receives_email_notifications: bool,
    pub is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceRow {
    pub service_id: Uuid,
    pub department_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DepartmentRow {
    pub department_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_round_trip() {
        for s in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::CancelledByCitizen,
            AppointmentStatus::CancelledByOfficer,
            AppointmentStatus::Completed,
            AppointmentStatus::Rescheduled,
        ] {
            assert_eq!(AppointmentStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(AppointmentStatus::parse("arrived"), None);
    }

    #[test]
    fn filter_accepts_known_csv() {
        let parsed = AppointmentStatus::parse_filter("pending, confirmed").unwrap();
        assert_eq!(
            parsed,
            vec![AppointmentStatus::Pending, AppointmentStatus::Confirmed]
        );
    }

    #[test]
    fn filter_rejects_unknown_token() {
        assert!(AppointmentStatus::parse_filter("pending,seated").is_err());
        assert!(AppointmentStatus::parse_filter("").is_err());
        assert!(AppointmentStatus::parse_filter(" , ").is_err());
    }

    #[test]
    fn pending_can_move_to_every_first_stage() {
        let p = AppointmentStatus::Pending;
        assert!(p.can_transition_to(AppointmentStatus::Confirmed));
        assert!(p.can_transition_to(AppointmentStatus::CancelledByOfficer));
        assert!(p.can_transition_to(AppointmentStatus::CancelledByCitizen));
        assert!(p.can_transition_to(AppointmentStatus::Rescheduled));
        assert!(!p.can_transition_to(AppointmentStatus::Completed));
    }

    #[test]
    fn confirmed_cannot_be_cancelled_by_citizen() {
        let c = AppointmentStatus::Confirmed;
        assert!(c.can_transition_to(AppointmentStatus::Completed));
        assert!(c.can_transition_to(AppointmentStatus::CancelledByOfficer));
        assert!(c.can_transition_to(AppointmentStatus::Rescheduled));
        assert!(!c.can_transition_to(AppointmentStatus::CancelledByCitizen));
        assert!(!c.can_transition_to(AppointmentStatus::Pending));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for s in [
            AppointmentStatus::Completed,
            AppointmentStatus::CancelledByCitizen,
            AppointmentStatus::CancelledByOfficer,
            AppointmentStatus::Rescheduled,
        ] {
            assert!(s.allowed_transitions().is_empty());
        }
    }

    #[test]
    fn display_name_title_cases_underscores() {
        assert_eq!(
            AppointmentStatus::CancelledByOfficer.display_name(),
            "Cancelled By Officer"
        );
        assert_eq!(AppointmentStatus::Pending.display_name(), "Pending");
    }
}
