// src/scheduler.rs
//
// Periodic reminder job. Scans for confirmed appointments 24-48 hours out
// that have not been reminded yet, claims each row atomically, and hands it
// to the notifier. One appointment failing never aborts the batch.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{AppState, AppointmentStatus};
use crate::notifications::AppointmentNotice;

pub const REMINDER_WINDOW_START_HOURS: i64 = 24;
pub const REMINDER_WINDOW_END_HOURS: i64 = 48;

/// The scan window: appointments starting between 24 and 48 hours from now.
pub fn reminder_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now + Duration::hours(REMINDER_WINDOW_START_HOURS),
        now + Duration::hours(REMINDER_WINDOW_END_HOURS),
    )
}

#[derive(Debug, sqlx::FromRow)]
struct ReminderRow {
    appointment_id: Uuid,
    appointment_at: DateTime<Utc>,
    confirmation_reference: String,
    status: AppointmentStatus,
    officer_notes: Option<String>,
    citizen_name: String,
    citizen_email: String,
    citizen_phone: Option<String>,
    receives_email: bool,
    service_name: String,
}

pub fn spawn_reminder_job(state: AppState, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(StdDuration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = run_reminder_pass(&state).await {
                error!("appointment reminder pass failed: {e}");
            }
        }
    });
}

async fn run_reminder_pass(state: &AppState) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    let (window_start, window_end) = reminder_window(now);

    let due: Vec<ReminderRow> = sqlx::query_as::<_, ReminderRow>(
        r#"
        SELECT
          a.appointment_id,
          a.appointment_at,
          a.confirmation_reference,
          a.status,
          a.officer_notes,
          u.display_name AS citizen_name,
          u.email AS citizen_email,
          u.phone_number AS citizen_phone,
          u.receives_email_notifications AS receives_email,
          s.name AS service_name
        FROM appointments a
        JOIN users u ON u.user_id = a.citizen_id
        JOIN services s ON s.service_id = a.service_id
        WHERE a.status = $1
          AND a.appointment_at >= $2
          AND a.appointment_at <= $3
          AND a.reminder_sent_at IS NULL
        ORDER BY a.appointment_at ASC
        "#,
    )
    .bind(AppointmentStatus::Confirmed as i16)
    .bind(window_start)
    .bind(window_end)
    .fetch_all(&state.db)
    .await?;

    if due.is_empty() {
        return Ok(());
    }
    info!("found {} appointments needing reminders", due.len());

    for row in due {
        // The window query already bounds this, but re-check against the
        // clock in case the pass ran long.
        if row.appointment_at <= Utc::now() {
            continue;
        }

        // Claim before sending so a concurrent pass (or restart) cannot
        // remind the same appointment twice.
        let claimed = sqlx::query(
            r#"
            UPDATE appointments
            SET reminder_sent_at = now(),
                updated_at = now()
            WHERE appointment_id = $1
              AND reminder_sent_at IS NULL
            "#,
        )
        .bind(row.appointment_id)
        .execute(&state.db)
        .await;

        match claimed {
            Ok(res) if res.rows_affected() == 1 => {
                state.notifier.spawn_reminder(AppointmentNotice {
                    citizen_name: row.citizen_name,
                    citizen_email: row.citizen_email,
                    citizen_phone: row.citizen_phone,
                    receives_email: row.receives_email,
                    service_name: row.service_name,
                    appointment_at: row.appointment_at,
                    confirmation_reference: row.confirmation_reference,
                    status: row.status,
                    officer_notes: row.officer_notes,
                });
            }
            Ok(_) => {
                // Another pass claimed it first.
            }
            Err(e) => {
                error!(
                    appointment_id = %row.appointment_id,
                    "failed to claim reminder: {e}"
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_spans_24_to_48_hours() {
        let now = Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap();
        let (start, end) = reminder_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 9, 2, 8, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 9, 3, 8, 0, 0).unwrap());
    }

    #[test]
    fn appointment_30_hours_out_is_inside_the_window() {
        let now = Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap();
        let (start, end) = reminder_window(now);
        let appointment_at = now + Duration::hours(30);
        assert!(appointment_at >= start && appointment_at <= end);
        let too_soon = now + Duration::hours(12);
        assert!(too_soon < start);
        let too_far = now + Duration::hours(60);
        assert!(too_far > end);
    }
}
