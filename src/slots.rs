// src/slots.rs
//
// Slot calculator: the candidate time grid for a service on a calendar
// date, minus the starts already taken by slot-occupying appointments.
// The grid logic is pure; only the occupied set comes from the store.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{AppState, SLOT_OCCUPYING, ServiceRow};

/// Fixed working-hour policy: 09:00-17:00, Monday through Friday,
/// interpreted in the portal's operating timezone (UTC).
pub const OPENING_HOUR: u32 = 9;
pub const CLOSING_HOUR: u32 = 17;
pub const DEFAULT_SLOT_MINUTES: i32 = 30;

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Consecutive slot start times from opening, each `duration_minutes` long.
/// A slot whose end would pass closing time is dropped; there is no partial
/// trailing slot.
pub fn slot_grid(duration_minutes: i32) -> Vec<NaiveTime> {
    let duration = Duration::minutes(i64::from(duration_minutes));
    let opening = NaiveTime::from_hms_opt(OPENING_HOUR, 0, 0).unwrap();
    let closing = NaiveTime::from_hms_opt(CLOSING_HOUR, 0, 0).unwrap();

    let mut slots = Vec::new();
    let mut current = opening;
    loop {
        let (end, wrapped) = current.overflowing_add_signed(duration);
        if wrapped != 0 || end > closing {
            break;
        }
        slots.push(current);
        current = end;
    }
    slots
}

/// The bookable "HH:MM" starts for a date, after policy short-circuits and
/// occupied-slot subtraction. `today` is passed in so the date cutoff is
/// testable.
pub fn day_slots(
    date: NaiveDate,
    today: NaiveDate,
    duration_minutes: Option<i32>,
    occupied: &HashSet<String>,
) -> Vec<String> {
    if date < today {
        return Vec::new();
    }
    if is_weekend(date) {
        return Vec::new();
    }

    let duration = duration_minutes.filter(|d| *d > 0).unwrap_or(DEFAULT_SLOT_MINUTES);

    slot_grid(duration)
        .into_iter()
        .map(|t| t.format("%H:%M").to_string())
        .filter(|hhmm| !occupied.contains(hhmm))
        .collect()
}

/// Resolve the service (must exist and be active) and compute its available
/// slots for the date. Read-only; the result is a snapshot that can go
/// stale as soon as another booking commits.
pub async fn available_slots(
    state: &AppState,
    service_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<String>, ApiError> {
    let service: ServiceRow = sqlx::query_as::<_, ServiceRow>(
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
        WHERE service_id = $1
          AND is_active = true
        "#,
    )
    .bind(service_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::NotFound("SERVICE_NOT_FOUND", format!("Service {service_id} not found")))?;

    let occupied = occupied_starts(state, service_id, date).await?;

    Ok(day_slots(
        date,
        Utc::now().date_naive(),
        service.duration_minutes,
        &occupied,
    ))
}

/// "HH:MM" starts of same-day appointments for the service whose status
/// still occupies a slot (pending or confirmed).
async fn occupied_starts(
    state: &AppState,
    service_id: Uuid,
    date: NaiveDate,
) -> Result<HashSet<String>, ApiError> {
    let day_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let day_end = day_start + Duration::days(1);
    let occupying: Vec<i16> = SLOT_OCCUPYING.iter().map(|s| *s as i16).collect();

    let taken: Vec<(chrono::DateTime<Utc>,)> = sqlx::query_as(
        r#"
        SELECT appointment_at
        FROM appointments
        WHERE service_id = $1
          AND appointment_at >= $2
          AND appointment_at < $3
          AND status = ANY($4)
        "#,
    )
    .bind(service_id)
    .bind(day_start)
    .bind(day_end)
    .bind(&occupying)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(taken
        .into_iter()
        .map(|(at,)| at.format("%H:%M").to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekday() -> NaiveDate {
        // A Wednesday.
        NaiveDate::from_ymd_opt(2026, 9, 2).unwrap()
    }

    #[test]
    fn thirty_minute_grid_has_sixteen_slots() {
        let slots = day_slots(weekday(), weekday(), Some(30), &HashSet::new());
        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first().map(String::as_str), Some("09:00"));
        assert_eq!(slots.last().map(String::as_str), Some("16:30"));
    }

    #[test]
    fn forty_five_minute_grid_stops_before_closing() {
        let slots = day_slots(weekday(), weekday(), Some(45), &HashSet::new());
        // Consecutive 45-minute slots from 09:00; 16:30 would end 17:15.
        assert_eq!(slots.len(), 10);
        assert_eq!(slots.first().map(String::as_str), Some("09:00"));
        assert_eq!(slots.last().map(String::as_str), Some("15:45"));
        assert!(!slots.iter().any(|s| s == "16:30"));
    }

    #[test]
    fn missing_duration_falls_back_to_thirty() {
        let slots = day_slots(weekday(), weekday(), None, &HashSet::new());
        assert_eq!(slots.len(), 16);
        let zeroed = day_slots(weekday(), weekday(), Some(0), &HashSet::new());
        assert_eq!(zeroed.len(), 16);
    }

    #[test]
    fn weekend_yields_no_slots() {
        let saturday = NaiveDate::from_ymd_opt(2026, 9, 5).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2026, 9, 6).unwrap();
        assert!(day_slots(saturday, weekday(), Some(30), &HashSet::new()).is_empty());
        assert!(day_slots(sunday, weekday(), Some(30), &HashSet::new()).is_empty());
    }

    #[test]
    fn past_date_yields_no_slots() {
        let yesterday = weekday().pred_opt().unwrap();
        assert!(day_slots(yesterday, weekday(), Some(30), &HashSet::new()).is_empty());
        // Today itself still produces the grid.
        assert!(!day_slots(weekday(), weekday(), Some(30), &HashSet::new()).is_empty());
    }

    #[test]
    fn occupied_starts_are_subtracted_in_order() {
        let occupied: HashSet<String> = ["09:00".to_string(), "10:00".to_string()].into();
        let slots = day_slots(weekday(), weekday(), Some(30), &occupied);
        assert_eq!(slots.len(), 14);
        assert_eq!(slots.first().map(String::as_str), Some("09:30"));
        assert!(!slots.contains(&"10:00".to_string()));
        // Chronological order preserved.
        let mut sorted = slots.clone();
        sorted.sort();
        assert_eq!(slots, sorted);
    }

    #[test]
    fn whole_day_booked_yields_empty() {
        let occupied: HashSet<String> = slot_grid(30)
            .into_iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();
        assert!(day_slots(weekday(), weekday(), Some(30), &occupied).is_empty());
    }
}
