// src/notifications.rs
//
// Notification dispatcher. Builds the templated email/SMS text for booking,
// status-change, and reminder events and hands it to the mock transport
// (structured log lines). Delivery is best-effort and always detached from
// the operation that triggered it; failures never reach the caller.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::models::AppointmentStatus;

const PORTAL_NAME: &str = "GovAppt Portal";
const SMS_PREFIX: &str = "GovAppt";

/// Everything a notification needs, captured at dispatch time so the
/// spawned task owns its data outright.
#[derive(Debug, Clone)]
pub struct AppointmentNotice {
    pub citizen_name: String,
    pub citizen_email: String,
    pub citizen_phone: Option<String>,
    pub receives_email: bool,
    pub service_name: String,
    pub appointment_at: DateTime<Utc>,
    pub confirmation_reference: String,
    pub status: AppointmentStatus,
    pub officer_notes: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum NoticeKind {
    BookingReceived,
    StatusChanged,
    Reminder,
}

#[derive(Clone)]
pub struct Notifier {
    mock_sms_enabled: bool,
}

impl Notifier {
    pub fn new(mock_sms_enabled: bool) -> Self {
        Self { mock_sms_enabled }
    }

    /// Fire-and-forget: a new booking was persisted.
    pub fn spawn_booking_received(&self, notice: AppointmentNotice) {
        self.spawn(NoticeKind::BookingReceived, notice);
    }

    /// Fire-and-forget: an officer moved the appointment to a new status.
    pub fn spawn_status_changed(&self, notice: AppointmentNotice) {
        self.spawn(NoticeKind::StatusChanged, notice);
    }

    /// Fire-and-forget: the appointment is coming up within the reminder
    /// window.
    pub fn spawn_reminder(&self, notice: AppointmentNotice) {
        self.spawn(NoticeKind::Reminder, notice);
    }

    fn spawn(&self, kind: NoticeKind, notice: AppointmentNotice) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.deliver(kind, notice).await;
        });
    }

    async fn deliver(&self, kind: NoticeKind, notice: AppointmentNotice) {
        let (subject, body) = match kind {
            NoticeKind::BookingReceived => booking_received_email(&notice),
            NoticeKind::StatusChanged => status_changed_email(&notice),
            NoticeKind::Reminder => reminder_email(&notice),
        };

        if notice.receives_email {
            self.send_email(&notice.citizen_email, &subject, &body).await;
        } else {
            info!(
                email = %notice.citizen_email,
                "email notifications disabled for recipient, skipping"
            );
        }

        if let Some(phone) = &notice.citizen_phone {
            let sms = match kind {
                NoticeKind::BookingReceived => booking_received_sms(&notice),
                NoticeKind::StatusChanged => status_changed_sms(&notice),
                NoticeKind::Reminder => reminder_sms(&notice),
            };
            self.send_sms(phone, &sms).await;
        }
    }

    /// Mock email transport. A real SMTP integration slots in here without
    /// touching any caller.
    async fn send_email(&self, to: &str, subject: &str, body: &str) {
        info!(to = %to, subject = %subject, body_len = body.len(), "email sent (mock transport)");
    }

    async fn send_sms(&self, to: &str, message: &str) {
        if self.mock_sms_enabled {
            info!(to = %to, message = %message, "MOCK SMS sent");
        } else {
            warn!(to = %to, "mock SMS disabled, SMS not sent");
        }
    }
}

fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

fn booking_received_email(n: &AppointmentNotice) -> (String, String) {
    let subject = format!("Appointment Confirmation - {}", n.service_name);
    let body = format!(
        "Dear {name},\n\n\
         Your appointment for {service} has been received.\n\
         Date and Time: {date} at {time}\n\
         Confirmation Reference: {reference}\n\n\
         Please arrive 10 minutes early and bring your original identity document.\n\n\
         Thank you.\n{portal}",
        name = n.citizen_name,
        service = n.service_name,
        date = format_date(&n.appointment_at),
        time = format_time(&n.appointment_at),
        reference = n.confirmation_reference,
        portal = PORTAL_NAME,
    );
    (subject, body)
}

fn status_changed_email(n: &AppointmentNotice) -> (String, String) {
    let subject = format!("Appointment Status Updated - {}", n.service_name);
    let notes = match &n.officer_notes {
        Some(notes) if !notes.is_empty() => format!("\nOfficer Notes: {notes}"),
        _ => String::new(),
    };
    let body = format!(
        "Dear {name},\n\n\
         The status of your appointment for {service} on {date} at {time} \
         has been updated to: {status}.{notes}\n\n\
         Please check the portal for details.\n\n\
         Thank you.\n{portal}",
        name = n.citizen_name,
        service = n.service_name,
        date = format_date(&n.appointment_at),
        time = format_time(&n.appointment_at),
        status = n.status.display_name(),
        notes = notes,
        portal = PORTAL_NAME,
    );
    (subject, body)
}

fn reminder_email(n: &AppointmentNotice) -> (String, String) {
    let subject = format!("Appointment Reminder - {}", n.service_name);
    let body = format!(
        "Dear {name},\n\n\
         This is a reminder for your upcoming appointment for {service}.\n\
         Date and Time: {date} at {time}\n\
         Confirmation Reference: {reference}\n\n\
         Please bring your original identity document and any supporting \
         documents mentioned on the service page.\n\n\
         Please arrive 10 minutes early.\n\n\
         Thank you.\n{portal}",
        name = n.citizen_name,
        service = n.service_name,
        date = format_date(&n.appointment_at),
        time = format_time(&n.appointment_at),
        reference = n.confirmation_reference,
        portal = PORTAL_NAME,
    );
    (subject, body)
}

fn booking_received_sms(n: &AppointmentNotice) -> String {
    format!(
        "{prefix}: Appt received for {service} on {date} {time}. Ref: {reference}",
        prefix = SMS_PREFIX,
        service = n.service_name,
        date = format_date(&n.appointment_at),
        time = format_time(&n.appointment_at),
        reference = n.confirmation_reference,
    )
}

fn status_changed_sms(n: &AppointmentNotice) -> String {
    format!(
        "{prefix}: Status for your {service} appt on {date} {time} is now {status}. Check portal.",
        prefix = SMS_PREFIX,
        service = n.service_name,
        date = format_date(&n.appointment_at),
        time = format_time(&n.appointment_at),
        status = n.status.display_name(),
    )
}

fn reminder_sms(n: &AppointmentNotice) -> String {
    format!(
        "{prefix}: Reminder for your {service} appt on {date} at {time}. Ref: {reference}",
        prefix = SMS_PREFIX,
        service = n.service_name,
        date = format_date(&n.appointment_at),
        time = format_time(&n.appointment_at),
        reference = n.confirmation_reference,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notice() -> AppointmentNotice {
        AppointmentNotice {
            citizen_name: "Amara Perera".into(),
            citizen_email: "amara@example.com".into(),
            citizen_phone: Some("+94771234567".into()),
            receives_email: true,
            service_name: "Passport Renewal".into(),
            appointment_at: Utc.with_ymd_and_hms(2026, 9, 2, 10, 30, 0).unwrap(),
            confirmation_reference: "1F2E3D4C5B6A7988".into(),
            status: AppointmentStatus::Confirmed,
            officer_notes: None,
        }
    }

    #[test]
    fn booking_email_carries_reference_and_time() {
        let (subject, body) = booking_received_email(&notice());
        assert_eq!(subject, "Appointment Confirmation - Passport Renewal");
        assert!(body.contains("September 2, 2026"));
        assert!(body.contains("at 10:30"));
        assert!(body.contains("1F2E3D4C5B6A7988"));
        assert!(body.starts_with("Dear Amara Perera,"));
    }

    #[test]
    fn status_email_includes_notes_only_when_present() {
        let mut n = notice();
        n.status = AppointmentStatus::CancelledByOfficer;
        let (_, without_notes) = status_changed_email(&n);
        assert!(without_notes.contains("Cancelled By Officer"));
        assert!(!without_notes.contains("Officer Notes"));

        n.officer_notes = Some("Missing birth certificate".into());
        let (_, with_notes) = status_changed_email(&n);
        assert!(with_notes.contains("Officer Notes: Missing birth certificate"));
    }

    #[test]
    fn reminder_email_lists_required_documents() {
        let (subject, body) = reminder_email(&notice());
        assert!(subject.starts_with("Appointment Reminder"));
        assert!(body.contains("identity document"));
        assert!(body.contains("1F2E3D4C5B6A7988"));
    }

    #[test]
    fn sms_texts_stay_single_line() {
        let n = notice();
        for sms in [
            booking_received_sms(&n),
            status_changed_sms(&n),
            reminder_sms(&n),
        ] {
            assert!(sms.starts_with("GovAppt:"));
            assert!(!sms.contains('\n'));
        }
    }
}
