use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    /// How often the reminder job rescans for upcoming confirmed appointments.
    pub reminder_interval_secs: u64,
    pub mock_sms_enabled: bool,
    /// When true, status updates must follow the lifecycle table in models.rs.
    pub strict_status_transitions: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(24);
        let reminder_interval_secs = env::var("REMINDER_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(3600);
        let mock_sms_enabled = env::var("MOCK_SMS_ENABLED")
            .map(|s| s == "true" || s == "1")
            .unwrap_or(true);
        let strict_status_transitions = env::var("STRICT_STATUS_TRANSITIONS")
            .map(|s| s != "false" && s != "0")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            bind_addr,
            session_ttl_hours,
            reminder_interval_secs,
            mock_sms_enabled,
            strict_status_transitions,
        })
    }
}
