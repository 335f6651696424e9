use base64::{Engine as _, engine::general_purpose::STANDARD};
use qrcode::QrCode;
use qrcode::render::svg;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum VisualCodeError {
    #[error("QR generation failed: {0}")]
    Qr(#[from] qrcode::types::QrError),
}

/// Confirmation reference handed to the citizen at booking time.
///
/// Full 128 bits of randomness in an uppercase hex alphabet. The unique
/// index on appointments.confirmation_reference and the slot index on
/// (service_id, appointment_at) are the actual collision guards; the
/// reference only needs to be unguessable and readable over the phone.
pub fn generate_confirmation_reference() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()
}

/// Render the confirmation reference as a scannable QR, returned as a
/// self-contained data URL the frontend can drop into an <img> tag.
pub fn confirmation_qr_data_url(reference: &str) -> Result<String, VisualCodeError> {
    let code = QrCode::new(reference.as_bytes())?;

    let svg_string = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .max_dimensions(300, 300)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .quiet_zone(true)
        .build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(svg_string.as_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_is_32_uppercase_hex_chars() {
        let r = generate_confirmation_reference();
        assert_eq!(r.len(), 32);
        assert!(r.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn references_do_not_repeat() {
        let a = generate_confirmation_reference();
        let b = generate_confirmation_reference();
        assert_ne!(a, b);
    }

    #[test]
    fn qr_is_svg_data_url() {
        let url = confirmation_qr_data_url("1234ABCD").unwrap();
        assert!(url.starts_with("data:image/svg+xml;base64,"));

        let payload = url.trim_start_matches("data:image/svg+xml;base64,");
        let decoded = STANDARD.decode(payload).unwrap();
        let svg_text = String::from_utf8(decoded).unwrap();
        assert!(svg_text.contains("<svg"));
    }
}
