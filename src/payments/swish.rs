//! Swish payment-request codes for the manual-transfer rail.
//!
//! The builder is deterministic: the same inputs always produce the same
//! string, so the QR image can be re-rendered on every page load without
//! side effects. The guest pays the couple directly in their banking app
//! and then attests the payment; there is no cryptographic proof that the
//! transfer actually happened. That trust gap is inherited from the
//! product design, not a bug.

use qrcode::{render::svg, QrCode};

use crate::error::{AppError, Result};

/// Lock mask understood by the paying app: amount, recipient and message
/// are all locked against editing.
const LOCK_MASK: &str = "6";

/// Swish caps the free-text message field at 50 characters.
const NOTE_MAX_CHARS: usize = 50;

/// Country calling code substituted for the national trunk prefix. Fixed
/// policy: the system only supports Swedish Swish handles.
const COUNTRY_CODE: &str = "46";

#[derive(Debug, Clone)]
pub struct SwishRequest<'a> {
    /// The couple's Swish handle, typically a phone number such as
    /// `0701234567` or `+46701234567`.
    pub handle: &'a str,
    /// Contribution amount in SEK.
    pub amount: f64,
    pub gift_name: &'a str,
    pub donor_name: Option<&'a str>,
    pub message: Option<&'a str>,
}

/// Builds the `C{handle};{amount};{note};{lock}` payment-request string.
pub fn build_payment_code(request: &SwishRequest<'_>) -> Result<String> {
    let handle = normalize_handle(request.handle)?;

    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(AppError::InvalidSwishRequest(
            "Amount must be a positive number".to_string(),
        ));
    }

    let note = compose_note(request.gift_name, request.donor_name, request.message);

    Ok(format!(
        "C{};{};{};{}",
        handle,
        format_amount(request.amount),
        note,
        LOCK_MASK
    ))
}

/// Renders a payment code as an SVG QR image for the guest's camera.
pub fn qr_svg(code: &str) -> Result<String> {
    let qr = QrCode::new(code.as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to encode QR: {}", e)))?;

    Ok(qr
        .render::<svg::Color>()
        .min_dimensions(240, 240)
        .build())
}

/// Strips a leading `+` and rewrites a national trunk `0` to the country
/// calling code, so `0701234567` and `+46701234567` both become
/// `46701234567`.
fn normalize_handle(handle: &str) -> Result<String> {
    let trimmed = handle.trim().trim_start_matches('+');

    let normalized = match trimmed.strip_prefix('0') {
        Some(rest) => format!("{}{}", COUNTRY_CODE, rest),
        None => trimmed.to_string(),
    };

    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidSwishRequest(
            "Missing or malformed Swish handle".to_string(),
        ));
    }

    Ok(normalized)
}

fn compose_note(gift_name: &str, donor_name: Option<&str>, message: Option<&str>) -> String {
    let mut note = format!("Wedding gift: {}", gift_name);
    if let Some(donor) = donor_name.map(str::trim).filter(|s| !s.is_empty()) {
        note.push_str(&format!(" from {}", donor));
    }
    if let Some(msg) = message.map(str::trim).filter(|s| !s.is_empty()) {
        note.push_str(&format!(" - {}", msg));
    }
    truncate_note(&note)
}

/// Keeps the note within the protocol's 50-character field; a truncated
/// note ends in `...` so the shortening is visible to the guest.
fn truncate_note(note: &str) -> String {
    if note.chars().count() <= NOTE_MAX_CHARS {
        return note.to_string();
    }
    let mut truncated: String = note.chars().take(NOTE_MAX_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Amounts render without a currency symbol: whole amounts without a
/// decimal point, fractional ones as-is.
fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{}", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(handle: &'a str, amount: f64, gift: &'a str) -> SwishRequest<'a> {
        SwishRequest {
            handle,
            amount,
            gift_name: gift,
            donor_name: None,
            message: None,
        }
    }

    #[test]
    fn builds_code_from_national_number() {
        let code = build_payment_code(&request("0701234567", 400.0, "Honeymoon")).unwrap();
        assert_eq!(code, "C46701234567;400;Wedding gift: Honeymoon;6");
    }

    #[test]
    fn strips_plus_prefix() {
        let code = build_payment_code(&request("+46701234567", 250.0, "Stand mixer")).unwrap();
        assert!(code.starts_with("C46701234567;250;"));
    }

    #[test]
    fn builder_is_deterministic() {
        let req = SwishRequest {
            handle: "0701234567",
            amount: 99.5,
            gift_name: "China set",
            donor_name: Some("Anna"),
            message: Some("Congrats!"),
        };
        assert_eq!(
            build_payment_code(&req).unwrap(),
            build_payment_code(&req).unwrap()
        );
    }

    #[test]
    fn includes_donor_and_message_in_note() {
        let req = SwishRequest {
            handle: "0701234567",
            amount: 400.0,
            gift_name: "Honeymoon",
            donor_name: Some("Anna"),
            message: Some("Congrats!"),
        };
        let code = build_payment_code(&req).unwrap();
        assert!(code.contains("Wedding gift: Honeymoon from Anna - Congrats!"));
    }

    #[test]
    fn long_note_truncates_to_fifty_chars_ending_in_ellipsis() {
        let req = SwishRequest {
            handle: "0701234567",
            amount: 100.0,
            gift_name: "An extremely long gift name that overflows the field",
            donor_name: Some("Alexandra Bernadotte"),
            message: None,
        };
        let code = build_payment_code(&req).unwrap();
        let note = code.split(';').nth(2).unwrap();
        assert_eq!(note.chars().count(), 50);
        assert!(note.ends_with("..."));
    }

    #[test]
    fn fractional_amount_keeps_decimals() {
        let code = build_payment_code(&request("0701234567", 99.99, "Vase")).unwrap();
        assert!(code.contains(";99.99;"));
    }

    #[test]
    fn rejects_missing_handle() {
        let err = build_payment_code(&request("", 100.0, "Vase")).unwrap_err();
        assert!(matches!(err, AppError::InvalidSwishRequest(_)));
    }

    #[test]
    fn rejects_non_numeric_handle() {
        let err = build_payment_code(&request("not-a-number", 100.0, "Vase")).unwrap_err();
        assert!(matches!(err, AppError::InvalidSwishRequest(_)));
    }

    #[test]
    fn rejects_non_positive_amount() {
        assert!(build_payment_code(&request("0701234567", 0.0, "Vase")).is_err());
        assert!(build_payment_code(&request("0701234567", -5.0, "Vase")).is_err());
        assert!(build_payment_code(&request("0701234567", f64::NAN, "Vase")).is_err());
    }

    #[test]
    fn renders_svg_qr() {
        let svg = qr_svg("C46701234567;400;Wedding gift: Honeymoon;6").unwrap();
        assert!(svg.contains("<svg"));
    }
}
