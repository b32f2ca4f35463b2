//! Input validation for API requests.
//!
//! Validators return `Result<(), String>` so handlers can collect several
//! failures into one `ApiError` via `ValidationErrorBuilder`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Permissive mobile-money phone check: optional leading +, then at
    /// least 8 digits/spaces/dashes/parens.
    static ref PHONE_REGEX: Regex = Regex::new(r"^[+]?[\d\s\-()]{8,}$").unwrap();

    /// UUID v4 as stored in our id columns
    static ref UUID_REGEX: Regex = Regex::new(
        r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$"
    ).unwrap();
}

pub fn validate_phone_number(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }
    if !PHONE_REGEX.is_match(phone) {
        return Err("Enter a valid phone number".to_string());
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("Title is required".to_string());
    }
    if title.len() > 200 {
        return Err("Title is too long (max 200 characters)".to_string());
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), String> {
    if description.trim().is_empty() {
        return Err("Description is required".to_string());
    }
    if description.len() > 10_000 {
        return Err("Description is too long (max 10000 characters)".to_string());
    }
    Ok(())
}

/// Free courses must be priced at 0; paid courses must cost something.
pub fn validate_price(price: f64, is_free: bool) -> Result<(), String> {
    if !price.is_finite() {
        return Err("Price must be a number".to_string());
    }
    if is_free {
        if price != 0.0 {
            return Err("Free courses must have price 0".to_string());
        }
        return Ok(());
    }
    if price <= 0.0 {
        return Err("Price must be greater than 0 for paid courses".to_string());
    }
    Ok(())
}

/// Media references are plain http(s) URLs, stored verbatim.
pub fn validate_media_url(url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("URL is required".to_string());
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".to_string());
    }
    if url.len() > 2048 {
        return Err("URL is too long (max 2048 characters)".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.len() > 254 {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }
    Ok(())
}

pub fn validate_uuid(id: &str, field: &str) -> Result<(), String> {
    if UUID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(format!("{} must be a valid UUID", field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_accepts_international_formats() {
        assert!(validate_phone_number("+252 61 7211084").is_ok());
        assert!(validate_phone_number("0617211084").is_ok());
        assert!(validate_phone_number("+1 (555) 123-4567").is_ok());
        assert!(validate_phone_number("  +252617211084  ").is_ok());
    }

    #[test]
    fn phone_rejects_garbage() {
        assert!(validate_phone_number("abc").is_err());
        assert!(validate_phone_number("").is_err());
        assert!(validate_phone_number("12345").is_err());
        assert!(validate_phone_number("+252-61-phone").is_err());
    }

    #[test]
    fn price_rules_follow_free_flag() {
        assert!(validate_price(0.0, true).is_ok());
        assert!(validate_price(10.0, true).is_err());
        assert!(validate_price(10.0, false).is_ok());
        assert!(validate_price(0.0, false).is_err());
        assert!(validate_price(-5.0, false).is_err());
        assert!(validate_price(f64::NAN, false).is_err());
    }

    #[test]
    fn media_url_scheme_required() {
        assert!(validate_media_url("https://cdn.example.com/v.mp4").is_ok());
        assert!(validate_media_url("http://youtube.com/watch?v=x").is_ok());
        assert!(validate_media_url("ftp://example.com/v.mp4").is_err());
        assert!(validate_media_url("").is_err());
    }

    #[test]
    fn uuid_check() {
        let id = uuid::Uuid::new_v4().to_string();
        assert!(validate_uuid(&id, "course_id").is_ok());
        assert!(validate_uuid("not-a-uuid", "course_id").is_err());
        assert_eq!(
            validate_uuid("x", "course_id").unwrap_err(),
            "course_id must be a valid UUID"
        );
    }

    #[test]
    fn title_and_description_bounds() {
        assert!(validate_title("Intro to Accounting").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
        assert!(validate_description("A short course.").is_ok());
        assert!(validate_description("").is_err());
    }

    #[test]
    fn email_and_password_basics() {
        assert!(validate_email("amina@example.com").is_ok());
        assert!(validate_email("nope").is_err());
        assert!(validate_password("hunter2hunter2").is_ok());
        assert!(validate_password("short").is_err());
    }
}
