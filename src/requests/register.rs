use crate::models::user::UserRole;
use crate::requests::{clean_optional, ValidationError};
use serde::Deserialize;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

/// Sent by an admin enrolling someone into their chama.
#[derive(Debug, Deserialize)]
pub struct MemberRegistrationRequest {
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
    pub user_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<ValidRegistration, ValidationError> {
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::new(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        validate_identity(&self.fullname, &self.email, &self.phone)
    }
}

impl MemberRegistrationRequest {
    pub fn validate(&self) -> Result<(ValidRegistration, UserRole), ValidationError> {
        let role = match self.user_role.as_deref() {
            Some(role) => role
                .parse()
                .map_err(|_| ValidationError::new(format!("Unknown role '{}'", role)))?,
            None => UserRole::Member,
        };
        Ok((validate_identity(&self.fullname, &self.email, &self.phone)?, role))
    }
}

fn validate_identity(
    fullname: &str,
    email: &str,
    phone: &Option<String>,
) -> Result<ValidRegistration, ValidationError> {
    let fullname = fullname.trim();
    if fullname.is_empty() {
        return Err(ValidationError::new("Full name is required"));
    }

    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ValidationError::new("A valid email address is required"));
    }

    let phone = match clean_optional(phone) {
        Some(raw) => Some(
            normalize_phone(&raw)
                .ok_or_else(|| ValidationError::new("Phone must be a Kenyan mobile number"))?,
        ),
        None => None,
    };

    Ok(ValidRegistration {
        fullname: fullname.to_string(),
        email,
        phone,
    })
}

pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !email.contains(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

/// Normalizes `07XXXXXXXX`, `01XXXXXXXX`, `2547XXXXXXXX` and `+2547XXXXXXXX`
/// (spaces and dashes allowed) to `+254XXXXXXXXX`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let subscriber = if let Some(rest) = digits.strip_prefix("254") {
        rest
    } else if let Some(rest) = digits.strip_prefix('0') {
        rest
    } else {
        return None;
    };

    if subscriber.len() != 9 || !(subscriber.starts_with('7') || subscriber.starts_with('1')) {
        return None;
    }
    Some(format!("+254{}", subscriber))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(password: &str) -> RegisterRequest {
        RegisterRequest {
            fullname: "  Achieng Otieno ".to_string(),
            email: "Achieng@Example.com ".to_string(),
            phone: Some("0712 345 678".to_string()),
            password: password.to_string(),
        }
    }

    #[test]
    fn registration_is_normalized() {
        let valid = request("sup3rsecret").validate().unwrap();
        assert_eq!(valid.fullname, "Achieng Otieno");
        assert_eq!(valid.email, "achieng@example.com");
        assert_eq!(valid.phone.as_deref(), Some("+254712345678"));
    }

    #[test]
    fn short_password_is_rejected() {
        let err = request("short").validate().unwrap_err();
        assert!(err.0.contains("at least 8"));
    }

    #[test]
    fn blank_phone_is_dropped() {
        let mut req = request("sup3rsecret");
        req.phone = Some("   ".to_string());
        assert_eq!(req.validate().unwrap().phone, None);
    }

    #[test]
    fn phone_formats() {
        assert_eq!(normalize_phone("+254 712-345-678").as_deref(), Some("+254712345678"));
        assert_eq!(normalize_phone("254112345678").as_deref(), Some("+254112345678"));
        assert_eq!(normalize_phone("0112345678").as_deref(), Some("+254112345678"));
        assert_eq!(normalize_phone("0812345678"), None);
        assert_eq!(normalize_phone("07123456"), None);
        assert_eq!(normalize_phone("+1 555 123 4567"), None);
        assert_eq!(normalize_phone("07123456ab"), None);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("mama.mboga@chama.co.ke"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[test]
    fn member_registration_defaults_to_member_role() {
        let req = MemberRegistrationRequest {
            fullname: "Kip Rotich".to_string(),
            email: "kip@example.com".to_string(),
            phone: None,
            user_role: None,
        };
        assert_eq!(req.validate().unwrap().1, UserRole::Member);

        let req = MemberRegistrationRequest {
            user_role: Some("Treasurer".to_string()),
            ..req
        };
        assert_eq!(req.validate().unwrap().1, UserRole::Treasurer);

        let req = MemberRegistrationRequest {
            user_role: Some("patron".to_string()),
            ..req
        };
        assert!(req.validate().is_err());
    }
}
