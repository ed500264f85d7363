//! Local validation of sign-up and checkout input.

use freshcart_core::{Email, EmailError};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::commerce::{ShippingAddress, SignUpRequest};

const MIN_PASSWORD_LENGTH: usize = 6;
const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

/// Input rejected before reaching the service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,
    #[error("Password must contain a letter and a digit")]
    PasswordTooSimple,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Phone number must have {MIN_PHONE_DIGITS} to {MAX_PHONE_DIGITS} digits")]
    InvalidPhone,
}

/// Raw sign-up form input.
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub re_password: SecretString,
    pub phone: String,
}

impl SignUpForm {
    /// Check every field and build the request body.
    ///
    /// # Errors
    ///
    /// Returns the first failing field's error.
    pub fn validate(self) -> Result<SignUpRequest, ValidationError> {
        let name = required("Name", &self.name)?;
        let email = Email::parse(&self.email)?;

        let password = self.password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort);
        }
        if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::PasswordTooSimple);
        }
        if password != self.re_password.expose_secret() {
            return Err(ValidationError::PasswordMismatch);
        }

        Ok(SignUpRequest {
            name,
            email,
            password: password.to_string(),
            re_password: password.to_string(),
            phone: validate_phone(&self.phone)?,
        })
    }
}

impl std::fmt::Debug for SignUpForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("re_password", &"[REDACTED]")
            .field("phone", &self.phone)
            .finish()
    }
}

/// Trim and check a shipping address.
///
/// # Errors
///
/// Returns `Required` for a blank field or `InvalidPhone`.
pub fn validate_shipping_address(
    details: &str,
    phone: &str,
    city: &str,
) -> Result<ShippingAddress, ValidationError> {
    Ok(ShippingAddress {
        details: required("Address details", details)?,
        phone: validate_phone(phone)?,
        city: required("City", city)?,
    })
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Digits with an optional leading `+`.
fn validate_phone(phone: &str) -> Result<String, ValidationError> {
    let phone = required("Phone", phone)?;
    let digits = phone.strip_prefix('+').unwrap_or(&phone);
    if !digits.chars().all(|c| c.is_ascii_digit())
        || !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
    {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(phone)
}
