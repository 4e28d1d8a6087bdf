//! Client-side form validation.
//!
//! Every check here runs before a request leaves the process, so a failed
//! validation never costs a network round trip.

use std::fmt;
use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use regex::Regex;

use crate::error::Result;
use crate::i18n::Language;
use crate::motorcycle::{Motorcycle, NewMotorcycle};

/// Minimum password length accepted by the identity provider.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Highest odometer reading accepted in a form.
pub const MAX_MILEAGE: u32 = 1_000_000;

/// Oldest model year accepted in a form.
pub const MIN_YEAR: u16 = 1900;

/// A single failed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Form field name.
    pub field: &'static str,
    /// Localized message.
    pub message: String,
}

/// All field errors found in one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Check if no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// First message recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Iterate over the recorded errors.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `Ok(())` when empty, otherwise the errors as [`crate::Error::Validation`].
    ///
    /// # Errors
    ///
    /// Returns the collected errors if any were recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"))
}

fn plate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ABC1234, ABC-1234 and the Mercosul ABC1D23
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z]{3}-?[0-9][A-Z0-9][0-9]{2}$").expect("plate pattern compiles")
    })
}

/// Check an email address the same way the login form does.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Check a plate in either the old or the Mercosul format.
#[must_use]
pub fn is_valid_plate(plate: &str) -> bool {
    plate_pattern().is_match(&plate.trim().to_uppercase())
}

fn check_email(errors: &mut ValidationErrors, email: &str, lang: Language) {
    let messages = lang.messages();
    if email.trim().is_empty() {
        errors.add("email", messages.email_required);
    } else if !is_valid_email(email) {
        errors.add("email", messages.email_invalid);
    }
}

fn check_password(errors: &mut ValidationErrors, password: &str, lang: Language) {
    let messages = lang.messages();
    if password.is_empty() {
        errors.add("password", messages.password_required);
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", messages.password_min);
    }
}

/// Validate the login form.
///
/// # Errors
///
/// Returns [`crate::Error::Validation`] listing every invalid field.
pub fn validate_login(email: &str, password: &str, lang: Language) -> Result<()> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, email, lang);
    check_password(&mut errors, password, lang);
    errors.into_result()
}

/// Validate the account registration form.
///
/// # Errors
///
/// Returns [`crate::Error::Validation`] listing every invalid field.
pub fn validate_registration(
    email: &str,
    password: &str,
    confirm_password: &str,
    lang: Language,
) -> Result<()> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, email, lang);
    check_password(&mut errors, password, lang);
    if password != confirm_password {
        errors.add("confirm_password", lang.messages().password_mismatch);
    }
    errors.into_result()
}

fn check_motorcycle_fields(
    errors: &mut ValidationErrors,
    model_id: i64,
    branch_id: i64,
    plate: &str,
    mileage: u32,
    year: Option<u16>,
    lang: Language,
) {
    let messages = lang.messages();
    if model_id <= 0 {
        errors.add("model_id", messages.id_positive);
    }
    if branch_id <= 0 {
        errors.add("branch_id", messages.id_positive);
    }
    if plate.trim().is_empty() {
        errors.add("plate", messages.field_required);
    } else if !is_valid_plate(plate) {
        errors.add("plate", messages.plate_invalid);
    }
    if mileage > MAX_MILEAGE {
        errors.add("mileage", messages.mileage_range);
    }
    if let Some(year) = year {
        let max_year = u16::try_from(Utc::now().year() + 1).unwrap_or(u16::MAX);
        if !(MIN_YEAR..=max_year).contains(&year) {
            errors.add("year", messages.year_range);
        }
    }
}

/// Validate the registration form for a new motorcycle.
///
/// # Errors
///
/// Returns [`crate::Error::Validation`] listing every invalid field.
pub fn validate_new_motorcycle(draft: &NewMotorcycle, lang: Language) -> Result<()> {
    let mut errors = ValidationErrors::new();
    if draft.id.is_some_and(|id| id <= 0) {
        errors.add("id", lang.messages().id_positive);
    }
    check_motorcycle_fields(
        &mut errors,
        draft.model_id,
        draft.branch_id,
        &draft.plate,
        draft.mileage,
        draft.year,
        lang,
    );
    errors.into_result()
}

/// Validate an edited motorcycle before saving it.
///
/// # Errors
///
/// Returns [`crate::Error::Validation`] listing every invalid field.
pub fn validate_motorcycle(motorcycle: &Motorcycle, lang: Language) -> Result<()> {
    let mut errors = ValidationErrors::new();
    if motorcycle.id <= 0 {
        errors.add("id", lang.messages().id_positive);
    }
    check_motorcycle_fields(
        &mut errors,
        motorcycle.model_id,
        motorcycle.branch_id,
        &motorcycle.plate,
        motorcycle.mileage,
        motorcycle.year,
        lang,
    );
    errors.into_result()
}
