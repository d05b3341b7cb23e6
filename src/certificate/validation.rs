//! Format checks for certificate input.
//!
//! Every check here runs before any store call. Messages are user-facing and
//! carry a suggestion on how to fix the value.

use std::fmt;

use chrono::{Datelike, Local};
use lazy_static::lazy_static;
use regex::Regex;

use super::model::CreateCertificateRequest;

pub const MIN_GRADUATION_YEAR: i32 = 1980;

lazy_static! {
    static ref RUT_PATTERN: Regex = Regex::new(r"^[0-9]{7,8}-[0-9kK]$").unwrap();
    static ref PHONE_PATTERN: Regex = Regex::new(r"^\+569[0-9]{8}$").unwrap();
    static ref PARTIAL_RUT_PATTERN: Regex = Regex::new(r"^[0-9]{7,9}-[0-9K]$").unwrap();
    static ref NINE_DIGITS: Regex = Regex::new(r"^[0-9]{9}$").unwrap();
}

/// Format-only RUT check. The check digit is not verified.
pub fn is_valid_rut(value: &str) -> bool {
    RUT_PATTERN.is_match(value)
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_PATTERN.is_match(value)
}

/// Normalizes RUT keystrokes: drops dots and whitespace, upper-cases `k`,
/// keeps one character after an existing hyphen and inserts the hyphen once
/// nine digits have been typed.
pub fn format_rut_input(raw: &str) -> String {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .map(|c| if c == 'k' { 'K' } else { c })
        .collect();

    if cleaned.contains('-') {
        let parts: Vec<&str> = cleaned.split('-').collect();
        if parts.len() == 2 && parts[1].chars().count() > 1 {
            let check = parts[1].chars().next().map(String::from).unwrap_or_default();
            cleaned = format!("{}-{}", parts[0], check);
        }
        if PARTIAL_RUT_PATTERN.is_match(&cleaned) {
            return cleaned;
        }
    }

    if NINE_DIGITS.is_match(&cleaned) {
        let (body, check) = cleaned.split_at(cleaned.len() - 1);
        return format!("{}-{}", body, check);
    }

    cleaned
}

/// Stored form of a submitted RUT: surrounding whitespace dropped and the
/// check digit upper-cased. Unlike [`format_rut_input`] no hyphen is
/// inserted, so a RUT typed without one still fails validation.
pub fn normalize_rut(value: &str) -> String {
    value.trim().to_uppercase()
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// Validation error with a user-facing message. `Display` prints only the
/// message and suggestion; `field` is for callers that need to know which
/// input failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} no puede estar vacío", label))
            .with_suggestion(format!("Ingrese {}", label.to_lowercase()))
    }

    pub fn invalid_rut(field: &str) -> Self {
        Self::new(field, "El RUT debe tener el formato correcto")
            .with_suggestion("Ejemplo: 17616251-1")
    }

    pub fn invalid_phone(field: &str) -> Self {
        Self::new(field, "El número de WhatsApp debe tener el formato correcto")
            .with_suggestion("Ejemplo: +56912345678")
    }

    pub fn year_out_of_range(field: &str, year: i32, max: i32) -> Self {
        Self::new(field, format!("El año {} está fuera de rango", year)).with_suggestion(
            format!("Ingrese un año entre {} y {}", MIN_GRADUATION_YEAR, max),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Default, Clone)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

pub fn validate_rut(value: &str, field: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, "RUT"));
    } else if !is_valid_rut(value) {
        errors.add(ValidationError::invalid_rut(field));
    }
}

/// Optional phone: only checked when a non-empty value is present.
pub fn validate_phone_optional(value: Option<&str>, field: &str, errors: &mut ValidationErrors) {
    match value.map(str::trim) {
        Some(phone) if !phone.is_empty() && !is_valid_phone(phone) => {
            errors.add(ValidationError::invalid_phone(field));
        }
        _ => {}
    }
}

pub fn validate_graduation_year(year: i32, field: &str, errors: &mut ValidationErrors) {
    let max = current_year();
    if !(MIN_GRADUATION_YEAR..=max).contains(&year) {
        errors.add(ValidationError::year_out_of_range(field, year, max));
    }
}

impl CreateCertificateRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        validate_required(&self.name, "name", "Nombre", &mut errors);
        validate_rut(&normalize_rut(&self.rut), "rut", &mut errors);
        validate_required(&self.career, "career", "Carrera", &mut errors);
        validate_graduation_year(self.graduation_year, "graduation_year", &mut errors);
        validate_phone_optional(self.whatsapp.as_deref(), "whatsapp", &mut errors);

        errors.into_result()
    }
}
