use std::collections::BTreeMap;

use thiserror::Error;

/// Per-field validation failures for a request body or query string
#[derive(Debug, Default, Error)]
#[error("Invalid request: {}", self.summary())]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        // First failure per field wins
        self.fields.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add(field, message);
        }
    }

    /// Character-length bounds, inclusive
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.add(field, format!("must be at least {} characters", min));
        } else if len > max {
            self.add(field, format!("must be at most {} characters", max));
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        let valid = value
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
            .unwrap_or(false);
        self.check(valid, field, "must be an email address");
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn summary(&self) -> String {
        self.fields
            .iter()
            .map(|(field, message)| format!("{} {}", field, message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Input that must be checked before it reaches the data layer
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_first_error_per_field() {
        let mut errors = ValidationErrors::new();
        errors.length("username", "", 1, 25);
        errors.add("username", "second message");
        errors.email("email", "not-an-email");

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.fields()["username"], "must be at least 1 characters");
        assert_eq!(err.fields()["email"], "must be an email address");
        assert!(err.to_string().contains("email must be an email address"));
    }

    #[test]
    fn passes_when_nothing_recorded() {
        let mut errors = ValidationErrors::new();
        errors.length("name", "Acme", 1, 10);
        errors.email("email", "a@b.io");
        errors.check(true, "salary", "must be non-negative");
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut errors = ValidationErrors::new();
        errors.length("name", "ééé", 1, 3);
        assert!(errors.is_empty());
    }
}
