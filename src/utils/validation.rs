use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

/// First human-readable message, fields taken in name order so the result
/// is stable. Struct-level errors sort under `__all__`.
pub fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| (field.clone(), e)))
        .map(|(field, e)| match &e.message {
            Some(message) => message.to_string(),
            None => format!("Invalid value for {field}"),
        })
        .next()
        .unwrap_or_else(|| "Invalid request".to_string())
}

pub fn error_with(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Trims every listed string field in place.
pub trait Normalize {
    fn normalize(&mut self);
}

pub fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

pub fn trim_opt(value: &mut Option<String>) {
    if let Some(v) = value {
        trim(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
        name: String,
        #[validate(email(message = "Invalid email address"))]
        email: String,
    }

    #[test]
    fn picks_first_field_alphabetically() {
        let sample = Sample {
            name: "x".into(),
            email: "not-an-email".into(),
        };
        let errors = sample.validate().unwrap_err();
        assert_eq!(first_message(&errors), "Invalid email address");
    }

    #[test]
    fn trim_helpers() {
        let mut s = "  B-204 ".to_string();
        trim(&mut s);
        assert_eq!(s, "B-204");

        let mut o = Some(" x ".to_string());
        trim_opt(&mut o);
        assert_eq!(o.as_deref(), Some("x"));
    }
}
