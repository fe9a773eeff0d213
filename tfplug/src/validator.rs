use crate::types::{Diagnostics, Dynamic};

pub trait Validator: Send + Sync {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_most(max: usize) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }
}

impl Validator for StringLengthValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            let len = s.chars().count();
            if let Some(min) = self.min {
                if len < min {
                    diagnostics.add_error(
                        format!("{} must have minimum length of {}", attribute_path, min),
                        Some(format!("Got length {}", len)),
                    );
                }
            }
            if let Some(max) = self.max {
                if len > max {
                    diagnostics.add_error(
                        format!("{} must have maximum length of {}", attribute_path, max),
                        Some(format!("Got length {}", len)),
                    );
                }
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: regex::Regex, description: impl Into<String>) -> Self {
        Self {
            pattern,
            description: description.into(),
        }
    }
}

impl Validator for StringPatternValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if !self.pattern.is_match(s) {
                diagnostics.add_error(
                    format!("{} must match {}", attribute_path, self.description),
                    Some(format!("Value '{}' does not match pattern", s)),
                );
            }
        }
    }
}

/// Restricts a string to a fixed set of values, typically an AWS enum
pub struct OneOfValidator {
    pub values: Vec<String>,
}

impl OneOfValidator {
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        Self {
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
        }
    }
}

impl Validator for OneOfValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_string() {
            if !self.values.iter().any(|v| v == s) {
                diagnostics.add_error(
                    format!("{} must be one of: {}", attribute_path, self.values.join(", ")),
                    Some(format!("Got '{}'", s)),
                );
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for NumberRangeValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.add_error(
                        format!("{} must be at least {}", attribute_path, min),
                        Some(format!("Got {}", n)),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.add_error(
                        format!("{} must be at most {}", attribute_path, max),
                        Some(format!("Got {}", n)),
                    );
                }
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLengthValidator {
    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for ListLengthValidator {
    fn validate(&self, value: &Dynamic, attribute_path: &str, diagnostics: &mut Diagnostics) {
        if let Dynamic::List(items) = value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.add_error(
                        format!("{} must have at least {} items", attribute_path, min),
                        Some(format!("Got {} items", items.len())),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.add_error(
                        format!("{} must have at most {} items", attribute_path, max),
                        Some(format!("Got {} items", items.len())),
                    );
                }
            }
        }
    }
}
