use std::fmt::Display;

use tracing::debug;

use super::misuse;
use super::Check;
use crate::diagnostics::Diagnostic;
use crate::diagnostics::Diagnostics;
use crate::error::ConfigError;
use crate::path::Expression;
use crate::path::Location;
use crate::resolve::Resolver;
use crate::value::Value;
use crate::value::ValueState;

/// Inclusive bounds with at least one side set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    min: Option<T>,
    max: Option<T>,
}

impl<T: PartialOrd + Display + Copy> Bounds<T> {
    pub(crate) fn new(kind: &'static str, min: Option<T>, max: Option<T>) -> Result<Self, ConfigError> {
        match (min, max) {
            (None, None) => Err(ConfigError::MissingBounds { kind }),
            (Some(min), Some(max)) if min > max => Err(ConfigError::InvertedBounds {
                min: min.to_string(),
                max: max.to_string(),
            }),
            _ => Ok(Self { min, max }),
        }
    }

    pub fn min(&self) -> Option<T> {
        self.min
    }

    pub fn max(&self) -> Option<T> {
        self.max
    }

    pub fn contains(&self, value: T) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

impl<T: Display> Display for Bounds<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => write!(f, "between {} and {}", min, max),
            (Some(min), None) => write!(f, "at least {}", min),
            (None, Some(max)) => write!(f, "at most {}", max),
            (None, None) => Ok(()),
        }
    }
}

/// Apply a value-shape check to every Known value `expression` resolves to.
///
/// Null and Unknown values are skipped, as are values of a different shape
/// than the check applies to.
pub(super) fn evaluate(
    check: &Check,
    expression: &Expression,
    anchor: Option<&Location>,
    resolver: &Resolver<'_>,
    diagnostics: &mut Diagnostics,
) {
    let resolution = match resolver.resolve(expression, anchor) {
        Ok(resolution) => resolution,
        Err(err) => {
            diagnostics.push(misuse(err));
            return;
        }
    };
    if !resolution.is_determinate() {
        debug!(%expression, "skipping values below unknown collections");
    }

    for location in &resolution.locations {
        let Some(ValueState::Known(value)) = resolver.tree().state(location) else {
            continue;
        };
        if let Some((summary, description)) = violation(check, value) {
            diagnostics.push(Diagnostic::error(
                location.clone(),
                summary,
                format!("Attribute {} {}, got: {}", location, description, value),
            ));
        }
    }
}

/// Summary and description of the failed predicate, if `value` violates it.
fn violation(check: &Check, value: &Value) -> Option<(&'static str, String)> {
    match check {
        Check::Regex { regex, message, .. } => {
            let s = value.as_str()?;
            if regex.is_match(s) {
                return None;
            }
            let description = message
                .clone()
                .unwrap_or_else(|| format!("value must match regular expression '{}'", regex.as_str()));
            Some(("Invalid Attribute Value Match", description))
        }
        Check::Length { bounds, .. } => {
            let (length, description) = match value {
                Value::String(s) => (s.chars().count(), format!("string length must be {}", bounds)),
                _ => (value.len()?, format!("must contain {} elements", bounds)),
            };
            (!bounds.contains(length)).then_some(("Invalid Attribute Value Length", description))
        }
        Check::Range { bounds, .. } => {
            let n = value.as_f64()?;
            (!bounds.contains(n)).then(|| ("Invalid Attribute Value", format!("value must be {}", bounds)))
        }
        Check::OneOf { values, .. } => {
            let s = value.as_str()?;
            if values.iter().any(|allowed| allowed == s) {
                return None;
            }
            Some(("Invalid Attribute Value Match", format!("value must be one of: {:?}", values)))
        }
        _ => None,
    }
}
