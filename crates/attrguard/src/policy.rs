//! TOML policy files: schema, validators, and logging for one resource type.

use std::ops::Range;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use attrguard_validate::parse_expression;
use attrguard_validate::ConfigError;
use attrguard_validate::Expression;
use attrguard_validate::Schema;
use attrguard_validate::Suite;
use attrguard_validate::Validator;
use serde::Deserialize;
use thiserror::Error;
use toml::Spanned;
use tracing::debug;

use crate::config::LoggingConfig;

/// Source information for where a policy came from
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub file_path: PathBuf,
    pub content: String,
}

/// One problem found while loading a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyError {
    /// Dotted position in the policy, e.g. `validators[1].paths`
    pub field_path: String,
    pub message: String,
    /// Byte range in the policy source, when known
    pub span: Option<Range<usize>>,
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field_path, self.message)
    }
}

/// Error type for policy loading failures
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("failed to read policy {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("policy {} has {} error(s)", source_info.file_path.display(), errors.len())]
    Invalid {
        source_info: SourceInfo,
        errors: Vec<PolicyError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
enum ValidatorKind {
    RequiredTogether,
    ConflictsWith,
    ExactlyOneOf,
    AtLeastOneOf,
    AlsoRequires,
    Regex,
    Length,
    Range,
    OneOf,
}

impl ValidatorKind {
    /// Whether the optional setting `field` configures this kind.
    fn accepts(self, field: &str) -> bool {
        match self {
            ValidatorKind::Regex => matches!(field, "pattern" | "message"),
            ValidatorKind::Length | ValidatorKind::Range => matches!(field, "min" | "max"),
            ValidatorKind::OneOf => field == "values",
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPolicy {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    schema: Schema,
    #[serde(default)]
    validators: Vec<RawValidator>,
}

/// One `[[validators]]` table, before its kind is interpreted.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawValidator {
    kind: Spanned<String>,
    #[serde(default)]
    paths: Vec<Spanned<String>>,
    path: Option<Spanned<String>>,
    scope: Option<Spanned<String>>,
    min: Option<Spanned<f64>>,
    max: Option<Spanned<f64>>,
    pattern: Option<Spanned<String>>,
    message: Option<Spanned<String>>,
    values: Option<Spanned<Vec<String>>>,
}

/// A loaded policy.
#[derive(Debug, Clone)]
pub struct Policy {
    pub logging: LoggingConfig,
    pub schema: Schema,
    pub suite: Suite,
}

impl Policy {
    /// Load a policy from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|error| PolicyLoadError::Io {
            path: path.to_path_buf(),
            error,
        })?;

        Self::parse(&content).map_err(|errors| PolicyLoadError::Invalid {
            source_info: SourceInfo {
                file_path: path.to_path_buf(),
                content,
            },
            errors,
        })
    }

    /// Parse a policy, collecting every problem before giving up.
    pub fn parse(content: &str) -> Result<Self, Vec<PolicyError>> {
        let raw: RawPolicy = toml::from_str(content).map_err(|err| {
            vec![PolicyError {
                field_path: "<policy>".to_string(),
                message: err.message().to_string(),
                span: err.span(),
            }]
        })?;

        let mut errors = Vec::new();
        let mut suite = Suite::new();
        for (idx, raw_validator) in raw.validators.iter().enumerate() {
            let mut builder = Builder {
                field_path: format!("validators[{}]", idx),
                errors: &mut errors,
            };
            if let Some(validator) = builder.build(raw_validator) {
                suite.push(validator);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        debug!(validators = suite.len(), "loaded policy");
        Ok(Self {
            logging: raw.logging,
            schema: raw.schema,
            suite,
        })
    }
}

struct Builder<'a> {
    field_path: String,
    errors: &'a mut Vec<PolicyError>,
}

impl Builder<'_> {
    fn error(&mut self, field: &str, message: impl Into<String>, span: Option<Range<usize>>) {
        self.errors.push(PolicyError {
            field_path: format!("{}.{}", self.field_path, field),
            message: message.into(),
            span,
        });
    }

    fn build(&mut self, raw: &RawValidator) -> Option<Validator> {
        let kind = match ValidatorKind::from_str(raw.kind.get_ref()) {
            Ok(kind) => kind,
            Err(_) => {
                self.error(
                    "kind",
                    format!("unknown validator kind \"{}\"", raw.kind.get_ref()),
                    Some(raw.kind.span()),
                );
                return None;
            }
        };

        if !self.settings_apply(kind, raw) {
            return None;
        }

        let scope = match &raw.scope {
            Some(scope) => Some(self.expression("scope", scope)?),
            None => None,
        };

        let mut error_span = raw.kind.span();
        let validator = match kind {
            ValidatorKind::RequiredTogether
            | ValidatorKind::ConflictsWith
            | ValidatorKind::ExactlyOneOf
            | ValidatorKind::AtLeastOneOf
            | ValidatorKind::AlsoRequires => {
                if let Some(path) = &raw.path {
                    self.error("path", "use `paths` for co-occurrence validators", Some(path.span()));
                    return None;
                }
                let expressions = self.expressions(&raw.paths)?;
                match kind {
                    ValidatorKind::RequiredTogether => Validator::required_together(expressions),
                    ValidatorKind::ConflictsWith => Validator::conflicts_with(expressions),
                    ValidatorKind::ExactlyOneOf => Validator::exactly_one_of(expressions),
                    ValidatorKind::AtLeastOneOf => Validator::at_least_one_of(expressions),
                    _ => {
                        let mut expressions = expressions.into_iter();
                        match expressions.next() {
                            Some(primary) => Validator::also_requires(primary, expressions),
                            None => Err(ConfigError::TooFewExpressions {
                                kind: "also_requires",
                                min: 2,
                                got: 0,
                            }),
                        }
                    }
                }
            }
            ValidatorKind::Regex => {
                let expression = self.single_path(raw)?;
                let Some(pattern) = &raw.pattern else {
                    self.error("pattern", "missing `pattern`", Some(raw.kind.span()));
                    return None;
                };
                error_span = pattern.span();
                let message = raw.message.as_ref().map(|m| m.get_ref().clone());
                Validator::regex(expression, pattern.get_ref(), message)
            }
            ValidatorKind::Length => {
                let expression = self.single_path(raw)?;
                let min = self.count("min", raw.min.as_ref())?;
                let max = self.count("max", raw.max.as_ref())?;
                Validator::length(expression, min, max)
            }
            ValidatorKind::Range => {
                let expression = self.single_path(raw)?;
                Validator::range(
                    expression,
                    raw.min.as_ref().map(|m| *m.get_ref()),
                    raw.max.as_ref().map(|m| *m.get_ref()),
                )
            }
            ValidatorKind::OneOf => {
                let expression = self.single_path(raw)?;
                let values = raw.values.as_ref().map(|v| v.get_ref().clone());
                Validator::one_of(expression, values.unwrap_or_default())
            }
        };

        let validator = match (validator, scope) {
            (Ok(validator), Some(scope)) => {
                if let Some(raw_scope) = &raw.scope {
                    error_span = raw_scope.span();
                }
                validator.within(scope)
            }
            (validator, _) => validator,
        };

        match validator {
            Ok(validator) => Some(validator),
            Err(err) => {
                self.error("kind", err.to_string(), Some(error_span));
                None
            }
        }
    }

    /// Report every optional setting the kind does not use.
    fn settings_apply(&mut self, kind: ValidatorKind, raw: &RawValidator) -> bool {
        let settings = [
            ("min", raw.min.as_ref().map(Spanned::span)),
            ("max", raw.max.as_ref().map(Spanned::span)),
            ("pattern", raw.pattern.as_ref().map(Spanned::span)),
            ("message", raw.message.as_ref().map(Spanned::span)),
            ("values", raw.values.as_ref().map(Spanned::span)),
        ];

        let mut apply = true;
        for (field, span) in settings {
            if span.is_some() && !kind.accepts(field) {
                self.error(
                    field,
                    format!("`{}` does not apply to {} validators", field, raw.kind.get_ref()),
                    span,
                );
                apply = false;
            }
        }
        apply
    }

    fn single_path(&mut self, raw: &RawValidator) -> Option<Expression> {
        if !raw.paths.is_empty() {
            let span = raw.paths.first().map(Spanned::span);
            self.error("paths", "use `path` for value validators", span);
        }
        match &raw.path {
            Some(path) => self.expression("path", path),
            None => {
                self.error("path", "missing `path`", Some(raw.kind.span()));
                None
            }
        }
    }

    fn expressions(&mut self, paths: &[Spanned<String>]) -> Option<Vec<Expression>> {
        let parsed: Vec<Option<Expression>> =
            paths.iter().map(|path| self.expression("paths", path)).collect();
        parsed.into_iter().collect()
    }

    /// Parse one path string, mapping syntax error spans into the policy
    /// source. The TOML span includes the opening quote.
    fn expression(&mut self, field: &str, path: &Spanned<String>) -> Option<Expression> {
        match parse_expression(path.get_ref()) {
            Ok(expression) => Some(expression),
            Err(errs) => {
                let outer = path.span();
                let base = outer.start + 1;
                for err in errs {
                    let start = (base + err.span.start).min(outer.end);
                    let end = (base + err.span.end).clamp(start, outer.end);
                    self.error(
                        field,
                        format!("invalid path expression \"{}\": {}", path.get_ref(), err.message),
                        Some(start..end),
                    );
                }
                None
            }
        }
    }

    fn count(&mut self, field: &str, value: Option<&Spanned<f64>>) -> Option<Option<usize>> {
        let Some(value) = value else {
            return Some(None);
        };
        let n = *value.get_ref();
        if n < 0.0 || n.fract() != 0.0 {
            self.error(field, "must be a non-negative integer", Some(value.span()));
            return None;
        }
        Some(Some(n as usize))
    }
}
