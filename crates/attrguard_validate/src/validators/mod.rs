//! Constraint evaluators.
//!
//! Validators are a closed set of checks. Co-occurrence checks
//! (required-together, conflicts-with, exactly-one-of, at-least-one-of,
//! also-requires) share one two-phase evaluation: resolve and classify every
//! expression, then apply the kind's rule. Value-shape checks (regex, length,
//! range, one-of) test each known value an expression resolves to.
//!
//! A validator never mutates the tree and keeps no state between calls.

mod cooccurrence;
mod value_shape;

use regex::Regex;
use tracing::debug;
use tracing::warn;

use crate::diagnostics::Diagnostic;
use crate::diagnostics::Diagnostics;
use crate::error::ConfigError;
use crate::error::ResolveError;
use crate::path::Expression;
use crate::path::Expressions;
use crate::path::Location;
use crate::resolve::Resolver;
use crate::tree::ConfigTree;

pub use value_shape::Bounds;

pub(crate) const INVALID_CONFIGURATION: &str = "Invalid Validator Configuration";
pub(crate) const INVALID_PATH_EXPRESSION: &str = "Invalid Path Expression for Schema";

/// Per-call context supplied by the host.
///
/// The anchor is where relative expressions start when the validator has no
/// scope of its own; tree-wide checks run without one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    anchor: Option<Location>,
}

impl Context {
    /// Context for tree-wide checks: only absolute expressions resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context anchored at `location`, e.g. the attribute being validated.
    pub fn anchored(location: Location) -> Self {
        Self {
            anchor: Some(location),
        }
    }

    pub fn anchor(&self) -> Option<&Location> {
        self.anchor.as_ref()
    }
}

/// The rule a validator applies.
#[derive(Debug, Clone, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Check {
    RequiredTogether(Expressions),
    ConflictsWith(Expressions),
    ExactlyOneOf(Expressions),
    AtLeastOneOf(Expressions),
    /// The first expression is the primary; the rest are required with it.
    AlsoRequires(Expressions),
    Regex {
        expression: Expression,
        regex: Regex,
        message: Option<String>,
    },
    Length {
        expression: Expression,
        bounds: Bounds<usize>,
    },
    Range {
        expression: Expression,
        bounds: Bounds<f64>,
    },
    OneOf {
        expression: Expression,
        values: Vec<String>,
    },
}

impl Check {
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// A configured constraint, optionally scoped to every instance of a block.
#[derive(Debug, Clone)]
pub struct Validator {
    check: Check,
    scope: Option<Expression>,
}

impl Validator {
    fn cooccurrence(
        build: fn(Expressions) -> Check,
        min: usize,
        expressions: impl IntoIterator<Item = Expression>,
    ) -> Result<Self, ConfigError> {
        let expressions: Expressions = expressions.into_iter().collect();
        let check = build(expressions);
        let got = match &check {
            Check::RequiredTogether(e)
            | Check::ConflictsWith(e)
            | Check::ExactlyOneOf(e)
            | Check::AtLeastOneOf(e)
            | Check::AlsoRequires(e) => e.len(),
            _ => 1,
        };
        if got < min {
            return Err(ConfigError::TooFewExpressions {
                kind: check.kind(),
                min,
                got,
            });
        }
        Ok(Self { check, scope: None })
    }

    /// Either every expression is configured, or none is.
    pub fn required_together(
        expressions: impl IntoIterator<Item = Expression>,
    ) -> Result<Self, ConfigError> {
        Self::cooccurrence(Check::RequiredTogether, 1, expressions)
    }

    /// At most one expression is configured.
    pub fn conflicts_with(
        expressions: impl IntoIterator<Item = Expression>,
    ) -> Result<Self, ConfigError> {
        Self::cooccurrence(Check::ConflictsWith, 2, expressions)
    }

    /// Exactly one expression is configured.
    pub fn exactly_one_of(
        expressions: impl IntoIterator<Item = Expression>,
    ) -> Result<Self, ConfigError> {
        Self::cooccurrence(Check::ExactlyOneOf, 1, expressions)
    }

    /// At least one expression is configured.
    pub fn at_least_one_of(
        expressions: impl IntoIterator<Item = Expression>,
    ) -> Result<Self, ConfigError> {
        Self::cooccurrence(Check::AtLeastOneOf, 1, expressions)
    }

    /// If `primary` is configured, every one of `required` is too.
    pub fn also_requires(
        primary: Expression,
        required: impl IntoIterator<Item = Expression>,
    ) -> Result<Self, ConfigError> {
        Self::cooccurrence(
            Check::AlsoRequires,
            2,
            std::iter::once(primary).chain(required),
        )
    }

    /// Every known string value matches `pattern`.
    ///
    /// `message` replaces the default description in the diagnostic detail.
    pub fn regex(
        expression: Expression,
        pattern: &str,
        message: Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            check: Check::Regex {
                expression,
                regex: Regex::new(pattern)?,
                message,
            },
            scope: None,
        })
    }

    /// Every known string (in characters) or collection (in elements) has a
    /// length within bounds.
    pub fn length(
        expression: Expression,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            check: Check::Length {
                expression,
                bounds: Bounds::new("length", min, max)?,
            },
            scope: None,
        })
    }

    /// Every known number lies within bounds.
    pub fn range(
        expression: Expression,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            check: Check::Range {
                expression,
                bounds: Bounds::new("range", min, max)?,
            },
            scope: None,
        })
    }

    /// Every known string value is one of `values`.
    pub fn one_of(
        expression: Expression,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, ConfigError> {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(ConfigError::EmptyOneOf);
        }
        Ok(Self {
            check: Check::OneOf { expression, values },
            scope: None,
        })
    }

    /// Run one evaluation per location `scope` resolves to, with relative
    /// expressions anchored there.
    pub fn within(mut self, scope: Expression) -> Result<Self, ConfigError> {
        if scope.is_relative() {
            return Err(ConfigError::RelativeScope(scope.source_text()));
        }
        self.scope = Some(scope);
        Ok(self)
    }

    pub fn check(&self) -> &Check {
        &self.check
    }

    pub fn scope(&self) -> Option<&Expression> {
        self.scope.as_ref()
    }

    pub fn kind(&self) -> &'static str {
        self.check.kind()
    }

    /// Validate `tree`, returning diagnostics in the order checks ran.
    pub fn validate(&self, ctx: &Context, tree: &ConfigTree) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let resolver = Resolver::new(tree);

        let anchors = match self.anchors(ctx, &resolver) {
            Ok(anchors) => anchors,
            Err(err) => {
                diagnostics.push(misuse(err));
                return diagnostics;
            }
        };

        debug!(kind = self.kind(), anchors = anchors.len(), "running validator");

        for anchor in &anchors {
            match &self.check {
                Check::Regex { expression, .. }
                | Check::Length { expression, .. }
                | Check::Range { expression, .. }
                | Check::OneOf { expression, .. } => {
                    value_shape::evaluate(&self.check, expression, anchor.as_ref(), &resolver, &mut diagnostics);
                }
                _ => cooccurrence::evaluate(&self.check, anchor.as_ref(), &resolver, &mut diagnostics),
            }
        }

        diagnostics
    }

    /// Anchors to evaluate at: one per scope match, or the context's anchor.
    fn anchors(
        &self,
        ctx: &Context,
        resolver: &Resolver<'_>,
    ) -> Result<Vec<Option<Location>>, ResolveError> {
        let Some(scope) = &self.scope else {
            return Ok(vec![ctx.anchor().cloned()]);
        };

        let resolution = resolver.resolve(scope, ctx.anchor())?;
        if !resolution.is_determinate() {
            debug!(
                %scope,
                deferred = resolution.indeterminate.len(),
                "scope partially unknown, deferring those instances"
            );
        }
        // Absent blocks have no instance to constrain; unknown ones defer later.
        Ok(resolution
            .locations
            .into_iter()
            .filter(|location| !resolver.tree().state(location).is_some_and(|s| s.is_null()))
            .map(Some)
            .collect())
    }
}

/// Convert a resolution failure into the diagnostic reported in place of the
/// validator's result.
pub(crate) fn misuse(err: ResolveError) -> Diagnostic {
    warn!(error = %err, "validator could not resolve its path expressions");
    let summary = match err {
        ResolveError::SchemaMismatch { .. } => INVALID_PATH_EXPRESSION,
        ResolveError::MissingAnchor { .. } | ResolveError::AboveRoot { .. } => {
            INVALID_CONFIGURATION
        }
    };
    Diagnostic::error(Location::root(), summary, err.to_string())
}

impl ConfigError {
    /// Report this construction failure as a diagnostic, so a host can keep
    /// validating with the remaining validators.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(Location::root(), INVALID_CONFIGURATION, self.to_string())
    }
}

/// Validators in registration order.
#[derive(Debug, Clone, Default)]
pub struct Suite {
    validators: Vec<Validator>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, validator: Validator) {
        self.validators.push(validator);
    }

    pub fn with(mut self, validator: Validator) -> Self {
        self.push(validator);
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Validator> {
        self.validators.iter()
    }

    /// Run every validator to completion, in registration order.
    pub fn validate(&self, ctx: &Context, tree: &ConfigTree) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for validator in &self.validators {
            diagnostics.append(validator.validate(ctx, tree));
        }
        debug!(
            validators = self.validators.len(),
            diagnostics = diagnostics.len(),
            "validation finished"
        );
        diagnostics
    }
}

impl FromIterator<Validator> for Suite {
    fn from_iter<I: IntoIterator<Item = Validator>>(iter: I) -> Self {
        Self {
            validators: iter.into_iter().collect(),
        }
    }
}
