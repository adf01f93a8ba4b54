//! Path expressions and the concrete locations they resolve to.
//!
//! An [`Expression`] is declarative: it may contain wildcards and parent
//! steps, and relative expressions need an anchor before they mean anything.
//! A [`Location`] is the result of resolving one against a tree: a sequence
//! of concrete steps that each name something present in the instance.

use serde::Serialize;

use crate::value::Value;

/// One traversal instruction in a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionStep {
    AttributeName(String),
    ListIndex(usize),
    MapKey(String),
    AnyListIndex,
    AnyMapKey,
    AnySetValue,
    /// `[*]` in the textual syntax; matches the elements of whichever
    /// collection the schema declares at that position.
    AnyElement,
    Parent,
}

impl ExpressionStep {
    pub fn is_wildcard(&self) -> bool {
        matches!(
            self,
            ExpressionStep::AnyListIndex
                | ExpressionStep::AnyMapKey
                | ExpressionStep::AnySetValue
                | ExpressionStep::AnyElement
        )
    }
}

impl std::fmt::Display for ExpressionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpressionStep::AttributeName(name) => write!(f, "{}", name),
            ExpressionStep::ListIndex(index) => write!(f, "[{}]", index),
            ExpressionStep::MapKey(key) => write_key(f, key),
            ExpressionStep::AnyListIndex
            | ExpressionStep::AnyMapKey
            | ExpressionStep::AnySetValue
            | ExpressionStep::AnyElement => write!(f, "[*]"),
            ExpressionStep::Parent => write!(f, "<"),
        }
    }
}

/// Write `["key"]`, escaping only what the expression parser unescapes.
fn write_key(f: &mut std::fmt::Formatter<'_>, key: &str) -> std::fmt::Result {
    write!(f, "[\"")?;
    for c in key.chars() {
        if c == '\\' || c == '"' {
            write!(f, "\\")?;
        }
        write!(f, "{}", c)?;
    }
    write!(f, "\"]")
}

/// A declarative description of zero or more locations in a tree.
///
/// Absolute expressions are resolved from the tree root. Relative ones are
/// resolved from an anchor supplied at validation time and fail without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    relative: bool,
    steps: Vec<ExpressionStep>,
}

impl Expression {
    /// Start an absolute expression at the root attribute `name`.
    pub fn match_root(name: impl Into<String>) -> Self {
        Self {
            relative: false,
            steps: vec![ExpressionStep::AttributeName(name.into())],
        }
    }

    /// Start an expression at the anchor location.
    pub fn match_relative() -> Self {
        Self {
            relative: true,
            steps: Vec::new(),
        }
    }

    pub(crate) fn from_steps(relative: bool, steps: Vec<ExpressionStep>) -> Self {
        Self { relative, steps }
    }

    pub fn at_name(self, name: impl Into<String>) -> Self {
        self.push(ExpressionStep::AttributeName(name.into()))
    }

    pub fn at_list_index(self, index: usize) -> Self {
        self.push(ExpressionStep::ListIndex(index))
    }

    pub fn at_map_key(self, key: impl Into<String>) -> Self {
        self.push(ExpressionStep::MapKey(key.into()))
    }

    pub fn at_any_list_index(self) -> Self {
        self.push(ExpressionStep::AnyListIndex)
    }

    pub fn at_any_map_key(self) -> Self {
        self.push(ExpressionStep::AnyMapKey)
    }

    pub fn at_any_set_value(self) -> Self {
        self.push(ExpressionStep::AnySetValue)
    }

    pub fn at_any_element(self) -> Self {
        self.push(ExpressionStep::AnyElement)
    }

    pub fn at_parent(self) -> Self {
        self.push(ExpressionStep::Parent)
    }

    fn push(mut self, step: ExpressionStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn steps(&self) -> &[ExpressionStep] {
        &self.steps
    }

    /// The expression as it parses back, keeping the leading `.` that
    /// `Display` drops from relative expressions.
    pub fn source_text(&self) -> String {
        match self.steps.first() {
            Some(ExpressionStep::AttributeName(_)) if self.relative => format!(".{}", self),
            _ => self.to_string(),
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            let dotted = matches!(
                step,
                ExpressionStep::AttributeName(_) | ExpressionStep::Parent
            );
            if idx > 0 && dotted {
                write!(f, ".")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// An ordered list of expressions, displayed as `[a,b,c]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expressions(Vec<Expression>);

impl Expressions {
    pub fn new(expressions: Vec<Expression>) -> Self {
        Self(expressions)
    }
}

impl std::ops::Deref for Expressions {
    type Target = [Expression];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<Expression> for Expressions {
    fn from_iter<I: IntoIterator<Item = Expression>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for Expressions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (idx, expression) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", expression)?;
        }
        write!(f, "]")
    }
}

/// One concrete step of a location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathStep {
    Attribute(String),
    Index(usize),
    Key(String),
    /// Set elements are addressed by their value.
    Element(Value),
}

impl std::fmt::Display for PathStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathStep::Attribute(name) => write!(f, "{}", name),
            PathStep::Index(index) => write!(f, "[{}]", index),
            PathStep::Key(key) => write_key(f, key),
            PathStep::Element(value) => write!(f, "[Value({})]", value),
        }
    }
}

/// A concrete, wildcard-free address within a configuration tree.
///
/// Locations compare step by step from the left, which gives diagnostics a
/// stable order. The empty location is the tree root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(Vec<PathStep>);

impl Location {
    pub fn root() -> Self {
        Self::default()
    }

    /// Location of the root attribute `name`.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self(vec![PathStep::Attribute(name.into())])
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn child(&self, step: PathStep) -> Self {
        self.clone().push(step)
    }

    pub fn at_name(self, name: impl Into<String>) -> Self {
        self.push(PathStep::Attribute(name.into()))
    }

    pub fn at_index(self, index: usize) -> Self {
        self.push(PathStep::Index(index))
    }

    pub fn at_key(self, key: impl Into<String>) -> Self {
        self.push(PathStep::Key(key.into()))
    }

    pub fn at_element(self, value: Value) -> Self {
        self.push(PathStep::Element(value))
    }

    fn push(mut self, step: PathStep) -> Self {
        self.0.push(step);
        self
    }

    /// The enclosing location, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, step) in self.0.iter().enumerate() {
            if idx > 0 && matches!(step, PathStep::Attribute(_)) {
                write!(f, ".")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

impl Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
