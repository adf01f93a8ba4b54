//! Cross-attribute validation of schema-typed configuration trees.
//!
//! A [`Validator`] names attributes through path expressions, resolves them
//! against a [`ConfigTree`], and reports violations as [`Diagnostics`].

mod diagnostics;
mod error;
mod parser;
mod path;
mod resolve;
mod schema;
mod tree;
mod validators;
mod value;

// Re-export diagnostic types
pub use diagnostics::Diagnostic;
pub use diagnostics::Diagnostics;
pub use diagnostics::Severity;
pub use error::ConfigError;
pub use error::DecodeError;
pub use error::ResolveError;
pub use parser::parse_expression;
pub use parser::ParseError;
pub use path::Expression;
pub use path::ExpressionStep;
pub use path::Expressions;
pub use path::Location;
pub use path::PathStep;
pub use resolve::Resolution;
pub use resolve::Resolver;
pub use schema::Attribute;
pub use schema::Block;
pub use schema::NestedBlock;
pub use schema::NestingMode;
pub use schema::Schema;
pub use schema::Type;
pub use tree::ConfigTree;
pub use tree::Elements;
pub use tree::UNKNOWN_MARKER;
pub use validators::Bounds;
pub use validators::Check;
pub use validators::Context;
pub use validators::Suite;
pub use validators::Validator;
pub use value::Value;
pub use value::ValueState;
