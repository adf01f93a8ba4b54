//! Textual syntax for path expressions.
//!
//! ```text
//! test1                 root attribute
//! rule[*].port          every element of the `rule` collection
//! tags["env"]           one map key
//! hosts[0]              one list index
//! .name                 relative to the anchor
//! <.other               relative: sibling of the anchor
//! ```
//!
//! A leading `.` or `<` makes the expression relative.

use std::ops::Range;

use chumsky::prelude::*;

use crate::path::Expression;
use crate::path::ExpressionStep;

/// A syntax error with its byte span in the parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub span: Range<usize>,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

/// Parse a path expression from its textual form.
pub fn parse_expression(input: &str) -> Result<Expression, Vec<ParseError>> {
    expression_parser()
        .parse(input)
        .into_result()
        .map_err(|errs| {
            errs.into_iter()
                .map(|err| {
                    let span = *err.span();
                    ParseError {
                        span: span.start..span.end,
                        message: err.to_string(),
                    }
                })
                .collect()
        })
}

fn expression_parser<'a>() -> impl Parser<'a, &'a str, Expression, extra::Err<Rich<'a, char>>> {
    let name = any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| ExpressionStep::AttributeName(s.to_string()))
        .labelled("attribute name");

    let parent = just('<').to(ExpressionStep::Parent);

    let segment = choice((parent, name));

    let escape = just('\\').ignore_then(choice((just('\\').to('\\'), just('"').to('"'))));

    let key = none_of("\\\"")
        .or(escape)
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'))
        .map(ExpressionStep::MapKey)
        .labelled("map key");

    let index = text::int(10)
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<usize>()
                .map(ExpressionStep::ListIndex)
                .map_err(|e| Rich::custom(span, format!("invalid list index: {}", e)))
        })
        .labelled("list index");

    let element = choice((just('*').to(ExpressionStep::AnyElement), index, key))
        .delimited_by(just('['), just(']'));

    let rest = choice((just('.').ignore_then(segment.clone()), element))
        .repeated()
        .collect::<Vec<_>>();

    just('.')
        .or_not()
        .then(segment)
        .then(rest)
        .then_ignore(end())
        .map(|((dot, head), rest)| {
            let relative = dot.is_some() || head == ExpressionStep::Parent;
            let mut steps = Vec::with_capacity(rest.len() + 1);
            steps.push(head);
            steps.extend(rest);
            Expression::from_steps(relative, steps)
        })
}
