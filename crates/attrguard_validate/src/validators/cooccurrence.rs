use tracing::debug;

use super::misuse;
use super::Check;
use crate::diagnostics::Diagnostic;
use crate::diagnostics::Diagnostics;
use crate::path::Expression;
use crate::path::Expressions;
use crate::path::Location;
use crate::resolve::Resolver;
use crate::value::ValueState;

const INVALID_COMBINATION: &str = "Invalid Attribute Combination";
const MISSING_CONFIGURATION: &str = "Missing Attribute Configuration";

/// What one expression denotes at one anchor.
#[derive(Debug)]
struct Classified<'e> {
    expression: &'e Expression,
    /// First Known location, if any.
    configured: Option<Location>,
}

/// Resolve and classify every expression at `anchor`, then apply the rule.
///
/// Nothing is reported for an anchor where any resolved value is Unknown or
/// any expansion stopped at an Unknown collection.
pub(super) fn evaluate(
    check: &Check,
    anchor: Option<&Location>,
    resolver: &Resolver<'_>,
    diagnostics: &mut Diagnostics,
) {
    let expressions = match check {
        Check::RequiredTogether(e)
        | Check::ConflictsWith(e)
        | Check::ExactlyOneOf(e)
        | Check::AtLeastOneOf(e)
        | Check::AlsoRequires(e) => e,
        _ => return,
    };

    let Some(classified) = classify(expressions, anchor, resolver, diagnostics) else {
        return;
    };

    let configured: Vec<&Classified<'_>> =
        classified.iter().filter(|c| c.configured.is_some()).collect();
    let first_configured = || {
        configured
            .first()
            .and_then(|c| c.configured.clone())
            .unwrap_or_default()
    };
    let missing_at = || anchor.cloned().unwrap_or_default();

    match check {
        Check::RequiredTogether(_) => {
            if !configured.is_empty() && configured.len() < classified.len() {
                diagnostics.push(Diagnostic::error(
                    first_configured(),
                    INVALID_COMBINATION,
                    format!("These attributes must be configured together: {}", expressions),
                ));
            }
        }
        Check::ConflictsWith(_) => {
            if configured.len() > 1 {
                let conflicting: Expressions =
                    configured.iter().map(|c| c.expression.clone()).collect();
                diagnostics.push(Diagnostic::error(
                    first_configured(),
                    INVALID_COMBINATION,
                    format!("These attributes cannot be configured together: {}", conflicting),
                ));
            }
        }
        Check::ExactlyOneOf(_) => {
            let detail = format!("Exactly one of these attributes must be configured: {}", expressions);
            match configured.len() {
                0 => diagnostics.push(Diagnostic::error(missing_at(), MISSING_CONFIGURATION, detail)),
                1 => {}
                _ => diagnostics.push(Diagnostic::error(first_configured(), INVALID_COMBINATION, detail)),
            }
        }
        Check::AtLeastOneOf(_) => {
            if configured.is_empty() {
                diagnostics.push(Diagnostic::error(
                    missing_at(),
                    MISSING_CONFIGURATION,
                    format!("At least one of these attributes must be configured: {}", expressions),
                ));
            }
        }
        Check::AlsoRequires(_) => {
            let Some((primary, required)) = classified.split_first() else {
                return;
            };
            let Some(primary_location) = &primary.configured else {
                return;
            };
            for missing in required.iter().filter(|c| c.configured.is_none()) {
                diagnostics.push(Diagnostic::error(
                    primary_location.clone(),
                    INVALID_COMBINATION,
                    format!(
                        "Attribute \"{}\" must be specified when \"{}\" is specified",
                        missing.expression, primary.expression
                    ),
                ));
            }
        }
        _ => {}
    }
}

/// Returns `None` when the anchor must be skipped: either a resolution
/// failed (reported as misuse) or something is still unknown.
fn classify<'e>(
    expressions: &'e Expressions,
    anchor: Option<&Location>,
    resolver: &Resolver<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<Classified<'e>>> {
    let tree = resolver.tree();
    let mut classified = Vec::with_capacity(expressions.len());

    for expression in expressions.iter() {
        let resolution = match resolver.resolve(expression, anchor) {
            Ok(resolution) => resolution,
            Err(err) => {
                diagnostics.push(misuse(err));
                return None;
            }
        };

        if !resolution.is_determinate() {
            debug!(%expression, "expansion reached an unknown collection, deferring");
            return None;
        }

        let mut configured = None;
        for location in resolution.locations {
            match tree.state(&location) {
                Some(ValueState::Unknown) => {
                    debug!(%expression, %location, "value is unknown, deferring");
                    return None;
                }
                Some(ValueState::Known(_)) if configured.is_none() => configured = Some(location),
                _ => {}
            }
        }

        classified.push(Classified {
            expression,
            configured,
        });
    }

    Some(classified)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::diagnostics::Diagnostics;
    use crate::parser::parse_expression;
    use crate::path::Expression;
    use crate::schema::Block;
    use crate::schema::NestingMode;
    use crate::schema::Schema;
    use crate::schema::Type;
    use crate::tree::ConfigTree;
    use crate::validators::Context;
    use crate::validators::Validator;

    fn schema() -> Schema {
        Schema::new(
            Block::new()
                .with_attribute("a", Type::String)
                .with_attribute("b", Type::String)
                .with_attribute("c", Type::String)
                .with_block(
                    "rule",
                    NestingMode::List,
                    Block::new()
                        .with_attribute("cidr", Type::String)
                        .with_attribute("prefix_list", Type::String),
                ),
        )
    }

    fn exprs(paths: &[&str]) -> Vec<Expression> {
        paths.iter().map(|p| parse_expression(p).unwrap()).collect()
    }

    fn run(validator: &Validator, json: serde_json::Value) -> Diagnostics {
        let tree = ConfigTree::from_json(&schema(), &json).unwrap();
        validator.validate(&Context::new(), &tree)
    }

    #[test]
    fn test_conflicts_with_names_conflicting_set() {
        let validator = Validator::conflicts_with(exprs(&["a", "b", "c"])).unwrap();
        assert!(run(&validator, json!({ "a": "x" })).is_empty());

        let diagnostics = run(&validator, json!({ "a": "x", "c": "z" }));
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics.as_slice()[0];
        assert_eq!(diagnostic.location.to_string(), "a");
        assert_eq!(
            diagnostic.detail,
            "These attributes cannot be configured together: [a,c]"
        );
    }

    #[test]
    fn test_exactly_one_of() {
        let validator = Validator::exactly_one_of(exprs(&["a", "b"])).unwrap();
        assert!(run(&validator, json!({ "b": "y" })).is_empty());

        let none = run(&validator, json!({}));
        assert_eq!(none.as_slice()[0].summary, "Missing Attribute Configuration");
        assert!(none.as_slice()[0].location.is_root());

        let both = run(&validator, json!({ "a": "x", "b": "y" }));
        assert_eq!(both.as_slice()[0].summary, "Invalid Attribute Combination");
        assert_eq!(
            both.as_slice()[0].detail,
            "Exactly one of these attributes must be configured: [a,b]"
        );
    }

    #[test]
    fn test_at_least_one_of() {
        let validator = Validator::at_least_one_of(exprs(&["a", "b"])).unwrap();
        assert!(run(&validator, json!({ "a": "x", "b": "y" })).is_empty());

        let diagnostics = run(&validator, json!({ "c": "z" }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.as_slice()[0].detail,
            "At least one of these attributes must be configured: [a,b]"
        );
    }

    #[test]
    fn test_also_requires_is_asymmetric() {
        let validator =
            Validator::also_requires(parse_expression("a").unwrap(), exprs(&["b", "c"])).unwrap();

        assert!(run(&validator, json!({ "b": "y" })).is_empty());
        assert!(run(&validator, json!({ "a": "x", "b": "y", "c": "z" })).is_empty());

        let diagnostics = run(&validator, json!({ "a": "x" }));
        let details: Vec<&str> = diagnostics.iter().map(|d| d.detail.as_str()).collect();
        assert_eq!(
            details,
            vec![
                r#"Attribute "b" must be specified when "a" is specified"#,
                r#"Attribute "c" must be specified when "a" is specified"#,
            ]
        );
        assert!(diagnostics.iter().all(|d| d.location.to_string() == "a"));
    }

    #[test]
    fn test_wildcard_counts_when_any_element_is_configured() {
        let validator = Validator::required_together(exprs(&["a", "rule[*].cidr"])).unwrap();

        let diagnostics = run(
            &validator,
            json!({ "rule": [{ "cidr": null }, { "cidr": "10.0.0.0/8" }] }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.as_slice()[0].location.to_string(), "rule[1].cidr");

        assert!(run(&validator, json!({ "rule": [{ "cidr": null }] })).is_empty());
    }

    #[test]
    fn test_unknown_defers_the_whole_anchor() {
        let validator = Validator::conflicts_with(exprs(&["a", "b", "rule[*].cidr"])).unwrap();

        assert!(run(&validator, json!({ "a": "x", "b": { "$unknown": true } })).is_empty());
        assert!(run(&validator, json!({ "a": "x", "b": "y", "rule": { "$unknown": true } })).is_empty());
        assert_eq!(run(&validator, json!({ "a": "x", "b": "y" })).len(), 1);
    }

    #[test]
    fn test_schema_mismatch_is_misuse() {
        let validator = Validator::required_together(exprs(&["a", "rule[*].cdir"])).unwrap();
        let diagnostics = run(&validator, json!({ "a": "x" }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.as_slice()[0].summary,
            "Invalid Path Expression for Schema"
        );
    }
}
