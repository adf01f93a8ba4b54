use attrguard_validate::parse_expression;
use attrguard_validate::Block;
use attrguard_validate::ConfigTree;
use attrguard_validate::Context;
use attrguard_validate::Diagnostics;
use attrguard_validate::Expression;
use attrguard_validate::Location;
use attrguard_validate::Schema;
use attrguard_validate::Severity;
use attrguard_validate::Type;
use attrguard_validate::Validator;
use serde_json::json;

fn optional_strings(names: &[&str]) -> Schema {
    let block = names
        .iter()
        .fold(Block::new(), |block, name| block.with_attribute(*name, Type::String));
    Schema::new(block)
}

fn validate(schema: &Schema, validator: &Validator, json: serde_json::Value) -> Diagnostics {
    let tree = ConfigTree::from_json(schema, &json).unwrap();
    validator.validate(&Context::new(), &tree)
}

fn required_together(names: &[&str]) -> Validator {
    Validator::required_together(names.iter().map(|name| Expression::match_root(*name))).unwrap()
}

#[test]
fn test_single_expression_is_always_satisfied() {
    let schema = optional_strings(&["test", "other"]);
    let diagnostics = validate(
        &schema,
        &required_together(&["test"]),
        json!({ "test": "test-value", "other": "test-value" }),
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn test_partial_configuration_is_one_error() {
    let schema = optional_strings(&["test1", "test2", "other"]);
    let diagnostics = validate(
        &schema,
        &required_together(&["test1", "test2"]),
        json!({ "test1": "test-value", "test2": null, "other": "test-value" }),
    );

    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics.as_slice()[0];
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.location, Location::attribute("test1"));
    assert_eq!(diagnostic.summary, "Invalid Attribute Combination");
    assert_eq!(
        diagnostic.detail,
        "These attributes must be configured together: [test1,test2]"
    );
}

#[test]
fn test_nothing_configured_is_satisfied() {
    let schema = optional_strings(&["test1", "test2", "other"]);
    let diagnostics = validate(
        &schema,
        &required_together(&["test1", "test2"]),
        json!({ "test1": null, "test2": null, "other": "test-value" }),
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn test_conflicts_with_names_both() {
    let schema = optional_strings(&["a", "b"]);
    let validator =
        Validator::conflicts_with(vec![Expression::match_root("a"), Expression::match_root("b")])
            .unwrap();
    let diagnostics = validate(&schema, &validator, json!({ "a": "x", "b": "y" }));

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.has_errors());
    assert_eq!(
        diagnostics.as_slice()[0].detail,
        "These attributes cannot be configured together: [a,b]"
    );
}

#[test]
fn test_everything_configured_is_empty() {
    let schema = optional_strings(&["a", "b", "c", "d"]);
    let diagnostics = validate(
        &schema,
        &required_together(&["a", "b", "c", "d"]),
        json!({ "a": "1", "b": "2", "c": "3", "d": "4" }),
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn test_detail_lists_all_paths_in_declared_order() {
    let schema = optional_strings(&["a", "b", "c", "d"]);
    let validator = required_together(&["d", "b", "a", "c"]);

    for json in [
        json!({ "a": "1" }),
        json!({ "a": "1", "b": "2", "d": "4" }),
        json!({ "c": "3", "d": "4" }),
    ] {
        let diagnostics = validate(&schema, &validator, json);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.as_slice()[0].detail,
            "These attributes must be configured together: [d,b,a,c]"
        );
    }
}

#[test]
fn test_unknown_defers_regardless_of_other_values() {
    let schema = optional_strings(&["test1", "test2", "test3"]);
    let validator = required_together(&["test1", "test2", "test3"]);

    let diagnostics = validate(
        &schema,
        &validator,
        json!({ "test1": "test-value", "test2": { "$unknown": true }, "test3": null }),
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn test_absent_block_is_not_an_error() {
    let schema = Schema::new(
        Block::new().with_attribute("name", Type::String).with_block(
            "timeouts",
            attrguard_validate::NestingMode::Single,
            Block::new()
                .with_attribute("create", Type::String)
                .with_attribute("delete", Type::String),
        ),
    );
    let validator = Validator::required_together(vec![
        parse_expression("timeouts.create").unwrap(),
        parse_expression("timeouts.delete").unwrap(),
    ])
    .unwrap();

    assert!(validate(&schema, &validator, json!({ "name": "web" })).is_empty());
    assert_eq!(
        validate(&schema, &validator, json!({ "timeouts": { "create": "5m" } })).len(),
        1
    );
}

#[test]
fn test_validate_is_repeatable() {
    let schema = optional_strings(&["test1", "test2"]);
    let tree = ConfigTree::from_json(&schema, &json!({ "test1": "test-value" })).unwrap();
    let validator = required_together(&["test1", "test2"]);

    let first = validator.validate(&Context::new(), &tree);
    let second = validator.validate(&Context::new(), &tree);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
