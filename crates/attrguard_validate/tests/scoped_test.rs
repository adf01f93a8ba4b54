use attrguard_validate::parse_expression;
use attrguard_validate::Block;
use attrguard_validate::ConfigTree;
use attrguard_validate::Context;
use attrguard_validate::Location;
use attrguard_validate::NestingMode;
use attrguard_validate::Schema;
use attrguard_validate::Suite;
use attrguard_validate::Type;
use attrguard_validate::Validator;
use serde_json::json;

fn schema() -> Schema {
    Schema::new(
        Block::new()
            .with_attribute("name", Type::String)
            .with_block(
                "ingress",
                NestingMode::List,
                Block::new()
                    .with_attribute("cidr_blocks", Type::list(Type::String))
                    .with_attribute("prefix_list_ids", Type::list(Type::String))
                    .with_attribute("from_port", Type::Number)
                    .with_attribute("to_port", Type::Number),
            )
            .with_block(
                "listener",
                NestingMode::Map,
                Block::new()
                    .with_attribute("certificate", Type::String)
                    .with_attribute("protocol", Type::String),
            ),
    )
}

fn expr(text: &str) -> attrguard_validate::Expression {
    parse_expression(text).unwrap()
}

fn suite() -> Suite {
    [
        Validator::exactly_one_of(vec![expr(".cidr_blocks"), expr(".prefix_list_ids")])
            .unwrap()
            .within(expr("ingress[*]"))
            .unwrap(),
        Validator::required_together(vec![expr(".from_port"), expr(".to_port")])
            .unwrap()
            .within(expr("ingress[*]"))
            .unwrap(),
        Validator::also_requires(expr(".certificate"), vec![expr(".protocol")])
            .unwrap()
            .within(expr("listener[*]"))
            .unwrap(),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_one_evaluation_per_block_instance() {
    let tree = ConfigTree::from_json(
        &schema(),
        &json!({
            "ingress": [
                { "cidr_blocks": ["10.0.0.0/8"], "from_port": 80, "to_port": 80 },
                { "from_port": 443 },
                { "cidr_blocks": [], "prefix_list_ids": ["pl-1"] },
            ],
            "listener": {
                "https": { "certificate": "arn:cert", "protocol": "HTTPS" },
                "admin": { "certificate": "arn:admin" },
            },
        }),
    )
    .unwrap();

    let diagnostics = suite().validate(&Context::new(), &tree);
    insta::assert_snapshot!(diagnostics.to_string(), @r#"
    Error: Missing Attribute Configuration (at ingress[1]): Exactly one of these attributes must be configured: [cidr_blocks,prefix_list_ids]
    Error: Invalid Attribute Combination (at ingress[2].cidr_blocks): Exactly one of these attributes must be configured: [cidr_blocks,prefix_list_ids]
    Error: Invalid Attribute Combination (at ingress[1].from_port): These attributes must be configured together: [from_port,to_port]
    Error: Invalid Attribute Combination (at listener["admin"].certificate): Attribute "protocol" must be specified when "certificate" is specified
    "#);
}

#[test]
fn test_unknown_scope_collection_is_deferred() {
    let tree = ConfigTree::from_json(
        &schema(),
        &json!({ "ingress": { "$unknown": true }, "listener": null }),
    )
    .unwrap();
    assert!(suite().validate(&Context::new(), &tree).is_empty());
}

#[test]
fn test_unknown_in_one_instance_defers_only_that_instance() {
    let tree = ConfigTree::from_json(
        &schema(),
        &json!({
            "ingress": [
                { "cidr_blocks": { "$unknown": true }, "prefix_list_ids": ["pl-1"] },
                { "cidr_blocks": ["10.0.0.0/8"], "prefix_list_ids": ["pl-2"] },
            ],
        }),
    )
    .unwrap();

    let diagnostics = suite().validate(&Context::new(), &tree);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics.as_slice()[0].location,
        Location::attribute("ingress").at_index(1).at_name("cidr_blocks")
    );
}

#[test]
fn test_context_anchor_without_scope() {
    let tree = ConfigTree::from_json(
        &schema(),
        &json!({ "ingress": [{ "from_port": 22 }] }),
    )
    .unwrap();
    let validator =
        Validator::required_together(vec![expr(".from_port"), expr(".to_port")]).unwrap();

    let anchor = Location::attribute("ingress").at_index(0);
    let diagnostics = validator.validate(&Context::anchored(anchor), &tree);
    assert_eq!(diagnostics.len(), 1);

    let sibling = Location::attribute("ingress").at_index(0).at_name("from_port");
    let via_parent =
        Validator::required_together(vec![expr("<.from_port"), expr("<.to_port")]).unwrap();
    assert_eq!(
        via_parent.validate(&Context::anchored(sibling), &tree),
        diagnostics
    );
}

#[test]
fn test_absent_scope_block_is_not_checked() {
    let schema = Schema::new(Block::new().with_block(
        "timeouts",
        NestingMode::Single,
        Block::new()
            .with_attribute("create", Type::String)
            .with_attribute("delete", Type::String),
    ));
    let validator = Validator::at_least_one_of(vec![expr(".create"), expr(".delete")])
        .unwrap()
        .within(expr("timeouts"))
        .unwrap();

    for instance in [
        json!({ "timeouts": null }),
        json!({}),
        json!({ "timeouts": { "$unknown": true } }),
    ] {
        let tree = ConfigTree::from_json(&schema, &instance).unwrap();
        let diagnostics = validator.validate(&Context::new(), &tree);
        assert!(diagnostics.is_empty(), "{}: {}", instance, diagnostics);
    }

    let tree = ConfigTree::from_json(&schema, &json!({ "timeouts": {} })).unwrap();
    let diagnostics = validator.validate(&Context::new(), &tree);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics.as_slice()[0].location, Location::attribute("timeouts"));
    assert_eq!(
        diagnostics.as_slice()[0].summary,
        "Missing Attribute Configuration"
    );
}
