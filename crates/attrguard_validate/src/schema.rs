//! Schema declarations for configuration trees.
//!
//! A schema is a root [`Block`] of attributes and nested blocks. For path
//! resolution every block is flattened into a single [`Type`] tree, where a
//! nested block becomes an object wrapped in the collection its nesting mode
//! names.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::path::ExpressionStep;
use crate::path::PathStep;

static DYNAMIC: Type = Type::Dynamic;

/// The type of an attribute, or of a position in the flattened schema.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    String,
    Number,
    Bool,
    /// Any value; every traversal step is accepted below it.
    Dynamic,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Object(BTreeMap<String, Type>),
}

impl Type {
    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    pub fn set(element: Type) -> Self {
        Type::Set(Box::new(element))
    }

    pub fn map(element: Type) -> Self {
        Type::Map(Box::new(element))
    }

    pub fn object<K, I>(attributes: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Type)>,
    {
        Type::Object(
            attributes
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        )
    }

    /// Type reached by following one concrete location step.
    pub(crate) fn location_child(&self, step: &PathStep) -> Option<&Type> {
        match (self, step) {
            (Type::Dynamic, _) => Some(&DYNAMIC),
            (Type::Object(attributes), PathStep::Attribute(name)) => attributes.get(name),
            (Type::List(element), PathStep::Index(_))
            | (Type::Map(element), PathStep::Key(_))
            | (Type::Set(element), PathStep::Element(_)) => Some(element.as_ref()),
            _ => None,
        }
    }

    /// Type reached by following one expression step, or the reason the step
    /// does not fit. Parent steps are handled by the caller.
    pub(crate) fn expression_child(&self, step: &ExpressionStep) -> Result<&Type, String> {
        match (self, step) {
            (Type::Dynamic, _) => Ok(&DYNAMIC),
            (Type::Object(attributes), ExpressionStep::AttributeName(name)) => attributes
                .get(name)
                .ok_or_else(|| format!("no attribute named \"{}\"", name)),
            (Type::List(element), ExpressionStep::ListIndex(_) | ExpressionStep::AnyListIndex)
            | (Type::Map(element), ExpressionStep::MapKey(_) | ExpressionStep::AnyMapKey)
            | (Type::Set(element), ExpressionStep::AnySetValue)
            | (
                Type::List(element) | Type::Set(element) | Type::Map(element),
                ExpressionStep::AnyElement,
            ) => Ok(element.as_ref()),
            (ty, step) => Err(format!("step {} cannot be applied to {}", step, ty)),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::String => write!(f, "string"),
            Type::Number => write!(f, "number"),
            Type::Bool => write!(f, "bool"),
            Type::Dynamic => write!(f, "dynamic"),
            Type::List(t) => write!(f, "list({})", t),
            Type::Set(t) => write!(f, "set({})", t),
            Type::Map(t) => write!(f, "map({})", t),
            Type::Object(_) => write!(f, "object"),
        }
    }
}

/// A single attribute declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub ty: Type,
}

/// How instances of a nested block are collected under their parent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    #[default]
    Single,
    List,
    Set,
    Map,
}

/// A nested block declaration: a block plus its nesting mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NestedBlock {
    #[serde(default)]
    pub nesting: NestingMode,
    #[serde(flatten)]
    pub block: Block,
}

/// A block of attributes and nested blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default)]
    pub blocks: BTreeMap<String, NestedBlock>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.attributes.insert(name.into(), Attribute { ty });
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, nesting: NestingMode, block: Block) -> Self {
        self.blocks
            .insert(name.into(), NestedBlock { nesting, block });
        self
    }

    /// Flatten this block into an object type.
    ///
    /// A nested block shadows an attribute of the same name; name collisions
    /// are the schema author's problem.
    pub fn to_type(&self) -> Type {
        let mut attributes: BTreeMap<String, Type> = self
            .attributes
            .iter()
            .map(|(name, attr)| (name.clone(), attr.ty.clone()))
            .collect();

        for (name, nested) in &self.blocks {
            let object = nested.block.to_type();
            let ty = match nested.nesting {
                NestingMode::Single => object,
                NestingMode::List => Type::list(object),
                NestingMode::Set => Type::set(object),
                NestingMode::Map => Type::map(object),
            };
            attributes.insert(name.clone(), ty);
        }

        Type::Object(attributes)
    }
}

/// Schema of a whole configuration instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Schema {
    #[serde(flatten)]
    pub root: Block,
}

impl Schema {
    pub fn new(root: Block) -> Self {
        Self { root }
    }

    pub fn to_type(&self) -> Type {
        self.root.to_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_flatten_by_nesting_mode() {
        let schema = Schema::new(
            Block::new()
                .with_attribute("name", Type::String)
                .with_block(
                    "rule",
                    NestingMode::List,
                    Block::new().with_attribute("port", Type::Number),
                )
                .with_block(
                    "tags",
                    NestingMode::Map,
                    Block::new().with_attribute("value", Type::String),
                )
                .with_block("timeouts", NestingMode::Single, Block::new()),
        );

        assert_eq!(
            schema.to_type(),
            Type::object([
                ("name", Type::String),
                ("rule", Type::list(Type::object([("port", Type::Number)]))),
                ("tags", Type::map(Type::object([("value", Type::String)]))),
                ("timeouts", Type::object::<String, _>([])),
            ])
        );
    }

    #[test]
    fn test_deserialize_from_toml() {
        let schema: Schema = toml::from_str(
            r#"
            [attributes.test1]
            type = "string"

            [attributes.ports]
            type = { list = "number" }

            [blocks.rule]
            nesting = "set"

            [blocks.rule.attributes.cidr]
            type = "string"
            "#,
        )
        .unwrap();

        assert_eq!(
            schema.to_type(),
            Type::object([
                ("ports", Type::list(Type::Number)),
                ("rule", Type::set(Type::object([("cidr", Type::String)]))),
                ("test1", Type::String),
            ])
        );
    }

    #[test]
    fn test_expression_child_mismatch() {
        let ty = Type::map(Type::String);
        let err = ty.expression_child(&ExpressionStep::AnyListIndex).unwrap_err();
        assert_eq!(err, "step [*] cannot be applied to map(string)");
        assert_eq!(
            ty.expression_child(&ExpressionStep::AnyElement),
            Ok(&Type::String)
        );
    }
}
