//! Read-only view over one decoded configuration instance and its schema.

use std::collections::BTreeMap;

use crate::error::DecodeError;
use crate::path::Location;
use crate::path::PathStep;
use crate::schema::Schema;
use crate::schema::Type;
use crate::value::Value;
use crate::value::ValueState;

/// JSON object key marking a value as unknown: `{"$unknown": true}`.
pub const UNKNOWN_MARKER: &str = "$unknown";

static UNKNOWN: Value = Value::Unknown;

/// The elements of a collection, as seen from a wildcard step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Elements {
    /// Nothing exists at the location, or it is not a collection.
    Absent,
    Null,
    Unknown,
    Steps(Vec<PathStep>),
}

/// A configuration instance plus the flattened schema it conforms to.
///
/// Built once per validate call and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    ty: Type,
    value: Value,
}

impl ConfigTree {
    /// Wrap an already decoded instance.
    pub fn new(schema: &Schema, value: Value) -> Self {
        Self {
            ty: schema.to_type(),
            value,
        }
    }

    /// Decode a JSON instance against `schema`.
    ///
    /// `null` decodes to Null and `{"$unknown": true}` to Unknown. Object
    /// attributes missing from the JSON are Null.
    pub fn from_json(schema: &Schema, json: &serde_json::Value) -> Result<Self, DecodeError> {
        let ty = schema.to_type();
        let value = decode(json, &ty, &Location::root())?;
        Ok(Self { ty, value })
    }

    pub fn root_type(&self) -> &Type {
        &self.ty
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Value at `location`, or `None` if nothing exists there.
    ///
    /// Descending through a Null value yields `None`; descending through an
    /// Unknown value yields Unknown, since its children are not determined
    /// either.
    pub fn get(&self, location: &Location) -> Option<&Value> {
        let mut current = &self.value;
        for step in location.steps() {
            current = match (current, step) {
                (Value::Unknown, _) => return Some(&UNKNOWN),
                (Value::Object(attributes), PathStep::Attribute(name)) => attributes.get(name)?,
                (Value::List(items), PathStep::Index(index)) => items.get(*index)?,
                (Value::Map(entries), PathStep::Key(key)) => entries.get(key)?,
                (Value::Set(items), PathStep::Element(element)) => {
                    items.iter().find(|item| *item == element)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Null/Unknown/Known state at `location`, or `None` if absent.
    pub fn state(&self, location: &Location) -> Option<ValueState<'_>> {
        self.get(location).map(Value::state)
    }

    /// Current element steps of the collection at `location`, in stored order.
    pub fn elements(&self, location: &Location) -> Elements {
        match self.get(location) {
            None => Elements::Absent,
            Some(Value::Null) => Elements::Null,
            Some(Value::Unknown) => Elements::Unknown,
            Some(Value::List(items)) => {
                Elements::Steps((0..items.len()).map(PathStep::Index).collect())
            }
            Some(Value::Set(items)) => {
                Elements::Steps(items.iter().cloned().map(PathStep::Element).collect())
            }
            Some(Value::Map(entries)) => {
                Elements::Steps(entries.keys().cloned().map(PathStep::Key).collect())
            }
            Some(_) => Elements::Absent,
        }
    }

    /// Schema type at `location`, if the location follows the schema.
    pub fn type_at(&self, location: &Location) -> Option<&Type> {
        location
            .steps()
            .iter()
            .try_fold(&self.ty, |ty, step| ty.location_child(step))
    }
}

fn is_unknown_marker(json: &serde_json::Value) -> bool {
    match json {
        serde_json::Value::Object(map) => {
            map.len() == 1 && map.get(UNKNOWN_MARKER) == Some(&serde_json::Value::Bool(true))
        }
        _ => false,
    }
}

fn mismatch(location: &Location, expected: &Type, json: &serde_json::Value) -> DecodeError {
    let found = match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    };
    DecodeError {
        location: location.clone(),
        message: format!("expected {}, found {}", expected, found),
    }
}

fn decode(json: &serde_json::Value, ty: &Type, location: &Location) -> Result<Value, DecodeError> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    if is_unknown_marker(json) {
        return Ok(Value::Unknown);
    }

    match (ty, json) {
        (Type::String, serde_json::Value::String(s)) => Ok(Value::String(s.clone())),
        (Type::Bool, serde_json::Value::Bool(b)) => Ok(Value::Bool(*b)),
        (Type::Number, serde_json::Value::Number(n)) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| mismatch(location, ty, json)),
        (Type::List(element), serde_json::Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| decode(item, element, &location.child(PathStep::Index(index))))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (Type::Set(element), serde_json::Value::Array(items)) => {
            let mut decoded: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                let value = decode(item, element, location)?;
                // Unknown elements may still turn out distinct.
                if !value.contains_unknown() && decoded.contains(&value) {
                    return Err(DecodeError {
                        location: location.clone(),
                        message: format!("duplicate set element {}", value),
                    });
                }
                decoded.push(value);
            }
            Ok(Value::Set(decoded))
        }
        (Type::Map(element), serde_json::Value::Object(entries)) => entries
            .iter()
            .map(|(key, item)| {
                let value = decode(item, element, &location.child(PathStep::Key(key.clone())))?;
                Ok((key.clone(), value))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Value::Map),
        (Type::Object(attributes), serde_json::Value::Object(entries)) => {
            if let Some(extra) = entries.keys().find(|key| !attributes.contains_key(*key)) {
                return Err(DecodeError {
                    location: location.clone(),
                    message: format!("unexpected attribute \"{}\"", extra),
                });
            }
            let mut decoded = BTreeMap::new();
            for (name, attr_ty) in attributes {
                let child = location.child(PathStep::Attribute(name.clone()));
                let value = match entries.get(name) {
                    Some(item) => decode(item, attr_ty, &child)?,
                    None => Value::Null,
                };
                decoded.insert(name.clone(), value);
            }
            Ok(Value::Object(decoded))
        }
        (Type::Dynamic, _) => Ok(decode_dynamic(json)),
        _ => Err(mismatch(location, ty, json)),
    }
}

fn decode_dynamic(json: &serde_json::Value) -> Value {
    if is_unknown_marker(json) {
        return Value::Unknown;
    }
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(decode_dynamic).collect()),
        serde_json::Value::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), decode_dynamic(item)))
                .collect(),
        ),
    }
}
