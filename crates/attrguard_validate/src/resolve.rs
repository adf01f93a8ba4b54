//! Expansion of path expressions into concrete locations.
//!
//! Resolution walks the expression's steps left to right over a frontier of
//! partially resolved locations. Named, key, and index steps keep or drop a
//! branch; wildcard steps fan a branch out into one location per element
//! currently stored in the collection; parent steps strip the last segment.
//!
//! Before walking values the expression is checked against the schema, so a
//! typo in an attribute name is reported instead of silently matching nothing.

use std::collections::BTreeSet;

use tracing::trace;

use crate::error::ResolveError;
use crate::path::Expression;
use crate::path::ExpressionStep;
use crate::path::Location;
use crate::path::PathStep;
use crate::schema::Type;
use crate::tree::ConfigTree;
use crate::tree::Elements;
use crate::value::Value;

/// The locations an expression denotes in one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Concrete locations, deduplicated, in resolution order.
    pub locations: Vec<Location>,
    /// Prefixes where expansion stopped because the value there is Unknown.
    /// Anything below them may or may not exist once the value is known.
    pub indeterminate: Vec<Location>,
}

impl Resolution {
    pub fn is_determinate(&self) -> bool {
        self.indeterminate.is_empty()
    }
}

/// Resolves expressions against one [`ConfigTree`].
///
/// Holds nothing but a shared reference, so it is cheap to create per call.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'t> {
    tree: &'t ConfigTree,
}

impl<'t> Resolver<'t> {
    pub fn new(tree: &'t ConfigTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &'t ConfigTree {
        self.tree
    }

    /// Resolve `expression`, starting from `anchor` if it is relative.
    ///
    /// Absolute expressions ignore the anchor. Resolving to zero locations is
    /// not an error: it means the referenced structure is absent.
    pub fn resolve(
        &self,
        expression: &Expression,
        anchor: Option<&Location>,
    ) -> Result<Resolution, ResolveError> {
        let start = if expression.is_relative() {
            anchor
                .cloned()
                .ok_or_else(|| ResolveError::MissingAnchor {
                    expression: expression.to_string(),
                })?
        } else {
            Location::root()
        };

        self.check_schema(expression, &start)?;

        let mut frontier = vec![start];
        let mut indeterminate = Vec::new();

        for step in expression.steps() {
            let mut next = Vec::with_capacity(frontier.len());
            for location in frontier {
                self.advance(expression, step, location, &mut next, &mut indeterminate)?;
            }
            trace!(%expression, %step, frontier = next.len(), "resolved step");
            frontier = next;
        }

        Ok(Resolution {
            locations: dedup(frontier),
            indeterminate: dedup(indeterminate),
        })
    }

    fn advance(
        &self,
        expression: &Expression,
        step: &ExpressionStep,
        location: Location,
        next: &mut Vec<Location>,
        indeterminate: &mut Vec<Location>,
    ) -> Result<(), ResolveError> {
        if let ExpressionStep::Parent = step {
            let parent = location.parent().ok_or_else(|| ResolveError::AboveRoot {
                expression: expression.to_string(),
            })?;
            next.push(parent);
            return Ok(());
        }

        let value = match self.tree.get(&location) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Unknown) => {
                indeterminate.push(location);
                return Ok(());
            }
            Some(value) => value,
        };

        match step {
            ExpressionStep::AttributeName(name) => {
                if let Value::Object(attributes) = value {
                    if attributes.contains_key(name) {
                        next.push(location.child(PathStep::Attribute(name.clone())));
                    }
                }
            }
            ExpressionStep::ListIndex(index) => {
                if matches!(value, Value::List(items) if *index < items.len()) {
                    next.push(location.child(PathStep::Index(*index)));
                }
            }
            ExpressionStep::MapKey(key) => {
                if matches!(value, Value::Map(entries) if entries.contains_key(key)) {
                    next.push(location.child(PathStep::Key(key.clone())));
                }
            }
            ExpressionStep::AnyListIndex
            | ExpressionStep::AnyMapKey
            | ExpressionStep::AnySetValue
            | ExpressionStep::AnyElement => {
                let accepts = match (step, value) {
                    (ExpressionStep::AnyListIndex, Value::List(_))
                    | (ExpressionStep::AnyMapKey, Value::Map(_))
                    | (ExpressionStep::AnySetValue, Value::Set(_)) => true,
                    (ExpressionStep::AnyElement, value) => value.len().is_some(),
                    _ => false,
                };
                if accepts {
                    if let Elements::Steps(steps) = self.tree.elements(&location) {
                        next.extend(steps.into_iter().map(|s| location.child(s)));
                    }
                }
            }
            ExpressionStep::Parent => {}
        }

        Ok(())
    }

    /// Check that every step of `expression` fits the schema, starting from
    /// the type at `start`.
    fn check_schema(&self, expression: &Expression, start: &Location) -> Result<(), ResolveError> {
        let mismatch = |reason: String| ResolveError::SchemaMismatch {
            expression: expression.to_string(),
            reason,
        };

        let mut stack: Vec<&Type> = vec![self.tree.root_type()];
        for step in start.steps() {
            let current = stack.last().copied().unwrap_or(self.tree.root_type());
            let child = current
                .location_child(step)
                .ok_or_else(|| mismatch(format!("anchor {} is not part of the schema", start)))?;
            stack.push(child);
        }

        for step in expression.steps() {
            if let ExpressionStep::Parent = step {
                if stack.len() <= 1 {
                    return Err(ResolveError::AboveRoot {
                        expression: expression.to_string(),
                    });
                }
                stack.pop();
                continue;
            }
            let current = stack.last().copied().unwrap_or(self.tree.root_type());
            let child = current.expression_child(step).map_err(mismatch)?;
            stack.push(child);
        }

        Ok(())
    }
}

fn dedup(locations: Vec<Location>) -> Vec<Location> {
    let mut seen = BTreeSet::new();
    locations
        .into_iter()
        .filter(|location| seen.insert(location.clone()))
        .collect()
}
