//! Predicate trees and their evaluation.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Comparison operator of a property filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `=`
    Equal,
    /// Ancestor containment. Representable but not evaluated.
    HasAncestor,
}

impl Operator {
    fn holds(self, ordering: Option<Ordering>) -> bool {
        let Some(ordering) = ordering else {
            return false;
        };
        match self {
            Operator::LessThan => ordering == Ordering::Less,
            Operator::LessThanOrEqual => ordering != Ordering::Greater,
            Operator::GreaterThan => ordering == Ordering::Greater,
            Operator::GreaterThanOrEqual => ordering != Ordering::Less,
            Operator::Equal => ordering == Ordering::Equal,
            Operator::HasAncestor => false,
        }
    }
}

/// Boolean combinator of a composite filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeOperator {
    /// All children must match.
    #[default]
    And,
    /// Any child may match. Representable but not evaluated.
    Or,
}

/// Compares one property against a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    /// Property name.
    pub property: String,
    /// Comparison operator.
    pub op: Operator,
    /// Literal to compare with.
    pub value: Value,
}

/// Combines child filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeFilter {
    /// Combinator.
    #[serde(default)]
    pub op: CompositeOperator,
    /// Child filters; must not be empty.
    pub filters: Vec<Filter>,
}

/// A predicate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Leaf comparison.
    Property(PropertyFilter),
    /// Conjunction of children.
    Composite(CompositeFilter),
}

impl Filter {
    /// Creates a property filter.
    pub fn property(name: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Filter::Property(PropertyFilter {
            property: name.into(),
            op,
            value: value.into(),
        })
    }

    /// `name = value`
    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, Operator::Equal, value)
    }

    /// `name < value`
    pub fn lt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, Operator::LessThan, value)
    }

    /// `name <= value`
    pub fn le(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, Operator::LessThanOrEqual, value)
    }

    /// `name > value`
    pub fn gt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, Operator::GreaterThan, value)
    }

    /// `name >= value`
    pub fn ge(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, Operator::GreaterThanOrEqual, value)
    }

    /// `name` is unset or null.
    pub fn is_null(name: impl Into<String>) -> Self {
        Self::property(name, Operator::Equal, Value::Null)
    }

    /// Conjunction of `filters`.
    #[must_use]
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::Composite(CompositeFilter {
            op: CompositeOperator::And,
            filters,
        })
    }

    /// Checks that every node of the tree can be evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedFilter`] for `Or` composites, empty
    /// composites and `HasAncestor` comparisons.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            Filter::Property(filter) => {
                if filter.op == Operator::HasAncestor {
                    return Err(CoreError::unsupported_filter(format!(
                        "has-ancestor on {} is not supported",
                        filter.property
                    )));
                }
                Ok(())
            }
            Filter::Composite(composite) => {
                if composite.op != CompositeOperator::And {
                    return Err(CoreError::unsupported_filter(
                        "only AND composite filters are supported",
                    ));
                }
                if composite.filters.is_empty() {
                    return Err(CoreError::unsupported_filter(
                        "composite filter has no children",
                    ));
                }
                composite.filters.iter().try_for_each(Filter::validate)
            }
        }
    }

    /// Evaluates the filter against an entity.
    ///
    /// Assumes [`validate`](Self::validate) succeeded.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Filter::Property(filter) => filter.matches(entity),
            Filter::Composite(composite) => composite.filters.iter().all(|f| f.matches(entity)),
        }
    }
}

impl PropertyFilter {
    fn matches(&self, entity: &Entity) -> bool {
        let property = entity.get(&self.property);

        // `= null` also selects entities where the property is unset.
        if self.op == Operator::Equal && self.value.is_null() {
            return property.map_or(true, |p| p.values().iter().any(Value::is_null));
        }

        // Repeated properties match if any element does.
        property.is_some_and(|p| {
            p.values()
                .iter()
                .any(|v| self.op.holds(v.compare(&self.value)))
        })
    }
}
