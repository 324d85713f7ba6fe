//! Sort and filter criteria carried by fetch requests.
//!
//! Criteria are plain data: the provider interprets them, and a
//! [`DataMapping`](crate::mapping::DataMapping) may rewrite attribute names
//! between the view schema and the provider schema.

use std::cmp::Ordering;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DataProviderError, Result};
use crate::types::Value;

/// Sort direction for one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One attribute of a multi-key sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortCriterion {
    pub attribute: String,
    pub direction: SortDirection,
}

impl SortCriterion {
    #[must_use]
    pub fn ascending(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: SortDirection::Ascending,
        }
    }

    #[must_use]
    pub fn descending(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Compares two rows by a list of criteria, first criterion most significant.
///
/// A missing attribute compares as `Null`, so rows lacking it sort first in
/// ascending order.
#[must_use]
pub fn compare_rows(a: &Value, b: &Value, criteria: &[SortCriterion]) -> Ordering {
    for criterion in criteria {
        let left = a.get(&criterion.attribute).unwrap_or(&Value::Null);
        let right = b.get(&criterion.attribute).unwrap_or(&Value::Null);
        let ord = match criterion.direction {
            SortDirection::Ascending => left.total_cmp(right),
            SortDirection::Descending => right.total_cmp(left),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Attribute comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Case-sensitive substring match on string attributes.
    Contains,
    /// SQL `LIKE` pattern: `%` matches any run, `_` one character.
    Like,
    Regex,
}

impl FilterOp {
    /// Every supported operator, as advertised by filter capabilities.
    pub const ALL: [FilterOp; 9] = [
        FilterOp::Eq,
        FilterOp::Ne,
        FilterOp::Gt,
        FilterOp::Ge,
        FilterOp::Lt,
        FilterOp::Le,
        FilterOp::Contains,
        FilterOp::Like,
        FilterOp::Regex,
    ];
}

/// A recursive filter expression over row attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum FilterCriterion {
    Attribute {
        op: FilterOp,
        attribute: String,
        value: Value,
    },
    And { criteria: Vec<FilterCriterion> },
    Or { criteria: Vec<FilterCriterion> },
    Not { criterion: Box<FilterCriterion> },
}

impl FilterCriterion {
    #[must_use]
    pub fn attribute(op: FilterOp, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterCriterion::Attribute {
            op,
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Applies `rename` to every attribute name in the expression.
    #[must_use]
    pub fn map_attributes(self, rename: &dyn Fn(String) -> String) -> Self {
        match self {
            FilterCriterion::Attribute {
                op,
                attribute,
                value,
            } => FilterCriterion::Attribute {
                op,
                attribute: rename(attribute),
                value,
            },
            FilterCriterion::And { criteria } => FilterCriterion::And {
                criteria: criteria.into_iter().map(|c| c.map_attributes(rename)).collect(),
            },
            FilterCriterion::Or { criteria } => FilterCriterion::Or {
                criteria: criteria.into_iter().map(|c| c.map_attributes(rename)).collect(),
            },
            FilterCriterion::Not { criterion } => FilterCriterion::Not {
                criterion: Box::new(criterion.map_attributes(rename)),
            },
        }
    }

    /// Compiles the expression into a reusable matcher.
    ///
    /// # Errors
    ///
    /// Returns [`DataProviderError::InvalidFilter`] when a `Like`/`Regex`
    /// pattern is not a string or does not compile, or when `Contains` is
    /// given a non-string operand.
    pub fn compile(&self) -> Result<RowFilter> {
        let node = match self {
            FilterCriterion::Attribute {
                op,
                attribute,
                value,
            } => {
                let pattern = match op {
                    FilterOp::Like => Some(like_to_regex(pattern_str(*op, value)?)?),
                    FilterOp::Regex => Some(
                        Regex::new(pattern_str(*op, value)?)
                            .map_err(|e| DataProviderError::InvalidFilter(e.to_string()))?,
                    ),
                    FilterOp::Contains => {
                        pattern_str(*op, value)?;
                        None
                    }
                    _ => None,
                };
                Node::Attribute {
                    op: *op,
                    attribute: attribute.clone(),
                    value: value.clone(),
                    pattern,
                }
            }
            FilterCriterion::And { criteria } => Node::And(
                criteria
                    .iter()
                    .map(|c| c.compile().map(|f| f.root))
                    .collect::<Result<_>>()?,
            ),
            FilterCriterion::Or { criteria } => Node::Or(
                criteria
                    .iter()
                    .map(|c| c.compile().map(|f| f.root))
                    .collect::<Result<_>>()?,
            ),
            FilterCriterion::Not { criterion } => Node::Not(Box::new(criterion.compile()?.root)),
        };
        Ok(RowFilter { root: node })
    }
}

fn pattern_str(op: FilterOp, value: &Value) -> Result<&str> {
    value.as_str().ok_or_else(|| {
        DataProviderError::InvalidFilter(format!("{op:?} requires a string operand, got {value:?}"))
    })
}

fn like_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 2);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| DataProviderError::InvalidFilter(e.to_string()))
}

#[derive(Debug, Clone)]
enum Node {
    Attribute {
        op: FilterOp,
        attribute: String,
        value: Value,
        pattern: Option<Regex>,
    },
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
}

impl Node {
    fn matches(&self, row: &Value) -> bool {
        match self {
            Node::Attribute {
                op,
                attribute,
                value,
                pattern,
            } => {
                let actual = row.get(attribute).unwrap_or(&Value::Null);
                match op {
                    FilterOp::Eq => actual.total_cmp(value) == Ordering::Equal,
                    FilterOp::Ne => actual.total_cmp(value) != Ordering::Equal,
                    FilterOp::Gt => actual.total_cmp(value) == Ordering::Greater,
                    FilterOp::Ge => actual.total_cmp(value) != Ordering::Less,
                    FilterOp::Lt => actual.total_cmp(value) == Ordering::Less,
                    FilterOp::Le => actual.total_cmp(value) != Ordering::Greater,
                    FilterOp::Contains => match (actual.as_str(), value.as_str()) {
                        (Some(haystack), Some(needle)) => haystack.contains(needle),
                        _ => false,
                    },
                    FilterOp::Like | FilterOp::Regex => match (actual.as_str(), pattern) {
                        (Some(text), Some(re)) => re.is_match(text),
                        _ => false,
                    },
                }
            }
            Node::And(nodes) => nodes.iter().all(|n| n.matches(row)),
            Node::Or(nodes) => nodes.iter().any(|n| n.matches(row)),
            Node::Not(node) => !node.matches(row),
        }
    }
}

/// A compiled [`FilterCriterion`], with patterns built once.
#[derive(Debug, Clone)]
pub struct RowFilter {
    root: Node,
}

impl RowFilter {
    /// Whether `row` satisfies the filter.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        self.root.matches(row)
    }
}
