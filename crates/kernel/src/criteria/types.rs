//! Criterion expression tree types.
//!
//! A criterion is one node of a category's filter expression: a leaf field
//! test, a logical AND/OR grouping, or a reference to another category whose
//! criterias are substituted at resolution time.
//!
//! The in-memory form is an explicit tagged union; classification of untyped
//! JSON happens exactly once, in [`validate_criterias`], in the precedence
//! order join-node, extend-node, field-node. Downstream code only ever
//! matches on the enum.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use super::CriteriaError;
use crate::models::CategoryKind;

/// AND/OR combinator for sibling criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinOperator {
    And,
    Or,
}

impl FromStr for JoinOperator {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(JoinOperator::And),
            "or" => Ok(JoinOperator::Or),
            _ => Err(CriteriaError::Invalid),
        }
    }
}

/// Leaf-level comparison operators.
///
/// Closed set; each member maps to a backend operator symbol through the
/// configured [`super::OperatorTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    MatchesInsensitive,
    MatchesSensitive,
    ContainAll,
    ContainedBy,
}

impl ComparisonOp {
    /// All members, in declaration order.
    pub const ALL: [ComparisonOp; 9] = [
        ComparisonOp::Eq,
        ComparisonOp::Gt,
        ComparisonOp::Gte,
        ComparisonOp::Lt,
        ComparisonOp::Lte,
        ComparisonOp::MatchesInsensitive,
        ComparisonOp::MatchesSensitive,
        ComparisonOp::ContainAll,
        ComparisonOp::ContainedBy,
    ];
}

impl FromStr for ComparisonOp {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(ComparisonOp::Eq),
            "gt" => Ok(ComparisonOp::Gt),
            "gte" => Ok(ComparisonOp::Gte),
            "lt" => Ok(ComparisonOp::Lt),
            "lte" => Ok(ComparisonOp::Lte),
            "matchesInsensitive" => Ok(ComparisonOp::MatchesInsensitive),
            "matchesSensitive" => Ok(ComparisonOp::MatchesSensitive),
            "containAll" => Ok(ComparisonOp::ContainAll),
            "containedBy" => Ok(ComparisonOp::ContainedBy),
            other => Err(CriteriaError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::Gt => "gt",
            ComparisonOp::Gte => "gte",
            ComparisonOp::Lt => "lt",
            ComparisonOp::Lte => "lte",
            ComparisonOp::MatchesInsensitive => "matchesInsensitive",
            ComparisonOp::MatchesSensitive => "matchesSensitive",
            ComparisonOp::ContainAll => "containAll",
            ComparisonOp::ContainedBy => "containedBy",
        };
        f.write_str(name)
    }
}

/// Value of a leaf criterion: string, number, boolean, or list of numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CriterionValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<CriterionValue>),
}

impl CriterionValue {
    /// Build a value from untyped JSON. Lists may only contain numbers.
    fn from_json(value: &JsonValue) -> Result<Self, CriteriaError> {
        match value {
            JsonValue::String(s) => Ok(CriterionValue::String(s.clone())),
            JsonValue::Bool(b) => Ok(CriterionValue::Boolean(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(CriterionValue::Integer(i))
                } else {
                    n.as_f64()
                        .map(CriterionValue::Float)
                        .ok_or(CriteriaError::Invalid)
                }
            }
            JsonValue::Array(items) => {
                let list = items
                    .iter()
                    .map(|item| match item {
                        JsonValue::Number(_) => Self::from_json(item),
                        _ => Err(CriteriaError::Invalid),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CriterionValue::List(list))
            }
            _ => Err(CriteriaError::Invalid),
        }
    }

    /// Plain string rendering used by the value-wrap templates.
    ///
    /// Lists join their elements with commas (`[36, 37]` becomes `36,37`) so
    /// the array template can wrap them into a backend array literal.
    pub fn to_plain_string(&self) -> String {
        match self {
            CriterionValue::String(s) => s.clone(),
            CriterionValue::Integer(i) => i.to_string(),
            CriterionValue::Float(f) => f.to_string(),
            CriterionValue::Boolean(b) => b.to_string(),
            CriterionValue::List(items) => items
                .iter()
                .map(CriterionValue::to_plain_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// One node of a category filter expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Criterion {
    /// Logical grouping of sibling criteria.
    Join {
        operator: JoinOperator,
        conditions: Vec<Criterion>,
    },

    /// Reference to another category, substituted at resolution time.
    Extend {
        category: String,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        kind: Option<CategoryKind>,
    },

    /// Leaf field test.
    Field {
        field: String,
        comparison: ComparisonOp,
        value: CriterionValue,
    },
}

impl<'de> Deserialize<'de> for Criterion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        classify(&value).map_err(D::Error::custom)
    }
}

/// Minimum length for category names and references.
const MIN_NAME_LEN: usize = 3;

/// Validate an untyped sequence of criteria against the grammar.
///
/// A sequence is valid iff every element validates; a malformed node anywhere
/// rejects the whole tree with the single [`CriteriaError::Invalid`].
pub fn validate_criterias(values: &[JsonValue]) -> Result<Vec<Criterion>, CriteriaError> {
    values.iter().map(classify).collect()
}

/// Classify a single untyped node, in the precedence order
/// join-node, extend-node, field-node. Unknown keys reject the node.
fn classify(value: &JsonValue) -> Result<Criterion, CriteriaError> {
    let obj = value.as_object().ok_or(CriteriaError::Invalid)?;

    if obj.contains_key("operator") && obj.contains_key("conditions") {
        if obj.len() != 2 {
            return Err(CriteriaError::Invalid);
        }
        let operator = obj
            .get("operator")
            .and_then(JsonValue::as_str)
            .ok_or(CriteriaError::Invalid)?
            .parse::<JoinOperator>()?;
        let raw = obj
            .get("conditions")
            .and_then(JsonValue::as_array)
            .ok_or(CriteriaError::Invalid)?;
        if raw.is_empty() {
            return Err(CriteriaError::Invalid);
        }
        let conditions = validate_criterias(raw)?;
        return Ok(Criterion::Join {
            operator,
            conditions,
        });
    }

    if obj.contains_key("category") {
        if obj.len() > 2 || !obj.keys().all(|k| k == "category" || k == "type") {
            return Err(CriteriaError::Invalid);
        }
        let category = obj
            .get("category")
            .and_then(JsonValue::as_str)
            .ok_or(CriteriaError::Invalid)?;
        if category.len() < MIN_NAME_LEN {
            return Err(CriteriaError::Invalid);
        }
        let kind = match obj.get("type") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => {
                Some(s.parse::<CategoryKind>().map_err(|_| CriteriaError::Invalid)?)
            }
            Some(_) => return Err(CriteriaError::Invalid),
        };
        return Ok(Criterion::Extend {
            category: category.to_string(),
            kind,
        });
    }

    if obj.contains_key("field") {
        if obj.len() != 3 || !obj.contains_key("comparison") || !obj.contains_key("value") {
            return Err(CriteriaError::Invalid);
        }
        let field = obj
            .get("field")
            .and_then(JsonValue::as_str)
            .ok_or(CriteriaError::Invalid)?;
        let comparison = obj
            .get("comparison")
            .and_then(JsonValue::as_str)
            .ok_or(CriteriaError::Invalid)?
            .parse::<ComparisonOp>()
            .map_err(|_| CriteriaError::Invalid)?;
        let value = obj
            .get("value")
            .map(CriterionValue::from_json)
            .transpose()?
            .ok_or(CriteriaError::Invalid)?;
        return Ok(Criterion::Field {
            field: field.to_string(),
            comparison,
            value,
        });
    }

    Err(CriteriaError::Invalid)
}
