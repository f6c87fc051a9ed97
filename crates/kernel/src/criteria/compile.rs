//! Predicate compiler.
//!
//! Walks a validated, resolved criterion tree and emits an equivalent
//! SeaQuery condition tree: join nodes become parenthesized groups attached
//! to their parent with the parent's join operator, field nodes become
//! `"field" <symbol> <value>` expressions with the value bound through
//! SeaQuery. Compiling the same tree always yields the same predicate.

use sea_query::{Cond, Expr, SimpleExpr, Value};

use super::options::{QueryOptions, ValueTemplates, VALUE_PLACEHOLDER};
use super::types::{ComparisonOp, Criterion, CriterionValue, JoinOperator};
use super::CriteriaError;

/// Compile a resolved criterion sequence into a SeaQuery condition group.
///
/// `join` is the operator combining the sequence's immediate children; each
/// nested join node introduces its own group with its own operator. The
/// caller attaches the returned group to a select statement with
/// `cond_where`, or into an enclosing group.
pub fn compile_criterias(
    criterias: &[Criterion],
    join: JoinOperator,
    options: &QueryOptions,
) -> Result<Cond, CriteriaError> {
    let mut group = match join {
        JoinOperator::And => Cond::all(),
        JoinOperator::Or => Cond::any(),
    };

    for criterion in criterias {
        match criterion {
            Criterion::Join {
                operator,
                conditions,
            } => {
                group = group.add(compile_criterias(conditions, *operator, options)?);
            }
            Criterion::Field {
                field,
                comparison,
                value,
            } => {
                group = group.add(field_condition(field, *comparison, value, options)?);
            }
            Criterion::Extend { category, .. } => {
                // References must be expanded by the resolver before compilation.
                return Err(CriteriaError::Unresolved(category.clone()));
            }
        }
    }

    Ok(group)
}

/// Build the condition expression for a single field test.
///
/// Shared by the criteria compiler and the ad-hoc listing filters so both
/// paths use the same operator table and value-wrap templates.
pub fn field_condition(
    field: &str,
    comparison: ComparisonOp,
    value: &CriterionValue,
    options: &QueryOptions,
) -> Result<SimpleExpr, CriteriaError> {
    if !is_valid_field_name(field) {
        return Err(CriteriaError::InvalidField(field.to_string()));
    }

    let symbol = options.operators.symbol(comparison);
    let bound = transform_value(comparison, value, &options.templates);

    Ok(Expr::cust_with_values(
        format!("\"{field}\" {symbol} $1"),
        [bound],
    ))
}

/// Transform a criterion value into its bound form for a comparison kind.
///
/// Containment operators wrap the comma-joined value into the array-literal
/// template; pattern operators wrap the raw string into the match template.
/// Everything else binds natively.
fn transform_value(
    comparison: ComparisonOp,
    value: &CriterionValue,
    templates: &ValueTemplates,
) -> Value {
    match comparison {
        ComparisonOp::ContainAll | ComparisonOp::ContainedBy => templates
            .array
            .replace(VALUE_PLACEHOLDER, &value.to_plain_string())
            .into(),
        ComparisonOp::MatchesInsensitive | ComparisonOp::MatchesSensitive => templates
            .string_matches
            .replace(VALUE_PLACEHOLDER, &value.to_plain_string())
            .into(),
        _ => scalar_value(value),
    }
}

fn scalar_value(value: &CriterionValue) -> Value {
    match value {
        CriterionValue::String(s) => s.clone().into(),
        CriterionValue::Integer(i) => (*i).into(),
        CriterionValue::Float(f) => (*f).into(),
        CriterionValue::Boolean(b) => (*b).into(),
        // Lists outside the containment operators degrade to their plain form.
        CriterionValue::List(_) => value.to_plain_string().into(),
    }
}

/// Whether a field name is safe to interpolate as a quoted SQL identifier.
///
/// Must be non-empty, start with a letter or underscore, and contain only
/// ASCII alphanumerics and underscores.
pub fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
