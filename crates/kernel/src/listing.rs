//! Query shaping for list endpoints.
//!
//! Translates a flat query-string map into filter, field-projection, sort,
//! and pagination clauses over a SeaQuery select statement, always applied
//! in that fixed order. Filters share the operator table and value-wrap
//! templates with the criteria compiler.
//!
//! Supported query shapes:
//! - `price=2800` — direct equality
//! - `price[gte]=2500` — explicit comparison operator
//! - `fields=name,price` — column projection
//! - `sort=-price,name` — multi-key sort, leading `-` for descending
//! - `page=2&limit=5` — pagination (defaults `page=1`, `limit=10`)

use std::collections::HashMap;

use sea_query::{Alias, Asterisk, Order, PostgresQueryBuilder, Query, SelectStatement};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::criteria::{
    field_condition, is_valid_field_name, ComparisonOp, CriteriaError, CriterionValue,
    QueryOptions,
};

/// Query keys excluded from filter interpretation.
const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Default page when pagination is requested without a usable page number.
const DEFAULT_PAGE: u64 = 1;

/// Default page size when pagination is requested without a usable limit.
const DEFAULT_LIMIT: u64 = 10;

/// Parsed request query, one per incoming list request.
#[derive(Debug, Clone, Default)]
pub struct ListingParams {
    filters: Vec<(String, ComparisonOp, String)>,
    fields: Option<String>,
    sort: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

impl ListingParams {
    /// Parse a flat query map. Filter keys are either plain field names
    /// (equality) or `field[operator]`; the operator must belong to the
    /// closed comparison set.
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, CriteriaError> {
        let mut params = Self {
            fields: query.get("fields").cloned(),
            sort: query.get("sort").cloned(),
            page: query.get("page").cloned(),
            limit: query.get("limit").cloned(),
            ..Default::default()
        };

        for (key, value) in query {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }

            let (field, comparison) = match key.strip_suffix(']').and_then(|k| k.split_once('[')) {
                Some((field, operator)) => (field, operator.parse::<ComparisonOp>()?),
                None => (key.as_str(), ComparisonOp::Eq),
            };

            if !is_valid_field_name(field) {
                return Err(CriteriaError::InvalidField(field.to_string()));
            }

            params
                .filters
                .push((field.to_string(), comparison, value.clone()));
        }

        // Query maps carry no reliable ordering; sort filters by field so the
        // generated SQL is stable across requests.
        params.filters.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(params)
    }

    fn wants_pagination(&self) -> bool {
        self.page.is_some() || self.limit.is_some()
    }
}

/// Applies a [`ListingParams`] to a select statement over one table.
pub struct ListingBuilder<'a> {
    table: &'a str,
    params: &'a ListingParams,
    options: &'a QueryOptions,
}

impl<'a> ListingBuilder<'a> {
    pub fn new(table: &'a str, params: &'a ListingParams, options: &'a QueryOptions) -> Self {
        Self {
            table,
            params,
            options,
        }
    }

    /// Apply all four shaping stages in their fixed order:
    /// filter, then projection, then sort, then pagination.
    pub fn apply(&self, query: &mut SelectStatement) -> Result<(), CriteriaError> {
        self.add_filters(query)?;
        self.add_projection(query)?;
        self.add_sorts(query)?;
        self.add_pagination(query);
        Ok(())
    }

    /// AND-join every remaining query pair as a filter condition.
    fn add_filters(&self, query: &mut SelectStatement) -> Result<(), CriteriaError> {
        for (field, comparison, value) in &self.params.filters {
            // Query-string values are untyped text; the backend coerces the
            // literal against the column type.
            let condition = field_condition(
                field,
                *comparison,
                &CriterionValue::String(value.clone()),
                self.options,
            )?;
            query.and_where(condition);
        }
        Ok(())
    }

    /// Restrict returned columns to the `fields` allow-list, qualified by the
    /// table alias; without it, select the whole row.
    fn add_projection(&self, query: &mut SelectStatement) -> Result<(), CriteriaError> {
        match &self.params.fields {
            Some(fields) => {
                for field in fields.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                    if !is_valid_field_name(field) {
                        return Err(CriteriaError::InvalidField(field.to_string()));
                    }
                    query.column((Alias::new(self.table), Alias::new(field)));
                }
            }
            None => {
                query.column((Alias::new(self.table), Asterisk));
            }
        }
        Ok(())
    }

    /// Successive order-by clauses in token order; leading `-` descends.
    fn add_sorts(&self, query: &mut SelectStatement) -> Result<(), CriteriaError> {
        let Some(sort) = &self.params.sort else {
            return Ok(());
        };

        for token in sort.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (field, order) = match token.strip_prefix('-') {
                Some(field) => (field, Order::Desc),
                None => (token, Order::Asc),
            };
            if !is_valid_field_name(field) {
                return Err(CriteriaError::InvalidField(field.to_string()));
            }
            query.order_by((Alias::new(self.table), Alias::new(field)), order);
        }
        Ok(())
    }

    /// Offset/limit from `page`/`limit`; absent both, return all rows.
    fn add_pagination(&self, query: &mut SelectStatement) {
        if !self.params.wants_pagination() {
            return;
        }

        let page = parse_or(&self.params.page, DEFAULT_PAGE);
        let limit = parse_or(&self.params.limit, DEFAULT_LIMIT);
        let skip = page.saturating_sub(1) * limit;

        query.limit(limit);
        query.offset(skip);
    }
}

/// Unparseable pagination values fall back to their defaults.
fn parse_or(value: &Option<String>, default: u64) -> u64 {
    value
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Execute a shaped select and return rows as JSON objects.
///
/// Wrapping the statement in `row_to_json` keeps projection-restricted
/// results decodable without a typed row mapping.
pub async fn fetch_rows(
    pool: &PgPool,
    query: &SelectStatement,
) -> Result<Vec<JsonValue>, sqlx::Error> {
    let sql = query.to_string(PostgresQueryBuilder);
    sqlx::query_scalar(&format!("SELECT row_to_json(t) FROM ({sql}) t"))
        .fetch_all(pool)
        .await
}

/// Build the base select for a table, shaped by the request query.
pub fn shaped_select(
    table: &str,
    params: &ListingParams,
    options: &QueryOptions,
) -> Result<SelectStatement, CriteriaError> {
    let mut query = Query::select();
    query.from(Alias::new(table));
    ListingBuilder::new(table, params, options).apply(&mut query)?;
    Ok(query)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn query_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn build(pairs: &[(&str, &str)]) -> String {
        let params = ListingParams::from_query(&query_map(pairs)).unwrap();
        shaped_select("customs", &params, &QueryOptions::default())
            .unwrap()
            .to_string(PostgresQueryBuilder)
    }

    #[test]
    fn plain_key_filters_by_equality() {
        let sql = build(&[("name", "Lebron Witness 7")]);
        assert!(
            sql.contains("\"name\" = 'Lebron Witness 7'"),
            "unexpected SQL: {sql}"
        );
    }

    #[test]
    fn bracketed_key_selects_operator() {
        let sql = build(&[("price", "2")]);
        assert!(sql.contains("\"price\" = '2'"), "unexpected SQL: {sql}");

        let sql = build(&[("price[gte]", "2")]);
        assert!(sql.contains("\"price\" >= '2'"), "unexpected SQL: {sql}");
    }

    #[test]
    fn reserved_keys_are_not_filters() {
        let sql = build(&[("sort", "name"), ("page", "1"), ("limit", "5"), ("fields", "name")]);
        assert!(!sql.contains("\"sort\""), "sort leaked into WHERE: {sql}");
        assert!(!sql.contains("\"page\""), "page leaked into WHERE: {sql}");
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let result = ListingParams::from_query(&query_map(&[("price[near]", "2")]));
        assert!(matches!(
            result,
            Err(CriteriaError::UnknownOperator(op)) if op == "near"
        ));
    }

    #[test]
    fn invalid_filter_field_is_rejected() {
        let result = ListingParams::from_query(&query_map(&[("price; DROP", "2")]));
        assert!(matches!(result, Err(CriteriaError::InvalidField(_))));
    }

    #[test]
    fn projection_limits_columns() {
        let sql = build(&[("fields", "name,price")]);
        assert!(
            sql.starts_with("SELECT \"customs\".\"name\", \"customs\".\"price\""),
            "unexpected SQL: {sql}"
        );
        assert!(!sql.contains('*'), "projection should drop *: {sql}");
    }

    #[test]
    fn no_projection_selects_whole_row() {
        let sql = build(&[]);
        assert!(sql.contains("\"customs\".*"), "unexpected SQL: {sql}");
    }

    #[test]
    fn sort_descends_on_dash_prefix() {
        let sql = build(&[("sort", "-price")]);
        assert!(
            sql.contains("ORDER BY \"customs\".\"price\" DESC"),
            "unexpected SQL: {sql}"
        );
    }

    #[test]
    fn sort_applies_keys_left_to_right() {
        let sql = build(&[("sort", "-price,name")]);
        assert!(
            sql.contains("ORDER BY \"customs\".\"price\" DESC, \"customs\".\"name\" ASC"),
            "unexpected SQL: {sql}"
        );
    }

    #[test]
    fn invalid_sort_field_is_rejected() {
        let params = ListingParams::from_query(&query_map(&[("sort", "price;--")])).unwrap();
        let result = shaped_select("customs", &params, &QueryOptions::default());
        assert!(matches!(result, Err(CriteriaError::InvalidField(_))));
    }

    #[test]
    fn pagination_computes_offset_from_page() {
        let sql = build(&[("page", "2"), ("limit", "5")]);
        assert!(sql.contains("LIMIT 5"), "unexpected SQL: {sql}");
        assert!(sql.contains("OFFSET 5"), "unexpected SQL: {sql}");
    }

    #[test]
    fn pagination_defaults_when_partially_given() {
        let sql = build(&[("page", "3")]);
        assert!(sql.contains("LIMIT 10"), "unexpected SQL: {sql}");
        assert!(sql.contains("OFFSET 20"), "unexpected SQL: {sql}");

        let sql = build(&[("limit", "25")]);
        assert!(sql.contains("LIMIT 25"), "unexpected SQL: {sql}");
        assert!(sql.contains("OFFSET 0"), "unexpected SQL: {sql}");
    }

    #[test]
    fn absent_pagination_returns_all_rows() {
        let sql = build(&[("sort", "name")]);
        assert!(!sql.contains("LIMIT"), "unexpected LIMIT: {sql}");
        assert!(!sql.contains("OFFSET"), "unexpected OFFSET: {sql}");
    }

    #[test]
    fn unparseable_pagination_falls_back_to_defaults() {
        let sql = build(&[("page", "abc")]);
        assert!(sql.contains("LIMIT 10"), "unexpected SQL: {sql}");
        assert!(sql.contains("OFFSET 0"), "unexpected SQL: {sql}");
    }

    #[test]
    fn page_zero_clamps_to_first_page() {
        let sql = build(&[("page", "0"), ("limit", "5")]);
        assert!(sql.contains("OFFSET 0"), "unexpected SQL: {sql}");
    }

    #[test]
    fn stages_compose() {
        let sql = build(&[
            ("price[lt]", "3000"),
            ("fields", "name,price"),
            ("sort", "-price"),
            ("page", "2"),
            ("limit", "5"),
        ]);

        assert!(sql.contains("\"price\" < '3000'"), "filter missing: {sql}");
        assert!(sql.contains("\"customs\".\"name\""), "projection missing: {sql}");
        assert!(sql.contains("DESC"), "sort missing: {sql}");
        assert!(sql.contains("LIMIT 5 OFFSET 5"), "pagination missing: {sql}");
    }
}
