//! Engine configuration: operator symbol table and value-wrap templates.
//!
//! Both are loaded once at startup from the environment and passed by
//! reference into the compiler and the listing builder; the engine never
//! reads ambient configuration.

use super::types::ComparisonOp;

/// Placeholder substituted by the value-wrap templates.
pub const VALUE_PLACEHOLDER: &str = "<VALUE>";

/// Backend operator symbol per comparison operator.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    pub eq: String,
    pub gt: String,
    pub gte: String,
    pub lt: String,
    pub lte: String,
    pub matches_insensitive: String,
    pub matches_sensitive: String,
    pub contain_all: String,
    pub contained_by: String,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self {
            eq: "=".to_string(),
            gt: ">".to_string(),
            gte: ">=".to_string(),
            lt: "<".to_string(),
            lte: "<=".to_string(),
            matches_insensitive: "~*".to_string(),
            matches_sensitive: "~".to_string(),
            contain_all: "@>".to_string(),
            contained_by: "<@".to_string(),
        }
    }
}

impl OperatorTable {
    /// The backend symbol for a comparison operator.
    pub fn symbol(&self, comparison: ComparisonOp) -> &str {
        match comparison {
            ComparisonOp::Eq => &self.eq,
            ComparisonOp::Gt => &self.gt,
            ComparisonOp::Gte => &self.gte,
            ComparisonOp::Lt => &self.lt,
            ComparisonOp::Lte => &self.lte,
            ComparisonOp::MatchesInsensitive => &self.matches_insensitive,
            ComparisonOp::MatchesSensitive => &self.matches_sensitive,
            ComparisonOp::ContainAll => &self.contain_all,
            ComparisonOp::ContainedBy => &self.contained_by,
        }
    }
}

/// Templates wrapping raw values into backend expressions.
///
/// `array` wraps a comma-joined number list into an array literal for the
/// containment operators; `string_matches` wraps a raw string into the
/// pattern-match expression for the `matches*` operators.
#[derive(Debug, Clone)]
pub struct ValueTemplates {
    pub array: String,
    pub string_matches: String,
}

impl Default for ValueTemplates {
    fn default() -> Self {
        Self {
            array: format!("{{{VALUE_PLACEHOLDER}}}"),
            string_matches: VALUE_PLACEHOLDER.to_string(),
        }
    }
}

/// Read-only engine configuration shared by all requests.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub operators: OperatorTable,
    pub templates: ValueTemplates,
}
