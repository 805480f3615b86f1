use std::collections::HashMap;

use serde_json::Value;

use super::filter::{BindParam, Filter};

/// A generated WHERE clause: combined text, merged bind values, and the
/// expanded bind-parameter declarations collected from list filters.
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    pub clause: String,
    pub params: HashMap<String, Value>,
    pub args: Vec<BindParam>,
}

/// Combine filters into a single WHERE clause.
///
/// Omitted filters contribute nothing; the remaining clauses are joined with
/// `and`, after the base clause when one is given. With no base clause and no
/// active filters the clause text is empty.
pub fn generate_where(filters: &[Filter], base_clause: Option<&str>) -> WhereClause {
    let mut params = HashMap::new();
    let mut args = Vec::new();

    let mut additional_clauses = Vec::new();
    for filter in filters {
        if filter.is_omitted() {
            continue;
        }
        additional_clauses.push(filter.clause());
        params.extend(filter.params());
        args.extend(filter.args());
    }

    let additional_clause = additional_clauses.join(" and ");

    let clause = match (base_clause, additional_clause.as_str()) {
        (Some(base), "") => format!("where {}", base),
        (Some(base), additional) => format!("where {} and {}", base, additional),
        (None, "") => String::new(),
        (None, additional) => format!("where {}", additional),
    };

    WhereClause { clause, params, args }
}

/// Render an ORDER BY clause from a semicolon-separated ordering string.
///
/// Each token is `column[:direction]`. The lookup substitutes a rendered
/// `(column, default direction)` pair for recognised keys; unrecognised keys
/// order by themselves, defaulting to descending. A descending direction
/// sorts nulls last.
pub fn generate_ordering(
    order_string: &str,
    order_lookup: &HashMap<String, (String, String)>,
) -> String {
    let mut order_by = Vec::new();

    for token in order_string.split(';') {
        let (key, dir) = match token.split_once(':') {
            Some((key, dir)) => (key, Some(dir)),
            None => (token, None),
        };

        let (order, dir_default) = match order_lookup.get(key) {
            Some((order, dir_default)) => (order.as_str(), dir_default.as_str()),
            None => (key, "desc"),
        };

        let mut dir = dir.unwrap_or(dir_default);
        if dir == "desc" {
            dir = "desc nulls last";
        }

        order_by.push(format!("{} {}", order, dir));
    }

    format!("order by {}", order_by.join(", "))
}
