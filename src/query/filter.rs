use std::collections::HashMap;

use serde_json::Value;

/// A single WHERE-clause condition.
///
/// Filters render a SQL fragment with named `:param` placeholders plus the
/// matching bind values; the caller owns substitution into its driver. A
/// filter whose value is JSON null is a no-op: it is dropped entirely from
/// the generated clause (see [`Filter::is_omitted`]).
#[derive(Debug, Clone)]
pub enum Filter {
    /// Matches nothing; short-circuits a query to an empty result set.
    Break,
    Null {
        column: String,
    },
    NotNull {
        column: String,
    },
    Equal {
        column: String,
        value: Value,
        alias: Option<String>,
    },
    GreaterThan {
        column: String,
        value: Value,
        alias: Option<String>,
    },
    Range {
        column: String,
        from: Value,
        to: Value,
        alias: Option<String>,
    },
    List {
        column: String,
        values: Vec<Value>,
        alias: Option<String>,
    },
}

/// A bind-parameter declaration for drivers that need expanding ("value is
/// one of N") parameters declared up front.
#[derive(Debug, Clone, PartialEq)]
pub struct BindParam {
    pub name: String,
    pub expanding: bool,
}

impl BindParam {
    fn expanding(name: String) -> Self {
        Self { name, expanding: true }
    }
}

impl Filter {
    pub fn null(column: impl Into<String>) -> Self {
        Filter::Null { column: column.into() }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Filter::NotNull { column: column.into() }
    }

    pub fn equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Equal {
            column: column.into(),
            value: value.into(),
            alias: None,
        }
    }

    pub fn greater_than(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::GreaterThan {
            column: column.into(),
            value: value.into(),
            alias: None,
        }
    }

    pub fn range(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Filter::Range {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            alias: None,
        }
    }

    pub fn list(column: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::List {
            column: column.into(),
            values,
            alias: None,
        }
    }

    /// Render the column under a qualified name (`t.column`) while keeping
    /// the bare column name for the bind parameter. No effect on variants
    /// without a rendered column value.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            Filter::Equal { alias, .. }
            | Filter::GreaterThan { alias, .. }
            | Filter::Range { alias, .. }
            | Filter::List { alias, .. } => *alias = Some(name.into()),
            Filter::Break | Filter::Null { .. } | Filter::NotNull { .. } => {}
        }
        self
    }

    /// Whether this filter is excluded from the generated clause.
    ///
    /// Equality and comparison filters with a null value mean "no filter
    /// requested"; a range is dropped only when both bounds are null.
    pub fn is_omitted(&self) -> bool {
        match self {
            Filter::Equal { value, .. } | Filter::GreaterThan { value, .. } => value.is_null(),
            Filter::Range { from, to, .. } => from.is_null() && to.is_null(),
            Filter::Break | Filter::Null { .. } | Filter::NotNull { .. } | Filter::List { .. } => {
                false
            }
        }
    }

    pub fn clause(&self) -> String {
        match self {
            Filter::Break => "1 = 0".to_string(),
            Filter::Null { column } => format!("{} is null", column),
            Filter::NotNull { column } => format!("{} is not null", column),
            Filter::Equal { column, alias, .. } => {
                format!("{} = :{}", rendered(alias, column), column)
            }
            Filter::GreaterThan { column, alias, .. } => {
                format!("{} > :{}", rendered(alias, column), column)
            }
            Filter::Range { column, from, to, alias } => {
                let mut segments = Vec::new();
                if !from.is_null() {
                    segments.push(format!("{} >= :{}_from", rendered(alias, column), column));
                }
                if !to.is_null() {
                    segments.push(format!("{} < :{}_to", rendered(alias, column), column));
                }
                segments.join(" and ")
            }
            Filter::List { column, alias, .. } => {
                format!("{} in :{}s", rendered(alias, column), column)
            }
        }
    }

    pub fn params(&self) -> HashMap<String, Value> {
        let mut params = HashMap::new();
        match self {
            Filter::Equal { column, value, .. } | Filter::GreaterThan { column, value, .. } => {
                params.insert(column.clone(), value.clone());
            }
            Filter::Range { column, from, to, .. } => {
                if !from.is_null() {
                    params.insert(format!("{}_from", column), from.clone());
                }
                if !to.is_null() {
                    params.insert(format!("{}_to", column), to.clone());
                }
            }
            Filter::List { column, values, .. } => {
                params.insert(format!("{}s", column), Value::Array(values.clone()));
            }
            Filter::Break | Filter::Null { .. } | Filter::NotNull { .. } => {}
        }
        params
    }

    pub fn args(&self) -> Vec<BindParam> {
        match self {
            Filter::List { column, .. } => vec![BindParam::expanding(format!("{}s", column))],
            _ => Vec::new(),
        }
    }
}

fn rendered<'a>(alias: &'a Option<String>, column: &'a str) -> &'a str {
    alias.as_deref().unwrap_or(column)
}
