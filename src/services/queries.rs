//! Warehouse query catalog loaded from YAML.
//!
//! Each top-level key is a metric name holding an `sql` template:
//!
//! ```yaml
//! monthly_active_users:
//!   sql: |
//!     SELECT day, count() FROM ... WHERE day IN (PREV_MONTH, CURR_MONTH) GROUP BY day
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    types::{label, Period},
};

/// Catalog entry skipped by the weekly warehouse pass; it runs on BigQuery.
pub const ALGOKIT_DOWNLOADS: &str = "algokit_downloads";

#[derive(Debug, Deserialize)]
struct RawQuery {
    sql: String,
}

/// A named SQL template.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedQuery {
    pub name: String,
    pub sql: String,
}

impl NamedQuery {
    /// Substitute each placeholder with its single-quoted value.
    pub fn render(&self, bindings: &[(&str, String)]) -> String {
        bindings.iter().fold(self.sql.clone(), |sql, (placeholder, value)| {
            sql.replace(placeholder, &format!("'{}'", value))
        })
    }
}

/// Ordered set of metric queries.
#[derive(Debug, Clone, Default)]
pub struct QueryCatalog {
    pub queries: Vec<NamedQuery>,
}

impl QueryCatalog {
    /// Read a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        Self::from_yaml(&text)
    }

    /// Parse a catalog, keeping file order.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(text)?;
        let mut queries = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| AppError::Parse("query names must be strings".into()))?
                .to_string();
            let raw: RawQuery = serde_yaml::from_value(value)
                .map_err(|e| AppError::Parse(format!("query '{}': {}", name, e)))?;
            queries.push(NamedQuery { name, sql: raw.sql });
        }
        Ok(Self { queries })
    }

    pub fn get(&self, name: &str) -> Option<&NamedQuery> {
        self.queries.iter().find(|q| q.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedQuery> {
        self.queries.iter()
    }
}

/// Placeholders of a month-over-month query.
pub fn monthly_bindings(period: &Period) -> Vec<(&'static str, String)> {
    vec![
        ("START_1", label(period.previous_start())),
        ("START_2", label(period.current_start())),
        ("PREV_MONTH", period.previous_label()),
        ("CURR_MONTH", period.current_label()),
    ]
}

/// Placeholder of a single-week query.
pub fn week_bindings(week: NaiveDate) -> Vec<(&'static str, String)> {
    vec![("WEEK", label(week))]
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
fees_collected:
  sql: "SELECT day, sum(fee) FROM fees WHERE day BETWEEN START_1 AND CURR_MONTH"
online_stake:
  sql: "SELECT day, stake FROM stake WHERE day IN (PREV_MONTH, CURR_MONTH)"
algokit_downloads:
  sql: "SELECT count(*) AS python_downloads FROM pypi WHERE week = WEEK"
"#;

    #[test]
    fn test_catalog_keeps_file_order() {
        let catalog = QueryCatalog::from_yaml(CATALOG).unwrap();
        let names: Vec<_> = catalog.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["fees_collected", "online_stake", "algokit_downloads"]);
    }

    #[test]
    fn test_monthly_render() {
        let catalog = QueryCatalog::from_yaml(CATALOG).unwrap();
        let period = Period::monthly(Some("2024-01-31")).unwrap();
        let bindings = monthly_bindings(&period);

        let sql = catalog.get("fees_collected").unwrap().render(&bindings);
        assert_eq!(
            sql,
            "SELECT day, sum(fee) FROM fees WHERE day BETWEEN '2023-12-01' AND '2024-01-31'"
        );

        let sql = catalog.get("online_stake").unwrap().render(&bindings);
        assert!(sql.contains("IN ('2023-12-31', '2024-01-31')"));
    }

    #[test]
    fn test_week_render() {
        let catalog = QueryCatalog::from_yaml(CATALOG).unwrap();
        let week = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let sql = catalog.get(ALGOKIT_DOWNLOADS).unwrap().render(&week_bindings(week));
        assert!(sql.ends_with("week = '2024-01-07'"));
    }

    #[test]
    fn test_catalog_rejects_entry_without_sql() {
        let err = QueryCatalog::from_yaml("broken:\n  query: SELECT 1\n").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_missing_catalog_file_is_io_error() {
        let err = QueryCatalog::load("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
        assert!(err.to_string().contains("does/not/exist.yaml"));
    }
}
