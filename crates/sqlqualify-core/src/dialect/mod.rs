//! SQL dialect support

use serde::{Deserialize, Serialize};
use sqlparser::dialect::{
    AnsiDialect, BigQueryDialect, Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect,
    RedshiftSqlDialect, SQLiteDialect, SnowflakeDialect,
};
use std::str::FromStr;

use crate::error::UnknownDialect;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    Ansi,
    #[default]
    PostgreSQL,
    MySQL,
    Redshift,
    BigQuery,
    Snowflake,
    SQLite,
    Generic,
}

impl SqlDialect {
    pub const ALL: [SqlDialect; 8] = [
        SqlDialect::Ansi,
        SqlDialect::PostgreSQL,
        SqlDialect::MySQL,
        SqlDialect::Redshift,
        SqlDialect::BigQuery,
        SqlDialect::Snowflake,
        SqlDialect::SQLite,
        SqlDialect::Generic,
    ];

    /// Get the sqlparser dialect for parsing
    pub fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Ansi => Box::new(AnsiDialect {}),
            SqlDialect::PostgreSQL => Box::new(PostgreSqlDialect {}),
            SqlDialect::MySQL => Box::new(MySqlDialect {}),
            SqlDialect::Redshift => Box::new(RedshiftSqlDialect {}),
            SqlDialect::BigQuery => Box::new(BigQueryDialect {}),
            SqlDialect::Snowflake => Box::new(SnowflakeDialect {}),
            SqlDialect::SQLite => Box::new(SQLiteDialect {}),
            SqlDialect::Generic => Box::new(GenericDialect {}),
        }
    }

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            SqlDialect::Ansi => "ansi",
            SqlDialect::PostgreSQL => "postgresql",
            SqlDialect::MySQL => "mysql",
            SqlDialect::Redshift => "redshift",
            SqlDialect::BigQuery => "bigquery",
            SqlDialect::Snowflake => "snowflake",
            SqlDialect::SQLite => "sqlite",
            SqlDialect::Generic => "generic",
        }
    }

    /// Whether an unqualified table alias may stand for a semi-structured
    /// (SUPER) navigation root, e.g. `SELECT o FROM customers c, c.orders o`.
    pub fn supports_super_navigation(&self) -> bool {
        matches!(self, SqlDialect::Redshift)
    }

    fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|d| d.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for SqlDialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ansi" => Ok(SqlDialect::Ansi),
            "postgresql" | "postgres" | "pg" => Ok(SqlDialect::PostgreSQL),
            "mysql" | "mysql8" => Ok(SqlDialect::MySQL),
            "redshift" => Ok(SqlDialect::Redshift),
            "bigquery" | "bq" => Ok(SqlDialect::BigQuery),
            "snowflake" => Ok(SqlDialect::Snowflake),
            "sqlite" | "sqlite3" => Ok(SqlDialect::SQLite),
            "generic" => Ok(SqlDialect::Generic),
            _ => Err(UnknownDialect {
                name: s.to_string(),
                supported: Self::supported_names(),
            }),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("pg".parse::<SqlDialect>(), Ok(SqlDialect::PostgreSQL));
        assert_eq!("Redshift".parse::<SqlDialect>(), Ok(SqlDialect::Redshift));
        assert_eq!("bq".parse::<SqlDialect>(), Ok(SqlDialect::BigQuery));
    }

    #[test]
    fn test_unknown_dialect_lists_supported() {
        let err = "oracle".parse::<SqlDialect>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'oracle'"));
        assert!(message.contains("redshift"));
    }

    #[test]
    fn test_name_round_trips_through_from_str() {
        for dialect in SqlDialect::ALL {
            assert_eq!(dialect.name().parse::<SqlDialect>(), Ok(dialect));
        }
    }

    #[test]
    fn test_only_redshift_supports_super_navigation() {
        for dialect in SqlDialect::ALL {
            assert_eq!(
                dialect.supports_super_navigation(),
                dialect == SqlDialect::Redshift
            );
        }
    }
}
