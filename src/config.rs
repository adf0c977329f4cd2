use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// SQL dialect the renderer targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    Generic,
    Postgres,
    Mysql,
    SqlServer,
}

#[derive(Debug, Error)]
#[error("unknown dialect `{0}` (expected generic, postgres, mysql or sql_server)")]
pub struct UnknownDialect(String);

impl FromStr for DialectKind {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "ansi" => Ok(DialectKind::Generic),
            "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "mysql" => Ok(DialectKind::Mysql),
            "sql_server" | "sqlserver" | "mssql" => Ok(DialectKind::SqlServer),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialectKind::Generic => "generic",
            DialectKind::Postgres => "postgres",
            DialectKind::Mysql => "mysql",
            DialectKind::SqlServer => "sql_server",
        };
        write!(f, "{}", name)
    }
}

/// Translator configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Target SQL dialect
    pub dialect: DialectKind,

    /// Bound on implicit (default-fetch and fetch-profile) join expansion
    #[validate(range(max = 16, message = "Max fetch depth must be between 0 and 16"))]
    pub max_fetch_depth: u32,

    /// Prefix generated SQL with the query comment, if any
    pub use_sql_comments: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::Generic,
            max_fetch_depth: 3,
            use_sql_comments: false,
        }
    }
}

impl TranslatorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            dialect: parse_env_var("CRITERIA_SQL_DIALECT", "generic")?,
            max_fetch_depth: parse_env_var("CRITERIA_SQL_MAX_FETCH_DEPTH", "3")?,
            use_sql_comments: parse_env_var("CRITERIA_SQL_USE_COMMENTS", "false")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            dialect: cli.dialect,
            max_fetch_depth: cli.max_fetch_depth,
            use_sql_comments: cli.use_sql_comments,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Merge with another configuration (CLI overrides environment)
    pub fn merge(&mut self, other: Self) {
        self.dialect = other.dialect;
        self.max_fetch_depth = other.max_fetch_depth;
        self.use_sql_comments = other.use_sql_comments;
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub dialect: DialectKind,
    pub max_fetch_depth: u32,
    pub use_sql_comments: bool,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TranslatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_fetch_depth, 3);
        assert_eq!(config.dialect, DialectKind::Generic);
        assert!(!config.use_sql_comments);
    }

    #[test]
    fn test_invalid_fetch_depth() {
        let config = TranslatorConfig {
            max_fetch_depth: 17, // Invalid (> 16)
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!("PostgreSQL".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
        assert_eq!("mssql".parse::<DialectKind>().unwrap(), DialectKind::SqlServer);
        assert!("oracle".parse::<DialectKind>().is_err());
        assert_eq!(DialectKind::SqlServer.to_string(), "sql_server");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("CRITERIA_SQL_DIALECT", "postgres");
        env::set_var("CRITERIA_SQL_MAX_FETCH_DEPTH", "5");
        env::remove_var("CRITERIA_SQL_USE_COMMENTS");

        let config = TranslatorConfig::from_env().unwrap();
        assert_eq!(config.dialect, DialectKind::Postgres);
        assert_eq!(config.max_fetch_depth, 5);
        assert!(!config.use_sql_comments);

        env::remove_var("CRITERIA_SQL_DIALECT");
        env::remove_var("CRITERIA_SQL_MAX_FETCH_DEPTH");
    }

    #[test]
    #[serial]
    fn test_from_env_reports_bad_value() {
        env::set_var("CRITERIA_SQL_MAX_FETCH_DEPTH", "deep");

        let err = TranslatorConfig::from_env().unwrap_err();
        match err {
            ConfigError::Parse { field, value, .. } => {
                assert_eq!(field, "CRITERIA_SQL_MAX_FETCH_DEPTH");
                assert_eq!(value, "deep");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        env::remove_var("CRITERIA_SQL_MAX_FETCH_DEPTH");
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dialect: mysql\nmax_fetch_depth: 1").unwrap();

        let config = TranslatorConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.dialect, DialectKind::Mysql);
        assert_eq!(config.max_fetch_depth, 1);
        assert!(!config.use_sql_comments);
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = TranslatorConfig::default();
        base.merge(TranslatorConfig {
            dialect: DialectKind::SqlServer,
            max_fetch_depth: 0,
            use_sql_comments: true,
        });
        assert_eq!(base.dialect, DialectKind::SqlServer);
        assert_eq!(base.max_fetch_depth, 0);
        assert!(base.use_sql_comments);
    }
}
