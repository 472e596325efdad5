use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::decoder::{BodyStrategy, PRIMARY_PART_ID};
use crate::error::{CorpusError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub body: BodyConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Gmail search filter the listing runs against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_before")]
    pub before: NaiveDate,
    #[serde(default = "default_after")]
    pub after: NaiveDate,
    /// Verbatim query used instead of the category/date filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            category: default_category(),
            before: default_before(),
            after: default_after(),
            raw: None,
        }
    }
}

impl QueryConfig {
    /// Render the Gmail search string, e.g.
    /// `category:updates before:2017/12/01 after:2017/04/01`
    pub fn to_query(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        format!(
            "category:{} before:{} after:{}",
            self.category,
            self.before.format("%Y/%m/%d"),
            self.after.format("%Y/%m/%d")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default = "default_start_sequence_id")]
    pub start_sequence_id: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            start_sequence_id: default_start_sequence_id(),
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyConfig {
    /// "text-plain" walks the MIME tree, "part-id" takes a fixed part
    #[serde(default = "default_body_strategy")]
    pub strategy: String,
    #[serde(default = "default_part_id")]
    pub part_id: String,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            strategy: default_body_strategy(),
            part_id: default_part_id(),
        }
    }
}

impl BodyConfig {
    pub fn body_strategy(&self) -> Result<BodyStrategy> {
        match self.strategy.as_str() {
            "text-plain" => Ok(BodyStrategy::FirstTextPlain),
            "part-id" => Ok(BodyStrategy::PartId(self.part_id.clone())),
            other => Err(CorpusError::ConfigError(format!(
                "Invalid body.strategy: '{}'. Must be 'text-plain' or 'part-id'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Corpus file; standard output when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Write a blank line for each fetched message that produced no record
    #[serde(default = "default_separator_for_skipped")]
    pub separator_for_skipped: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            separator_for_skipped: default_separator_for_skipped(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetryConfig {
    /// Retries for transient API failures; 0 fails on the first error
    #[serde(default)]
    pub max_retries: u32,
}

fn default_category() -> String {
    "updates".to_string()
}

fn default_before() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 12, 1).unwrap_or(NaiveDate::MIN)
}

fn default_after() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 4, 1).unwrap_or(NaiveDate::MIN)
}

fn default_start_sequence_id() -> u64 {
    100
}

fn default_limit() -> u64 {
    125
}

fn default_body_strategy() -> String {
    "text-plain".to_string()
}

fn default_part_id() -> String {
    PRIMARY_PART_ID.to_string()
}

fn default_separator_for_skipped() -> bool {
    true
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        let config = Self::read(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the configuration file without validating it, so that
    /// command-line overrides can be applied before validation
    pub async fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CorpusError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| CorpusError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CorpusError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CorpusError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| CorpusError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        match &self.query.raw {
            Some(raw) if raw.trim().is_empty() => {
                return Err(CorpusError::ConfigError(
                    "query.raw cannot be empty when set".to_string(),
                ));
            }
            Some(_) => {}
            None => {
                if self.query.category.is_empty()
                    || self.query.category.contains(char::is_whitespace)
                {
                    return Err(CorpusError::ConfigError(
                        "query.category must be a single non-empty word".to_string(),
                    ));
                }
                if self.query.after >= self.query.before {
                    return Err(CorpusError::ConfigError(format!(
                        "query.after ({}) must be earlier than query.before ({})",
                        self.query.after, self.query.before
                    )));
                }
            }
        }

        if self.harvest.limit == 0 {
            return Err(CorpusError::ConfigError(
                "harvest.limit must be at least 1".to_string(),
            ));
        }

        if self
            .harvest
            .start_sequence_id
            .checked_add(self.harvest.limit)
            .is_none()
        {
            return Err(CorpusError::ConfigError(format!(
                "harvest.start_sequence_id ({}) plus harvest.limit ({}) overflows the sequence id range",
                self.harvest.start_sequence_id, self.harvest.limit
            )));
        }

        self.body.body_strategy()?;
        if self.body.part_id.is_empty() {
            return Err(CorpusError::ConfigError(
                "body.part_id cannot be empty".to_string(),
            ));
        }

        if self.retry.max_retries > 10 {
            return Err(CorpusError::ConfigError(
                "retry.max_retries cannot exceed 10".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        Self::default().save(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.query.category, "updates");
        assert_eq!(config.harvest.start_sequence_id, 100);
        assert_eq!(config.harvest.limit, 125);
        assert_eq!(config.body.strategy, "text-plain");
        assert_eq!(config.body.part_id, "0");
        assert!(config.output.path.is_none());
        assert!(config.output.separator_for_skipped);
        assert_eq!(config.retry.max_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_query_string() {
        assert_eq!(
            QueryConfig::default().to_query(),
            "category:updates before:2017/12/01 after:2017/04/01"
        );
    }

    #[test]
    fn test_raw_query_overrides_filter() {
        let query = QueryConfig {
            raw: Some("category:forums".to_string()),
            ..Default::default()
        };
        assert_eq!(query.to_query(), "category:forums");
    }

    #[test]
    fn test_body_strategy_mapping() {
        let mut body = BodyConfig::default();
        assert_eq!(body.body_strategy().unwrap(), BodyStrategy::FirstTextPlain);

        body.strategy = "part-id".to_string();
        body.part_id = "1".to_string();
        assert_eq!(body.body_strategy().unwrap(), BodyStrategy::PartId("1".to_string()));

        body.strategy = "html".to_string();
        assert!(body.body_strategy().is_err());
    }

    #[test]
    fn test_config_validation_zero_limit() {
        let mut config = Config::default();
        config.harvest.limit = 0;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("at least 1"));
    }

    #[test]
    fn test_config_validation_sequence_range() {
        let mut config = Config::default();
        config.harvest.start_sequence_id = u64::MAX;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("overflows"));

        config.harvest.start_sequence_id = u64::MAX - config.harvest.limit;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_date_order() {
        let mut config = Config::default();
        config.query.after = config.query.before;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("must be earlier"));

        // Dates are irrelevant once a raw query is given
        config.query.raw = Some("in:inbox".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_category() {
        let mut config = Config::default();
        config.query.category = "two words".to_string();
        assert!(config.validate().is_err());

        config.query.category = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_raw_query() {
        let mut config = Config::default();
        config.query.raw = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_retry_bound() {
        let mut config = Config::default();
        config.retry.max_retries = 11;
        assert!(config.validate().is_err());
        config.retry.max_retries = 3;
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_config_load_save_roundtrip() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let mut config = Config::default();
        config.harvest.limit = 40;
        config.output.path = Some(PathBuf::from("corpus.txt"));
        config.save(path).await.unwrap();

        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.harvest.limit, 40);
        assert_eq!(loaded.output.path, Some(PathBuf::from("corpus.txt")));
        assert_eq!(loaded.query.to_query(), config.query.to_query());
    }

    #[tokio::test]
    async fn test_config_load_nonexistent_returns_default() {
        let path = Path::new("/tmp/nonexistent-gmail-corpus-config-12345.toml");
        let config = Config::load(path).await.unwrap();
        assert_eq!(config.harvest.limit, 125);
    }

    #[tokio::test]
    async fn test_config_load_invalid_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "this is not valid toml {[}]")
            .await
            .unwrap();

        let result = Config::load(temp_file.path()).await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[tokio::test]
    async fn test_config_partial_with_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let partial_config = r#"
[query]
category = "social"
after = "2017-01-01"

[harvest]
limit = 10
"#;
        tokio::fs::write(temp_file.path(), partial_config).await.unwrap();

        let config = Config::load(temp_file.path()).await.unwrap();

        assert_eq!(
            config.query.to_query(),
            "category:social before:2017/12/01 after:2017/01/01"
        );
        assert_eq!(config.harvest.limit, 10);
        assert_eq!(config.harvest.start_sequence_id, 100);
        assert!(config.output.separator_for_skipped);
    }

    #[tokio::test]
    async fn test_config_read_skips_validation() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[harvest]\nlimit = 0\n")
            .await
            .unwrap();

        let config = Config::read(temp_file.path()).await.unwrap();
        assert_eq!(config.harvest.limit, 0);
        assert!(Config::load(temp_file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_config_create_example() {
        let temp_file = NamedTempFile::new().unwrap();
        Config::create_example(temp_file.path()).await.unwrap();

        let config = Config::load(temp_file.path()).await.unwrap();
        assert_eq!(config.harvest.start_sequence_id, 100);
    }
}
