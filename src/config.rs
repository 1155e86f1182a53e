//! Configuration loading and management
//!
//! Handles parsing of `taskmaster.toml` in the data directory.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::Period;
use crate::ordering::{SortField, SortOrder};
use crate::task::{Priority, TaskStatus};
use crate::trends::Granularity;

/// Name of the config file inside the data directory
pub const CONFIG_FILE: &str = "taskmaster.toml";

const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task creation defaults
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Listing defaults
    #[serde(default)]
    pub list: ListConfig,

    /// Analytics settings
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Image attachment limits
    #[serde(default)]
    pub uploads: UploadsConfig,
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Priority for new tasks when none is given
    #[serde(default = "default_task_priority")]
    pub default_priority: String,

    /// Status for new tasks when none is given
    #[serde(default = "default_task_status")]
    pub default_status: String,

    /// Maximum title length in characters
    #[serde(default = "default_title_max_len")]
    pub title_max_len: usize,
}

fn default_task_priority() -> String {
    "MEDIUM".to_string()
}

fn default_task_status() -> String {
    "PENDING".to_string()
}

fn default_title_max_len() -> usize {
    100
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_priority: default_task_priority(),
            default_status: default_task_status(),
            title_max_len: default_title_max_len(),
        }
    }
}

/// Listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_sort_field")]
    pub default_sort_field: String,

    #[serde(default = "default_sort_order")]
    pub default_sort_order: String,

    /// Page size used when `--limit` is omitted
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_sort_field() -> String {
    "dueDate".to_string()
}

fn default_sort_order() -> String {
    "asc".to_string()
}

fn default_page_size() -> usize {
    50
}

fn default_max_page_size() -> usize {
    500
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_sort_field: default_sort_field(),
            default_sort_order: default_sort_order(),
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

/// Analytics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Offset of the reference timezone used for calendar days
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Number of most recent completions considered for streaks
    #[serde(default = "default_streak_window")]
    pub streak_window: usize,

    #[serde(default = "default_period")]
    pub default_period: String,

    #[serde(default = "default_granularity")]
    pub default_granularity: String,
}

fn default_streak_window() -> usize {
    100
}

fn default_period() -> String {
    "month".to_string()
}

fn default_granularity() -> String {
    "day".to_string()
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            streak_window: default_streak_window(),
            default_period: default_period(),
            default_granularity: default_granularity(),
        }
    }
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    #[serde(default = "default_upload_max_bytes")]
    pub max_bytes: u64,

    #[serde(default = "default_upload_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_upload_max_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_upload_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_upload_max_bytes(),
            allowed_extensions: default_upload_extensions(),
        }
    }
}

impl Config {
    /// Load configuration from a `taskmaster.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the data directory, or return defaults when absent
    pub fn load_from_dir(data_dir: &Path) -> crate::error::Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &PathBuf) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reference timezone for calendar-day computations
    pub fn reference_offset(&self) -> FixedOffset {
        self.analytics.offset()
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.tasks.validate()?;
        self.list.validate()?;
        self.analytics.validate()?;
        self.uploads.validate()?;
        Ok(())
    }
}

impl TasksConfig {
    pub fn priority(&self) -> crate::error::Result<Priority> {
        self.default_priority.parse()
    }

    pub fn status(&self) -> crate::error::Result<TaskStatus> {
        self.default_status.parse()
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.priority().map_err(as_config_error("tasks.default_priority"))?;
        self.status().map_err(as_config_error("tasks.default_status"))?;
        if self.title_max_len == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "tasks.title_max_len must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl ListConfig {
    pub fn sort_field(&self) -> crate::error::Result<SortField> {
        self.default_sort_field.parse()
    }

    pub fn sort_order(&self) -> crate::error::Result<SortOrder> {
        self.default_sort_order.parse()
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.sort_field().map_err(as_config_error("list.default_sort_field"))?;
        self.sort_order().map_err(as_config_error("list.default_sort_order"))?;
        if self.page_size == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "list.page_size must be > 0".to_string(),
            ));
        }
        if self.max_page_size < self.page_size {
            return Err(crate::error::Error::InvalidConfig(format!(
                "list.max_page_size ({}) must be >= list.page_size ({})",
                self.max_page_size, self.page_size
            )));
        }
        Ok(())
    }
}

impl AnalyticsConfig {
    /// Reference timezone; out-of-range offsets fall back to UTC
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn period(&self) -> crate::error::Result<Period> {
        self.default_period.parse()
    }

    pub fn granularity(&self) -> crate::error::Result<Granularity> {
        self.default_granularity.parse()
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(crate::error::Error::InvalidConfig(format!(
                "analytics.utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}"
            )));
        }
        if self.streak_window == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "analytics.streak_window must be > 0".to_string(),
            ));
        }
        self.period().map_err(as_config_error("analytics.default_period"))?;
        self.granularity()
            .map_err(as_config_error("analytics.default_granularity"))?;
        Ok(())
    }
}

impl UploadsConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.max_bytes == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "uploads.max_bytes must be > 0".to_string(),
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "uploads.allowed_extensions cannot be empty".to_string(),
            ));
        }
        for ext in &self.allowed_extensions {
            let trimmed = ext.trim();
            if trimmed.is_empty() || trimmed.starts_with('.') {
                return Err(crate::error::Error::InvalidConfig(format!(
                    "uploads.allowed_extensions: invalid entry '{ext}'"
                )));
            }
        }
        Ok(())
    }
}

fn as_config_error(field: &'static str) -> impl Fn(crate::error::Error) -> crate::error::Error {
    move |err| crate::error::Error::InvalidConfig(format!("{field}: {err}"))
}
