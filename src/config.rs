use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::chat::DEFAULT_SYSTEM_PROMPT;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Local record store settings
    pub database: DatabaseConfig,
    /// Log output settings
    pub logging: LoggingConfig,
    /// Completion API settings
    pub chat: ChatConfig,
    /// Booking workflow settings
    pub booking: BookingConfig,
}

/// Local record store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path
    pub path: String,
    /// Connection pool size
    pub max_connections: u32,
    /// Drop and recreate all tables at start-up. Destroys data.
    pub reset_on_launch: bool,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Daily-rolled JSON log file, if any
    #[serde(default)]
    pub file_path: Option<String>,
    /// Console format: "text" or "json"
    pub format: String,
}

/// Completion API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Chat completions endpoint
    pub endpoint: String,
    /// Model name sent with every request
    pub model: String,
    /// Bearer token; `OPENAI_API_KEY` takes precedence
    #[serde(default)]
    pub api_key: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Reply length cap
    pub max_tokens: u32,
    /// Retries after a 429 before giving up
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry
    pub base_delay_ms: u64,
    /// Prior turns sent as context
    pub history_window: usize,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
    /// Fixed system instruction
    pub system_prompt: String,
}

/// Booking workflow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Refuse a doctor+date+time that is already stored
    pub prevent_double_booking: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "data/appointments.db".to_string(),
                max_connections: 4,
                reset_on_launch: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            chat: ChatConfig {
                endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                api_key: None,
                temperature: 0.7,
                max_tokens: 150,
                max_retries: 3,
                base_delay_ms: 1000,
                history_window: 4,
                request_timeout_secs: 60,
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            },
            booking: BookingConfig {
                prevent_double_booking: false,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        // Start with default values
        for (key, value) in Self::default() {
            builder = builder.set_default(key, value)?;
        }

        let config = builder
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // Add environment variables with prefix, e.g. CLINIC_CHAT__MODEL
            .add_source(
                Environment::with_prefix("CLINIC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate database config
        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("database.path must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate chat config
        if self.chat.endpoint.trim().is_empty() {
            return Err(anyhow::anyhow!("chat.endpoint must not be empty"));
        }
        if self.chat.model.trim().is_empty() {
            return Err(anyhow::anyhow!("chat.model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(anyhow::anyhow!(
                "chat.temperature must be between 0 and 2, got {}",
                self.chat.temperature
            ));
        }
        if self.chat.max_tokens == 0 {
            return Err(anyhow::anyhow!("chat.max_tokens must be greater than 0"));
        }
        if self.chat.history_window == 0 {
            return Err(anyhow::anyhow!("chat.history_window must be greater than 0"));
        }
        if self.chat.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("chat.request_timeout_secs must be greater than 0"));
        }

        Ok(())
    }

    /// Get database path from environment or config
    #[must_use]
    pub fn get_database_path(&self) -> String {
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| self.database.path.clone())
    }

    /// Get completion API key from environment or config
    #[must_use]
    pub fn get_api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.chat.api_key.clone())
    }
}

impl IntoIterator for AppConfig {
    type Item = (String, config::Value);
    type IntoIter = std::collections::hash_map::IntoIter<String, config::Value>;

    fn into_iter(self) -> Self::IntoIter {
        let mut map = HashMap::new();

        // Flatten the configuration into key-value pairs
        map.insert("database.path".to_string(), config::Value::from(self.database.path));
        map.insert("database.max_connections".to_string(), config::Value::from(self.database.max_connections));
        map.insert("database.reset_on_launch".to_string(), config::Value::from(self.database.reset_on_launch));

        map.insert("logging.level".to_string(), config::Value::from(self.logging.level));
        if let Some(file_path) = self.logging.file_path {
            map.insert("logging.file_path".to_string(), config::Value::from(file_path));
        }
        map.insert("logging.format".to_string(), config::Value::from(self.logging.format));

        map.insert("chat.endpoint".to_string(), config::Value::from(self.chat.endpoint));
        map.insert("chat.model".to_string(), config::Value::from(self.chat.model));
        if let Some(api_key) = self.chat.api_key {
            map.insert("chat.api_key".to_string(), config::Value::from(api_key));
        }
        map.insert("chat.temperature".to_string(), config::Value::from(f64::from(self.chat.temperature)));
        map.insert("chat.max_tokens".to_string(), config::Value::from(self.chat.max_tokens));
        map.insert("chat.max_retries".to_string(), config::Value::from(self.chat.max_retries));
        map.insert("chat.base_delay_ms".to_string(), config::Value::from(self.chat.base_delay_ms));
        map.insert("chat.history_window".to_string(), config::Value::from(self.chat.history_window as u64));
        map.insert("chat.request_timeout_secs".to_string(), config::Value::from(self.chat.request_timeout_secs));
        map.insert("chat.system_prompt".to_string(), config::Value::from(self.chat.system_prompt));

        map.insert(
            "booking.prevent_double_booking".to_string(),
            config::Value::from(self.booking.prevent_double_booking),
        );

        map.into_iter()
    }
}
