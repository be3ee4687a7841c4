//! Connection configuration

use std::collections::HashMap;

/// Connection configuration
///
/// Describes the connection target and credentials. The pool never looks
/// inside this; it is consumed by factory implementations only.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Unique identifier
    pub id: uuid::Uuid,
    /// Display name
    pub name: String,
    /// Driver ID (e.g., "postgres", "mysql", "sqlite")
    pub driver: String,
    /// Host address (empty for file-based databases)
    pub host: String,
    /// Port number (0 for default or file-based)
    pub port: u16,
    /// Database name or file path
    pub database: Option<String>,
    /// Username
    pub username: Option<String>,
    /// Password (should be encrypted in storage)
    pub password: Option<String>,
    /// Additional connection parameters
    pub params: HashMap<String, String>,
    /// Created timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last used timestamp
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ConnectConfig {
    /// Create a new configuration with default values
    pub fn new(driver: &str, name: &str) -> Self {
        tracing::debug!(driver = %driver, name = %name, "creating connection config");
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            driver: driver.to_string(),
            host: String::new(),
            port: 0,
            database: None,
            username: None,
            password: None,
            params: HashMap::new(),
            created_at: chrono::Utc::now(),
            last_used_at: None,
        }
    }

    /// Create a SQLite configuration
    pub fn new_sqlite(database_path: &str) -> Self {
        let mut config = Self::new("sqlite", "SQLite Database");
        config.database = Some(database_path.to_string());
        config
    }

    /// Create a PostgreSQL configuration
    pub fn new_postgres(host: &str, port: u16, database: &str, username: &str) -> Self {
        let mut config = Self::new("postgres", "PostgreSQL");
        config.host = host.to_string();
        config.port = port;
        config.database = Some(database.to_string());
        config.username = Some(username.to_string());
        config
    }

    /// Create a MySQL configuration
    pub fn new_mysql(host: &str, port: u16, database: &str, username: &str) -> Self {
        let mut config = Self::new("mysql", "MySQL");
        config.host = host.to_string();
        config.port = port;
        config.database = Some(database.to_string());
        config.username = Some(username.to_string());
        config
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let val = value.into();
        let str_val = match val {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        self.params.insert(key.to_string(), str_val);
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<String> {
        // First check params
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        // Check known fields
        match key {
            "host" => Some(self.host.clone()),
            "database" | "path" => self.database.clone(),
            "username" | "user" => self.username.clone(),
            "password" => self.password.clone(),
            _ => None,
        }
    }

    /// Get port
    pub fn get_port(&self) -> u16 {
        self.port
    }
}
