use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Root directory for uploaded files (temp files and regulation storage)
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Maximum organization spreadsheet size in bytes (default: 10MB)
    #[serde(default = "default_max_sheet_size")]
    pub max_sheet_size: usize,
    /// Maximum regulation document size in bytes (default: 50MB)
    #[serde(default = "default_max_regulation_size")]
    pub max_regulation_size: usize,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Default accounts created at startup when missing
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HS256 signing secret for bearer tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Token lifetime in days
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_days: default_token_ttl_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl DatabaseConfig {
    /// Generate database connection URL (rwc creates the file when missing)
    pub fn connection_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path.display())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    #[serde(default = "default_user_username")]
    pub user_username: String,
    #[serde(default = "default_user_password")]
    pub user_password: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
            user_username: default_user_username(),
            user_password: default_user_password(),
        }
    }
}

// Default value functions
fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./database/temple.db")
}

fn default_jwt_secret() -> String {
    // Must be overridden in production deployments
    "temple-portal-secret-change-in-production".to_string()
}

fn default_token_ttl_days() -> i64 {
    7
}

fn default_max_sheet_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_max_regulation_size() -> usize {
    50 * 1024 * 1024 // 50MB
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

fn default_user_username() -> String {
    "user".to_string()
}

fn default_user_password() -> String {
    "user123".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            upload_dir: default_upload_dir(),
            max_sheet_size: default_max_sheet_size(),
            max_regulation_size: default_max_regulation_size(),
            log: LogConfig::default(),
            auth: AuthConfig::default(),
            database: DatabaseConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Directory for temporary upload artifacts
    pub fn tmp_dir(&self) -> PathBuf {
        self.upload_dir.join("tmp")
    }

    /// Storage directory for a regulation department
    pub fn regulation_dir(&self, department: &str) -> PathBuf {
        self.upload_dir.join("regulations").join(department)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.addr, "0.0.0.0:8080");
        assert_eq!(config.max_sheet_size, 10 * 1024 * 1024);
        assert_eq!(config.bootstrap.admin_username, "admin");
    }

    #[test]
    fn test_database_url() {
        let db = DatabaseConfig {
            path: PathBuf::from("/data/temple.db"),
        };
        assert_eq!(db.connection_url(), "sqlite:///data/temple.db?mode=rwc");
    }

    #[test]
    fn test_toml_parse() {
        let toml_str = r#"
            addr = "127.0.0.1:9000"
            upload_dir = "/srv/uploads"

            [database]
            path = "/srv/temple.db"

            [auth]
            jwt_secret = "s3cret"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.upload_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.database.path, PathBuf::from("/srv/temple.db"));
        assert_eq!(config.auth.jwt_secret, "s3cret");
        // Unset sections fall back to defaults
        assert_eq!(config.auth.token_ttl_days, 7);
        assert_eq!(config.log.level, "info");
    }
}
