use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for the registry service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Generated registration documents
    pub documents: DocumentConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address the API listens on
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
    /// How long a writer waits for the SQLite lock
    pub busy_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON log lines instead of human readable ones
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentConfig {
    /// Generate DOCX/PDF registration sheets after organization writes
    pub enabled: bool,
    /// Directory the local blob store writes into
    pub storage_dir: PathBuf,
    /// Prefix for URLs handed back to clients
    pub public_base_url: String,
    /// Converter used to turn the rendered document into a PDF
    pub pdf_converter: String,
    pub pdf_converter_args: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "127.0.0.1:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://org-registry.db".to_string(),
                max_connections: 10,
                auto_migrate: true,
                busy_timeout_seconds: 5,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json: true,
            },
            documents: DocumentConfig {
                enabled: false, // needs a converter on the host
                storage_dir: PathBuf::from("uploads"),
                public_base_url: "http://127.0.0.1:8080/uploads".to_string(),
                pdf_converter: "soffice".to_string(),
                pdf_converter_args: vec![
                    "--headless".to_string(),
                    "--convert-to".to_string(),
                    "pdf".to_string(),
                ],
            },
        }
    }
}

impl RegistryConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (org-registry.toml, .org-registry-rc)
    /// 3. Environment variables (prefixed with ORG_REGISTRY__)
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&RegistryConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("org-registry.toml").exists() {
            builder = builder.add_source(File::with_name("org-registry"));
        }

        if Path::new(".org-registry-rc").exists() {
            builder = builder.add_source(
                File::with_name(".org-registry-rc").format(config::FileFormat::Toml),
            );
        }

        // Double underscore so keys like bind_addr survive the split
        builder = builder.add_source(
            Environment::with_prefix("ORG_REGISTRY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let registry_config: RegistryConfig = config.try_deserialize()?;

        Ok(registry_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<RegistryConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = RegistryConfig::load_env_file();
        RegistryConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static RegistryConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
