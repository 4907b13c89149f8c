//! Configuration management for annotation compatibility checks
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (annotation-compat.toml)
//! - Environment variables (ANNOTATION_COMPAT__*)
//!
//! ## Example config file (annotation-compat.toml):
//! ```toml
//! [check]
//! fail_on_incompatible = true
//! output_format = "text"
//!
//! [[handlers]]
//! namespace = "validate"
//! allow_value_updates = false
//!
//! [[handlers]]
//! namespace = "deprecated"
//!
//! [logging]
//! filter = "schema_annotation_compat=debug"
//! ```

use std::path::{Path, PathBuf};

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::{AnnotationHandler, GenericAnnotationHandler};
use crate::error::{AnnotationError, Result};

/// Main configuration for annotation compatibility checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Check behavior
    #[serde(default)]
    pub check: CheckConfig,

    /// Namespaces to check with the built-in handler
    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Exit with failure when any incompatible change is found
    #[serde(default = "default_true")]
    pub fail_on_incompatible: bool,

    /// How results are printed
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for one annotation namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Namespace key
    pub namespace: String,

    /// Treat changed field values as compatible
    #[serde(default = "default_true")]
    pub allow_value_updates: bool,

    /// Treat newly added fields as compatible
    #[serde(default = "default_true")]
    pub allow_field_additions: bool,
}

impl HandlerConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            allow_value_updates: true,
            allow_field_additions: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing-subscriber filter used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            fail_on_incompatible: true,
            output_format: OutputFormat::Text,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Config file name searched for in the working directory and the user config dir
const CONFIG_FILE: &str = "annotation-compat.toml";

/// Prefix of environment overrides, e.g. `ANNOTATION_COMPAT__CHECK__OUTPUT_FORMAT=json`
const ENV_PREFIX: &str = "ANNOTATION_COMPAT";

/// Optional config files, lowest precedence first
fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![
        PathBuf::from(CONFIG_FILE),
        PathBuf::from(format!(".{}", CONFIG_FILE)),
        Path::new("config").join(CONFIG_FILE),
    ];
    if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "annotation-compat") {
        locations.push(dirs.config_dir().join(CONFIG_FILE));
    }
    locations
}

impl CheckerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering `config_path` (which must exist) and then
    /// the environment over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        for location in default_locations() {
            builder = builder.add_source(File::from(location).required(false));
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        debug!(handlers = config.handlers.len(), "loaded checker configuration");
        Ok(config)
    }

    /// Load configuration for a check run.
    ///
    /// Namespaces requested on the command line are appended with default
    /// handler settings unless the configuration already covers them. A run
    /// with no namespace at all is rejected since it could never report anything.
    pub fn load_for_check(config_path: Option<&str>, namespaces: &[String]) -> Result<Self> {
        let mut config = Self::load_from(config_path)?;
        for namespace in namespaces {
            config.ensure_namespace(namespace);
        }
        if config.handlers.is_empty() {
            return Err(AnnotationError::Config(ConfigError::Message(
                "no annotation namespaces configured; pass --namespace or add [[handlers]]"
                    .to_string(),
            )));
        }
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Add a namespace with default handler settings unless already configured
    pub fn ensure_namespace(&mut self, namespace: &str) {
        if !self.handlers.iter().any(|h| h.namespace == namespace) {
            self.handlers.push(HandlerConfig::new(namespace));
        }
    }

    /// Build one generic handler per configured namespace, in config order
    pub fn build_handlers(&self) -> Vec<Box<dyn AnnotationHandler>> {
        self.handlers
            .iter()
            .map(|h| Box::new(GenericAnnotationHandler::from(h)) as Box<dyn AnnotationHandler>)
            .collect()
    }
}
