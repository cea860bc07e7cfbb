use crate::config::{AppConfig, FlowConfig};
use config::Config;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Errors that can occur during application execution.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input/output operation failed.
    #[error("IO operation failed on path {path}: {source}")]
    IO {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Invalid glob pattern provided for flow discovery.
    #[error("Invalid glob pattern: {source}")]
    Pattern {
        #[source]
        source: glob::PatternError,
    },
    /// Configuration parsing or deserialization error.
    #[error("Failed to parse configuration: {source}")]
    Config {
        #[source]
        source: config::ConfigError,
    },
    /// Flow directory path is missing or cannot be converted to string.
    #[error("Invalid path")]
    InvalidPath,
}

/// Main application that loads and runs flows concurrently.
pub struct App {
    /// Global application configuration.
    pub config: AppConfig,
}

impl App {
    /// Loads flow configurations from disk, builds the flows and runs them
    /// until every flow has finished.
    #[tracing::instrument(skip(self), name = "app")]
    pub async fn start(self) -> Result<(), Error> {
        let app_config = Arc::new(self.config);

        let glob_pattern = app_config
            .flows
            .dir
            .as_ref()
            .and_then(|path| path.to_str())
            .ok_or(Error::InvalidPath)?;

        let flow_configs = load_flow_configs(glob_pattern)?;

        let mut flows: Vec<super::flow::Flow> = Vec::new();
        for config in flow_configs {
            let mut flow_builder = super::flow::FlowBuilder::new().config(Arc::new(config));
            if let Some(buffer_size) = app_config.event_buffer_size {
                flow_builder = flow_builder.event_buffer_size(buffer_size);
            }

            match flow_builder.build() {
                Ok(flow) => flows.push(flow),
                Err(e) => {
                    error!("Flow build failed: {}", e);
                    continue;
                }
            };
        }

        let mut background_handles = Vec::new();
        for mut flow in flows {
            if let Err(e) = flow.init().await {
                error!("Flow initialization failed for {}: {}", flow.name(), e);
                continue;
            }
            info!("{}", flow.describe());
            background_handles.push(flow.run());
        }

        let results = futures_util::future::join_all(background_handles).await;
        for result in results {
            if let Err(e) = result {
                error!("Background task panicked: {}", e);
            }
        }

        Ok(())
    }
}

/// Loads every flow file matching `glob_pattern`.
///
/// Files that cannot be read or parsed are logged and skipped.
pub fn load_flow_configs(glob_pattern: &str) -> Result<Vec<FlowConfig>, Error> {
    let flow_configs = glob::glob(glob_pattern)
        .map_err(|source| Error::Pattern { source })?
        .filter_map(|path| match path {
            Ok(path) => {
                info!("Loading flow: {:?}", path);
                match load_flow_config(&path) {
                    Ok(flow_config) => Some(flow_config),
                    Err(e) => {
                        error!("{}. Skipping this flow.", e);
                        None
                    }
                }
            }
            Err(e) => {
                error!("Failed to read flow path: {}. Skipping.", e);
                None
            }
        })
        .collect();
    Ok(flow_configs)
}

/// Reads one flow file, format taken from its extension (JSON by default).
pub fn load_flow_config(path: &Path) -> Result<FlowConfig, Error> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::IO {
        path: path.to_path_buf(),
        source,
    })?;

    let file_format = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => config::FileFormat::Yaml,
        _ => config::FileFormat::Json,
    };

    Config::builder()
        .add_source(config::File::from_str(&contents, file_format))
        .build()
        .and_then(|config| config.try_deserialize::<FlowConfig>())
        .map_err(|source| Error::Config { source })
}
