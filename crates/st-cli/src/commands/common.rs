//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use st_core::config::CONFIG_FILE_NAMES;
use st_core::{Config, TableMetadataLookup};
use st_meta::{CachedLookup, Catalog};
use st_sql::{LineageEngine, LineageOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::cli::{GlobalArgs, SqlInput};

/// Everything a command needs to run the engine
pub(crate) struct CommandContext {
    pub(crate) engine: LineageEngine,
    pub(crate) dialect: String,
    provider: Option<CachedLookup<Catalog>>,
}

impl CommandContext {
    /// Load config, apply command-line overrides, and open the catalog if configured.
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let (mut config, config_dir) = load_config(global.config.as_deref())?;

        if let Some(project) = &global.project {
            config.default_project = Some(project.clone());
        }
        if let Some(dataset) = &global.dataset {
            config.default_dataset = Some(dataset.clone());
        }

        let provider = match config.catalog_path_absolute(&config_dir) {
            Some(path) => {
                let catalog = Catalog::load(&path)
                    .with_context(|| format!("Failed to load catalog {}", path.display()))?;
                Some(CachedLookup::new(catalog))
            }
            None => None,
        };

        let dialect = global
            .dialect
            .clone()
            .unwrap_or_else(|| config.dialect.to_string());

        Ok(Self {
            engine: LineageEngine::new(LineageOptions::from_config(&config)),
            dialect,
            provider,
        })
    }

    /// Metadata provider for the engine, if a catalog is configured
    pub(crate) fn provider(&self) -> Option<&dyn TableMetadataLookup> {
        self.provider
            .as_ref()
            .map(|p| p as &dyn TableMetadataLookup)
    }
}

/// Explicit config path, else `strata.yml`/`strata.yaml` in the working
/// directory, else built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    if let Some(path) = explicit {
        let config = Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        return Ok((config, dir));
    }

    let cwd = PathBuf::from(".");
    if CONFIG_FILE_NAMES.iter().any(|name| cwd.join(name).exists()) {
        let config = Config::load_from_dir(&cwd).context("Failed to load project config")?;
        return Ok((config, cwd));
    }

    log::debug!("No config file found, using defaults");
    Ok((Config::default(), cwd))
}

/// Read the SQL text from `--sql`, the FILE argument, or stdin.
pub(crate) fn read_sql(input: &SqlInput) -> Result<String> {
    if let Some(sql) = &input.sql {
        return Ok(sql.clone());
    }
    if let Some(path) = &input.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file {}", path.display()));
    }
    let mut sql = String::new();
    std::io::stdin()
        .read_to_string(&mut sql)
        .context("Failed to read SQL from stdin")?;
    Ok(sql)
}
