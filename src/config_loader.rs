use crate::config::{Config, RunConfig};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Load and parse a run list from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading run list from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open run list '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse run list '{}'", config_path.display()))?;

    info!("Run list contains {} runs", config.runs.len());
    Ok(config)
}

/// Command-line settings layered on top of the run list file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Logs given on the command line, appended after the file's runs
    pub logs: Vec<PathBuf>,
    /// Labels for runs that have none, in run order
    pub labels: Vec<String>,
    pub table_suffix: Option<String>,
    pub no_table: bool,
}

/// Apply CLI overrides to a run list and validate the result
pub fn apply_cli_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    config.runs.extend(overrides.logs.iter().map(|path| RunConfig {
        path: path.clone(),
        label: None,
    }));

    let mut labels = overrides.labels.iter();
    for run in config.runs.iter_mut().filter(|r| r.label.is_none()) {
        match labels.next() {
            Some(label) => run.label = Some(label.clone()),
            None => break,
        }
    }
    let unused = labels.count();
    if unused > 0 {
        warn!("{} labels were not assigned to any run", unused);
    }

    if let Some(ref suffix) = overrides.table_suffix {
        config.table_suffix = Some(suffix.clone());
    }
    if overrides.no_table {
        config.persist_table = Some(false);
    }

    config.validate()?;
    Ok(())
}

/// Build the run list from an optional YAML file plus CLI settings
pub fn resolve_config(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_cli_overrides(&mut config, overrides)?;
    Ok(config)
}
