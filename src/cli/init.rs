//! taskmaster init command implementation
//!
//! Creates the data directory and writes a default `taskmaster.toml`.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Storage;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct InitReport {
    data_dir: PathBuf,
    created_config: bool,
}

pub fn run(data_dir: Option<PathBuf>, output: OutputOptions) -> Result<()> {
    let storage = Storage::open(data_dir)?;
    let config_path = storage.config_file();

    let created_config = if config_path.exists() {
        // Parse it so a broken file is reported now rather than on first use.
        Config::load(&config_path)?;
        false
    } else {
        Config::default().save(&config_path)?;
        true
    };
    tracing::info!(data_dir = %storage.data_dir().display(), created_config, "initialized");

    let report = InitReport {
        data_dir: storage.data_dir().to_path_buf(),
        created_config,
    };

    let header = if created_config {
        "taskmaster init: initialized data directory"
    } else {
        "taskmaster init: nothing to do"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("data dir", storage.data_dir().display().to_string());
    human.push_summary("config", config_path.display().to_string());
    human.push_next_step("taskmaster task new \"<title>\"");

    emit_success(output, "init", &report, Some(&human))
}
