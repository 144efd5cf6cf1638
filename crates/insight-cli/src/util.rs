//! Helpers shared by commands.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use insight_service::{AppState, Config};

/// Load the service configuration from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.validate()?;
    Ok(config)
}

/// Build an in-process monitor from `config` and advance it by `ticks` cycles.
///
/// Ticks run back to back, so timestamps are close together.
pub async fn local_state(config: Config, ticks: u32) -> Result<Arc<AppState>> {
    let state = AppState::from_config(config).await?;
    if ticks > 0 {
        let mut monitor = state.monitor.lock().await;
        for _ in 0..ticks {
            monitor.tick().await;
        }
        debug!("Advanced {} update cycles", ticks);
    }
    Ok(state)
}

/// Write output to file or stdout
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

/// Append output to a file, or print it to stdout.
pub fn append_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    let Some(path) = output else {
        return write_output(None, content);
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "[cycle]\ninterval_ms = 500\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.cycle.interval_ms, 500);
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "[cycle]\ninterval_ms = 1\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err().to_string();
        assert!(err.contains("cycle.interval_ms"));
    }

    #[tokio::test]
    async fn test_local_state_advances() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.simulation.latency_scale = 0.0;
        config.ai.settings_path = Some(dir.path().join("ai.json"));
        let state = local_state(config, 4).await.unwrap();
        let monitor = state.monitor.lock().await;
        assert!(monitor.devices().iter().all(|d| d.history.len() == 5));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_output(Some(&path), "hello\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        append_output(Some(&path), "again\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\nagain\n");
    }
}
