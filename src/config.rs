//! Configuration: resolves the data root directory — configured by a single
//! environment variable or configuration file — into a [`DataRoot`].
//!
//! Resolution order: `ITCH_DATA_ROOT` env var, then an `itch-replay.toml`
//! in the current directory, then `./data`. Parsed with `serde`/`toml` the
//! way the rest of the crate's ecosystem choices dictate.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::layout::DataRoot;

const DEFAULT_DATA_ROOT: &str = "./data";
const CONFIG_FILE_NAME: &str = "itch-replay.toml";
const ENV_VAR: &str = "ITCH_DATA_ROOT";

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    data_root: Option<PathBuf>,
}

/// Resolves the data root: `ITCH_DATA_ROOT` env var, else `./itch-replay.toml`'s
/// `data_root` key, else `./data`. An explicit `--data-root` CLI flag (see
/// `src/bin/stage1.rs` / `stage2.rs`) takes priority over all three.
pub fn resolve_data_root(explicit: Option<PathBuf>) -> DataRoot {
    if let Some(path) = explicit {
        return DataRoot::new(path);
    }
    if let Ok(from_env) = std::env::var(ENV_VAR) {
        return DataRoot::new(from_env);
    }
    if let Some(path) = read_config_file(Path::new(CONFIG_FILE_NAME)) {
        return DataRoot::new(path);
    }
    DataRoot::new(DEFAULT_DATA_ROOT)
}

fn read_config_file(path: &Path) -> Option<PathBuf> {
    let text = std::fs::read_to_string(path).ok()?;
    let parsed: FileConfig = toml::from_str(&text)
        .map_err(|e| tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file"))
        .ok()?;
    parsed.data_root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_everything() {
        let root = resolve_data_root(Some(PathBuf::from("/explicit")));
        assert_eq!(root.as_path(), Path::new("/explicit"));
    }

    #[test]
    fn falls_back_to_default_when_nothing_configured() {
        std::env::remove_var(ENV_VAR);
        let root = resolve_data_root(None);
        assert!(root.as_path() == Path::new(DEFAULT_DATA_ROOT) || root.as_path().is_absolute());
    }
}
