use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "SEASCAPE_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "seascape.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Seascape";
const APPLICATION: &str = "Seascape";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// An explicit `--config` path wins over the discovered location.
    pub fn resolve_config_file(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config_file())
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

fn env_override(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_path_wins() {
        let paths = AppPaths::from_raw(PathBuf::from("/etc/seascape"));
        assert_eq!(
            paths.resolve_config_file(None),
            PathBuf::from("/etc/seascape/seascape.toml")
        );
        assert_eq!(
            paths.resolve_config_file(Some(Path::new("custom.toml"))),
            PathBuf::from("custom.toml")
        );
        assert_eq!(paths.config_dir(), Path::new("/etc/seascape"));
    }
}
