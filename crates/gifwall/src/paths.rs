use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "GIFWALL_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "GIFWALL_DATA_DIR";
pub const ENV_SHARE_DIR: &str = "GIFWALL_SHARE_DIR";

const QUALIFIER: &str = "com";
const ORGANISATION: &str = "ankur";
const APPLICATION: &str = "gifwall";

const CONFIG_FILE: &str = "gifwall.toml";
const ASSET_DIR: &str = "assets";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
    share_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;

        let config_dir = resolve_dir(ENV_CONFIG_DIR, project_dirs.config_dir())
            .context("failed to resolve gifwall config directory")?;
        let data_dir = resolve_dir(ENV_DATA_DIR, project_dirs.data_dir())
            .context("failed to resolve gifwall data directory")?;
        let share_dir = resolve_share_dir(&project_dirs);

        Ok(Self {
            config_dir,
            data_dir,
            share_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// System-wide install location for the bundled wallpaper assets.
    pub fn share_dir(&self) -> &Path {
        &self.share_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Asset lookup order: user config, user data, then the shipped defaults.
    pub fn asset_roots(&self) -> Vec<PathBuf> {
        vec![
            self.config_dir.join(ASSET_DIR),
            self.data_dir.join(ASSET_DIR),
            self.share_dir.join(ASSET_DIR),
        ]
    }

    /// Resolves a bundled asset by name. Values that point at an existing file
    /// are used as-is; bare names are looked up in the asset roots in order.
    pub fn resolve_asset(&self, name: &str) -> Result<PathBuf> {
        let direct = Path::new(name);
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }

        for root in self.asset_roots() {
            let candidate = root.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        let searched = self
            .asset_roots()
            .iter()
            .map(|root| root.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        bail!("asset '{name}' not found (searched: {searched})")
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, data_dir: PathBuf, share_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
            share_dir,
        }
    }
}

fn resolve_dir(env_var: &str, default: &Path) -> Result<PathBuf> {
    if let Some(value) = env_override(env_var) {
        return Ok(value);
    }
    Ok(default.to_path_buf())
}

fn resolve_share_dir(project_dirs: &ProjectDirs) -> PathBuf {
    env_override(ENV_SHARE_DIR).unwrap_or_else(|| default_share_dir(project_dirs))
}

#[cfg(target_family = "unix")]
fn default_share_dir(_: &ProjectDirs) -> PathBuf {
    PathBuf::from("/usr/share/gifwall")
}

#[cfg(not(target_family = "unix"))]
fn default_share_dir(project_dirs: &ProjectDirs) -> PathBuf {
    project_dirs.data_dir().to_path_buf()
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
