use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::index::SortKey;

pub const CONFIG_FILE: &str = "nbsite.toml";

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    #[default]
    Native,
    Command,
}

#[derive(PartialEq, Eq, Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub notebooks_dir: PathBuf,
    pub html_dir: PathBuf,
    pub index_file: PathBuf,
    pub sort: SortKey,
    pub converter: ConverterKind,
    pub command: Vec<String>,
    pub template_dir: Option<PathBuf>,
    pub site_name: String,
    pub repo_url: Option<String>,
    /// Deepest heading level listed in the page timeline.
    pub toc_level: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            notebooks_dir: PathBuf::from("notebooks"),
            html_dir: PathBuf::from("htmls"),
            index_file: PathBuf::from("tutorials.csv"),
            sort: SortKey::default(),
            converter: ConverterKind::default(),
            command: ["jupyter", "nbconvert", "--to", "html", "--stdout"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            template_dir: None,
            site_name: "DevQuest".to_string(),
            repo_url: None,
            toc_level: 3,
        }
    }
}

/// Raw key/value layer of a config file, merged before deserializing.
#[derive(Debug, Default)]
pub struct ConfigLayer(toml::Table);

impl ConfigLayer {
    pub fn read(path: impl AsRef<Path>) -> Result<ConfigLayer> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("reading {}: {}", path.display(), e))?;
        Ok(ConfigLayer(
            toml::from_str(&s).map_err(|e| anyhow!("parsing {}: {}", path.display(), e))?,
        ))
    }

    /// `nbsite.toml` in `root`, or an empty layer when there is none.
    pub fn read_default(root: &Path) -> Result<ConfigLayer> {
        let path = root.join(CONFIG_FILE);
        if path.is_file() {
            ConfigLayer::read(path)
        } else {
            Ok(ConfigLayer::default())
        }
    }

    /// Keys of `other` win.
    pub fn extend(&mut self, other: ConfigLayer) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn into_config(self) -> Result<Config> {
        Ok(toml::Value::Table(self.0).try_into()?)
    }
}

impl Config {
    /// Reads `nbsite.toml` from `root`, then `extra` on top of it.
    pub fn load(root: &Path, extra: Option<&Path>) -> Result<Config> {
        let mut layer = ConfigLayer::read_default(root)?;
        if let Some(extra) = extra {
            layer.extend(ConfigLayer::read(extra)?);
        }
        layer.into_config()
    }
}

/// A [`Config`] with every path resolved against the base directory.
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub notebooks_dir: PathBuf,
    pub html_dir: PathBuf,
    pub index_file: PathBuf,
    pub template_dir: Option<PathBuf>,
}

impl SitePaths {
    pub fn new(root: &Path, config: &Config) -> SitePaths {
        SitePaths {
            notebooks_dir: root.join(&config.notebooks_dir),
            html_dir: root.join(&config.html_dir),
            index_file: root.join(&config.index_file),
            template_dir: config.template_dir.as_ref().map(|dir| root.join(dir)),
        }
    }
}
