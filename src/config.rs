use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::formatter::FormatterOptions;

pub const CONFIG_FILE: &str = ".pasfix.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub indent_size: usize,
    pub max_blank_lines: usize,
    pub extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let opts = FormatterOptions::default();
        Self {
            indent_size: opts.indent_size,
            max_blank_lines: opts.max_blank_lines,
            extensions: ["pas", "pp", "inc", "lpr", "dpr"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Config {
    pub fn from_json(text: &str, path: &Path) -> Result<Self> {
        let config: Config = serde_json::from_str(text).map_err(|e| Error::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.indent_size == 0 || self.indent_size > 16 {
            return Err(Error::Config(format!(
                "indent_size must be between 1 and 16, got {}",
                self.indent_size
            )));
        }
        if self.extensions.iter().any(|ext| ext.starts_with('.')) {
            return Err(Error::Config("extensions are listed without the leading dot".into()));
        }
        Ok(())
    }

    // Loads the nearest config above `start` (a file or directory), or the
    // defaults when there is none.
    pub fn discover(start: &Path) -> Result<Self> {
        match find_config_file(start) {
            Some(path) => {
                debug!("Loading config from {:?}", path);
                let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
                Self::from_json(&text, &path)
            }
            None => {
                info!("No {} found, using defaults", CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    pub fn formatter_options(&self) -> FormatterOptions {
        FormatterOptions {
            indent_size: self.indent_size,
            max_blank_lines: self.max_blank_lines,
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let dir = if start.is_dir() { start } else { start.parent()? };
    dir.ancestors()
        .map(|d| d.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}
