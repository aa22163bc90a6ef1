//! Configuration stored in `checktree.toml`.

use std::fs;
use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::render::RenderOptions;

/// Default config file name, resolved against the working directory.
pub const CONFIG_FILE: &str = "checktree.toml";

/// Top-level configuration (TOML).
///
/// Missing fields fall back to defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckTreeConfig {
    pub render: RenderConfig,
    pub commands: CommandConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn enabled(self) -> bool {
        match self {
            Self::Auto => std::io::stdout().is_terminal(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    pub color: ColorMode,
    /// Spaces per tree level.
    pub indent: usize,
    /// Print leaf messages next to their keys.
    pub show_messages: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            indent: 2,
            show_messages: true,
        }
    }
}

impl RenderConfig {
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            color: self.color.enabled(),
            indent: self.indent,
            show_messages: self.show_messages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Truncate captured stdout/stderr of command units beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            output_limit_bytes: 16_384,
        }
    }
}

impl CheckTreeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=8).contains(&self.render.indent) {
            return Err(anyhow!("render.indent must be between 1 and 8"));
        }
        if self.commands.output_limit_bytes == 0 {
            return Err(anyhow!("commands.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CheckTreeConfig::default()`.
pub fn load_config(path: &Path) -> Result<CheckTreeConfig> {
    if !path.exists() {
        let cfg = CheckTreeConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CheckTreeConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CheckTreeConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, CheckTreeConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join(CONFIG_FILE);
        let mut cfg = CheckTreeConfig::default();
        cfg.render.color = ColorMode::Never;
        cfg.render.indent = 4;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "[render]\ncolor = \"always\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.render.color, ColorMode::Always);
        assert_eq!(cfg.render.indent, 2);
        assert_eq!(cfg.commands, CommandConfig::default());
    }

    #[test]
    fn rejects_out_of_range_indent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "[render]\nindent = 0\n").expect("write");
        let err = load_config(&path).expect_err("expected error");
        assert!(format!("{err:#}").contains("render.indent"));
    }

    #[test]
    fn never_color_disables_color() {
        let cfg = RenderConfig {
            color: ColorMode::Never,
            ..RenderConfig::default()
        };
        assert!(!cfg.options().color);
        assert!(ColorMode::Always.enabled());
    }
}
