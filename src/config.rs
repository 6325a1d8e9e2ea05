//! Saved command line defaults.
//!
//! Files hold the same flag tokens as the command line, one or more per
//! line. Blank lines and `#` comments are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::render::ImageExportMode;

/// Flags that may be stored in a defaults file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigFlags {
    pub mode: Option<ImageExportMode>,
    pub width: Option<f64>,
    pub out: Option<PathBuf>,
    pub assets_dir: Option<String>,
    pub all_cta: bool,
    pub confirm_cta: Vec<String>,
    pub perf: bool,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge with `other` taking precedence for valued options.
    pub fn union(&self, other: &Self) -> Self {
        let mut confirm_cta = self.confirm_cta.clone();
        for id in &other.confirm_cta {
            if !confirm_cta.contains(id) {
                confirm_cta.push(id.clone());
            }
        }
        Self {
            mode: other.mode.or(self.mode),
            width: other.width.or(self.width),
            out: other.out.clone().or_else(|| self.out.clone()),
            assets_dir: other.assets_dir.clone().or_else(|| self.assets_dir.clone()),
            all_cta: self.all_cta || other.all_cta,
            confirm_cta,
            perf: self.perf || other.perf,
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(mode) = self.mode {
            lines.push(format!("--mode {mode}"));
        }
        if let Some(width) = self.width {
            lines.push(format!("--width {width}"));
        }
        if let Some(out) = &self.out {
            lines.push(format!("--out {}", out.display()));
        }
        if let Some(dir) = &self.assets_dir {
            lines.push(format!("--assets-dir {dir}"));
        }
        if self.all_cta {
            lines.push("--all-cta".to_string());
        }
        for id in &self.confirm_cta {
            lines.push(format!("--confirm-cta {id}"));
        }
        if self.perf {
            lines.push("--perf".to_string());
        }
        if let Some(path) = &self.render_debug_log {
            lines.push(format!("--render-debug-log {}", path.display()));
        }
        lines
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("tablemail").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library/Application Support/tablemail/config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("tablemail").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/tablemail/config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".tablemailrc")
}

/// Global defaults overlaid with the local override file.
pub fn load_defaults() -> Result<ConfigFlags> {
    let global = load_config_flags(&global_config_path())?;
    let local = load_config_flags(&local_override_path())?;
    Ok(global.union(&local))
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# tablemail defaults (saved with --save)".to_string()];
    lines.extend(flags.to_lines());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick known flags out of a token list; anything else is ignored.
///
/// Accepts both `--flag value` and `--flag=value`.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let (name, inline) = match tokens[i].split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (tokens[i].as_str(), None),
        };
        let takes_value = matches!(
            name,
            "--mode" | "--width" | "--out" | "--assets-dir" | "--confirm-cta" | "--render-debug-log"
        );
        let value = if takes_value && inline.is_none() {
            i += 1;
            tokens.get(i).cloned()
        } else {
            inline
        };

        match (name, value) {
            ("--all-cta", _) => flags.all_cta = true,
            ("--perf", _) => flags.perf = true,
            ("--mode", Some(value)) => flags.mode = ImageExportMode::parse(&value),
            ("--width", Some(value)) => {
                flags.width = value.parse::<f64>().ok().filter(|w| *w > 0.0);
            }
            ("--out", Some(value)) => flags.out = Some(PathBuf::from(value)),
            ("--assets-dir", Some(value)) => flags.assets_dir = Some(value),
            ("--confirm-cta", Some(value)) => flags.confirm_cta.push(value),
            ("--render-debug-log", Some(value)) => {
                flags.render_debug_log = Some(PathBuf::from(value));
            }
            _ => {}
        }
        i += 1;
    }
    flags
}
