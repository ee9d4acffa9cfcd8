//! Where user overrides live and how they are read and written.
//!
//! The override file is `config_user.toml` in the platform config directory:
//! - Windows:  `%APPDATA%\pyEPR\config_user.toml`
//! - Linux:    `$XDG_CONFIG_HOME/pyepr/config_user.toml` (or `~/.config/pyepr`)
//! - macOS:    `~/Library/Application Support/pyEPR/config_user.toml`
//!
//! Setting `EPR_CONFIG` to a path makes that file the (required) source
//! instead.

use std::fmt;
use std::path::{Path, PathBuf};

use toml::Table;
use tracing::debug;

use crate::error::ConfigError;
use crate::settings::Settings;

/// Environment variable naming an explicit override file.
pub const CONFIG_ENV: &str = "EPR_CONFIG";

/// File name of the user override file.
pub const USER_CONFIG_FILE: &str = "config_user.toml";

/// Where the override mapping comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideSource {
    /// No overrides; the defaults are used as shipped.
    Empty,
    /// An in-memory table.
    Table(Table),
    /// A file that must exist.
    File(PathBuf),
    /// A file that may be absent, in which case there are no overrides.
    OptionalFile(PathBuf),
}

impl OverrideSource {
    /// Picks the source for this process: `EPR_CONFIG` if set, otherwise the
    /// platform override file if a config directory can be resolved.
    pub fn discover() -> Self {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::File(PathBuf::from(path));
        }
        match user_config_path() {
            Ok(path) => Self::OptionalFile(path),
            Err(_) => Self::Empty,
        }
    }

    /// Reads the override mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when a required file is missing or any
    /// file cannot be read, and [`ConfigError::Parse`] for malformed TOML.
    pub fn load(&self) -> Result<Table, ConfigError> {
        match self {
            Self::Empty => Ok(Table::new()),
            Self::Table(table) => Ok(table.clone()),
            Self::File(path) => load_overrides(path),
            Self::OptionalFile(path) => match std::fs::read_to_string(path) {
                Ok(content) => Ok(toml::from_str(&content)?),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("no override file at {}, using defaults", path.display());
                    Ok(Table::new())
                }
                Err(e) => Err(ConfigError::Io {
                    path: path.clone(),
                    source: e,
                }),
            },
        }
    }
}

impl fmt::Display for OverrideSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("defaults only"),
            Self::Table(_) => f.write_str("in-memory overrides"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::OptionalFile(path) => write!(f, "{} (optional)", path.display()),
        }
    }
}

/// Determines the platform-appropriate directory for the override file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to `config_user.toml`.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn user_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(USER_CONFIG_FILE))
}

/// Reads an override table from a file that must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for any file-system error (including "not
/// found") and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_overrides(path: &Path) -> Result<Table, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Persists an override table, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_overrides(path: &Path, overrides: &Table) -> Result<(), ConfigError> {
    write_file(path, &toml::to_string_pretty(overrides)?)
}

/// Persists a complete settings tree.
///
/// # Errors
///
/// Same as [`save_overrides`].
pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    write_file(path, &toml::to_string_pretty(settings)?)
}

/// Writes a commented-out copy of the defaults for users to edit.
///
/// Parsing the template yields an empty table, so writing it never changes
/// the effective settings.
///
/// # Errors
///
/// Returns [`ConfigError::AlreadyExists`] if `path` exists and `force` is
/// false, otherwise the errors of [`save_overrides`].
pub fn write_template(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    write_file(path, &render_template()?)
}

/// The text written by [`write_template`].
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] if the defaults cannot be serialized.
pub fn render_template() -> Result<String, ConfigError> {
    let defaults = toml::to_string_pretty(&Settings::default())?;
    let mut out = String::from(
        "# User overrides for pyEPR.\n\
         # Uncomment and edit only the values you want to change; anything left\n\
         # commented keeps its shipped default. Unknown keys are kept as-is.\n\n",
    );
    for line in defaults.lines() {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

fn write_file(path: &Path, content: &str) -> Result<(), ConfigError> {
    // Ensure directory exists before writing.
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Resolves the platform config base directory including the `pyEPR` folder.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("pyEPR"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("pyepr"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("pyEPR")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
