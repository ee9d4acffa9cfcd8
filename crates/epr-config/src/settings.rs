//! The settings schema and its shipped defaults.
//!
//! Users never edit these defaults. They put the values they want to change
//! in `config_user.toml`, which is merged on top (see [`crate::merge`]):
//!
//! ```toml
//! root_dir = '/data/epr'
//!
//! [ansys]
//! method_calc_P_mj = "J_surf_mag"
//!
//! [dissipation]
//! tan_delta_surf = 5e-4
//! ```
//!
//! # Serde default values
//!
//! Every field carries a `#[serde(default = "...")]` pointing at a small
//! helper function, and each section's `Default` impl calls the same helpers.
//! A partial file therefore only changes what it names, and a section that is
//! missing entirely comes back exactly as shipped.
//!
//! # Unknown keys
//!
//! Each section keeps a flattened `extra` table. Keys the schema does not
//! know are carried along instead of rejected and are written back out by
//! [`Settings::to_table`], so downstream code can stash its own settings next
//! to the shipped ones.
//!
//! # Stable names
//!
//! The top-level key names (`root_dir`, `ansys`, `dissipation`, `plotting`,
//! `internal`, `log`) and the key names inside each section are read by the
//! analysis code and must not change.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::error::ConfigError;
use crate::logging::{check_datefmt, parse_level, LogPattern};
use crate::merge::{deep_merge, get_dotted};

/// Top-level keys that are always present in a serialized [`Settings`].
pub const REQUIRED_SECTIONS: [&str; 6] = [
    "root_dir",
    "ansys",
    "dissipation",
    "plotting",
    "internal",
    "log",
];

// ── Config schema types ───────────────────────────────────────────────────────

/// Complete settings tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Folder that result data is saved to.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    #[serde(default)]
    pub ansys: AnsysSettings,
    #[serde(default)]
    pub dissipation: DissipationSettings,
    #[serde(default)]
    pub plotting: PlottingSettings,
    /// Not meant for users.
    #[serde(default)]
    pub internal: InternalSettings,
    #[serde(default)]
    pub log: LogSettings,
    /// Top-level keys supplied by an override that the schema does not name.
    #[serde(flatten)]
    pub extra: Table,
}

/// How the eigenmode participation ratio of a junction is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticipationMethod {
    /// Integrate the voltage along the junction line.
    #[default]
    #[serde(rename = "line_voltage")]
    LineVoltage,
    /// Average the surface current `J_surf` over the junction rectangle.
    ///
    /// Needs a dense mesh on the rectangle; start with four tets across the
    /// smallest dimension.
    #[serde(rename = "J_surf_mag")]
    JSurfMag,
}

impl ParticipationMethod {
    /// The key as written in the settings file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LineVoltage => "line_voltage",
            Self::JSurfMag => "J_surf_mag",
        }
    }
}

/// Simulator-facing options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnsysSettings {
    #[serde(rename = "method_calc_P_mj", default)]
    pub method_calc_p_mj: ParticipationMethod,
    /// Save the mesh statistics of each HFSS run.
    #[serde(default = "default_true")]
    pub save_mesh_stats: bool,
    #[serde(flatten)]
    pub extra: Table,
}

/// Loss properties of materials and surfaces.
///
/// References: arXiv:1308.1743, arXiv:1509.01854, arXiv:1509.01119.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DissipationSettings {
    /// Bulk dielectric loss tangent, tan(δ).
    #[serde(default = "default_tan_delta_sapp")]
    pub tan_delta_sapp: f64,
    /// Bulk dielectric constant.
    #[serde(default = "default_epsi")]
    pub epsi: f64,
    /// Surface dielectric ("dirt") thickness in metres.
    #[serde(default = "default_th")]
    pub th: f64,
    /// Surface dielectric relative permittivity.
    #[serde(default = "default_eps_r")]
    pub eps_r: f64,
    /// Surface dielectric loss tangent.
    #[serde(default = "default_tan_delta_surf")]
    pub tan_delta_surf: f64,
    /// Thin-film surface resistance in ohms.
    #[serde(rename = "surface_Rs", default = "default_surface_rs")]
    pub surface_rs: f64,
    /// Seam conductance per ohm-metre.
    #[serde(default = "default_gseam")]
    pub gseam: f64,
    #[serde(flatten)]
    pub extra: Table,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlottingSettings {
    /// Name of a matplotlib colour map.
    #[serde(default = "default_color_map")]
    pub default_color_map: String,
    #[serde(flatten)]
    pub extra: Table,
}

/// Bootup state; filled in by the loader, not by users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InternalSettings {
    /// Whether the process runs in an interactive shell. `None` until the
    /// loader has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipython: Option<bool>,
    /// Hint shown when an optional dependency is missing.
    #[serde(default = "default_error_msg_missing_import")]
    pub error_msg_missing_import: String,
    #[serde(default)]
    pub warn_missing_import: bool,
    #[serde(flatten)]
    pub extra: Table,
}

/// Log output settings, applied by [`crate::logging::init_logging`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogSettings {
    /// `%(key)s` pattern, see [`LogPattern`].
    #[serde(default = "default_log_format")]
    pub format: String,
    /// strftime pattern for `%(asctime)s`.
    #[serde(default = "default_datefmt")]
    pub datefmt: String,
    /// `DEBUG`, `INFO`, `WARNING`, `ERROR` or `CRITICAL`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(flatten)]
    pub extra: Table,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_root_dir() -> PathBuf {
    PathBuf::from(r"C:\data-pyEPR")
}
fn default_true() -> bool {
    true
}
fn default_tan_delta_sapp() -> f64 {
    1e-6
}
fn default_epsi() -> f64 {
    10.0
}
fn default_th() -> f64 {
    3e-9
}
fn default_eps_r() -> f64 {
    10.0
}
fn default_tan_delta_surf() -> f64 {
    1e-3
}
fn default_surface_rs() -> f64 {
    250e-9
}
fn default_gseam() -> f64 {
    1.0e3
}
fn default_color_map() -> String {
    "viridis".to_string()
}
fn default_error_msg_missing_import() -> String {
    concat!(
        "\n   If you need a part of pyEPR that uses this package,\n",
        "        then please install it. Then add it to the system path (if needed).\n",
        "        See online setup instructions at\n",
        "        github.com/zlatko-minev/pyEPR"
    )
    .to_string()
}
fn default_log_format() -> String {
    "%(asctime)s %(levelname)s [%(funcName)s]: %(message)s".to_string()
}
fn default_datefmt() -> String {
    "%I:%M%p %Ss".to_string()
}
fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            ansys: AnsysSettings::default(),
            dissipation: DissipationSettings::default(),
            plotting: PlottingSettings::default(),
            internal: InternalSettings::default(),
            log: LogSettings::default(),
            extra: Table::new(),
        }
    }
}

impl Default for AnsysSettings {
    fn default() -> Self {
        Self {
            method_calc_p_mj: ParticipationMethod::default(),
            save_mesh_stats: default_true(),
            extra: Table::new(),
        }
    }
}

impl Default for DissipationSettings {
    fn default() -> Self {
        Self {
            tan_delta_sapp: default_tan_delta_sapp(),
            epsi: default_epsi(),
            th: default_th(),
            eps_r: default_eps_r(),
            tan_delta_surf: default_tan_delta_surf(),
            surface_rs: default_surface_rs(),
            gseam: default_gseam(),
            extra: Table::new(),
        }
    }
}

impl Default for PlottingSettings {
    fn default() -> Self {
        Self {
            default_color_map: default_color_map(),
            extra: Table::new(),
        }
    }
}

impl Default for InternalSettings {
    fn default() -> Self {
        Self {
            ipython: None,
            error_msg_missing_import: default_error_msg_missing_import(),
            warn_missing_import: false,
            extra: Table::new(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            datefmt: default_datefmt(),
            level: default_log_level(),
            extra: Table::new(),
        }
    }
}

// ── Operations ────────────────────────────────────────────────────────────────

impl Settings {
    /// Serializes the settings into a TOML table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if a value cannot be represented in
    /// TOML.
    pub fn to_table(&self) -> Result<Table, ConfigError> {
        match Value::try_from(self)? {
            Value::Table(table) => Ok(table),
            other => Err(ConfigError::Schema(format!(
                "settings serialized to a {} instead of a table",
                other.type_str()
            ))),
        }
    }

    /// Reads settings back from a table, filling absent keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] when a value has the wrong type.
    pub fn from_table(table: Table) -> Result<Self, ConfigError> {
        Value::Table(table)
            .try_into::<Settings>()
            .map_err(|e| ConfigError::Schema(e.to_string()))
    }

    /// Returns a copy of `self` with `overrides` deep-merged on top.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] if the merged mapping no longer fits the
    /// schema, e.g. `[dissipation] epsi = "high"`.
    pub fn merged_with(&self, overrides: &Table) -> Result<Self, ConfigError> {
        let mut table = self.to_table()?;
        deep_merge(&mut table, overrides);
        Self::from_table(table)
    }

    /// Looks up a setting by dotted key, e.g. `"dissipation.epsi"`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] if nothing is stored at `key`.
    pub fn lookup(&self, key: &str) -> Result<Value, ConfigError> {
        let table = self.to_table()?;
        get_dotted(&table, key)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
    }

    /// Checks that every value is usable by the analysis code.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key, or the
    /// log-related errors from [`crate::logging`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let table = self.to_table()?;
        for section in REQUIRED_SECTIONS {
            let present = match table.get(section) {
                Some(Value::Table(inner)) => !inner.is_empty(),
                Some(Value::String(s)) => !s.is_empty(),
                Some(_) => true,
                None => false,
            };
            if !present {
                return Err(invalid(section, "missing or empty"));
            }
        }

        let d = &self.dissipation;
        for (key, value) in [
            ("dissipation.tan_delta_sapp", d.tan_delta_sapp),
            ("dissipation.th", d.th),
            ("dissipation.tan_delta_surf", d.tan_delta_surf),
            ("dissipation.surface_Rs", d.surface_rs),
            ("dissipation.gseam", d.gseam),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(
                    key,
                    &format!("must be finite and non-negative, got {value}"),
                ));
            }
        }
        for (key, value) in [("dissipation.epsi", d.epsi), ("dissipation.eps_r", d.eps_r)] {
            if !value.is_finite() || value < 1.0 {
                return Err(invalid(
                    key,
                    &format!("relative permittivity must be >= 1, got {value}"),
                ));
            }
        }

        if self.plotting.default_color_map.trim().is_empty() {
            return Err(invalid("plotting.default_color_map", "must not be empty"));
        }

        parse_level(&self.log.level)?;
        LogPattern::parse(&self.log.format)?;
        check_datefmt(&self.log.datefmt)?;
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
