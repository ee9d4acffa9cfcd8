//! # epr-config
//!
//! Default settings for energy-participation-ratio (EPR) analysis of
//! electromagnetic simulations, and the accessor that merges a user's
//! overrides into them on first use.
//!
//! The settings feed the rest of the analysis: where results are saved
//! (`root_dir`), how the simulator computes junction participation
//! (`ansys`), the loss tangents, permittivities and conductances used for
//! dissipation budgets (`dissipation`), plot defaults (`plotting`), bootup
//! state (`internal`) and log output (`log`).
//!
//! # Typical use
//!
//! ```no_run
//! use epr_config::{ConfigLoader, OverrideSource, RuntimeContext};
//!
//! # fn main() -> Result<(), epr_config::ConfigError> {
//! let loader = ConfigLoader::new(OverrideSource::discover(), RuntimeContext::detect());
//! let config = loader.get_config()?;
//! epr_config::init_logging(&config.read().log)?;
//!
//! let tan_delta = config.read().dissipation.tan_delta_surf;
//! # let _ = tan_delta;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - **`settings`** – the typed schema and its shipped defaults.
//! - **`merge`** – deep merging of override tables and dotted-key access.
//! - **`storage`** – locating, reading and writing `config_user.toml`.
//! - **`probe`** – interactive-host detection and the [`RuntimeContext`].
//! - **`loader`** – the one-time initialising accessor and [`SharedConfig`].
//! - **`logging`** – installs a `tracing` subscriber from the `[log]` section.

pub mod error;
pub mod loader;
pub mod logging;
pub mod merge;
pub mod probe;
pub mod settings;
pub mod storage;

pub use error::ConfigError;
pub use loader::{ConfigLoader, SharedConfig};
pub use logging::{init_logging, LogPattern, PatternFormatter};
pub use merge::{deep_merge, parse_assignment};
pub use probe::{is_interactive_shell, EnvironmentProbe, FixedProbe, HostProbe, RuntimeContext};
pub use settings::{
    AnsysSettings, DissipationSettings, InternalSettings, LogSettings, ParticipationMethod,
    PlottingSettings, Settings, REQUIRED_SECTIONS,
};
pub use storage::{user_config_path, OverrideSource};
