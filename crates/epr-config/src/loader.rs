//! The config accessor: defaults + user overrides, merged exactly once.
//!
//! # Lifecycle
//!
//! ```text
//!            get_config()                     get_config()
//! Uninitialized ─────────────▶ Initialized ─────────────▶ Initialized
//!   load overrides                              same SharedConfig,
//!   deep-merge into defaults                    nothing reloaded
//!   internal.ipython = ctx.interactive
//! ```
//!
//! Any `internal.ipython` in the overrides is dropped before the merge, so a
//! mistyped value there cannot fail the load.
//!
//! A [`ConfigLoader`] is an ordinary value: the entry point creates one and
//! passes it (or the [`SharedConfig`] it hands out) to whatever needs the
//! settings. The state cell is guarded by a mutex, so two threads racing on
//! the first call still produce a single merge and a single shared object.
//!
//! Every [`SharedConfig`] clone points at the same settings. A caller that
//! changes `root_dir` through one handle is seen by every other holder, and a
//! later `get_config()` does not reset the change.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::probe::RuntimeContext;
use crate::settings::Settings;
use crate::storage::OverrideSource;

/// Shared, mutable handle to the effective settings.
#[derive(Debug, Clone)]
pub struct SharedConfig(Arc<RwLock<Settings>>);

impl SharedConfig {
    pub fn new(settings: Settings) -> Self {
        Self(Arc::new(RwLock::new(settings)))
    }

    /// Read access. A poisoned lock still yields the settings.
    pub fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access, visible to every holder of this handle.
    pub fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Owned copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.read().clone()
    }

    /// `true` when both handles refer to the same settings object.
    pub fn ptr_eq(&self, other: &SharedConfig) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug)]
enum LoadState {
    Uninitialized,
    Initialized(SharedConfig),
}

/// Builds the settings on first use and hands out the same object afterwards.
#[derive(Debug)]
pub struct ConfigLoader {
    source: OverrideSource,
    context: RuntimeContext,
    state: Mutex<LoadState>,
}

impl ConfigLoader {
    pub fn new(source: OverrideSource, context: RuntimeContext) -> Self {
        Self {
            source,
            context,
            state: Mutex::new(LoadState::Uninitialized),
        }
    }

    /// Loader for the current process: discovered override file, detected
    /// runtime context.
    pub fn from_environment() -> Self {
        Self::new(OverrideSource::discover(), RuntimeContext::detect())
    }

    pub fn source(&self) -> &OverrideSource {
        &self.source
    }

    pub fn context(&self) -> RuntimeContext {
        self.context
    }

    pub fn is_initialized(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            LoadState::Initialized(_)
        )
    }

    /// Returns the shared settings, building them on the first call.
    ///
    /// # Errors
    ///
    /// On the first call, returns the error of reading the override source
    /// or of merging it into the defaults. The loader then stays
    /// uninitialized and the next call tries again.
    pub fn get_config(&self) -> Result<SharedConfig, ConfigError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let LoadState::Initialized(shared) = &*state {
            info!("config is already defined");
            return Ok(shared.clone());
        }

        info!("first time load of config");
        let mut overrides = self.source.load()?;
        // internal.ipython always comes from the runtime context.
        if let Some(toml::Value::Table(internal)) = overrides.get_mut("internal") {
            if internal.remove("ipython").is_some() {
                debug!("ignoring internal.ipython from {}", self.source);
            }
        }
        debug!(
            "merging {} override section(s) from {}",
            overrides.len(),
            self.source
        );
        let mut settings = Settings::default().merged_with(&overrides)?;
        settings.internal.ipython = Some(self.context.interactive);

        let shared = SharedConfig::new(settings);
        *state = LoadState::Initialized(shared.clone());
        Ok(shared)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
