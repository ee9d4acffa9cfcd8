//! Runtime-environment detection.
//!
//! The loader records whether it ran inside an interactive host in
//! `internal.ipython`. Rather than having the loader sniff the environment on
//! its own, the entry point builds a [`RuntimeContext`] and hands it over.
//! [`HostProbe`] computes that context for real processes; [`FixedProbe`]
//! pins it for tests and for callers that already know the answer.

use std::io::IsTerminal;

use tracing::debug;

/// Environment variable exported by Jupyter to every kernel it launches.
pub const JUPYTER_KERNEL_ENV: &str = "JPY_PARENT_PID";

/// Answers "is this process attached to an interactive host?".
pub trait EnvironmentProbe: Send + Sync {
    /// Never fails: anything that cannot be determined counts as `false`.
    fn is_interactive(&self) -> bool;
}

/// Probe for the current process.
///
/// Interactive means either a Jupyter/IPython kernel parent is announced in
/// [`JUPYTER_KERNEL_ENV`], or both stdin and stdout are terminals.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl HostProbe {
    /// Decides interactivity from the three observed facts.
    pub fn classify(kernel_env: bool, stdin_tty: bool, stdout_tty: bool) -> bool {
        kernel_env || (stdin_tty && stdout_tty)
    }
}

impl EnvironmentProbe for HostProbe {
    fn is_interactive(&self) -> bool {
        let kernel_env = std::env::var_os(JUPYTER_KERNEL_ENV).is_some();
        if kernel_env {
            debug!("{JUPYTER_KERNEL_ENV} is set; treating the host as interactive");
        }
        Self::classify(
            kernel_env,
            std::io::stdin().is_terminal(),
            std::io::stdout().is_terminal(),
        )
    }
}

/// Probe with a predetermined answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedProbe(pub bool);

impl EnvironmentProbe for FixedProbe {
    fn is_interactive(&self) -> bool {
        self.0
    }
}

/// Facts about the running process that end up in `[internal]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeContext {
    pub interactive: bool,
}

impl RuntimeContext {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    /// Asks `probe` for the context.
    pub fn probe(probe: &dyn EnvironmentProbe) -> Self {
        Self {
            interactive: probe.is_interactive(),
        }
    }

    /// Context of the current process, via [`HostProbe`].
    pub fn detect() -> Self {
        Self::probe(&HostProbe)
    }
}

/// Returns whether the calling process runs inside an interactive shell.
pub fn is_interactive_shell() -> bool {
    HostProbe.is_interactive()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
