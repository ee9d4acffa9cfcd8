//! `epr-config`: inspect and initialise pyEPR settings.
//!
//! # Usage
//!
//! ```text
//! epr-config [OPTIONS] <COMMAND>
//!
//! Commands:
//!   show   Print the effective settings (TOML, or JSON with --json)
//!   get    Print a single setting by dotted key, e.g. dissipation.epsi
//!   path   Print the location of the user override file
//!   init   Write a commented override template to the user override file
//!   check  Validate the effective settings
//!
//! Options:
//!   --config <PATH>         Override file that must exist [env: EPR_CONFIG]
//!   --set <KEY=VALUE>       Extra override, applied after the file (repeatable)
//!   --interactive <BOOL>    Value recorded in internal.ipython [default: probed]
//! ```
//!
//! The effective settings are the shipped defaults, deep-merged with the
//! override file, then with every `--set` in order.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use epr_config::storage::{self, OverrideSource};
use epr_config::{deep_merge, parse_assignment, ConfigLoader, RuntimeContext};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Inspect and initialise the settings used for energy-participation-ratio
/// analysis.
#[derive(Debug, Parser)]
#[command(name = "epr-config", version)]
struct Cli {
    /// Override file to merge into the defaults. Must exist when given.
    ///
    /// Without it, the platform `config_user.toml` is used if present.
    #[arg(long, env = "EPR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Single override as KEY=VALUE, e.g. `--set dissipation.epsi=11.4`.
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    sets: Vec<String>,

    /// Record this value in `internal.ipython` instead of probing the host.
    #[arg(long, value_name = "BOOL", global = true)]
    interactive: Option<bool>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the effective settings.
    Show {
        /// Emit JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
    /// Print one setting by dotted key.
    Get {
        /// Dotted key such as `plotting.default_color_map`.
        key: String,
    },
    /// Print the location of the user override file.
    Path,
    /// Write a commented override template to the user override file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Validate the effective settings.
    Check,
}

impl Cli {
    /// Builds the override source: the file (explicit or discovered), then
    /// every `--set` layered on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a `--set` is malformed.
    fn override_source(&self) -> anyhow::Result<OverrideSource> {
        let base = match &self.config {
            Some(path) => OverrideSource::File(path.clone()),
            None => OverrideSource::discover(),
        };
        if self.sets.is_empty() {
            return Ok(base);
        }

        let assignments = self
            .sets
            .iter()
            .map(|raw| parse_assignment(raw).with_context(|| format!("invalid --set '{raw}'")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let mut table = base
            .load()
            .with_context(|| format!("failed to read overrides from {base}"))?;
        for assignment in &assignments {
            deep_merge(&mut table, assignment);
        }
        Ok(OverrideSource::Table(table))
    }

    fn runtime_context(&self) -> RuntimeContext {
        match self.interactive {
            Some(flag) => RuntimeContext::new(flag),
            None => RuntimeContext::detect(),
        }
    }

    /// Builds the loader. Without `--config`, `--set` or `--interactive` this
    /// is the plain process loader.
    fn loader(&self) -> anyhow::Result<ConfigLoader> {
        if self.config.is_none() && self.sets.is_empty() && self.interactive.is_none() {
            return Ok(ConfigLoader::from_environment());
        }
        Ok(ConfigLoader::new(
            self.override_source()?,
            self.runtime_context(),
        ))
    }

    /// Resolves the file `path` and `init` act on.
    fn target_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => storage::user_config_path()
                .context("cannot locate the user override file; pass --config"),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that do not need the merged settings.
    match &cli.command {
        Command::Path => {
            println!("{}", cli.target_path()?.display());
            return Ok(());
        }
        Command::Init { force } => {
            let path = cli.target_path()?;
            storage::write_template(&path, *force)
                .with_context(|| format!("failed to write template to {}", path.display()))?;
            println!("wrote {}", path.display());
            return Ok(());
        }
        _ => {}
    }

    let loader = cli.loader()?;
    let config = loader.get_config().context("failed to load settings")?;

    // Logging is configured by the settings themselves, so it starts only now.
    epr_config::init_logging(&config.read().log).context("failed to initialise logging")?;
    info!("settings loaded from {}", loader.source());
    debug!("runtime context: {:?}", loader.context());

    let settings = config.snapshot();
    match cli.command {
        Command::Show { json: true } => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Command::Show { json: false } => {
            print!("{}", toml::to_string_pretty(&settings)?);
        }
        Command::Get { key } => {
            let value = settings.lookup(&key)?;
            println!("{}", render_value(&value));
        }
        Command::Check => {
            settings.validate().context("settings are invalid")?;
            println!("ok");
        }
        Command::Path | Command::Init { .. } => unreachable!("handled above"),
    }
    Ok(())
}

/// Prints strings bare and everything else as TOML.
fn render_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Table(table) => toml::to_string_pretty(table)
            .unwrap_or_else(|_| value.to_string())
            .trim_end()
            .to_string(),
        other => other.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_show_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["epr-config", "show"]);

        // Assert
        assert!(matches!(cli.command, Command::Show { json: false }));
        assert!(cli.sets.is_empty());
        assert!(cli.interactive.is_none());
    }

    #[test]
    fn test_cli_show_json_flag() {
        let cli = Cli::parse_from(["epr-config", "show", "--json"]);
        assert!(matches!(cli.command, Command::Show { json: true }));
    }

    #[test]
    fn test_cli_get_key() {
        let cli = Cli::parse_from(["epr-config", "get", "dissipation.epsi"]);
        assert!(matches!(cli.command, Command::Get { ref key } if key == "dissipation.epsi"));
    }

    #[test]
    fn test_cli_repeated_set_after_subcommand() {
        let cli = Cli::parse_from([
            "epr-config",
            "show",
            "--set",
            "dissipation.epsi=12",
            "--set",
            "log.level=DEBUG",
        ]);
        assert_eq!(cli.sets, vec!["dissipation.epsi=12", "log.level=DEBUG"]);
    }

    #[test]
    fn test_cli_interactive_override() {
        let cli = Cli::parse_from(["epr-config", "--interactive", "true", "check"]);
        assert_eq!(cli.runtime_context(), RuntimeContext::new(true));
    }

    #[test]
    fn test_cli_init_force() {
        let cli = Cli::parse_from(["epr-config", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn test_override_source_layers_sets_over_file() {
        // Arrange
        let cli = Cli {
            config: None,
            sets: vec![
                "dissipation.epsi=12".to_string(),
                "dissipation.epsi=13".to_string(),
                "plotting.default_color_map=magma".to_string(),
            ],
            interactive: Some(false),
            command: Command::Check,
        };

        // Act
        let source = cli.override_source();

        // Assert: a missing platform file is optional, so only the sets remain
        // (a real config_user.toml on the test machine may add more keys).
        let table = match source {
            Ok(OverrideSource::Table(table)) => table,
            other => panic!("expected an in-memory table, got {other:?}"),
        };
        assert_eq!(table["dissipation"]["epsi"], toml::Value::Integer(13));
        assert_eq!(
            table["plotting"]["default_color_map"].as_str(),
            Some("magma")
        );
    }

    #[test]
    fn test_override_source_rejects_malformed_set() {
        // The assignment is checked before the file is read.
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/epr/config_user.toml")),
            sets: vec!["no-equals-sign".to_string()],
            interactive: None,
            command: Command::Check,
        };
        assert!(cli.override_source().is_err());
    }

    #[test]
    fn test_override_source_without_sets_is_file() {
        let cli = Cli {
            config: Some(PathBuf::from("custom.toml")),
            sets: Vec::new(),
            interactive: None,
            command: Command::Show { json: false },
        };
        assert_eq!(
            cli.override_source().unwrap(),
            OverrideSource::File(PathBuf::from("custom.toml"))
        );
    }

    #[test]
    fn test_loader_without_flags_uses_process_defaults() {
        // Arrange
        let cli = Cli {
            config: None,
            sets: Vec::new(),
            interactive: None,
            command: Command::Check,
        };

        // Act
        let loader = cli.loader().expect("no flags cannot fail");

        // Assert
        assert_eq!(loader.source(), &OverrideSource::discover());
        assert_eq!(loader.context(), RuntimeContext::detect());
        assert!(!loader.is_initialized());
    }

    #[test]
    fn test_loader_honours_interactive_flag() {
        let cli = Cli {
            config: Some(PathBuf::from("custom.toml")),
            sets: Vec::new(),
            interactive: Some(true),
            command: Command::Check,
        };

        let loader = cli.loader().unwrap();

        assert_eq!(loader.context(), RuntimeContext::new(true));
        assert_eq!(
            loader.source(),
            &OverrideSource::File(PathBuf::from("custom.toml"))
        );
    }

    #[test]
    fn test_render_value_strings_are_bare() {
        assert_eq!(render_value(&toml::Value::String("viridis".into())), "viridis");
        assert_eq!(render_value(&toml::Value::Float(1e-3)), "0.001");
        assert_eq!(render_value(&toml::Value::Boolean(true)), "true");
    }
}
