//! rulesmith - build SonarQube plugins from analyzer packages.
//!
//! The binary exposes the module resolver, the analyzer scanner and the
//! process runner for use from scripts and for troubleshooting packages.

use std::fmt::Arguments;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rulesmith::capability::{CapabilityScanner, FactoryCatalog, Language};
use rulesmith::core::{
    Config, LogLevel, Logger, ProcessRunner, ProcessRunnerArgs, RunState, TracingLogger,
};
use rulesmith::module::{ModuleHost, ModuleResolver};

/// Build SonarQube plugins from third-party analyzer packages
#[derive(Parser)]
#[command(name = "rulesmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate and load a module by reference
    Resolve {
        /// Short name, full reference or file name of the module
        reference: String,

        /// Directory to search recursively (repeatable)
        #[arg(short, long = "root")]
        roots: Vec<PathBuf>,
    },

    /// List the analyzer types a set of modules exports
    Inspect {
        /// Module files to inspect
        #[arg(required = true)]
        modules: Vec<PathBuf>,

        /// Language the analyzers must target (cs, vb)
        #[arg(short, long)]
        language: Option<Language>,

        /// Extra directory searched for dependencies (repeatable)
        #[arg(short, long = "root")]
        roots: Vec<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run an executable with captured output and a timeout
    Exec {
        /// Executable path
        exe: PathBuf,

        /// Arguments passed to the executable
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Give up after this many milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Working directory
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Environment override in KEY=VALUE form (repeatable)
        #[arg(short, long = "env", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    match cli.command {
        Commands::Resolve { reference, roots } => cmd_resolve(&reference, roots),
        Commands::Inspect { modules, language, roots, format } => {
            cmd_inspect(&modules, language, roots, &format)
        }
        Commands::Exec { exe, args, timeout_ms, cwd, env } => {
            cmd_exec(exe, args, timeout_ms, cwd, env)
        }
        Commands::Config { path } => cmd_config(path),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Expected KEY=VALUE, got '{s}'")),
    }
}

/// Locate a module and print where it was found.
fn cmd_resolve(reference: &str, roots: Vec<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let mut search_roots = roots;
    search_roots.extend(config.search_roots());

    let host = ModuleHost::new();
    let scope = ModuleResolver::new(Arc::new(TracingLogger), search_roots)
        .context("No search roots given; pass --root or configure resolver.search_roots")?
        .install(&host);

    let module = host.load(reference)?;
    println!("{}", module.identity());
    println!("  Path: {}", module.path().display());
    if !module.dependencies().is_empty() {
        println!("  Dependencies:");
        for dependency in module.dependencies() {
            println!("    {dependency}");
        }
    }

    scope.close();
    Ok(())
}

/// List the analyzer types that qualify for a language.
fn cmd_inspect(
    modules: &[PathBuf],
    language: Option<Language>,
    roots: Vec<PathBuf>,
    format: &str,
) -> Result<()> {
    let config = Config::load()?;
    let language = language.unwrap_or(config.scanner.language);

    let mut folders = roots;
    folders.extend(config.scanner.search_folders.iter().cloned());
    folders.extend(config.search_roots());

    let catalog = Arc::new(FactoryCatalog::new());
    let scanner = CapabilityScanner::new(ModuleHost::new(), catalog, Arc::new(TracingLogger))
        .with_search_folders(folders);

    let eligible = scanner.eligible_types(language, modules);

    match format {
        "json" => {
            let entries: Vec<_> = eligible
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "type": e.ty.name,
                        "factory": e.ty.factory,
                        "module": e.module.name(),
                        "version": e.module.version().to_string(),
                        "path": e.module.path(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            for e in &eligible {
                println!("{} ({})", e.ty.name, e.module.identity());
            }
            println!("\nTotal: {} {} analyzer(s)", eligible.len(), language);
        }
    }

    Ok(())
}

/// Sends child output straight to the terminal.
struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        match level {
            LogLevel::Info => println!("{args}"),
            LogLevel::Error => eprintln!("{args}"),
            _ => TracingLogger.log(level, args),
        }
    }
}

/// Run an external process.
fn cmd_exec(
    exe: PathBuf,
    args: Vec<String>,
    timeout_ms: Option<u64>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
) -> Result<()> {
    let config = Config::load()?;

    let mut runner_args = ProcessRunnerArgs::new(exe, Arc::new(ConsoleLogger)).args(args);
    let timeout = timeout_ms.map(Duration::from_millis).or_else(|| config.runner.timeout());
    if let Some(timeout) = timeout {
        runner_args = runner_args.timeout(timeout);
    }
    if let Some(dir) = cwd {
        runner_args = runner_args.working_dir(dir);
    }
    for (key, value) in env {
        runner_args = runner_args.env(key, value);
    }

    let result = ProcessRunner::new().execute(&runner_args);
    match result.state() {
        RunState::CompletedInTime if result.succeeded() => Ok(()),
        RunState::CompletedInTime => std::process::exit(result.exit_code()),
        RunState::NotStarted => anyhow::bail!("Process could not be started"),
        RunState::TimedOut => anyhow::bail!("Process timed out"),
    }
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "rulesmith", &mut io::stdout());
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::active_path().or_else(Config::global_config_path) {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = Config::load()?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}
