mod cli_args;
mod commands;
mod output;
mod watch;

use anyhow::{Context, Result};
use autumn_core::config::DEFAULT_OUTPUT_FILENAME;
use autumn_core::{
    AppError, Autumn, Config, ConfigBuilder, ProjectConfig, parse_extensions, resolve_output_path,
};
use clap::Parser;
use colored::*;
use std::env;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::Cli;

fn main() {
    let cli_args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    setup_logging(cli_args.quiet, cli_args.verbose);
    log::debug!("CLI args parsed: {:?}", cli_args);

    let quiet = cli_args.quiet;
    let exit_code = match run_app(&cli_args) {
        Ok(()) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<AppError>() {
        Some(core_err) if core_err.is_config_error() => 1,
        Some(AppError::Watch(_)) => 3,
        Some(_) => 2,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: &Cli) -> Result<()> {
    if cli.project {
        let target = Config::determine_watch_path(&cli.path.clone().unwrap_or_default())
            .context("Failed to determine project directory")?;
        return commands::project::handle_project_command(&target, cli.quiet);
    }

    let config = load_config_for_command(cli)?
        .build()
        .context("Invalid configuration")?;
    let autumn = Autumn::new(config);

    if cli.once {
        commands::update::handle_update_command(&autumn, cli.quiet)
    } else {
        watch::run_watch_mode(&autumn, cli.quiet, cli.verbose)
    }
}

/// Layers CLI flags over `.autumn/project.autumn` (when one is found above the
/// target directory) over the built-in defaults.
pub fn load_config_for_command(cli: &Cli) -> Result<ConfigBuilder> {
    let requested = cli.path.clone().unwrap_or_default();
    let target = Config::determine_watch_path(&requested)
        .context("Failed to determine watch path")?;

    let (mut builder, has_project_output) = match ProjectConfig::find_config(&target) {
        Some(config_path) => {
            let project = ProjectConfig::load_config(&config_path).with_context(|| {
                format!("Failed to load project config {}", config_path.display())
            })?;
            (project.into_builder(), true)
        }
        None => (ConfigBuilder::new(&target), false),
    };

    if cli.path.is_some() {
        builder.watch_path = target;
    }
    let watch_path = Config::determine_watch_path(&builder.watch_path)
        .context("Failed to determine watch path")?;
    builder.watch_path = watch_path.clone();

    if let Some(output) = &cli.output {
        builder.output_file = output_for_arg(output, &watch_path)?;
    } else if !has_project_output {
        builder.output_file = resolve_output_path(DEFAULT_OUTPUT_FILENAME, &watch_path);
    }

    if let Some(exts) = &cli.extensions {
        builder.extensions = parse_extensions(exts).context("Invalid --extensions value")?;
    }
    if cli.split {
        builder.split_by_extension = true;
    }
    if let Some(delay) = &cli.delay {
        builder.watch_delay = delay.clone();
    }
    if let Some(max_delay) = &cli.max_delay {
        builder.max_watch_delay = max_delay.clone();
    }

    log::trace!("Config builder after CLI overrides: {:?}", builder);
    Ok(builder)
}

// A path-like -o is relative to where the user typed it, not to the watch root.
fn output_for_arg(output: &str, watch_path: &Path) -> Result<PathBuf> {
    let resolved = resolve_output_path(output, watch_path);
    if resolved.is_absolute() {
        return Ok(resolved);
    }
    let cwd = env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(resolved))
}
