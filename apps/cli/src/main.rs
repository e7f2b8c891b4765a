//! # atelier
//!
//! Command line front-end for furniture specification codes.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          atelier <command>                              │
//! │                                                                         │
//! │  presets / check             core only, no config needed               │
//! │  catalog / quote             core + [[tiers]] / [[supplements]]        │
//! │  generate                    PreviewCoordinator ──► generation service │
//! │  finalize / delete           Configurator ──► generation + store       │
//! │  init-config                 write a default atelier.toml              │
//! │                                                                         │
//! │  Exit codes: 0 ok, 1 failure, 2 invalid specification, 130 interrupted │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cli;
mod render;

use anyhow::{bail, Context};
use atelier_core::{check, PresetRegistry, SpecificationError};
use atelier_gateway::{
    Configurator, GatewayConfig, GatewayError, PreviewCoordinator, PreviewOutcome,
};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::process::ExitCode;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

const EXIT_INVALID_SPEC: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays clean for `--json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let json = cli.json;

    match cli.command {
        Command::Presets => {
            let registry = PresetRegistry::builtin();
            if json {
                print_json(&registry.iter().collect::<Vec<_>>())?;
            } else {
                print!("{}", render::presets(registry.iter()));
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Catalog => {
            let config = load_config(&cli)?;
            let catalog = config.pricing_catalog()?;
            if json {
                print_json(&json!({
                    "default_tier": catalog.default_tier,
                    "height_policy": catalog.height_policy,
                    "tiers": config.tiers,
                    "supplements": catalog.supplements.iter().collect::<Vec<_>>(),
                }))?;
            } else {
                print!("{}", render::catalog(&catalog));
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Check { ref code } => match check(code) {
            Ok(spec) => {
                if json {
                    print_json(&json!({ "valid": true, "canonical_code": spec.canonical_code(), "specification": spec }))?;
                } else {
                    print!("{}", render::valid(&spec));
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => invalid(code, &err, json),
        },

        Command::Quote {
            ref code,
            ref pricing,
        } => {
            let configurator = Configurator::from_config(&load_config(&cli)?)?;
            match configurator.quote(code, &pricing.to_request()) {
                Ok(quoted) => {
                    if json {
                        print_json(&quoted)?;
                    } else {
                        print!("{}", render::quote(&quoted));
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(GatewayError::Specification(err)) => invalid(code, &err, json),
                Err(e) => Err(e.into()),
            }
        }

        Command::Generate { ref codes, closed } => {
            let config = load_config(&cli)?;
            generate(&config, codes, closed, json).await
        }

        Command::Finalize {
            ref name,
            ref code,
            ref pricing,
            closed,
        } => {
            let configurator = Configurator::from_config(&load_config(&cli)?)?;
            match configurator
                .finalize(name, code, &pricing.to_request(), closed)
                .await
            {
                Ok(finalized) => {
                    if json {
                        print_json(&json!({
                            "record": finalized.record,
                            "quote": finalized.quoted,
                            "artifacts": finalized.artifacts,
                        }))?;
                    } else {
                        print!("{}", render::finalized(&finalized));
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(GatewayError::Specification(err)) => invalid(code, &err, json),
                Err(e) => Err(e).context("finalize failed"),
            }
        }

        Command::Delete { ref id } => {
            let configurator = Configurator::from_config(&load_config(&cli)?)?;
            configurator
                .delete(id)
                .await
                .with_context(|| format!("failed to delete configuration {id}"))?;
            if json {
                print_json(&json!({ "deleted": id }))?;
            } else {
                println!("deleted {id}");
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::InitConfig { force } => {
            let path = match cli.config.clone().or_else(GatewayConfig::default_config_path) {
                Some(path) => path,
                None => bail!("no config directory available; pass --config"),
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            GatewayConfig::default().save(Some(path.clone()))?;
            println!("wrote {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<GatewayConfig> {
    GatewayConfig::load(cli.config.clone()).context("failed to load configuration")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Reports an invalid code on stdout and maps it to its exit code.
fn invalid(code: &str, err: &SpecificationError, json: bool) -> anyhow::Result<ExitCode> {
    if json {
        print_json(&json!({ "valid": false, "code": code, "error": err }))?;
    } else {
        print!("{}", render::specification_error(code, err));
    }
    Ok(ExitCode::from(EXIT_INVALID_SPEC))
}

/// Generates every code concurrently through the preview coordinator, so
/// repeated codes share one request. Ctrl-C withdraws everything in flight.
async fn generate(
    config: &GatewayConfig,
    codes: &[String],
    closed: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut specs = Vec::with_capacity(codes.len());
    for code in codes {
        match check(code) {
            Ok(spec) => specs.push(spec),
            Err(err) => return invalid(code, &err, json),
        }
    }

    let gateway = Configurator::from_config(config)?.generation();
    let coordinator = PreviewCoordinator::new(gateway, config.generation.cache_capacity);

    let mut tasks = JoinSet::new();
    for (index, spec) in specs.into_iter().enumerate() {
        let coordinator = coordinator.clone();
        tasks.spawn(async move {
            let target = format!("cli-{index}");
            (index, coordinator.request(&target, &spec, closed).await)
        });
    }

    let Some(mut results) = join_until(&mut tasks, shutdown_signal()).await? else {
        warn!(in_flight = coordinator.in_flight(), "Interrupted, cancelling generation");
        for index in 0..codes.len() {
            coordinator.cancel(&format!("cli-{index}"));
        }
        tasks.abort_all();
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    };
    results.sort_by_key(|(index, _)| *index);

    let mut failed = false;
    let mut report = Vec::with_capacity(results.len());
    for (index, result) in results {
        let code = &codes[index];
        match result {
            Ok(PreviewOutcome::Ready(artifacts)) => {
                if !json {
                    print!("{}", render::artifacts(code, &artifacts));
                }
                report.push(json!({ "code": code, "closed": closed, "artifacts": artifacts }));
            }
            Ok(PreviewOutcome::Superseded) => {
                report.push(json!({ "code": code, "closed": closed, "superseded": true }));
            }
            Err(e) => {
                failed = true;
                if !json {
                    println!("{code}\n  failed: {e}");
                }
                report.push(json!({ "code": code, "closed": closed, "error": e.to_string() }));
            }
        }
    }
    if json {
        print_json(&report)?;
    }

    info!(count = codes.len(), failed, "Generation finished");
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Joins every task unless `interrupt` resolves first; `None` then.
///
/// `interrupt` is polled as one future across all joins, so a signal that
/// arrives between two completed tasks is still seen.
async fn join_until<T: 'static>(
    tasks: &mut JoinSet<T>,
    interrupt: impl Future<Output = ()>,
) -> anyhow::Result<Option<Vec<T>>> {
    tokio::pin!(interrupt);
    let mut results = Vec::with_capacity(tasks.len());
    loop {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(joined) => results.push(joined.context("generation task failed")?),
                None => return Ok(Some(results)),
            },
            _ = &mut interrupt => return Ok(None),
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM. Never resolves if no handler can be
/// installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
