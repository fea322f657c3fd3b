//! `lra run` and `lra list-specs`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lra_config::config::DEFAULT_PLANNING_MODEL;
use lra_config::{HarnessConfig, ModelsConfig, PromptLibrary, RetryConfig};
use lra_core::{AppError, SessionKind, SessionOutcome};
use lra_process::check_tool_installed;
use lra_scheduler::BackoffPolicy;
use lra_session::{CliBackend, CliCommand, has_progress_marker, run_session};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::orchestrator::{LoopSettings, LoopState, SessionLauncher, run_loop};
use crate::report::{ConsoleReporter, RunHeader, print_event, print_run_header};

/// Exit code for failures before the loop starts.
const SETUP_FAILURE_EXIT_CODE: i32 = 1;

/// Pick the planning/coding model pair from config and CLI flags.
///
/// `--hybrid` keeps a configured hybrid pair, or falls back to the default
/// planning model. `--model` alone pins both sessions to one model.
pub(crate) fn resolve_models(config: &ModelsConfig, model: Option<&str>, hybrid: bool) -> ModelsConfig {
    if hybrid {
        let planning = if config.is_hybrid() {
            config.planning.clone()
        } else {
            DEFAULT_PLANNING_MODEL.to_string()
        };
        return ModelsConfig {
            planning,
            coding: config.coding.clone(),
        };
    }
    match model {
        Some(model) => ModelsConfig {
            planning: model.to_string(),
            coding: model.to_string(),
        },
        None => config.clone(),
    }
}

pub(crate) fn loop_settings(retry: &RetryConfig, max_iterations: Option<u32>) -> LoopSettings {
    LoopSettings {
        max_iterations,
        retry_ceiling: retry.max_rate_limit_retries,
        policy: BackoffPolicy {
            first_fallback: Duration::from_secs(retry.fallback_wait_first_secs),
            extended_fallback: Duration::from_secs(retry.fallback_wait_extended_secs),
            max_wait: Duration::from_secs(retry.max_wait_secs),
        },
        auto_continue_delay: Duration::from_secs(retry.auto_continue_delay_secs),
        between_sessions_delay: Duration::from_secs(retry.between_sessions_delay_secs),
    }
}

/// Fresh CLI backend process per session, output streamed to stdout.
struct CliSessionLauncher {
    command: CliCommand,
    models: ModelsConfig,
    initializer_prompt: Option<String>,
    coding_prompt: String,
}

#[async_trait]
impl SessionLauncher for CliSessionLauncher {
    async fn launch(&mut self, kind: SessionKind, session: u32) -> SessionOutcome {
        let (model, prompt) = match (kind, &self.initializer_prompt) {
            (SessionKind::Initializer, Some(prompt)) => (&self.models.planning, prompt),
            _ => (&self.models.coding, &self.coding_prompt),
        };
        info!(session, kind = %kind, model = %model, "Launching backend session");

        let mut backend = CliBackend::new(self.command.clone(), model.clone());
        let outcome = run_session(&mut backend, prompt, print_event).await;
        println!("\n{}", "-".repeat(70));
        outcome
    }
}

/// Run the session loop. Returns the process exit code.
pub(crate) async fn handle_run(
    args: RunArgs,
    config_path: Option<&Path>,
    cancel: CancellationToken,
) -> Result<i32> {
    let config = HarnessConfig::load(&args.project_dir, config_path)?;
    let models = resolve_models(&config.models, args.model.as_deref(), args.hybrid);
    let library = PromptLibrary::from_config(&config.prompts);

    if let Some(spec) = args.spec_file.as_deref()
        && let Err(err) = library.ensure_spec_available(spec)
    {
        eprintln!("Error: {err}");
        print_spec_list(&library)?;
        return Ok(SETUP_FAILURE_EXIT_CODE);
    }

    if let Err(err) = check_tool_installed(&config.backend.command) {
        eprintln!("Error: {err}");
        return Ok(SETUP_FAILURE_EXIT_CODE);
    }

    std::fs::create_dir_all(&args.project_dir).with_context(|| {
        format!(
            "Failed to create project dir: {}",
            args.project_dir.display()
        )
    })?;
    let fresh = !has_progress_marker(&args.project_dir);

    print_run_header(&RunHeader {
        project_dir: &args.project_dir,
        planning_model: &models.planning,
        coding_model: &models.coding,
        max_iterations: args.max_iterations,
        fresh,
    });

    if fresh {
        match library.copy_spec_to_project(&args.project_dir, args.spec_file.as_deref()) {
            Ok(Some(source)) => println!("Copied {source} to project directory"),
            Ok(None) => {}
            Err(err) if err.downcast_ref::<AppError>().is_some() => {
                eprintln!("Error: {err}");
                return Ok(SETUP_FAILURE_EXIT_CODE);
            }
            // A missing default spec is not fatal; the initializer can still run.
            Err(err) => warn!("Could not copy app spec: {err:#}"),
        }
    }

    let initializer_prompt = if fresh {
        Some(library.initializer_prompt()?)
    } else {
        None
    };
    let coding_prompt = library.coding_prompt()?;

    let work_dir = std::fs::canonicalize(&args.project_dir)
        .unwrap_or_else(|_| args.project_dir.clone());
    let mut launcher = CliSessionLauncher {
        command: CliCommand {
            program: config.backend.command.clone(),
            args: config.backend.args.clone(),
            model_flag: config.backend.model_flag.clone(),
            env: config.backend.env.clone(),
            work_dir,
        },
        models: models.clone(),
        initializer_prompt,
        coding_prompt,
    };
    let mut reporter = ConsoleReporter::new(&args.project_dir, &models.planning, models.is_hybrid());
    let settings = loop_settings(&config.retry, args.max_iterations);

    let summary = run_loop(
        &mut launcher,
        &mut reporter,
        &settings,
        LoopState::new(fresh),
        &cancel,
    )
    .await;
    info!(termination = ?summary.termination, completed = summary.state.completed, "Run finished");
    reporter.print_final_summary(&summary);

    Ok(summary.termination.exit_code())
}

pub(crate) fn handle_list_specs(config_path: Option<&Path>) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = HarnessConfig::load(&cwd, config_path)?;
    print_spec_list(&PromptLibrary::from_config(&config.prompts))
}

fn print_spec_list(library: &PromptLibrary) -> Result<()> {
    let specs = library.available_specs()?;
    if specs.is_empty() {
        println!("No spec files found in {}", library.dir().display());
        return Ok(());
    }
    println!("Available spec files:");
    for spec in specs {
        if spec == library.default_spec() {
            println!("  - {spec} (default)");
        } else {
            println!("  - {spec}");
        }
    }
    Ok(())
}
