//! CLI: analyze a document with the built-in pipeline, refine a prior analysis, or manage its
//! session.
//!
//! Usage: `analyze_doc [OPTIONS] <COMMAND> <document>`
//! Example: analyze_doc analyze notes.md --provider web
//!
//! Checkpoints live under `<state-dir>/<session-id>/checkpoint.json`; final results are
//! written next to them as `results.json`. Ctrl-C stops the run after the current node; run
//! `analyze` again to continue.
//!
//! Set RUST_LOG=analysis_orchestrator=trace for TRACE-level span enter/exit and events.

use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use analysis_orchestrator::config::{DEFAULT_STATE_DIR, OrchestratorConfig};
use analysis_orchestrator::results_io::{RESULTS_FILENAME, write_results};
use analysis_orchestrator::types::{ProgressEvent, Severity};
use analysis_orchestrator::{
  AnalyzeOptions, FileCheckpointStore, FsDocumentLoader, GraphController,
  Orchestrator, OrchestratorError, RefineOptions, analysis_pipeline,
};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Analyze documents with a resumable pipeline.
#[derive(Parser, Debug)]
#[command(name = "analyze_doc")]
#[command(
  after_help = r#"Environment variables (override --state-dir and --config when set):
  ANALYZE_STATE_DIR   Directory for session checkpoints and results (default: .analysis).
  ANALYZE_CONFIG      JSON config file with rate budgets and research providers.

Examples:
  analyze_doc analyze notes.md
  analyze_doc --config providers.json analyze notes.md --provider web
  analyze_doc refine notes.md --from research"#
)]
struct Args {
  /// Directory for session state. Overridden by ANALYZE_STATE_DIR if set.
  #[arg(long, value_name = "DIR")]
  state_dir: Option<PathBuf>,

  /// JSON config file. Overridden by ANALYZE_CONFIG if set.
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the pipeline (resumes an unfinished run of the same document).
  Analyze {
    document: PathBuf,
    /// Research provider to query; repeatable.
    #[arg(long = "provider", value_name = "NAME")]
    providers: Vec<String>,
    /// Start a new session instead of reusing the document's.
    #[arg(long)]
    new_session: bool,
  },
  /// Re-run part of the pipeline on top of the last analysis.
  Refine {
    document: PathBuf,
    /// Node to re-run from (default: the last node).
    #[arg(long = "from", value_name = "NODE")]
    start_from: Option<String>,
    #[arg(long = "provider", value_name = "NAME")]
    providers: Vec<String>,
  },
  /// Show the document's session.
  Session { document: PathBuf },
  /// Delete the document's checkpoint.
  Clear { document: PathBuf },
}

fn exit_with(e: &OrchestratorError) -> ! {
  match e {
    OrchestratorError::Interrupted {
      session_id,
      last_completed,
      ..
    } => {
      println!(
        "Interrupted in session {session_id} after {}. Run `analyze` again to resume.",
        last_completed.as_deref().unwrap_or("no completed node")
      );
      process::exit(130);
    }
    other => {
      eprintln!("Error: {other}");
      process::exit(1);
    }
  }
}

fn doc_key(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Env vars override flags.
  let config_path = env::var("ANALYZE_CONFIG")
    .ok()
    .map(PathBuf::from)
    .or_else(|| args.config.clone());
  let mut config = match config_path.as_deref() {
    Some(path) => OrchestratorConfig::load(path).unwrap_or_else(|e| exit_with(&e)),
    None => OrchestratorConfig::default(),
  };
  if let Some(dir) = env::var("ANALYZE_STATE_DIR")
    .ok()
    .map(PathBuf::from)
    .or_else(|| args.state_dir.clone())
  {
    config.state_dir = dir;
  }
  if config.state_dir.as_os_str().is_empty() {
    config.state_dir = PathBuf::from(DEFAULT_STATE_DIR);
  }
  info!(state_dir = %config.state_dir.display(), config = ?config_path, "options (env or flags)");

  let store = Arc::new(FileCheckpointStore::new(&config.state_dir));
  let graph = analysis_pipeline().unwrap_or_else(|e| exit_with(&OrchestratorError::from(e)));
  let mut controller = GraphController::new(graph, store.clone());
  if !config.providers.is_empty() {
    let bridge = config.build_bridge().unwrap_or_else(|e| exit_with(&e));
    if config.cache_sweep_secs > 0 {
      bridge
        .cache()
        .spawn_sweeper(Duration::from_secs(config.cache_sweep_secs));
    }
    controller = controller.with_bridge(Arc::new(bridge));
  }
  let orch = Orchestrator::new(controller, Arc::new(FsDocumentLoader));
  let listener = orch.subscribe(print_event);
  let interrupt = orch.interrupt_handle();
  let signal = tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received; stopping after the current node");
      interrupt.interrupt();
    }
  });

  let result = match args.command {
    Command::Session { document } => {
      let info = orch
        .get_session(&doc_key(&document))
        .await
        .unwrap_or_else(|e| exit_with(&e));
      println!("Session: {}", info.session_id);
      println!("  Checkpoint: {}", if info.has_checkpoint { "yes" } else { "no" });
      return;
    }
    Command::Clear { document } => {
      let removed = orch
        .clear_session(&doc_key(&document))
        .await
        .unwrap_or_else(|e| exit_with(&e));
      println!("{}", if removed { "Session cleared." } else { "Nothing to clear." });
      return;
    }
    Command::Analyze {
      document,
      providers,
      new_session,
    } => {
      let options = AnalyzeOptions {
        force_new_session: new_session,
        providers,
      };
      orch.analyze(&doc_key(&document), options).await
    }
    Command::Refine {
      document,
      start_from,
      providers,
    } => {
      let options = RefineOptions {
        start_from,
        providers,
      };
      orch.refine(&doc_key(&document), options).await
    }
  };

  signal.abort();
  drop(orch);
  if let Err(e) = listener.await {
    warn!(error = %e, "progress listener failed");
  }

  let state = result.unwrap_or_else(|e| exit_with(&e));
  let path = store.session_dir(&state.session_id).join(RESULTS_FILENAME);
  if let Err(e) = write_results(&state, &path) {
    eprintln!("Error writing {}: {}", path.display(), e);
    process::exit(1);
  }

  info!(session_id = %state.session_id, nodes = ?state.completed_nodes(), "analysis completed");
  println!("Analysis completed.");
  println!("  Session: {}", state.session_id);
  println!("  Iteration: {}", state.iteration);
  println!("  Completed nodes: {:?}", state.completed_nodes());
  if let Some(summary) = state
    .result("report")
    .and_then(|r| r.output.get("summary"))
    .and_then(|s| s.as_str())
  {
    println!("  Summary: {summary}");
  }
  for e in &state.errors {
    println!("  Warning ({}): {}", e.node, e.message);
  }
  println!("  Results: {}", path.display());
}

fn print_event(event: ProgressEvent) {
  let node = event.node.as_deref().unwrap_or("-");
  match event.severity {
    Severity::Info => println!("[{node}] {}", event.message),
    _ => println!("[{node}] {}: {}", event.severity, event.message),
  }
}
