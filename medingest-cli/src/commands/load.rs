//! `load` command: ingest files and URLs, then commit them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use medingest::config::{config_file_path, ConfigFile};
use medingest::dataset::ElementType;
use medingest::fetch::{HttpFetcher, StaticToken};
use medingest::loader::{LoadReport, Loader};
use medingest::progress::TotalProgress;
use medingest::queue::{EntryState, EntryStateKind, FileQueue, QueueEvent, RemoteFile};
use medingest::reader::{RawVolumeInfo, ReaderRegistry};
use medingest::Blob;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::common::NamedUrl;
use crate::error::CliError;
use crate::scene::{LoggingRestorer, LoggingScene};

/// Progress bar resolution.
const BAR_STEPS: u64 = 1000;

/// Arguments for the load command.
pub struct LoadArgs {
    pub files: Vec<PathBuf>,
    pub urls: Vec<NamedUrl>,
    pub auth_token: Option<String>,
    pub raw_dims: Option<[usize; 3]>,
    pub raw_spacing: [f64; 3],
    pub raw_type: ElementType,
    pub config: Option<PathBuf>,
}

/// Run the load command on a fresh multi-threaded runtime.
pub fn run(args: LoadArgs) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(load(args))
}

async fn load(args: LoadArgs) -> Result<(), CliError> {
    let config_path = args.config.clone().unwrap_or_else(config_file_path);
    let config = ConfigFile::load_from(&config_path)?;
    let pipeline = config.to_pipeline_config();
    debug!(path = %config_path.display(), "Loaded configuration");

    let token = args.auth_token.clone().or_else(|| config.auth_token.clone());
    let mut fetcher = HttpFetcher::new(&pipeline)?;
    if let Some(token) = &token {
        fetcher = fetcher.with_token_provider(Arc::new(StaticToken::new(token.clone())));
    }

    let readers = ReaderRegistry::with_builtins(&pipeline);
    let queue = FileQueue::new(pipeline, readers, Arc::new(fetcher));
    let (bar, progress) = spawn_progress_bar(queue.subscribe());

    let blobs = read_files(&args.files).await?;
    if !blobs.is_empty() {
        queue.open_files(blobs).await;
    }

    let remotes: Vec<RemoteFile> = args
        .urls
        .iter()
        .map(|u| {
            let remote = RemoteFile::new(u.name.clone(), u.url.clone());
            if token.is_some() {
                remote.with_auth_token()
            } else {
                remote
            }
        })
        .collect();
    if !remotes.is_empty() {
        queue.open_remote_files(remotes).await;
    }

    supply_raw_info(&queue, &args).await;
    progress.abort();
    bar.finish_and_clear();

    print_entries(&queue);

    let loader = Loader::new(
        queue.clone(),
        Arc::new(LoggingScene::new()),
        Arc::new(LoggingRestorer),
    );
    let report = loader.load().await;
    print_report(&report);

    if let Some(failure) = report.failure {
        return Err(CliError::CommitFailed(failure));
    }
    let failed = queue
        .entries()
        .iter()
        .filter(|e| e.state.kind() == EntryStateKind::Error)
        .count();
    if failed > 0 {
        return Err(CliError::EntriesFailed(failed));
    }
    Ok(())
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<Blob>, CliError> {
    let mut blobs = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| CliError::ReadFile {
                path: path.clone(),
                source,
            })?;
        blobs.push(Blob::new(file_name(path), data));
    }
    Ok(blobs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Give every entry waiting for raw geometry the `--raw-*` settings.
async fn supply_raw_info(queue: &FileQueue, args: &LoadArgs) {
    let waiting: Vec<_> = queue
        .entries()
        .into_iter()
        .filter(|e| e.state.kind() == EntryStateKind::NeedsInfo)
        .collect();
    if waiting.is_empty() {
        return;
    }

    let Some(dims) = args.raw_dims else {
        for entry in &waiting {
            println!(
                "{} {} needs --raw-dims (and optionally --raw-spacing, --raw-type)",
                style("!").yellow(),
                entry.name
            );
        }
        return;
    };

    let info = RawVolumeInfo::new(dims, args.raw_spacing, args.raw_type);
    for entry in waiting {
        info!(name = %entry.name, dims = ?dims, element_type = %args.raw_type, "Applying raw volume info");
        queue.set_raw_info(entry.id, Some(info)).await;
    }
}

/// Draw aggregate download progress until the returned task is aborted.
fn spawn_progress_bar(
    mut events: broadcast::Receiver<QueueEvent>,
) -> (ProgressBar, JoinHandle<()>) {
    let bar = ProgressBar::new(BAR_STEPS);
    let template = ProgressStyle::with_template("{spinner} downloading [{bar:40}] {percent}% {msg}");
    if let Ok(template) = template {
        bar.set_style(template.progress_chars("=> "));
    }

    let task_bar = bar.clone();
    let task = tokio::spawn(async move {
        let bar = task_bar;
        loop {
            match events.recv().await {
                Ok(QueueEvent::Progress(TotalProgress::Determinate(fraction))) => {
                    bar.set_message("");
                    bar.set_position((fraction * BAR_STEPS as f64).round() as u64);
                }
                Ok(QueueEvent::Progress(TotalProgress::Indeterminate)) => {
                    bar.set_message("(size unknown)");
                    bar.tick();
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    (bar, task)
}

fn print_entries(queue: &FileQueue) {
    println!();
    println!("Files");
    println!("=====");
    for entry in queue.entries() {
        let state = match &entry.state {
            EntryState::Ready(_) => style(entry.state.kind().to_string()).green(),
            EntryState::Error(_) => style(entry.state.kind().to_string()).red(),
            _ => style(entry.state.kind().to_string()).yellow(),
        };
        match entry.error() {
            Some(message) => println!("  {:<40} {} ({})", entry.name, state, message),
            None => println!("  {:<40} {}", entry.name, state),
        }
    }
    println!();
}

fn print_report(report: &LoadReport) {
    if report.restored_state {
        println!("Restored project state");
    }
    println!("Registered:  {}", report.registered.len());
    println!("Labelmaps:   {}", report.labelmaps_attached);
    println!("Measurements: {}", report.measurements_attached);
}
