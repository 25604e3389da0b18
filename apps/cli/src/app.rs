//! Application orchestrator: login, then whatever the flags asked for.

use std::sync::Arc;

use anyhow::Context;
use thunderdrive_api::{Entry, Session};
use thunderdrive_sync::{
    BatchReport, BatchRunner, DriveConnection, DriveError, FolderRef, FolderResolver, RemoteFile,
    TransferEngine, TransferTask, recent, search,
};
use thunderdrive_transfer::{ProgressReporter, RestartFlag, RetryPolicy, format_size, retry};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::browse::Browser;
use crate::cli::Cli;
use crate::config::Config;
use crate::output;

/// Runs one invocation to completion.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    let session_config = config.session_config(cli.use_proxy)?;
    let credentials = config.credentials();
    let metadata = RetryPolicy::default();

    let (cfg, creds) = (&session_config, &credentials);
    let session = retry(&metadata, "login", move || async move {
        Session::connect(cfg.clone(), creds)
            .await
            .map_err(DriveError::from_login)
    })
    .await
    .context("login failed")?;

    let restart = RestartFlag::new();
    listen_for_restart(restart.clone());

    let reporter = Arc::new(ProgressReporter::new(!cli.no_progress));
    let engine = TransferEngine::new(&session, reporter, restart);
    let runner = BatchRunner::new(engine, RetryPolicy::with_attempts(cli.tries));

    let outcome = dispatch(&cli, &session, &runner, &metadata).await;

    if let Err(e) = session.logout().await {
        debug!(error = %e, "logout failed");
    }
    outcome
}

async fn dispatch(
    cli: &Cli,
    session: &Session,
    runner: &BatchRunner<'_>,
    metadata: &RetryPolicy,
) -> anyhow::Result<()> {
    let conn: &dyn DriveConnection = session;
    if cli.interactive {
        tokio::fs::create_dir_all(&cli.dest).await?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        return Browser::new(conn, runner, metadata.clone(), &cli.dest)
            .run(&mut lines)
            .await;
    }

    if cli.usage {
        let usage = retry(metadata, "space usage", || session.space_usage()).await?;
        println!(
            "Used: {}  Available: {}",
            format_size(usage.used),
            format_size(usage.available)
        );
    }
    if let Some(n) = cli.recent {
        let entries = recent(conn, n, metadata).await?;
        output::print_entries(&entries, conn.user_name());
    }

    let uploads = cli.upload_paths();
    if !uploads.is_empty() {
        upload(cli, conn, runner, metadata, &uploads).await?;
    }

    let phrases = cli.phrases();
    if !phrases.is_empty() {
        download(cli, conn, runner, metadata, &phrases).await?;
    }
    Ok(())
}

async fn upload(
    cli: &Cli,
    conn: &dyn DriveConnection,
    runner: &BatchRunner<'_>,
    metadata: &RetryPolicy,
    paths: &[std::path::PathBuf],
) -> anyhow::Result<()> {
    let folder = match &cli.target_dir {
        Some(name) => {
            let mut resolver = FolderResolver::load(conn, metadata.clone()).await?;
            let folder = resolver.resolve(name, &cli.parent_dir, cli.create_dir).await;
            if folder.is_root() {
                warn!(folder = %name, "target folder unavailable, uploading to the drive root");
            }
            folder
        }
        None => FolderRef::root(),
    };

    if let [single] = paths {
        let task = TransferTask::Upload {
            local_path: single.clone(),
            folder,
        };
        runner
            .run_one(&task)
            .await
            .with_context(|| format!("uploading {}", single.display()))?;
        info!("upload complete");
        return Ok(());
    }

    let report = runner.upload_all(paths, &folder).await;
    log_failures(&report);
    Ok(())
}

async fn download(
    cli: &Cli,
    conn: &dyn DriveConnection,
    runner: &BatchRunner<'_>,
    metadata: &RetryPolicy,
    phrases: &[String],
) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&cli.dest)
        .await
        .with_context(|| format!("creating {}", cli.dest.display()))?;
    let list_only = cli.list && !cli.prompt;

    for phrase in phrases {
        let entries = search(conn, phrase, metadata).await?;
        info!(phrase = %phrase, found = entries.len(), "search finished");

        if cli.list || cli.prompt {
            output::print_entries(&entries, conn.user_name());
        }
        if list_only {
            continue;
        }
        if cli.prompt {
            wait_for_enter().await?;
        }

        match single_file(phrases, &entries) {
            Some(entry) => {
                let task = TransferTask::Download {
                    file: RemoteFile::from(entry),
                    dest_dir: cli.dest.clone(),
                };
                runner
                    .run_one(&task)
                    .await
                    .with_context(|| format!("downloading {}", entry.name))?;
            }
            None => {
                let report = runner.download_all(&entries, &cli.dest).await;
                log_failures(&report);
            }
        }
    }
    if !list_only {
        info!("all files downloaded");
    }
    Ok(())
}

/// The one file an invocation names, when it names exactly one: a single
/// phrase whose results hold a single file.
fn single_file<'e>(phrases: &[String], entries: &'e [Entry]) -> Option<&'e Entry> {
    if phrases.len() != 1 {
        return None;
    }
    let mut files = entries.iter().filter(|e| !e.is_folder());
    match (files.next(), files.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

fn log_failures(report: &BatchReport) {
    for (name, e) in &report.failed {
        warn!(file = %name, error = %e, "not transferred");
    }
}

async fn wait_for_enter() -> anyhow::Result<()> {
    println!("press Enter to continue download; Ctrl+C to stop");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(())
}

/// Raises `flag` on every SIGUSR1.
#[cfg(unix)]
fn listen_for_restart(flag: RestartFlag) {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::user_defined1()) {
        Ok(mut usr1) => {
            tokio::spawn(async move {
                while usr1.recv().await.is_some() {
                    info!("SIGUSR1 received, restarting current transfer");
                    flag.request();
                }
            });
        }
        Err(e) => warn!(error = %e, "cannot listen for SIGUSR1"),
    }
}

#[cfg(not(unix))]
fn listen_for_restart(_flag: RestartFlag) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: &str) -> Entry {
        Entry {
            name: name.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    #[test]
    fn single_file_needs_one_phrase_and_one_file() {
        let one = vec!["x".to_string()];
        let two = vec!["x".to_string(), "y".to_string()];
        let entries = vec![entry("Docs", "folder"), entry("a", "file")];
        assert_eq!(single_file(&one, &entries).map(|e| e.name.as_str()), Some("a"));
        assert!(single_file(&two, &entries).is_none());

        let many = vec![entry("a", "file"), entry("b", "file")];
        assert!(single_file(&one, &many).is_none());
        assert!(single_file(&one, &[]).is_none());
    }
}
