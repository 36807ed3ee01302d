mod cli;
mod logging;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use mdviewer_platform::AppPaths;
use mdviewer_update::{
    InstallationKind, UpdateCheckResult, UpdateCoordinator, UpdateOutcome, UpdateProgress,
};

use cli::{Cli, Command};
use logging::Verbosity;
use settings::UpdaterSettings;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    let mut settings = UpdaterSettings::load();
    logging::init_logging(
        Verbosity::from_flags(settings.debug_logging, args.debug),
        settings.max_log_size_bytes,
    );
    ensure_settings_file(&settings);

    if let Some(repository) = &args.repository {
        settings.repository.clone_from(repository);
    }
    if let Some(branch) = &args.branch {
        settings.branch.clone_from(branch);
    }

    let root = match resolve_root(&args) {
        Ok(root) => root,
        Err(error) => {
            eprintln!("error: cannot determine installation root: {error}");
            return ExitCode::FAILURE;
        }
    };

    let coordinator = match settings
        .to_config(&root)
        .and_then(UpdateCoordinator::new)
    {
        Ok(coordinator) => coordinator,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Command::Check => run_check(Arc::new(coordinator), settings.check_deadline()).await,
        Command::Update => run_update(coordinator, settings.check_deadline()).await,
        Command::Status => run_status(&coordinator).await,
    }
}

fn ensure_settings_file(settings: &UpdaterSettings) {
    let Ok(paths) = AppPaths::new() else {
        return;
    };
    if !paths.settings_file().exists()
        && let Err(error) = settings.save()
    {
        warn!("Failed to write default settings: {error}");
    }
}

fn resolve_root(args: &Cli) -> std::io::Result<PathBuf> {
    match &args.root {
        Some(root) => std::path::absolute(root),
        None => std::env::current_dir(),
    }
}

/// Run the check on its own task and stop waiting after `deadline`. The task
/// is not cancelled; its result is simply no longer reported.
async fn check_with_deadline(
    coordinator: Arc<UpdateCoordinator>,
    deadline: Duration,
) -> Option<UpdateCheckResult> {
    let handle = tokio::spawn(async move { coordinator.check_for_update().await });
    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(result)) => Some(result),
        Ok(Err(join_error)) => {
            error!("Update check task failed: {join_error}");
            None
        }
        Err(_) => {
            warn!(
                "Update check abandoned after {} seconds",
                deadline.as_secs()
            );
            None
        }
    }
}

fn print_check(result: &UpdateCheckResult) {
    let show = |version: Option<&mdviewer_update::Version>| {
        version.map_or_else(|| "unknown".to_string(), ToString::to_string)
    };
    println!("Current version: {}", show(result.current_version.as_ref()));
    println!("Latest version:  {}", show(result.latest_version.as_ref()));

    if let Some(error) = &result.error {
        println!("Could not determine update availability: {error}");
    } else if result.has_update {
        println!("An update is available.");
        if let Some(notes) = result.release_notes.as_deref().filter(|n| !n.is_empty()) {
            println!("\nRelease notes:\n{notes}");
        }
    } else {
        println!("You are running the latest version.");
    }
}

fn print_outcome(outcome: &UpdateOutcome) {
    println!("{}", outcome.message);
    if !outcome.diagnostic_output.is_empty() {
        println!("\n{}", outcome.diagnostic_output);
    }
    if !outcome.success && !outcome.error_output.is_empty() {
        eprintln!("\n{}", outcome.error_output);
    }
    if let Some(backup) = outcome.backup_location() {
        println!("Backup: {}", backup.display());
    }
}

async fn run_check(coordinator: Arc<UpdateCoordinator>, deadline: Duration) -> ExitCode {
    match check_with_deadline(coordinator, deadline).await {
        Some(result) => {
            print_check(&result);
            if result.error.is_some() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        None => {
            println!("Update check timed out; try again later.");
            ExitCode::FAILURE
        }
    }
}

async fn run_update(coordinator: UpdateCoordinator, deadline: Duration) -> ExitCode {
    let (sender, mut receiver) = tokio::sync::mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                UpdateProgress::Phase(phase) => println!("... {phase}"),
                UpdateProgress::Downloading { downloaded, total } if total > 0 => {
                    info!("Downloaded {downloaded}/{total} bytes");
                }
                UpdateProgress::Downloading { .. } => {}
            }
        }
    });
    let coordinator = Arc::new(coordinator.with_progress(sender));

    let Some(check) = check_with_deadline(Arc::clone(&coordinator), deadline).await else {
        println!("Update check timed out; try again later.");
        return ExitCode::FAILURE;
    };
    print_check(&check);

    let Some(latest) = check.latest_version.filter(|_| check.has_update) else {
        return if check.error.is_some() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    };

    let outcome = coordinator.apply_version(&latest).await;
    drop(coordinator);
    let _ = printer.await;

    println!();
    print_outcome(&outcome);
    if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run_status(coordinator: &UpdateCoordinator) -> ExitCode {
    let installation = coordinator.installation();
    println!("Installation root: {}", installation.root.display());
    println!(
        "Installed version: {}",
        installation
            .version
            .as_ref()
            .map_or_else(|| "unknown".to_string(), ToString::to_string)
    );

    match installation.kind {
        InstallationKind::RepositoryCheckout => {
            println!("Update channel:    {}", installation.kind.channel_kind());
            let repository = coordinator.repository_channel();
            let status = repository.repository_status().await;
            let remote = repository.remote_info().await;
            println!("Working tree:      {}", status.message);
            println!(
                "Remote:            {}",
                if remote.url.is_empty() {
                    "unknown"
                } else {
                    &remote.url
                }
            );
            println!("Branch:            {}", remote.branch);
        }
        InstallationKind::ArchiveInstall => {
            println!("Update channel:    {}", installation.kind.channel_kind());
            let backups = coordinator.archive_channel().backups();
            println!("Backups:           {}", backups.len());
            for backup in backups {
                println!("  {}", backup.display());
            }
        }
    }

    ExitCode::SUCCESS
}
