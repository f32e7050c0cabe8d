//! Activity Monitor - Binary Entry Point
//!
//! ```text
//! activity-monitor [watch]                      live dashboard until Ctrl-C
//! activity-monitor stats                        one dashboard snapshot
//! activity-monitor logs [--user U] [--action A] filtered audit log
//! activity-monitor export <path>                export all stores
//! activity-monitor backup                       timestamped backup
//! activity-monitor clear                        archive, then clear the log
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::EnvFilter;

use activity_monitor::analytics::DEFAULT_RECENT_LIMIT;
use activity_monitor::types::sort_newest_first;
use activity_monitor::{ActivityMonitor, DashboardStats, MonitorConfig, NAME, VERSION};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Activity Monitor - audit log, file-access registry and cipher ledger
#[derive(Parser)]
#[command(name = "activity-monitor")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, PartialEq, Subcommand)]
enum Command {
    /// Live dashboard until Ctrl-C (default)
    Watch,

    /// Print one dashboard snapshot
    Stats,

    /// Print the audit log, newest first
    Logs {
        /// Case-insensitive substring of the username
        #[arg(long)]
        user: Option<String>,

        /// Case-insensitive substring of the action
        #[arg(long)]
        action: Option<String>,
    },

    /// Export all stores to a file
    Export {
        /// Destination path
        path: PathBuf,
    },

    /// Write a timestamped backup
    Backup,

    /// Archive the event log, then clear it
    Clear,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command.unwrap_or(Command::Watch)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> CliResult<()> {
    let config = MonitorConfig::from_env()?;
    let monitor = Arc::new(ActivityMonitor::open(config)?);

    match command {
        Command::Watch => watch(monitor),
        Command::Stats => {
            print_stats(&monitor.compute_stats());
            print_details(&monitor);
            Ok(())
        }
        Command::Logs { user, action } => {
            let mut events = monitor.filter_events(user.as_deref(), action.as_deref());
            sort_newest_first(&mut events);
            for event in &events {
                let marker = if event.action.is_error() { '!' } else { ' ' };
                println!(
                    "{}{} {:<12} {:<24} {}",
                    marker, event.timestamp, event.username, event.action, event.details
                );
            }
            println!("{} event(s)", events.len());
            Ok(())
        }
        Command::Export { path } => {
            let written = monitor.export_snapshot(&path)?;
            println!("Exported to {}", written.display());
            Ok(())
        }
        Command::Backup => {
            let written = monitor.backup()?;
            println!("Backup written to {}", written.display());
            Ok(())
        }
        Command::Clear => {
            let report = monitor.clear_events()?;
            println!(
                "Cleared {} event(s); previous log archived at {}",
                report.cleared,
                report.archive.display()
            );
            Ok(())
        }
    }
}

fn watch(monitor: Arc<ActivityMonitor>) -> CliResult<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || handler_token.cancel())?;

    runtime.block_on(async move {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = monitor.scheduler(tx);
        scheduler.start();
        scheduler.refresh_now();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                stats = rx.recv() => match stats {
                    Some(stats) => print_stats(&stats),
                    None => break,
                },
            }
        }

        scheduler.stop();
    });

    Ok(())
}

fn print_stats(stats: &DashboardStats) {
    println!("=== {} {} @ {} ===", NAME, VERSION, stats.generated_at);
    println!("Users:            {}", stats.total_users);
    println!("Events:           {}", stats.total_events);
    println!("Files:            {}", stats.total_files);
    println!("Active sessions:  {}", stats.active_sessions);
    println!("Cipher ops:       {}", stats.encryption_ops);
    println!(
        "Last activity:    {}",
        stats.last_activity.as_deref().unwrap_or("Never")
    );
    for warning in &stats.warnings {
        println!("WARNING: {}", warning);
    }
}

fn print_details(monitor: &ActivityMonitor) {
    if let Some(timeline) = monitor.activity_timeline() {
        println!("\nFirst activity:   {}", timeline.first);
        println!("Latest activity:  {}", timeline.last);
    }

    println!("\nRecent activity:");
    for event in monitor.recent_activity(DEFAULT_RECENT_LIMIT) {
        println!("  {}  {:<12} {}", event.timestamp, event.username, event.action);
    }

    println!("\nFiles:");
    for (name, record) in monitor.files_by_recency() {
        println!(
            "  {:<24} {:>4}x  last {}  by {}",
            name,
            record.accessed_count,
            record.last_access,
            record.accessed_by.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    println!("\nCipher operations by user:");
    for (user, counts) in monitor.cipher_breakdown() {
        println!(
            "  {:<12} enc {:>4}  dec {:>4}",
            user, counts.encryptions, counts.decryptions
        );
    }
}
