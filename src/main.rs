//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror offline mirroring engine.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use site_mirror::config::{
    load_config_with_hash, load_job_file, validate_crawl_config, AppConfig, CrawlConfig, CrawlRequest,
};
use site_mirror::output::{format_history, print_report};
use site_mirror::rewrite::rewrite_links;
use site_mirror::site::{sanitize_segment, SiteAssets};
use site_mirror::state::{JobContext, TaskStatus};
use site_mirror::storage::open_task_store;
use site_mirror::tasks::{TaskManager, TaskSnapshot};
use site_mirror::url::normalize_start_url;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: an offline website mirroring engine
///
/// Site-Mirror crawls a site breadth-first, downloads its stylesheets, scripts
/// and images, and rewrites every link so the copy can be served from a local
/// directory.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version = "1.0.0")]
#[command(about = "An offline website mirroring engine", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mirror the configured sites and wait for every job to finish
    Run {
        /// Path to TOML configuration file
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Start URL to mirror with the configured defaults (repeatable)
        #[arg(short, long = "url", value_name = "URL")]
        urls: Vec<String>,

        /// JSON job payload to submit (repeatable)
        #[arg(short, long = "job", value_name = "FILE")]
        jobs: Vec<PathBuf>,

        /// Override the output base directory
        #[arg(long, value_name = "DIR")]
        output_base_dir: Option<PathBuf>,

        /// Validate the jobs and show what would be mirrored without crawling
        #[arg(long)]
        dry_run: bool,

        /// Print the final task snapshots as JSON instead of the report
        #[arg(long)]
        status_json: bool,
    },

    /// Rewrite the links of a local script file as if it were served from a page
    RewriteScript {
        /// Script file to rewrite
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// URL of the page the script belongs to
        #[arg(long, value_name = "URL")]
        page_url: String,

        /// Output base directory used to compute local paths
        #[arg(long, value_name = "DIR", default_value = "output")]
        output_base_dir: PathBuf,

        /// Write the rewritten script here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// List recent tasks from the history database
    History {
        /// Path to TOML configuration file naming the history database
        #[arg(short, long, value_name = "CONFIG")]
        config: PathBuf,

        /// Maximum number of tasks to list
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run {
            config,
            urls,
            jobs,
            output_base_dir,
            dry_run,
            status_json,
        } => {
            let (app, config_hash) = load_app_config(config.as_deref())?;
            let output_base = output_base_dir.unwrap_or_else(|| app.storage.output_root());
            let crawl_jobs = collect_jobs(&app, &urls, &jobs)?;

            if dry_run {
                handle_dry_run(&app, &output_base, &crawl_jobs)?;
                return Ok(ExitCode::SUCCESS);
            }
            handle_run(app, output_base, crawl_jobs, config_hash, status_json).await
        }
        Command::RewriteScript {
            file,
            page_url,
            output_base_dir,
            out,
        } => {
            handle_rewrite_script(&file, &page_url, &output_base_dir, out.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::History { config, limit } => {
            handle_history(&config, limit)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .init();
}

fn load_app_config(path: Option<&Path>) -> anyhow::Result<(AppConfig, Option<String>)> {
    let Some(path) = path else {
        return Ok((AppConfig::default(), None));
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok((config, Some(hash)))
}

/// Gathers jobs from the config file, `--url` flags and JSON payloads, in that order
fn collect_jobs(app: &AppConfig, urls: &[String], job_files: &[PathBuf]) -> anyhow::Result<Vec<CrawlConfig>> {
    let mut jobs: Vec<CrawlConfig> = app.jobs.iter().map(|r| r.resolve(&app.defaults)).collect();
    jobs.extend(urls.iter().map(|u| CrawlRequest::for_url(u.as_str()).resolve(&app.defaults)));

    for path in job_files {
        let request = load_job_file(path).with_context(|| format!("failed to load job {}", path.display()))?;
        jobs.push(request.resolve(&app.defaults));
    }

    if jobs.is_empty() {
        bail!("nothing to mirror: add [[job]] entries to the config or pass --url / --job");
    }
    Ok(jobs)
}

/// Handles --dry-run: validates every job and shows where it would be written
fn handle_dry_run(app: &AppConfig, output_base: &Path, jobs: &[CrawlConfig]) -> anyhow::Result<()> {
    println!("=== Site-Mirror Dry Run ===\n");

    println!("Output base: {}", output_base.display());
    println!(
        "Workers: {}, queue capacity: {}",
        app.pool.effective_workers(),
        app.pool.queue_capacity
    );
    if let Some(db) = &app.storage.history_database {
        println!("History database: {}", db);
    }

    println!("\nJobs ({}):", jobs.len());
    let mut invalid = 0;
    for job in jobs {
        match validate_crawl_config(job) {
            Ok(()) => println!(
                "  - {} (depth {}, pages {}, same-domain {})",
                job.start_url, job.max_depth, job.max_pages, job.same_domain
            ),
            Err(e) => {
                invalid += 1;
                println!("  - {} INVALID: {}", job.start_url, e);
            }
        }
    }

    if invalid > 0 {
        bail!("{} invalid job(s)", invalid);
    }
    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Runs every job on the task manager and waits for them to finish
async fn handle_run(
    app: AppConfig,
    output_base: PathBuf,
    jobs: Vec<CrawlConfig>,
    config_hash: Option<String>,
    status_json: bool,
) -> anyhow::Result<ExitCode> {
    let store = open_task_store(app.storage.history_database.as_deref().map(Path::new))
        .context("failed to open the history database")?;
    let site_assets = SiteAssets::from_config(&app.site_assets).context("failed to load site assets")?;

    let manager = Arc::new(
        TaskManager::start_with_hash(&app.pool, output_base, app.http.clone(), site_assets, store, config_hash)
            .context("failed to start the task manager")?,
    );

    let mut rejected = 0;
    for job in jobs {
        let url = job.start_url.clone();
        match manager.submit(job) {
            Ok(id) => tracing::debug!(task_id = %id, url = %url, "submitted"),
            Err(e) => {
                rejected += 1;
                tracing::error!(url = %url, "job rejected: {}", e);
            }
        }
    }

    wait_for_tasks(&manager).await;

    let snapshots = manager.list();
    let worker_pool = Arc::clone(&manager);
    tokio::task::spawn_blocking(move || worker_pool.shutdown())
        .await
        .context("worker shutdown panicked")?;

    if status_json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
    } else {
        print_report(&snapshots);
    }

    let failed = snapshots.iter().filter(|t| t.status == TaskStatus::Failed).count();
    if failed + rejected > 0 {
        tracing::error!(failed, rejected, "some jobs did not complete");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Polls until every task is terminal; Ctrl-C cancels whatever is still pending
async fn wait_for_tasks(manager: &TaskManager) {
    let mut interval = tokio::time::interval(Duration::from_millis(250));
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if manager.list().iter().all(|t: &TaskSnapshot| t.status.is_terminal()) {
                    return;
                }
            }
            result = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(e) = result {
                    tracing::warn!("cannot listen for Ctrl-C: {}", e);
                    continue;
                }
                let cancelled = manager.cancel_all();
                tracing::warn!(cancelled, "interrupted, cancelling pending tasks");
            }
        }
    }
}

/// Handles `rewrite-script`: runs the script link rewriter over a local file
fn handle_rewrite_script(file: &Path, page_url: &str, output_base: &Path, out: Option<&Path>) -> anyhow::Result<()> {
    let page = normalize_start_url(page_url).with_context(|| format!("invalid page URL '{}'", page_url))?;
    let text = std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;

    let root = output_base.join(sanitize_segment(page.host_str().unwrap_or("unknown-host")));
    let mut ctx = JobContext::new();
    let rewritten = rewrite_links(&text, &page, &root, &mut ctx);

    match out {
        Some(path) => {
            std::fs::write(path, rewritten.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✓ Rewritten script written to: {}", path.display());
        }
        None => print!("{}", rewritten),
    }

    let pending = ctx.take_pending_pages();
    eprintln!("\nPending pages ({}):", pending.len());
    for url in pending {
        eprintln!("  - {}", url);
    }
    Ok(())
}

/// Handles `history`: lists recent tasks from the configured database
fn handle_history(config: &Path, limit: usize) -> anyhow::Result<()> {
    let (app, _) = load_app_config(Some(config))?;
    let Some(db) = app.storage.history_database.as_deref() else {
        bail!("no [storage] history-database configured in {}", config.display());
    };

    println!("Database: {}\n", db);
    let store = open_task_store(Some(Path::new(db))).context("failed to open the history database")?;
    let tasks = store.recent(limit)?;
    print!("{}", format_history(&tasks));
    Ok(())
}
