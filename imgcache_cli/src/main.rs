use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use imgcache_cli::cache::CacheFactory;
use imgcache_cli::config::{AppConfig, ConfigManager};
use imgcache_cli::error::{CliError, ExitCode};
use imgcache_cli::output::{OutputFormat, OutputFormatter, create_formatter};
use imgcache_cli::progress::{create_progress_infrastructure, format_elapsed, render_progress};
use imgcache_cli::terminal::TerminalCaps;
use imgcache_core::progress::{NullProvider, ProgressProvider};
use imgcache_core::{CacheUrlOptions, ImageCache};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "imgcache")]
#[command(author, version, about = "Image URL cache with TTL expiry and persistent snapshots", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format (defaults to output.default_format)
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Disable progress bar display
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Cache(CacheCommands),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Commands that open the cache
#[derive(Subcommand)]
enum CacheCommands {
    /// Fetch and cache one or more image URLs
    Cache {
        /// Image URLs (http, https, file:// or absolute paths)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Fetch again even when a valid entry exists
        #[arg(long)]
        force: bool,

        /// Give up on each URL after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Cache URLs in concurrent batches
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,

        /// URLs fetched concurrently per batch (defaults to the profile's)
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Preload bundled assets and remote images
    ///
    /// With neither --local nor --remote every registered asset is preloaded.
    Preload {
        /// Registered asset key (can be specified multiple times)
        #[arg(long = "local", value_name = "KEY")]
        local: Vec<String>,

        /// Remote image URL (can be specified multiple times)
        #[arg(long = "remote", value_name = "URL")]
        remote: Vec<String>,

        /// Abort the local preload after this many milliseconds
        #[arg(long, conflicts_with = "remote")]
        timeout_ms: Option<u64>,
    },

    /// Check whether a key is cached and fresh
    Check { key: String },

    /// Show the cached entry for a key
    Get { key: String },

    /// Show cache statistics
    Stats {
        /// Shorthand for --format json
        #[arg(long)]
        json: bool,
    },

    /// Remove every entry, in memory and on disk
    Clear,

    /// Remove expired entries
    ClearExpired,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., cache.profile)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.profile)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,

    /// Print the configuration file location
    Path,
}

/// Per-invocation state shared by the cache commands
struct Session {
    cache: ImageCache,
    formatter: Box<dyn OutputFormatter>,
    show_progress: bool,
}

impl Session {
    fn print(&self, text: String) {
        print!("{text}");
    }

    /// Run `operation` with a progress provider, rendering it when enabled
    async fn with_progress<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn ProgressProvider>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if !self.show_progress {
            return operation(Arc::new(NullProvider)).await;
        }

        let (provider, rx) = create_progress_infrastructure();
        let renderer: JoinHandle<()> = tokio::spawn(render_progress(rx));

        let result = operation(Arc::clone(&provider)).await;

        provider.complete();
        drop(provider);
        let _ = renderer.await;
        result
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let debug = cli.debug;

    // Initialize logging based on debug flag
    if debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("imgcache_core", log::LevelFilter::Debug)
            .filter_module("imgcache_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let code = match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            let error = CliError::from(error);
            eprint!("{}", error.format_for_user(debug));
            error.exit_code()
        }
    };

    std::process::exit(code.code());
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let command = match cli.command {
        Commands::Config { command } => {
            config_command(command)?;
            return Ok(ExitCode::Success);
        }
        Commands::Cache(command) => command,
    };

    let manager = ConfigManager::new();
    let config = manager.load()?;

    let caps = TerminalCaps::detect();
    let use_color = caps.use_color(config.output.color_enabled);
    if !use_color {
        colored::control::set_override(false);
    }

    let format = match cli.format {
        Some(format) => format,
        None => OutputFormat::from_string(&config.output.default_format)?,
    };
    let format = match &command {
        CacheCommands::Stats { json: true } => OutputFormat::Json,
        _ => format,
    };

    let session = Session {
        cache: CacheFactory::create(&config)?,
        formatter: create_formatter(format, use_color),
        show_progress: caps.show_progress(config.output.progress_enabled && !cli.no_progress),
    };

    let started = Instant::now();
    let code = execute(&session, &config, command).await;

    // Writes are batched in the background; persist before the process exits
    session.cache.flush().await;
    log::debug!("Finished in {}", format_elapsed(started.elapsed()));

    code
}

async fn execute(
    session: &Session,
    config: &AppConfig,
    command: CacheCommands,
) -> Result<ExitCode> {
    let cache = &session.cache;

    match command {
        CacheCommands::Cache {
            urls,
            force,
            timeout_ms,
        } => {
            let options = CacheUrlOptions {
                force_refresh: force,
                timeout: timeout_ms.map(Duration::from_millis),
            };

            let mut failed = 0;
            for url in &urls {
                if cache.cache_image_url(url, options).await {
                    println!("{} {url}", "✓".green());
                } else {
                    failed += 1;
                    println!("{} {url}", "✗".red());
                }
            }

            if failed > 0 {
                anyhow::bail!("{failed} of {} URL(s) could not be cached", urls.len());
            }
        }
        CacheCommands::Batch { urls, batch_size } => {
            let batch_size = batch_size.unwrap_or(config.profile().remote_batch_size);
            let report = session
                .with_progress(|progress| async move {
                    Ok(cache
                        .batch_cache(&urls, batch_size, progress.as_ref())
                        .await?)
                })
                .await?;
            session.print(session.formatter.format_report(&report)?);
        }
        CacheCommands::Preload {
            local,
            remote,
            timeout_ms,
        } => {
            preload_command(session, local, remote, timeout_ms).await?;
        }
        CacheCommands::Check { key } => {
            let cached = cache.is_image_cached(&key).await;
            session.print(if cached {
                format!("{key}: {}\n", "cached".green())
            } else {
                format!("{key}: {}\n", "not cached".yellow())
            });
            if !cached {
                return Ok(ExitCode::GeneralError);
            }
        }
        CacheCommands::Get { key } => {
            let data = cache.get_cached_image(&key).await;
            session.print(session.formatter.format_entry(&key, data.as_ref())?);
            if data.is_none() {
                return Ok(ExitCode::GeneralError);
            }
        }
        CacheCommands::Stats { .. } => {
            let stats = cache.stats().await;
            session.print(session.formatter.format_stats(&stats)?);
        }
        CacheCommands::Clear => {
            cache.clear_image_cache().await;
            eprintln!("{}", "Cache cleared".green());
        }
        CacheCommands::ClearExpired => {
            let removed = cache.clear_expired_cache().await;
            eprintln!("Removed {removed} expired entr{}", if removed == 1 { "y" } else { "ies" });
        }
    }

    Ok(ExitCode::Success)
}

async fn preload_command(
    session: &Session,
    local: Vec<String>,
    remote: Vec<String>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let cache = &session.cache;

    if let Some(timeout_ms) = timeout_ms {
        let keys = if local.is_empty() {
            cache.registry().keys()
        } else {
            local
        };
        let limit = Duration::from_millis(timeout_ms);
        let report = session
            .with_progress(|progress| async move {
                Ok(cache
                    .preload_images_with_timeout(&keys, limit, progress.as_ref())
                    .await?)
            })
            .await?;
        session.print(session.formatter.format_report(&report)?);
        return Ok(());
    }

    match (local.is_empty(), remote.is_empty()) {
        (true, true) => {
            let report = session
                .with_progress(|progress| async move {
                    Ok(cache.preload_local_images(None, progress.as_ref()).await?)
                })
                .await?;
            session.print(session.formatter.format_report(&report)?);
        }
        (false, true) => {
            let report = session
                .with_progress(|progress| async move {
                    Ok(cache
                        .preload_local_images(Some(local.as_slice()), progress.as_ref())
                        .await?)
                })
                .await?;
            session.print(session.formatter.format_report(&report)?);
        }
        (true, false) => {
            let report = session
                .with_progress(|progress| async move {
                    Ok(cache
                        .preload_remote_images(&remote, progress.as_ref())
                        .await?)
                })
                .await?;
            session.print(session.formatter.format_report(&report)?);
        }
        (false, false) => {
            let report = session
                .with_progress(|progress| async move {
                    Ok(cache
                        .preload_all_images(&local, &remote, progress.as_ref())
                        .await?)
                })
                .await?;
            session.print(session.formatter.format_combined(&report)?);
        }
    }

    Ok(())
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            println!("{}", manager.get(&key)?);
        }
        ConfigCommand::Set { key, value } => {
            manager
                .set(&key, &value)
                .with_context(|| format!("Failed to set {key}"))?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());

            let mut section = String::new();
            for (key, value) in manager.list()? {
                let (head, rest) = key.split_once('.').unwrap_or(("general", key.as_str()));
                if head != section {
                    println!("\n[{}]", head.yellow());
                    section = head.to_string();
                }
                println!("  {} = {}", rest.cyan(), value);
            }
        }
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
    }

    Ok(())
}
