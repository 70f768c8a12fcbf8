use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;
use web2md_core::crawl::{CrawlOptions, RendererKind, derive_output_dir, execute_crawl};
use web2md_core::report::{ReportFormat, generate_json_report, generate_text_report};
use web2md_scanner::scope::derive_base_url;
use web2md_scanner::{PageOutcome, PageResult};

// Helper functions for crawl handler

/// Accept only absolute http(s) URLs with a host
pub fn parse_target_url(value: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| format!("invalid URL '{}': {}", value, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!(
            "unsupported scheme '{}', only http and https are crawled",
            url.scheme()
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("URL '{}' has no host", value));
    }
    Ok(url)
}

/// Output directory for a crawl: the user's path with `~` expanded, or one
/// derived from the target, made absolute against the working directory.
pub fn resolve_output_dir(arg: Option<&str>, target: &Url) -> Result<PathBuf> {
    let raw = match arg {
        Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
        None => PathBuf::from(derive_output_dir(target)),
    };
    std::path::absolute(&raw)
        .with_context(|| format!("Failed to resolve output directory {}", raw.display()))
}

/// The banner goes to stdout, so it is skipped for `--quiet` and for JSON output.
pub fn show_banner(matches: &ArgMatches) -> bool {
    let json = matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        == Some(ReportFormat::Json);
    !matches.get_flag("quiet") && !json
}

pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Turn parsed arguments into crawl options
pub fn build_crawl_options(matches: &ArgMatches) -> Result<CrawlOptions> {
    let target = matches
        .get_one::<Url>("URL")
        .cloned()
        .context("a target URL is required")?;
    let output_dir = resolve_output_dir(
        matches.get_one::<String>("OUTPUT_DIR").map(String::as_str),
        &target,
    )?;

    let mut options = CrawlOptions::new(target, output_dir);
    options.max_depth = *matches.get_one::<usize>("depth").unwrap_or(&options.max_depth);
    options.max_count = *matches.get_one::<usize>("count").unwrap_or(&options.max_count);
    options.media.images = matches.get_flag("picture");
    options.media.videos = matches.get_flag("video");
    options.workers = *matches.get_one::<usize>("workers").unwrap_or(&1);
    options.exclude_patterns = matches
        .get_many::<String>("exclude")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if let Some(seconds) = matches.get_one::<u64>("timeout") {
        options.render_timeout = Duration::from_secs(*seconds);
    }
    if let Some(seconds) = matches.get_one::<u64>("media-timeout") {
        options.media_timeout = Duration::from_secs(*seconds);
    }
    if let Some(seconds) = matches.get_one::<u64>("settle") {
        options.settle = Duration::from_secs(*seconds);
    }
    options.accept_invalid_certs = !matches.get_flag("strict-tls");

    let renderer = matches
        .get_one::<String>("renderer")
        .map(String::as_str)
        .unwrap_or("http");
    options.renderer = match RendererKind::from_str(renderer) {
        Some(kind) => kind,
        None => bail!("unknown renderer '{}'", renderer),
    };

    Ok(options)
}

fn enabled(flag: bool) -> colored::ColoredString {
    if flag {
        "enabled".green()
    } else {
        "disabled".bright_black()
    }
}

fn print_crawl_config(options: &CrawlOptions) {
    println!("{} {}", "→".blue(), "Crawl configuration".bright_white().bold());
    println!("  Target:      {}", options.target);
    println!("  Scope root:  {}", derive_base_url(&options.target));
    println!("  Output dir:  {}", options.output_dir.display());
    println!("  Max depth:   {}", options.max_depth);
    if options.max_count == 0 {
        println!("  Max count:   unlimited");
    } else {
        println!("  Max count:   {}", options.max_count);
    }
    println!("  Workers:     {}", options.workers);
    println!("  Pictures:    {}", enabled(options.media.images));
    println!("  Videos:      {}", enabled(options.media.videos));
    println!();
}

fn print_page_result(result: &PageResult) {
    match result.outcome {
        PageOutcome::Saved => {
            if let Some(ref path) = result.output_path {
                println!(
                    "{} {} {}",
                    "✓".green(),
                    result.url,
                    path.display().to_string().bright_black()
                );
            }
        }
        PageOutcome::Failed => {
            println!(
                "{} {} {}",
                "✗".red(),
                result.url,
                result.error.as_deref().unwrap_or("failed").red()
            );
        }
        PageOutcome::SkippedEmpty | PageOutcome::SkippedLimit => {}
    }
}

fn create_output_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create output directory {}", path.display()))?;
    debug!(path = %path.display(), "Output directory ready");
    Ok(())
}

pub async fn handle_crawl(matches: &ArgMatches) -> Result<()> {
    let quiet = matches.get_flag("quiet");
    let format = matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    let mut options = build_crawl_options(matches)?;
    options.show_progress_bars = !quiet && format == ReportFormat::Text;

    if options.show_progress_bars {
        print_crawl_config(&options);
    }
    create_output_dir(&options.output_dir)?;

    let result_callback: Option<web2md_core::CrawlResultCallback> =
        if options.show_progress_bars {
            Some(Arc::new(|result: PageResult| print_page_result(&result)))
        } else {
            None
        };

    let summary = execute_crawl(options, None, result_callback)
        .await
        .context("crawl aborted")?;

    match format {
        ReportFormat::Text => {
            if !quiet {
                println!("\n{} Crawl complete!\n", "✓".green().bold());
            }
            print!("{}", generate_text_report(&summary));
        }
        ReportFormat::Json => {
            println!("{}", generate_json_report(&summary)?);
        }
    }

    Ok(())
}
