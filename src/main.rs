//! tgrank - Telegram group ranking CLI
//!
//! Main entry point for the tgrank command-line tool.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use tgrank::pipeline::{media_rng, run_date};
use tgrank::report::{HISTORY_FILE, INDEX_FILE, snapshot};
use tgrank::*;

/// Error whose terminal rendering is already complete.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Rendered(String);

fn main() -> ExitCode {
    let cli = Cli::parse();

    let colors = std::env::var_os("NO_COLOR").is_none();
    logging::init_cli_logging(cli.quiet, cli.verbose, colors);
    if !colors {
        colored::control::set_override(false);
    }

    match dispatch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if !config.output.colors {
        colored::control::set_override(false);
    }
    let quiet = cli.quiet || config.output.quiet;

    match &cli.command {
        Commands::Run(args) => {
            apply_paths(
                &mut config,
                args.archive.clone(),
                args.output.clone(),
                args.photos.clone(),
            );
            apply_seed(&mut config, args.seed);
            cmd_run(cli, &config, quiet)
        }
        Commands::Rank(args) => {
            apply_paths(&mut config, args.archive.clone(), None, None);
            apply_seed(&mut config, args.seed);
            cmd_rank(cli, &config, args)
        }
        Commands::History(args) => {
            apply_paths(&mut config, None, args.output.clone(), None);
            cmd_history(cli, &config, args)
        }
        Commands::Config(args) => cmd_config(&config, args),
        Commands::Completions(args) => cmd_completions(args.clone()),
    }
}

fn render_error(err: &anyhow::Error) -> String {
    if let Some(rendered) = err.downcast_ref::<Rendered>() {
        return rendered.0.clone();
    }
    if let Some(rank_err) = err.downcast_ref::<RankError>() {
        let suggestions: Vec<&str> = rank_err.suggestion().into_iter().collect();
        return format_error(&rank_err.to_string(), &suggestions);
    }
    format_error(&format!("{err:#}"), &[])
}

fn apply_paths(
    config: &mut Config,
    archive: Option<PathBuf>,
    output: Option<PathBuf>,
    photos: Option<PathBuf>,
) {
    if let Some(archive) = archive {
        config.paths.archive = archive;
    }
    if let Some(output) = output {
        config.paths.output = output;
    }
    if let Some(photos) = photos {
        config.paths.photos = photos;
    }
}

fn apply_seed(config: &mut Config, seed: Option<u64>) {
    if seed.is_some() {
        config.media.seed = seed;
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn cmd_run(cli: &Cli, config: &Config, quiet: bool) -> Result<()> {
    let show_text = !quiet && cli.format == OutputFormat::Text;
    if show_text {
        println!("{}", "Ranking Telegram groups...".bold().cyan());
        println!("  Archive: {}", config.paths.archive.display());
        println!("  Output: {}", config.paths.output.display());
        println!();
    }

    let summary = Pipeline::new(config, now())
        .with_progress(show_text)
        .run()?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&summary)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Csv => {
            println!("run_date,groups,pages_written,history_rows_appended,output_dir");
            println!(
                "{},{},{},{},{}",
                summary.run_date,
                summary.groups,
                summary.pages_written,
                summary.history_rows_appended,
                summary.output_dir.display()
            );
        }
        OutputFormat::Text if !quiet => print_run_summary(&summary),
        OutputFormat::Text => {}
    }
    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    println!(
        "  {} Ranked {} groups ({})",
        "✓".green(),
        summary.groups.to_string().cyan(),
        summary.run_date
    );
    println!("  {} Wrote {} group pages", "✓".green(), summary.pages_written);
    println!(
        "  {} Appended {} history rows",
        "✓".green(),
        summary.history_rows_appended
    );
    if summary.history_rows_skipped > 0 {
        println!(
            "  {} Skipped {} unreadable history rows",
            "!".yellow(),
            summary.history_rows_skipped
        );
    }
    println!("  {} Copied {} photos", "✓".green(), summary.photos_copied);
    if let Some((name, score)) = &summary.leader {
        println!("\n  Leader: {} ({score:.2})", name.bold());
    }
    println!(
        "\n  Report: {}",
        summary.output_dir.join(INDEX_FILE).display().to_string().bold()
    );
}

fn cmd_rank(cli: &Cli, config: &Config, args: &cli::RankArgs) -> Result<()> {
    let export = ArchiveParser::new(&config.paths.archive).parse()?;
    let now = now();
    let mut locator = DirectoryMediaLocator::new(
        &config.paths.photos,
        config.media.extensions.clone(),
        media_rng(config.media.seed),
    );
    let ranking = compute_ranking(&export, config, now, &mut locator, HistoryStore::new())?;

    let limit = args.top.unwrap_or(usize::MAX);
    let groups = &ranking.groups[..ranking.groups.len().min(limit)];
    debug!(shown = groups.len(), total = ranking.groups.len(), "Printing ranking");

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(groups)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(groups)?),
        OutputFormat::Csv => {
            let stdout = io::stdout();
            snapshot::write_snapshot_to(stdout.lock(), &run_date(now), groups, &config.hashtags)?;
        }
        OutputFormat::Text => {
            if groups.is_empty() {
                println!("{}", "No eligible groups found.".yellow());
                return Ok(());
            }
            println!(
                "{} ({} groups, {})\n",
                "Ranking".bold().cyan(),
                ranking.groups.len(),
                run_date(now)
            );
            for ranked in groups {
                print_ranked(ranked);
            }
        }
    }
    Ok(())
}

fn print_ranked(ranked: &RankedGroup) {
    let metrics = ranked.metrics();
    let breakdown = &ranked.group.breakdown;
    println!(
        "{:>4}. {} {}",
        ranked.rank.to_string().dimmed(),
        truncate(&metrics.group_name, 40).bold(),
        format!("({:.2})", ranked.group.score).green()
    );
    println!(
        "      {} messages | {} titles | last activity {}",
        format_number_u64(metrics.total_messages),
        metrics.titled_items.len(),
        report::html::format_age(metrics.most_recent_age_days)
    );
    println!(
        "      {}",
        format!(
            "hashtag {:.2} + volume {:.2} + recency {:.2}",
            breakdown.hashtag, breakdown.volume, breakdown.recency
        )
        .dimmed()
    );
}

fn cmd_history(cli: &Cli, config: &Config, args: &cli::HistoryArgs) -> Result<()> {
    let path = config.paths.output.join(HISTORY_FILE);
    let store = HistoryStore::load(&path)?;
    let names = store.group_names();

    let name = names
        .iter()
        .find(|n| **n == args.group)
        .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(&args.group)))
        .copied();
    let Some(name) = name else {
        if names.is_empty() {
            return Err(RankError::unknown_group(&args.group).into());
        }
        return Err(Rendered(format_unknown_group(&args.group, &names)).into());
    };
    let series = store.series(name);

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(series)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(series)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(io::stdout().lock());
            writer.write_record(["date", "rank"])?;
            for point in series {
                writer.write_record([point.date.as_str(), point.rank.to_string().as_str()])?;
            }
            writer.flush()?;
        }
        OutputFormat::Text => {
            println!("{}", format!("Rank history for {name}").bold().cyan());
            println!("{}", "─".repeat(HEADER_DIVIDER_WIDTH).dimmed());
            for point in series {
                println!("  {:<12} {:>4}", point.date, point.rank);
            }
            if let (Some(best), Some(last)) =
                (series.iter().map(|p| p.rank).min(), series.last())
            {
                println!(
                    "\n  {} entries | best {} | latest {}",
                    series.len(),
                    best.to_string().green(),
                    last.rank
                );
            }
        }
    }
    Ok(())
}

fn cmd_config(config: &Config, args: &cli::ConfigArgs) -> Result<()> {
    let user_path = Config::user_config_path();

    if args.init {
        let path = user_path
            .clone()
            .context("Could not determine the user config directory")?;
        if path.exists() {
            println!(
                "{} Config already exists at {}",
                "!".yellow(),
                path.display()
            );
        } else {
            Config::default().save(&path)?;
            println!("{} Wrote default config to {}", "✓".green(), path.display());
        }
    }

    if args.show || !args.init {
        if !args.show {
            match &user_path {
                Some(path) if path.exists() => println!("# {}", path.display()),
                Some(path) => println!("# {} (not present, showing defaults)", path.display()),
                None => println!("# no user config directory"),
            }
        }
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}

fn cmd_completions(args: cli::CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "tgrank", &mut io::stdout());
    Ok(())
}
