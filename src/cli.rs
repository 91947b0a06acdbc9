use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "fengshui",
    version,
    about = "Scrape, cross-check and export Vietnamese lunar calendar day data"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch, parse, cross-check and store days.
    Scrape {
        #[arg(long, conflicts_with = "date", required_unless_present = "date")]
        year: Option<i32>,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=12))]
        start_month: u32,
        #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u32).range(1..=12))]
        end_month: u32,
        /// Single day, YYYY-MM-DD.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Read pages from `<dir>/<source>/<date>.html` instead of the network.
        #[arg(long)]
        from_cache: Option<PathBuf>,
        #[arg(long)]
        save_cache: bool,
        #[arg(long)]
        no_secondary: bool,
        #[arg(long)]
        no_reference: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Re-run the cross-check over stored source records.
    CrossCheck {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check stored lunar fields against the calculated reference.
    Validate {
        #[arg(long)]
        year: i32,
        /// Treat month can-chi mismatches as errors.
        #[arg(long)]
        strict: bool,
        /// Validate merged days instead of raw primary records.
        #[arg(long)]
        merged: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the compact year file for the app.
    Export {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Look up stored days.
    Days {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Lunar YEAR-MONTH, e.g. 2024-12.
        #[arg(long)]
        lunar_month: Option<String>,
        /// Day can chi, e.g. "Kỷ Mùi".
        #[arg(long)]
        can_chi: Option<String>,
        /// Best days of this year, highest score first.
        #[arg(long, value_name = "YEAR")]
        good: Option<i32>,
        #[arg(long, default_value_t = 70)]
        min_score: u8,
        /// Keep only days recommended for this catalog activity id.
        #[arg(long)]
        activity: Option<String>,
        #[arg(long)]
        delete: bool,
        /// Write the full record of --date as JSON into this directory.
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,
    },
    /// List the activity catalog.
    Activities {
        #[arg(long)]
        category: Option<String>,
    },
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("{}: {}", report.command, if report.ok { "ok" } else { "failed" });
    for line in &report.details {
        println!("  {line}");
    }
    for line in &report.issues {
        println!("  issue: {line}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let report = match &cli.command {
        Command::Scrape {
            year,
            start_month,
            end_month,
            date,
            from_cache,
            save_cache,
            no_secondary,
            no_reference,
            dry_run,
        } => commands::scrape::run(&commands::scrape::ScrapeOptions {
            year: *year,
            start_month: *start_month,
            end_month: *end_month,
            date: *date,
            from_cache: from_cache.clone(),
            save_cache: *save_cache,
            no_secondary: *no_secondary,
            no_reference: *no_reference,
            dry_run: *dry_run,
        })?,
        Command::CrossCheck { year, output } => {
            commands::cross_check::run(&commands::cross_check::CrossCheckOptions {
                year: *year,
                output: output.clone(),
            })?
        }
        Command::Validate {
            year,
            strict,
            merged,
            output,
        } => commands::validate::run(&commands::validate::ValidateOptions {
            year: *year,
            strict: *strict,
            merged: *merged,
            output: output.clone(),
        })?,
        Command::Export { year, output } => {
            commands::export::run(&commands::export::ExportOptions {
                year: *year,
                output: output.clone(),
            })?
        }
        Command::Days {
            date,
            lunar_month,
            can_chi,
            good,
            min_score,
            activity,
            delete,
            export,
        } => commands::days::run(&commands::days::DaysOptions {
            date: *date,
            lunar_month: lunar_month.clone(),
            can_chi: can_chi.clone(),
            good_in_year: *good,
            min_score: *min_score,
            activity: activity.clone(),
            delete: *delete,
            export_dir: export.clone(),
        })?,
        Command::Activities { category } => commands::activities::run(category.as_deref())?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}
