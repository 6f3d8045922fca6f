mod course;
mod db;
mod error;
mod parser;
mod settings;
mod source;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use course::Course;
use settings::{OutputFormat, Settings};

#[derive(Parser)]
#[command(
    name = "course_catalog",
    about = "Scraper for university course catalogs.",
    after_help = "Settings can also come from CATALOG_FORMAT, CATALOG_DB and CATALOG_LOG."
)]
struct Cli {
    /// File path or URL of the course catalog to scrape
    page: String,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable verbose output. -v enables debug output, -vv enables trace output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format for the course list
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Also store the courses in this SQLite database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Print courses as read from the page, without subject/number/prerequisite extraction
    #[arg(long)]
    raw: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    init_tracing(&log_directive(&cli, &settings));

    run(&cli, &settings)
}

fn init_tracing(directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(directive)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn log_directive(cli: &Cli, settings: &Settings) -> String {
    if cli.quiet {
        return "error".to_string();
    }
    match cli.verbose {
        0 => settings.log.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    let t0 = Instant::now();

    let html = source::load_page(&cli.page)?;
    let mut courses = parser::parse_catalog(&html)?;
    if !cli.raw {
        parser::enrich_all(&mut courses)?;
    }

    if let Some(path) = cli.db.as_ref().or(settings.db.as_ref()) {
        let conn = db::connect(path)?;
        db::init_schema(&conn)?;
        let saved = db::save_courses(&conn, &courses)?;
        info!("Saved {} courses to {}", saved, path.display());
    }

    match cli.format.unwrap_or(settings.format) {
        OutputFormat::Text => print_courses(&courses),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&courses)?),
    }

    info!("Parsed {} courses in {}", courses.len(), format_duration(t0.elapsed()));
    Ok(())
}

fn print_courses(courses: &[Course]) {
    for c in courses {
        let levels = c
            .levels
            .iter()
            .map(|l| l.name())
            .collect::<Vec<_>>()
            .join(", ");
        println!("{} [{}]", c, levels);
        if !c.prereqs.is_empty() {
            let prereqs = c
                .prereqs
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            println!("    prereqs: {}", prereqs);
        }
    }
    println!("\n{} courses", courses.len());
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
