use anyhow::Context;
use anyhow::Result;
use calibration_alerts::notify::SmtpMailer;
use calibration_alerts::Config;
use calibration_alerts::Mailer;
use chrono::Local;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Mails the instruments whose calibration is overdue or due soon.
#[derive(Parser, Debug)]
#[command(name = "calibration-alerts", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Workbook path or URL, overrides the configured source
    #[arg(short, long, env = "EXCEL_URL")]
    source: Option<String>,

    /// Reference date as YYYY-MM-DD, defaults to the local date
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Days ahead that count as upcoming, overrides the configured window
    #[arg(long)]
    threshold: Option<i64>,

    /// Print the HTML report instead of sending it
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(source) = cli.source {
        config.source = Some(source);
    }
    if let Some(threshold) = cli.threshold {
        config.threshold_days = threshold;
    }
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    info!(%today, threshold = config.threshold_days, "evaluating calibrations");

    let (_, notification) = calibration_alerts::prepare(&config, today).context("Failed to build the alert report")?;

    if cli.dry_run {
        println!("{}", notification.html);
        return Ok(());
    }

    let mailer = SmtpMailer::from_settings(&config.mail).context("Failed to configure the SMTP transport")?;
    mailer.send(&notification).context("Failed to send the alert mail")?;
    Ok(())
}
