use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use statement_mailer::clock::SystemClock;
use statement_mailer::config::{default_config_path, Config};
use statement_mailer::credentials::{Credentials, SmtpCredentials};
use statement_mailer::notify::{parse_recipients, Notifier, SmtpMailer, SmtpTarget};
use statement_mailer::pipeline::{self, RunContext};
use statement_mailer::portal::{AgePolicy, Portal, PortalSession};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "statement-mailer")]
#[command(about = "Download Qander account statements and mail them on")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How old a statement can be before it is skipped (days, 0 = no limit)
    #[arg(long, default_value_t = 0)]
    days: u32,

    /// Download every listed statement, ignoring --days
    #[arg(long)]
    all: bool,

    /// Qander username to log in with
    #[arg(long, env = "QANDER_USER")]
    user: String,

    /// Qander password to log in with
    #[arg(long, env = "QANDER_PASS", hide_env_values = true)]
    pass: String,

    /// SMTP server to send the message through (e.g. smtp.iaf.nl:587)
    #[arg(long)]
    smtp: String,

    /// Optional SMTP username
    #[arg(long, alias = "smtp_user", env = "SMTP_USER")]
    smtp_user: Option<String>,

    /// Optional SMTP password
    #[arg(long, alias = "smtp_pass", env = "SMTP_PASS", hide_env_values = true)]
    smtp_pass: Option<String>,

    /// Comma separated list of email recipients
    #[arg(long, alias = "smtp_to")]
    smtp_to: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .init();
    }
}

/// `--all` lifts the age cutoff the same way `--days 0` does.
fn age_policy(cli: &Cli) -> AgePolicy {
    if cli.all {
        AgePolicy::unlimited()
    } else {
        AgePolicy::max_days(cli.days)
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    let recipients = parse_recipients(&cli.smtp_to);
    if recipients.is_empty() {
        anyhow::bail!("--smtp-to does not name any recipient");
    }

    // Resolve the relay before touching the portal, so a bad address fails early.
    let target = SmtpTarget::parse(&cli.smtp)?;
    let smtp_credentials = SmtpCredentials::from_parts(cli.smtp_user.clone(), cli.smtp_pass.clone());
    let mailer = SmtpMailer::new(
        target,
        smtp_credentials.as_ref(),
        config.mail.timeout,
    )?;
    let notifier = Notifier::new(config.mail.clone(), recipients, Box::new(mailer));

    let policy = age_policy(&cli);
    let credentials = Credentials::new(cli.user, cli.pass);
    let clock = SystemClock;
    let ctx = RunContext {
        credentials: &credentials,
        policy,
        clock: &clock,
        notifier: &notifier,
    };

    let portal = Portal::new(PortalSession::new(&config.portal)?);
    let report = pipeline::run(portal, &ctx).await?;

    tracing::info!(
        included = report.included_count(),
        mailed = report.mailed,
        "Run complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
