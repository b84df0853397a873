#[path = "mailprobe-cli/args.rs"]
mod args;
#[path = "mailprobe-cli/output.rs"]
mod output;

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use mailprobe::{EmailClassifier, MxResolver};
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let emails: Vec<String> = if cli.stdin {
        let mut emails = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let email = line.trim();
            if !email.is_empty() {
                emails.push(email.to_string());
            }
        }
        emails
    } else {
        match &cli.cmd {
            Some(Commands::Categorize { email }) => vec![email.clone()],
            Some(Commands::Mx { domain }) => return run_mx(domain, &cli),
            None => {
                Cli::clap_command().print_help()?;
                println!();
                return Ok(());
            }
        }
    };

    let classifier = EmailClassifier::from_options(&cli.classifier_options(), cli.domain_lists()?)
        .context("initialize classifier")?;
    let rows = classifier.categorize_batch(&emails, cli.workers);
    output::write_reports(&rows, &cli)?;

    // exit codes: 0 all valid, 2 at least one other category, 1 fatal
    if output::any_unconfirmed(&rows) {
        std::process::exit(2);
    }
    Ok(())
}

fn run_mx(domain: &str, cli: &Cli) -> Result<()> {
    let resolver = MxResolver::from_system_conf(cli.classifier_options().dns_timeout())
        .context("initialize resolver")?;
    let candidates = resolver
        .resolve(&domain.trim().to_ascii_lowercase())
        .with_context(|| format!("resolve {domain}"))?;
    output::write_mx(domain, &candidates, cli)
}
