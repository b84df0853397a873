use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mailprobe::{BlacklistPolicy, ClassifierOptions, DomainList, DomainLists, ProbeOptions};

#[derive(Parser)]
#[command(name = "mailprobe-cli", version, about = "SMTP deliverability probing without sending mail")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// read addresses from stdin (one per line)
    #[arg(long)]
    pub stdin: bool,

    /// write report to file (JSON/NDJSON/CSV per --format)
    #[arg(long)]
    pub out: Option<String>,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human")]
    pub format: String,

    /// name sent with EHLO (default: the probed MX host)
    #[arg(long)]
    pub helo: Option<String>,

    /// MAIL FROM envelope (default: validator@<mx-host>)
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// SMTP port
    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// connect/read/write timeout (ms)
    #[arg(long = "timeout", default_value_t = 5_000)]
    pub timeout_ms: u64,

    /// DNS query timeout (ms)
    #[arg(long = "dns-timeout", default_value_t = 5_000)]
    pub dns_timeout_ms: u64,

    /// never upgrade with STARTTLS
    #[arg(long)]
    pub no_starttls: bool,

    /// verify certificates and host names after STARTTLS
    #[arg(long)]
    pub verify_certs: bool,

    /// disposable domains, one per line
    #[arg(long, value_name = "FILE")]
    pub disposable: Option<PathBuf>,

    /// blacklisted domains, one per line
    #[arg(long, value_name = "FILE")]
    pub blacklist: Option<PathBuf>,

    /// domains exempt from the blacklist, one per line
    #[arg(long, value_name = "FILE")]
    pub whitelist: Option<PathBuf>,

    /// do not short-circuit blacklisted domains; probe them like any other
    #[arg(long)]
    pub ignore_blacklist: bool,

    /// parallel probes for --stdin batches (1..=64)
    #[arg(long, default_value_t = 8)]
    pub workers: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// categorize one address
    Categorize { email: String },
    /// print the ordered mail exchangers of a domain
    Mx { domain: String },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            helo_name: self.helo.clone(),
            mail_from: self.mail_from.clone(),
            port: self.port,
            timeout_ms: self.timeout_ms,
            starttls: !self.no_starttls,
            accept_invalid_certs: !self.verify_certs,
        }
    }

    pub fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions {
            probe: self.probe_options(),
            dns_timeout_ms: self.dns_timeout_ms,
            blacklist_policy: if self.ignore_blacklist {
                BlacklistPolicy::Ignore
            } else {
                BlacklistPolicy::ShortCircuit
            },
        }
    }

    pub fn domain_lists(&self) -> Result<DomainLists> {
        Ok(DomainLists {
            disposable: load_list(self.disposable.as_deref())?.into_shared(),
            blacklisted: load_list(self.blacklist.as_deref())?.into_shared(),
            whitelisted: load_list(self.whitelist.as_deref())?.into_shared(),
        })
    }
}

fn load_list(path: Option<&Path>) -> Result<DomainList> {
    match path {
        Some(path) => DomainList::from_file(path)
            .with_context(|| format!("read domain list {}", path.display())),
        None => Ok(DomainList::new()),
    }
}
