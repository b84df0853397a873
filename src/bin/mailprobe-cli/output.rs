#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use anyhow::Context;
use anyhow::{Result, bail};

use crate::args::Cli;
use mailprobe::{CategorizedEmail, Category, MxCandidate};

pub fn write_reports(rows: &[CategorizedEmail], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(rows),
        "json" => write_json(rows, cli),
        "ndjson" => write_ndjson(rows, cli),
        "csv" => write_csv(rows, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

/// Exit status 2 is reserved for batches with at least one address that is
/// not confirmed deliverable.
pub fn any_unconfirmed(rows: &[CategorizedEmail]) -> bool {
    rows.iter().any(|row| row.category != Category::Valid)
}

pub fn write_mx(domain: &str, candidates: &[MxCandidate], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => {
            if candidates.is_empty() {
                println!("{domain}: no mail exchanger");
            }
            for candidate in candidates {
                println!("{:>5} {}", candidate.priority, candidate.host);
            }
            Ok(())
        }
        "json" => write_mx_json(candidates),
        other => bail!("unknown --format '{other}' for mx, use: human|json"),
    }
}

#[cfg(feature = "with-serde")]
fn write_mx_json(candidates: &[MxCandidate]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(candidates)?);
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_mx_json(_: &[MxCandidate]) -> Result<()> {
    bail!("format=json requires the 'with-serde' feature")
}

fn write_human(rows: &[CategorizedEmail]) -> Result<()> {
    for row in rows {
        println!("[{}] {}", row.category, row.email);
        if let Some(probe) = &row.probe {
            println!(
                "        smtp: {} {} via {} at {}",
                probe.smtp_code(),
                probe.diagnostic_tag(),
                probe.mx_host(),
                probe.timestamp_iso()
            );
            if let Some(error) = probe.error_message() {
                println!("        error: {error}");
            }
        }
    }
    Ok(())
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[CategorizedEmail], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[CategorizedEmail], _: &Cli) -> Result<()> {
    bail!("format=json requires the 'with-serde' feature")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(rows: &[CategorizedEmail], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut buf = Vec::new();
        for row in rows {
            let line = serde_json::to_string(row)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[CategorizedEmail], _: &Cli) -> Result<()> {
    bail!("format=ndjson requires the 'with-serde' feature")
}

#[cfg(feature = "with-csv")]
const CSV_HEADER: [&str; 9] = [
    "email",
    "category",
    "catch_all",
    "status",
    "smtp_code",
    "diagnostic_tag",
    "mx_host",
    "timestamp",
    "error",
];

#[cfg(feature = "with-csv")]
fn write_csv(rows: &[CategorizedEmail], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[CategorizedEmail], _: &Cli) -> Result<()> {
    bail!("format=csv requires the 'with-csv' feature")
}

#[cfg(feature = "with-csv")]
fn csv_record(row: &CategorizedEmail) -> Vec<String> {
    let mut record = vec![
        row.email.clone(),
        row.category.to_string(),
        bool_opt_str(row.catch_all).to_string(),
    ];
    match &row.probe {
        Some(probe) => record.extend([
            probe.status().to_string(),
            probe.smtp_code().to_string(),
            probe.diagnostic_tag().to_string(),
            probe.mx_host().to_string(),
            probe.timestamp_iso(),
            probe.error_message().unwrap_or("").to_string(),
        ]),
        None => record.extend(std::iter::repeat_n(String::new(), 6)),
    }
    record
}

#[cfg(feature = "with-csv")]
fn bool_opt_str(opt: Option<bool>) -> &'static str {
    match opt {
        Some(true) => "true",
        Some(false) => "false",
        None => "",
    }
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {tmp}"))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
