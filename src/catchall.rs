//! Catch-all detection.
//!
//! A domain that accepts a random, almost certainly unassigned mailbox will
//! accept anything, so a positive `RCPT TO` for a real address tells us
//! nothing there.

use rand::{Rng, distributions::Alphanumeric};
use thiserror::Error;

use crate::mx::MxCandidate;
use crate::smtp::{Prober, RecipientStatus};

/// Length of the generated local part.
pub const SYNTHETIC_LOCAL_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CatchAllError {
    #[error("catch-all probe against {host} failed: {message}")]
    Transport { host: String, message: String },
}

/// Fresh random local part; every call yields a different one so repeated
/// probes do not hit server-side caches.
pub fn synthetic_local_part() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SYNTHETIC_LOCAL_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Probes the preferred candidate with a synthetic address at `domain`.
///
/// Returns `Ok(true)` when the server accepts it, `Ok(false)` for any other
/// reply or when there is no candidate, and an error when no reply could be
/// obtained at all.
pub fn detect<P>(prober: &P, candidates: &[MxCandidate], domain: &str) -> Result<bool, CatchAllError>
where
    P: Prober + ?Sized,
{
    let Some(primary) = candidates.first() else {
        return Ok(false);
    };
    let probe_address = format!("{}@{}", synthetic_local_part(), domain);
    let result = prober.probe(&primary.host, &probe_address);

    if let Some(message) = result.error_message() {
        return Err(CatchAllError::Transport {
            host: primary.host.clone(),
            message: message.to_string(),
        });
    }

    let catch_all = result.status() == RecipientStatus::Valid;
    tracing::debug!(domain, host = %primary.host, probe_address, catch_all, "catch-all probe");
    Ok(catch_all)
}

/// Like [`detect`], but reports transport failures as `false`. Callers that
/// need to tell "not catch-all" from "unknown" should use [`detect`].
pub fn is_catch_all<P>(prober: &P, candidates: &[MxCandidate], domain: &str) -> bool
where
    P: Prober + ?Sized,
{
    detect(prober, candidates, domain).unwrap_or(false)
}
