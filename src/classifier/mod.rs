//! Address categorization: syntax, domain lists, MX resolution, catch-all
//! detection and the decisive `RCPT TO` probe, in that order.

mod category;
mod domains;
mod error;
mod options;

pub use category::Category;
pub use domains::{DomainList, DomainLists, DomainSet};
pub use error::ClassifierError;
pub use options::{BlacklistPolicy, ClassifierOptions};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::address::{extract_domain, parse_address};
use crate::catchall;
use crate::mx::{DnsLookup, MxResolver, SystemResolver};
use crate::smtp::{Prober, SmtpProber, ValidationResult};

/// Upper bound on batch worker threads.
pub const MAX_WORKERS: usize = 64;

/// A category together with what led to it.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct CategorizedEmail {
    pub email: String,
    pub category: Category,
    /// `None` when classification stopped before the catch-all probe.
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub catch_all: Option<bool>,
    /// Result of the decisive probe, when one was made.
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub probe: Option<ValidationResult>,
}

impl CategorizedEmail {
    fn early(email: &str, category: Category) -> Self {
        Self {
            email: email.to_string(),
            category,
            catch_all: None,
            probe: None,
        }
    }
}

/// Composes the resolver, the prober and the domain lists.
///
/// Holds no per-address state; a single instance may categorize from many
/// threads at once.
pub struct EmailClassifier<L = SystemResolver, P = SmtpProber> {
    resolver: MxResolver<L>,
    prober: P,
    lists: DomainLists,
    blacklist_policy: BlacklistPolicy,
}

impl EmailClassifier {
    /// System resolver plus a network prober, both configured from `options`.
    pub fn from_options(
        options: &ClassifierOptions,
        lists: DomainLists,
    ) -> Result<Self, ClassifierError> {
        let resolver = MxResolver::from_system_conf(options.dns_timeout())?;
        let prober = SmtpProber::new(options.probe.clone())?;
        Ok(Self::new(resolver, prober, lists).with_blacklist_policy(options.blacklist_policy))
    }
}

impl<L, P> EmailClassifier<L, P>
where
    L: DnsLookup,
    P: Prober,
{
    pub fn new(resolver: MxResolver<L>, prober: P, lists: DomainLists) -> Self {
        Self {
            resolver,
            prober,
            lists,
            blacklist_policy: BlacklistPolicy::default(),
        }
    }

    pub fn with_blacklist_policy(mut self, policy: BlacklistPolicy) -> Self {
        self.blacklist_policy = policy;
        self
    }

    pub fn categorize(&self, email: &str) -> Category {
        self.categorize_detailed(email).category
    }

    pub fn categorize_detailed(&self, email: &str) -> CategorizedEmail {
        let outcome = self.run(email);
        tracing::info!(email, category = %outcome.category, "categorized");
        outcome
    }

    fn run(&self, email: &str) -> CategorizedEmail {
        if let Err(err) = parse_address(email) {
            tracing::debug!(email, %err, "rejected by syntax check");
            return CategorizedEmail::early(email, Category::Invalid);
        }
        let Some(domain) = extract_domain(email) else {
            return CategorizedEmail::early(email, Category::Invalid);
        };

        if self.lists.disposable.contains(&domain) {
            return CategorizedEmail::early(email, Category::Disposable);
        }
        if self.blacklist_policy == BlacklistPolicy::ShortCircuit
            && self.lists.blacklisted.contains(&domain)
            && !self.lists.whitelisted.contains(&domain)
        {
            return CategorizedEmail::early(email, Category::Blocklisted);
        }

        let candidates = match self.resolver.resolve(&domain) {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!(domain, %err, "MX resolution failed");
                return CategorizedEmail::early(email, Category::Unknown);
            }
        };
        let Some(primary) = candidates.first() else {
            tracing::debug!(domain, "no mail exchanger");
            return CategorizedEmail::early(email, Category::Invalid);
        };

        match catchall::detect(&self.prober, &candidates, &domain) {
            Ok(true) => {
                return CategorizedEmail {
                    catch_all: Some(true),
                    ..CategorizedEmail::early(email, Category::CatchAll)
                };
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(domain, %err, "catch-all probe failed");
                return CategorizedEmail::early(email, Category::Unknown);
            }
        }

        let result = self.prober.probe(&primary.host, email);
        let category = if result.is_transport_failure() {
            Category::Unknown
        } else {
            Category::from_result(&result)
        };
        CategorizedEmail {
            email: email.to_string(),
            category,
            catch_all: Some(false),
            probe: Some(result),
        }
    }
}

impl<L, P> EmailClassifier<L, P>
where
    L: DnsLookup + Sync,
    P: Prober,
{
    /// Categorizes `emails` on up to `workers` threads (clamped to
    /// `1..=MAX_WORKERS`). Output order matches input order.
    pub fn categorize_batch<S>(&self, emails: &[S], workers: usize) -> Vec<CategorizedEmail>
    where
        S: AsRef<str> + Sync,
    {
        let workers = workers.clamp(1, MAX_WORKERS).min(emails.len().max(1));
        let cursor = AtomicUsize::new(0);
        let mut slots: Vec<Option<CategorizedEmail>> = emails.iter().map(|_| None).collect();

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let index = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(email) = emails.get(index) else {
                                break;
                            };
                            done.push((index, self.categorize_detailed(email.as_ref())));
                        }
                        done
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (index, outcome) in done {
                            slots[index] = Some(outcome);
                        }
                    }
                    Err(_) => tracing::error!("batch worker panicked"),
                }
            }
        });

        slots
            .into_iter()
            .zip(emails)
            .map(|(slot, email)| {
                slot.unwrap_or_else(|| CategorizedEmail::early(email.as_ref(), Category::Unknown))
            })
            .collect()
    }
}
