use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Read-only membership test over lower-cased domain names.
pub trait DomainSet: Send + Sync {
    fn contains(&self, domain: &str) -> bool;
}

/// In-memory domain list, loaded once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainList {
    domains: HashSet<String>,
}

impl DomainList {
    pub fn new() -> Self {
        Self::default()
    }

    /// One domain per line; blank lines and `#` comments are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut domains = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            let entry = line.split('#').next().unwrap_or_default().trim();
            if !entry.is_empty() {
                domains.insert(normalize(entry));
            }
        }
        Ok(Self { domains })
    }

    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn into_shared(self) -> Arc<dyn DomainSet> {
        Arc::new(self)
    }
}

impl<S: AsRef<str>> FromIterator<S> for DomainList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            domains: iter
                .into_iter()
                .map(|d| normalize(d.as_ref()))
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }
}

impl DomainSet for DomainList {
    fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain) || self.domains.contains(&normalize(domain))
    }
}

fn normalize(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// The three lists the classifier consults.
#[derive(Clone)]
pub struct DomainLists {
    pub disposable: Arc<dyn DomainSet>,
    pub blacklisted: Arc<dyn DomainSet>,
    pub whitelisted: Arc<dyn DomainSet>,
}

impl Default for DomainLists {
    fn default() -> Self {
        Self {
            disposable: DomainList::new().into_shared(),
            blacklisted: DomainList::new().into_shared(),
            whitelisted: DomainList::new().into_shared(),
        }
    }
}
