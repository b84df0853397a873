use std::io;
use std::sync::Mutex;
use std::time::Duration;

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    system_conf::read_system_conf,
};

use super::{Error, MxCandidate};

/// The two DNS questions the resolver needs answered.
///
/// Mail-exchanger answers are returned in their textual `"<preference> <host>"`
/// form so that record parsing stays on this side of the seam. An empty
/// vector means the name has no records of that type; only transport
/// failures are errors.
pub trait DnsLookup {
    fn mx_records(&self, domain: &str) -> Result<Vec<String>, ResolveError>;
    fn address_records(&self, domain: &str) -> Result<Vec<String>, ResolveError>;
}

impl DnsLookup for Resolver {
    fn mx_records(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if should_treat_as_empty(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        Ok(lookup
            .iter()
            .map(|mx| format!("{} {}", mx.preference(), mx.exchange().to_utf8()))
            .collect())
    }

    fn address_records(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        let lookup = match Resolver::ipv4_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if should_treat_as_empty(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        Ok(lookup.iter().map(|a| a.to_string()).collect())
    }
}

fn should_treat_as_empty(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

type Build<T> = Box<dyn Fn() -> Result<T, ResolveError> + Send + Sync>;

/// Hands each caller its own instance, building a new one when all are busy.
pub(crate) struct Pool<T> {
    idle: Mutex<Vec<T>>,
    build: Build<T>,
}

impl<T> Pool<T> {
    pub(crate) fn new<F>(build: F) -> Self
    where
        F: Fn() -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::new()),
            build: Box::new(build),
        }
    }

    pub(crate) fn with<R>(
        &self,
        f: impl FnOnce(&T) -> Result<R, ResolveError>,
    ) -> Result<R, ResolveError> {
        let item = self.checkout()?;
        let out = f(&item);
        self.checkin(item);
        out
    }

    fn checkout(&self) -> Result<T, ResolveError> {
        let idle = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        match idle {
            Some(item) => Ok(item),
            None => (self.build)(),
        }
    }

    fn checkin(&self, item: T) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(item);
        }
    }
}

/// System-configured DNS that can be shared between threads.
///
/// A sync [`Resolver`] serializes its queries on one runtime, so a single
/// slow answer would stall every other caller. Each concurrent lookup here
/// gets a resolver of its own.
pub struct SystemResolver {
    pool: Pool<Resolver>,
}

impl SystemResolver {
    /// Reads the system configuration and bounds every query by `timeout`.
    pub fn from_system_conf(timeout: Duration) -> Result<Self, Error> {
        let (config, mut opts) = read_system_conf()
            .map_err(|err| Error::resolver_init(io::Error::other(err.to_string())))?;
        opts.timeout = timeout;
        let first = Resolver::new(config.clone(), opts.clone()).map_err(Error::resolver_init)?;
        let pool = Pool::new(move || {
            Resolver::new(config.clone(), opts.clone()).map_err(ResolveError::from)
        });
        pool.checkin(first);
        Ok(Self { pool })
    }
}

impl DnsLookup for SystemResolver {
    fn mx_records(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        self.pool.with(|resolver| resolver.mx_records(domain))
    }

    fn address_records(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        self.pool.with(|resolver| resolver.address_records(domain))
    }
}

/// Ordered mail-exchanger resolution over any [`DnsLookup`].
pub struct MxResolver<L = SystemResolver> {
    lookup: L,
}

impl MxResolver<SystemResolver> {
    /// Builds a resolver from the system configuration, bounding every query
    /// by `timeout`.
    pub fn from_system_conf(timeout: Duration) -> Result<Self, Error> {
        SystemResolver::from_system_conf(timeout).map(Self::new)
    }
}

impl<L: DnsLookup> MxResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, domain: &str) -> Result<Vec<MxCandidate>, Error> {
        resolve_with(&self.lookup, domain)
    }
}

/// Resolves `domain` to candidates sorted by ascending priority.
///
/// Falls back to address records (priority 0, resolver order) when the domain
/// publishes no MX. An empty result is not an error.
pub fn resolve_with<L>(lookup: &L, domain: &str) -> Result<Vec<MxCandidate>, Error>
where
    L: DnsLookup + ?Sized,
{
    let records = lookup
        .mx_records(domain)
        .map_err(|err| Error::lookup(domain, err))?;

    if records.iter().all(|r| r.trim().is_empty()) {
        let addresses = lookup
            .address_records(domain)
            .map_err(|err| Error::lookup(domain, err))?;
        tracing::debug!(domain, count = addresses.len(), "no MX, using address records");
        return Ok(addresses
            .into_iter()
            .filter(|a| !a.trim().is_empty())
            .map(|a| MxCandidate::new(0, normalize_host(&a)))
            .collect());
    }

    let mut candidates: Vec<MxCandidate> = records
        .iter()
        .filter(|r| !r.trim().is_empty())
        .map(|r| parse_mx_record(r))
        .collect();
    // stable: equal priorities keep resolver order
    candidates.sort_by_key(|c| c.priority);
    tracing::debug!(domain, ?candidates, "resolved mail exchangers");
    Ok(candidates)
}

/// Parses one `"<priority> <host>"` record. A missing or non-numeric priority
/// yields [`MxCandidate::UNPARSABLE_PRIORITY`]; the record is never dropped.
pub fn parse_mx_record(raw: &str) -> MxCandidate {
    let mut tokens = raw.split_whitespace();
    let first = tokens.next().unwrap_or_default();
    let second = tokens.next();

    let priority = first
        .parse::<u32>()
        .unwrap_or(MxCandidate::UNPARSABLE_PRIORITY);
    let host = second.unwrap_or(raw.trim());
    MxCandidate::new(priority, normalize_host(host))
}

pub(crate) fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
impl DnsLookup for crate::mx::tests::StubResolver {
    fn mx_records(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        (self.on_mx)(domain)
    }

    fn address_records(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        (self.on_a)(domain)
    }
}
