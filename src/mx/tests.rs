use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use trust_dns_resolver::error::ResolveError;

use super::{Error, MxCandidate, MxResolver, Pool, parse_mx_record, resolve_with};

type LookupResult = Result<Vec<String>, ResolveError>;
type LookupFn = dyn Fn(&str) -> LookupResult + Send + Sync;

pub(crate) struct StubResolver {
    pub on_mx: Box<LookupFn>,
    pub on_a: Box<LookupFn>,
}

impl StubResolver {
    pub(crate) fn new<F, G>(on_mx: F, on_a: G) -> Self
    where
        F: Fn(&str) -> LookupResult + Send + Sync + 'static,
        G: Fn(&str) -> LookupResult + Send + Sync + 'static,
    {
        Self {
            on_mx: Box::new(on_mx),
            on_a: Box::new(on_a),
        }
    }

    pub(crate) fn with_mx(records: &[&str]) -> Self {
        let records: Vec<String> = records.iter().map(|r| r.to_string()).collect();
        Self::new(
            move |_| Ok(records.clone()),
            |_| panic!("address lookup not expected"),
        )
    }

    pub(crate) fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()), |_| Ok(Vec::new()))
    }
}

#[test]
fn sorts_by_priority_and_strips_root_dot() {
    let stub = StubResolver::with_mx(&[
        "20 mx2.example.com.",
        "10 mx1.example.com.",
        "30 mx3.example.com.",
    ]);
    let candidates = resolve_with(&stub, "example.com").expect("lookup succeeds");
    assert_eq!(
        candidates,
        vec![
            MxCandidate::new(10, "mx1.example.com"),
            MxCandidate::new(20, "mx2.example.com"),
            MxCandidate::new(30, "mx3.example.com"),
        ]
    );
}

#[test]
fn ties_keep_resolver_order() {
    let stub = StubResolver::with_mx(&["10 b.example.com", "10 a.example.com", "5 c.example.com"]);
    let hosts: Vec<String> = resolve_with(&stub, "example.com")
        .unwrap()
        .into_iter()
        .map(|c| c.host)
        .collect();
    assert_eq!(hosts, ["c.example.com", "b.example.com", "a.example.com"]);
}

#[test]
fn unparsable_priority_sorts_last_but_is_kept() {
    let stub = StubResolver::with_mx(&["garbage.example.com.", "10 mx1.example.com"]);
    let candidates = resolve_with(&stub, "example.com").unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].host, "mx1.example.com");
    assert_eq!(candidates[1].priority, MxCandidate::UNPARSABLE_PRIORITY);
    assert_eq!(candidates[1].host, "garbage.example.com");
}

#[test]
fn falls_back_to_address_records() {
    let stub = StubResolver::new(
        |_| Ok(Vec::new()),
        |domain| {
            assert_eq!(domain, "example.com");
            Ok(vec!["192.0.2.7".to_string(), "192.0.2.3".to_string()])
        },
    );
    let candidates = resolve_with(&stub, "example.com").unwrap();
    assert_eq!(
        candidates,
        vec![
            MxCandidate::new(0, "192.0.2.7"),
            MxCandidate::new(0, "192.0.2.3"),
        ]
    );
}

#[test]
fn no_records_at_all_is_empty_not_error() {
    let resolver = MxResolver::new(StubResolver::empty());
    let candidates = resolver.resolve("example.com").expect("no error");
    assert!(candidates.is_empty());
}

#[test]
fn transport_failure_is_lookup_error() {
    let stub = StubResolver::new(
        |_| Err(ResolveError::from("request timed out")),
        |_| Ok(Vec::new()),
    );
    let err = resolve_with(&stub, "example.com").expect_err("should fail");
    assert!(matches!(err, Error::Lookup { ref domain, .. } if domain == "example.com"));
}

#[test]
fn parse_record_variants() {
    assert_eq!(
        parse_mx_record("5 Mail.Example.COM."),
        MxCandidate::new(5, "mail.example.com")
    );
    assert_eq!(
        parse_mx_record("x mail.example.com"),
        MxCandidate::new(MxCandidate::UNPARSABLE_PRIORITY, "mail.example.com")
    );
}

proptest! {
    #[test]
    fn output_is_always_sorted(prios in proptest::collection::vec(proptest::option::of(0u32..100), 0..12)) {
        let records: Vec<String> = prios
            .iter()
            .enumerate()
            .map(|(i, p)| match p {
                Some(p) => format!("{p} mx{i}.example.com."),
                None => format!("mx{i}.example.com."),
            })
            .collect();
        let stub = StubResolver::new(move |_| Ok(records.clone()), |_| Ok(Vec::new()));
        let candidates = resolve_with(&stub, "example.com").unwrap();

        prop_assert!(candidates.windows(2).all(|w| w[0].priority <= w[1].priority));
        let expected = prios.len();
        if expected > 0 {
            prop_assert_eq!(candidates.len(), expected);
        }
        let unparsable = prios.iter().filter(|p| p.is_none()).count();
        prop_assert!(candidates
            .iter()
            .rev()
            .take(unparsable)
            .all(|c| c.priority == MxCandidate::UNPARSABLE_PRIORITY));
    }
}

#[test]
fn busy_pool_builds_instead_of_waiting() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let pool = Pool::new(move || Ok(counter.fetch_add(1, Ordering::SeqCst)));
    let pool = &pool;
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    thread::scope(|scope| {
        scope.spawn(move || {
            pool.with(|id| {
                held_tx.send(*id).expect("report checkout");
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
                Ok(())
            })
        });
        let held = held_rx.recv().expect("first checkout");

        let started = Instant::now();
        let second = pool.with(|id| Ok(*id)).expect("second checkout");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_ne!(held, second);
        release_tx.send(()).expect("release");
    });
    assert_eq!(built.load(Ordering::SeqCst), 2);

    pool.with(|_| Ok(())).expect("reuse");
    assert_eq!(built.load(Ordering::SeqCst), 2, "idle instances are reused");
}

#[test]
fn failed_build_is_a_lookup_error() {
    let pool: Pool<usize> = Pool::new(|| Err(ResolveError::from("no resolver")));
    let err = pool.with(|_| Ok(())).expect_err("build fails");
    assert!(err.to_string().contains("no resolver"));
}
