//! Bounded classification pipeline.
//!
//! Records are admitted into a sliding window of at most `window` in-flight tasks, one
//! thread each. When the window is full the *oldest* task is drained before the next
//! record is admitted, so a slow head blocks admission even if later tasks are done.
//! Results therefore come out in admission order; the aggregator re-sorts them anyway.

use std::collections::VecDeque;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use chrono::{DateTime, Utc};
use crate::classify::{ClassificationResult, ContentScanner, Outcome, ScanFilters, SignatureClassifier, SignatureStatus};
use crate::record::{parse_execution_time, ExecutionRecord};

pub const DEFAULT_WINDOW: usize = 4;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub filters: ScanFilters,
    pub session_start: Option<DateTime<Utc>>,
    pub window: usize,
    /// Degrades a task to `NotFound` if its result has not arrived in time. The task's
    /// thread is detached, not killed, so the window bound on collaborator calls no
    /// longer holds once a task has expired.
    pub task_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { filters: ScanFilters::default(), session_start: None, window: DEFAULT_WINDOW, task_timeout: None }
    }
}

/// Per-record short-circuit rules, copied into every task.
#[derive(Clone, Copy, Debug)]
pub struct RecordPolicy {
    /// Records at or before this instant are not classified at all.
    pub cutoff: Option<DateTime<Utc>>,
    pub only_suspect: bool,
}

impl RecordPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        let cutoff = if config.filters.only_after_session { config.session_start } else { None };
        Self { cutoff, only_suspect: config.filters.only_suspect }
    }

    pub fn classify(&self, execution_time: DateTime<Utc>, path: String, signer: &dyn SignatureClassifier, scanner: &dyn ContentScanner) -> ClassificationResult {
        let mut r = ClassificationResult::unevaluated(execution_time, path);
        if let Some(cutoff) = self.cutoff && r.execution_time <= cutoff { return r; }
        r.signature = signer.classify(&r.path).or_degrade(SignatureStatus::NotFound, &r.path);
        if self.only_suspect && !r.signature.is_suspect() {
            r.signature = SignatureStatus::NotFound;
            return r;
        }
        r.matched = scanner.scan(&r.path).or_degrade(false, &r.path);
        r
    }
}

struct Pending {
    execution_time: DateTime<Utc>,
    path: String,
    rx: mpsc::Receiver<ClassificationResult>,
}

pub struct ScanPipeline {
    config: PipelineConfig,
    policy: RecordPolicy,
    signer: Arc<dyn SignatureClassifier>,
    scanner: Arc<dyn ContentScanner>,
}

impl ScanPipeline {
    pub fn new(config: PipelineConfig, signer: Arc<dyn SignatureClassifier>, scanner: Arc<dyn ContentScanner>) -> Self {
        let policy = RecordPolicy::from_config(&config);
        Self { config, policy, signer, scanner }
    }

    pub fn config(&self) -> &PipelineConfig { &self.config }

    /// Classifies every record, calling `on_result` as each one is drained.
    pub fn run<I>(&self, records: I, mut on_result: impl FnMut(&ClassificationResult)) -> Vec<ClassificationResult>
    where I: IntoIterator<Item = ExecutionRecord> {
        let window = self.config.window.max(1);
        let mut pending: VecDeque<Pending> = VecDeque::with_capacity(window);
        let mut results: Vec<ClassificationResult> = Vec::new();
        for record in records {
            if pending.len() >= window && let Some(head) = pending.pop_front() {
                let r = self.drain(head);
                on_result(&r);
                results.push(r);
            }
            pending.push_back(self.admit(record));
        }
        while let Some(head) = pending.pop_front() {
            let r = self.drain(head);
            on_result(&r);
            results.push(r);
        }
        log::debug!("pipeline classified {} records (window {})", results.len(), window);
        results
    }

    fn admit(&self, record: ExecutionRecord) -> Pending {
        let execution_time = parse_execution_time(&record.raw_timestamp);
        let path = record.path.clone();
        let (tx, rx) = mpsc::channel();
        let policy = self.policy;
        let signer = Arc::clone(&self.signer);
        let scanner = Arc::clone(&self.scanner);
        let spawned = thread::Builder::new().name("amscan-classify".to_string()).spawn(move || {
            let _ = tx.send(policy.classify(execution_time, record.path, signer.as_ref(), scanner.as_ref()));
        });
        // a failed spawn drops the sender, which drain() treats like a failed task
        if let Err(e) = spawned { log::warn!("Failed to spawn classification task for {}: {}", path, e); }
        Pending { execution_time, path, rx }
    }

    fn drain(&self, head: Pending) -> ClassificationResult {
        let received = match self.config.task_timeout {
            Some(t) => match head.rx.recv_timeout(t) {
                Ok(r) => Outcome::Available(r),
                Err(RecvTimeoutError::Timeout) => Outcome::unavailable(format!("timed out after {} ms", t.as_millis())),
                Err(RecvTimeoutError::Disconnected) => Outcome::unavailable("task failed"),
            },
            None => match head.rx.recv() {
                Ok(r) => Outcome::Available(r),
                Err(_) => Outcome::unavailable("task failed"),
            },
        };
        if let Outcome::Unavailable(reason) = &received { log::warn!("Classification of {} degraded: {}", head.path, reason); }
        let fallback = ClassificationResult::unevaluated(head.execution_time, head.path.clone());
        received.or_degrade(fallback, &head.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Gauge { current: AtomicUsize, max: AtomicUsize }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
        }
        fn leave(&self) { self.current.fetch_sub(1, Ordering::SeqCst); }
    }

    #[derive(Default)]
    struct MockSigner {
        by_path: HashMap<String, SignatureStatus>,
        default: Option<SignatureStatus>,
        calls: AtomicUsize,
        delay: Duration,
        panic_on: Option<String>,
        gauge: Arc<Gauge>,
    }

    impl SignatureClassifier for MockSigner {
        fn classify(&self, path: &str) -> Outcome<SignatureStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gauge.enter();
            thread::sleep(self.delay);
            self.gauge.leave();
            if self.panic_on.as_deref() == Some(path) { panic!("classifier blew up"); }
            match self.by_path.get(path).copied().or(self.default) {
                Some(s) => Outcome::Available(s),
                None => Outcome::unavailable("no such file"),
            }
        }
    }

    #[derive(Default)]
    struct MockScanner { hit: bool, calls: AtomicUsize, delay: Duration, gauge: Arc<Gauge> }

    impl ContentScanner for MockScanner {
        fn scan(&self, _path: &str) -> Outcome<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gauge.enter();
            thread::sleep(self.delay);
            self.gauge.leave();
            Outcome::Available(self.hit)
        }
    }

    fn rec(ts: &str, path: &str) -> ExecutionRecord { ExecutionRecord { raw_timestamp: ts.to_string(), path: path.to_string() } }

    fn signer(default: SignatureStatus) -> Arc<MockSigner> { Arc::new(MockSigner { default: Some(default), ..Default::default() }) }

    fn run(config: PipelineConfig, s: &Arc<MockSigner>, c: &Arc<MockScanner>, records: Vec<ExecutionRecord>) -> Vec<ClassificationResult> {
        let s_dyn: Arc<dyn SignatureClassifier> = s.clone();
        let c_dyn: Arc<dyn ContentScanner> = c.clone();
        ScanPipeline::new(config, s_dyn, c_dyn).run(records, |_| {})
    }

    fn session() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap() }

    #[test]
    fn no_filters_classifies_and_scans() {
        let s = signer(SignatureStatus::Unsigned);
        let c = Arc::new(MockScanner { hit: true, ..Default::default() });
        let out = run(PipelineConfig::default(), &s, &c, vec![rec("2024-01-15 10:00:00", "C:\\tools\\x.exe")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "C:\\tools\\x.exe");
        assert_eq!(out[0].execution_time, Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
        assert_eq!(out[0].signature, SignatureStatus::Unsigned);
        assert!(out[0].matched);
    }

    #[test]
    fn records_before_session_skip_collaborators() {
        let s = signer(SignatureStatus::Unsigned);
        let c = Arc::new(MockScanner { hit: true, ..Default::default() });
        let cfg = PipelineConfig { filters: ScanFilters { only_after_session: true, only_suspect: false }, session_start: Some(session()), ..Default::default() };
        let out = run(cfg, &s, &c, vec![rec("2024-01-15 10:00:00", "C:\\tools\\x.exe")]);
        assert_eq!(out[0].signature, SignatureStatus::NotFound);
        assert!(!out[0].matched);
        assert_eq!(s.calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn record_exactly_at_session_start_is_excluded() {
        let s = signer(SignatureStatus::Unsigned);
        let c = Arc::new(MockScanner::default());
        let cfg = PipelineConfig { filters: ScanFilters { only_after_session: true, only_suspect: false }, session_start: Some(session()), ..Default::default() };
        let out = run(cfg, &s, &c, vec![rec("2024-02-01 00:00:00", "C:\\a.exe"), rec("2024-02-01 00:00:01", "C:\\b.exe")]);
        assert_eq!(out[0].signature, SignatureStatus::NotFound);
        assert_eq!(out[1].signature, SignatureStatus::Unsigned);
        assert_eq!(s.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn session_filter_without_known_start_is_inactive() {
        let s = signer(SignatureStatus::Signed);
        let c = Arc::new(MockScanner::default());
        let cfg = PipelineConfig { filters: ScanFilters { only_after_session: true, only_suspect: false }, session_start: None, ..Default::default() };
        let out = run(cfg, &s, &c, vec![rec("2020-01-01 00:00:00", "C:\\old.exe")]);
        assert_eq!(out[0].signature, SignatureStatus::Signed);
        assert_eq!(c.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_suspect_skips_scan_for_signed_and_missing() {
        let mut by_path = HashMap::new();
        by_path.insert("C:\\signed.exe".to_string(), SignatureStatus::Signed);
        by_path.insert("C:\\cheat.exe".to_string(), SignatureStatus::Cheat);
        by_path.insert("C:\\raw.exe".to_string(), SignatureStatus::Unsigned);
        let s = Arc::new(MockSigner { by_path, ..Default::default() });
        let c = Arc::new(MockScanner { hit: true, ..Default::default() });
        let cfg = PipelineConfig { filters: ScanFilters { only_after_session: false, only_suspect: true }, ..Default::default() };
        let out = run(cfg, &s, &c, vec![
            rec("2024-01-01 00:00:00", "C:\\signed.exe"),
            rec("2024-01-01 00:00:00", "C:\\gone.exe"),
            rec("2024-01-01 00:00:00", "C:\\cheat.exe"),
            rec("2024-01-01 00:00:00", "C:\\raw.exe"),
        ]);
        assert_eq!(out[0].signature, SignatureStatus::NotFound);
        assert!(!out[0].matched);
        assert_eq!(out[1].signature, SignatureStatus::NotFound);
        assert_eq!(out[2].signature, SignatureStatus::Cheat);
        assert!(out[2].matched);
        assert_eq!(out[3].signature, SignatureStatus::Unsigned);
        assert_eq!(c.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn never_more_than_window_tasks_in_collaborators() {
        let gauge = Arc::new(Gauge::default());
        let s = Arc::new(MockSigner { default: Some(SignatureStatus::Unsigned), delay: Duration::from_millis(15), gauge: gauge.clone(), ..Default::default() });
        let c = Arc::new(MockScanner { delay: Duration::from_millis(5), gauge: gauge.clone(), ..Default::default() });
        let records: Vec<ExecutionRecord> = (0..24).map(|i| rec("2024-01-01 00:00:00", &format!("C:\\bin\\{}.exe", i))).collect();
        let out = run(PipelineConfig::default(), &s, &c, records);
        assert_eq!(out.len(), 24);
        assert!(gauge.max.load(Ordering::SeqCst) <= DEFAULT_WINDOW);
        assert!(gauge.max.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn results_drain_in_admission_order() {
        let s = signer(SignatureStatus::Signed);
        let c = Arc::new(MockScanner::default());
        let records: Vec<ExecutionRecord> = (0..10).map(|i| rec("2024-01-01 00:00:00", &format!("C:\\{}.exe", i))).collect();
        let s_dyn: Arc<dyn SignatureClassifier> = s.clone();
        let c_dyn: Arc<dyn ContentScanner> = c.clone();
        let mut seen: Vec<String> = Vec::new();
        let out = ScanPipeline::new(PipelineConfig { window: 3, ..Default::default() }, s_dyn, c_dyn).run(records, |r| seen.push(r.path.clone()));
        let want: Vec<String> = (0..10).map(|i| format!("C:\\{}.exe", i)).collect();
        assert_eq!(seen, want);
        assert_eq!(out.iter().map(|r| r.path.clone()).collect::<Vec<_>>(), want);
    }

    #[test]
    fn panicking_task_degrades_without_aborting() {
        let s = Arc::new(MockSigner { default: Some(SignatureStatus::Unsigned), panic_on: Some("C:\\boom.exe".to_string()), ..Default::default() });
        let c = Arc::new(MockScanner { hit: true, ..Default::default() });
        let out = run(PipelineConfig::default(), &s, &c, vec![rec("2024-01-02 00:00:00", "C:\\boom.exe"), rec("2024-01-03 00:00:00", "C:\\fine.exe")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].signature, SignatureStatus::NotFound);
        assert!(!out[0].matched);
        assert_eq!(out[0].execution_time, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert_eq!(out[1].signature, SignatureStatus::Unsigned);
        assert!(out[1].matched);
    }

    #[test]
    fn timeout_degrades_slow_task() {
        let s = Arc::new(MockSigner { default: Some(SignatureStatus::Unsigned), delay: Duration::from_millis(400), ..Default::default() });
        let c = Arc::new(MockScanner { hit: true, ..Default::default() });
        let cfg = PipelineConfig { task_timeout: Some(Duration::from_millis(20)), ..Default::default() };
        let out = run(cfg, &s, &c, vec![rec("2024-01-02 00:00:00", "C:\\slow.exe")]);
        assert_eq!(out[0].signature, SignatureStatus::NotFound);
        assert!(!out[0].matched);
    }

    #[test]
    fn unparseable_timestamp_still_classified() {
        let s = signer(SignatureStatus::Signed);
        let c = Arc::new(MockScanner::default());
        let out = run(PipelineConfig::default(), &s, &c, vec![rec("garbage", "C:\\x.exe")]);
        assert_eq!(out[0].execution_time, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(out[0].signature, SignatureStatus::Signed);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let s = signer(SignatureStatus::Signed);
        let c = Arc::new(MockScanner::default());
        assert!(run(PipelineConfig::default(), &s, &c, vec![]).is_empty());
    }
}
