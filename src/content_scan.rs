use std::io::Read;
use std::path::Path;
use regex::bytes::RegexSet;
use crate::classify::{ContentScanner, Outcome};

pub const DEFAULT_MAX_SCAN_MB: u64 = 64;

/// Matches a file's leading bytes against a set of byte-level patterns.
pub struct PatternScanner {
    set: RegexSet,
    max_bytes: u64,
}

impl PatternScanner {
    /// Invalid patterns are dropped with a warning, like the event pattern list.
    pub fn new(patterns: &[String], max_bytes: u64) -> Self {
        let mut valid: Vec<&str> = Vec::new();
        for p in patterns {
            match regex::bytes::Regex::new(p) {
                Ok(_) => valid.push(p),
                Err(e) => log::warn!("Ignoring content pattern {}: {}", p, e),
            }
        }
        let set = RegexSet::new(&valid).unwrap_or_else(|_| RegexSet::empty());
        Self { set, max_bytes }
    }

    pub fn pattern_count(&self) -> usize { self.set.len() }

    pub fn matches(&self, bytes: &[u8]) -> bool { self.set.is_match(bytes) }
}

impl ContentScanner for PatternScanner {
    fn scan(&self, path: &str) -> Outcome<bool> {
        let p = Path::new(path);
        if !p.exists() { return Outcome::Available(false); }
        if self.set.is_empty() { return Outcome::Available(false); }
        let f = match std::fs::File::open(p) { Ok(f) => f, Err(e) => return Outcome::unavailable(format!("open failed: {}", e)) };
        let mut buf = Vec::new();
        if let Err(e) = f.take(self.max_bytes).read_to_end(&mut buf) { return Outcome::unavailable(format!("read failed: {}", e)); }
        Outcome::Available(self.matches(&buf))
    }
}
