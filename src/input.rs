use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use anyhow::{Context, Result, bail};
use globset::{GlobBuilder, GlobSetBuilder};
use walkdir::WalkDir;
use crate::record::{extract, ExecutionRecord};

pub const DEFAULT_CSV_GLOB: &str = "*Amcache_UnassociatedFileEntries*.csv";

/// Picks the most recently modified file under `dir` matching `glob`.
pub fn locate_csv(dir: &Path, glob: &str, recursive: bool) -> Result<PathBuf> {
    let mut gs = GlobSetBuilder::new();
    gs.add(GlobBuilder::new(glob).case_insensitive(true).build().with_context(|| format!("invalid glob {}", glob))?);
    let set = gs.build()?;
    if !dir.is_dir() { bail!("{} is not a directory", dir.display()); }
    let wd = if recursive { WalkDir::new(dir) } else { WalkDir::new(dir).max_depth(1) };
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for de in wd.into_iter().filter_map(|e| e.ok()) {
        let p = de.path();
        if !p.is_file() { continue; }
        let Some(name) = p.file_name() else { continue };
        if !set.is_match(name) { continue; }
        let modified = de.metadata().ok().and_then(|m| m.modified().ok()).unwrap_or(SystemTime::UNIX_EPOCH);
        log::debug!("candidate record file {}", p.display());
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) { newest = Some((modified, p.to_path_buf())); }
    }
    match newest {
        Some((_, p)) => Ok(p),
        None => bail!("no file matching {} in {}", glob, dir.display()),
    }
}

/// Streams execution records out of a line reader, skipping malformed lines.
pub struct RecordReader<R> {
    inner: R,
    buf: Vec<u8>,
    lines: usize,
    malformed: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self { Self { inner, buf: Vec::new(), lines: 0, malformed: 0 } }

    pub fn lines(&self) -> usize { self.lines }

    pub fn malformed(&self) -> usize { self.malformed }

    pub fn extracted(&self) -> usize { self.lines - self.malformed }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = ExecutionRecord;

    fn next(&mut self) -> Option<ExecutionRecord> {
        loop {
            self.buf.clear();
            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => { log::warn!("Stopped reading records after {} lines: {}", self.lines, e); return None; }
            }
            self.lines += 1;
            let text = String::from_utf8_lossy(&self.buf);
            let line = text.trim_start_matches('\u{feff}').trim_end_matches(['\r', '\n']);
            match extract(line) {
                Ok(r) => return Some(r),
                Err(e) => {
                    self.malformed += 1;
                    log::trace!("line {} skipped: {}", self.lines, e);
                }
            }
        }
    }
}

pub fn open_source(path: &str) -> Result<Box<dyn BufRead>> {
    if path == "-" { return Ok(Box::new(std::io::BufReader::new(std::io::stdin()))); }
    let f = std::fs::File::open(path).with_context(|| format!("failed to open {}", path))?;
    Ok(Box::new(std::io::BufReader::new(f)))
}
