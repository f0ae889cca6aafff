use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, ValueEnum, ColorChoice, ArgAction, CommandFactory};
use clap_complete::Shell;
use comfy_table::{Table, ContentArrangement};
use serde::{Deserialize, Serialize};
use is_terminal::IsTerminal;
mod aggregate;
mod classify;
mod content_scan;
mod input;
mod markdown;
mod pipeline;
mod record;
mod rules;
mod session;
mod signature;

use aggregate::{Aggregate, ReportOutcome};
use classify::{ClassificationResult, ContentScanner, ScanFilters, SessionClock, SignatureClassifier, SignatureStatus};
use pipeline::{PipelineConfig, ScanPipeline};

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();
const MAX_WORKERS: usize = 256;
const DEFAULT_CONFIG: &str = "AmScan.toml";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFmt { Text, Json }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TimeZone { Local, Utc }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TextFormat { Lines, Table }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Parser, Debug)]
#[command(
    name = "AmScan",
    about = "Classifies Amcache execution history by signature and content",
    long_about = "Reads execution records (timestamp + path) exported from the Amcache hive, checks each binary's code signature and scans its contents for known cheat patterns, then prints the results newest first.",
    after_long_help = "Examples:\n  AmScan --csv 20240301_Amcache_UnassociatedFileEntries.csv\n  AmScan --csv-dir C:\\Tools\\AmCache --only-suspect\n  AmScan --only-after-session --text-format table\n  AmScan --csv - --output json < entries.csv\n  AmScan --interactive",
    color = ColorChoice::Auto
)]
struct Args {
    /// Record file to read ("-" for stdin)
    #[arg(long, short = 'f')]
    csv: Option<String>,
    /// Directory holding the parser's CSV output (default: AmCache next to the executable)
    #[arg(long, short = 'd')]
    csv_dir: Option<String>,
    #[arg(long)]
    csv_glob: Option<String>,
    #[arg(long, default_value_t = false)]
    recursive: bool,
    /// Only keep programs executed after the current logon session started
    #[arg(long, short = 'a', alias = "only-instance", default_value_t = false)]
    only_after_session: bool,
    /// Only keep Unsigned/Cheat entries
    #[arg(long, short = 'u', alias = "only-unsigned-cheat", default_value_t = false)]
    only_suspect: bool,
    /// Ask for the two filters on stdin
    #[arg(long, short = 'i', default_value_t = false)]
    interactive: bool,
    /// Classification tasks allowed in flight at once
    #[arg(long, short = 'w', default_value_t = pipeline::DEFAULT_WINDOW, value_parser = parse_workers)]
    workers: usize,
    #[arg(long)]
    task_timeout_secs: Option<u64>,
    #[arg(long, default_value_t = content_scan::DEFAULT_MAX_SCAN_MB)]
    max_scan_mb: u64,
    /// Session start override (RFC 3339 or "YYYY-MM-DD HH:MM:SS" UTC)
    #[arg(long, conflicts_with = "no_session")]
    session_start: Option<String>,
    #[arg(long, default_value_t = false)]
    no_session: bool,
    /// Path to JSON rules registry (default ./rules.json)
    #[arg(long)]
    rules: Option<String>,
    /// Output format [default: text]
    #[arg(long, short = 'o', value_enum)]
    output: Option<OutputFmt>,
    /// Text layout [default: lines]
    #[arg(long, value_enum)]
    text_format: Option<TextFormat>,
    #[arg(long, short = 'j')]
    json_path: Option<String>,
    #[arg(long)]
    csv_path: Option<String>,
    #[arg(long)]
    ndjson_path: Option<String>,
    #[arg(long)]
    md_path: Option<String>,
    /// Time zone for rendered timestamps [default: local]
    #[arg(long, value_enum)]
    time_zone: Option<TimeZone>,
    #[arg(long)]
    time_format: Option<String>,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(long, default_value_t = false)]
    force_color: bool,
    #[arg(long, default_value_t = false)]
    no_header: bool,
    #[arg(long)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long, default_value_t = false)]
    progress: bool,
    /// Exit with status 1 when any reported entry is a Cheat or matched content
    #[arg(long, default_value_t = false)]
    fail_on_suspect: bool,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<String>,
    #[arg(long)]
    config: Option<String>,
}

impl Args {
    fn output_fmt(&self) -> OutputFmt { self.output.unwrap_or(OutputFmt::Text) }

    fn text_fmt(&self) -> TextFormat { self.text_format.unwrap_or(TextFormat::Lines) }

    fn tz(&self) -> TimeZone { self.time_zone.unwrap_or(TimeZone::Local) }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            csv: None,
            csv_dir: None,
            csv_glob: None,
            recursive: false,
            only_after_session: false,
            only_suspect: false,
            interactive: false,
            workers: pipeline::DEFAULT_WINDOW,
            task_timeout_secs: None,
            max_scan_mb: content_scan::DEFAULT_MAX_SCAN_MB,
            session_start: None,
            no_session: false,
            rules: None,
            output: None,
            text_format: None,
            json_path: None,
            csv_path: None,
            ndjson_path: None,
            md_path: None,
            time_zone: None,
            time_format: None,
            no_color: false,
            force_color: false,
            no_header: false,
            log_level: None,
            log_format: None,
            log_path: None,
            verbose: 0,
            quiet: false,
            progress: false,
            fail_on_suspect: false,
            completions: None,
            completions_out: None,
            config: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct ScanReport {
    generated_at: DateTime<Utc>,
    source: String,
    session_start: Option<DateTime<Utc>>,
    filters: ScanFilters,
    total_lines: usize,
    records: usize,
    malformed_lines: usize,
    outcome: ReportOutcome,
    entries: Vec<ClassificationResult>,
}

#[derive(Deserialize)]
struct AppConfig {
    csv: Option<String>,
    csv_dir: Option<String>,
    csv_glob: Option<String>,
    recursive: Option<bool>,
    only_after_session: Option<bool>,
    only_suspect: Option<bool>,
    workers: Option<usize>,
    task_timeout_secs: Option<u64>,
    max_scan_mb: Option<u64>,
    rules: Option<String>,
    output: Option<OutputFmt>,
    text_format: Option<TextFormat>,
    json_path: Option<String>,
    csv_path: Option<String>,
    ndjson_path: Option<String>,
    md_path: Option<String>,
    time_zone: Option<TimeZone>,
    time_format: Option<String>,
    force_color: Option<bool>,
    progress: Option<bool>,
    fail_on_suspect: Option<bool>,
    log_format: Option<LogFormat>,
    log_path: Option<String>,
}

fn main() {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        if let Some(path) = args.completions_out.as_ref() {
            if let Ok(mut f) = std::fs::File::create(path) { clap_complete::generate(sh, &mut cmd, "AmScan", &mut f); } else { clap_complete::generate(sh, &mut cmd, "AmScan", &mut std::io::stdout()); }
        } else {
            clap_complete::generate(sh, &mut cmd, "AmScan", &mut std::io::stdout());
        }
        return;
    }
    if let Some(p) = args.config.clone() {
        match load_config(&p) {
            Ok(cfg) => apply_config(&mut args, cfg),
            Err(e) => {
                eprintln!("{}", paint(&format!("[x] {:#}", e), "1;31"));
                std::process::exit(2);
            }
        }
    } else if std::path::Path::new(DEFAULT_CONFIG).is_file() {
        match load_config(DEFAULT_CONFIG) {
            Ok(cfg) => apply_config(&mut args, cfg),
            Err(e) => eprintln!("{}", paint(&format!("[!] Ignoring {:#}", e), "1;33")),
        }
    }
    init_logging(&args);
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    let enable_color = if args.force_color { true } else { color_default && !args.no_color };
    let _ = ENABLE_COLOR.set(enable_color);
    if args.interactive && args.csv.as_deref() == Some("-") {
        log::warn!("--interactive ignored while reading records from stdin");
    } else if args.interactive {
        args.only_after_session |= prompt_yes_no("Show only entries executed in this session");
        args.only_suspect |= prompt_yes_no("Show only Unsigned/Cheat");
    }
    let code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("{}", paint(&format!("[x] {:#}", e), "1;31"));
            2
        }
    };
    std::process::exit(code);
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if args.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if let Some(lvl) = args.log_level {
        let f = match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace };
        builder.filter_level(f);
    } else if args.verbose > 0 {
        let f = if args.verbose >= 3 { log::LevelFilter::Trace } else if args.verbose == 2 { log::LevelFilter::Debug } else { log::LevelFilter::Info };
        builder.filter_level(f);
    }
    if let Some(fmt) = args.log_format {
        match fmt {
            LogFormat::Json => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().to_rfc3339();
                    let obj = serde_json::json!({
                        "ts": ts,
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "msg": record.args().to_string(),
                    });
                    writeln!(buf, "{}", obj)
                });
            }
            LogFormat::Text => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().format("%H:%M:%S");
                    writeln!(buf, "[{:<5} {}] {}", record.level(), ts, record.args())
                });
            }
        }
    }
    if let Some(path) = args.log_path.as_ref() {
        match std::fs::File::create(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => { eprintln!("Failed to open log file {}: {}", path, e); }
        }
    }
    builder.init();
}

fn run(args: &Args) -> Result<i32> {
    let source = resolve_source(args)?;
    log::info!("Reading execution records from {}", source);
    let rules_cfg = crate::rules::load_rules(args.rules.as_deref()).unwrap_or_default();
    let signer: Arc<dyn SignatureClassifier> = Arc::new(crate::signature::PeSignatureClassifier::new(&rules_cfg.cheat_signers()).context("invalid cheat signer list")?);
    let scanner = crate::content_scan::PatternScanner::new(&rules_cfg.content_patterns(), args.max_scan_mb.saturating_mul(1024 * 1024));
    log::info!("Content scanner loaded {} patterns", scanner.pattern_count());
    let scanner: Arc<dyn ContentScanner> = Arc::new(scanner);
    let clock: Box<dyn SessionClock> = if args.no_session {
        Box::new(crate::session::FixedSession(None))
    } else if let Some(s) = args.session_start.as_ref() {
        let Some(dt) = crate::session::parse_session_override(s) else { bail!("invalid --session-start value: {}", s) };
        Box::new(crate::session::FixedSession(Some(dt)))
    } else {
        Box::new(crate::session::LogonSession)
    };
    let session_start = clock.session_start();
    match session_start {
        Some(t) => log::info!("Session start: {}", t.to_rfc3339()),
        None if args.only_after_session => log::warn!("Session start unknown; --only-after-session will not skip any record"),
        None => {}
    }
    let filters = ScanFilters { only_after_session: args.only_after_session, only_suspect: args.only_suspect };
    let config = PipelineConfig {
        filters,
        session_start,
        window: args.workers,
        task_timeout: args.task_timeout_secs.map(Duration::from_secs),
    };
    let pipeline = ScanPipeline::new(config, signer, scanner);
    let mut reader = crate::input::RecordReader::new(crate::input::open_source(&source)?);
    let pb = if args.progress { Some(indicatif::ProgressBar::new_spinner()) } else { None };
    let mut done: usize = 0;
    let results = pipeline.run(&mut reader, |r| {
        done += 1;
        if let Some(ref pb) = pb { pb.tick(); pb.set_message(format!("Classified {} records ({})", done, truncate(&r.path, 60))); }
    });
    if let Some(pb) = pb { pb.finish_and_clear(); }
    log::info!("Read {} lines, {} records, {} malformed", reader.lines(), reader.extracted(), reader.malformed());
    let outcome = crate::aggregate::aggregate(results, pipeline.config().filters);
    let report = ScanReport {
        generated_at: Utc::now(),
        source: source.clone(),
        session_start,
        filters,
        total_lines: reader.lines(),
        records: reader.extracted(),
        malformed_lines: reader.malformed(),
        outcome: outcome.kind(),
        entries: outcome.entries().to_vec(),
    };
    let tfmt = args.time_format.as_deref();
    let tz = args.tz();
    match args.output_fmt() {
        OutputFmt::Text => {
            match &outcome {
                Aggregate::Entries(_) => match args.text_fmt() {
                    TextFormat::Lines => print_text(&report, args.no_header, tz, tfmt),
                    TextFormat::Table => print_text_table(&report, args.no_header, tz, tfmt),
                },
                Aggregate::NoMatches { classified } => print_no_matches(*classified, &report.filters),
                Aggregate::NoRecords => print_no_records(&report),
            }
        }
        OutputFmt::Json => {
            let body = serde_json::to_vec_pretty(&report).context("serializing report")?;
            if let Some(p) = args.json_path.as_ref() {
                match std::fs::write(p, body) {
                    Ok(_) => { if !args.quiet { println!("{}", paint(&format!("JSON written: {}", p), "1;36")); } },
                    Err(e) => log::error!("JSON write failed for {}: {}", p, e),
                }
            } else { println!("{}", String::from_utf8_lossy(&body)); }
        }
    }
    if let Some(p) = args.csv_path.as_ref() {
        if let Err(e) = write_csv(p, &report, tz, tfmt) { log::error!("CSV write failed for {}: {}", p, e); } else if !args.quiet { println!("{}", paint(&format!("CSV written: {}", p), "1;36")); }
    }
    if let Some(p) = args.ndjson_path.as_ref() {
        if let Err(e) = write_ndjson(p, &report, tz, tfmt) { log::error!("NDJSON write failed for {}: {}", p, e); } else if !args.quiet { println!("{}", paint(&format!("NDJSON written: {}", p), "1;36")); }
    }
    if let Some(p) = args.md_path.as_ref() {
        let md = crate::markdown::render_markdown(&report, tz, tfmt);
        match std::fs::write(p, md) {
            Ok(_) => { if !args.quiet { println!("{}", paint(&format!("Markdown written: {}", p), "1;36")); } }
            Err(e) => { log::error!("Markdown write failed for {}: {}", p, e); }
        }
    }
    if args.fail_on_suspect && report.entries.iter().any(|e| e.is_flagged()) { return Ok(1); }
    Ok(0)
}

fn resolve_source(args: &Args) -> Result<String> {
    if let Some(f) = args.csv.as_ref() { return Ok(f.clone()); }
    let glob = args.csv_glob.as_deref().unwrap_or(crate::input::DEFAULT_CSV_GLOB);
    let dir = match args.csv_dir.as_ref() {
        Some(d) => PathBuf::from(d),
        None => default_work_dir()?,
    };
    let p = crate::input::locate_csv(&dir, glob, args.recursive)?;
    Ok(p.to_string_lossy().into_owned())
}

fn default_work_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot resolve executable path")?;
    let base = exe.parent().map(|p| p.to_path_buf()).unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("AmCache"))
}

fn load_config(path: &str) -> Result<AppConfig> {
    let s = std::fs::read_to_string(path).with_context(|| format!("cannot read config {}", path))?;
    toml::from_str::<AppConfig>(&s).with_context(|| format!("invalid config {}", path))
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.csv.is_none() && let Some(v) = cfg.csv { args.csv = Some(v); }
    if args.csv_dir.is_none() && let Some(v) = cfg.csv_dir { args.csv_dir = Some(v); }
    if args.csv_glob.is_none() && let Some(v) = cfg.csv_glob { args.csv_glob = Some(v); }
    if let Some(v) = cfg.recursive { args.recursive |= v; }
    if let Some(v) = cfg.only_after_session { args.only_after_session |= v; }
    if let Some(v) = cfg.only_suspect { args.only_suspect |= v; }
    if args.workers == pipeline::DEFAULT_WINDOW && let Some(v) = cfg.workers { args.workers = v.clamp(1, MAX_WORKERS); }
    if args.task_timeout_secs.is_none() && let Some(v) = cfg.task_timeout_secs { args.task_timeout_secs = Some(v); }
    if args.max_scan_mb == content_scan::DEFAULT_MAX_SCAN_MB && let Some(v) = cfg.max_scan_mb { args.max_scan_mb = v; }
    if args.rules.is_none() && let Some(v) = cfg.rules { args.rules = Some(v); }
    if args.output.is_none() && let Some(v) = cfg.output { args.output = Some(v); }
    if args.text_format.is_none() && let Some(v) = cfg.text_format { args.text_format = Some(v); }
    if args.json_path.is_none() && let Some(v) = cfg.json_path { args.json_path = Some(v); }
    if args.csv_path.is_none() && let Some(v) = cfg.csv_path { args.csv_path = Some(v); }
    if args.ndjson_path.is_none() && let Some(v) = cfg.ndjson_path { args.ndjson_path = Some(v); }
    if args.md_path.is_none() && let Some(v) = cfg.md_path { args.md_path = Some(v); }
    if args.time_zone.is_none() && let Some(v) = cfg.time_zone { args.time_zone = Some(v); }
    if args.time_format.is_none() && let Some(v) = cfg.time_format { args.time_format = Some(v); }
    if let Some(v) = cfg.force_color { args.force_color |= v; }
    if let Some(v) = cfg.progress { args.progress |= v; }
    if let Some(v) = cfg.fail_on_suspect { args.fail_on_suspect |= v; }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
}

fn parse_workers(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if (1..=MAX_WORKERS).contains(&n) => Ok(n),
        Ok(_) => Err(format!("must be between 1 and {}", MAX_WORKERS)),
        Err(e) => Err(e.to_string()),
    }
}

fn prompt_yes_no(question: &str) -> bool {
    use std::io::Write;
    print!("[?] {} (y/n): ", question);
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() { return false; }
    is_yes(&line)
}

fn is_yes(answer: &str) -> bool { matches!(answer.trim().chars().next(), Some('y' | 'Y')) }

fn format_time(t: DateTime<Utc>, tz: TimeZone, tfmt: Option<&str>) -> String {
    match (tz, tfmt) {
        (TimeZone::Local, Some(f)) => format!("{}", t.with_timezone(&Local).format(f)),
        (TimeZone::Utc, Some(f)) => format!("{}", t.format(f)),
        (TimeZone::Local, None) => format!("{}", t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")),
        (TimeZone::Utc, None) => format!("{}", t.format("%Y-%m-%d %H:%M:%S")),
    }
}

const RULE: &str = "=============================================================";
const SEPARATOR: &str = "-------------------------------------------------------------";

fn print_header(rep: &ScanReport, tz: TimeZone, tfmt: Option<&str>) {
    println!("{}", paint(RULE, "1;36"));
    println!("{}", paint("                   AMSCAN EXECUTION REPORT", "1;36"));
    println!("{}", paint(RULE, "1;36"));
    if let Some(t) = rep.session_start { println!("{} {}", paint("[#] User Logon Time :", "1;36"), paint(&format_time(t, tz, tfmt), "1;37")); }
    println!("{} {} of {} records ({} lines skipped)", paint("[#] Entries         :", "1;36"), rep.entries.len(), rep.records, rep.malformed_lines);
    println!();
}

fn print_text(rep: &ScanReport, no_header: bool, tz: TimeZone, tfmt: Option<&str>) {
    if !no_header { print_header(rep, tz, tfmt); }
    for e in &rep.entries {
        println!("{} {}", paint("[+] Executed Time :", "1;37"), paint(&format_time(e.execution_time, tz, tfmt), "1;36"));
        println!("{} {}", paint("    Path          :", "1;37"), e.path);
        println!("{} {}", paint("    Signature     :", "1;37"), paint(e.signature.as_str(), sig_code(e.signature)));
        println!("{} {}", paint("    Content Match :", "1;37"), if e.matched { paint("YES", "31") } else { paint("NO", "32") });
        println!("{}", paint(SEPARATOR, "90"));
        println!();
    }
}

fn print_text_table(rep: &ScanReport, no_header: bool, tz: TimeZone, tfmt: Option<&str>) {
    if !no_header { print_header(rep, tz, tfmt); }
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![paint("Executed Time", "1"), paint("Signature", "1"), paint("Match", "1"), paint("Path", "1")]);
    for e in &rep.entries {
        table.add_row(vec![
            format_time(e.execution_time, tz, tfmt),
            paint(e.signature.as_str(), sig_code(e.signature)),
            if e.matched { paint("YES", "31") } else { paint("NO", "32") },
            e.path.clone(),
        ]);
    }
    println!("{}", table);
}

fn print_no_matches(classified: usize, filters: &ScanFilters) {
    println!();
    println!("{}", paint(&format!("[!] No entries matched the selected filters ({} records checked).", classified), "1;33"));
    let mut active: Vec<&str> = Vec::new();
    if filters.only_after_session { active.push("--only-after-session"); }
    if filters.only_suspect { active.push("--only-suspect"); }
    println!("{}", paint(&format!("    Tip: Run again without {}.", active.join(" / ")), "90"));
    println!();
}

fn print_no_records(rep: &ScanReport) {
    println!();
    println!("{}", paint(&format!("[!] No execution records found in {} ({} lines read).", rep.source, rep.total_lines), "1;33"));
    println!("{}", paint("    Tip: Check that the file is the parser's UnassociatedFileEntries CSV.", "90"));
    println!();
}

fn write_csv(path: &str, rep: &ScanReport, tz: TimeZone, tfmt: Option<&str>) -> Result<(), std::io::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["executed_time", "path", "signature", "content_match"])?;
    for e in &rep.entries {
        wtr.write_record([format_time(e.execution_time, tz, tfmt), e.path.clone(), e.signature.as_str().to_string(), e.matched.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_ndjson(path: &str, rep: &ScanReport, tz: TimeZone, tfmt: Option<&str>) -> Result<(), std::io::Error> {
    use std::io::Write;
    let mut file = std::fs::File::create(path)?;
    for e in &rep.entries {
        let obj = serde_json::json!({
            "executed_time": format_time(e.execution_time, tz, tfmt),
            "path": e.path,
            "signature": e.signature.as_str(),
            "content_match": e.matched,
        });
        writeln!(file, "{}", obj)?;
    }
    Ok(())
}

fn truncate(s: &str, n: usize) -> String {
    let mut out: String = s.chars().take(n).collect();
    if s.chars().count() > n { out.push_str("..."); }
    out
}

fn paint(s: &str, code: &str) -> String {
    if *ENABLE_COLOR.get().unwrap_or(&true) { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}

fn sig_code(s: SignatureStatus) -> &'static str {
    match s { SignatureStatus::Signed => "32", SignatureStatus::Unsigned => "33", SignatureStatus::Cheat => "1;31", SignatureStatus::NotFound => "90" }
}
