use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use crate::classify::SessionClock;

/// A session start known up front (CLI override, or lookup disabled with `None`).
pub struct FixedSession(pub Option<DateTime<Utc>>);

impl SessionClock for FixedSession {
    fn session_start(&self) -> Option<DateTime<Utc>> { self.0 }
}

/// Start of the most recent interactive logon session, read from WMI.
pub struct LogonSession;

impl SessionClock for LogonSession {
    fn session_start(&self) -> Option<DateTime<Utc>> { query_logon_start() }
}

#[cfg(target_os = "windows")]
fn query_logon_start() -> Option<DateTime<Utc>> {
    use serde::Deserialize;
    use wmi::WMIConnection;
    #[allow(non_snake_case)]
    #[derive(Debug, Deserialize)]
    struct SessionRow { LogonType: Option<u32>, StartTime: Option<String> }
    let wmi = match WMIConnection::new() { Ok(w) => w, Err(e) => { log::warn!("WMI connection failed: {}", e); return None } };
    // 2 = interactive, 10 = remote interactive, 11 = cached interactive
    let rows = match wmi.raw_query::<SessionRow>("SELECT LogonType, StartTime FROM Win32_LogonSession WHERE LogonType = 2 OR LogonType = 10 OR LogonType = 11") {
        Ok(r) => r,
        Err(e) => { log::warn!("Win32_LogonSession query failed: {}", e); return None }
    };
    let latest = rows.into_iter()
        .filter_map(|r| { log::trace!("logon session type {:?} start {:?}", r.LogonType, r.StartTime); r.StartTime })
        .filter_map(|s| parse_cim_datetime(&s))
        .max();
    if latest.is_none() { log::info!("No interactive logon session found"); }
    latest
}

#[cfg(not(target_os = "windows"))]
fn query_logon_start() -> Option<DateTime<Utc>> {
    log::debug!("Logon session lookup is only available on Windows");
    None
}

/// Parses a CIM_DATETIME (`yyyymmddHHMMSS.ffffff+UUU`, offset in minutes) into UTC.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub fn parse_cim_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let base = NaiveDateTime::parse_from_str(s.get(..14)?, "%Y%m%d%H%M%S").ok()?;
    let micros = s.get(15..21).and_then(|f| f.parse::<i64>().ok()).unwrap_or(0);
    let offset = match s.get(21..25) {
        Some(o) if o.starts_with('+') || o.starts_with('-') => o.parse::<i64>().ok()?,
        _ => 0,
    };
    Some((base + Duration::microseconds(micros) - Duration::minutes(offset)).and_utc())
}

/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn parse_session_override(s: &str) -> Option<DateTime<Utc>> {
    crate::record::parse_timestamp(s)
}
