use chrono::{DateTime, NaiveDateTime, Utc};

/// One historical program execution as read from the upstream CSV.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub raw_timestamp: String,
    pub path: String,
}

/// Every variant means the line is malformed and gets skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("line does not have three comma-separated leading fields")]
    MissingFields,
    #[error("no drive root marker found")]
    MissingDrive,
    #[error("path is not terminated by a comma")]
    UnterminatedPath,
}

const DRIVE_MARKER: &str = ":\\";

/// Splits one upstream line into (timestamp, path).
///
/// The timestamp sits strictly between the second and third commas. The path starts
/// one character before the first `:\` in the line and runs up to the next comma.
pub fn extract(line: &str) -> Result<ExecutionRecord, ExtractError> {
    let c1 = line.find(',').ok_or(ExtractError::MissingFields)?;
    let c2 = find_from(line, ',', c1 + 1).ok_or(ExtractError::MissingFields)?;
    let c3 = find_from(line, ',', c2 + 1).ok_or(ExtractError::MissingFields)?;
    let raw_timestamp = line[c2 + 1..c3].to_string();
    let drive = line.find(DRIVE_MARKER).ok_or(ExtractError::MissingDrive)?;
    let ps = line[..drive].char_indices().next_back().map(|(i, _)| i).ok_or(ExtractError::MissingDrive)?;
    let pe = find_from(line, ',', ps).ok_or(ExtractError::UnterminatedPath)?;
    Ok(ExecutionRecord { raw_timestamp, path: line[ps..pe].to_string() })
}

fn find_from(hay: &str, needle: char, from: usize) -> Option<usize> {
    hay.get(from..)?.find(needle).map(|i| i + from)
}

/// Parses `YYYY-MM-DD HH:MM:SS` as UTC. Anything unparseable maps to the Unix epoch.
pub fn parse_execution_time(raw: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim().trim_matches('"');
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") { return Some(naive.and_utc()); }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) { return Some(dt.with_timezone(&Utc)); }
    // upstream exports occasionally carry 7-digit fractions or a trailing zone word
    let head: String = s.chars().take(19).collect();
    NaiveDateTime::parse_from_str(&head, "%Y-%m-%d %H:%M:%S").ok().map(|n| n.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn extracts_timestamp_and_path() {
        let r = extract("a,b,2024-01-15 10:00:00,C:\\tools\\x.exe,c").unwrap();
        assert_eq!(r.raw_timestamp, "2024-01-15 10:00:00");
        assert_eq!(r.path, "C:\\tools\\x.exe");
    }

    #[test]
    fn path_found_anywhere_after_timestamp() {
        let r = extract("id,name,2023-05-01 08:30:00,x.exe,1234,D:\\Games\\cheat.exe,sha1").unwrap();
        assert_eq!(r.path, "D:\\Games\\cheat.exe");
    }

    #[test]
    fn rejects_lines_without_three_commas() {
        assert_eq!(extract("a,b C:\\x.exe"), Err(ExtractError::MissingFields));
        assert_eq!(extract("a,b,2024-01-15 10:00:00 C:\\x.exe"), Err(ExtractError::MissingFields));
        assert_eq!(extract(""), Err(ExtractError::MissingFields));
    }

    #[test]
    fn rejects_lines_without_drive_marker() {
        assert_eq!(extract("a,b,2024-01-15 10:00:00,tools\\x.exe,c"), Err(ExtractError::MissingDrive));
        assert_eq!(extract(":\\x,b,2024-01-15 10:00:00,c"), Err(ExtractError::MissingDrive));
    }

    #[test]
    fn rejects_unterminated_path() {
        assert_eq!(extract("a,b,2024-01-15 10:00:00,C:\\tools\\x.exe"), Err(ExtractError::UnterminatedPath));
    }

    #[test]
    fn header_line_is_malformed() {
        let hdr = "ProgramName,ProgramID,FileKeyLastWriteTimestamp,FullPath,Name";
        assert!(extract(hdr).is_err());
    }

    #[test]
    fn multibyte_before_marker_does_not_split_char() {
        let r = extract("a,b,2024-01-15 10:00:00,é:\\x.exe,c").unwrap();
        assert_eq!(r.path, "é:\\x.exe");
    }

    #[test]
    fn execution_time_is_utc() {
        assert_eq!(parse_execution_time("2024-01-15 10:00:00"), Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
        assert_eq!(parse_execution_time("2024-01-15 10:00:00.1234567"), Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap() + chrono::Duration::nanoseconds(123_456_700));
    }

    #[test]
    fn garbage_time_is_epoch() {
        assert_eq!(parse_execution_time("not a date"), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(parse_execution_time(""), DateTime::<Utc>::UNIX_EPOCH);
    }
}
