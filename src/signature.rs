use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use goblin::pe::certificate_table::AttributeCertificate;
use goblin::pe::header::Header;
use regex::bytes::{Regex, RegexBuilder};
use crate::classify::{Outcome, SignatureClassifier, SignatureStatus};

/// Bytes read from the start of a file to find its PE headers.
const HEADER_WINDOW: u64 = 64 * 1024;
/// Certificate tables larger than this are not read.
pub const MAX_CERT_TABLE_BYTES: u32 = 16 * 1024 * 1024;

/// Classifies PE images by their embedded Authenticode certificate table.
///
/// No table means `Unsigned`. A table whose certificate blob names one of the known-bad
/// signers means `Cheat`, anything else `Signed`. Chain trust is not verified. Only the
/// headers and the certificate table are read, never the whole image.
pub struct PeSignatureClassifier {
    bad_signers: Option<Regex>,
}

impl PeSignatureClassifier {
    pub fn new(cheat_signers: &[String]) -> Result<Self, regex::Error> {
        let alts: Vec<String> = cheat_signers.iter().filter(|s| !s.trim().is_empty()).map(|s| regex::escape(s.trim())).collect();
        let bad_signers = if alts.is_empty() { None } else {
            Some(RegexBuilder::new(&format!("(?:{})", alts.join("|"))).case_insensitive(true).unicode(false).build()?)
        };
        Ok(Self { bad_signers })
    }

    pub fn classify_reader<R: Read + Seek>(&self, r: &mut R) -> Outcome<SignatureStatus> {
        let mut head = Vec::new();
        if let Err(e) = (&mut *r).take(HEADER_WINDOW).read_to_end(&mut head) { return Outcome::unavailable(format!("read failed: {}", e)); }
        let Some((offset, size)) = certificate_directory(&head) else { return Outcome::Available(SignatureStatus::Unsigned) };
        if size > MAX_CERT_TABLE_BYTES {
            return Outcome::unavailable(format!("certificate table of {} bytes exceeds {} byte limit", size, MAX_CERT_TABLE_BYTES));
        }
        let mut table = vec![0u8; size as usize];
        if let Err(e) = r.seek(SeekFrom::Start(u64::from(offset))).and_then(|_| r.read_exact(&mut table)) {
            log::debug!("certificate table at {:#x} unreadable: {}", offset, e);
            return Outcome::Available(SignatureStatus::Unsigned);
        }
        Outcome::Available(self.classify_table(&table))
    }

    fn classify_table(&self, table: &[u8]) -> SignatureStatus {
        let mut offset = 0usize;
        let mut any = false;
        while offset + 8 <= table.len() {
            match AttributeCertificate::parse(table, &mut offset) {
                Ok(cert) => {
                    if self.is_bad_signer(cert.certificate) { return SignatureStatus::Cheat; }
                    any = true;
                }
                Err(e) => { log::debug!("malformed certificate entry: {}", e); break; }
            }
        }
        if any { SignatureStatus::Signed } else { SignatureStatus::Unsigned }
    }

    fn is_bad_signer(&self, blob: &[u8]) -> bool {
        self.bad_signers.as_ref().is_some_and(|re| re.is_match(blob))
    }
}

/// File offset and size of the security directory, if the image has one.
fn certificate_directory(head: &[u8]) -> Option<(u32, u32)> {
    let header = Header::parse(head).ok()?;
    let dd = header.optional_header?.data_directories.get_certificate_table().map(|d| (d.virtual_address, d.size))?;
    if dd.1 == 0 { None } else { Some(dd) }
}

impl SignatureClassifier for PeSignatureClassifier {
    fn classify(&self, path: &str) -> Outcome<SignatureStatus> {
        let p = Path::new(path);
        if !p.is_file() { return Outcome::unavailable("file not found"); }
        match std::fs::File::open(p) {
            Ok(mut f) => self.classify_reader(&mut f),
            Err(e) => Outcome::unavailable(format!("open failed: {}", e)),
        }
    }
}
