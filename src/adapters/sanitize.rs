//! Redaction of patient contact data and verification secrets in logs.
//!
//! The binary wraps its log sink in [`SanitizingMakeWriter`], so every
//! formatted line passes through [`sanitize`] before reaching disk or
//! stdout. Redacted:
//! - verification transaction ids and one-time codes
//! - medical record numbers, labelled (`MRN 1000000123`) or bare
//! - email addresses
//! - phone numbers in international format
//!
//! Slot keys, appointment ids and doctor ids are left intact.
//!
//! Input longer than `SLOTGUARD_SANITIZE_MAX_BYTES` (default 16 KiB) is
//! clipped before scanning and marked `[TRUNCATED]`.

use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_MAX_BYTES: usize = 16 * 1024;

const TRUNCATED_MARK: &str = " [TRUNCATED]";

/// Kinds of redacted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Redaction {
    Transaction,
    Code,
    Mrn,
    Email,
    Phone,
}

impl Redaction {
    fn placeholder(self) -> &'static str {
        match self {
            Self::Transaction => "[REDACTED-TXN]",
            Self::Code => "[REDACTED-OTP]",
            Self::Mrn => "[REDACTED-MRN]",
            Self::Email => "[REDACTED-EMAIL]",
            Self::Phone => "[REDACTED-PHONE]",
        }
    }
}

// Order matters: labelled forms run before the bare MRN rule, and MRNs
// before phones so a bare 10-digit MRN is not mistaken for a phone.
const RULES: [(Redaction, &str); 6] = [
    (
        Redaction::Transaction,
        r"(?i)\b(?:txn|transaction)(?:[_\s-]?id)?(?:\s*[:=]\s*|\s+)[a-z0-9]{6,}\b",
    ),
    (Redaction::Code, r"(?i)\b(?:otp|code)\s*[:=]\s*\d{4,8}\b"),
    (Redaction::Mrn, r"(?i)\bMRN[:\s]*\d{6,10}\b"),
    (Redaction::Mrn, r"\b1\d{9}\b"),
    (
        Redaction::Email,
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
    ),
    (Redaction::Phone, r"\+\d[\d\s-]{6,16}\d\b"),
];

struct Redactor {
    any: RegexSet,
    rules: Vec<(Regex, Redaction)>,
}

impl Redactor {
    fn build() -> Self {
        let any = RegexSet::new(RULES.iter().map(|(_, pattern)| *pattern))
            .expect("Redaction patterns compile");
        let rules = RULES
            .iter()
            .map(|&(kind, pattern)| (Regex::new(pattern).expect("Redaction pattern compiles"), kind))
            .collect();
        Self { any, rules }
    }

    fn global() -> &'static Self {
        static REDACTOR: OnceLock<Redactor> = OnceLock::new();
        REDACTOR.get_or_init(Self::build)
    }

    fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let hits = self.any.matches(text);
        if !hits.matched_any() {
            return Cow::Borrowed(text);
        }

        let mut out = Cow::Borrowed(text);
        for idx in hits.iter() {
            let (regex, kind) = &self.rules[idx];
            let replaced = regex.replace_all(&out, kind.placeholder()).into_owned();
            out = Cow::Owned(replaced);
        }
        out
    }
}

fn max_bytes() -> usize {
    std::env::var("SLOTGUARD_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_MAX_BYTES)
}

/// Longest prefix of `input` within `limit` bytes that ends on a char boundary.
fn clip(input: &str, limit: usize) -> Option<&str> {
    if input.len() <= limit {
        return None;
    }
    let end = (0..=limit).rev().find(|&i| input.is_char_boundary(i)).unwrap_or(0);
    Some(&input[..end])
}

/// Replace sensitive values in `input` with placeholders.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_within(input, max_bytes())
}

fn sanitize_within(input: &str, limit: usize) -> String {
    let redactor = Redactor::global();
    match clip(input, limit) {
        Some(prefix) => {
            let mut out = redactor.redact(prefix).into_owned();
            out.push_str(TRUNCATED_MARK);
            out
        }
        None => redactor.redact(input).into_owned(),
    }
}

/// Whether `input` contains anything [`sanitize`] would redact.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let limit = max_bytes();
    let scanned = clip(input, limit).unwrap_or(input);
    Redactor::global().any.is_match(scanned)
}

/// `MakeWriter` that redacts each formatted line before it reaches `inner`.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}

/// Line-buffered redacting writer.
///
/// Complete lines are redacted and forwarded as they arrive; a trailing
/// partial line is forwarded on flush or drop.
pub struct SanitizingWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> SanitizingWriter<W> {
    fn forward(&mut self, bytes: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn drain_lines(&mut self) -> io::Result<()> {
        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Ok(());
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        for line in complete.split_inclusive(|&b| b == b'\n') {
            self.forward(line)?;
        }
        Ok(())
    }
}

impl<W: Write> Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_lines()?;

        // A runaway line without newlines is forwarded (and clipped) early.
        if self.pending.len() > max_bytes().saturating_mul(2) {
            let overflow = std::mem::take(&mut self.pending);
            self.forward(&overflow)?;
            self.inner.write_all(b"\n")?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.forward(&tail)?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
