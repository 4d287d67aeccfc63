//! `=ybegin`, `=ypart` and `=yend` marker lines.
//!
//! ```text
//! =ybegin part=1 total=2 line=128 size=123456 name=file name.bin
//! =ypart begin=1 end=64000
//! ...data lines...
//! =yend size=64000 part=1 pcrc32=9c2e4e3a crc32=1e54a7c5
//! ```
//!
//! `name` always comes last and runs to the end of the line, so it may
//! contain spaces. Offsets in `=ypart` are 1-based and inclusive.

use std::borrow::Cow;
use std::fmt;

use crate::error::{Result, YencError};

pub(crate) const BEGIN_KEYWORD: &str = "=ybegin";
pub(crate) const PART_KEYWORD: &str = "=ypart";
pub(crate) const END_KEYWORD: &str = "=yend";

/// Longest marker line buffered while waiting for its newline.
pub const MAX_MARKER_LINE: usize = 1024;

/// Which marker a line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Begin,
    Part,
    End,
    Unknown,
}

impl Marker {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Marker::Begin => BEGIN_KEYWORD,
            Marker::Part => PART_KEYWORD,
            Marker::End => END_KEYWORD,
            Marker::Unknown => "=y",
        }
    }
}

/// Classify a line starting with `=y`.
pub(crate) fn classify(line: &[u8]) -> Marker {
    let line = trim_eol(line);
    if has_keyword(line, BEGIN_KEYWORD) {
        Marker::Begin
    } else if has_keyword(line, PART_KEYWORD) {
        Marker::Part
    } else if has_keyword(line, END_KEYWORD) {
        Marker::End
    } else {
        Marker::Unknown
    }
}

/// True when `line` is a proper prefix of a marker keyword, e.g. `=yen`.
pub(crate) fn is_partial_keyword(line: &[u8]) -> bool {
    let line = trim_eol(line);
    [BEGIN_KEYWORD, PART_KEYWORD, END_KEYWORD]
        .iter()
        .any(|keyword| keyword.len() > line.len() && keyword.as_bytes().starts_with(line))
}

fn has_keyword(line: &[u8], keyword: &str) -> bool {
    line.starts_with(keyword.as_bytes())
        && line
            .get(keyword.len())
            .is_none_or(|b| b.is_ascii_whitespace())
}

fn trim_eol(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = line {
        line = rest;
    }
    line
}

/// Split the text after a keyword into `key=value` pairs and the trailing
/// `name=` value, if present.
fn fields<'a>(line: &'a str, keyword: &str) -> (Vec<(&'a str, &'a str)>, Option<&'a str>) {
    let rest = line.get(keyword.len()..).unwrap_or("");

    let name_at = rest
        .match_indices("name=")
        .map(|(idx, _)| idx)
        .find(|&idx| idx == 0 || rest.as_bytes()[idx - 1].is_ascii_whitespace());

    let (params, name) = match name_at {
        Some(idx) => (&rest[..idx], Some(&rest[idx + "name=".len()..])),
        None => (rest, None),
    };

    let pairs = params
        .split_ascii_whitespace()
        .filter_map(|token| token.split_once('='))
        .collect();
    (pairs, name)
}

fn lossy(line: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(trim_eol(line))
}

fn lookup<'a>(pairs: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| *v)
}

fn malformed(keyword: &'static str, reason: impl Into<String>) -> YencError {
    YencError::MalformedLine {
        keyword,
        reason: reason.into(),
    }
}

fn number<T: std::str::FromStr>(
    pairs: &[(&str, &str)],
    keyword: &'static str,
    key: &str,
) -> Result<Option<T>> {
    match lookup(pairs, key) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| malformed(keyword, format!("invalid {key} value {value:?}"))),
    }
}

fn required<T>(value: Option<T>, keyword: &'static str, key: &str) -> Result<T> {
    value.ok_or_else(|| malformed(keyword, format!("missing {key}")))
}

fn checksum(pairs: &[(&str, &str)], keyword: &'static str, key: &str) -> Result<Option<u32>> {
    match lookup(pairs, key) {
        None => Ok(None),
        Some(value) => {
            let digits = value
                .strip_prefix("0x")
                .or_else(|| value.strip_prefix("0X"))
                .unwrap_or(value);
            u32::from_str_radix(digits, 16)
                .map(Some)
                .map_err(|_| malformed(keyword, format!("invalid {key} value {value:?}")))
        }
    }
}

/// Fields of a `=ybegin` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YencHeader {
    /// Part number, present on multi-part posts.
    pub part: Option<u32>,
    /// Total number of parts (yEnc 1.2).
    pub total: Option<u32>,
    /// Line width used by the encoder.
    pub line: u32,
    /// Size of the whole file in bytes.
    pub size: u64,
    pub name: String,
}

impl YencHeader {
    /// Parse a full `=ybegin` line; a trailing line terminator is ignored.
    pub fn parse(line: &[u8]) -> Result<Self> {
        let text = lossy(line);
        if !has_keyword(text.as_bytes(), BEGIN_KEYWORD) {
            return Err(malformed(BEGIN_KEYWORD, "not a =ybegin line"));
        }
        let (pairs, name) = fields(&text, BEGIN_KEYWORD);

        let name = name.map(str::trim).filter(|name| !name.is_empty());
        Ok(Self {
            part: number(&pairs, BEGIN_KEYWORD, "part")?,
            total: number(&pairs, BEGIN_KEYWORD, "total")?,
            line: required(number(&pairs, BEGIN_KEYWORD, "line")?, BEGIN_KEYWORD, "line")?,
            size: required(number(&pairs, BEGIN_KEYWORD, "size")?, BEGIN_KEYWORD, "size")?,
            name: required(name, BEGIN_KEYWORD, "name")?.to_string(),
        })
    }

    /// True when the header announces a multi-part post.
    pub fn is_multipart(&self) -> bool {
        self.part.is_some()
    }
}

impl fmt::Display for YencHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(BEGIN_KEYWORD)?;
        if let Some(part) = self.part {
            write!(f, " part={part}")?;
        }
        if let Some(total) = self.total {
            write!(f, " total={total}")?;
        }
        write!(f, " line={} size={} name={}", self.line, self.size, self.name)
    }
}

/// Fields of a `=ypart` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YencPart {
    /// 1-based offset of the first byte of this part.
    pub begin: u64,
    /// 1-based offset of the last byte of this part.
    pub end: u64,
}

impl YencPart {
    pub fn parse(line: &[u8]) -> Result<Self> {
        let text = lossy(line);
        if !has_keyword(text.as_bytes(), PART_KEYWORD) {
            return Err(malformed(PART_KEYWORD, "not a =ypart line"));
        }
        let (pairs, _) = fields(&text, PART_KEYWORD);

        let begin = required(number(&pairs, PART_KEYWORD, "begin")?, PART_KEYWORD, "begin")?;
        let end = required(number(&pairs, PART_KEYWORD, "end")?, PART_KEYWORD, "end")?;
        if begin == 0 || end < begin {
            return Err(malformed(PART_KEYWORD, format!("invalid range {begin}..={end}")));
        }
        Ok(Self { begin, end })
    }

    /// Number of bytes this part covers.
    pub fn len(&self) -> u64 {
        (self.end + 1).saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for YencPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PART_KEYWORD} begin={} end={}", self.begin, self.end)
    }
}

/// Fields of a `=yend` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YencTrailer {
    /// Size of this part (or of the whole file for single-part posts).
    pub size: u64,
    pub part: Option<u32>,
    /// Checksum of this part.
    pub pcrc32: Option<u32>,
    /// Checksum of the whole file.
    pub crc32: Option<u32>,
}

impl YencTrailer {
    pub fn parse(line: &[u8]) -> Result<Self> {
        let text = lossy(line);
        if !has_keyword(text.as_bytes(), END_KEYWORD) {
            return Err(malformed(END_KEYWORD, "not a =yend line"));
        }
        let (pairs, _) = fields(&text, END_KEYWORD);

        Ok(Self {
            size: required(number(&pairs, END_KEYWORD, "size")?, END_KEYWORD, "size")?,
            part: number(&pairs, END_KEYWORD, "part")?,
            pcrc32: checksum(&pairs, END_KEYWORD, "pcrc32")?,
            crc32: checksum(&pairs, END_KEYWORD, "crc32")?,
        })
    }
}

impl fmt::Display for YencTrailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{END_KEYWORD} size={}", self.size)?;
        if let Some(part) = self.part {
            write!(f, " part={part}")?;
        }
        if let Some(pcrc32) = self.pcrc32 {
            write!(f, " pcrc32={pcrc32:08x}")?;
        }
        if let Some(crc32) = self.crc32 {
            write!(f, " crc32={crc32:08x}")?;
        }
        Ok(())
    }
}
