use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mimefilter_yenc::YencFilter;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A command summary printable in every [`OutputFormat`].
pub trait Report: Serialize {
    fn rows(&self) -> Vec<(&'static str, String)>;
}

#[derive(Debug, Serialize)]
pub struct EncodeReport {
    pub name: String,
    pub size: u64,
    pub parts: u32,
    pub line_width: usize,
    pub crc32: String,
}

impl Report for EncodeReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("size", self.size.to_string()),
            ("parts", self.parts.to_string()),
            ("line_width", self.line_width.to_string()),
            ("crc32", self.crc32.clone()),
        ]
    }
}

#[derive(Debug, Serialize)]
pub struct DecodeReport {
    pub name: Option<String>,
    /// File size announced by the last `=ybegin`.
    pub size: Option<u64>,
    pub decoded: u64,
    pub parts: u32,
    pub crc32: String,
    pub status: &'static str,
    pub issues: Vec<String>,
}

impl DecodeReport {
    pub fn from_filter(decoder: &YencFilter, decoded: u64) -> Self {
        let header = decoder.header();
        Self {
            name: header.map(|h| h.name.clone()),
            size: header.map(|h| h.size),
            decoded,
            parts: decoder.completed_parts(),
            crc32: format!("{:08x}", decoder.total_crc()),
            status: if decoder.issues().is_empty() {
                "ok"
            } else {
                "invalid"
            },
            issues: decoder.issues().iter().map(ToString::to_string).collect(),
        }
    }
}

impl Report for DecodeReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("name", self.name.clone().unwrap_or_else(|| "-".to_string())),
            (
                "size",
                self.size.map_or_else(|| "-".to_string(), |s| s.to_string()),
            ),
            ("decoded", self.decoded.to_string()),
            ("parts", self.parts.to_string()),
            ("crc32", self.crc32.clone()),
            ("status", self.status.to_string()),
        ];
        rows.extend(self.issues.iter().map(|issue| ("issue", issue.clone())));
        rows
    }
}

pub fn print_report<R: Report>(report: &R, format: OutputFormat) {
    println!("{}", render_report(report, format));
}

fn render_report<R: Report>(report: &R, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in report.rows() {
                table.add_row(vec![field.to_string(), value]);
            }
            table.to_string()
        }
        OutputFormat::Pretty => report
            .rows()
            .into_iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect::<Vec<_>>()
            .join(" "),
    }
}
