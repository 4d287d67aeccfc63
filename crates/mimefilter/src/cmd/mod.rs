use clap::{Args, Subcommand};
use std::path::PathBuf;

use mimefilter_yenc::DEFAULT_LINE_WIDTH;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a file as a yEnc stream.
    Encode(EncodeArgs),
    /// Decode a yEnc stream and verify its checksums.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// File to encode.
    pub input: PathBuf,
    /// Write the yEnc stream here and print a report (default: stdout, no report).
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// Source bytes per encoded line.
    #[arg(long, env = "MIMEFILTER_LINE_WIDTH", default_value_t = DEFAULT_LINE_WIDTH)]
    pub line_width: usize,
    /// Split into parts of at most this many bytes.
    #[arg(long, env = "MIMEFILTER_PART_SIZE", value_name = "BYTES")]
    pub part_size: Option<u64>,
    /// File name announced in =ybegin (default: the input's file name).
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// yEnc stream to decode; `-` or absent reads stdin.
    pub input: Option<PathBuf>,
    /// Write decoded bytes here and print a report (default: stdout, no report).
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
