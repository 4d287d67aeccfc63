mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mimefilter", version, about = "Streaming yEnc encoder and decoder")]
struct Cli {
    /// Report format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from([
            "mimefilter",
            "encode",
            "photo.jpg",
            "-o",
            "photo.yenc",
            "--line-width",
            "64",
            "--part-size",
            "1000",
        ])
        .expect("encode args should parse");

        let Command::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.line_width, 64);
        assert_eq!(args.part_size, Some(1000));
    }

    #[test]
    fn decode_input_is_optional() {
        let cli = Cli::try_parse_from(["mimefilter", "--format", "pretty", "decode"])
            .expect("decode args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Pretty));
        assert!(matches!(cli.command, Command::Decode(ref args) if args.input.is_none()));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = Cli::try_parse_from(["mimefilter", "--log-level", "loud", "version"])
            .expect_err("invalid level should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
