use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use mimefilter_core::FilterReader;
use mimefilter_yenc::{YencConfig, YencFilter};
use tracing::info;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, yenc_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_report, DecodeReport, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = match args.input.as_deref() {
        None => Box::new(io::stdin().lock()),
        Some(path) if path == Path::new("-") => Box::new(io::stdin().lock()),
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
    };
    let decoder = YencFilter::with_config(YencConfig::decode().with_skip_preamble(true));
    let mut reader = FilterReader::new(input, decoder);

    let decoded = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
            copy_out(&mut reader, BufWriter::new(file))?
        }
        None => copy_out(&mut reader, BufWriter::new(io::stdout().lock()))?,
    };

    let (_, decoder) = reader.into_parts();
    let report = DecodeReport::from_filter(&decoder, decoded);
    if args.output.is_some() {
        print_report(&report, format);
    } else {
        info!(
            name = report.name.as_deref().unwrap_or("-"),
            decoded,
            parts = report.parts,
            crc32 = %report.crc32,
            status = report.status,
            "decoded"
        );
    }

    if decoder.header().is_none() && decoder.part().is_none() {
        return Err(CliError::new(DATA_INVALID, "no yEnc data found in input"));
    }
    if !decoder.issues().is_empty() {
        return Err(yenc_error("decoded with integrity issues", decoder.issues()));
    }
    Ok(SUCCESS)
}

fn copy_out<R: Read, W: Write>(reader: &mut R, mut out: W) -> CliResult<u64> {
    let decoded = io::copy(reader, &mut out).map_err(|err| io_error("decode failed", err))?;
    out.flush().map_err(|err| io_error("write failed", err))?;
    Ok(decoded)
}
