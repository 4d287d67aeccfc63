use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use mimefilter_core::FilterWriter;
use mimefilter_yenc::{Crc32, YencConfig, YencFilter, YencHeader, YencPart, YencTrailer};
use tracing::{debug, info};

use crate::cmd::EncodeArgs;
use crate::exit::{filter_error, io_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_report, EncodeReport, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.line_width == 0 {
        return Err(CliError::new(USAGE, "--line-width must be greater than zero"));
    }
    if args.part_size == Some(0) {
        return Err(CliError::new(USAGE, "--part-size must be greater than zero"));
    }

    let mut input = File::open(&args.input).map_err(|err| {
        io_error(&format!("failed opening {}", args.input.display()), err)
    })?;
    let size = input
        .metadata()
        .map_err(|err| io_error(&format!("failed reading {}", args.input.display()), err))?
        .len();
    let name = match &args.name {
        Some(name) => name.clone(),
        None => file_name(&args.input)?,
    };

    let plan = plan_parts(size, args.part_size);
    let config = YencConfig::encode().with_line_width(args.line_width);
    let job = Job {
        name: &name,
        size,
        plan: &plan,
        config,
    };

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
            let mut out = BufWriter::new(file);
            let crc = job.encode(&mut input, &mut out)?;
            out.flush().map_err(|err| io_error("write failed", err))?;

            print_report(
                &EncodeReport {
                    name,
                    size,
                    parts: plan.len() as u32,
                    line_width: args.line_width,
                    crc32: format!("{crc:08x}"),
                },
                format,
            );
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let crc = job.encode(&mut input, &mut out)?;
            out.flush().map_err(|err| io_error("write failed", err))?;
            info!(name = %name, size, parts = plan.len(), crc32 = format_args!("{crc:08x}"), "encoded");
        }
    }

    Ok(SUCCESS)
}

fn file_name(path: &Path) -> CliResult<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("cannot derive a name from {}; pass --name", path.display()),
            )
        })
}

/// Split `size` bytes into `(offset, len)` parts of at most `part_size`.
/// Empty input still yields one (empty) part.
fn plan_parts(size: u64, part_size: Option<u64>) -> Vec<(u64, u64)> {
    let Some(part_size) = part_size.filter(|&p| p < size) else {
        return vec![(0, size)];
    };
    let mut parts = Vec::with_capacity(size.div_ceil(part_size) as usize);
    let mut offset = 0;
    while offset < size {
        let len = part_size.min(size - offset);
        parts.push((offset, len));
        offset += len;
    }
    parts
}

struct Job<'a> {
    name: &'a str,
    size: u64,
    plan: &'a [(u64, u64)],
    config: YencConfig,
}

impl Job<'_> {
    /// Write every part, each with its own header, part line and trailer.
    /// Returns the checksum of the whole input.
    fn encode<R: Read, W: Write>(&self, input: &mut R, out: &mut W) -> CliResult<u32> {
        let total = self.plan.len() as u32;
        let multipart = total > 1;
        let write_err = |err| io_error("write failed", err);
        let mut file_crc = Crc32::new();

        for (index, &(offset, len)) in self.plan.iter().enumerate() {
            let number = index as u32 + 1;
            let header = YencHeader {
                part: multipart.then_some(number),
                total: multipart.then_some(total),
                line: self.config.line_width as u32,
                size: self.size,
                name: self.name.to_string(),
            };
            writeln!(out, "{header}").map_err(write_err)?;
            if multipart {
                let part = YencPart {
                    begin: offset + 1,
                    end: offset + len,
                };
                writeln!(out, "{part}").map_err(write_err)?;
            }

            let mut encoder = YencFilter::with_config(self.config);
            encoder.set_crc(file_crc.raw());
            let mut writer = FilterWriter::new(&mut *out, encoder);
            let copied = io::copy(&mut (&mut *input).take(len), &mut writer)
                .map_err(|err| io_error("encode failed", err))?;
            writer
                .finish()
                .map_err(|err| filter_error("encode failed", err))?;
            let (_, encoder) = writer.into_parts();

            if copied != len {
                return Err(CliError::new(
                    FAILURE,
                    format!("input shrank while encoding: expected {len} bytes, read {copied}"),
                ));
            }

            file_crc = encoder.total_crc_state();
            let trailer = YencTrailer {
                size: len,
                part: multipart.then_some(number),
                pcrc32: multipart.then(|| encoder.part_crc()),
                crc32: (number == total).then(|| file_crc.value()),
            };
            writeln!(out, "{trailer}").map_err(write_err)?;
            debug!(part = number, begin = offset + 1, len, "part written");
        }

        Ok(file_crc.value())
    }
}
