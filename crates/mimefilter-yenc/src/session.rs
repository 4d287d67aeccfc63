use tracing::{debug, warn};

use crate::crc::Crc32;
use crate::error::YencError;
use crate::header::{YencHeader, YencPart, YencTrailer};

/// Everything a filter accumulates over one stream besides its line state.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub part_crc: Crc32,
    pub total_crc: Crc32,
    pub part_size: u64,
    pub header: Option<YencHeader>,
    pub part: Option<YencPart>,
    pub trailer: Option<YencTrailer>,
    /// Trailers seen so far.
    pub completed_parts: u32,
    /// The first part of the file passed through this session, so the
    /// total accumulator covers the whole file.
    pub from_first_part: bool,
    /// The caller seeded the total accumulator.
    pub crc_seeded: bool,
    pub issues: Vec<YencError>,
}

impl Session {
    /// Feed bytes that belong to the current part.
    pub fn absorb(&mut self, bytes: &[u8]) {
        self.part_crc.update(bytes);
        self.total_crc.update(bytes);
        self.part_size += bytes.len() as u64;
    }

    pub fn start_part(&mut self) {
        self.part_crc.reset();
        self.part_size = 0;
    }

    pub fn record(&mut self, issue: YencError) {
        warn!(%issue, "yEnc integrity condition");
        self.issues.push(issue);
    }

    pub fn begin(&mut self, header: YencHeader) {
        debug!(
            name = %header.name,
            size = header.size,
            part = ?header.part,
            total = ?header.total,
            "yEnc header"
        );
        if matches!(header.part, None | Some(1)) {
            self.from_first_part = true;
        }
        self.start_part();
        self.part = None;
        self.trailer = None;
        self.header = Some(header);
    }

    pub fn enter_part(&mut self, part: YencPart) {
        debug!(begin = part.begin, end = part.end, "yEnc part");
        if part.begin == 1 {
            self.from_first_part = true;
        }
        self.start_part();
        self.part = Some(part);
    }

    /// Close the current part and compare it against `trailer`.
    pub fn end(&mut self, trailer: YencTrailer) {
        debug!(
            size = trailer.size,
            part = ?trailer.part,
            decoded = self.part_size,
            "yEnc trailer"
        );
        self.completed_parts += 1;

        if let Some(expected) = trailer.pcrc32 {
            let actual = self.part_crc.value();
            if expected != actual {
                self.record(YencError::PartCrcMismatch { expected, actual });
            }
        }

        let covers_file = trailer.part.is_none() || self.from_first_part || self.crc_seeded;
        if let Some(expected) = trailer.crc32.filter(|_| covers_file) {
            let actual = self.total_crc.value();
            if expected != actual {
                self.record(YencError::TotalCrcMismatch { expected, actual });
            }
        }

        if trailer.size != self.part_size {
            self.record(YencError::SizeMismatch {
                expected: trailer.size,
                actual: self.part_size,
            });
        }

        self.trailer = Some(trailer);
    }

    /// True when a header or part line opened data that no trailer closed.
    pub fn is_open(&self) -> bool {
        self.header.is_some() || self.part.is_some()
    }

    pub fn reset(&mut self) {
        self.part_crc.reset();
        self.total_crc.reset();
        self.part_size = 0;
        self.header = None;
        self.part = None;
        self.trailer = None;
        self.completed_parts = 0;
        self.from_first_part = false;
        self.crc_seeded = false;
        self.issues.clear();
    }
}
