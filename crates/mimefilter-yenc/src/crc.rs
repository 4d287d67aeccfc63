use std::fmt;

use crc32fast::Hasher;

/// Register value of a fresh accumulator.
pub const CRC_INIT: u32 = 0xFFFF_FFFF;

/// Running CRC-32 (zlib/PNG polynomial) over a byte stream.
///
/// The register is kept in its raw, pre-complement form: it starts at
/// [`CRC_INIT`] and the checksum is read as its complement. That raw form is
/// what callers seed when resuming a multi-part decode.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    register: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    pub fn new() -> Self {
        Self { register: CRC_INIT }
    }

    /// Resume from a raw register value.
    pub fn from_raw(register: u32) -> Self {
        Self { register }
    }

    /// The raw, pre-complement register.
    pub fn raw(&self) -> u32 {
        self.register
    }

    /// The checksum of everything fed so far.
    pub fn value(&self) -> u32 {
        !self.register
    }

    pub fn update(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut hasher = Hasher::new_with_initial(!self.register);
        hasher.update(bytes);
        self.register = !hasher.finalize();
    }

    /// Restart from [`CRC_INIT`].
    pub fn reset(&mut self) {
        self.register = CRC_INIT;
    }
}

impl fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crc32({:08x})", self.value())
    }
}
