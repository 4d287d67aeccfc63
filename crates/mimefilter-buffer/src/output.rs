use std::fmt;
use std::ops::Deref;

/// Bytes produced by one filter invocation.
///
/// An output either borrows the caller's input (pass-through filters) or a
/// slice of the filter's own output area. In the latter case the area may
/// carry `prespace` bytes of writable slack before the payload, which lets a
/// downstream consumer [`prepend`](Output::prepend) a header without copying
/// the payload. Correctness never depends on the slack being present.
pub struct Output<'a> {
    region: Region<'a>,
}

enum Region<'a> {
    Shared(&'a [u8]),
    Owned { buf: &'a mut [u8], start: usize },
}

impl<'a> Output<'a> {
    /// An output that borrows `bytes` verbatim. Carries no prespace.
    pub fn shared(bytes: &'a [u8]) -> Self {
        Self {
            region: Region::Shared(bytes),
        }
    }

    /// An output over `buf`, whose first `prespace` bytes are writable slack.
    pub fn owned(buf: &'a mut [u8], prespace: usize) -> Self {
        debug_assert!(prespace <= buf.len(), "prespace exceeds output area");
        let start = prespace.min(buf.len());
        Self {
            region: Region::Owned { buf, start },
        }
    }

    /// An empty output.
    pub fn empty() -> Self {
        Self::shared(&[])
    }

    /// The produced payload.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.region {
            Region::Shared(bytes) => bytes,
            Region::Owned { buf, start } => &buf[*start..],
        }
    }

    /// Bytes of writable slack available before the payload.
    pub fn prespace(&self) -> usize {
        match &self.region {
            Region::Shared(_) => 0,
            Region::Owned { start, .. } => *start,
        }
    }

    /// Write `header` into the slack directly before the payload.
    ///
    /// Returns `false` (and leaves the output untouched) when the slack is
    /// smaller than `header`; callers then fall back to copying.
    pub fn prepend(&mut self, header: &[u8]) -> bool {
        if header.is_empty() {
            return true;
        }
        match &mut self.region {
            Region::Shared(_) => false,
            Region::Owned { buf, start } => {
                if header.len() > *start {
                    return false;
                }
                let new_start = *start - header.len();
                buf[new_start..*start].copy_from_slice(header);
                *start = new_start;
                true
            }
        }
    }

    /// Consume the output, keeping the borrow of the payload.
    pub fn into_bytes(self) -> &'a [u8] {
        match self.region {
            Region::Shared(bytes) => bytes,
            Region::Owned { buf, start } => {
                let buf: &'a [u8] = buf;
                &buf[start..]
            }
        }
    }
}

impl Deref for Output<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for Output<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Output<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("len", &self.len())
            .field("prespace", &self.prespace())
            .finish()
    }
}
