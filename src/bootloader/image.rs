//! Fixed-capacity staging buffer for an incoming image

/// Value of erased flash, left in place of bytes that never arrived
pub const GAP: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub capacity: usize,
}

pub struct ImageBuffer<const N: usize> {
    data: [u8; N],
    len: usize,
    limit: usize,
}

impl<const N: usize> ImageBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: [GAP; N],
            len: 0,
            limit: N,
        }
    }

    /// Empties the buffer for a new session, accepting at most `limit` bytes
    /// (clamped to the buffer's own capacity).
    pub fn begin(&mut self, limit: usize) {
        self.data[..self.len].fill(GAP);
        self.len = 0;
        self.limit = limit.min(N);
    }

    /// Places `byte` at `offset`. Skipped offsets keep [`GAP`].
    pub fn store(&mut self, offset: usize, byte: u8) -> Result<(), Overflow> {
        self.skip(offset)?;
        self.data[offset] = byte;
        Ok(())
    }

    /// Accounts for a byte at `offset` whose value was lost.
    pub fn skip(&mut self, offset: usize) -> Result<(), Overflow> {
        if offset >= self.limit {
            return Err(Overflow {
                capacity: self.limit,
            });
        }
        self.len = self.len.max(offset + 1);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.limit
    }
}

impl<const N: usize> Default for ImageBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
