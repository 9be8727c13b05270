//! MSB-first bit packer.

/// Packs fields of arbitrary bit width into bytes, most significant bit first.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u8,
    filled: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with room for `bytes` output bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            ..Self::default()
        }
    }

    /// Append the `width` least significant bits of `value`, MSB first.
    ///
    /// # Panics
    ///
    /// Panics if `width` exceeds 64.
    pub fn put(&mut self, width: u32, value: u64) {
        assert!(width <= 64, "bit field width {width} exceeds 64");
        for shift in (0..width).rev() {
            let bit = ((value >> shift) & 1) as u8;
            self.acc = (self.acc << 1) | bit;
            self.filled += 1;
            if self.filled == 8 {
                self.bytes.push(self.acc);
                self.acc = 0;
                self.filled = 0;
            }
        }
    }

    /// Zero-pad to the next byte boundary and return the packed bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.bytes.push(self.acc << (8 - self.filled));
        }
        self.bytes
    }
}
