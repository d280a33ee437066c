use crate::errors::{ErrorKind, ProtobufError};

/// Cursor over an in-memory buffer containing encoded data.
///
/// All reads are bounds checked and fail with [`ErrorKind::TruncatedInput`]
/// if they would go past the end of the buffer. Blocks and sub-readers
/// borrow from the underlying buffer rather than copying.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Number of messages being decoded which enclose this reader.
    depth: u32,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader {
            buf,
            pos: 0,
            depth: 0,
        }
    }

    /// Number of messages being decoded which enclose this reader's data.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    /// Return true if all bytes have been consumed.
    pub fn is_done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Offset of the next byte to be read.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_byte(&mut self) -> Result<u8, ProtobufError> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| ProtobufError::new(ErrorKind::TruncatedInput))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read the next `len` bytes.
    pub fn read_block(&mut self, len: usize) -> Result<&'a [u8], ProtobufError> {
        if len > self.remaining() {
            return Err(ErrorKind::TruncatedInput.into());
        }
        let block = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(block)
    }

    /// Read a fixed-size array of bytes.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtobufError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_block(N)?);
        Ok(array)
    }

    /// Return the bytes consumed since position `start`.
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.buf[start.min(self.pos)..self.pos]
    }

    /// Consume the next `len` bytes and return a reader which is limited to
    /// them.
    ///
    /// The sub-reader inherits this reader's nesting depth.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, ProtobufError> {
        let depth = self.depth;
        self.read_block(len).map(|buf| Reader { buf, pos: 0, depth })
    }
}
