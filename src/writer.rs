//! Output buffers for encoded messages.
//!
//! Length-delimited values (nested messages, packed arrays, strings) are
//! prefixed by their length. For nested messages the length is not known
//! until the content has been written, and since the prefix is itself
//! variable-width the content cannot be written at a fixed offset either.
//!
//! [`NestedWriter`] solves this in a single pass. Content is appended to one
//! scratch buffer and an index of `(offset, len)` segments records the order
//! in which buffer regions should be emitted. When a nested block ends its
//! length is appended to the scratch buffer, and the index slot reserved
//! when the block began is pointed at it, so that the length is emitted
//! before the content. [`NestedWriter::finish`] then replays the segments.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::errors::{ErrorKind, ProtobufError};
use crate::varint::write_length;

/// Sink which accepts bytes in order.
pub trait Writable {
    fn write_byte(&mut self, byte: u8);

    fn write_block(&mut self, block: &[u8]);
}

impl Writable for Vec<u8> {
    fn write_byte(&mut self, byte: u8) {
        self.push(byte);
    }

    fn write_block(&mut self, block: &[u8]) {
        self.extend_from_slice(block);
    }
}

/// Sink which can additionally write length-prefixed blocks whose length
/// is not known in advance.
///
/// Each call to `begin` must be balanced by a call to `end`. The bytes
/// written in between are emitted after a varint holding their length.
pub trait NestedWrite: Writable {
    fn begin(&mut self);

    fn end(&mut self) -> Result<(), ProtobufError>;
}

/// State saved when a nested block begins.
#[derive(Clone, Copy, Debug)]
struct Level {
    /// Number of bytes committed in the parent block.
    parent_written: usize,
    /// Index slot reserved for the length prefix.
    prefix_slot: usize,
}

/// Default capacity of the shared writer's scratch buffer.
pub const DEFAULT_WRITER_CAPACITY: usize = 16384;

/// Single-pass writer for data with nested length-prefixed blocks.
///
/// The writer keeps a scratch buffer of `capacity` bytes. Larger messages
/// grow the buffer temporarily, and it is shrunk back when the writer is
/// reset.
#[derive(Debug)]
pub struct NestedWriter {
    buf: Vec<u8>,
    capacity: usize,
    /// Segments of `buf` in output order.
    index: Vec<(usize, usize)>,
    levels: SmallVec<[Level; 8]>,
    /// Bytes committed to the index in the current block.
    written: usize,
    /// Bytes at the end of `buf` not yet added to the index.
    uncommitted: usize,
}

impl NestedWriter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WRITER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        NestedWriter {
            buf: Vec::with_capacity(capacity),
            capacity,
            index: Vec::new(),
            levels: SmallVec::new(),
            written: 0,
            uncommitted: 0,
        }
    }

    /// Return true if nothing has been written since the last reset.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty() && self.levels.is_empty()
    }

    /// Discard all written data and open blocks.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.buf.shrink_to(self.capacity);
        self.index.clear();
        self.levels.clear();
        self.written = 0;
        self.uncommitted = 0;
    }

    /// Total size of the output, if `finish` were called now.
    pub fn len(&self) -> usize {
        self.written + self.uncommitted
    }

    /// Emit the written data and reset the writer.
    ///
    /// `collect` is called with the total length of the output and an
    /// iterator over the output's segments, in order.
    ///
    /// Fails with [`ErrorKind::WriterStateMisuse`] if a block was begun but
    /// not ended. The writer is left unchanged in that case.
    pub fn finish<T>(
        &mut self,
        collect: impl FnOnce(usize, Segments<'_>) -> T,
    ) -> Result<T, ProtobufError> {
        if !self.levels.is_empty() {
            return Err(ErrorKind::WriterStateMisuse.into());
        }
        self.commit();
        let segments = Segments {
            buf: &self.buf,
            index: self.index.iter(),
        };
        let output = collect(self.written, segments);
        self.clear();
        Ok(output)
    }

    /// Emit the written data into a new vector and reset the writer.
    pub fn finish_to_vec(&mut self) -> Result<Vec<u8>, ProtobufError> {
        self.finish(|len, segments| {
            let mut out = Vec::with_capacity(len);
            for segment in segments {
                out.extend_from_slice(segment);
            }
            out
        })
    }

    /// Add uncommitted bytes to the index as a new segment.
    fn commit(&mut self) {
        if self.uncommitted > 0 {
            self.index
                .push((self.buf.len() - self.uncommitted, self.uncommitted));
            self.written += self.uncommitted;
            self.uncommitted = 0;
        }
    }
}

impl Default for NestedWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writable for NestedWriter {
    fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
        self.uncommitted += 1;
    }

    fn write_block(&mut self, block: &[u8]) {
        self.buf.extend_from_slice(block);
        self.uncommitted += block.len();
    }
}

impl NestedWrite for NestedWriter {
    fn begin(&mut self) {
        self.commit();
        self.levels.push(Level {
            parent_written: self.written,
            prefix_slot: self.index.len(),
        });
        self.index.push((0, 0));
        self.written = 0;
    }

    fn end(&mut self) -> Result<(), ProtobufError> {
        self.commit();
        let Level {
            parent_written,
            prefix_slot,
        } = self
            .levels
            .pop()
            .ok_or_else(|| ProtobufError::new(ErrorKind::WriterStateMisuse))?;

        let content_len = self.written;
        let prefix_start = self.buf.len();
        write_length(self, content_len);
        let prefix_len = self.uncommitted;
        self.index[prefix_slot] = (prefix_start, prefix_len);

        self.written = parent_written + prefix_len + content_len;
        self.uncommitted = 0;
        Ok(())
    }
}

/// Iterator over the output segments of a [`NestedWriter`].
pub struct Segments<'a> {
    buf: &'a [u8],
    index: std::slice::Iter<'a, (usize, usize)>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let buf = self.buf;
        self.index.next().map(|&(start, len)| &buf[start..start + len])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.index.size_hint()
    }
}

thread_local! {
    static SHARED_WRITER: RefCell<Option<NestedWriter>> = const { RefCell::new(None) };
}

/// Clears the shared writer if an encode did not finish, so the next use
/// starts from a clean state. This also runs when unwinding from a panic.
struct ResetGuard<'a> {
    writer: &'a mut NestedWriter,
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        if !self.writer.is_empty() {
            tracing::debug!(
                pending_bytes = self.writer.buf.len(),
                "resetting shared writer after incomplete encode"
            );
            self.writer.clear();
        }
    }
}

/// Run `write` with this thread's shared writer and return the output.
///
/// The shared writer keeps its scratch buffer of [`DEFAULT_WRITER_CAPACITY`]
/// bytes between calls, avoiding an allocation per encode. Callers which
/// want a different capacity can own a [`NestedWriter`] instead, see
/// [`EncodeMessage::encode_with`](crate::EncodeMessage::encode_with).
///
/// Fails with [`ErrorKind::WriterInUse`] if called from inside another
/// `with_shared_writer` call on the same thread. If `write` fails or panics
/// the writer is cleared before the error propagates.
pub fn with_shared_writer<F>(write: F) -> Result<Vec<u8>, ProtobufError>
where
    F: FnOnce(&mut NestedWriter) -> Result<(), ProtobufError>,
{
    SHARED_WRITER.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            return Err(ErrorKind::WriterInUse.into());
        };
        let writer = slot.get_or_insert_with(NestedWriter::new);
        if !writer.is_empty() {
            return Err(ErrorKind::WriterInUse.into());
        }

        let guard = ResetGuard { writer };
        write(&mut *guard.writer)?;
        guard.writer.finish_to_vec()
    })
}

#[cfg(test)]
mod tests {
    use protowire_testing::{TestCases, to_hex};

    use super::{NestedWrite, NestedWriter, Writable, with_shared_writer};
    use crate::errors::ErrorKind;
    use crate::varint::write_length;

    /// Write a string of `w` (a byte) and parenthesized nested blocks.
    fn write_pattern<W: NestedWrite>(w: &mut W, pattern: &str) {
        for (i, ch) in pattern.chars().enumerate() {
            match ch {
                '(' => w.begin(),
                ')' => w.end().unwrap(),
                _ => w.write_byte(i as u8),
            }
        }
    }

    /// Reference implementation which computes lengths with a second pass.
    fn two_pass_pattern(pattern: &str) -> Vec<u8> {
        fn block(pattern: &[(usize, char)], pos: &mut usize) -> Vec<u8> {
            let mut out = Vec::new();
            while *pos < pattern.len() {
                let (i, ch) = pattern[*pos];
                *pos += 1;
                match ch {
                    '(' => {
                        let inner = block(pattern, pos);
                        write_length(&mut out, inner.len());
                        out.extend(inner);
                    }
                    ')' => return out,
                    _ => out.push(i as u8),
                }
            }
            out
        }
        let chars: Vec<_> = pattern.chars().enumerate().collect();
        block(&chars, &mut 0)
    }

    #[test]
    fn test_nested_writer_matches_two_pass() {
        #[derive(Debug)]
        struct Case {
            pattern: String,
        }

        let long = "w".repeat(200);
        let cases = [
            "",
            "www",
            "()",
            "w(ww)w",
            "(((w)))",
            "w(w(w)w)w(w)",
            "()()(())",
        ]
        .into_iter()
        .map(String::from)
        .chain([
            format!("w({})w", long),
            format!("({}({}))", long, long),
        ])
        .map(|pattern| Case { pattern });

        cases.test_each(|case| {
            let mut w = NestedWriter::with_capacity(16);
            write_pattern(&mut w, &case.pattern);
            let len = w.len();
            let out = w.finish_to_vec().unwrap();
            assert_eq!(out, two_pass_pattern(&case.pattern));
            assert_eq!(out.len(), len);
            assert!(w.is_empty());
        })
    }

    #[test]
    fn test_nested_lengths() {
        let mut w = NestedWriter::new();
        w.write_block(&[0xaa; 32]);
        w.begin();
        w.write_block(&[0xbb; 30]);
        w.end().unwrap();
        let out = w.finish_to_vec().unwrap();
        assert_eq!(out.len(), 32 + 1 + 30);
        assert_eq!(out[32], 30);

        w.begin();
        w.end().unwrap();
        assert_eq!(to_hex(&w.finish_to_vec().unwrap()), "00");
    }

    #[test]
    fn test_finish_segments() {
        let mut w = NestedWriter::new();
        w.write_byte(1);
        w.begin();
        w.write_byte(2);
        w.end().unwrap();
        let (len, segments) = w
            .finish(|len, segments| (len, segments.map(|s| s.to_vec()).collect::<Vec<_>>()))
            .unwrap();
        assert_eq!(len, 3);
        assert_eq!(segments, [vec![1], vec![1], vec![2]]);
    }

    #[test]
    fn test_writer_misuse() {
        let mut w = NestedWriter::new();
        let err = w.end().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::WriterStateMisuse);

        w.begin();
        w.write_byte(1);
        let err = w.finish_to_vec().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::WriterStateMisuse);
        assert!(!w.is_empty());

        w.clear();
        assert!(w.is_empty());
        assert_eq!(w.finish_to_vec().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_writer_grows_and_shrinks() {
        let mut w = NestedWriter::with_capacity(8);
        w.begin();
        w.write_block(&[7; 1000]);
        w.end().unwrap();
        let out = w.finish_to_vec().unwrap();
        assert_eq!(out.len(), 1002);
        assert!(w.buf.capacity() < 1000);
    }

    #[test]
    fn test_shared_writer() {
        let out = with_shared_writer(|w| {
            w.begin();
            w.end()
        })
        .unwrap();
        assert_eq!(out, [0]);

        // The writer is reusable.
        let out = with_shared_writer(|w| {
            w.write_block(b"abc");
            Ok(())
        })
        .unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_shared_writer_reentrant_use() {
        let result = with_shared_writer(|w| {
            w.write_byte(1);
            let inner = with_shared_writer(|_| Ok(()));
            assert_eq!(inner.unwrap_err().kind(), &ErrorKind::WriterInUse);
            Ok(())
        });
        assert_eq!(result.unwrap(), [1]);
    }

    #[test]
    fn test_shared_writer_reset_after_error() {
        let result = with_shared_writer(|w| {
            w.begin();
            w.write_byte(1);
            Err(ErrorKind::ValueTypeMismatch.into())
        });
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::ValueTypeMismatch);

        // Unbalanced `begin` is reported by `finish`, and also clears.
        let result = with_shared_writer(|w| {
            w.begin();
            Ok(())
        });
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::WriterStateMisuse);

        let out = with_shared_writer(|w| {
            w.write_byte(5);
            Ok(())
        })
        .unwrap();
        assert_eq!(out, [5]);
    }

    #[test]
    fn test_shared_writer_reset_after_panic() {
        let result = std::panic::catch_unwind(|| {
            let _ = with_shared_writer(|w| {
                w.write_byte(1);
                panic!("encode failed");
            });
        });
        assert!(result.is_err());

        let out = with_shared_writer(|w| {
            w.write_byte(2);
            Ok(())
        })
        .unwrap();
        assert_eq!(out, [2]);
    }

    #[test]
    fn test_shared_writer_threads() {
        use rayon::prelude::*;

        let outputs: Vec<_> = (0..64u8)
            .into_par_iter()
            .map(|i| {
                with_shared_writer(|w| {
                    w.begin();
                    w.write_block(&vec![i; i as usize]);
                    w.end()
                })
                .unwrap()
            })
            .collect();

        for (i, out) in outputs.iter().enumerate() {
            assert_eq!(out[0] as usize, i);
            assert_eq!(out.len(), i + 1);
        }
    }
}
