//! ## procam-protocol::parcel
//! Little-endian primitives every callback message is assembled from.
//!
//! Each field starts on a 4-byte boundary; strings and blobs are padded with
//! zeroes up to the next boundary. The reader checks every length against the
//! bytes it still holds before consuming anything, and hands out variable
//! regions as zero-copy `Bytes` slices of the original message.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;

/// Alignment of every field on the wire.
pub const PARCEL_ALIGNMENT: usize = 4;

/// Number of zero bytes needed after `len` bytes to reach the next boundary.
#[inline]
pub fn pad_len(len: usize) -> usize {
    (PARCEL_ALIGNMENT - len % PARCEL_ALIGNMENT) % PARCEL_ALIGNMENT
}

/// Append-only builder for a message body.
#[derive(Debug, Default)]
pub struct ParcelWriter {
    buf: BytesMut,
}

impl ParcelWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    /// Writes a UTF-16 string: unit count, units, NUL terminator, padding.
    /// `None` is written as the null marker `-1` with no body.
    pub fn write_string16(&mut self, value: Option<&str>) {
        let Some(value) = value else {
            self.write_i32(-1);
            return;
        };
        let units: Vec<u16> = value.encode_utf16().collect();
        debug_assert!(units.len() < i32::MAX as usize);
        self.write_i32(units.len() as i32);
        for unit in &units {
            self.buf.put_u16_le(*unit);
        }
        self.buf.put_u16_le(0);
        self.pad((units.len() + 1) * 2);
    }

    /// Writes an i32 length prefix followed by the padded bytes.
    ///
    /// Blobs longer than `i32::MAX` bytes cannot be represented on the wire.
    pub fn write_blob(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= i32::MAX as usize);
        self.write_i32(data.len() as i32);
        self.write_raw(data);
    }

    /// Writes bytes with no length prefix, padded to the next boundary.
    pub fn write_raw(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
        self.pad(data.len());
    }

    fn pad(&mut self, written: usize) {
        self.buf.put_bytes(0, pad_len(written));
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Cursor over a received message.
#[derive(Debug, Clone)]
pub struct ParcelReader {
    buf: Bytes,
    consumed: usize,
}

impl ParcelReader {
    pub fn new(data: Bytes) -> Self {
        Self {
            buf: data,
            consumed: 0,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Offset of the next unread byte from the start of the message.
    pub fn position(&self) -> usize {
        self.consumed
    }

    fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        let available = self.buf.remaining();
        if available < needed {
            return Err(DecodeError::Truncated { needed, available });
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        self.ensure(len)?;
        self.consumed += len;
        Ok(self.buf.split_to(len))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.ensure(4)?;
        self.consumed += 4;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.ensure(4)?;
        self.consumed += 4;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        self.ensure(8)?;
        self.consumed += 8;
        Ok(self.buf.get_i64_le())
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        self.ensure(8)?;
        self.consumed += 8;
        Ok(self.buf.get_u64_le())
    }

    /// Reads a string written by [`ParcelWriter::write_string16`].
    pub fn read_string16(&mut self, field: &'static str) -> Result<Option<String>, DecodeError> {
        let declared = self.read_i32()?;
        if declared == -1 {
            return Ok(None);
        }
        let units =
            usize::try_from(declared).map_err(|_| DecodeError::invalid_length(field, declared))?;
        let body = units
            .checked_add(1)
            .and_then(|n| n.checked_mul(2))
            .ok_or_else(|| DecodeError::invalid_length(field, declared))?;
        let padded = body
            .checked_add(pad_len(body))
            .ok_or_else(|| DecodeError::invalid_length(field, declared))?;

        let raw = self.take(padded)?;
        let (text, terminator) = raw.split_at(units * 2);
        if terminator[..2] != [0, 0] {
            return Err(DecodeError::InvalidString(field));
        }
        let code_units = text
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
        char::decode_utf16(code_units)
            .collect::<Result<String, _>>()
            .map(Some)
            .map_err(|_| DecodeError::InvalidString(field))
    }

    /// Reads a length-prefixed blob of at most `max_len` bytes.
    ///
    /// The returned slice shares storage with the message.
    pub fn read_blob(&mut self, field: &'static str, max_len: usize) -> Result<Bytes, DecodeError> {
        let declared = self.read_i32()?;
        let len =
            usize::try_from(declared).map_err(|_| DecodeError::invalid_length(field, declared))?;
        if len > max_len {
            return Err(DecodeError::invalid_length(field, declared));
        }
        let padded = len
            .checked_add(pad_len(len))
            .ok_or_else(|| DecodeError::invalid_length(field, declared))?;
        let mut blob = self.take(padded)?;
        blob.truncate(len);
        Ok(blob)
    }

    /// Reads `count` fixed-size records as one contiguous region.
    ///
    /// The byte size is computed with checked arithmetic and compared with
    /// the remaining input before anything is consumed.
    pub fn read_array(
        &mut self,
        field: &'static str,
        count: usize,
        record_size: usize,
    ) -> Result<Bytes, DecodeError> {
        let len = count
            .checked_mul(record_size)
            .ok_or_else(|| DecodeError::invalid_length(field, count))?;
        let padded = len
            .checked_add(pad_len(len))
            .ok_or_else(|| DecodeError::invalid_length(field, count))?;
        let mut region = self.take(padded)?;
        region.truncate(len);
        Ok(region)
    }

    /// Succeeds only if every byte of the message has been consumed.
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            left => Err(DecodeError::invalid_length("trailing bytes", left)),
        }
    }
}
