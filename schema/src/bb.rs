use std::str;

use uuid::Uuid;

use crate::error::{DecodeError, EncodeError};

/// Position of each GUID byte on the wire. The first three groups are stored
/// little-endian, matching the in-memory layout of a Windows `GUID`. The
/// permutation is its own inverse, so it serves both reading and writing.
const GUID_LAYOUT: [usize; 16] = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];

/// Low 62 bits of a date. The top two bits carry a .NET `DateTimeKind` flag
/// that some writers set; they are not part of the tick count.
const DATE_TICKS_MASK: u64 = 0x3fff_ffff_ffff_ffff;

/// A Bebop byte buffer meant for reading.
///
/// Example usage:
///
/// ```
/// let mut bb = brine_bebop_schema::ByteBuffer::new(&[4, 0, 0, 0, 240, 159, 141, 149, 57, 48]);
/// assert_eq!(bb.read_string(), Ok("🍕"));
/// assert_eq!(bb.read_u16(), Ok(12345));
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as the length of the slice when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes left after the current index.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Move the read position to an absolute index. Seeking to the very end is
    /// allowed; seeking past it is not.
    pub fn seek(&mut self, index: usize) -> Result<(), DecodeError> {
        if index > self.data.len() {
            return Err(DecodeError::InvalidSeek {
                index,
                len: self.data.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Try to read a boolean value starting at the current index. Any non-zero
    /// byte reads as `true`.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_byte()? != 0)
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        match self.data.get(self.index) {
            Some(&value) => {
                self.index += 1;
                Ok(value)
            }
            None => Err(DecodeError::UnexpectedEof {
                index: self.index,
                needed: 1,
            }),
        }
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                index: self.index,
                needed: len - self.remaining(),
            });
        }
        let value = &self.data[self.index..self.index + len];
        self.index += len;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    /// Try to read a 16-byte GUID stored in the mixed-endian wire layout.
    pub fn read_guid(&mut self) -> Result<Uuid, DecodeError> {
        let wire: [u8; 16] = self.take()?;
        let mut bytes = [0u8; 16];
        for (i, &from) in GUID_LAYOUT.iter().enumerate() {
            bytes[i] = wire[from];
        }
        Ok(Uuid::from_bytes(bytes))
    }

    /// Try to read a date as a 64-bit tick count, dropping the kind bits.
    pub fn read_date(&mut self) -> Result<i64, DecodeError> {
        Ok((self.read_u64()? & DATE_TICKS_MASK) as i64)
    }

    /// Try to read an element count for an array, map or string.
    pub fn read_length(&mut self) -> Result<usize, DecodeError> {
        Ok(self.read_u32()? as usize)
    }

    /// Try to read a length-prefixed UTF-8 string. The string aliases the
    /// underlying memory.
    pub fn read_string(&mut self) -> Result<&'a str, DecodeError> {
        let len = self.read_length()?;
        let start = self.index;
        let bytes = self.read_bytes(len)?;
        str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { index: start })
    }

    /// Try to read a length-prefixed byte array.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_length()?;
        self.read_bytes(len)
    }

    /// Try to read the length prefix of a message body. The body must fit in
    /// what is left of the buffer.
    pub fn read_message_length(&mut self) -> Result<usize, DecodeError> {
        let length = self.read_length()?;
        if length > self.remaining() {
            return Err(DecodeError::MessageLengthPastEnd {
                length,
                remaining: self.remaining(),
            });
        }
        Ok(length)
    }

    /// Fails once more than `length` bytes have been read since `start`, the
    /// index just after a message's length prefix.
    pub fn check_message_body(&self, start: usize, length: usize) -> Result<(), DecodeError> {
        let consumed = self.index - start;
        if consumed > length {
            return Err(DecodeError::MessageBodyOverrun { length, consumed });
        }
        Ok(())
    }
}

#[cfg(test)]
fn eof(index: usize, needed: usize) -> DecodeError {
    DecodeError::UnexpectedEof { index, needed }
}

#[test]
fn read_bool() {
    let read = |bytes| ByteBuffer::new(bytes).read_bool();
    assert_eq!(read(&[]), Err(eof(0, 1)));
    assert_eq!(read(&[0]), Ok(false));
    assert_eq!(read(&[1]), Ok(true));
    assert_eq!(read(&[2]), Ok(true));
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(read(&[]), Err(eof(0, 1)));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[254]), Ok(254));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let read = |bytes, len| ByteBuffer::new(bytes).read_bytes(len);
    assert_eq!(read(&[], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[], 1), Err(eof(0, 1)));
    assert_eq!(read(&[0], 1), Ok(vec![0].as_slice()));
    assert_eq!(read(&[0], 3), Err(eof(0, 2)));

    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok(vec![1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok(vec![4, 5].as_slice()));
    assert_eq!(bb.read_bytes(1), Err(eof(5, 1)));
}

#[test]
fn read_fixed_width_integers() {
    assert_eq!(ByteBuffer::new(&[0x39, 0x30]).read_u16(), Ok(12345));
    assert_eq!(ByteBuffer::new(&[0xff, 0xff]).read_i16(), Ok(-1));
    assert_eq!(ByteBuffer::new(&[0x01, 0x02, 0x03, 0x04]).read_u32(), Ok(0x0403_0201));
    assert_eq!(ByteBuffer::new(&[0xfe, 0xff, 0xff, 0xff]).read_i32(), Ok(-2));
    assert_eq!(
        ByteBuffer::new(&[1, 2, 3, 4, 5, 6, 7, 8]).read_u64(),
        Ok(0x0807_0605_0403_0201)
    );
    assert_eq!(ByteBuffer::new(&[0xff; 8]).read_i64(), Ok(-1));
    assert_eq!(ByteBuffer::new(&[1, 2, 3]).read_u32(), Err(eof(0, 1)));
}

#[test]
fn read_date() {
    let ticks: i64 = 637_000_000_000_000_000;
    assert_eq!(ByteBuffer::new(&ticks.to_le_bytes()).read_date(), Ok(ticks));

    // UTC and local kind flags in the top bits.
    let utc = (ticks as u64 | 0x4000_0000_0000_0000).to_le_bytes();
    assert_eq!(ByteBuffer::new(&utc).read_date(), Ok(ticks));
    let local = (ticks as u64 | 0x8000_0000_0000_0000).to_le_bytes();
    assert_eq!(ByteBuffer::new(&local).read_date(), Ok(ticks));
    assert_eq!(ByteBuffer::new(&[0; 7]).read_date(), Err(eof(0, 1)));
}

#[test]
fn read_floats() {
    assert_eq!(ByteBuffer::new(&[0, 0, 0x80, 0x3f]).read_f32(), Ok(1.0));
    assert_eq!(
        ByteBuffer::new(&[0, 0, 0, 0, 0, 0, 0, 0x40]).read_f64(),
        Ok(2.0)
    );
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert_eq!(read(&[]), Err(eof(0, 4)));
    assert_eq!(read(&[0, 0, 0, 0]), Ok(""));
    assert_eq!(read(&[1, 0, 0, 0]), Err(eof(4, 1)));
    assert_eq!(read(&[3, 0, 0, 0, 97, 98, 99]), Ok("abc"));
    assert_eq!(read(&[4, 0, 0, 0, 240, 159, 141, 149]), Ok("🍕"));
    assert_eq!(
        read(&[2, 0, 0, 0, 237, 160]),
        Err(DecodeError::InvalidUtf8 { index: 4 })
    );
}

#[test]
fn read_guid() {
    let mut bb = ByteBuffer::new(&[
        0x04, 0x03, 0x02, 0x01, 0x06, 0x05, 0x08, 0x07, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f, 0x10,
    ]);
    assert_eq!(
        bb.read_guid().map(|g| g.to_string()),
        Ok("01020304-0506-0708-090a-0b0c0d0e0f10".to_owned())
    );
}

#[test]
fn read_message_length() {
    assert_eq!(
        ByteBuffer::new(&[2, 0, 0, 0, 9, 9]).read_message_length(),
        Ok(2)
    );
    assert_eq!(
        ByteBuffer::new(&[3, 0, 0, 0, 9, 9]).read_message_length(),
        Err(DecodeError::MessageLengthPastEnd {
            length: 3,
            remaining: 2
        })
    );
}

#[test]
fn seek() {
    let mut bb = ByteBuffer::new(&[1, 2, 3]);
    assert_eq!(bb.seek(3), Ok(()));
    assert_eq!(bb.remaining(), 0);
    assert_eq!(bb.seek(4), Err(DecodeError::InvalidSeek { index: 4, len: 3 }));
    assert_eq!(bb.seek(1), Ok(()));
    assert_eq!(bb.read_byte(), Ok(2));
}

/// A Bebop byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = brine_bebop_schema::ByteBufferMut::new();
/// bb.write_string("🍕").unwrap();
/// bb.write_u16(12345);
/// assert_eq!(bb.data(), [4, 0, 0, 0, 240, 159, 141, 149, 57, 48]);
/// ```
///
#[derive(Debug, Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a boolean value to the end of the buffer.
    pub fn write_bool(&mut self, value: bool) {
        self.data.push(if value { 1 } else { 0 });
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer, without a length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a GUID in the mixed-endian wire layout.
    pub fn write_guid(&mut self, value: &Uuid) {
        let bytes = value.as_bytes();
        for &from in GUID_LAYOUT.iter() {
            self.data.push(bytes[from]);
        }
    }

    /// Write a date as a raw 64-bit tick count.
    pub fn write_date(&mut self, ticks: i64) {
        self.write_i64(ticks);
    }

    /// Write an element count for an array, map or string.
    pub fn write_length(&mut self, len: usize) -> Result<(), EncodeError> {
        let len = u32::try_from(len).map_err(|_| EncodeError::LengthOverflow(len))?;
        self.write_u32(len);
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string. There is no null terminator.
    pub fn write_string(&mut self, value: &str) -> Result<(), EncodeError> {
        self.write_length(value.len())?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Write a length-prefixed byte array.
    pub fn write_byte_array(&mut self, value: &[u8]) -> Result<(), EncodeError> {
        self.write_length(value.len())?;
        self.write_bytes(value);
        Ok(())
    }

    /// Reserve four bytes for a message length prefix and return their
    /// position, to be patched by [fill_message_length](#method.fill_message_length).
    pub fn reserve_message_length(&mut self) -> usize {
        let position = self.data.len();
        self.data.extend_from_slice(&[0, 0, 0, 0]);
        position
    }

    /// Patch a reserved length prefix with the number of bytes in the message
    /// body.
    pub fn fill_message_length(&mut self, position: usize, length: usize) -> Result<(), EncodeError> {
        let length = u32::try_from(length).map_err(|_| EncodeError::LengthOverflow(length))?;
        self.data[position..position + 4].copy_from_slice(&length.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_bool() {
    assert_eq!(write_once(|bb| bb.write_bool(false)), [0]);
    assert_eq!(write_once(|bb| bb.write_bool(true)), [1]);
}

#[test]
fn write_bytes() {
    let mut bb = ByteBufferMut::new();
    bb.write_bytes(&[1, 2, 3]);
    bb.write_bytes(&[]);
    bb.write_bytes(&[4, 5]);
    assert_eq!(bb.data(), [1, 2, 3, 4, 5]);
}

#[test]
fn write_fixed_width_integers() {
    assert_eq!(write_once(|bb| bb.write_u16(12345)), [0x39, 0x30]);
    assert_eq!(write_once(|bb| bb.write_i16(-1)), [0xff, 0xff]);
    assert_eq!(write_once(|bb| bb.write_u32(0x0403_0201)), [1, 2, 3, 4]);
    assert_eq!(write_once(|bb| bb.write_i32(-2)), [0xfe, 0xff, 0xff, 0xff]);
    assert_eq!(
        write_once(|bb| bb.write_u64(0x0807_0605_0403_0201)),
        [1, 2, 3, 4, 5, 6, 7, 8]
    );
    assert_eq!(write_once(|bb| bb.write_i64(-1)), [0xff; 8]);
    assert_eq!(write_once(|bb| bb.write_date(1)), [1, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn write_floats() {
    assert_eq!(write_once(|bb| bb.write_f32(1.0)), [0, 0, 0x80, 0x3f]);
    assert_eq!(write_once(|bb| bb.write_f64(2.0)), [0, 0, 0, 0, 0, 0, 0, 0x40]);
}

#[test]
fn write_string() {
    assert_eq!(write_once(|bb| bb.write_string("").unwrap()), [0, 0, 0, 0]);
    assert_eq!(
        write_once(|bb| bb.write_string("abc").unwrap()),
        [3, 0, 0, 0, 97, 98, 99]
    );
    assert_eq!(
        write_once(|bb| bb.write_string("🍕").unwrap()),
        [4, 0, 0, 0, 240, 159, 141, 149]
    );
}

#[test]
fn write_guid() {
    let guid = Uuid::parse_str("01020304-0506-0708-090a-0b0c0d0e0f10").unwrap();
    let mut bb = ByteBufferMut::new();
    bb.write_guid(&guid);
    let data = bb.data();
    assert_eq!(
        data,
        [4, 3, 2, 1, 6, 5, 8, 7, 9, 10, 11, 12, 13, 14, 15, 16]
    );
    assert_eq!(ByteBuffer::new(&data).read_guid(), Ok(guid));
}

#[test]
fn write_message_length() {
    let mut bb = ByteBufferMut::new();
    bb.write_byte(0xaa);
    let position = bb.reserve_message_length();
    let start = bb.len();
    bb.write_byte(1);
    bb.write_byte(0);
    bb.fill_message_length(position, bb.len() - start).unwrap();
    assert_eq!(bb.data(), [0xaa, 2, 0, 0, 0, 1, 0]);
}
