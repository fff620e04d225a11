use crate::bb::{ByteBuffer, ByteBufferMut};
use crate::error::{DecodeError, EncodeError};

/// Implemented by every type the Rust generator emits for a struct, message
/// or union. Only `encode_into` and `decode_from` need to be written; the
/// whole-buffer helpers come for free.
pub trait Record: Sized {
    fn encode_into(&self, bb: &mut ByteBufferMut) -> Result<(), EncodeError>;

    fn decode_from(bb: &mut ByteBuffer) -> Result<Self, DecodeError>;

    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut bb = ByteBufferMut::new();
        self.encode_into(&mut bb)?;
        Ok(bb.data())
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_from(&mut ByteBuffer::new(bytes))
    }
}
