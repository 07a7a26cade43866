//! Binary encoding and decoding traits for program images.
//!
//! All encoded data uses little-endian byte order.
//!
//! # Binary Format
//!
//! - Integers: little-endian, fixed-width
//! - `usize`: encoded as `u64` for portability
//! - `Vec<T>`: 8-byte length prefix followed by elements
//! - Arrays `[T; N]`: elements serialized sequentially without length prefix
//!
//! Structs get their implementations from `#[derive(BinaryCodec)]`.

use nibblevm_derive::Error;

/// Sink for writing encoded bytes.
pub trait EncodeSink {
    /// Writes the given bytes to the sink.
    fn write(&mut self, bytes: &[u8]);
}

/// Counts encoded bytes without allocating.
///
/// Used to reserve the exact capacity of an image up front.
pub struct SizeCounter {
    len: usize,
}

impl SizeCounter {
    pub fn new() -> Self {
        Self { len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

impl Default for SizeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeSink for SizeCounter {
    fn write(&mut self, bytes: &[u8]) {
        self.len += bytes.len();
    }
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Types that can be serialized to the image format.
pub trait Encode {
    /// Writes the binary representation to the given sink.
    fn encode<S: EncodeSink>(&self, out: &mut S);
}

/// Errors that can occur during decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before expected data was read.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// Data does not represent a valid value for the target type.
    #[error("invalid value")]
    InvalidValue,
    /// Length prefix exceeds the maximum allowed size.
    #[error("length prefix too large")]
    LengthOverflow,
}

/// Types that can be deserialized from the image format.
pub trait Decode: Sized {
    /// Reads a value from the front of `input`, advancing it past the consumed bytes.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;
}

/// Splits `n` bytes off the front of `input`.
fn read_bytes<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError::UnexpectedEof);
    }
    let (bytes, rest) = input.split_at(n);
    *input = rest;
    Ok(bytes)
}

impl Encode for u8 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self]);
    }
}

impl Decode for u8 {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(read_bytes(input, 1)?[0])
    }
}

impl Encode for u64 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&self.to_le_bytes());
    }
}

impl Decode for u64 {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let mut raw = [0u8; 8];
        let n = raw.len();
        raw.copy_from_slice(read_bytes(input, n)?);
        Ok(u64::from_le_bytes(raw))
    }
}

impl Encode for usize {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (*self as u64).encode(out);
    }
}

impl Decode for usize {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let v = u64::decode(input)?;
        usize::try_from(v).map_err(|_| DecodeError::LengthOverflow)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

/// Upper bound on decoded vector lengths so a corrupt prefix cannot exhaust memory.
const MAX_VEC_LEN: usize = 1 << 26;

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = usize::decode(input)?;
        if len > MAX_VEC_LEN {
            return Err(DecodeError::LengthOverflow);
        }

        let mut vec = Vec::with_capacity(len.min(input.len()));
        for _ in 0..len {
            vec.push(T::decode(input)?);
        }
        Ok(vec)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let mut vec = Vec::with_capacity(N);
        for _ in 0..N {
            vec.push(T::decode(input)?);
        }
        vec.try_into().map_err(|_| DecodeError::InvalidValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<T: Encode>(value: &T) -> Vec<u8> {
        let mut out = Vec::new();
        value.encode(&mut out);
        out
    }

    /// Decodes a value that must span all of `data`.
    fn decoded<T: Decode>(data: &[u8]) -> Result<T, DecodeError> {
        let mut input = data;
        let value = T::decode(&mut input)?;
        if !input.is_empty() {
            return Err(DecodeError::InvalidValue);
        }
        Ok(value)
    }

    #[test]
    fn size_counter_matches_encoded_length() {
        let data: Vec<u8> = vec![1, 2, 3, 4, 5];
        let mut counter = SizeCounter::new();
        data.encode(&mut counter);
        assert_eq!(counter.len(), 8 + 5);
        assert_eq!(counter.len(), encoded(&data).len());
    }

    #[test]
    fn u64_little_endian() {
        let bytes = encoded(&0x0102030405060708u64);
        assert_eq!(bytes, vec![8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(decoded::<u64>(&bytes).unwrap(), 0x0102030405060708);
    }

    #[test]
    fn usize_is_encoded_as_u64() {
        assert_eq!(encoded(&7usize), encoded(&7u64));
        assert_eq!(decoded::<usize>(&encoded(&7u64)).unwrap(), 7);
    }

    #[test]
    fn vec_encoding_format() {
        let bytes = encoded(&vec![0xAAu8, 0xBB, 0xCC]);
        assert_eq!(&bytes[0..8], &3u64.to_le_bytes());
        assert_eq!(&bytes[8..], &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn vec_length_overflow() {
        let bytes = encoded(&((MAX_VEC_LEN as u64) + 1));
        assert_eq!(decoded::<Vec<u8>>(&bytes), Err(DecodeError::LengthOverflow));
    }

    #[test]
    fn truncated_input_is_eof() {
        let mut bytes = encoded(&vec![7u8, 8, 9]);
        bytes.pop();
        assert_eq!(decoded::<Vec<u8>>(&bytes), Err(DecodeError::UnexpectedEof));
        assert_eq!(decoded::<u64>(&[1, 2, 3]), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn array_has_no_length_prefix() {
        assert_eq!(encoded(b"B4VM"), b"B4VM".to_vec());
        assert_eq!(decoded::<[u8; 4]>(b"B4VM").unwrap(), *b"B4VM");
    }

    #[test]
    fn decode_advances_input() {
        let mut input: &[u8] = &[1, 2, 3];
        assert_eq!(u8::decode(&mut input).unwrap(), 1);
        assert_eq!(input, &[2, 3]);
    }
}
