//! Length-prefixed little-endian encoding of arbitrary-precision integers, as they travel between client and servers.
//!
//! Every count and length is a `u64` in little-endian byte order, every integer is its two's-complement little-endian byte string.

use num_bigint::BigInt;

const LEN_BYTE_LEN: usize = std::mem::size_of::<u64>();

#[inline]
pub fn write_len(buf: &mut Vec<u8>, len: usize) {
    buf.extend_from_slice(&(len as u64).to_le_bytes());
}

#[inline]
pub fn write_int(buf: &mut Vec<u8>, value: &BigInt) {
    let bytes = value.to_signed_bytes_le();

    write_len(buf, bytes.len());
    buf.extend_from_slice(&bytes);
}

/// Cursor over a serialized byte string. Errors are plain messages, callers wrap them into the fitting `BPIRError` variant.
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, offset: 0 }
    }

    fn take(&mut self, num_bytes: usize) -> Result<&'a [u8], String> {
        let end = self
            .offset
            .checked_add(num_bytes)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| format!("need {} bytes at offset {}, but only {} bytes in total", num_bytes, self.offset, self.bytes.len()))?;

        let chunk = &self.bytes[self.offset..end];
        self.offset = end;

        Ok(chunk)
    }

    pub fn read_len(&mut self) -> Result<usize, String> {
        let mut word = [0u8; LEN_BYTE_LEN];
        word.copy_from_slice(self.take(LEN_BYTE_LEN)?);

        usize::try_from(u64::from_le_bytes(word)).map_err(|e| e.to_string())
    }

    pub fn read_int(&mut self) -> Result<BigInt, String> {
        let len = self.read_len()?;
        Ok(BigInt::from_signed_bytes_le(self.take(len)?))
    }

    pub fn finish(self) -> Result<(), String> {
        if self.offset == self.bytes.len() {
            Ok(())
        } else {
            Err(format!("{} trailing bytes", self.bytes.len() - self.offset))
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ByteReader, write_int, write_len};
    use num_bigint::BigInt;

    #[test]
    fn integers_of_any_sign_and_size_can_be_read_back() {
        let values = [BigInt::from(0), BigInt::from(-1), BigInt::from(255), BigInt::from(-(1i128 << 100))];

        let mut buf = Vec::new();
        write_len(&mut buf, values.len());
        values.iter().for_each(|v| write_int(&mut buf, v));

        let mut reader = ByteReader::new(&buf);
        let count = reader.read_len().unwrap();
        let decoded = (0..count).map(|_| reader.read_int().unwrap()).collect::<Vec<_>>();

        assert_eq!(decoded, values);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn truncated_and_oversized_inputs_are_rejected() {
        let mut buf = Vec::new();
        write_int(&mut buf, &BigInt::from(1u64 << 40));

        let mut truncated = ByteReader::new(&buf[..buf.len() - 1]);
        assert!(truncated.read_int().is_err());

        buf.push(0);
        let mut oversized = ByteReader::new(&buf);
        assert!(oversized.read_int().is_ok());
        assert!(oversized.finish().is_err());
    }
}
