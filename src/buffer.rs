//! Crypto-aware byte buffer with zeroizing disposal
//!
//! [`Buffer`] is the unit of data exchange for every family in this crate:
//! keys, nonces, digests, signatures and shared secrets all travel through
//! it. The buffer owns its storage, knows its size, and overwrites its
//! bytes with zero on drop so secret material does not linger on the heap.
//!
//! ## Invariants
//!
//! - The size is fixed at construction; no operation grows or shrinks a
//!   buffer in place. Operations that need a different size allocate a new
//!   buffer and move it over (see [`Buffer::take`] and the padding module).
//! - `size == 0` is legal and owns no storage.
//! - Every transcoding operation bounds-checks the destination before
//!   writing a single byte.
//!
//! ## Transcoding
//!
//! Hex uses two digits per byte (lowercase on write; either case on read,
//! with non-hex input saturating to `0xF`, matching the original wire
//! behavior). Base64 uses the RFC 4648 alphabet with `=` padding; the
//! decoder skips any byte outside the alphabet, which doubles as
//! whitespace tolerance on the wire.

use zeroize::Zeroize;

use crate::alloc::SharedAllocator;
use crate::error::{CryptoError, CryptoResult};

/// An owned, fixed-size, zeroizing byte region.
pub struct Buffer {
    data: Vec<u8>,
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Contents are potentially secret; show the size only.
        f.debug_struct("Buffer").field("size", &self.data.len()).finish()
    }
}

impl Buffer {
    /// Allocate a buffer of `size` zeroed bytes.
    pub fn init(alloc: &SharedAllocator, size: usize) -> CryptoResult<Self> {
        Ok(Buffer { data: alloc.allocate(size)? })
    }

    /// Allocate a buffer sized to hold the hex serialization of `size`
    /// raw bytes (two digits per byte).
    pub fn init_for_hex_serialization(
        alloc: &SharedAllocator,
        size: usize,
    ) -> CryptoResult<Self> {
        Buffer::init(alloc, size * 2)
    }

    /// Allocate a buffer sized to hold the padded Base64 serialization of
    /// `size` raw bytes: `4 * ceil(size / 3)`.
    pub fn init_for_base64_serialization(
        alloc: &SharedAllocator,
        size: usize,
    ) -> CryptoResult<Self> {
        Buffer::init(alloc, size.div_ceil(3) * 4)
    }

    /// Build a buffer directly from a byte slice.
    pub fn from_slice(
        alloc: &SharedAllocator,
        bytes: &[u8],
    ) -> CryptoResult<Self> {
        let mut buf = Buffer::init(alloc, bytes.len())?;
        buf.data.copy_from_slice(bytes);
        Ok(buf)
    }

    /// The buffer size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True when the buffer owns no storage.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Borrow the contents mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Move the contents out, leaving this buffer empty. The returned
    /// buffer takes ownership of the storage; the source owns nothing and
    /// zeroizes nothing further on drop.
    pub fn take(&mut self) -> Buffer {
        Buffer { data: std::mem::take(&mut self.data) }
    }

    /// Copy another buffer of exactly the same size into this one.
    pub fn copy_from(&mut self, source: &Buffer) -> CryptoResult<()> {
        if self.size() != source.size() {
            return Err(CryptoError::BufferCopyMismatchedSizes);
        }
        self.data.copy_from_slice(&source.data);
        Ok(())
    }

    /// Copy `source` into the head of this buffer. Fails with
    /// [`CryptoError::BufferReadWouldOverwrite`] when the source is larger
    /// than this buffer.
    pub fn read_data(&mut self, source: &[u8]) -> CryptoResult<()> {
        if source.len() > self.size() {
            return Err(CryptoError::BufferReadWouldOverwrite);
        }
        self.data[..source.len()].copy_from_slice(source);
        Ok(())
    }

    // ------------------------------ hex -------------------------------

    /// Write the hex serialization of `source` into this buffer.
    pub fn write_hex(&mut self, source: &Buffer) -> CryptoResult<()> {
        if self.size() < source.size() * 2 {
            return Err(CryptoError::BufferWriteWouldOverwrite);
        }
        for (i, &byte) in source.data.iter().enumerate() {
            self.data[2 * i] = HEX_DIGITS[(byte >> 4) as usize];
            self.data[2 * i + 1] = HEX_DIGITS[(byte & 0x0F) as usize];
        }
        Ok(())
    }

    /// Read hex data from `source` into the head of this buffer. Every
    /// source byte is treated as a digit; a digit pair becomes one output
    /// byte.
    pub fn read_hex(&mut self, source: &Buffer) -> CryptoResult<()> {
        if self.size() < source.size() / 2 {
            return Err(CryptoError::BufferReadWouldOverwrite);
        }
        for (i, pair) in source.data.chunks_exact(2).enumerate() {
            self.data[i] = (hex_nibble(pair[0]) << 4) | hex_nibble(pair[1]);
        }
        Ok(())
    }

    // ----------------------------- base64 -----------------------------

    /// Write the padded Base64 serialization of `source` into this buffer.
    pub fn write_base64(&mut self, source: &Buffer) -> CryptoResult<()> {
        if self.size() < source.size().div_ceil(3) * 4 {
            return Err(CryptoError::BufferWriteWouldOverwrite);
        }

        let mut out = 0usize;
        let mut chunks = source.data.chunks_exact(3);
        for group in &mut chunks {
            let word =
                (u32::from(group[0]) << 16) | (u32::from(group[1]) << 8)
                    | u32::from(group[2]);
            self.encode_group(&mut out, word, 4);
        }

        let tail = chunks.remainder();
        match tail.len() {
            1 => {
                let word = u32::from(tail[0]) << 16;
                self.encode_group(&mut out, word, 2);
            }
            2 => {
                let word =
                    (u32::from(tail[0]) << 16) | (u32::from(tail[1]) << 8);
                self.encode_group(&mut out, word, 3);
            }
            _ => {}
        }
        Ok(())
    }

    /// Emit `digits` Base64 digits from the 24-bit `word`, then `=` padding
    /// to the 4-character group boundary.
    fn encode_group(&mut self, out: &mut usize, word: u32, digits: usize) {
        for i in 0..4 {
            self.data[*out] = if i < digits {
                base64_digit(((word >> (18 - 6 * i)) & 0x3F) as u8)
            } else {
                b'='
            };
            *out += 1;
        }
    }

    /// Read Base64 data from `source` into the head of this buffer,
    /// returning the number of bytes decoded.
    ///
    /// Bytes outside the Base64 alphabet (including `=` padding) are
    /// skipped. Four digits yield three bytes; a tail of three digits
    /// yields two bytes and a tail of two digits yields one byte. A single
    /// trailing digit carries too few bits to decode and is dropped.
    pub fn read_base64(&mut self, source: &Buffer) -> CryptoResult<usize> {
        if self.size() < source.size() * 3 / 4 {
            return Err(CryptoError::BufferReadWouldOverwrite);
        }

        let mut group = [0u8; 4];
        let mut digits = 0usize;
        let mut out = 0usize;
        for &byte in &source.data {
            let Some(value) = base64_value(byte) else { continue };
            group[digits] = value;
            digits += 1;
            if digits == 4 {
                self.data[out] = (group[0] << 2) | (group[1] >> 4);
                self.data[out + 1] = (group[1] << 4) | (group[2] >> 2);
                self.data[out + 2] = (group[2] << 6) | group[3];
                out += 3;
                digits = 0;
            }
        }

        match digits {
            3 => {
                self.data[out] = (group[0] << 2) | (group[1] >> 4);
                self.data[out + 1] = (group[1] << 4) | (group[2] >> 2);
                out += 2;
            }
            2 => {
                self.data[out] = (group[0] << 2) | (group[1] >> 4);
                out += 1;
            }
            _ => {}
        }
        Ok(out)
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Nibble value of a hex digit; non-digits saturate to `0xF`.
fn hex_nibble(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'A'..=b'E' => byte - b'A' + 10,
        b'a'..=b'e' => byte - b'a' + 10,
        _ => 0x0F,
    }
}

/// RFC 4648 digit for a 6-bit value.
fn base64_digit(value: u8) -> u8 {
    match value {
        0..=25 => b'A' + value,
        26..=51 => b'a' + (value - 26),
        52..=61 => b'0' + (value - 52),
        62 => b'+',
        _ => b'/',
    }
}

/// 6-bit value of an RFC 4648 digit, or `None` for anything else.
fn base64_value(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::system_allocator;
    use base64::Engine;

    fn buf(bytes: &[u8]) -> Buffer {
        Buffer::from_slice(&system_allocator(), bytes).unwrap()
    }

    #[test]
    fn init_sizes() {
        let alloc = system_allocator();
        assert_eq!(Buffer::init(&alloc, 5).unwrap().size(), 5);
        assert_eq!(
            Buffer::init_for_hex_serialization(&alloc, 5).unwrap().size(),
            10
        );
        assert_eq!(
            Buffer::init_for_base64_serialization(&alloc, 1).unwrap().size(),
            4
        );
        assert_eq!(
            Buffer::init_for_base64_serialization(&alloc, 3).unwrap().size(),
            4
        );
        assert_eq!(
            Buffer::init_for_base64_serialization(&alloc, 4).unwrap().size(),
            8
        );
    }

    #[test]
    fn allocation_failure_surfaces_as_oom() {
        let failing = crate::alloc::testing::FailingAllocator::after(0);
        assert_eq!(
            Buffer::init(&failing, 16).unwrap_err(),
            CryptoError::BufferInitOutOfMemory
        );
    }

    #[test]
    fn copy_requires_equal_sizes() {
        let alloc = system_allocator();
        let src = buf(b"abc");
        let mut dst = Buffer::init(&alloc, 4).unwrap();
        assert_eq!(
            dst.copy_from(&src).unwrap_err(),
            CryptoError::BufferCopyMismatchedSizes
        );
        let mut dst = Buffer::init(&alloc, 3).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst.as_slice(), b"abc");
    }

    #[test]
    fn read_data_bounds() {
        let alloc = system_allocator();
        let mut dst = Buffer::init(&alloc, 2).unwrap();
        assert_eq!(
            dst.read_data(b"abc").unwrap_err(),
            CryptoError::BufferReadWouldOverwrite
        );
        dst.read_data(b"ab").unwrap();
        assert_eq!(dst.as_slice(), b"ab");
    }

    #[test]
    fn take_empties_the_source() {
        let mut src = buf(b"secret");
        let moved = src.take();
        assert_eq!(moved.as_slice(), b"secret");
        assert!(src.is_empty());
    }

    #[test]
    fn hex_round_trip() {
        let alloc = system_allocator();
        let raw = buf(&[0x00, 0x0F, 0xA5, 0xFF]);
        let mut encoded =
            Buffer::init_for_hex_serialization(&alloc, raw.size()).unwrap();
        encoded.write_hex(&raw).unwrap();
        assert_eq!(encoded.as_slice(), b"000fa5ff");

        let mut decoded = Buffer::init(&alloc, raw.size()).unwrap();
        decoded.read_hex(&encoded).unwrap();
        assert_eq!(decoded.as_slice(), raw.as_slice());

        // Uppercase digits decode identically.
        let upper = buf(b"000FA5FF");
        let mut decoded = Buffer::init(&alloc, 4).unwrap();
        decoded.read_hex(&upper).unwrap();
        assert_eq!(decoded.as_slice(), raw.as_slice());
    }

    #[test]
    fn hex_matches_reference_codec() {
        let alloc = system_allocator();
        let raw: Vec<u8> = (0u8..=255).collect();
        let src = buf(&raw);
        let mut encoded =
            Buffer::init_for_hex_serialization(&alloc, raw.len()).unwrap();
        encoded.write_hex(&src).unwrap();
        assert_eq!(encoded.as_slice(), hex::encode(&raw).as_bytes());
    }

    #[test]
    fn hex_write_bounds() {
        let alloc = system_allocator();
        let raw = buf(b"abc");
        let mut small = Buffer::init(&alloc, 5).unwrap();
        assert_eq!(
            small.write_hex(&raw).unwrap_err(),
            CryptoError::BufferWriteWouldOverwrite
        );
    }

    // RFC 4648 §10 test vectors plus the binary patterns used by the
    // original wire tests.
    const BASE64_CASES: &[(&[u8], &str)] = &[
        (b"f", "Zg=="),
        (b"fo", "Zm8="),
        (b"foo", "Zm9v"),
        (b"foob", "Zm9vYg=="),
        (b"fooba", "Zm9vYmE="),
        (b"foobar", "Zm9vYmFy"),
        (&[0x14, 0xFB, 0x9C, 0x03, 0xD9, 0x7E], "FPucA9l+"),
        (&[0x14, 0xFB, 0x9C, 0x03, 0xD9], "FPucA9k="),
        (&[0x14, 0xFB, 0x9C, 0x03], "FPucAw=="),
    ];

    #[test]
    fn base64_write_vectors() {
        let alloc = system_allocator();
        for (raw, expected) in BASE64_CASES {
            let src = buf(raw);
            let mut dst =
                Buffer::init_for_base64_serialization(&alloc, raw.len())
                    .unwrap();
            dst.write_base64(&src).unwrap();
            assert_eq!(dst.as_slice(), expected.as_bytes(), "{expected}");
        }
    }

    #[test]
    fn base64_read_vectors() {
        let alloc = system_allocator();
        for (raw, encoded) in BASE64_CASES {
            let src = buf(encoded.as_bytes());
            let mut dst = Buffer::init(&alloc, src.size()).unwrap();
            let decoded = dst.read_base64(&src).unwrap();
            assert_eq!(decoded, raw.len(), "{encoded}");
            assert_eq!(&dst.as_slice()[..decoded], *raw, "{encoded}");
        }
    }

    #[test]
    fn base64_read_skips_non_alphabet_bytes() {
        let alloc = system_allocator();
        let cases: &[(&[u8], &[u8])] = &[
            (b"Zg\n==", b"f"),
            (b"Zm8 =", b"fo"),
            (b"\tZm9v", b"foo"),
            (b"--Zm9vYg==", b"foob"),
            (b"Z m9v,YmE=", b"fooba"),
            (b"Zm9vY\x0BmFy", b"foobar"),
        ];
        for (encoded, raw) in cases {
            let src = buf(encoded);
            let mut dst = Buffer::init(&alloc, src.size()).unwrap();
            let decoded = dst.read_base64(&src).unwrap();
            assert_eq!(decoded, raw.len());
            assert_eq!(&dst.as_slice()[..decoded], *raw);
        }
    }

    #[test]
    fn base64_round_trip_matches_reference_codec() {
        let alloc = system_allocator();
        for len in 0usize..=66 {
            let raw: Vec<u8> = (0..len as u32)
                .map(|i| (i.wrapping_mul(97) ^ (i >> 3)) as u8)
                .collect();
            let src = buf(&raw);
            let mut encoded =
                Buffer::init_for_base64_serialization(&alloc, len).unwrap();
            encoded.write_base64(&src).unwrap();
            assert_eq!(
                encoded.as_slice(),
                base64::engine::general_purpose::STANDARD
                    .encode(&raw)
                    .as_bytes()
            );

            let mut decoded = Buffer::init(&alloc, encoded.size()).unwrap();
            let n = decoded.read_base64(&encoded).unwrap();
            assert_eq!(n, len);
            assert_eq!(&decoded.as_slice()[..n], &raw[..]);
        }
    }

    #[test]
    fn base64_bounds() {
        let alloc = system_allocator();
        let raw = buf(b"foobar");
        let mut small = Buffer::init(&alloc, 7).unwrap();
        assert_eq!(
            small.write_base64(&raw).unwrap_err(),
            CryptoError::BufferWriteWouldOverwrite
        );

        let encoded = buf(b"Zm9vYmFy");
        let mut small = Buffer::init(&alloc, 5).unwrap();
        assert_eq!(
            small.read_base64(&encoded).unwrap_err(),
            CryptoError::BufferReadWouldOverwrite
        );
    }
}
