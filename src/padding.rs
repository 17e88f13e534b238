//! PKCS#7 padding over [`Buffer`]
//!
//! Padding must be applied exactly once, and MUST be combined with an
//! encrypt-then-MAC scheme by callers: unpadding on unauthenticated
//! ciphertext is a padding-oracle risk.
//!
//! Laws locked by the tests below, for any non-empty buffer `B` and
//! blocksize `bs ∈ [1, 255]`:
//!
//! - `|pad(B, bs)|` is a multiple of `bs`, and `|pad(B, bs)| − |B| ∈ [1, bs]`
//! - `reverse_pad(pad(B, bs)) == B`
//!
//! Padding an empty buffer yields one whole block of pad bytes, which
//! `reverse_pad` rejects: a pad length equal to the buffer size is
//! invalid by construction.

use crate::alloc::SharedAllocator;
use crate::buffer::Buffer;
use crate::error::{CryptoError, CryptoResult};

/// Pad `buffer` to a multiple of `blocksize`, replacing its contents in
/// place. The old storage is disposed (zeroized) in the exchange.
///
/// The pad length `p = blocksize − (len mod blocksize)` is always in
/// `[1, blocksize]`; each of the last `p` bytes holds the value `p`.
pub fn pad(
    buffer: &mut Buffer,
    alloc: &SharedAllocator,
    blocksize: usize,
) -> CryptoResult<()> {
    if blocksize == 0 || blocksize > 255 {
        return Err(CryptoError::BufferInvalidArgument);
    }

    let pad_size = blocksize - buffer.size() % blocksize;
    let mut padded = Buffer::init(alloc, buffer.size() + pad_size)?;
    padded.as_mut_slice()[..buffer.size()].copy_from_slice(buffer.as_slice());
    padded.as_mut_slice()[buffer.size()..].fill(pad_size as u8);

    *buffer = padded;
    Ok(())
}

/// Remove PKCS#7 padding from `buffer`, replacing its contents in place.
///
/// The final byte names the pad length `q`; the padding is valid only when
/// `0 < q < len` and the last `q` bytes all equal `q`.
pub fn reverse_pad(
    buffer: &mut Buffer,
    alloc: &SharedAllocator,
) -> CryptoResult<()> {
    if buffer.size() <= 1 {
        return Err(CryptoError::BufferPaddingSchemeInvalid);
    }

    let data = buffer.as_slice();
    let pad_size = usize::from(data[data.len() - 1]);
    if pad_size == 0 || pad_size >= data.len() {
        return Err(CryptoError::BufferPaddingSchemeInvalid);
    }
    if data[data.len() - pad_size..]
        .iter()
        .any(|&b| usize::from(b) != pad_size)
    {
        return Err(CryptoError::BufferPaddingSchemeInvalid);
    }

    let unpadded_size = data.len() - pad_size;
    let mut unpadded = Buffer::init(alloc, unpadded_size)?;
    unpadded
        .as_mut_slice()
        .copy_from_slice(&buffer.as_slice()[..unpadded_size]);

    *buffer = unpadded;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::system_allocator;

    #[test]
    fn rejects_bad_blocksize() {
        let alloc = system_allocator();
        let mut buffer = Buffer::init(&alloc, 3).unwrap();
        assert_eq!(
            pad(&mut buffer, &alloc, 0).unwrap_err(),
            CryptoError::BufferInvalidArgument
        );
        assert_eq!(
            pad(&mut buffer, &alloc, 256).unwrap_err(),
            CryptoError::BufferInvalidArgument
        );
    }

    #[test]
    fn pads_a_partial_block() {
        let alloc = system_allocator();
        let mut buffer =
            Buffer::from_slice(&alloc, &[0x01, 0x02, 0x03]).unwrap();
        pad(&mut buffer, &alloc, 16).unwrap();
        assert_eq!(buffer.size(), 16);
        assert_eq!(&buffer.as_slice()[..3], &[0x01, 0x02, 0x03]);
        assert!(buffer.as_slice()[3..].iter().all(|&b| b == 0x0D));
    }

    #[test]
    fn pads_an_exact_block_with_a_full_block() {
        let alloc = system_allocator();
        let mut buffer = Buffer::init(&alloc, 16).unwrap();
        pad(&mut buffer, &alloc, 16).unwrap();
        assert_eq!(buffer.size(), 32);
        assert!(buffer.as_slice()[16..].iter().all(|&b| b == 0x10));
    }

    #[test]
    fn unpads_a_valid_buffer() {
        let alloc = system_allocator();
        let mut buffer = Buffer::from_slice(
            &alloc,
            &[0x01, 0x02, 0x03, 0x04, 0x04, 0x04, 0x04, 0x04],
        )
        .unwrap();
        reverse_pad(&mut buffer, &alloc).unwrap();
        assert_eq!(buffer.as_slice(), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn rejects_degenerate_buffers() {
        let alloc = system_allocator();
        for size in [0usize, 1] {
            let mut buffer = Buffer::init(&alloc, size).unwrap();
            assert_eq!(
                reverse_pad(&mut buffer, &alloc).unwrap_err(),
                CryptoError::BufferPaddingSchemeInvalid
            );
        }
    }

    #[test]
    fn rejects_zero_pad_byte() {
        let alloc = system_allocator();
        let mut buffer = Buffer::init(&alloc, 16).unwrap();
        assert_eq!(
            reverse_pad(&mut buffer, &alloc).unwrap_err(),
            CryptoError::BufferPaddingSchemeInvalid
        );
    }

    #[test]
    fn rejects_pad_length_at_or_beyond_buffer_size() {
        let alloc = system_allocator();
        for last in [16u8, 17] {
            let mut buffer = Buffer::init(&alloc, 16).unwrap();
            buffer.as_mut_slice()[15] = last;
            assert_eq!(
                reverse_pad(&mut buffer, &alloc).unwrap_err(),
                CryptoError::BufferPaddingSchemeInvalid
            );
        }
    }

    #[test]
    fn rejects_inconsistent_pad_bytes() {
        let alloc = system_allocator();
        let mut buffer = Buffer::init(&alloc, 20).unwrap();
        buffer.as_mut_slice()[19] = 0x04;
        buffer.as_mut_slice()[18] = 0x04;
        buffer.as_mut_slice()[17] = 0x04;
        buffer.as_mut_slice()[16] = 0x05; // wrong
        assert_eq!(
            reverse_pad(&mut buffer, &alloc).unwrap_err(),
            CryptoError::BufferPaddingSchemeInvalid
        );
    }

    #[test]
    fn whole_block_pad_of_empty_input_is_not_reversible() {
        let alloc = system_allocator();
        let mut buffer = Buffer::init(&alloc, 0).unwrap();
        pad(&mut buffer, &alloc, 16).unwrap();
        assert_eq!(buffer.size(), 16);
        assert!(buffer.as_slice().iter().all(|&b| b == 0x10));
        assert_eq!(
            reverse_pad(&mut buffer, &alloc).unwrap_err(),
            CryptoError::BufferPaddingSchemeInvalid
        );
    }

    #[test]
    fn round_trips_across_blocksizes() {
        let alloc = system_allocator();
        for blocksize in [1usize, 2, 3, 15, 16, 255] {
            for len in [1usize, 15, 16, 17, 64] {
                let raw: Vec<u8> =
                    (0..len).map(|i| (i * 31 + 7) as u8).collect();
                let mut buffer = Buffer::from_slice(&alloc, &raw).unwrap();
                pad(&mut buffer, &alloc, blocksize).unwrap();
                assert_eq!(buffer.size() % blocksize, 0);
                let grown = buffer.size() - len;
                assert!(grown >= 1 && grown <= blocksize);
                reverse_pad(&mut buffer, &alloc).unwrap();
                assert_eq!(buffer.as_slice(), &raw[..]);
            }
        }
    }
}
