//! Fixed-capacity byte buffer with an explicit valid length.
//!
//! Storage is a boxed slice whose size is the buffer's capacity and never
//! changes. The valid length is tracked separately so a recycled slab can
//! be handed out again with a shorter visible length.

use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::error::BufferError;

/// Exclusively owned byte buffer.
pub struct Buffer {
    /// Backing storage. `storage.len()` is the capacity.
    storage: Box<[u8]>,
    /// Number of valid bytes at the front of `storage`.
    len: usize,
}

impl Buffer {
    /// Allocate zeroed storage of `capacity` bytes with `len` valid bytes.
    pub(crate) fn zeroed(capacity: usize, len: usize) -> Self {
        debug_assert!(len <= capacity, "length past capacity");
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            len,
        }
    }

    /// Wrap recycled storage, exposing `len` bytes.
    pub(crate) fn from_storage(storage: Box<[u8]>, len: usize) -> Self {
        debug_assert!(len <= storage.len(), "length past capacity");
        Self { storage, len }
    }

    /// Give up the storage, discarding the valid length.
    pub(crate) fn into_storage(self) -> Box<[u8]> {
        self.storage
    }

    /// Create an empty buffer with exactly `capacity` bytes of storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::zeroed(capacity, 0)
    }

    /// Take ownership of `data`; length and capacity both equal `data.len()`.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            storage: data.into_boxed_slice(),
            len,
        }
    }

    /// Copy `data` into a new buffer of exactly `data.len()` bytes.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            storage: Box::from(data),
            len: data.len(),
        }
    }

    /// Number of valid bytes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if there are no valid bytes.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total storage reserved.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Valid bytes.
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    /// Valid bytes, mutably.
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[..self.len]
    }

    /// Set the valid length.
    ///
    /// Growing exposes whatever the storage already holds: zeroes for a
    /// fresh buffer, stale bytes for a recycled one.
    pub fn set_len(&mut self, len: usize) -> Result<(), BufferError> {
        if len > self.capacity() {
            return Err(BufferError::CapacityExceeded {
                requested: len,
                capacity: self.capacity(),
            });
        }
        self.len = len;
        Ok(())
    }

    /// Shorten the valid length. No-op if `len` is not shorter.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    /// Drop all valid bytes, keeping the storage.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Append `data` after the valid bytes.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), BufferError> {
        let end = self.len + data.len();
        if end > self.capacity() {
            return Err(BufferError::CapacityExceeded {
                requested: end,
                capacity: self.capacity(),
            });
        }
        self.storage[self.len..end].copy_from_slice(data);
        self.len = end;
        Ok(())
    }

    /// Convert into a vector holding only the valid bytes.
    pub fn into_vec(self) -> Vec<u8> {
        let mut data = self.storage.into_vec();
        data.truncate(self.len);
        data
    }
}

impl Clone for Buffer {
    /// Copies the valid bytes into fresh storage sized to fit them.
    fn clone(&self) -> Self {
        Self::from_slice(self.as_slice())
    }
}

impl Deref for Buffer {
    type Target = [u8];

    #[inline(always)]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for Buffer {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for Buffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl From<&str> for Buffer {
    fn from(text: &str) -> Self {
        Self::from_slice(text.as_bytes())
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Buffer {}

impl PartialEq<[u8]> for Buffer {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

impl PartialEq<&[u8]> for Buffer {
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_slice() == *other
    }
}

impl<const N: usize> PartialEq<[u8; N]> for Buffer {
    fn eq(&self, other: &[u8; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<const N: usize> PartialEq<&[u8; N]> for Buffer {
    fn eq(&self, other: &&[u8; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Buffer {{ len: {}, capacity: {}, data: \"{}\" }}",
            self.len,
            self.capacity(),
            self.as_slice().escape_ascii()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_has_no_slack() {
        let buf = Buffer::from_vec(b"Frame 0".to_vec());
        assert_eq!(buf.len(), 7);
        assert_eq!(buf.capacity(), 7);
        assert_eq!(buf, b"Frame 0");
    }

    #[test]
    fn test_set_len_within_capacity() {
        let mut buf = Buffer::with_capacity(64);
        assert!(buf.is_empty());

        buf.set_len(10).unwrap();
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.capacity(), 64);
        assert!(buf.iter().all(|&b| b == 0));

        assert_eq!(
            buf.set_len(65),
            Err(BufferError::CapacityExceeded {
                requested: 65,
                capacity: 64
            })
        );
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn test_truncate_never_grows() {
        let mut buf = Buffer::from_slice(b"hello");
        buf.truncate(10);
        assert_eq!(buf.len(), 5);

        buf.truncate(2);
        assert_eq!(buf, b"he");
        assert_eq!(buf.capacity(), 5);
    }

    #[test]
    fn test_extend_from_slice() {
        let mut buf = Buffer::with_capacity(8);
        buf.extend_from_slice(b"abc").unwrap();
        buf.extend_from_slice(b"defgh").unwrap();
        assert_eq!(buf, b"abcdefgh");

        assert!(buf.extend_from_slice(b"i").is_err());
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut buf = Buffer::with_capacity(64);
        buf.extend_from_slice(b"abc").unwrap();

        let mut copy = buf.clone();
        assert_eq!(copy.capacity(), 3);
        copy[0] = b'x';

        assert_eq!(buf, b"abc");
        assert_eq!(copy, b"xbc");
    }

    #[test]
    fn test_into_vec_drops_invalid_tail() {
        let mut buf = Buffer::from_slice(b"abcdef");
        buf.truncate(3);
        assert_eq!(buf.into_vec(), b"abc".to_vec());
    }

    #[test]
    fn test_debug_escapes_bytes() {
        let buf = Buffer::from_slice(b"a\"\n");
        assert_eq!(
            format!("{:?}", buf),
            "Buffer { len: 3, capacity: 3, data: \"a\\\"\\n\" }"
        );
    }
}
