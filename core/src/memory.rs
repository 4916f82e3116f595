//! Resizable raw byte storage for element values.
//!
//! [`ByteMemory`] is the leaf storage type of this project.
//! It has no interior synchronization:
//! element buffers keep it behind their own lock.

use byteordered::Endianness;
use std::ops::{Deref, DerefMut};

/// A contiguous, resizable array of bytes.
///
/// Copies are always explicit,
/// either through [`Clone`] or through [`ByteMemory::copy_from`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ByteMemory {
    data: Vec<u8>,
}

impl ByteMemory {
    /// Create an empty memory.
    pub fn new() -> Self {
        ByteMemory::default()
    }

    /// Create a memory of `len` zeroed bytes.
    pub fn with_len(len: usize) -> Self {
        ByteMemory { data: vec![0; len] }
    }

    /// The number of bytes held.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the memory holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Immutable view of the bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view of the bytes, valid until the next resize or assignment.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Replace the whole content with a copy of `bytes`.
    pub fn assign(&mut self, bytes: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(bytes);
    }

    /// Change the size of the memory,
    /// keeping the existing prefix and zero filling any extension.
    pub fn resize(&mut self, len: usize) {
        self.data.resize(len, 0);
    }

    /// Replace the content with a deep copy of another memory.
    pub fn copy_from(&mut self, other: &ByteMemory) {
        self.assign(other.as_slice());
    }

    /// Append a single byte if the size is odd.
    ///
    /// Returns whether a byte was added.
    pub fn pad_to_even(&mut self, padding: u8) -> bool {
        if self.data.len() % 2 == 1 {
            self.data.push(padding);
            true
        } else {
            false
        }
    }

    /// Convert the words of `word_width` bytes held here
    /// from the given endianness to the native one, in place.
    ///
    /// Nothing happens if the endianness is already the native one
    /// or if words are not wider than one byte.
    /// Trailing bytes which do not make a full word are left untouched.
    pub fn adjust_endian(&mut self, word_width: usize, endianness: Endianness) {
        if word_width < 2 || endianness == Endianness::native() {
            return;
        }
        for word in self.data.chunks_exact_mut(word_width) {
            word.reverse();
        }
    }

    /// Take the bytes out of the memory.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl Deref for ByteMemory {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for ByteMemory {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl AsRef<[u8]> for ByteMemory {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for ByteMemory {
    fn from(data: Vec<u8>) -> Self {
        ByteMemory { data }
    }
}

impl From<&[u8]> for ByteMemory {
    fn from(bytes: &[u8]) -> Self {
        ByteMemory {
            data: bytes.to_vec(),
        }
    }
}

impl From<ByteMemory> for Vec<u8> {
    fn from(memory: ByteMemory) -> Self {
        memory.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_keeps_prefix_and_zero_fills() {
        let mut memory = ByteMemory::from(&b"ABC"[..]);
        memory.resize(5);
        assert_eq!(memory.as_slice(), b"ABC\0\0");
        memory.resize(2);
        assert_eq!(memory.as_slice(), b"AB");
        assert_eq!(memory.size(), 2);
    }

    #[test]
    fn assign_and_copy() {
        let mut a = ByteMemory::with_len(4);
        a.assign(b"xyz");
        assert_eq!(a.size(), 3);

        let mut b = ByteMemory::new();
        b.copy_from(&a);
        b.as_mut_slice()[0] = b'X';
        assert_eq!(a.as_slice(), b"xyz");
        assert_eq!(b.as_slice(), b"Xyz");
    }

    #[test]
    fn pad_to_even() {
        let mut memory = ByteMemory::from(vec![1, 2, 3]);
        assert!(memory.pad_to_even(b' '));
        assert_eq!(memory.as_slice(), &[1, 2, 3, b' ']);
        assert!(!memory.pad_to_even(b' '));
        assert_eq!(memory.size(), 4);
    }

    #[test]
    fn adjust_endian_swaps_foreign_words_only() {
        let foreign = match Endianness::native() {
            Endianness::Little => Endianness::Big,
            Endianness::Big => Endianness::Little,
        };

        let mut memory = ByteMemory::from(vec![1, 2, 3, 4, 5]);
        memory.adjust_endian(2, foreign);
        assert_eq!(memory.as_slice(), &[2, 1, 4, 3, 5]);

        let mut memory = ByteMemory::from(vec![1, 2, 3, 4]);
        memory.adjust_endian(4, foreign);
        assert_eq!(memory.as_slice(), &[4, 3, 2, 1]);

        let mut memory = ByteMemory::from(vec![1, 2, 3, 4]);
        memory.adjust_endian(2, Endianness::native());
        assert_eq!(memory.as_slice(), &[1, 2, 3, 4]);

        memory.adjust_endian(1, foreign);
        assert_eq!(memory.as_slice(), &[1, 2, 3, 4]);
    }
}
