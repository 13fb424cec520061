//! Caller-supplied decode input.

use std::collections::VecDeque;

/// A byte container the decoder can borrow as one contiguous slice.
///
/// The view is only held for the duration of a decode call and is never
/// written to.
pub trait ByteBuffer {
    /// The bytes as a single slice, or `None` if they are not stored
    /// contiguously.
    fn contiguous(&self) -> Option<&[u8]>;
}

impl ByteBuffer for [u8] {
    fn contiguous(&self) -> Option<&[u8]> {
        Some(self)
    }
}

impl<const N: usize> ByteBuffer for [u8; N] {
    fn contiguous(&self) -> Option<&[u8]> {
        Some(self)
    }
}

impl ByteBuffer for Vec<u8> {
    fn contiguous(&self) -> Option<&[u8]> {
        Some(self)
    }
}

impl ByteBuffer for Box<[u8]> {
    fn contiguous(&self) -> Option<&[u8]> {
        Some(self)
    }
}

/// Contiguous only while the ring buffer has not wrapped.
impl ByteBuffer for VecDeque<u8> {
    fn contiguous(&self) -> Option<&[u8]> {
        match self.as_slices() {
            (front, []) => Some(front),
            ([], back) => Some(back),
            _ => None,
        }
    }
}

impl<T: ByteBuffer + ?Sized> ByteBuffer for &T {
    fn contiguous(&self) -> Option<&[u8]> {
        (**self).contiguous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_and_vectors_are_contiguous() {
        assert_eq!(b"ab".contiguous(), Some(&b"ab"[..]));
        assert_eq!(vec![1u8, 2].contiguous(), Some(&[1u8, 2][..]));
        assert_eq!((&b"x"[..]).contiguous(), Some(&b"x"[..]));
    }

    #[test]
    fn wrapped_deque_is_not_contiguous() {
        let mut deque = VecDeque::from(vec![5u8, 6, 3, 4]);
        deque.rotate_left(2);
        assert_eq!(deque.as_slices(), (&[3u8, 4][..], &[5u8, 6][..]));
        assert_eq!(deque.contiguous(), None);
        deque.make_contiguous();
        assert_eq!(deque.contiguous(), Some(&[3u8, 4, 5, 6][..]));
    }
}
