/// Fixed-capacity circular byte store.
///
/// The capacity is chosen at construction and never grows: it is both the
/// backpressure mechanism (a full ring with an incomplete request head
/// means the peer exceeded the header budget) and the detector for
/// `HeaderTooLarge`. A growable buffer would defeat both, so callers that
/// want a bigger ceiling must construct a bigger ring, not resize this one.
///
/// Readable and writable views are exposed as one or two slices rather than
/// a single contiguous slice, because the wrap-around case (data straddling
/// the end of the backing `Vec`) is a first-class case for every consumer
/// of this type, not a special case to special-case around.
pub struct RingBuffer {
    data: Vec<u8>,
    read: usize,
    write: usize,
    len: usize,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity],
            read: 0,
            write: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of bytes currently stored and available to read.
    pub fn readable(&self) -> usize {
        self.len
    }

    /// Number of bytes of free space available to write into.
    pub fn writable(&self) -> usize {
        self.data.len() - self.len
    }

    /// Readable bytes as one slice, or two when the data wraps past the end
    /// of the backing storage.
    pub fn readable_regions(&self) -> (&[u8], &[u8]) {
        if self.len == 0 {
            return (&[], &[]);
        }
        let cap = self.data.len();
        if self.read + self.len <= cap {
            (&self.data[self.read..self.read + self.len], &[])
        } else {
            let first = &self.data[self.read..cap];
            let second = &self.data[0..(self.read + self.len - cap)];
            (first, second)
        }
    }

    /// Writable space as one slice, or two when the free region wraps.
    pub fn writable_regions(&mut self) -> (&mut [u8], &mut [u8]) {
        let cap = self.data.len();
        let free = cap - self.len;
        if free == 0 {
            return (&mut [], &mut []);
        }
        if self.write + free <= cap {
            (&mut self.data[self.write..self.write + free], &mut [])
        } else {
            let first_len = cap - self.write;
            let second_len = free - first_len;
            let (head, tail) = self.data.split_at_mut(self.write);
            (tail, &mut head[..second_len])
        }
    }

    /// Mark `n` bytes, previously written into the writable regions, as
    /// readable. Asserts `n <= writable()`.
    pub fn produce(&mut self, n: usize) {
        assert!(n <= self.writable(), "produce: n exceeds writable space");
        self.write = (self.write + n) % self.data.len().max(1);
        self.len += n;
    }

    /// Mark `n` bytes at the front of the readable region as consumed.
    /// A no-op when `n == 0`. Asserts `n <= readable()`.
    pub fn consume(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        assert!(n <= self.len, "consume: n exceeds readable space");
        self.read = (self.read + n) % self.data.len().max(1);
        self.len -= n;
    }

    /// Convenience: copy `bytes` into the writable region and produce them.
    /// Returns the number of bytes actually written (may be less than
    /// `bytes.len()` if the ring doesn't have enough free space).
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let to_write = bytes.len().min(self.writable());
        let (first, second) = self.writable_regions();
        let first_len = first.len().min(to_write);
        first[..first_len].copy_from_slice(&bytes[..first_len]);
        let remaining = to_write - first_len;
        if remaining > 0 {
            second[..remaining].copy_from_slice(&bytes[first_len..first_len + remaining]);
        }
        self.produce(to_write);
        to_write
    }

    /// Reset to empty without deallocating the backing storage.
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_region_when_no_wrap() {
        let mut rb = RingBuffer::with_capacity(16);
        rb.write(b"hello");
        let (a, b) = rb.readable_regions();
        assert_eq!(a, b"hello");
        assert!(b.is_empty());
    }

    #[test]
    fn two_regions_after_wrap() {
        let mut rb = RingBuffer::with_capacity(8);
        rb.write(b"123456");
        rb.consume(4);
        rb.write(b"abcd");
        let (a, b) = rb.readable_regions();
        let mut joined = Vec::new();
        joined.extend_from_slice(a);
        joined.extend_from_slice(b);
        assert_eq!(joined, b"56abcd");
        assert!(!b.is_empty(), "expected the write to wrap past the end");
    }

    #[test]
    fn consume_zero_is_noop() {
        let mut rb = RingBuffer::with_capacity(8);
        rb.write(b"ab");
        rb.consume(0);
        assert_eq!(rb.readable(), 2);
    }

    #[test]
    fn idempotent_consume_after_feed() {
        let mut rb = RingBuffer::with_capacity(32);
        let total = rb.write(b"GET / HTTP/1.1\r\n\r\n");
        rb.consume(total);
        assert_eq!(rb.readable(), 0);
    }

    #[test]
    #[should_panic(expected = "exceeds readable")]
    fn consume_past_available_panics() {
        let mut rb = RingBuffer::with_capacity(8);
        rb.write(b"ab");
        rb.consume(3);
    }

    #[test]
    #[should_panic(expected = "exceeds writable")]
    fn produce_past_available_panics() {
        let mut rb = RingBuffer::with_capacity(4);
        rb.produce(5);
    }

    #[test]
    fn writable_regions_wrap_correctly() {
        let mut rb = RingBuffer::with_capacity(8);
        rb.write(b"1234567"); // 1 byte free, write cursor at 7
        rb.consume(5); // free up the front, read=5, write=7, len=2
        let (a, b) = rb.writable_regions();
        // free space is 6 bytes: [7..8) then [0..5)
        assert_eq!(a.len() + b.len(), 6);
    }
}
