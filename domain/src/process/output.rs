//! Bounded output capture.

/// Bytes of output retained per stream.
pub const OUTPUT_CAPACITY: usize = 10 * 1024;

/// Tail-retaining text buffer.
///
/// Appends freely; once the content exceeds the capacity only the most
/// recent bytes are kept (cut on a UTF-8 boundary) and the oldest data is
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    data: String,
    capacity: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::with_capacity(OUTPUT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: String::new(),
            capacity,
            truncated: false,
        }
    }

    pub fn push(&mut self, text: &str) {
        self.data.push_str(text);
        if self.data.len() > self.capacity {
            let mut cut = self.data.len() - self.capacity;
            while !self.data.is_char_boundary(cut) {
                cut += 1;
            }
            self.data.drain(..cut);
            self.truncated = true;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether older output has been dropped.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OutputBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_everything_under_capacity() {
        let mut buf = OutputBuffer::with_capacity(16);
        buf.push("hello ");
        buf.push("world");
        assert_eq!(buf.as_str(), "hello world");
        assert!(!buf.is_truncated());
    }

    #[test]
    fn test_keeps_only_tail() {
        let mut buf = OutputBuffer::with_capacity(8);
        buf.push("0123456789");
        buf.push("abc");
        assert_eq!(buf.as_str(), "56789abc");
        assert_eq!(buf.len(), 8);
        assert!(buf.is_truncated());
    }

    #[test]
    fn test_default_capacity_is_ten_kib() {
        let mut buf = OutputBuffer::new();
        buf.push(&"a".repeat(OUTPUT_CAPACITY));
        buf.push("tail");
        assert_eq!(buf.len(), OUTPUT_CAPACITY);
        assert!(buf.as_str().ends_with("tail"));
    }

    #[test]
    fn test_cut_respects_char_boundary() {
        let mut buf = OutputBuffer::with_capacity(5);
        buf.push("ééé"); // 6 bytes
        assert!(buf.len() <= 5);
        assert_eq!(buf.as_str(), "éé");
    }
}
