use std::io::{self, Write};

/// Result of a single best-effort write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every byte was accepted by the socket.
    Complete,
    /// The socket took only part of the response (or nothing, because it
    /// would have blocked). The rest is dropped.
    Partial { written: usize, total: usize },
}

/// Writes `payload` with one `write` call and never retries.
///
/// `WouldBlock` counts as zero bytes written. Any other error is returned
/// to the caller, which closes the connection regardless.
pub fn write_best_effort<W: Write>(stream: &mut W, payload: &[u8]) -> io::Result<WriteOutcome> {
    let written = match stream.write(payload) {
        Ok(n) => n,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
        Err(e) if e.kind() == io::ErrorKind::Interrupted => 0,
        Err(e) => return Err(e),
    };

    if written == payload.len() {
        Ok(WriteOutcome::Complete)
    } else {
        Ok(WriteOutcome::Partial {
            written,
            total: payload.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Limited {
        accepted: Vec<u8>,
        limit: usize,
    }

    impl Write for Limited {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.limit == 0 {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.limit);
            self.accepted.extend_from_slice(&buf[..n]);
            self.limit -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn full_write_is_complete() {
        let mut out = Vec::new();
        let outcome = write_best_effort(&mut out, b"hello").unwrap();
        assert_eq!(outcome, WriteOutcome::Complete);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn short_write_is_not_retried() {
        let mut sink = Limited { accepted: Vec::new(), limit: 3 };
        let outcome = write_best_effort(&mut sink, b"hello").unwrap();
        assert_eq!(outcome, WriteOutcome::Partial { written: 3, total: 5 });
        assert_eq!(sink.accepted, b"hel");
    }

    #[test]
    fn would_block_counts_as_nothing_written() {
        let mut sink = Limited { accepted: Vec::new(), limit: 0 };
        let outcome = write_best_effort(&mut sink, b"hello").unwrap();
        assert_eq!(outcome, WriteOutcome::Partial { written: 0, total: 5 });
    }
}
