use crate::error::{codes, WireError};

/// Result of one [`ChunkedDecoder::decode`] call.
#[derive(Debug, Clone, Copy)]
pub struct ChunkProgress {
    pub consumed: usize,
    pub is_last: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    SizeExt,
    SizeCr,
    Data,
    DataCr,
    DataLf,
    TrailerLineStart,
    TrailerLine,
    TrailerLineCr,
    TrailerCr,
    Done,
}

/// Incremental decoder for `Transfer-Encoding: chunked` bodies. May decode
/// several whole chunks in a single [`decode`](Self::decode)
/// call; if the input runs out mid-chunk the decoder remembers exactly
/// where it was and resumes on the next call, same discipline as
/// [`crate::parse::head::HeadParser`].
pub struct ChunkedDecoder {
    state: State,
    size_acc: Vec<u8>,
    remaining: u64,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Size,
            size_acc: Vec::new(),
            remaining: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Feed readable bytes (as up to two iovec-like slices), appending
    /// decoded payload bytes to `out`. Trailer headers, if any, are scanned
    /// past but never surfaced.
    pub fn decode(
        &mut self,
        regions: (&[u8], &[u8]),
        out: &mut Vec<u8>,
    ) -> Result<ChunkProgress, WireError> {
        if self.state == State::Done {
            return Ok(ChunkProgress {
                consumed: 0,
                is_last: true,
            });
        }
        let mut consumed = 0usize;
        for &byte in regions.0.iter().chain(regions.1.iter()) {
            consumed += 1;
            self.step(byte, out)?;
            if self.state == State::Done {
                return Ok(ChunkProgress {
                    consumed,
                    is_last: true,
                });
            }
        }
        Ok(ChunkProgress {
            consumed,
            is_last: false,
        })
    }

    fn step(&mut self, byte: u8, out: &mut Vec<u8>) -> Result<(), WireError> {
        match self.state {
            State::Size => {
                if byte == b';' {
                    self.state = State::SizeExt;
                } else if byte == b'\r' {
                    self.finish_size_line()?;
                } else if byte == b'\n' {
                    return Err(invalid_chunk("bare LF in chunk size line"));
                } else if byte.is_ascii_hexdigit() {
                    self.size_acc.push(byte);
                } else {
                    return Err(invalid_chunk("non-hex byte in chunk size"));
                }
            }
            State::SizeExt => {
                if byte == b'\r' {
                    self.finish_size_line()?;
                } else if byte == b'\n' {
                    return Err(invalid_chunk("bare LF in chunk extension"));
                }
                // other bytes: chunk-extension content, discarded.
            }
            State::SizeCr => {
                if byte == b'\n' {
                    self.state = if self.remaining == 0 {
                        State::TrailerLineStart
                    } else {
                        State::Data
                    };
                } else {
                    return Err(invalid_chunk("expected LF after chunk-size CR"));
                }
            }
            State::Data => {
                out.push(byte);
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.state = State::DataCr;
                }
            }
            State::DataCr => {
                if byte == b'\r' {
                    self.state = State::DataLf;
                } else {
                    return Err(invalid_chunk("expected CR after chunk data"));
                }
            }
            State::DataLf => {
                if byte == b'\n' {
                    self.size_acc.clear();
                    self.state = State::Size;
                } else {
                    return Err(invalid_chunk("expected LF after chunk data CR"));
                }
            }
            State::TrailerLineStart => {
                if byte == b'\r' {
                    self.state = State::TrailerCr;
                } else if byte == b'\n' {
                    return Err(invalid_chunk("bare LF at trailer line start"));
                } else {
                    self.state = State::TrailerLine;
                }
            }
            State::TrailerLine => {
                if byte == b'\r' {
                    self.state = State::TrailerLineCr;
                } else if byte == b'\n' {
                    return Err(invalid_chunk("bare LF in trailer line"));
                }
                // trailer header content: discarded.
            }
            State::TrailerLineCr => {
                if byte == b'\n' {
                    self.state = State::TrailerLineStart;
                } else {
                    return Err(invalid_chunk("expected LF after trailer CR"));
                }
            }
            State::TrailerCr => {
                if byte == b'\n' {
                    self.state = State::Done;
                } else {
                    return Err(invalid_chunk("expected LF after final CR"));
                }
            }
            State::Done => unreachable!("decode() returns before stepping past Done"),
        }
        Ok(())
    }

    fn finish_size_line(&mut self) -> Result<(), WireError> {
        if self.size_acc.is_empty() {
            return Err(invalid_chunk("missing chunk size"));
        }
        let s = std::str::from_utf8(&self.size_acc)
            .map_err(|_| invalid_chunk("non-utf8 chunk size"))?;
        let size = u64::from_str_radix(s, 16)
            .map_err(|_| WireError::new(codes::INVALID_CHUNK_LENGTH, "invalid chunk length"))?;
        self.remaining = size;
        self.state = State::SizeCr;
        Ok(())
    }
}

fn invalid_chunk(msg: &'static str) -> WireError {
    WireError::new(codes::INVALID_CHUNK_FORMAT, msg)
}

/// Encode one chunk. Data chunks use `encode(bytes, false)`; the final
/// data-bearing chunk (if any) and the zero-length terminator are both
/// produced by a single `encode(bytes, true)` call.
pub fn encode(bytes: &[u8], is_last: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 16);
    if !bytes.is_empty() {
        out.extend_from_slice(format!("{:x}\r\n", bytes.len()).as_bytes());
        out.extend_from_slice(bytes);
        out.extend_from_slice(b"\r\n");
    }
    if is_last {
        out.extend_from_slice(b"0\r\n\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> (Vec<u8>, bool) {
        let mut dec = ChunkedDecoder::new();
        let mut out = Vec::new();
        let mut offset = 0;
        let mut is_last = false;
        while offset < input.len() {
            let progress = dec.decode((&input[offset..], &[]), &mut out).unwrap();
            offset += progress.consumed;
            if progress.is_last {
                is_last = true;
                break;
            }
        }
        (out, is_last)
    }

    #[test]
    fn decodes_two_chunks_and_terminator() {
        let wire = b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let (body, is_last) = decode_all(wire);
        assert!(is_last);
        assert_eq!(body, b"hello world");
    }

    #[test]
    fn roundtrip_arbitrary_partition() {
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let blocks: Vec<&[u8]> = vec![&data[0..10], &data[10..25], &data[25..]];
        let mut wire = Vec::new();
        for (i, block) in blocks.iter().enumerate() {
            let is_last = i == blocks.len() - 1;
            wire.extend(encode(block, is_last));
        }
        let (decoded, is_last) = decode_all(&wire);
        assert!(is_last);
        assert_eq!(decoded, data);
    }

    #[test]
    fn single_byte_at_a_time_matches_whole() {
        let wire = b"3\r\nabc\r\n0\r\n\r\n";
        let (whole, _) = decode_all(wire);

        let mut dec = ChunkedDecoder::new();
        let mut out = Vec::new();
        for b in wire {
            if dec.is_done() {
                break;
            }
            dec.decode((std::slice::from_ref(b), &[]), &mut out).unwrap();
        }
        assert_eq!(whole, out);
    }

    #[test]
    fn rejects_invalid_hex_size() {
        let mut dec = ChunkedDecoder::new();
        let mut out = Vec::new();
        let err = dec.decode((b"zz\r\n", &[]), &mut out).unwrap_err();
        assert_eq!(err.code(), codes::INVALID_CHUNK_FORMAT);
    }

    #[test]
    fn trailers_are_scanned_and_discarded() {
        let wire = b"4\r\ntest\r\n0\r\nX-Trailer: ignored\r\n\r\n";
        let (body, is_last) = decode_all(wire);
        assert!(is_last);
        assert_eq!(body, b"test");
    }
}
