use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt, ReadBuf};

use crate::error::WireError;
use crate::stream::ChunkSource;

/// Streams a byte range of an open file in fixed-size blocks. Used by both
/// the CHUNKED and ZERO-COPY static-file transfer modes — the difference
/// between them is purely in how the response is framed by the caller, not
/// in how bytes are pulled off disk.
pub struct FileChunkSource {
    file: File,
    block_size: usize,
    remaining: u64,
    buf: Vec<u8>,
}

impl FileChunkSource {
    /// Open `path`, seek to `start`, and prepare to yield up to
    /// `end - start + 1` bytes in blocks of `block_size`.
    pub async fn open(
        path: &std::path::Path,
        start: u64,
        len: u64,
        block_size: usize,
    ) -> Result<Self, WireError> {
        let mut file = File::open(path).await.map_err(WireError::from)?;
        if start > 0 {
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(WireError::from)?;
        }
        Ok(Self {
            file,
            block_size,
            remaining: len,
            buf: vec![0u8; block_size],
        })
    }
}

impl ChunkSource for FileChunkSource {
    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Vec<u8>, WireError>>> {
        let this = self.get_mut();
        if this.remaining == 0 {
            return Poll::Ready(None);
        }
        let want = this.block_size.min(this.remaining as usize);
        let mut read_buf = ReadBuf::new(&mut this.buf[..want]);
        match Pin::new(&mut this.file).poll_read(cx, &mut read_buf) {
            Poll::Ready(Ok(())) => {
                let n = read_buf.filled().len();
                if n == 0 {
                    this.remaining = 0;
                    return Poll::Ready(None);
                }
                this.remaining = this.remaining.saturating_sub(n as u64);
                Poll::Ready(Some(Ok(read_buf.filled().to_vec())))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Some(Err(WireError::from(e)))),
            Poll::Pending => Poll::Pending,
        }
    }
}
