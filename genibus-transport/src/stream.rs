//! Byte-stream contract between the protocol stack and a physical line
//!
//! GENIBus telegrams travel over half-duplex RS-485 or a TCP tunnel. The
//! stack above only ever needs ordered bytes in and out, a way to drop stale
//! input, and an open/close lifecycle.

use crate::error::{GeniError, GeniResult};
use async_trait::async_trait;
use std::time::Duration;

/// Ordered byte stream to one GENIBus line
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Per-read deadline; `None` blocks until data arrives
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> GeniResult<()>;

    /// Read whatever is available, 0 at end of stream
    ///
    /// An elapsed deadline is `GeniError::Timeout`.
    async fn read(&mut self, buf: &mut [u8]) -> GeniResult<usize>;

    /// Fill `buf` completely; end of stream first is `UnexpectedEof`
    async fn read_exact(&mut self, mut buf: &mut [u8]) -> GeniResult<()> {
        while !buf.is_empty() {
            let n = self.read(buf).await?;
            if n == 0 {
                return Err(GeniError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Line closed in the middle of a telegram",
                )));
            }
            buf = &mut buf[n..];
        }
        Ok(())
    }

    async fn write(&mut self, buf: &[u8]) -> GeniResult<usize>;

    async fn write_all(&mut self, buf: &[u8]) -> GeniResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(GeniError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Line accepted no more bytes",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Push buffered bytes onto the line
    async fn flush(&mut self) -> GeniResult<()>;

    /// Drop received bytes nobody has read yet and report how many
    ///
    /// Called before a request that follows a timeout or an abandoned
    /// transaction, so a late reply cannot answer the new request.
    async fn discard_input(&mut self) -> GeniResult<usize> {
        Ok(0)
    }

    fn is_closed(&self) -> bool;

    async fn close(&mut self) -> GeniResult<()>;
}

/// A stream that owns its line and can (re)open it
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    async fn open(&mut self) -> GeniResult<()>;
}

#[async_trait]
impl<T: StreamAccessor + ?Sized> StreamAccessor for Box<T> {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> GeniResult<()> {
        (**self).set_timeout(timeout).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> GeniResult<usize> {
        (**self).read(buf).await
    }

    async fn write(&mut self, buf: &[u8]) -> GeniResult<usize> {
        (**self).write(buf).await
    }

    async fn flush(&mut self) -> GeniResult<()> {
        (**self).flush().await
    }

    async fn discard_input(&mut self) -> GeniResult<usize> {
        (**self).discard_input().await
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    async fn close(&mut self) -> GeniResult<()> {
        (**self).close().await
    }
}

#[async_trait]
impl<T: TransportLayer + ?Sized> TransportLayer for Box<T> {
    async fn open(&mut self) -> GeniResult<()> {
        (**self).open().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out at most `step` bytes per read and accepts at most `step`
    /// bytes per write
    struct Trickle {
        input: Vec<u8>,
        output: Vec<u8>,
        step: usize,
    }

    #[async_trait]
    impl StreamAccessor for Trickle {
        async fn set_timeout(&mut self, _timeout: Option<Duration>) -> GeniResult<()> {
            Ok(())
        }

        async fn read(&mut self, buf: &mut [u8]) -> GeniResult<usize> {
            let n = buf.len().min(self.step).min(self.input.len());
            buf[..n].copy_from_slice(&self.input[..n]);
            self.input.drain(..n);
            Ok(n)
        }

        async fn write(&mut self, buf: &[u8]) -> GeniResult<usize> {
            let n = buf.len().min(self.step);
            self.output.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        async fn flush(&mut self) -> GeniResult<()> {
            Ok(())
        }

        fn is_closed(&self) -> bool {
            false
        }

        async fn close(&mut self) -> GeniResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_exact_io_over_short_reads_and_writes() {
        let mut line = Trickle {
            input: vec![0x24, 0x06, 0x01, 0x20, 0x02],
            output: Vec::new(),
            step: 2,
        };

        let mut header = [0u8; 4];
        line.read_exact(&mut header).await.unwrap();
        assert_eq!(header, [0x24, 0x06, 0x01, 0x20]);

        let mut rest = [0u8; 3];
        let err = line.read_exact(&mut rest).await.unwrap_err();
        assert!(matches!(err, GeniError::Connection(e) if e.kind() == std::io::ErrorKind::UnexpectedEof));

        line.write_all(&[0x27, 0x05, 0x20, 0x01, 0x02]).await.unwrap();
        assert_eq!(line.output, vec![0x27, 0x05, 0x20, 0x01, 0x02]);

        line.step = 0;
        assert!(line.write_all(&[0x27]).await.is_err());
    }

    #[tokio::test]
    async fn test_boxed_stream_forwards() {
        let mut line: Box<dyn StreamAccessor> = Box::new(Trickle {
            input: vec![0x01, 0x02, 0x03],
            output: Vec::new(),
            step: 8,
        });
        assert_eq!(line.discard_input().await.unwrap(), 0);

        let mut buf = [0u8; 8];
        assert_eq!(line.read(&mut buf).await.unwrap(), 3);
        assert!(!line.is_closed());
    }
}
