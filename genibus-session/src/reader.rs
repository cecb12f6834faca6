//! Telegram transfer over a byte stream

use crate::telegram::Telegram;
use genibus_core::byteops::dump_hex;
use genibus_core::constants::{CRC_LEN, LENGTH, PDU_START};
use genibus_core::{GeniError, GeniResult};
use genibus_transport::StreamAccessor;
use std::time::Duration;

/// Reads and writes whole telegrams on a stream
pub struct TelegramReader;

impl TelegramReader {
    /// Read one telegram from the stream
    ///
    /// The start delimiter and length byte are read first; the length byte
    /// then tells how many bytes (plus checksum) follow. The returned buffer
    /// is not validated; pass it to [`crate::TelegramCodec::decode`].
    ///
    /// When `timeout` is given it bounds the whole telegram, not a single
    /// read, and expiry is reported as `GeniError::Timeout`.
    pub async fn read_telegram<S: StreamAccessor + ?Sized>(
        stream: &mut S,
        timeout: Option<Duration>,
    ) -> GeniResult<Vec<u8>> {
        let raw = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, Self::read_frame(stream))
                .await
                .map_err(|_| GeniError::Timeout)??,
            None => Self::read_frame(stream).await?,
        };
        log::debug!("RX {}", dump_hex(&raw).join(" "));
        Ok(raw)
    }

    async fn read_frame<S: StreamAccessor + ?Sized>(stream: &mut S) -> GeniResult<Vec<u8>> {
        let mut header = [0u8; LENGTH + 1];
        stream.read_exact(&mut header).await?;

        let remaining = header[LENGTH] as usize + CRC_LEN;
        let mut data = vec![0u8; LENGTH + 1 + remaining];
        data[..header.len()].copy_from_slice(&header);
        stream.read_exact(&mut data[header.len()..]).await?;
        Ok(data)
    }

    /// Write a telegram and flush it onto the line
    pub async fn write_telegram<S: StreamAccessor + ?Sized>(
        stream: &mut S,
        telegram: &Telegram,
    ) -> GeniResult<()> {
        log::debug!(
            "TX {} ({} byte PDU)",
            dump_hex(telegram.as_bytes()).join(" "),
            telegram.len() - PDU_START - CRC_LEN
        );
        stream.write_all(telegram.as_bytes()).await?;
        stream.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::TelegramCodec;
    use async_trait::async_trait;
    use genibus_core::{Address, StartDelimiter};
    use std::collections::VecDeque;

    /// Hands out queued bytes in small chunks, then stalls
    #[derive(Default)]
    struct ChunkedStream {
        input: VecDeque<u8>,
        output: Vec<u8>,
        chunk: usize,
    }

    #[async_trait]
    impl StreamAccessor for ChunkedStream {
        async fn set_timeout(&mut self, _timeout: Option<Duration>) -> GeniResult<()> {
            Ok(())
        }

        async fn read(&mut self, buf: &mut [u8]) -> GeniResult<usize> {
            if self.input.is_empty() {
                std::future::pending::<()>().await;
            }
            let n = buf.len().min(self.chunk).min(self.input.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.input.pop_front().unwrap_or_default();
            }
            Ok(n)
        }

        async fn write(&mut self, buf: &[u8]) -> GeniResult<usize> {
            self.output.extend_from_slice(buf);
            Ok(buf.len())
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
    async fn test_read_chunked_telegram() {
        let reply = [0x24, 0x06, 0x01, 0x20, 0x02, 0x02, 0x0B, 0xB8, 0x9B, 0x21];
        let mut stream = ChunkedStream {
            input: reply.iter().copied().chain([0x24, 0x02]).collect(),
            chunk: 3,
            ..Default::default()
        };

        let raw = TelegramReader::read_telegram(&mut stream, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(raw, reply);
        // Bytes of the next telegram stay queued.
        assert_eq!(stream.input.len(), 2);
    }

    #[tokio::test]
    async fn test_read_times_out_on_partial_telegram() {
        let mut stream = ChunkedStream {
            input: [0x24, 0x06, 0x01, 0x20].into_iter().collect(),
            chunk: 8,
            ..Default::default()
        };

        let result = TelegramReader::read_telegram(&mut stream, Some(Duration::from_millis(50))).await;
        assert!(matches!(result, Err(GeniError::Timeout)));
    }

    #[tokio::test]
    async fn test_write_telegram() {
        let codec = TelegramCodec::new();
        let telegram = codec
            .encode(
                StartDelimiter::DataRequest,
                Address::new(0x20),
                Address::new(0x01),
                &[0x02, 0x01, 0x23],
            )
            .unwrap();

        let mut stream = ChunkedStream::default();
        TelegramReader::write_telegram(&mut stream, &telegram).await.unwrap();
        assert_eq!(stream.output, telegram.as_bytes());
    }
}
