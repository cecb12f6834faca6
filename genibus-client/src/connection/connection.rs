//! Shared connection to a GENIBus unit
//!
//! The bus is strictly half-duplex: at most one transaction may be
//! outstanding per connection. [`Connection`] wraps one
//! [`TransactionEngine`] in an async mutex; the [`ContentionPolicy`] decides
//! whether a second caller waits for the running transaction or is turned
//! away with [`GeniError::Busy`].

use crate::engine::TransactionEngine;
use crate::statistics::TransactionStatistics;
use genibus_application::{DataItem, ReplyItem};
use genibus_core::{Address, ApduClass, GeniError, GeniResult, Operation};
use genibus_transport::{StreamAccessor, TransportLayer};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// What a request does while another transaction is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentionPolicy {
    /// Wait until the running transaction has completed or failed
    #[default]
    Block,
    /// Fail immediately with `GeniError::Busy`
    FailFast,
}

/// Connection to one GENIBus line
pub struct Connection<S: StreamAccessor> {
    engine: Mutex<TransactionEngine<S>>,
    policy: ContentionPolicy,
}

impl<S: StreamAccessor> Connection<S> {
    pub fn new(engine: TransactionEngine<S>, policy: ContentionPolicy) -> Self {
        Self {
            engine: Mutex::new(engine),
            policy,
        }
    }

    pub fn policy(&self) -> ContentionPolicy {
        self.policy
    }

    /// Exclusive access to the engine, honouring the contention policy
    pub async fn engine(&self) -> GeniResult<MutexGuard<'_, TransactionEngine<S>>> {
        match self.policy {
            ContentionPolicy::Block => Ok(self.engine.lock().await),
            ContentionPolicy::FailFast => self.engine.try_lock().map_err(|_| GeniError::Busy),
        }
    }

    pub async fn request(
        &self,
        class: ApduClass,
        operation: Operation,
        items: Vec<DataItem>,
    ) -> GeniResult<Vec<ReplyItem>> {
        self.engine().await?.request(class, operation, items).await
    }

    pub async fn request_to(
        &self,
        destination: Address,
        class: ApduClass,
        operation: Operation,
        items: Vec<DataItem>,
    ) -> GeniResult<Vec<ReplyItem>> {
        self.engine()
            .await?
            .request_to(destination, class, operation, items)
            .await
    }

    pub async fn get(&self, class: ApduClass, ids: &[u8]) -> GeniResult<Vec<ReplyItem>> {
        self.engine().await?.get(class, ids).await
    }

    pub async fn set(&self, class: ApduClass, items: Vec<DataItem>) -> GeniResult<Vec<ReplyItem>> {
        self.engine().await?.set(class, items).await
    }

    pub async fn info(&self, class: ApduClass, ids: &[u8]) -> GeniResult<Vec<ReplyItem>> {
        self.engine().await?.info(class, ids).await
    }

    pub async fn command(&self, ids: &[u8]) -> GeniResult<Vec<ReplyItem>> {
        self.engine().await?.command(ids).await
    }

    pub async fn connect(&self, timeout: Duration) -> GeniResult<Address> {
        self.engine().await?.connect(timeout).await
    }

    /// Snapshot of the engine's counters
    pub async fn statistics(&self) -> TransactionStatistics {
        self.engine.lock().await.statistics().clone()
    }

    pub async fn close(&self) -> GeniResult<()> {
        self.engine.lock().await.stream_mut().close().await
    }

    pub fn into_engine(self) -> TransactionEngine<S> {
        self.engine.into_inner()
    }
}

impl<S: TransportLayer> Connection<S> {
    /// Open the underlying transport
    pub async fn open(&self) -> GeniResult<()> {
        self.engine.lock().await.stream_mut().open().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Accepts requests and never answers
    struct SilentLine;

    #[async_trait]
    impl StreamAccessor for SilentLine {
        async fn set_timeout(&mut self, _timeout: Option<Duration>) -> GeniResult<()> {
            Ok(())
        }

        async fn read(&mut self, _buf: &mut [u8]) -> GeniResult<usize> {
            std::future::pending().await
        }

        async fn write(&mut self, buf: &[u8]) -> GeniResult<usize> {
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

    fn connection(policy: ContentionPolicy) -> Arc<Connection<SilentLine>> {
        let config = EngineConfig {
            destination: Address::new(0x20),
            reply_timeout: Some(Duration::from_millis(200)),
            ..EngineConfig::default()
        };
        Arc::new(Connection::new(TransactionEngine::new(SilentLine, config), policy))
    }

    #[tokio::test]
    async fn test_fail_fast_rejects_second_request() {
        let conn = connection(ContentionPolicy::FailFast);
        let first = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.get(ApduClass::MeasuredData, &[0x23]).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = conn.get(ApduClass::MeasuredData, &[0x23]).await;
        assert!(matches!(second, Err(GeniError::Busy)));

        let first = first.await.unwrap();
        assert!(matches!(first, Err(GeniError::Timeout)));
        assert_eq!(conn.statistics().await.telegrams_sent, 1);
    }

    #[tokio::test]
    async fn test_block_waits_for_running_transaction() {
        let conn = connection(ContentionPolicy::Block);
        let first = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.get(ApduClass::MeasuredData, &[0x23]).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = conn.get(ApduClass::MeasuredData, &[0x23]).await;
        assert!(matches!(second, Err(GeniError::Timeout)));
        assert!(matches!(first.await.unwrap(), Err(GeniError::Timeout)));

        let stats = conn.statistics().await;
        assert_eq!(stats.telegrams_sent, 2);
        assert_eq!(stats.timeouts, 2);
        assert_eq!(stats.abandoned, 0);
    }

    #[test]
    fn test_default_policy() {
        assert_eq!(ContentionPolicy::default(), ContentionPolicy::Block);
    }
}
