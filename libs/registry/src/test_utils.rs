//! Sink test doubles shared by unit and e2e tests.

use crate::connection::ConnectionSink;
use crate::error::{SinkError, SinkResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A sink that collects every payload it receives.
#[derive(Debug, Default)]
pub struct CollectorSink {
    payloads: Mutex<Vec<Bytes>>,
    fail_next: AtomicBool,
    closed: AtomicBool,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payloads(&self) -> Vec<Bytes> {
        self.payloads.lock().clone()
    }

    pub fn payload_count(&self) -> usize {
        self.payloads.lock().len()
    }

    pub fn clear(&self) {
        self.payloads.lock().clear();
    }

    /// Make exactly the next write fail.
    pub fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ConnectionSink for CollectorSink {
    async fn write(&self, payload: Bytes) -> SinkResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(SinkError::Closed);
        }
        if self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(SinkError::send_failed("injected failure"));
        }
        self.payloads.lock().push(payload);
        Ok(())
    }

    async fn close(&self) -> SinkResult<()> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// A sink whose writes always fail, simulating a broken transport.
#[derive(Debug, Default)]
pub struct FailingSink;

#[async_trait]
impl ConnectionSink for FailingSink {
    async fn write(&self, _payload: Bytes) -> SinkResult<()> {
        Err(SinkError::send_failed("broken transport"))
    }

    async fn close(&self) -> SinkResult<()> {
        Ok(())
    }
}

/// A sink that sleeps before accepting each write, for slow-writer tests.
#[derive(Debug)]
pub struct SlowSink {
    delay: Duration,
    inner: CollectorSink,
}

impl SlowSink {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: CollectorSink::new(),
        }
    }

    pub fn payload_count(&self) -> usize {
        self.inner.payload_count()
    }
}

#[async_trait]
impl ConnectionSink for SlowSink {
    async fn write(&self, payload: Bytes) -> SinkResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.write(payload).await
    }

    async fn close(&self) -> SinkResult<()> {
        self.inner.close().await
    }
}
