//! Scheduling of simulated reply latency.

use std::time::Duration;

use async_trait::async_trait;

/// Waits before a pending reply is produced.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real timer delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Skips the wait entirely, only yielding to the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateDelay;

#[async_trait]
impl Delay for ImmediateDelay {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}
