//! Wait strategies between scrolling and capturing.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

// ============================================================================
// Constants
// ============================================================================

/// Default pause after each scroll before capturing.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

// ============================================================================
// SettleStrategy
// ============================================================================

/// Decides when the page is ready to be captured after a scroll.
///
/// Content that loads slower than the strategy waits is captured in
/// whatever state it is in.
#[async_trait]
pub trait SettleStrategy: Send + Sync {
    /// Suspends until the page is considered settled.
    async fn settle(&self);
}

// ============================================================================
// FixedDelay
// ============================================================================

/// Sleeps for a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    /// Creates a fixed delay.
    #[inline]
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self(delay)
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self(DEFAULT_SETTLE_DELAY)
    }
}

#[async_trait]
impl SettleStrategy for FixedDelay {
    async fn settle(&self) {
        if !self.0.is_zero() {
            sleep(self.0).await;
        }
    }
}

// ============================================================================
// Immediate
// ============================================================================

/// Does not wait at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Immediate;

#[async_trait]
impl SettleStrategy for Immediate {
    async fn settle(&self) {}
}

// ============================================================================
// Tests
// ============================================================================
