//! Delivery of login QR codes.

use crate::error::Result;
use async_trait::async_trait;

/// Surfaces a login QR code to a human.
///
/// Having a sink is what makes a session "unattended": without one the
/// login page is left for whoever is watching the browser window.
#[async_trait]
pub trait QrCodeSink: Send + Sync {
    /// Hand over the image reference (usually a URL or data URI).
    async fn deliver(&self, image_ref: &str) -> Result<()>;
}

/// Writes the QR code reference to the log for an operator to open.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogQrSink;

#[async_trait]
impl QrCodeSink for LogQrSink {
    async fn deliver(&self, image_ref: &str) -> Result<()> {
        tracing::warn!("Scan this QR code to log in: {}", image_ref);
        Ok(())
    }
}
