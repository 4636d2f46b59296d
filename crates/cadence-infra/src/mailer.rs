//! Logging mailer.
//!
//! Stands in for a real email provider: every delivery is written to the log
//! and acknowledged with a generated confirmation id. Receipts are remembered
//! per idempotency key so a retried or replayed step is not delivered twice.
//!
//! The receipt memory is bounded. When it outgrows its capacity the older
//! half is forgotten; a retry only ever repeats a recent key.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cadence_core::engine::context::{DeliveryError, MessageSender};
use cadence_types::execution::{SendReceipt, SendRequest};
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

/// Receipts remembered by [`LogMailer::new`].
pub const DEFAULT_RECEIPT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
pub struct LogMailer {
    /// Idempotency key -> (delivery sequence, receipt).
    receipts: Arc<DashMap<String, (u64, SendReceipt)>>,
    deliveries: Arc<AtomicU64>,
    capacity: usize,
}

impl Default for LogMailer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RECEIPT_CAPACITY)
    }
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            receipts: Arc::new(DashMap::new()),
            deliveries: Arc::new(AtomicU64::new(0)),
            capacity: capacity.max(2),
        }
    }

    /// Number of distinct deliveries performed.
    pub fn delivered_count(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst) as usize
    }

    /// Number of receipts currently remembered for deduplication.
    pub fn remembered(&self) -> usize {
        self.receipts.len()
    }

    /// Forget the older half of the receipts once over capacity.
    fn evict(&self) {
        if self.receipts.len() <= self.capacity {
            return;
        }
        let newest = self.deliveries.load(Ordering::SeqCst);
        let keep = (self.capacity / 2) as u64;
        self.receipts.retain(|_, (seq, _)| *seq + keep > newest);
        tracing::debug!(remembered = self.receipts.len(), "receipt memory trimmed");
    }
}

impl MessageSender for LogMailer {
    async fn send(&self, request: &SendRequest) -> Result<SendReceipt, DeliveryError> {
        if request.to.trim().is_empty() {
            return Err(DeliveryError::Rejected("recipient is empty".to_string()));
        }

        let receipt = match self.receipts.entry(request.idempotency_key.clone()) {
            Entry::Occupied(existing) => {
                tracing::debug!(
                    idempotency_key = request.idempotency_key.as_str(),
                    "duplicate delivery suppressed"
                );
                return Ok(existing.get().1.clone());
            }
            Entry::Vacant(slot) => {
                let receipt = SendReceipt {
                    success: true,
                    confirmation_id: confirmation_id(),
                    timestamp: Utc::now(),
                };
                tracing::info!(
                    to = request.to.as_str(),
                    subject = request.subject.as_str(),
                    body = request.body.as_str(),
                    confirmation_id = receipt.confirmation_id.as_str(),
                    "message delivered"
                );
                let seq = self.deliveries.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert((seq, receipt.clone()));
                receipt
            }
        };

        self.evict();
        Ok(receipt)
    }
}

/// `msg_<unix millis>_<9 random hex chars>`.
fn confirmation_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("msg_{}_{}", Utc::now().timestamp_millis(), &suffix[..9])
}
