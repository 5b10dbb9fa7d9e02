//! Refund hooks that forward outcomes to an [`EventSink`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rf402::event::timestamp_now;
use rf402::executor::TransferReceipt;
use rf402::refund::PendingRefund;
use rf402::{Event, EventSink};
use rf402_channel::{RefundFailure, RefundHooks};

/// Logs each refund outcome and submits it to a sink as a single-event batch.
///
/// Sink failures are logged and otherwise ignored.
#[derive(Clone)]
pub struct SinkHooks {
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for SinkHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHooks").finish_non_exhaustive()
    }
}

impl SinkHooks {
    /// Creates hooks submitting to `sink`.
    #[must_use]
    pub fn new(sink: impl EventSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    async fn emit(&self, event: Event) {
        let kind = event.kind();
        match self.sink.submit(vec![event]).await {
            Ok(summary) if summary.rejected > 0 => {
                tracing::warn!(kind, errors = ?summary.errors, "Event sink rejected event");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(kind, error = %e, "Event sink submit failed"),
        }
    }
}

impl RefundHooks for SinkHooks {
    fn on_refund_executed<'a>(
        &'a self,
        refund: &'a PendingRefund,
        receipt: &'a TransferReceipt,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                refund_id = %refund.id,
                network = %refund.network,
                amount_usd = %refund.amount_usd,
                tx_id = %receipt.tx_id,
                "Refund executed"
            );
            self.emit(Event::RefundExecuted {
                timestamp: timestamp_now(),
                refund_id: refund.id.clone(),
                receipt: receipt.clone(),
            })
            .await;
        })
    }

    fn on_refund_failed<'a>(
        &'a self,
        refund: &'a PendingRefund,
        failure: &'a RefundFailure,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            tracing::warn!(
                refund_id = %refund.id,
                network = %refund.network,
                retryable = failure.retryable,
                "Refund failed: {}",
                failure.message
            );
            self.emit(Event::RefundFailed {
                timestamp: timestamp_now(),
                refund_id: refund.id.clone(),
                network: refund.network.to_string(),
                message: failure.message.clone(),
                retryable: failure.retryable,
                denial: failure.denial,
            })
            .await;
        })
    }
}
