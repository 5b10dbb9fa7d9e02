//! Refund outcome callbacks.
//!
//! Hooks are the only user-facing signal for refund outcomes. Both methods
//! have default no-op implementations; implement only what you need.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rf402::executor::TransferReceipt;
use rf402::policy::PolicyDenial;
use rf402::refund::PendingRefund;

/// Why a refund did not execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundFailure {
    /// Human-readable detail.
    pub message: String,
    /// Whether the authority may re-deliver the refund.
    pub retryable: bool,
    /// Local policy denial, when that was the cause.
    pub denial: Option<PolicyDenial>,
}

/// Callbacks invoked after each refund outcome.
pub trait RefundHooks: Send + Sync {
    /// Called after a refund transfer succeeded.
    fn on_refund_executed<'a>(
        &'a self,
        _refund: &'a PendingRefund,
        _receipt: &'a TransferReceipt,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async {})
    }

    /// Called after a refund was denied or its transfer failed.
    fn on_refund_failed<'a>(
        &'a self,
        _refund: &'a PendingRefund,
        _failure: &'a RefundFailure,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async {})
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl RefundHooks for NoHooks {}

impl<T: RefundHooks + ?Sized> RefundHooks for Arc<T> {
    fn on_refund_executed<'a>(
        &'a self,
        refund: &'a PendingRefund,
        receipt: &'a TransferReceipt,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        (**self).on_refund_executed(refund, receipt)
    }

    fn on_refund_failed<'a>(
        &'a self,
        refund: &'a PendingRefund,
        failure: &'a RefundFailure,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        (**self).on_refund_failed(refund, failure)
    }
}
