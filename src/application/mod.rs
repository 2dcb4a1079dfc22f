//! Application layer: the payment workflow and its parts.
//!
//! `PaymentWorkflow` is the entry point. It validates forms, hands requests to
//! the `PaymentDispatcher`, and watches push payments with the
//! `ConfirmationPoller`, keeping at most one poll alive at a time.

pub mod dispatcher;
pub mod form;
pub mod poller;
pub mod presenter;
pub mod workflow;
