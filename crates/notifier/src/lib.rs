//! Notification delivery.
//!
//! Delivery is best-effort: a failed send is reported to the caller, which
//! logs it; nothing is queued or retried.

pub mod sendgrid;

use async_trait::async_trait;

use casewatch_common::error::AppError;
use casewatch_common::types::OutgoingEmail;

pub use sendgrid::SendGridMailer;

/// A transport that can deliver a rendered HTML email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError>;
}
