//! # papermill-mailer
//!
//! Outbound mail for notification jobs. Transports are resolved per
//! tenant with a default fallback; delivery mechanics live behind the
//! [`MailTransport`] trait so the orchestration core never depends on a
//! particular gateway.

pub mod compose;
pub mod registry;
pub mod transport;

pub use compose::{compose_invoice_mail, ComposedMail};
pub use registry::MailerRegistry;
pub use transport::{
    DisabledTransport, HttpMailTransport, MailAttachment, MailMessage, MailTransport, VerifyResult,
};
