//! Report delivery: HTML rendering and mail transport.
use crate::calibration::MatchRules;
use crate::calibration::Report;
use crate::error::AlertError;
use thiserror::Error;

pub mod html;
pub mod smtp;

pub use html::HtmlRenderer;
pub use smtp::SmtpMailer;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("No mail recipients configured")]
    NoRecipients,

    #[error("Environment variable '{0}' with SMTP credentials is not set")]
    MissingCredential(String),
}

/// A rendered message ready for delivery.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub subject: String,
    pub html: String,
}

/// Delivers notifications.
pub trait Mailer {
    fn send(&self, notification: &Notification) -> Result<(), AlertError>;
}

/// Projects the report onto its display columns and renders the message.
pub fn compose(report: &Report, rules: &MatchRules, subject: &str) -> Notification {
    let projected = report.project(rules);
    Notification {
        subject: subject.to_owned(),
        html: HtmlRenderer.render(&projected),
    }
}
