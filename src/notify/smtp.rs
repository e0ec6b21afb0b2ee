use crate::config::MailSettings;
use crate::error::AlertError;
use crate::notify::Mailer;
use crate::notify::Notification;
use crate::notify::NotifyError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::Message;
use lettre::SmtpTransport;
use lettre::Transport;
use tracing::info;

/// Sends notifications through an SMTP relay with STARTTLS.
pub struct SmtpMailer {
    transport: SmtpTransport,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpMailer {
    /// Builds the transport from settings, reading credentials from the configured
    /// environment variables. No connection is made until the first send.
    pub fn from_settings(settings: &MailSettings) -> Result<SmtpMailer, AlertError> {
        if settings.recipients.is_empty() {
            return Err(NotifyError::NoRecipients.into());
        }
        let username = credential(&settings.username_env)?;
        let password = credential(&settings.password_env)?;

        let sender: Mailbox = settings.sender.as_deref().unwrap_or(&username).parse()?;
        let recipients = settings
            .recipients
            .iter()
            .map(|recipient| recipient.parse::<Mailbox>())
            .collect::<Result<Vec<_>, _>>()?;

        let transport = SmtpTransport::starttls_relay(&settings.smtp_host)?
            .port(settings.smtp_port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(SmtpMailer {
            transport,
            sender,
            recipients,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, notification: &Notification) -> Result<(), AlertError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_HTML);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        let message = builder.body(notification.html.clone())?;

        let response = self.transport.send(&message)?;
        info!(
            recipients = self.recipients.len(),
            code = %response.code(),
            "alert mail sent"
        );
        Ok(())
    }
}

fn credential(name: &str) -> Result<String, AlertError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(NotifyError::MissingCredential(name.to_owned()).into()),
    }
}
