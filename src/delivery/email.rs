use crate::config::EmailConfig;
use crate::resilience::{retry_fixed, RetryPolicy};
use crate::{Error, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{error, info, warn};

/// Sends HTML digests over SMTP with STARTTLS.
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
    retry: RetryPolicy,
}

impl EmailSender {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let sender: Mailbox = config
            .sender
            .parse()
            .map_err(|_| Error::Config(format!("invalid sender address: {}", config.sender)))?;
        let recipient: Mailbox = config.recipient.parse().map_err(|_| {
            Error::Config(format!("invalid recipient address: {}", config.recipient))
        })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| Error::Smtp(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .build();

        info!(
            "Initialized EmailSender: {} -> {}",
            config.sender, config.recipient
        );

        Ok(Self {
            transport,
            sender,
            recipient,
            retry: RetryPolicy {
                max_attempts: config.max_retries.max(1),
                delay: Duration::from_secs(config.retry_delay_secs),
            },
        })
    }

    /// Send an HTML digest, retrying transient SMTP failures.
    pub async fn send_digest(&self, subject: &str, body_html: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body_html.to_string())
            .map_err(|e| Error::Smtp(format!("building message: {e}")))?;

        self.deliver(message).await
    }

    /// Send an HTML digest with inline images referenced by Content-ID.
    ///
    /// Image bytes are expected to be JPEG; undecodable entries were already
    /// filtered out upstream.
    pub async fn send_digest_with_images(
        &self,
        subject: &str,
        body_html: &str,
        images: &[(String, Vec<u8>)],
    ) -> Result<()> {
        let mut related = MultiPart::related().singlepart(SinglePart::html(body_html.to_string()));

        for (content_id, bytes) in images {
            let content_type = match ContentType::parse("image/jpeg") {
                Ok(ct) => ct,
                Err(e) => {
                    warn!("Could not attach image {}: {}", content_id, e);
                    continue;
                }
            };
            related = related.singlepart(
                Attachment::new_inline(content_id.clone()).body(bytes.clone(), content_type),
            );
        }

        let message = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(subject)
            .multipart(related)
            .map_err(|e| Error::Smtp(format!("building message: {e}")))?;

        info!("Sending digest with {} inline images", images.len());
        self.deliver(message).await
    }

    async fn deliver(&self, message: Message) -> Result<()> {
        retry_fixed(self.retry, "email delivery", || {
            let message = message.clone();
            async move {
                self.transport
                    .send(message)
                    .await
                    .map(|_| ())
                    .map_err(classify_smtp_error)
            }
        })
        .await?;

        info!("Email sent successfully to {}", self.recipient);
        Ok(())
    }
}

fn classify_smtp_error(e: lettre::transport::smtp::Error) -> Error {
    let code = e.status().map(|c| c.to_string());
    classify_rejection(e.is_permanent(), code.as_deref(), &e.to_string())
}

/// Permanent SMTP rejections must not be retried. Codes 530/534/535 are
/// credential failures; any other permanent code (550 and friends) is a
/// message rejection, not an auth problem.
fn classify_rejection(permanent: bool, code: Option<&str>, detail: &str) -> Error {
    if !permanent {
        return Error::Smtp(detail.to_string());
    }
    error!("SMTP rejected message permanently: {}", detail);
    match code {
        Some("530") | Some("534") | Some("535") => {
            Error::AuthenticationFailed(format!("SMTP rejection: {detail}"))
        }
        _ => Error::EmailRejected(detail.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            sender: "scout@example.com".to_string(),
            recipient: "resident@example.com".to_string(),
            password: "app-password".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sender_construction() {
        assert!(EmailSender::new(&config()).is_ok());
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut config = config();
        config.sender = "not an address".to_string();
        assert!(matches!(
            EmailSender::new(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let mut config = config();
        config.recipient = String::new();
        assert!(EmailSender::new(&config).is_err());
    }

    #[test]
    fn test_bad_credentials_classified_as_auth_failure() {
        let err = classify_rejection(true, Some("535"), "5.7.8 Username and Password not accepted");
        assert!(matches!(err, Error::AuthenticationFailed(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_mailbox_rejection_is_permanent_but_not_auth() {
        let err = classify_rejection(true, Some("550"), "5.1.1 mailbox unavailable");
        assert!(matches!(err, Error::EmailRejected(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transient_smtp_failure_is_retryable() {
        let err = classify_rejection(false, Some("451"), "4.3.0 try again later");
        assert!(matches!(err, Error::Smtp(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_permanent_failure_without_code_is_rejection() {
        let err = classify_rejection(true, None, "permanent protocol error");
        assert!(matches!(err, Error::EmailRejected(_)));
    }
}
