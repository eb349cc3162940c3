use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::User;
use crate::error::{EmailError, ValidationError};
use crate::validators::is_valid_email;

/// Outgoing account notifications
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_activation_email(&self, user: &User, activation_hash: &str) -> Result<(), EmailError>;
    async fn send_locked_email(&self, user: &User, comment: &str) -> Result<(), EmailError>;
    async fn send_reset_password_email(&self, user: &User, reset_token: &str) -> Result<(), EmailError>;
}

#[derive(Clone, Debug)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(s: String) -> Result<Self, ValidationError> {
        Ok(Self(is_valid_email(&s)?))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

/// Frontend pages the emails link to
#[derive(Clone, Debug)]
pub struct EmailLinks {
    pub activation_base_url: String,
    pub reset_password_base_url: String,
}

impl EmailLinks {
    pub fn activation_link(&self, hash: &str) -> String {
        format!("{}?hash={}", self.activation_base_url, hash)
    }

    pub fn reset_password_link(&self, token: &str) -> String {
        format!("{}?token={}", self.reset_password_base_url, token)
    }
}

#[derive(Serialize)]
pub struct SendEmailRequest {
    from: String,
    to: String,
    #[serde(rename = "Html")]
    html: String,
    #[serde(rename = "Subject")]
    subject: String,
}

/// Mail gateway client
#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: SenderEmail,
    links: EmailLinks,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SenderEmail,
        http_client: reqwest::Client,
        links: EmailLinks,
    ) -> Self {
        Self {
            http_client,
            base_url,
            sender,
            links,
        }
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        let url = format!("{}/email", self.base_url);
        let request = SendEmailRequest {
            from: self.sender.inner().to_string(),
            to: recipient.to_string(),
            subject: subject.to_string(),
            html: html_content.to_string(),
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {}", e);
                EmailError::ServiceUnavailable(e.to_string())
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Email service returned error: {}", e);
                EmailError::SendFailed(e.to_string())
            })?;

        tracing::info!(recipient = %recipient, subject = %subject, "Email sent");
        Ok(())
    }
}

#[async_trait]
impl EmailSender for EmailClient {
    async fn send_activation_email(&self, user: &User, activation_hash: &str) -> Result<(), EmailError> {
        let html = activation_body(&user.display_name(), &self.links.activation_link(activation_hash));
        self.send_email(&user.email, "Activate your account", &html).await
    }

    async fn send_locked_email(&self, user: &User, comment: &str) -> Result<(), EmailError> {
        let html = locked_body(&user.display_name(), comment);
        self.send_email(&user.email, "Your account has been locked", &html).await
    }

    async fn send_reset_password_email(&self, user: &User, reset_token: &str) -> Result<(), EmailError> {
        let html = reset_password_body(&user.display_name(), &self.links.reset_password_link(reset_token));
        self.send_email(&user.email, "Reset your password", &html).await
    }
}

/// Escape text interpolated into an HTML body or attribute
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn activation_body(name: &str, link: &str) -> String {
    format!(
        "<p>Hello {},</p>\
         <p>Please click <a href=\"{}\">here</a> to activate your account. \
         The link is valid for 24 hours.</p>",
        escape_html(name),
        escape_html(link)
    )
}

fn locked_body(name: &str, comment: &str) -> String {
    format!(
        "<p>Hello {},</p>\
         <p>Your account has been locked by an administrator.</p>\
         <p>Reason: {}</p>",
        escape_html(name),
        escape_html(comment)
    )
}

fn reset_password_body(name: &str, link: &str) -> String {
    format!(
        "<p>Hello {},</p>\
         <p>Click <a href=\"{}\">here</a> to choose a new password. \
         The link expires in 5 minutes.</p>",
        escape_html(name),
        escape_html(link)
    )
}

/// Kind of notification captured by `RecordingEmailSender`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Activation,
    Locked,
    ResetPassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: EmailKind,
    pub recipient: String,
    /// Activation hash, reset token or lock comment
    pub payload: String,
}

/// In-process sender that keeps every email instead of delivering it.
/// With `failing()` every send returns `EmailError::ServiceUnavailable`.
#[derive(Clone, Default)]
pub struct RecordingEmailSender {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    fail: bool,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }

    pub async fn last_of(&self, kind: EmailKind) -> Option<SentEmail> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|e| e.kind == kind)
            .cloned()
    }

    async fn record(&self, kind: EmailKind, user: &User, payload: &str) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::ServiceUnavailable("recording sender set to fail".to_string()));
        }
        self.sent.lock().await.push(SentEmail {
            kind,
            recipient: user.email.clone(),
            payload: payload.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_activation_email(&self, user: &User, activation_hash: &str) -> Result<(), EmailError> {
        self.record(EmailKind::Activation, user, activation_hash).await
    }

    async fn send_locked_email(&self, user: &User, comment: &str) -> Result<(), EmailError> {
        self.record(EmailKind::Locked, user, comment).await
    }

    async fn send_reset_password_email(&self, user: &User, reset_token: &str) -> Result<(), EmailError> {
        self.record(EmailKind::ResetPassword, user, reset_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewUser, Role, UserStatus};

    fn user() -> User {
        NewUser {
            first_name: "Alex".to_string(),
            last_name: "Martin".to_string(),
            email: "alex@example.com".to_string(),
            phone: "0600000000".to_string(),
            password_hash: "hash".to_string(),
            status: UserStatus::Deactivated,
            roles: vec![Role::User],
        }
        .into_user()
    }

    #[test]
    fn test_sender_email_parse_valid_email() {
        assert!(SenderEmail::parse("noreply@example.com".to_string()).is_ok());
    }

    #[test]
    fn test_sender_email_parse_invalid_email() {
        assert!(SenderEmail::parse("invalid-email".to_string()).is_err());
    }

    #[test]
    fn test_links_carry_payload() {
        let links = EmailLinks {
            activation_base_url: "http://app/activate".to_string(),
            reset_password_base_url: "http://app/reset".to_string(),
        };

        assert_eq!(links.activation_link("abc"), "http://app/activate?hash=abc");
        assert_eq!(links.reset_password_link("t-1"), "http://app/reset?token=t-1");
        assert!(activation_body("Martin Alex", &links.activation_link("abc")).contains("?hash=abc"));
    }

    #[test]
    fn test_lock_body_escapes_comment_and_name() {
        let html = locked_body("<b>Alex</b>", r#"<script>alert("x")</script> & more"#);

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>Alex</b>"));
        assert!(html.contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; more"));
        assert!(html.contains("Hello &lt;b&gt;Alex&lt;/b&gt;,"));
    }

    #[test]
    fn test_link_attribute_is_escaped() {
        let html = reset_password_body("Alex", "http://app/reset?token=t\"onclick=\"x");
        assert!(html.contains("href=\"http://app/reset?token=t&quot;onclick=&quot;x\""));
    }

    #[tokio::test]
    async fn test_recording_sender_keeps_emails() {
        let sender = RecordingEmailSender::new();
        sender.send_activation_email(&user(), "h").await.unwrap();
        sender.send_locked_email(&user(), "spam").await.unwrap();

        assert_eq!(sender.sent().await.len(), 2);
        let locked = sender.last_of(EmailKind::Locked).await.unwrap();
        assert_eq!(locked.recipient, "alex@example.com");
        assert_eq!(locked.payload, "spam");
    }

    #[tokio::test]
    async fn test_failing_sender() {
        let sender = RecordingEmailSender::failing();
        assert!(sender.send_reset_password_email(&user(), "t").await.is_err());
        assert!(sender.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_unavailable() {
        let client = EmailClient::new(
            "http://127.0.0.1:1".to_string(),
            SenderEmail::parse("noreply@example.com".to_string()).unwrap(),
            reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(200))
                .build()
                .unwrap(),
            EmailLinks {
                activation_base_url: "http://app/activate".to_string(),
                reset_password_base_url: "http://app/reset".to_string(),
            },
        );

        let result = client.send_activation_email(&user(), "h").await;
        assert!(matches!(result, Err(EmailError::ServiceUnavailable(_))));
    }
}
