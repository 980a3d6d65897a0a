use anyhow::{anyhow, Result};
use async_trait::async_trait;
use interfaces::defs::{FailureReport, FailureReporter, Lesson, LessonNotifier};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::Tls;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};
use url::Url;

#[derive(Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl SmtpConfig {
    /// Parse SMTP settings from a URI; the password is supplied separately.
    /// Expected URI format: smtp://username@server:port?tls=true
    pub fn from_uri(uri: &str, password: Option<String>) -> Result<Self> {
        let parsed_uri = Url::parse(uri).map_err(|e| anyhow!("Invalid SMTP URI '{}': {}", uri, e))?;

        if parsed_uri.scheme() != "smtp" {
            return Err(anyhow!("URI must use 'smtp://' scheme, got: {}", parsed_uri.scheme()));
        }

        let server = parsed_uri
            .host_str()
            .ok_or_else(|| anyhow!("No server specified in URI: {}", uri))?
            .to_string();

        let use_tls = parsed_uri
            .query_pairs()
            .find(|(key, _)| key == "tls")
            .map(|(_, value)| value.parse().unwrap_or(true))
            .unwrap_or(true);

        // Submission port with STARTTLS, plain SMTP otherwise
        let port = parsed_uri.port().unwrap_or(if use_tls { 587 } else { 25 });

        let username = match parsed_uri.username() {
            "" => None,
            user => Some(user.to_string()),
        };

        Ok(Self {
            server,
            port,
            username,
            password: password.filter(|p| !p.is_empty()),
            use_tls,
        })
    }

    pub fn transport(&self) -> Result<SmtpTransport> {
        let builder = if self.use_tls {
            SmtpTransport::starttls_relay(&self.server)?.port(self.port)
        } else {
            SmtpTransport::builder_dangerous(&self.server)
                .port(self.port)
                .tls(Tls::None)
        };

        let builder = match (&self.username, &self.password) {
            (Some(user), Some(password)) => {
                builder.credentials(Credentials::new(user.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }
}

/// Addresses and subject line used for outgoing mail.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub sender: String,
    pub recipient: String,
    pub operator: Option<String>,
    pub subject_prefix: String,
}

/// Emails lessons to the learner and failure reports to the operator.
pub struct LessonMailer {
    smtp: SmtpConfig,
    settings: MailSettings,
}

impl LessonMailer {
    pub fn new(smtp: SmtpConfig, settings: MailSettings) -> Self {
        info!("Mail delivery via {}:{} to {}", smtp.server, smtp.port, settings.recipient);
        Self { smtp, settings }
    }

    pub fn lesson_subject(&self, lesson: &Lesson) -> String {
        format!("{}: {} ({})", self.settings.subject_prefix, lesson.title, lesson.track)
    }

    pub fn build_lesson_message(&self, lesson: &Lesson) -> Result<Message> {
        let message = Message::builder()
            .from(self.settings.sender.parse::<Mailbox>()?)
            .to(self.settings.recipient.parse::<Mailbox>()?)
            .subject(self.lesson_subject(lesson))
            .header(ContentType::TEXT_HTML)
            .body(lesson.content_html.clone())?;
        Ok(message)
    }

    /// Plain-text failure report, or `None` when no operator address is set.
    pub fn build_failure_message(&self, report: &FailureReport) -> Result<Option<Message>> {
        let operator = match &self.settings.operator {
            Some(operator) => operator,
            None => return Ok(None),
        };

        let mut body = format!(
            "Lesson generation was abandoned.\n\nDate: {}\nTrack: {}\nSubtopic: {}\nPrimary error: {}\n",
            report.date, report.track, report.subtopic, report.primary_error
        );
        if let Some(fallback) = &report.fallback_error {
            body.push_str(&format!("Fallback error: {}\n", fallback));
        }
        body.push_str(&format!("Occurred at: {}\n", report.occurred_at.to_rfc3339()));

        let message = Message::builder()
            .from(self.settings.sender.parse::<Mailbox>()?)
            .to(operator.parse::<Mailbox>()?)
            .subject(format!(
                "{} failure: {} on {}",
                self.settings.subject_prefix, report.track, report.date
            ))
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;
        Ok(Some(message))
    }

    async fn send(&self, message: Message) -> Result<()> {
        let transport = self.smtp.transport()?;

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| anyhow!("Mail task failed: {}", e))?
            .map_err(|e| anyhow!("Failed to send email via SMTP: {}", e))?;
        Ok(())
    }
}

#[async_trait]
impl LessonNotifier for LessonMailer {
    async fn deliver(&self, lesson: &Lesson) -> Result<()> {
        let message = self.build_lesson_message(lesson)?;
        self.send(message).await?;
        info!("Emailed lesson '{}' to {}", lesson.title, self.settings.recipient);
        Ok(())
    }
}

#[async_trait]
impl FailureReporter for LessonMailer {
    async fn report(&self, report: &FailureReport) -> Result<()> {
        match self.build_failure_message(report)? {
            Some(message) => {
                self.send(message).await?;
                info!("Sent failure report for {} to operator", report.track);
            }
            None => warn!("No operator address configured; failure not emailed: {}", report.summary_line()),
        }
        Ok(())
    }
}
