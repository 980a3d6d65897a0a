pub mod mailer;

pub use mailer::{LessonMailer, MailSettings, SmtpConfig};
