//! Report delivery over authenticated SMTP.
//!
//! Every precondition is checked before a connection is opened, so a bad
//! configuration never reaches the relay. With threading enabled each message
//! replies to the previous one and the chain is kept in `thread.json`.

use std::path::Path;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use recap_core::ActivityWindow;
use recap_store::ThreadState;

pub const DEFAULT_SUBJECT: &str = "Weekly Report - {author} - {date_range}";
pub const DEFAULT_PORT: u16 = 465;
/// Port that speaks TLS from the first byte; anything else upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail is not configured: missing {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid address `{address}`: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("cannot build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

impl MailError {
    /// Problems with settings, as opposed to problems talking to the relay.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Missing(_) | Self::Address { .. })
    }
}

// ── Config ──

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject_template: String,
    /// Reply to the previously sent report.
    pub thread: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: DEFAULT_PORT,
            smtp_user: String::new(),
            smtp_password: String::new(),
            from: String::new(),
            to: Vec::new(),
            cc: Vec::new(),
            subject_template: DEFAULT_SUBJECT.to_string(),
            thread: false,
        }
    }
}

impl MailConfig {
    /// Every missing setting at once, so one run reports them all.
    pub fn validate(&self) -> Result<(), MailError> {
        let mut missing = Vec::new();
        if self.to.iter().all(|r| r.trim().is_empty()) {
            missing.push("MAIL_TO");
        }
        if self.smtp_host.trim().is_empty() {
            missing.push("SMTP_HOST");
        }
        if self.smtp_user.trim().is_empty() {
            missing.push("SMTP_USER");
        }
        if self.smtp_password.is_empty() {
            missing.push("SMTP_PASSWORD");
        }
        if self.from.trim().is_empty() {
            missing.push("MAIL_FROM");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MailError::Missing(missing))
        }
    }
}

/// Split a `MAIL_TO`/`MAIL_CC` style list on commas or semicolons.
pub fn parse_recipients(list: &str) -> Vec<String> {
    list.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ── Subject ──

/// Substitute `{author}` and `{date_range}` (dotted form).
pub fn render_subject(template: &str, author: &str, window: &ActivityWindow) -> String {
    let template = if template.trim().is_empty() {
        DEFAULT_SUBJECT
    } else {
        template
    };
    template
        .replace("{author}", author)
        .replace("{date_range}", &window.dotted())
}

// ── Message ──

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.trim().parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

/// `<uuid@sender-domain>`
pub fn new_message_id(from: &Mailbox) -> String {
    format!("<{}@{}>", uuid::Uuid::new_v4(), from.email.domain())
}

/// A built message plus the id it will be threaded by.
#[derive(Debug)]
pub struct Outgoing {
    pub message: Message,
    pub message_id: String,
}

pub fn build_message(
    cfg: &MailConfig,
    subject: &str,
    html: &str,
    thread: Option<&ThreadState>,
) -> Result<Outgoing, MailError> {
    let from = mailbox(&cfg.from)?;
    let message_id = new_message_id(&from);
    let mut builder = Message::builder()
        .from(from)
        .subject(subject)
        .message_id(Some(message_id.clone()));
    for to in cfg.to.iter().filter(|s| !s.trim().is_empty()) {
        builder = builder.to(mailbox(to)?);
    }
    for cc in cfg.cc.iter().filter(|s| !s.trim().is_empty()) {
        builder = builder.cc(mailbox(cc)?);
    }
    if let Some(state) = thread {
        if let Some(parent) = state.in_reply_to() {
            builder = builder.in_reply_to(parent.to_string());
        }
        if let Some(refs) = state.references_header() {
            builder = builder.references(refs);
        }
    }
    let message = builder
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())?;
    Ok(Outgoing {
        message,
        message_id,
    })
}

// ── Transport ──

fn transport(cfg: &MailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let builder = if cfg.smtp_port == IMPLICIT_TLS_PORT {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)?
    };
    Ok(builder
        .port(cfg.smtp_port)
        .credentials(Credentials::new(
            cfg.smtp_user.clone(),
            cfg.smtp_password.clone(),
        ))
        .build())
}

/// Validate and build the message. The thread chain is loaded only when
/// threading is enabled; otherwise `thread_path` is not touched and the
/// message carries no reply headers.
pub fn prepare(
    cfg: &MailConfig,
    subject: &str,
    html: &str,
    thread_path: &Path,
) -> Result<(Outgoing, Option<ThreadState>), MailError> {
    cfg.validate()?;
    let state = cfg.thread.then(|| ThreadState::load(thread_path));
    let outgoing = build_message(cfg, subject, html, state.as_ref())?;
    Ok((outgoing, state))
}

/// Validate, build, send and (when threading) record the new Message-ID.
/// Returns the Message-ID of the sent report.
///
/// With threading disabled `thread_path` is never read or written.
pub async fn send_report(
    cfg: &MailConfig,
    subject: &str,
    html: &str,
    thread_path: &Path,
) -> Result<String, MailError> {
    let (outgoing, mut state) = prepare(cfg, subject, html, thread_path)?;

    let mailer = transport(cfg)?;
    mailer.send(outgoing.message).await?;
    tracing::info!(
        host = %cfg.smtp_host,
        recipients = cfg.to.len() + cfg.cc.len(),
        message_id = %outgoing.message_id,
        "report sent"
    );

    if let Some(state) = state.as_mut() {
        state.record_sent(&outgoing.message_id);
        // The mail is already out; a lost chain only breaks threading.
        if let Err(e) = state.save(thread_path) {
            tracing::warn!(path = %thread_path.display(), error = %e, "could not save thread state");
        }
    }
    Ok(outgoing.message_id)
}
