// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Out-of-band delivery of activation and password-reset codes.

use crate::config::{Config, SmtpConfig};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::sync::{Arc, Mutex};

/// Delivers codes to a user's email address.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_activation(&self, email: &str, name: &str, code: &str) -> anyhow::Result<()>;

    async fn send_password_reset(&self, email: &str, name: &str, code: &str)
        -> anyhow::Result<()>;
}

/// Pick the notifier the configuration asks for.
pub fn from_config(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "SMTP email delivery enabled");
            Ok(Arc::new(SmtpNotifier::new(
                smtp,
                &config.verify_url,
                &config.reset_pass_url,
            )?))
        }
        None => {
            tracing::warn!("SMTP not configured, emails will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

// ─── SMTP ────────────────────────────────────────────────────

/// Sends HTML emails over SMTP with STARTTLS.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    verify_url: String,
    reset_pass_url: String,
}

impl SmtpNotifier {
    pub fn new(smtp: &SmtpConfig, verify_url: &str, reset_pass_url: &str) -> anyhow::Result<Self> {
        let transport = SmtpTransport::starttls_relay(&smtp.host)?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.sender.clone(), smtp.password.clone()))
            .build();

        Ok(Self {
            transport,
            from: smtp.sender.parse()?,
            verify_url: verify_url.to_string(),
            reset_pass_url: reset_pass_url.to_string(),
        })
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)?;

        // The SMTP transport blocks; keep it off the reactor.
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message)).await??;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_activation(&self, email: &str, name: &str, code: &str) -> anyhow::Result<()> {
        let link = action_link(&self.verify_url, email, code);
        let html = render_email(
            name,
            "Thanks for signing up. Confirm your email address to activate your account.",
            "Verify email",
            &link,
        );
        self.send(email, "Verify your email", html).await?;
        tracing::info!("Activation email sent");
        Ok(())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        name: &str,
        code: &str,
    ) -> anyhow::Result<()> {
        let link = action_link(&self.reset_pass_url, email, code);
        let html = render_email(
            name,
            "We received a request to reset your password. If it wasn't you, ignore this email.",
            "Reset password",
            &link,
        );
        self.send(email, "Reset your password", html).await?;
        tracing::info!("Password reset email sent");
        Ok(())
    }
}

/// Frontend link carrying the code and email as query parameters.
pub fn action_link(base: &str, email: &str, code: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}code={}&email={}",
        base,
        separator,
        urlencoding::encode(code),
        urlencoding::encode(email)
    )
}

fn render_email(name: &str, intro: &str, button: &str, link: &str) -> String {
    let link = escape_html(link);
    format!(
        "<html><body>\
         <p>Hi {name},</p>\
         <p>{intro}</p>\
         <p><a href=\"{link}\">{button}</a></p>\
         <p>Or paste this link into your browser:<br>{link}</p>\
         </body></html>",
        name = escape_html(name),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ─── Log-only ────────────────────────────────────────────────

/// Records deliveries in the log without sending anything.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_activation(&self, email: &str, _name: &str, _code: &str) -> anyhow::Result<()> {
        tracing::info!(to = %email, "Activation email (not sent, SMTP disabled)");
        Ok(())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        _name: &str,
        _code: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(to = %email, "Password reset email (not sent, SMTP disabled)");
        Ok(())
    }
}

// ─── Recording (tests) ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Activation,
    PasswordReset,
}

#[derive(Debug, Clone)]
pub struct SentNotification {
    pub kind: NotificationKind,
    pub email: String,
    pub code: String,
}

/// Keeps every notification in memory so tests can read the codes back.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Code from the most recent notification of `kind` to `email`.
    pub fn last_code(&self, kind: NotificationKind, email: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|n| n.kind == kind && n.email == email)
            .map(|n| n.code)
    }

    fn record(&self, kind: NotificationKind, email: &str, code: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("notification log poisoned"))?
            .push(SentNotification {
                kind,
                email: email.to_string(),
                code: code.to_string(),
            });
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_activation(&self, email: &str, _name: &str, code: &str) -> anyhow::Result<()> {
        self.record(NotificationKind::Activation, email, code)
    }

    async fn send_password_reset(
        &self,
        email: &str,
        _name: &str,
        code: &str,
    ) -> anyhow::Result<()> {
        self.record(NotificationKind::PasswordReset, email, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_link_encodes_parameters() {
        let link = action_link("https://app.example.com/verify", "a+b@x.com", "c0de");
        assert_eq!(
            link,
            "https://app.example.com/verify?code=c0de&email=a%2Bb%40x.com"
        );

        let link = action_link("https://app.example.com/verify?lang=en", "a@x.com", "c");
        assert!(link.starts_with("https://app.example.com/verify?lang=en&code=c"));
    }

    #[test]
    fn test_rendered_email_escapes_name() {
        let html = render_email("<script>", "intro", "Go", "https://x/?a=1&b=2");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("https://x/?a=1&amp;b=2"));
    }

    #[tokio::test]
    async fn test_recording_notifier_keeps_latest_code() {
        let notifier = RecordingNotifier::new();
        notifier.send_activation("a@x.com", "A", "one").await.unwrap();
        notifier.send_password_reset("a@x.com", "A", "two").await.unwrap();
        notifier.send_password_reset("a@x.com", "A", "three").await.unwrap();

        assert_eq!(
            notifier.last_code(NotificationKind::Activation, "a@x.com").as_deref(),
            Some("one")
        );
        assert_eq!(
            notifier.last_code(NotificationKind::PasswordReset, "a@x.com").as_deref(),
            Some("three")
        );
        assert_eq!(notifier.sent().len(), 3);
    }
}
