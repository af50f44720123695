use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    message::{Mailbox, Message, header::ContentType},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParametersBuilder},
        response::Response,
    },
};

use crate::callsign::Callsign;

/// Subject tag for alerts sent from a non-production deployment
fn get_staging_prefix() -> &'static str {
    match std::env::var("FENCEWATCH_ENV").unwrap_or_default().as_str() {
        "staging" => "[STAGING] ",
        _ => "",
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} is not set", name))
}

fn create_mailbox(name: &str, email: &str) -> Result<Mailbox> {
    let address = email.parse()?;
    Ok(Mailbox::new(Some(name.to_string()), address))
}

/// Content of a course-reversal alert
#[derive(Debug, Clone, PartialEq)]
pub struct ReversalAlert {
    pub callsign: Callsign,
    pub delta_deg: f64,
    pub detected_at: DateTime<Utc>,
    pub zone_label: String,
}

impl ReversalAlert {
    pub fn subject(&self) -> String {
        format!(
            "{}Reversal - {} ({})",
            get_staging_prefix(),
            self.callsign,
            self.zone_label
        )
    }

    pub fn body(&self) -> String {
        format!(
            "REVERSAL detected!\nFlight: {}\nZone: {}\nHeading change: {}°\nUTC time: {}",
            self.callsign,
            self.zone_label,
            self.delta_deg as i64,
            self.detected_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// How the SMTP session is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Unencrypted, unauthenticated relay on a local capture server
    Plain,
    /// TLS from the first byte (SMTPS)
    Implicit,
    /// Plain connect upgraded with STARTTLS
    StartTls,
}

impl SmtpSecurity {
    /// 1025 is the usual port of a local capture relay, 465 is SMTPS
    pub fn for_port(port: u16) -> Self {
        match port {
            1025 => SmtpSecurity::Plain,
            465 => SmtpSecurity::Implicit,
            _ => SmtpSecurity::StartTls,
        }
    }
}

pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
    alert_to: String,
}

impl EmailService {
    /// Build the SMTP transport from the environment
    ///
    /// Fails when a required variable is missing; callers treat that as
    /// "email alerts disabled".
    pub fn from_env() -> Result<Self> {
        let smtp_server = required_var("SMTP_SERVER")?;
        let smtp_port: u16 = match std::env::var("SMTP_PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("SMTP_PORT {:?} is not a port number", port))?,
            Err(_) => 465,
        };
        let smtp_username = required_var("SMTP_USERNAME")?;
        let smtp_password = required_var("SMTP_PASSWORD")?;
        let from_email = required_var("FROM_EMAIL")?;
        let from_name = std::env::var("FROM_NAME").unwrap_or_else(|_| "fencewatch".to_string());

        // Alerts go back to the sender unless a dedicated recipient is configured
        let alert_to = std::env::var("ALERT_EMAIL_TO").unwrap_or_else(|_| from_email.clone());

        let creds = Credentials::new(smtp_username, smtp_password);

        let security = SmtpSecurity::for_port(smtp_port);
        tracing::info!("SMTP {}:{} secured as {:?}", smtp_server, smtp_port, security);

        let tls = match security {
            SmtpSecurity::Plain => None,
            SmtpSecurity::Implicit | SmtpSecurity::StartTls => Some(
                TlsParametersBuilder::new(smtp_server.clone())
                    .build()
                    .map_err(|e| anyhow::anyhow!("Failed to create TLS parameters: {}", e))?,
            ),
        };

        let mailer = match (security, tls) {
            (SmtpSecurity::Implicit, Some(params)) => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_server)?
                    .port(smtp_port)
                    .credentials(creds)
                    .tls(Tls::Wrapper(params))
                    .build()
            }
            (SmtpSecurity::StartTls, Some(params)) => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_server)?
                    .port(smtp_port)
                    .credentials(creds)
                    .tls(Tls::Required(params))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp_server)
                .port(smtp_port)
                .tls(Tls::None)
                .build(),
        };

        Ok(Self {
            mailer,
            from_email,
            from_name,
            alert_to,
        })
    }

    pub async fn send_reversal_alert(&self, alert: &ReversalAlert) -> Result<Response> {
        let email = Message::builder()
            .from(create_mailbox(&self.from_name, &self.from_email)?)
            .to(create_mailbox(&self.from_name, &self.alert_to)?)
            .subject(alert.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body())?;

        let response = self.mailer.send(email).await?;
        Ok(response)
    }
}
