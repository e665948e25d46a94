use crate::config::settings::SmtpSettings;
use crate::models::loan::{Loan, LoanStatus};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Address, Message, SmtpTransport, Transport,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("SMTP configuration error: {0}")]
    Config(String),
    #[error("Email sending failed: {0}")]
    Send(#[from] lettre::transport::smtp::Error),
    #[error("Message building failed: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("Address parsing failed: {0}")]
    Address(#[from] lettre::address::AddressError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
}

pub struct EmailService {
    mailer: SmtpTransport,
    config: SmtpSettings,
}

impl EmailService {
    pub fn new(config: SmtpSettings) -> Result<Self, EmailError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.server)
            .map_err(|e| EmailError::Config(format!("SMTP relay error: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self { mailer, config })
    }

    pub fn send_email(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        template: EmailTemplate,
    ) -> Result<(), EmailError> {
        let from = mailbox(Some(&self.config.from_name), &self.config.from_email)?;
        let message = compose(from, mailbox(to_name, to_email)?, template)?;

        self.mailer.send(&message)?;
        info!("Email delivered to {}", to_email);
        Ok(())
    }

    /// Sends on the blocking pool; failures are logged and swallowed.
    pub fn send_in_background(
        service: actix_web::web::Data<EmailService>,
        to_email: String,
        to_name: String,
        template: EmailTemplate,
    ) {
        tokio::task::spawn_blocking(move || {
            if let Err(e) = service.send_email(&to_email, Some(&to_name), template) {
                error!("Failed to send email to {}: {}", to_email, e);
            }
        });
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.config.base_url.trim_end_matches('/'))
    }
}

/// Display names go in as structured data, so commas and quotes in a
/// member's name need no escaping.
pub fn mailbox(name: Option<&str>, email: &str) -> Result<Mailbox, EmailError> {
    let address: Address = email.trim().parse()?;
    let name = name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
    Ok(Mailbox::new(name, address))
}

fn compose(from: Mailbox, to: Mailbox, template: EmailTemplate) -> Result<Message, EmailError> {
    let builder = Message::builder().from(from).to(to).subject(template.subject);

    let message = match template.text_body {
        Some(text) => builder.multipart(MultiPart::alternative_plain_html(text, template.html_body))?,
        None => builder
            .header(ContentType::TEXT_HTML)
            .body(template.html_body)?,
    };
    Ok(message)
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn welcome_template(
    member_name: &str,
    chama_name: &str,
    temporary_password: &str,
    login_url: &str,
) -> EmailTemplate {
    let html_body = format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head>
            <meta charset="utf-8">
            <title>Welcome to {chama}</title>
            <style>
                body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
                .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
                .header {{ background-color: #1B5E20; color: white; padding: 20px; text-align: center; }}
                .content {{ padding: 20px; background-color: #f9f9f9; }}
                .code {{ font-family: monospace; font-size: 18px; background: #eee; padding: 4px 8px; }}
            </style>
        </head>
        <body>
            <div class="container">
                <div class="header">
                    <h1>Karibu {chama}!</h1>
                </div>
                <div class="content">
                    <h2>Hi {name}!</h2>
                    <p>Your chama admin has registered you on ChamaPlus.</p>
                    <p>Your temporary password is <span class="code">{password}</span></p>
                    <p>Sign in at <a href="{url}">{url}</a> and change it as soon as you can.</p>
                </div>
            </div>
        </body>
        </html>
        "#,
        chama = escape_html(chama_name),
        name = escape_html(member_name),
        password = escape_html(temporary_password),
        url = escape_html(login_url),
    );

    let text_body = format!(
        "Hi {}!\n\nYour chama admin has registered you with {} on ChamaPlus.\n\nTemporary password: {}\nSign in at {} and change it as soon as you can.",
        member_name, chama_name, temporary_password, login_url
    );

    EmailTemplate {
        subject: format!("Welcome to {} on ChamaPlus", chama_name),
        html_body,
        text_body: Some(text_body),
    }
}

pub fn loan_decision_template(member_name: &str, loan: &Loan) -> EmailTemplate {
    let (subject, headline) = match loan.status {
        LoanStatus::Approved => ("Your loan has been approved", "approved"),
        _ => ("Your loan application was not approved", "not approved"),
    };

    let mut text_body = format!(
        "Hi {}!\n\nYour loan application of KES {} ({}) was {}.",
        member_name, loan.amount, loan.purpose, headline
    );
    if loan.status == LoanStatus::Approved {
        text_body.push_str(&format!(
            "\nTotal repayable: KES {} over {} month(s).",
            loan.total_due(),
            loan.term_months
        ));
    }
    if let Some(note) = &loan.review_note {
        text_body.push_str(&format!("\nNote from the committee: {}", note));
    }

    let html_body = format!("<p>{}</p>", escape_html(&text_body).replace('\n', "<br>"));

    EmailTemplate {
        subject: subject.to_string(),
        html_body,
        text_body: Some(text_body),
    }
}
