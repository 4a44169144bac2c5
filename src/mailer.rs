//! Outbound email built from the company profile stored in the database.
//!
//! SMTP settings are tenant data, not deployment config: the company profile
//! row carries host, port and credentials, so every send reads the current
//! profile. Callers treat delivery as best effort and log failures.

use lettre::{
    message::{header::ContentType, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use tracing::info;

/// SMTP connection material extracted from a company profile row.
#[derive(Debug, Clone)]
pub struct SmtpProfile {
    pub company_name: String,
    pub from_address: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_ssl: bool,
}

pub async fn send_email(
    profile: &SmtpProfile,
    to: &str,
    subject: &str,
    body: &str,
) -> anyhow::Result<()> {
    let mut builder = if profile.use_ssl {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&profile.host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&profile.host)
    };
    builder = builder.port(profile.port);
    if let (Some(user), Some(pass)) = (&profile.username, &profile.password) {
        builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }
    let transport = builder.build();

    let email = Message::builder()
        .from(format!("{} <{}>", profile.company_name, profile.from_address).parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?;

    transport.send(email).await?;
    info!(to, subject, "email sent");
    Ok(())
}

pub fn account_created_body(full_name: &str, email: &str, temp_password: &str) -> String {
    format!(
        r#"Hello {full_name},

An account has been created for you on the project management portal.

Login email: {email}
Temporary password: {temp_password}

Please sign in and change your password as soon as possible.
"#
    )
}

pub fn account_activated_body(full_name: &str) -> String {
    format!(
        r#"Hello {full_name},

Your account on the project management portal has been activated.
You can now sign in with your registered email address.
"#
    )
}

pub fn password_reset_body(reset_url_base: &str, token: &str) -> String {
    let link = format!("{reset_url_base}?token={token}");
    format!(
        r#"Hello,

We received a request to reset your password on the project management portal.

To choose a new password, open the link below:

{link}

This link expires in 30 minutes and can be used only once.
If you did not request a reset, you can ignore this email.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_body_embeds_token_in_link() {
        let body = password_reset_body("https://app.example.com/reset-password", "tok123");
        assert!(body.contains("https://app.example.com/reset-password?token=tok123"));
        assert!(body.contains("30 minutes"));
    }

    #[test]
    fn account_created_body_carries_credentials() {
        let body = account_created_body("Ada", "ada@example.com", "Temp1234");
        assert!(body.contains("ada@example.com"));
        assert!(body.contains("Temp1234"));
    }
}
