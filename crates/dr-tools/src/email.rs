//! Email delivery tool backed by the SendGrid v3 API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use dr_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

const DEFAULT_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Configuration for email delivery.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    /// SendGrid API key.
    pub api_key: String,
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
}

impl EmailConfig {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

pub struct SendEmailTool {
    client: Client,
    config: EmailConfig,
    api_url: String,
}

impl SendEmailTool {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent("dr-cli/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            config,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[derive(Serialize)]
struct MailSendRequest {
    personalizations: Vec<Personalization>,
    from: Address,
    subject: String,
    content: Vec<MailContent>,
}

#[derive(Serialize)]
struct Personalization {
    to: Vec<Address>,
}

#[derive(Serialize)]
struct Address {
    email: String,
}

#[derive(Serialize)]
struct MailContent {
    r#type: String,
    value: String,
}

#[derive(Deserialize)]
struct SendEmailArgs {
    subject: String,
    html_body: String,
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an email with the given subject and HTML body to the configured recipient."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new()
                .add_property("subject", PropertySchema::string("Email subject line"), true)
                .add_property(
                    "html_body",
                    PropertySchema::string("HTML content of the email"),
                    true,
                ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: SendEmailArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("send_email", format!("Invalid arguments: {}", e)))?;

        let request = MailSendRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: self.config.to.clone(),
                }],
            }],
            from: Address {
                email: self.config.from.clone(),
            },
            subject: args.subject.clone(),
            content: vec![MailContent {
                r#type: "text/html".to_string(),
                value: args.html_body,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::tool("send_email", format!("Mail send request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::tool(
                "send_email",
                format!("Mail API error {}: {}", status, body),
            ));
        }

        info!(status = status.as_u16(), subject = %args.subject, "Email sent");

        Ok(ToolOutput::success(format!(
            "Email sent (status {})",
            status.as_u16()
        )))
    }
}
