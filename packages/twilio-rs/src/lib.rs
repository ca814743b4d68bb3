// Minimal client for Twilio Programmable Messaging.
// https://www.twilio.com/docs/messaging/api/message-resource#create-a-message-resource

use std::collections::HashMap;

pub mod models;
use reqwest::{Client, header};

use crate::models::{MessageErrorResponse, MessageResponse};

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// E.164 sender number
    pub from_number: String,
    /// Override for the API host, mostly for tests against a local stub.
    pub api_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    pub fn from_number(&self) -> &str {
        &self.options.from_number
    }

    fn messages_url(&self) -> String {
        let base = self
            .options
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');

        format!(
            "{base}/2010-04-01/Accounts/{sid}/Messages.json",
            sid = self.options.account_sid
        )
    }

    /// Send a text message. Returns the created message resource.
    pub async fn send_sms(
        &self,
        recipient: &str,
        body: &str,
    ) -> Result<MessageResponse, &'static str> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "Content-Type",
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("From", &self.options.from_number);
        form_body.insert("Body", body);

        let res = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .headers(headers)
            .form(&form_body)
            .send()
            .await;

        let response = match res {
            Ok(response) => response,
            Err(e) => {
                eprintln!("Request to Twilio failed: {}", e);
                return Err("Error sending SMS");
            }
        };

        let status = response.status();
        if !status.is_success() {
            match response.json::<MessageErrorResponse>().await {
                Ok(err) => eprintln!(
                    "Twilio error ({}): code={:?} {}",
                    status, err.code, err.message
                ),
                Err(_) => eprintln!("Twilio error ({})", status),
            }
            return Err("Twilio returned an error");
        }

        let message = response.json::<MessageResponse>().await.map_err(|e| {
            eprintln!("Failed to parse Twilio response: {}", e);
            "Error parsing message response"
        })?;

        if message.is_failed() {
            return Err("Twilio rejected the message");
        }

        Ok(message)
    }
}
