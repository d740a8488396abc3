//! GitHub device authorization flow.
//!
//! The CLI requests a device code, asks the user to enter the paired user
//! code at the verification URI in a browser, and polls the token endpoint
//! until GitHub reports success, denial, or expiry.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;

const DEVICE_CODE_URL: &str = "https://github.com/login/device/code";
const ACCESS_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Response to the initial device code request.
#[derive(Debug, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    /// Seconds until the device code expires.
    pub expires_in: u64,
    /// Minimum seconds between token polls.
    pub interval: u64,
}

/// One poll of the token endpoint. GitHub answers 200 for both outcomes;
/// pending/denied states arrive as an `error` field.
#[derive(Debug, Deserialize)]
struct TokenPoll {
    access_token: Option<String>,
    error: Option<String>,
}

/// Interactive device flow against github.com.
pub struct DeviceFlow {
    http: Client,
    client_id: String,
    scope: String,
}

impl DeviceFlow {
    pub fn new(client_id: &str, scopes: &[&str]) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("gav/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            client_id: client_id.to_string(),
            scope: scopes.join(" "),
        })
    }

    /// Run the full flow: request a code, prompt the user, poll to completion.
    ///
    /// Blocks (asynchronously) until the user approves, denies, or the code
    /// expires. Returns the access token on approval.
    pub async fn authorize(&self) -> Result<String> {
        let auth = self.request_device_code().await?;

        println!(
            "Open {} and enter the code: {}",
            auth.verification_uri, auth.user_code
        );

        self.poll_for_token(&auth).await
    }

    async fn request_device_code(&self) -> Result<DeviceAuthorization> {
        let resp = self
            .http
            .post(DEVICE_CODE_URL)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .context("device code request failed")?;

        if !resp.status().is_success() {
            bail!("device code request failed with status {}", resp.status());
        }

        resp.json()
            .await
            .context("failed to parse device code response")
    }

    async fn poll_for_token(&self, auth: &DeviceAuthorization) -> Result<String> {
        let deadline = Instant::now() + Duration::from_secs(auth.expires_in);
        let mut interval = Duration::from_secs(auth.interval.max(1));

        loop {
            tokio::time::sleep(interval).await;

            if Instant::now() >= deadline {
                bail!("device authorization timed out; run gav again to retry");
            }

            let resp = self
                .http
                .post(ACCESS_TOKEN_URL)
                .header("Accept", "application/json")
                .form(&[
                    ("client_id", self.client_id.as_str()),
                    ("device_code", auth.device_code.as_str()),
                    ("grant_type", GRANT_TYPE),
                ])
                .send()
                .await
                .context("token poll request failed")?;

            let poll: TokenPoll = resp
                .json()
                .await
                .context("failed to parse token poll response")?;

            if let Some(token) = poll.access_token {
                return Ok(token);
            }

            match poll.error.as_deref() {
                Some("authorization_pending") => {}
                // GitHub asks us to back off; the documented penalty is 5s.
                Some("slow_down") => interval += Duration::from_secs(5),
                Some("expired_token") => {
                    bail!("device code expired before authorization; run gav again to retry")
                }
                Some("access_denied") => bail!("authorization was denied"),
                Some(other) => bail!("device flow failed: {other}"),
                None => bail!("token poll returned neither a token nor an error"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_authorization_response() {
        let auth: DeviceAuthorization = serde_json::from_str(
            r#"{
                "device_code": "dc-123",
                "user_code": "ABCD-1234",
                "verification_uri": "https://github.com/login/device",
                "expires_in": 899,
                "interval": 5
            }"#,
        )
        .unwrap();
        assert_eq!(auth.user_code, "ABCD-1234");
        assert_eq!(auth.interval, 5);
    }

    #[test]
    fn parses_pending_and_success_polls() {
        let pending: TokenPoll =
            serde_json::from_str(r#"{"error": "authorization_pending"}"#).unwrap();
        assert!(pending.access_token.is_none());
        assert_eq!(pending.error.as_deref(), Some("authorization_pending"));

        let ok: TokenPoll = serde_json::from_str(
            r#"{"access_token": "gho_xyz", "token_type": "bearer", "scope": "repo"}"#,
        )
        .unwrap();
        assert_eq!(ok.access_token.as_deref(), Some("gho_xyz"));
    }
}
