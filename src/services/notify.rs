//! 启动通知邮件（SparkPost transmissions API）

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};
use ureq::Agent;

use crate::config::MailConfig;
use crate::errors::{Result, SiteError};

/// 邮件请求超时时间
const MAIL_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// 启动邮件内容
pub fn startup_notification(
    now: DateTime<Utc>,
    production: bool,
    data_dir: &std::path::Path,
) -> Notification {
    Notification {
        subject: format!(
            "sumatra website started on {}",
            now.format("%Y-%m-%d %H:%M:%S")
        ),
        body: format!(
            "Just letting you know that I've started\nproduction: {}, data dir: {}, ver: {}\n",
            production,
            data_dir.display(),
            env!("CARGO_PKG_VERSION")
        ),
    }
}

pub struct SparkPostNotifier {
    agent: Agent,
    api_url: String,
    api_key: String,
    from: String,
    to: String,
}

impl SparkPostNotifier {
    /// 没有配置 api_key 时返回 None
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(MAIL_TIMEOUT_SECS)))
            .build()
            .into();
        Some(Self {
            agent,
            api_url: config.api_url.clone(),
            api_key: api_key.to_string(),
            from: config.from.clone(),
            to: config.to.clone(),
        })
    }

    fn payload(&self, notification: &Notification) -> serde_json::Value {
        json!({
            "recipients": [{ "address": { "email": self.to } }],
            "content": {
                "from": self.from,
                "subject": notification.subject,
                "text": notification.body,
            }
        })
    }
}

#[async_trait]
impl Notifier for SparkPostNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        let agent = self.agent.clone();
        let url = self.api_url.clone();
        let api_key = self.api_key.clone();
        let payload = self.payload(&notification);

        debug!("Sending notification mail: {}", notification.subject);
        tokio::task::spawn_blocking(move || {
            agent
                .post(&url)
                .header("Authorization", api_key.as_str())
                .send_json(&payload)
                .map(|_| ())
                .map_err(|e| SiteError::notify(format!("mail request failed: {}", e)))
        })
        .await
        .map_err(|e| SiteError::notify(format!("mail task failed: {}", e)))??;

        info!("Notification mail sent to {}", self.to);
        Ok(())
    }
}
