use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;
use ureq::Agent;

/// 上报时携带的 User-Agent
pub const USER_AGENT: &str = concat!("sumatra-website/", env!("CARGO_PKG_VERSION"));

/// 一次 flush 产生的请求体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 换行分隔的 JSON 行
    pub body: Vec<u8>,
    /// 逗号分隔的标签列表，没有标签时为 None
    pub tags: Option<String>,
    /// 本批消息条数
    pub messages: usize,
}

/// 批量上报的发送端
#[async_trait]
pub trait BatchTransport: Send + Sync {
    async fn post_batch(&self, batch: Batch) -> anyhow::Result<()>;
}

/// 通过 HTTP POST 发送到批量接收端点
pub struct HttpTransport {
    endpoint: String,
    agent: Agent,
}

impl HttpTransport {
    /// `endpoint_template` 中的 `{token}` 会被替换成 token
    pub fn new(endpoint_template: &str, token: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            endpoint: endpoint_template.replacen("{token}", token, 1),
            agent,
        }
    }

    /// 同步发送（在 spawn_blocking 中调用）
    ///
    /// Content-Length 由 ureq 根据 body 长度设置；非 2xx 状态视为失败。
    fn post_sync(agent: &Agent, endpoint: &str, batch: &Batch) -> anyhow::Result<()> {
        let mut request = agent
            .post(endpoint)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "text/plain");
        if let Some(ref tags) = batch.tags {
            request = request.header("X-Loggly-Tag", tags.as_str());
        }
        let response = request.send(&batch.body[..])?;
        trace!(
            "Telemetry batch of {} messages accepted with status {}",
            batch.messages,
            response.status()
        );
        Ok(())
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    async fn post_batch(&self, batch: Batch) -> anyhow::Result<()> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        tokio::task::spawn_blocking(move || Self::post_sync(&agent, &endpoint, &batch)).await?
    }
}
