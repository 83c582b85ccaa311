use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analytics::ClickRecorder;
use crate::api::AppState;
use crate::config::StaticConfig;
use crate::errors::SiteError;
use crate::site::{DiskProbe, DownloadRouter, FileProbe, PathResolver, RedirectTable, ToolLinks};
use crate::system::ServerStats;
use crate::system::health::{host_name, run_health_logger};
use crate::telemetry::{HttpTransport, Message, TelemetryClient, TelemetryOptions};
use crate::utils::find_data_dir;

/// 远程日志的固定标签
const TELEMETRY_APP_TAG: &str = "sumatra-website";

pub struct StartupContext {
    pub state: AppState,
    pub data_dir: PathBuf,
    /// 取消所有后台任务（flush 定时器、健康日志）
    pub cancel: CancellationToken,
}

/// 准备服务器启动的上下文
///
/// 找不到数据目录时返回错误，此时还没有绑定任何端口。
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    #[cfg(feature = "tls")]
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let data_dir = find_data_dir(&config.data.candidate_dirs).ok_or_else(|| {
        SiteError::data_dir(format!(
            "none of the data directories exist: {}",
            config.data.candidate_dirs.join(", ")
        ))
    })?;
    info!("Using data directory: {}", data_dir.display());

    let recorder = Arc::new(ClickRecorder::open(data_dir.join(&config.data.stats_file)));
    if !recorder.is_persistent() {
        warn!("Click stats will not survive a restart");
    }

    let telemetry = build_telemetry(config);
    let state = build_app_state(config, Arc::new(DiskProbe), recorder, telemetry);

    let ctx = StartupContext {
        state,
        data_dir,
        cancel: CancellationToken::new(),
    };
    spawn_background_tasks(&ctx, config);

    debug!("Pre-startup completed in {:?}", start_time.elapsed());
    Ok(ctx)
}

/// 由配置组装请求处理所需的共享状态
pub fn build_app_state(
    config: &StaticConfig,
    probe: Arc<dyn FileProbe>,
    recorder: Arc<ClickRecorder>,
    telemetry: Option<TelemetryClient>,
) -> AppState {
    let site = &config.site;
    let table = RedirectTable::from_entries(site.redirects.iter().cloned());
    if table.is_empty() {
        warn!("No redirects configured, legacy URLs will return 404");
    } else {
        debug!("Loaded {} redirects", table.len());
    }

    if site.disable_local_downloads {
        info!("Local downloads disabled, /dl/ always redirects to {}", site.remote_download_base);
    }

    AppState {
        resolver: Arc::new(PathResolver::new(&site.www_root, table, probe.clone())),
        downloads: Arc::new(DownloadRouter::new(
            &site.downloads_dir,
            &site.remote_download_base,
            site.disable_local_downloads,
            probe,
        )),
        tools: Arc::new(ToolLinks::new(site.tools.clone(), &site.tools_fallback)),
        recorder,
        stats: Arc::new(ServerStats::new()),
        telemetry,
    }
}

/// 没有 token 时返回 None（完全禁用上报）
pub fn build_telemetry(config: &StaticConfig) -> Option<TelemetryClient> {
    let tcfg = &config.telemetry;
    let token = tcfg.token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
    info!("Telemetry token configured, sending logs to remote endpoint");

    let transport = Arc::new(HttpTransport::new(
        &tcfg.endpoint,
        token,
        Duration::from_secs(tcfg.timeout_secs),
    ));
    let options = TelemetryOptions {
        buffer_size: tcfg.buffer_size,
        flush_interval: Duration::from_secs(tcfg.flush_interval_secs),
        max_buffered: tcfg.max_buffered,
    };
    let mut defaults = Message::new();
    defaults.insert("hostname".to_string(), Value::from(host_name()));

    let client = TelemetryClient::new(transport, options, defaults);
    client.tag([TELEMETRY_APP_TAG]);
    client.tag([if config.server.production {
        "production"
    } else {
        "dev"
    }]);
    client.tag(tcfg.tags.iter().cloned());
    Some(client)
}

fn spawn_background_tasks(ctx: &StartupContext, config: &StaticConfig) {
    if let Some(client) = ctx.state.telemetry.clone() {
        let cancel = ctx.cancel.clone();
        tokio::spawn(async move { client.run_flush_loop(cancel).await });
    }

    if config.health.log_interval_secs > 0 {
        tokio::spawn(run_health_logger(
            ctx.state.stats.clone(),
            ctx.state.telemetry.clone(),
            Duration::from_secs(config.health.log_interval_secs),
            ctx.cancel.clone(),
        ));
    } else {
        debug!("Health logger disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_token_disables_telemetry() {
        let config = StaticConfig::default();
        assert!(build_telemetry(&config).is_none());
    }

    #[test]
    fn test_telemetry_tags() {
        let mut config = StaticConfig::default();
        config.telemetry.token = Some("tok".into());
        config.telemetry.tags = vec!["eu".into()];
        config.server.production = true;
        let client = build_telemetry(&config).unwrap();
        assert_eq!(client.tags(), vec!["sumatra-website", "production", "eu"]);
    }

    #[tokio::test]
    async fn test_missing_data_dir_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = StaticConfig::default();
        config.data.candidate_dirs = vec![dir.path().join("missing").to_string_lossy().into_owned()];
        let err = prepare_server_startup(&config).await.err().unwrap();
        let site_err = err.downcast_ref::<SiteError>().unwrap();
        assert_eq!(site_err.code(), "E002");
    }

    #[tokio::test]
    async fn test_startup_opens_stats_file() {
        let dir = TempDir::new().unwrap();
        let mut config = StaticConfig::default();
        config.data.candidate_dirs = vec![dir.path().to_string_lossy().into_owned()];
        let ctx = prepare_server_startup(&config).await.unwrap();
        assert_eq!(ctx.data_dir, dir.path());
        assert!(ctx.state.recorder.is_persistent());
        assert!(dir.path().join("stats.json").exists());
        ctx.cancel.cancel();
    }
}
