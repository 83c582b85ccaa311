use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SiteError};

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// 包含：
/// - server: 监听地址、生产模式、超时
/// - site: 站点根目录、重定向表、下载路由、工具链接
/// - data: 数据目录（点击日志）
/// - telemetry: 远程日志批量上报
/// - tls / mail / health / logging
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：SITE，分隔符：__
    /// 示例：SITE__SERVER__ADDR=0.0.0.0:8080
    pub fn load(path: Option<&str>) -> Result<Self> {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SITE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: StaticConfig = settings.try_deserialize()?;
        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }

        // 兼容旧部署：LOGGLY_TOKEN 环境变量
        if config.telemetry.token.is_none()
            && let Ok(token) = std::env::var("LOGGLY_TOKEN")
        {
            let token = token.trim();
            if !token.is_empty() {
                config.telemetry.token = Some(token.to_string());
            }
        }

        if config.mail.api_key.is_none()
            && let Ok(key) = std::env::var("SPARK_POST_KEY")
        {
            let key = key.trim();
            if !key.is_empty() {
                config.mail.api_key = Some(key.to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// 检查明显错误的配置
    pub fn validate(&self) -> Result<()> {
        if self.telemetry.buffer_size == 0 {
            return Err(SiteError::config("telemetry.buffer_size must be > 0"));
        }
        if self.telemetry.max_buffered < self.telemetry.buffer_size {
            return Err(SiteError::config(
                "telemetry.max_buffered must be >= telemetry.buffer_size",
            ));
        }
        if self.telemetry.flush_interval_secs == 0 {
            return Err(SiteError::config(
                "telemetry.flush_interval_secs must be > 0",
            ));
        }
        for tool in &self.site.tools {
            if url::Url::parse(&tool.url).is_err() {
                return Err(SiteError::config(format!(
                    "site.tools entry '{}' has an invalid url: {}",
                    tool.slug, tool.url
                )));
            }
        }
        Ok(())
    }

    /// 生产模式下强制使用 :80 / :443
    pub fn apply_production_overrides(&mut self) {
        if self.server.production {
            self.server.addr = "0.0.0.0:80".to_string();
            self.server.https_addr = "0.0.0.0:443".to_string();
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_https_addr")]
    pub https_addr: String,
    #[serde(default)]
    pub production: bool,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

/// 重定向表条目（精确匹配）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectEntry {
    pub from: String,
    pub to: String,
}

/// /go-to/<slug> 工具链接条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolEntry {
    pub slug: String,
    pub url: String,
}

/// 站点内容配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_www_root")]
    pub www_root: PathBuf,
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    #[serde(default = "default_remote_download_base")]
    pub remote_download_base: String,
    #[serde(default)]
    pub disable_local_downloads: bool,
    #[serde(default = "default_tools_fallback")]
    pub tools_fallback: String,
    #[serde(default = "default_redirects")]
    pub redirects: Vec<RedirectEntry>,
    #[serde(default = "default_tools")]
    pub tools: Vec<ToolEntry>,
}

/// 数据目录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// 按顺序查找，第一个存在的目录生效（支持 ~ 展开）
    #[serde(default = "default_candidate_dirs")]
    pub candidate_dirs: Vec<String>,
    #[serde(default = "default_stats_file")]
    pub stats_file: String,
}

/// 远程日志上报配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// 未设置时完全禁用上报
    #[serde(default)]
    pub token: Option<String>,
    /// `{token}` 为占位符
    #[serde(default = "default_telemetry_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_telemetry_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_telemetry_flush_interval")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_telemetry_max_buffered")]
    pub max_buffered: usize,
    #[serde(default = "default_telemetry_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// TLS 配置（证书由外部工具签发）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    #[serde(default = "default_allowed_host_suffix")]
    pub allowed_host_suffix: String,
}

/// 启动通知邮件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// 未设置时不发送
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_mail_api_url")]
    pub api_url: String,
    #[serde(default = "default_mail_from")]
    pub from: String,
    #[serde(default = "default_mail_to")]
    pub to: String,
}

/// 周期性健康日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// 0 表示禁用
    #[serde(default = "default_health_interval")]
    pub log_interval_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_addr() -> String {
    "127.0.0.1:5030".to_string()
}

fn default_https_addr() -> String {
    "0.0.0.0:443".to_string()
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_www_root() -> PathBuf {
    PathBuf::from("www")
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("www/files")
}

fn default_remote_download_base() -> String {
    "https://kjkpub.s3.amazonaws.com/sumatrapdf/rel/".to_string()
}

fn default_tools_fallback() -> String {
    "/pdf-tools.html".to_string()
}

pub fn default_redirects() -> Vec<RedirectEntry> {
    [
        (
            "/docs/",
            "/docs/SumatraPDF-documentation-fed36a5624d443fe9f7be0e410ecd715.html",
        ),
        ("/", "/free-pdf-reader.html"),
        ("/download.html", "/download-free-pdf-viewer.html"),
        ("/forum.html", "https://forum.sumatrapdfreader.org/"),
    ]
    .into_iter()
    .map(|(from, to)| RedirectEntry {
        from: from.to_string(),
        to: to.to_string(),
    })
    .collect()
}

pub fn default_tools() -> Vec<ToolEntry> {
    [
        ("compress-pdf", "http://bit.ly/2hfrJOm"),
        ("ppt-to-pdf", "http://bit.ly/2hgp3Mh"),
        ("pdf-to-ppt", "http://bit.ly/2gR7s0k"),
        ("jpg-to-pdf", "http://bit.ly/2h1f127"),
        ("pdf-to-jpg", "http://bit.ly/2gAZGoo"),
        ("excel-to-pdf", "http://bit.ly/2gR8CJs"),
        ("pdf-to-excel", "http://bit.ly/2h43L5K"),
        ("word-to-pdf", "http://bit.ly/2gR3kxF"),
        ("pdf-to-word", "http://bit.ly/2g8QzKN"),
        ("merge-pdf", "http://bit.ly/2g8YrvJ"),
        ("split-pdf", "http://bit.ly/2hgrfDq"),
        ("rotate-pdf", "http://bit.ly/2g93tbJ"),
        ("unlock-pdf", "http://bit.ly/2gAWkBQ"),
        ("protect-pdf", "http://bit.ly/2g8eTBu"),
    ]
    .into_iter()
    .map(|(slug, url)| ToolEntry {
        slug: slug.to_string(),
        url: url.to_string(),
    })
    .collect()
}

fn default_candidate_dirs() -> Vec<String> {
    vec!["~/data/sumatra-website".to_string(), "/data".to_string()]
}

fn default_stats_file() -> String {
    "stats.json".to_string()
}

fn default_telemetry_endpoint() -> String {
    "https://logs-01.loggly.com/bulk/{token}".to_string()
}

fn default_telemetry_buffer_size() -> usize {
    100
}

fn default_telemetry_flush_interval() -> u64 {
    5
}

fn default_telemetry_max_buffered() -> usize {
    10_000
}

fn default_telemetry_timeout() -> u64 {
    10
}

fn default_allowed_host_suffix() -> String {
    "sumatrapdfreader.org".to_string()
}

fn default_mail_api_url() -> String {
    "https://api.sparkpost.com/api/v1/transmissions".to_string()
}

fn default_mail_from() -> String {
    "Sumatra Website Stats <info@kjktools.org>".to_string()
}

fn default_mail_to() -> String {
    "kkowalczyk@gmail.com".to_string()
}

fn default_health_interval() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            https_addr: default_https_addr(),
            production: false,
            cpu_count: default_cpu_count(),
            read_timeout_ms: default_read_timeout_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            www_root: default_www_root(),
            downloads_dir: default_downloads_dir(),
            remote_download_base: default_remote_download_base(),
            disable_local_downloads: false,
            tools_fallback: default_tools_fallback(),
            redirects: default_redirects(),
            tools: default_tools(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            candidate_dirs: default_candidate_dirs(),
            stats_file: default_stats_file(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: default_telemetry_endpoint(),
            buffer_size: default_telemetry_buffer_size(),
            flush_interval_secs: default_telemetry_flush_interval(),
            max_buffered: default_telemetry_max_buffered(),
            timeout_secs: default_telemetry_timeout(),
            tags: Vec::new(),
        }
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            allowed_host_suffix: default_allowed_host_suffix(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_mail_api_url(),
            from: default_mail_from(),
            to: default_mail_to(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            log_interval_secs: default_health_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
