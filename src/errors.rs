use std::fmt;

#[derive(Debug, Clone)]
pub enum SiteError {
    Config(String),
    DataDir(String),
    FileOperation(String),
    Serialization(String),
    Validation(String),
    Telemetry(String),
    Tls(String),
    Notify(String),
}

impl SiteError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            SiteError::Config(_) => "E001",
            SiteError::DataDir(_) => "E002",
            SiteError::FileOperation(_) => "E003",
            SiteError::Serialization(_) => "E004",
            SiteError::Validation(_) => "E005",
            SiteError::Telemetry(_) => "E006",
            SiteError::Tls(_) => "E007",
            SiteError::Notify(_) => "E008",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            SiteError::Config(_) => "Configuration Error",
            SiteError::DataDir(_) => "Data Directory Error",
            SiteError::FileOperation(_) => "File Operation Error",
            SiteError::Serialization(_) => "Serialization Error",
            SiteError::Validation(_) => "Validation Error",
            SiteError::Telemetry(_) => "Telemetry Error",
            SiteError::Tls(_) => "TLS Error",
            SiteError::Notify(_) => "Notification Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            SiteError::Config(msg)
            | SiteError::DataDir(msg)
            | SiteError::FileOperation(msg)
            | SiteError::Serialization(msg)
            | SiteError::Validation(msg)
            | SiteError::Telemetry(msg)
            | SiteError::Tls(msg)
            | SiteError::Notify(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于启动失败时的终端提示）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for SiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for SiteError {}

// 便捷的构造函数
impl SiteError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        SiteError::Config(msg.into())
    }

    pub fn data_dir<T: Into<String>>(msg: T) -> Self {
        SiteError::DataDir(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        SiteError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        SiteError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        SiteError::Validation(msg.into())
    }

    pub fn telemetry<T: Into<String>>(msg: T) -> Self {
        SiteError::Telemetry(msg.into())
    }

    pub fn tls<T: Into<String>>(msg: T) -> Self {
        SiteError::Tls(msg.into())
    }

    pub fn notify<T: Into<String>>(msg: T) -> Self {
        SiteError::Notify(msg.into())
    }
}

impl From<std::io::Error> for SiteError {
    fn from(err: std::io::Error) -> Self {
        SiteError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for SiteError {
    fn from(err: serde_json::Error) -> Self {
        SiteError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for SiteError {
    fn from(err: config::ConfigError) -> Self {
        SiteError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SiteError>;
