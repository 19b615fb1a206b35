//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 上游数据源请求配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 期限结构图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermStructureConfig {
    /// 图片输出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// 输出分辨率
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// 同时请求日K线的合约数
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// 未指定天数时的默认回看天数
    #[serde(default = "default_days")]
    pub default_days: u32,
    /// 允许的最大回看天数
    #[serde(default = "default_days")]
    pub max_days: u32,
    /// 连续合约排除列表（为空则使用内置列表）
    #[serde(default)]
    pub continuous_contracts: Option<Vec<String>>,
}

/// 默认的配置文件位置
const CONFIG_PATHS: [&str; 2] = ["config.json", "config/config.json"];

/// 允许的最大输出分辨率
pub const MAX_DPI: u32 = 1200;

/// 配置加载结果
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: AppConfig,
    /// 加载成功的文件，`None` 表示使用默认配置
    pub source: Option<PathBuf>,
    /// 存在但解析失败的文件及原因
    pub failures: Vec<(PathBuf, String)>,
}

impl ConfigLoad {
    /// 输出加载过程，需在日志系统初始化之后调用
    pub fn log(&self) {
        for (path, reason) in &self.failures {
            log::warn!("加载配置文件 {} 失败: {}", path.display(), reason);
        }
        match &self.source {
            Some(path) => log::info!("从 {} 加载配置成功", path.display()),
            None => log::info!("使用默认配置"),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 上游请求配置
    #[serde(default)]
    pub api: ApiConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
    /// 期限结构图配置
    #[serde(default)]
    pub term_structure: TermStructureConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_dpi() -> u32 { 300 }
fn default_fetch_concurrency() -> usize { 4 }
fn default_days() -> u32 { 30 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TermStructureConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            dpi: default_dpi(),
            fetch_concurrency: default_fetch_concurrency(),
            default_days: default_days(),
            max_days: default_days(),
            continuous_contracts: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            log: LogConfig::default(),
            term_structure: TermStructureConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值
    ///
    /// 此时日志系统尚未初始化，加载过程记录在返回值中，由调用方稍后输出
    pub fn load() -> ConfigLoad {
        Self::load_from(&CONFIG_PATHS[..])
    }

    /// 依次尝试给定路径，使用第一个加载成功的文件
    pub fn load_from<P: AsRef<Path>>(paths: &[P]) -> ConfigLoad {
        let mut failures = Vec::new();

        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => {
                    return ConfigLoad {
                        config,
                        source: Some(path.to_path_buf()),
                        failures,
                    };
                }
                Err(e) => failures.push((path.to_path_buf(), e.to_string())),
            }
        }

        ConfigLoad {
            config: Self::default(),
            source: None,
            failures,
        }
    }

    /// 校验取值范围
    pub fn validate(&self) -> anyhow::Result<()> {
        let ts = &self.term_structure;
        if ts.dpi == 0 || ts.dpi > MAX_DPI {
            anyhow::bail!("term_structure.dpi 必须在 1 到 {} 之间，当前为 {}", MAX_DPI, ts.dpi);
        }
        if ts.default_days == 0 || ts.default_days > ts.max_days {
            anyhow::bail!(
                "term_structure.default_days 必须在 1 到 max_days({}) 之间，当前为 {}",
                ts.max_days,
                ts.default_days
            );
        }
        Ok(())
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 构建访问上游数据源的 HTTP 客户端
    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.api.timeout_secs))
            .connect_timeout(Duration::from_secs(self.api.connect_timeout_secs))
            .build()?;
        Ok(client)
    }
}
