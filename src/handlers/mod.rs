pub mod futures;
pub mod health;

use actix_web::web;

use crate::config::AppConfig;
use crate::services::term_structure::ContinuousContracts;

/// 各处理器共享的应用状态
pub struct AppState {
    pub config: AppConfig,
    /// 访问新浪接口的客户端，按配置设置超时
    pub client: reqwest::Client,
    pub exclusions: ContinuousContracts,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let client = config.http_client()?;
        let exclusions = config
            .term_structure
            .continuous_contracts
            .clone()
            .map(ContinuousContracts::from_codes)
            .unwrap_or_default();

        if exclusions.is_empty() {
            log::warn!("连续合约排除列表为空，连续合约将出现在期限结构中");
        } else {
            log::info!("连续合约排除列表共 {} 个代码", exclusions.len());
        }

        Ok(Self {
            config,
            client,
            exclusions,
        })
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::config)
            .configure(futures::config)
    );
}
