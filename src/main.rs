//! 期货期限结构服务
//!
//! 从新浪财经拉取某一品种全部在市合约的日线收盘价，
//! 按交易日对齐后绘制成期限结构网格图，通过 RESTful API 提供

mod config;     // 配置加载
mod handlers;   // HTTP 请求处理器
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use actix_web::{web, App, HttpServer, middleware::Logger};
use env_logger::Env;

use crate::config::AppConfig;
use crate::handlers::AppState;

/// 应用程序入口
///
/// 读取 config.json 后启动 HTTP 服务器，默认监听 0.0.0.0:8080
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let loaded = AppConfig::load();

    // 初始化日志系统，RUST_LOG 优先于配置文件中的级别
    env_logger::init_from_env(Env::default().default_filter_or(loaded.config.log.level.as_str()));
    loaded.log();
    let config = loaded.config;

    let bind_addr = config.bind_addr();
    let workers = config.server.workers;
    log::info!(
        "启动期限结构服务: {}, 图片输出目录 {}",
        bind_addr,
        config.term_structure.output_dir.display()
    );

    let state = AppState::new(config).map_err(|e| {
        log::error!("初始化失败: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    let state = web::Data::new(state);

    // 创建并启动 HTTP 服务器
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())  // 添加请求日志中间件
            .app_data(state.clone())
            .configure(handlers::config)  // 配置路由
    });
    if workers > 0 {
        server = server.workers(workers);
    }

    server.bind(bind_addr)?.run().await
}
