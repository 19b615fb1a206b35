//! 期货接口处理器
//!
//! 提供期限结构的 HTTP API 端点
//!
//! ## API 列表
//! - GET /futures/symbols - 获取品种映射表
//! - GET /futures/term_structure?commodity=铜&days=30 - 构建期限结构，返回表格数据和图片路径
//! - GET /futures/term_structure/image?commodity=铜&days=30 - 构建期限结构，直接返回 PNG 图片

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Result};

use crate::config::TermStructureConfig;
use crate::models::{ApiResponse, FuturesSymbolMark, TermStructureQuery, TermStructureReport};
use crate::services::futures::{get_beijing_today, SinaProvider};
use crate::services::term_structure::{
    RenderTarget, TermStructureArtifact, TermStructureBuilder, TermStructureError,
};

use super::AppState;

/// 获取期货品种映射表
/// GET /futures/symbols
pub async fn get_symbol_mark(state: web::Data<AppState>) -> Result<HttpResponse> {
    let provider = SinaProvider::with_client(state.client.clone());

    match provider.get_symbol_mark().await {
        Ok(symbols) => {
            let response = ApiResponse::success(symbols);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::error!("获取品种映射失败: {:#}", e);
            let response = ApiResponse::<Vec<FuturesSymbolMark>>::error(format!("{:#}", e));
            Ok(HttpResponse::BadGateway().json(response))
        }
    }
}

/// 构建期限结构
/// GET /futures/term_structure?commodity=铜&days=30
///
/// 部分合约拉取失败时仍返回成功，失败的合约列在 warnings 中
pub async fn get_term_structure(
    state: web::Data<AppState>,
    query: web::Query<TermStructureQuery>,
) -> Result<HttpResponse> {
    let artifact = match build_artifact(&state, &query).await {
        Ok(artifact) => artifact,
        Err(resp) => return Ok(resp),
    };

    let report = artifact.report();
    let message = if report.warnings.is_empty() {
        "Success".to_string()
    } else {
        let failed: Vec<&str> = report.warnings.iter().map(|w| w.symbol.as_str()).collect();
        format!("以下合约拉取失败，已跳过: {}", failed.join(", "))
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(report, message)))
}

/// 构建期限结构并返回图片
/// GET /futures/term_structure/image?commodity=铜&days=30
pub async fn get_term_structure_image(
    state: web::Data<AppState>,
    query: web::Query<TermStructureQuery>,
) -> Result<HttpResponse> {
    let artifact = match build_artifact(&state, &query).await {
        Ok(artifact) => artifact,
        Err(resp) => return Ok(resp),
    };

    let mut builder = HttpResponse::Ok();
    builder.content_type("image/png");
    if !artifact.snapshot.warnings.is_empty() {
        let failed: Vec<&str> = artifact
            .snapshot
            .warnings
            .iter()
            .map(|w| w.symbol.as_str())
            .collect();
        builder.insert_header(("X-Failed-Symbols", failed.join(",")));
    }
    Ok(builder.body(artifact.png))
}

/// 校验参数并执行完整的构建流程，失败时直接给出错误响应
async fn build_artifact(
    state: &AppState,
    query: &TermStructureQuery,
) -> std::result::Result<TermStructureArtifact, HttpResponse> {
    let settings = &state.config.term_structure;

    let commodity = query.commodity.trim();
    if commodity.is_empty() {
        return Err(bad_request("品种名称不能为空".to_string()));
    }
    let days = resolve_days(query.days, settings).map_err(bad_request)?;

    let provider = SinaProvider::with_client(state.client.clone());
    let builder = TermStructureBuilder::new(&provider, &state.exclusions)
        .fetch_concurrency(settings.fetch_concurrency);
    let target = RenderTarget {
        path: settings.output_dir.join(output_file_name(commodity)),
        dpi: settings.dpi,
    };

    log::info!("构建期限结构: 品种={}, 回看天数={}", commodity, days);

    builder
        .build(commodity, days, get_beijing_today(), target)
        .await
        .map_err(|e| {
            log::error!("品种 {} 期限结构构建失败: {}", e.commodity(), e);
            let response = ApiResponse::<TermStructureReport>::error(e.to_string());
            HttpResponse::build(error_status(&e)).json(response)
        })
}

/// 回看天数，未指定时取默认值，必须在 `[1, max_days]` 之间
fn resolve_days(days: Option<u32>, settings: &TermStructureConfig) -> std::result::Result<u32, String> {
    let days = days.unwrap_or(settings.default_days);
    if days == 0 || days > settings.max_days {
        return Err(format!("回看天数必须在 1 到 {} 之间，当前为 {}", settings.max_days, days));
    }
    Ok(days)
}

/// 输出文件名 `<品种>_term_structure.png`，品种中的路径分隔符等字符替换为下划线
fn output_file_name(commodity: &str) -> String {
    let safe: String = commodity
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}_term_structure.png", safe)
}

fn error_status(e: &TermStructureError) -> StatusCode {
    match e {
        TermStructureError::DataUnavailable { .. } => StatusCode::BAD_GATEWAY,
        TermStructureError::NoActiveContracts { .. } | TermStructureError::EmptyResult { .. } => {
            StatusCode::NOT_FOUND
        }
        TermStructureError::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::<TermStructureReport>::error(message))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/futures")
            .route("/symbols", web::get().to(get_symbol_mark))
            // 期限结构
            .route("/term_structure", web::get().to(get_term_structure))
            .route("/term_structure/image", web::get().to(get_term_structure_image))
    );
}
