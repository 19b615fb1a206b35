//! 期限结构构建流程
//!
//! 查询在市合约 → 剔除连续合约 → 并发拉取各合约日K线 → 按回看区间过滤 →
//! 按日期对齐 → 绘图。单个合约拉取失败只记录警告，其余合约照常参与。

use std::path::PathBuf;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};

use crate::models::{GridLayout, SymbolFetchFailure, TermStructureReport};
use crate::services::futures::MarketDataProvider;

use super::error::TermStructureError;
use super::exclusion::ContinuousContracts;
use super::render::render_term_structure;
use super::table::{PriceSeries, TermStructureTable};
use super::window::DateWindow;

/// 默认同时拉取的合约数
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// 对齐后的期限结构数据
#[derive(Debug, Clone)]
pub struct TermStructureSnapshot {
    pub commodity: String,
    pub window: DateWindow,
    pub table: TermStructureTable,
    /// 拉取失败的合约，按代码排序
    pub warnings: Vec<SymbolFetchFailure>,
}

/// 绘制完成的期限结构图
#[derive(Debug, Clone)]
pub struct TermStructureArtifact {
    pub snapshot: TermStructureSnapshot,
    pub layout: GridLayout,
    pub image_path: PathBuf,
    /// 本次绘制的 PNG 内容，与之后写入同一路径的请求无关
    pub png: Vec<u8>,
}

impl TermStructureArtifact {
    pub fn report(&self) -> TermStructureReport {
        let snapshot = &self.snapshot;
        TermStructureReport {
            commodity: snapshot.commodity.clone(),
            start_date: snapshot.window.start,
            end_date: snapshot.window.end,
            symbols: snapshot.table.symbols().map(str::to_string).collect(),
            dates: snapshot.table.dates().collect(),
            rows: snapshot.table.rows(),
            warnings: snapshot.warnings.clone(),
            grid: self.layout,
            image_path: self.image_path.display().to_string(),
        }
    }
}

/// 图片输出位置和分辨率
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub path: PathBuf,
    pub dpi: u32,
}

pub struct TermStructureBuilder<'a> {
    provider: &'a dyn MarketDataProvider,
    exclusions: &'a ContinuousContracts,
    fetch_concurrency: usize,
}

impl<'a> TermStructureBuilder<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider, exclusions: &'a ContinuousContracts) -> Self {
        Self {
            provider,
            exclusions,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    pub fn fetch_concurrency(mut self, fetch_concurrency: usize) -> Self {
        self.fetch_concurrency = fetch_concurrency.max(1);
        self
    }

    /// 构建期限结构表，不绘图
    ///
    /// `today` 为回看区间的结束日期，区间为 `[today - lookback_days, today]`
    pub async fn snapshot(
        &self,
        commodity: &str,
        lookback_days: u32,
        today: NaiveDate,
    ) -> Result<TermStructureSnapshot, TermStructureError> {
        let all_symbols = self.provider.lookup_symbols(commodity).await.map_err(|e| {
            log::error!("获取品种 {} 合约列表失败: {:#}", commodity, e);
            TermStructureError::DataUnavailable {
                commodity: commodity.to_string(),
                reason: format!("{:#}", e),
            }
        })?;

        let symbols = self.exclusions.active_symbols(&all_symbols);
        log::info!(
            "品种 {} 共 {} 个合约，剔除连续合约后剩余 {} 个: {:?}",
            commodity,
            all_symbols.len(),
            symbols.len(),
            symbols
        );

        if symbols.is_empty() {
            return Err(TermStructureError::NoActiveContracts {
                commodity: commodity.to_string(),
            });
        }

        let window = DateWindow::lookback(today, lookback_days);

        // 每个合约的结果各占一个槽位，全部完成后再合并
        let results: Vec<_> = stream::iter(symbols)
            .map(|symbol| async move {
                let result = self.provider.fetch_daily_history(&symbol).await;
                (symbol, result)
            })
            .buffer_unordered(self.fetch_concurrency)
            .collect()
            .await;

        let mut series = Vec::with_capacity(results.len());
        let mut warnings = Vec::new();

        for (symbol, result) in results {
            match result {
                Ok(history) => series.push(PriceSeries::from_history(symbol, &history, &window)),
                Err(e) => {
                    log::warn!("获取合约 {} 日K线失败，已跳过: {:#}", symbol, e);
                    warnings.push(SymbolFetchFailure {
                        symbol,
                        reason: format!("{:#}", e),
                    });
                }
            }
        }
        warnings.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let table = TermStructureTable::align(series);
        if table.is_empty() {
            return Err(TermStructureError::EmptyResult {
                commodity: commodity.to_string(),
                start: window.start,
                end: window.end,
            });
        }

        log::info!(
            "品种 {} 期限结构: {} 个交易日, {} 个合约, {} 个合约拉取失败",
            commodity,
            table.date_count(),
            table.symbols().count(),
            warnings.len()
        );

        Ok(TermStructureSnapshot {
            commodity: commodity.to_string(),
            window,
            table,
            warnings,
        })
    }

    /// 构建期限结构表并绘制成图片
    pub async fn build(
        &self,
        commodity: &str,
        lookback_days: u32,
        today: NaiveDate,
        target: RenderTarget,
    ) -> Result<TermStructureArtifact, TermStructureError> {
        let snapshot = self.snapshot(commodity, lookback_days, today).await?;

        let RenderTarget { path, dpi } = target;
        let render_error = |reason: String| TermStructureError::Render {
            commodity: commodity.to_string(),
            reason,
        };

        // 绘图是纯 CPU 计算，放到阻塞线程池执行
        let (snapshot, path, rendered) = tokio::task::spawn_blocking(move || {
            let rendered = render_term_structure(&snapshot.table, &path, dpi);
            (snapshot, path, rendered)
        })
        .await
        .map_err(|e| render_error(e.to_string()))?;

        let chart = rendered.map_err(|e| {
            log::error!("绘制品种 {} 期限结构图失败: {:#}", commodity, e);
            render_error(format!("{:#}", e))
        })?;

        Ok(TermStructureArtifact {
            snapshot,
            layout: chart.layout,
            image_path: path,
            png: chart.png,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DailyClose;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
    }

    fn days_ago(n: u64) -> NaiveDate {
        today() - chrono::Days::new(n)
    }

    /// 从 `today` 往前连续 `count` 天的日线
    fn history(count: u64, base: f64) -> Vec<DailyClose> {
        (0..count)
            .map(|n| DailyClose::new(days_ago(n), base + n as f64))
            .collect()
    }

    /// 内存数据源
    #[derive(Default)]
    struct MockProvider {
        symbols: Option<Vec<String>>,
        histories: HashMap<String, Vec<DailyClose>>,
        failures: Vec<String>,
        delays_ms: HashMap<String, u64>,
    }

    impl MockProvider {
        fn with_symbols(symbols: &[&str]) -> Self {
            Self {
                symbols: Some(symbols.iter().map(|s| s.to_string()).collect()),
                ..Default::default()
            }
        }

        fn history(mut self, symbol: &str, rows: Vec<DailyClose>) -> Self {
            self.histories.insert(symbol.to_string(), rows);
            self
        }

        fn failing(mut self, symbol: &str) -> Self {
            self.failures.push(symbol.to_string());
            self
        }

        fn delay(mut self, symbol: &str, ms: u64) -> Self {
            self.delays_ms.insert(symbol.to_string(), ms);
            self
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn lookup_symbols(&self, commodity: &str) -> Result<Vec<String>> {
            self.symbols
                .clone()
                .ok_or_else(|| anyhow!("未找到品种 {} 的映射", commodity))
        }

        async fn fetch_daily_history(&self, symbol: &str) -> Result<Vec<DailyClose>> {
            if let Some(ms) = self.delays_ms.get(symbol) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.failures.iter().any(|s| s == symbol) {
                return Err(anyhow!("获取 {} 日K线失败: 502 Bad Gateway", symbol));
            }
            Ok(self.histories.get(symbol).cloned().unwrap_or_default())
        }
    }

    /// 测试合约列表获取失败
    #[tokio::test]
    async fn test_lookup_failure_is_data_unavailable() {
        println!("\n========== 测试合约列表获取失败 ==========");
        let provider = MockProvider::default();
        let exclusions = ContinuousContracts::default();
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        let err = builder.snapshot("铜", 30, today()).await.unwrap_err();
        println!("  错误: {}", err);

        assert!(matches!(err, TermStructureError::DataUnavailable { .. }));
        assert_eq!(err.commodity(), "铜");
        assert!(err.to_string().contains("铜"));
        println!("✅ 合约列表获取失败测试通过！");
    }

    /// 测试没有非连续合约
    #[tokio::test]
    async fn test_no_active_contracts() {
        let exclusions = ContinuousContracts::default();

        for symbols in [vec![], vec!["CU0", "AL0", "CU0"]] {
            let provider = MockProvider::with_symbols(&symbols).history("CU0", history(5, 100.0));
            let builder = TermStructureBuilder::new(&provider, &exclusions);

            let err = builder.snapshot("铜", 30, today()).await.unwrap_err();
            assert!(
                matches!(err, TermStructureError::NoActiveContracts { ref commodity } if commodity == "铜"),
                "{:?} 应该返回 NoActiveContracts",
                symbols
            );
        }
    }

    /// 测试连续合约不会出现在表中
    #[tokio::test]
    async fn test_continuous_contracts_never_in_table() {
        println!("\n========== 测试连续合约剔除 ==========");
        let provider = MockProvider::with_symbols(&["CU0", "CU2410", "AL0", "CU2411", "CU2410"])
            .history("CU0", history(5, 100.0))
            .history("AL0", history(5, 200.0))
            .history("CU2410", history(5, 300.0))
            .history("CU2411", history(5, 400.0));
        let exclusions = ContinuousContracts::default();
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        let snapshot = builder.snapshot("铜", 30, today()).await.unwrap();
        let symbols: Vec<_> = snapshot.table.symbols().collect();
        println!("  表头合约: {:?}", symbols);

        assert_eq!(symbols, vec!["CU2410", "CU2411"]);
        assert!(snapshot.table.rows().iter().all(|r| !exclusions.contains(&r.symbol)));
        println!("✅ 连续合约剔除测试通过！");
    }

    /// 测试注入自定义排除列表
    #[tokio::test]
    async fn test_injected_exclusions() {
        let provider = MockProvider::with_symbols(&["XX0", "XX2401", "CU0"])
            .history("XX0", history(3, 1.0))
            .history("XX2401", history(3, 2.0))
            .history("CU0", history(3, 3.0));
        let exclusions = ContinuousContracts::from_codes(["XX0"]);
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        let snapshot = builder.snapshot("测试品种", 30, today()).await.unwrap();
        assert_eq!(snapshot.table.symbols().collect::<Vec<_>>(), vec!["CU0", "XX2401"]);
    }

    /// 测试部分合约拉取失败
    #[tokio::test]
    async fn test_partial_failure_tolerance() {
        println!("\n========== 测试部分合约拉取失败 ==========");
        let provider = MockProvider::with_symbols(&["CU2409", "CU2410", "CU2412"])
            .failing("CU2409")
            .history("CU2410", history(5, 75000.0))
            .history("CU2412", history(5, 75500.0));
        let exclusions = ContinuousContracts::default();
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        let snapshot = builder.snapshot("铜", 30, today()).await.unwrap();
        for w in &snapshot.warnings {
            println!("  ⚠️ {}: {}", w.symbol, w.reason);
        }

        assert_eq!(snapshot.table.date_count(), 5);
        assert_eq!(snapshot.table.symbols().collect::<Vec<_>>(), vec!["CU2410", "CU2412"]);
        assert!(snapshot.table.rows().iter().all(|r| r.symbol != "CU2409"));
        assert_eq!(snapshot.warnings.len(), 1);
        assert_eq!(snapshot.warnings[0].symbol, "CU2409");
        println!("✅ 部分合约拉取失败测试通过！");
    }

    /// 测试结果与拉取完成顺序无关
    #[tokio::test]
    async fn test_snapshot_independent_of_completion_order() {
        let symbols = ["CU2410", "CU2411", "CU2412", "CU2501"];
        let exclusions = ContinuousContracts::default();

        let make = |delays: [u64; 4]| {
            let mut provider = MockProvider::with_symbols(&symbols)
                .history("CU2410", history(10, 100.0))
                .history("CU2411", history(7, 200.0))
                .history("CU2412", vec![DailyClose::new(days_ago(3), 300.0)])
                .history("CU2501", history(12, 400.0));
            for (symbol, ms) in symbols.iter().zip(delays) {
                provider = provider.delay(symbol, ms);
            }
            provider
        };

        let fast_first = make([1, 5, 10, 20]);
        let slow_first = make([20, 10, 5, 1]);

        let a = TermStructureBuilder::new(&fast_first, &exclusions)
            .snapshot("铜", 30, today())
            .await
            .unwrap();
        let b = TermStructureBuilder::new(&slow_first, &exclusions)
            .fetch_concurrency(1)
            .snapshot("铜", 30, today())
            .await
            .unwrap();

        assert_eq!(a.table, b.table);
        assert_eq!(a.table.rows(), b.table.rows());
    }

    /// 测试回看区间过滤
    #[tokio::test]
    async fn test_lookback_window_applied() {
        let provider = MockProvider::with_symbols(&["CU2410"]).history("CU2410", history(60, 1.0));
        let exclusions = ContinuousContracts::default();
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        for days in [1u32, 7, 30] {
            let snapshot = builder.snapshot("铜", days, today()).await.unwrap();
            let dates: Vec<_> = snapshot.table.dates().collect();

            assert_eq!(snapshot.window.start, days_ago(u64::from(days)));
            assert_eq!(snapshot.window.end, today());
            assert_eq!(dates.len(), days as usize + 1);
            assert_eq!(dates.first(), Some(&days_ago(u64::from(days))));
            assert_eq!(dates.last(), Some(&today()));
        }
    }

    /// 测试区间内没有成交
    #[tokio::test]
    async fn test_empty_window_is_empty_result() {
        println!("\n========== 测试区间内没有成交 ==========");
        let provider = MockProvider::with_symbols(&["CU2410", "CU2412"])
            .history("CU2410", vec![DailyClose::new(days_ago(3), 75000.0)])
            .history("CU2412", vec![DailyClose::new(days_ago(5), 75500.0)]);
        let exclusions = ContinuousContracts::default();
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        let err = builder.snapshot("铜", 1, today()).await.unwrap_err();
        println!("  错误: {}", err);

        match err {
            TermStructureError::EmptyResult { commodity, start, end } => {
                assert_eq!(commodity, "铜");
                assert_eq!(start, days_ago(1));
                assert_eq!(end, today());
            }
            other => panic!("期望 EmptyResult，实际 {:?}", other),
        }
        println!("✅ 区间内没有成交测试通过！");
    }

    /// 测试全部合约拉取失败
    #[tokio::test]
    async fn test_all_fetches_failed_is_empty_result() {
        let provider = MockProvider::with_symbols(&["CU2410", "CU2412"])
            .failing("CU2410")
            .failing("CU2412");
        let exclusions = ContinuousContracts::default();
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        let err = builder.snapshot("铜", 30, today()).await.unwrap_err();
        assert!(matches!(err, TermStructureError::EmptyResult { .. }));
    }

    /// 测试 build 在绘图前失败时不产生图片
    #[tokio::test]
    async fn test_build_fails_before_render() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("铜_term_structure.png");
        let provider = MockProvider::with_symbols(&["CU0"]);
        let exclusions = ContinuousContracts::default();
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        let target = RenderTarget {
            path: path.clone(),
            dpi: 72,
        };
        let err = builder.build("铜", 30, today(), target).await.unwrap_err();

        assert!(matches!(err, TermStructureError::NoActiveContracts { .. }));
        assert!(!path.exists());
    }

    /// PNG 文件头中的高度
    fn png_height(png: &[u8]) -> u32 {
        u32::from_be_bytes([png[20], png[21], png[22], png[23]])
    }

    /// 测试完整构建并绘图
    #[tokio::test]
    async fn test_build_renders_image() {
        println!("\n========== 测试完整构建并绘图 ==========");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("铜_term_structure.png");
        let provider = MockProvider::with_symbols(&["CU0", "CU2409", "CU2410", "CU2412"])
            .failing("CU2409")
            .history("CU2410", history(7, 75000.0))
            .history("CU2412", history(7, 75500.0));
        let exclusions = ContinuousContracts::default();
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        let target = RenderTarget {
            path: path.clone(),
            dpi: 72,
        };
        let artifact = builder.build("铜", 30, today(), target).await.unwrap();
        let report = artifact.report();
        println!("  布局: {:?}, 图片: {}", report.grid, report.image_path);

        assert_eq!(artifact.layout, GridLayout { rows: 3, cols: 3, used: 7, blank: 2 });
        assert_eq!(artifact.image_path, path);
        assert_eq!(std::fs::read(&path).unwrap(), artifact.png);
        assert_eq!(png_height(&artifact.png), 3 * 6 * 72);
        assert_eq!(report.symbols, vec!["CU2410", "CU2412"]);
        assert_eq!(report.warnings.len(), 1);
        println!("✅ 完整构建并绘图测试通过！");
    }

    /// 测试同一路径上的并发构建各自拿到自己的图片
    #[tokio::test]
    async fn test_concurrent_builds_keep_their_own_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("铜_term_structure.png");
        let provider = MockProvider::with_symbols(&["CU2410", "CU2412"])
            .history("CU2410", history(10, 75000.0))
            .history("CU2412", history(10, 75500.0));
        let exclusions = ContinuousContracts::default();
        let builder = TermStructureBuilder::new(&provider, &exclusions);

        let target = || RenderTarget {
            path: path.clone(),
            dpi: 72,
        };
        let (short, long) = tokio::join!(
            builder.build("铜", 2, today(), target()),
            builder.build("铜", 6, today(), target()),
        );
        let (short, long) = (short.unwrap(), long.unwrap());

        assert_eq!(short.layout.rows, 1);
        assert_eq!(long.layout.rows, 3);
        assert_eq!(png_height(&short.png), 6 * 72);
        assert_eq!(png_height(&long.png), 3 * 6 * 72);

        let on_disk = std::fs::read(&path).unwrap();
        assert!(on_disk == short.png || on_disk == long.png);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_report_from_artifact() {
        let table = TermStructureTable::align(vec![PriceSeries::from_history(
            "CU2410",
            &history(2, 10.0),
            &DateWindow::lookback(today(), 30),
        )]);
        let artifact = TermStructureArtifact {
            snapshot: TermStructureSnapshot {
                commodity: "铜".to_string(),
                window: DateWindow::lookback(today(), 30),
                table,
                warnings: vec![SymbolFetchFailure {
                    symbol: "CU2409".to_string(),
                    reason: "timeout".to_string(),
                }],
            },
            layout: crate::services::term_structure::render::grid_layout(2),
            image_path: PathBuf::from("output/铜_term_structure.png"),
            png: Vec::new(),
        };

        let report = artifact.report();
        assert_eq!(report.symbols, vec!["CU2410"]);
        assert_eq!(report.dates, vec![days_ago(1), today()]);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.start_date, days_ago(30));
        assert_eq!(report.grid.blank, 1);
        assert_eq!(report.image_path, "output/铜_term_structure.png");
    }
}
