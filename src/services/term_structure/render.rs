//! 期限结构图绘制
//!
//! 每个交易日一张子图，横轴为当天有报价的合约，纵轴为收盘价，
//! 子图按固定3列排成网格，整体尺寸 18 × (6 × 行数) 英寸。

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::models::GridLayout;

use super::table::TermStructureTable;

/// 网格列数
pub const GRID_COLUMNS: usize = 3;

const FIGURE_WIDTH_IN: u32 = 18;
const ROW_HEIGHT_IN: u32 = 6;

/// 按交易日数量计算子图网格
pub fn grid_layout(date_count: usize) -> GridLayout {
    let rows = date_count.div_ceil(GRID_COLUMNS);
    GridLayout {
        rows,
        cols: GRID_COLUMNS,
        used: date_count,
        blank: rows * GRID_COLUMNS - date_count,
    }
}

/// 整张图的像素尺寸
pub fn figure_size(layout: &GridLayout, dpi: u32) -> (u32, u32) {
    let rows = u32::try_from(layout.rows).unwrap_or(u32::MAX);
    (
        FIGURE_WIDTH_IN.saturating_mul(dpi),
        ROW_HEIGHT_IN.saturating_mul(rows).saturating_mul(dpi),
    )
}

/// 绘制结果，`png` 为本次写入文件的完整内容
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub layout: GridLayout,
    pub png: Vec<u8>,
}

/// 绘制期限结构网格并写入 PNG 文件
///
/// 先绘制到同目录下的临时文件再改名到 `path`，同一品种的并发请求不会读到彼此的半成品
pub fn render_term_structure(table: &TermStructureTable, path: &Path, dpi: u32) -> Result<RenderedChart> {
    let layout = grid_layout(table.date_count());
    if layout.used == 0 {
        return Err(anyhow!("没有可绘制的交易日"));
    }

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let tmp = tempfile::Builder::new()
        .prefix(".term_structure")
        .suffix(".png")
        .tempfile_in(dir)?;
    draw_grid(table, &layout, tmp.path(), dpi)?;

    let png = fs::read(tmp.path())?;
    tmp.persist(path)?;

    Ok(RenderedChart { layout, png })
}

fn draw_grid(table: &TermStructureTable, layout: &GridLayout, path: &Path, dpi: u32) -> Result<()> {
    let (width, height) = figure_size(layout, dpi);
    log::info!(
        "绘制期限结构图 {}: {}×{} 子图, {}×{} 像素",
        path.display(),
        layout.rows,
        layout.cols,
        width,
        height
    );

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    // 多出来的格子不绘制，保持空白
    let cells = root.split_evenly((layout.rows, layout.cols));
    for (cell, date) in cells.iter().zip(table.dates()) {
        draw_curve(cell, date, &table.curve(date), dpi)?;
    }

    root.present().map_err(draw_error)?;
    Ok(())
}

/// 绘制单个交易日的曲线
fn draw_curve<DB: DrawingBackend>(
    cell: &DrawingArea<DB, Shift>,
    date: NaiveDate,
    curve: &[(&str, f64)],
    dpi: u32,
) -> Result<()> {
    let px = |pt: f64| (pt * f64::from(dpi) / 72.0).round();
    let (y_min, y_max) = price_range(curve);
    let x_max = curve.len() as f64 - 0.5;
    let label_size = px(9.0);

    let label_style = TextStyle::from(("sans-serif", label_size).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    let step = label_step(cell, &label_style)?;
    let gap = px(6.0) as i32;
    let longest = curve.iter().map(|(s, _)| s.chars().count()).max().unwrap_or(0) as i32;
    let label_area = gap + longest * step + px(4.0) as i32;

    let mut chart = ChartBuilder::on(cell)
        .caption(date.format("%Y-%m-%d").to_string(), ("sans-serif", px(12.0)).into_font())
        .margin(px(10.0) as u32)
        .x_label_area_size(label_area.max(0) as u32)
        .y_label_area_size(px(44.0) as u32)
        .build_cartesian_2d(-0.5f64..x_max, y_min..y_max)
        .map_err(draw_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(curve.len())
        .x_label_formatter(&|_| String::new())
        .y_label_style(("sans-serif", label_size).into_font())
        .draw()
        .map_err(draw_error)?;

    let points: Vec<(f64, f64)> = curve
        .iter()
        .enumerate()
        .map(|(i, (_, close))| (i as f64, *close))
        .collect();

    let line_width = px(1.5) as u32;
    chart
        .draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(line_width)))
        .map_err(draw_error)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|p| Circle::new(*p, px(3.0) as u32, BLUE.filled())),
        )
        .map_err(draw_error)?;

    // plotters 只支持 90° 倍数的旋转，合约代码逐字符沿 45° 斜线排布
    let base = cell.get_base_pixel();
    for (i, (symbol, _)) in curve.iter().enumerate() {
        let (tick_x, tick_y) = chart.backend_coord(&(i as f64, y_min));
        let anchor = (tick_x - base.0, tick_y - base.1 + gap);
        let positions = diagonal_positions(anchor, symbol.chars().count(), step);

        for (ch, pos) in symbol.chars().zip(positions) {
            cell.draw(&Text::new(ch.to_string(), pos, label_style.clone()))
                .map_err(draw_error)?;
        }
    }

    Ok(())
}

/// 斜排标签相邻字符的间距，不小于最宽字符的宽度
fn label_step<DB: DrawingBackend>(cell: &DrawingArea<DB, Shift>, style: &TextStyle) -> Result<i32> {
    let mut widest = 0;
    for sample in ["0", "M", "W"] {
        let (w, _) = cell.estimate_text_size(sample, style).map_err(draw_error)?;
        widest = widest.max(w);
    }
    Ok(widest as i32 + 1)
}

/// 标签末字符落在 `anchor`，前面的字符依次向左下退一个 `step`
fn diagonal_positions(anchor: (i32, i32), count: usize, step: i32) -> Vec<(i32, i32)> {
    let last = count as i32 - 1;
    (0..count as i32)
        .map(|k| {
            let back = last - k;
            (anchor.0 - back * step, anchor.1 + back * step)
        })
        .collect()
}

/// 纵轴范围，上下各留 5% 空白；所有价格相同时上下各留 1
fn price_range(curve: &[(&str, f64)]) -> (f64, f64) {
    let (min, max) = curve
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, c)| {
            (lo.min(*c), hi.max(*c))
        });

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let pad = (max - min) * 0.05;
    if pad <= f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        (min - pad, max + pad)
    }
}

fn draw_error<E>(e: DrawingAreaErrorKind<E>) -> anyhow::Error
where
    E: std::error::Error + Send + Sync,
{
    anyhow!("绘图失败: {}", e)
}
