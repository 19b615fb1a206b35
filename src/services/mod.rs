//! 业务逻辑服务模块
//!
//! 封装数据获取和处理逻辑

pub mod futures;         // 新浪期货数据源
pub mod term_structure;  // 期限结构构建与绘图
