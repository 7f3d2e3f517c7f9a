//! # RadFHIR 聚合与组装
//!
//! 把同一检查的 DICOM 记录聚合为 FHIR 资源，并组装为事务 Bundle：
//! - 聚合引擎：Study → Series → Instance 三级去重与派生计数
//! - 资源构建：患者、设备、派生体征测量
//! - Bundle 组装：固定顺序的 PUT 条目
//! - 会话配置与ID生成策略

pub mod aggregator;
pub mod assembler;
pub mod config;
pub mod device;
pub mod ids;
pub mod observation;
pub mod patient;
pub mod state_machine;

// 重新导出主要类型
pub use aggregator::{AggregatorStats, ImagingStudyAggregator, IngestOutcome};
pub use assembler::upsert_entry;
pub use config::BundleConfig;
pub use ids::{IdGenerator, IdStrategy};
pub use observation::MeasurementContext;
pub use state_machine::{AggregatorEvent, AggregatorState};
