//! 会话配置
//!
//! 支持配置文件与 `RADFHIR_` 前缀的环境变量叠加

use crate::ids::IdStrategy;
use config::{Config, Environment, File};
use radfhir_core::{RadFhirError, Result};
use radfhir_dicom::SourceTimezone;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// 单次聚合会话的配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BundleConfig {
    /// 是否从首条记录派生体征观察值
    pub include_derived_measurements: bool,
    /// 是否在系列下附带逐实例明细
    pub include_instance_detail: bool,
    /// 源数据时区，如 `UTC`、`Europe/Berlin`、`+01:00`
    pub source_timezone: String,
    /// Study/Patient/Device 的ID生成方式
    pub id_strategy: IdStrategy,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            include_derived_measurements: true,
            include_instance_detail: false,
            source_timezone: "UTC".to_string(),
            id_strategy: IdStrategy::default(),
        }
    }
}

impl BundleConfig {
    /// 加载配置：可选的配置文件，再叠加环境变量，最后校验
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("RADFHIR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| RadFhirError::Config(e.to_string()))?;

        let config: BundleConfig = settings
            .try_deserialize()
            .map_err(|e| RadFhirError::Config(format!("Failed to deserialize configuration: {}", e)))?;
        config.validate()?;

        match config_path {
            Some(path) => info!("Configuration loaded from: {:?}", path),
            None => info!("Configuration loaded from environment/defaults"),
        }
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        self.timezone().map(|_| ())
    }

    /// 解析后的源数据时区
    pub fn timezone(&self) -> Result<SourceTimezone> {
        self.source_timezone.parse()
    }
}
