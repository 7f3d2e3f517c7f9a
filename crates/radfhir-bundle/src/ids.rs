//! 资源ID生成
//!
//! ImagingStudy、Patient、Device 的ID由会话提供的生成器决定。
//! 确定性策略对同一自然键总是给出同一ID，便于重复提交时命中同一地址。

use radfhir_core::utils::new_resource_id;
use radfhir_core::ResourceKind;
use radfhir_dicom::DicomRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// FHIR id 的截断长度
const HASHED_ID_LEN: usize = 32;

/// ID生成器；聚合器可能被放在锁后跨线程使用
pub trait IdGenerator: Send + Sync {
    fn generate(&self, kind: ResourceKind, record: &DicomRecord) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn(ResourceKind, &DicomRecord) -> String + Send + Sync,
{
    fn generate(&self, kind: ResourceKind, record: &DicomRecord) -> String {
        self(kind, record)
    }
}

/// 内置ID策略
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// 随机 UUID v4
    Random,
    /// 资源类型 + 自然键的 SHA-256 摘要
    #[default]
    Deterministic,
}

impl IdGenerator for IdStrategy {
    fn generate(&self, kind: ResourceKind, record: &DicomRecord) -> String {
        match self {
            IdStrategy::Random => new_resource_id(),
            IdStrategy::Deterministic => match natural_key(kind, record) {
                Some(key) => {
                    let mut hasher = Sha256::new();
                    hasher.update(kind.as_str().as_bytes());
                    hasher.update(b"|");
                    hasher.update(key.as_bytes());
                    let mut id = format!("{:x}", hasher.finalize());
                    id.truncate(HASHED_ID_LEN);
                    id
                }
                None => new_resource_id(),
            },
        }
    }
}

/// 资源的自然键；设备与患者信息缺失时退回到检查UID。
/// 派生测量没有自然键，每次都取新ID。
fn natural_key(kind: ResourceKind, record: &DicomRecord) -> Option<String> {
    let study = record.study_instance_uid.as_deref().unwrap_or_default();
    let joined = |parts: &[&Option<String>]| {
        let values: Vec<&str> = parts
            .iter()
            .map(|p| p.as_deref().map(str::trim).unwrap_or_default())
            .collect();
        if values.iter().all(|v| v.is_empty()) {
            None
        } else {
            Some(values.join("|"))
        }
    };

    match kind {
        ResourceKind::ImagingStudy => Some(study.to_string()),
        ResourceKind::Patient => joined(&[&record.patient_id, &record.issuer_of_patient_id])
            .or_else(|| Some(format!("study:{}", study))),
        ResourceKind::Device => joined(&[
            &record.manufacturer,
            &record.manufacturer_model_name,
            &record.device_serial_number,
            &record.station_name,
        ])
        .or_else(|| Some(format!("study:{}", study))),
        ResourceKind::Observation => None,
    }
}
