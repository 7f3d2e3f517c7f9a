//! 扁平元数据记录
//!
//! 每个采集对象（一个 SOP 实例）对应一条记录。除五个必需标识外，
//! 所有字段都可能缺失。

use radfhir_core::utils::non_blank;
use radfhir_core::{RadFhirError, Result};
use serde::{Deserialize, Serialize};

/// 编码序列中的一项（CodeValue / CodingSchemeDesignator / CodeMeaning）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeItem {
    pub code: Option<String>,
    pub system: Option<String>,
    pub display: Option<String>,
}

impl CodeItem {
    pub fn new(code: &str, system: &str, display: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            system: Some(system.to_string()),
            display: Some(display.to_string()),
        }
    }
}

/// 单个 DICOM 对象的扁平元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DicomRecord {
    // === 检查信息 ===
    pub study_instance_uid: Option<String>,
    pub accession_number: Option<String>,
    pub study_description: Option<String>,
    pub study_date: Option<String>,
    pub study_time: Option<String>,
    pub procedure_codes: Vec<CodeItem>,
    pub reason_codes: Vec<CodeItem>,
    /// 申请原因（自由文本）
    pub reason_text: Option<String>,

    // === 序列信息 ===
    pub series_instance_uid: Option<String>,
    pub series_description: Option<String>,
    pub series_number: Option<String>,
    pub series_date: Option<String>,
    pub series_time: Option<String>,
    pub modality: Option<String>,
    pub body_part_examined: Option<String>,
    pub laterality: Option<String>,

    // === 实例信息 ===
    pub sop_instance_uid: Option<String>,
    pub sop_class_uid: Option<String>,
    pub instance_number: Option<String>,
    pub image_type: Vec<String>,
    /// 结构化报告的文档标题
    pub concept_name: Vec<CodeItem>,

    // === 患者信息 ===
    pub patient_id: Option<String>,
    pub issuer_of_patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub patient_sex: Option<String>,
    pub patient_birth_date: Option<String>,
    pub patient_weight: Option<String>,
    pub patient_size: Option<String>,

    // === 设备信息 ===
    pub manufacturer: Option<String>,
    pub manufacturer_model_name: Option<String>,
    pub device_serial_number: Option<String>,
    pub software_versions: Vec<String>,
    pub station_name: Option<String>,
    pub institution_name: Option<String>,
}

/// 聚合所需的最小字段集
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFields<'a> {
    pub study_instance_uid: &'a str,
    pub accession_number: &'a str,
    pub series_instance_uid: &'a str,
    pub sop_instance_uid: &'a str,
    pub sop_class_uid: &'a str,
}

impl DicomRecord {
    /// 取出必需字段，任一缺失或为空即失败
    pub fn required_fields(&self) -> Result<RequiredFields<'_>> {
        fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
            non_blank(value.as_deref())
                .ok_or_else(|| RadFhirError::MissingRequiredField(name.to_string()))
        }

        Ok(RequiredFields {
            series_instance_uid: require(&self.series_instance_uid, "SeriesInstanceUID")?,
            sop_instance_uid: require(&self.sop_instance_uid, "SOPInstanceUID")?,
            sop_class_uid: require(&self.sop_class_uid, "SOPClassUID")?,
            accession_number: require(&self.accession_number, "AccessionNumber")?,
            study_instance_uid: require(&self.study_instance_uid, "StudyInstanceUID")?,
        })
    }

    /// 摘要信息，用于日志
    pub fn summary(&self) -> String {
        format!(
            "study={} series={} instance={} modality={}",
            self.study_instance_uid.as_deref().unwrap_or("?"),
            self.series_instance_uid.as_deref().unwrap_or("?"),
            self.sop_instance_uid.as_deref().unwrap_or("?"),
            self.modality.as_deref().unwrap_or("?")
        )
    }
}
