//! 记录校验模块
//!
//! 在聚合之前给出诊断信息。缺少必需标识记为错误，
//! 可选字段格式异常记为警告；聚合引擎自身的必需字段检查不依赖本模块。

use crate::record::DicomRecord;
use crate::timestamp::{parse_da, parse_tm};
use radfhir_core::utils::is_valid_dicom_uid;
use tracing::{debug, info, warn};

/// 记录校验器
#[derive(Debug, Default)]
pub struct RecordValidator;

impl RecordValidator {
    pub fn new() -> Self {
        Self
    }

    /// 校验一条记录
    pub fn validate(&self, record: &DicomRecord) -> ValidationResult {
        let mut result = ValidationResult::new();

        self.validate_required_identifiers(record, &mut result);
        self.validate_uid_format(record, &mut result);
        self.validate_datetime_format(record, &mut result);
        self.validate_ordinals(record, &mut result);
        self.validate_modality(record, &mut result);

        debug!(
            "Validated {}: {} errors, {} warnings",
            record.summary(),
            result.error_count(),
            result.warning_count()
        );
        result
    }

    fn validate_required_identifiers(&self, record: &DicomRecord, result: &mut ValidationResult) {
        let required = [
            ("SeriesInstanceUID", &record.series_instance_uid),
            ("SOPInstanceUID", &record.sop_instance_uid),
            ("SOPClassUID", &record.sop_class_uid),
            ("AccessionNumber", &record.accession_number),
            ("StudyInstanceUID", &record.study_instance_uid),
        ];

        for (name, value) in required {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => {}
                Some(_) => result.add_error(format!("{} is blank", name)),
                None => result.add_error(format!("{} is missing", name)),
            }
        }
    }

    fn validate_uid_format(&self, record: &DicomRecord, result: &mut ValidationResult) {
        let uids = [
            ("SeriesInstanceUID", &record.series_instance_uid),
            ("SOPInstanceUID", &record.sop_instance_uid),
            ("SOPClassUID", &record.sop_class_uid),
            ("StudyInstanceUID", &record.study_instance_uid),
        ];

        for (name, uid) in uids {
            if let Some(uid) = uid.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                if !is_valid_dicom_uid(uid) {
                    result.add_warning(format!("{} has invalid format: {}", name, uid));
                }
            }
        }
    }

    fn validate_datetime_format(&self, record: &DicomRecord, result: &mut ValidationResult) {
        let dates = [
            ("StudyDate", &record.study_date),
            ("SeriesDate", &record.series_date),
            ("PatientBirthDate", &record.patient_birth_date),
        ];
        for (name, date) in dates {
            if let Some(date) = date {
                if parse_da(date).is_none() {
                    result.add_warning(format!("{} has invalid format: {}", name, date));
                }
            }
        }

        let times = [("StudyTime", &record.study_time), ("SeriesTime", &record.series_time)];
        for (name, time) in times {
            if let Some(time) = time {
                if parse_tm(time).is_none() {
                    result.add_warning(format!("{} has invalid format: {}", name, time));
                }
            }
        }
    }

    fn validate_ordinals(&self, record: &DicomRecord, result: &mut ValidationResult) {
        let ordinals = [
            ("SeriesNumber", &record.series_number),
            ("InstanceNumber", &record.instance_number),
        ];
        for (name, value) in ordinals {
            if let Some(value) = value {
                if value.trim().parse::<i64>().is_err() {
                    result.add_warning(format!("{} is not an integer: {}", name, value));
                }
            }
        }
    }

    fn validate_modality(&self, record: &DicomRecord, result: &mut ValidationResult) {
        match record.modality.as_deref() {
            Some(modality) if !is_known_modality(modality) => {
                result.add_warning(format!("Unknown modality code: {}", modality));
            }
            Some(_) => {}
            None => result.add_warning("Modality is missing".to_string()),
        }
    }
}

/// 常见的DICOM模态代码
fn is_known_modality(modality: &str) -> bool {
    const KNOWN: &[&str] = &[
        "AR", "ASMT", "AU", "BDUS", "BI", "BMD", "CR", "CT", "DG", "DOC", "DX", "ECG", "EPS",
        "ES", "FID", "GM", "HC", "HD", "IO", "IOL", "IVOCT", "IVUS", "KER", "KO", "LEN", "LS",
        "MG", "MR", "NM", "OAM", "OCT", "OP", "OPM", "OPT", "OPV", "OSS", "OT", "PLAN", "PR",
        "PT", "PX", "REG", "RESP", "RF", "RG", "RTDOSE", "RTIMAGE", "RTPLAN", "RTRECORD",
        "RTSTRUCT", "RWV", "SEG", "SM", "SMR", "SR", "SRF", "STAIN", "TG", "US", "VA", "XA",
        "XC",
    ];
    KNOWN.contains(&modality.trim())
}

/// 校验结果
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// 错误列表
    pub errors: Vec<String>,
    /// 警告列表
    pub warnings: Vec<String>,
    /// 是否通过校验
    pub is_valid: bool,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            is_valid: true,
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// 获取校验摘要
    pub fn summary(&self) -> String {
        if self.is_valid {
            if self.has_warnings() {
                format!("valid with {} warnings", self.warning_count())
            } else {
                "valid".to_string()
            }
        } else {
            format!(
                "invalid: {} errors, {} warnings",
                self.error_count(),
                self.warning_count()
            )
        }
    }

    /// 逐条输出到日志
    pub fn log(&self, source: &str) {
        for error in &self.errors {
            warn!("{}: {}", source, error);
        }
        for warning in &self.warnings {
            info!("{}: {}", source, warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> DicomRecord {
        DicomRecord {
            study_instance_uid: Some("1.2.3".to_string()),
            accession_number: Some("A1".to_string()),
            series_instance_uid: Some("1.2.3.4".to_string()),
            sop_instance_uid: Some("1.2.3.4.5".to_string()),
            sop_class_uid: Some("1.2.840.10008.5.1.4.1.1.2".to_string()),
            modality: Some("CT".to_string()),
            study_date: Some("20240101".to_string()),
            study_time: Some("101010".to_string()),
            series_number: Some("1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_record() {
        let result = RecordValidator::new().validate(&valid_record());
        assert!(result.is_valid);
        assert!(!result.has_warnings(), "{:?}", result.warnings);
        assert_eq!(result.summary(), "valid");
    }

    #[test]
    fn test_missing_identifiers_are_errors() {
        let mut record = valid_record();
        record.sop_instance_uid = None;
        record.accession_number = Some(" ".to_string());
        let result = RecordValidator::new().validate(&record);
        assert!(!result.is_valid);
        assert_eq!(result.error_count(), 2);
    }

    #[test]
    fn test_malformed_optional_fields_are_warnings() {
        let mut record = valid_record();
        record.study_date = Some("2024-01-01".to_string());
        record.series_number = Some("one".to_string());
        record.modality = Some("XYZ".to_string());
        record.series_instance_uid = Some("1.2.abc".to_string());
        let result = RecordValidator::new().validate(&record);
        assert!(result.is_valid);
        assert_eq!(result.warning_count(), 4);
        assert_eq!(result.summary(), "valid with 4 warnings");
    }

    #[test]
    fn test_validation_result() {
        let mut result = ValidationResult::new();

        result.add_warning("warn".to_string());
        assert!(result.has_warnings());
        assert!(result.is_valid);

        result.add_error("err".to_string());
        assert!(result.has_errors());
        assert!(!result.is_valid);
        assert_eq!(result.summary(), "invalid: 1 errors, 1 warnings");
    }
}
