//! 字段提取
//!
//! 每个函数把一条记录映射为一个 FHIR 值。缺失或格式错误的字段一律返回
//! `None`（或空列表），从不报错；是否省略由调用方按返回值决定。

use crate::bodysite::{self, SNOMED_SYSTEM};
use crate::record::{CodeItem, DicomRecord};
use crate::timestamp::SourceTimezone;
use chrono::{DateTime, FixedOffset};
use radfhir_core::utils::{non_blank, oid_urn};
use radfhir_core::{CodeableConcept, Coding, Identifier};

/// HL7 v2 标识符类型编码系统
pub const IDENTIFIER_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";
/// 检查号标识符类型
pub const IDENTIFIER_TYPE_ACCESSION: &str = "ACSN";
/// 病历号标识符类型
pub const IDENTIFIER_TYPE_MRN: &str = "MR";
/// DICOM 采集模态编码系统
pub const MODALITY_SYSTEM: &str = "http://dicom.nema.org/resources/ontology/DCM";
/// SOP Class 编码系统
pub const SOP_CLASS_SYSTEM: &str = "urn:ietf:rfc:3986";
/// DICOM UID 标识符系统
pub const DICOM_UID_SYSTEM: &str = "urn:dicom:uid";

/// DICOM 多值分隔符
const MULTI_VALUE_DELIMITER: &str = "\\";

/// 结构化报告模态
const STRUCTURED_REPORT_MODALITY: &str = "SR";

fn text(value: &Option<String>) -> Option<&str> {
    non_blank(value.as_deref())
}

/// 采集模态编码
pub fn modality_coding(record: &DicomRecord) -> Option<Coding> {
    text(&record.modality).map(|m| Coding::with_system(m, MODALITY_SYSTEM))
}

/// 检查部位编码，未收录的取值保留原文作为用户自选编码
pub fn body_site_coding(record: &DicomRecord) -> Option<Coding> {
    let body_part = text(&record.body_part_examined)?;
    Some(match bodysite::lookup(body_part) {
        Some(concept) => Coding::new(concept.code, Some(SNOMED_SYSTEM), Some(concept.display)),
        None => Coding::new(body_part, None, None),
    })
}

/// 偏侧编码
pub fn laterality_coding(record: &DicomRecord) -> Option<Coding> {
    text(&record.laterality).map(|l| Coding::new(l, None, None))
}

/// 对象类别（SOP Class）编码
pub fn sop_class_coding(record: &DicomRecord) -> Option<Coding> {
    text(&record.sop_class_uid).map(sop_class_coding_from_uid)
}

pub fn sop_class_coding_from_uid(uid: &str) -> Coding {
    Coding::with_system(oid_urn(uid), SOP_CLASS_SYSTEM)
}

/// 检查号标识符
pub fn accession_identifier(record: &DicomRecord) -> Option<Identifier> {
    let accession = text(&record.accession_number)?;
    Some(Identifier {
        use_: Some("usual".to_string()),
        type_: Some(CodeableConcept::from_coding(Coding::with_system(
            IDENTIFIER_TYPE_ACCESSION,
            IDENTIFIER_TYPE_SYSTEM,
        ))),
        value: Some(accession.to_string()),
        ..Default::default()
    })
}

/// Study Instance UID 标识符
pub fn study_instance_identifier(record: &DicomRecord) -> Option<Identifier> {
    let uid = text(&record.study_instance_uid)?;
    Some(Identifier {
        system: Some(DICOM_UID_SYSTEM.to_string()),
        value: Some(oid_urn(uid)),
        ..Default::default()
    })
}

fn coding_from_item(item: &CodeItem) -> Option<Coding> {
    let code = non_blank(item.code.as_deref())?;
    Some(Coding {
        system: non_blank(item.system.as_deref()).map(str::to_string),
        code: Some(code.to_string()),
        display: non_blank(item.display.as_deref()).map(str::to_string),
        user_selected: None,
    })
}

/// 检查项目编码，每个序列项一个概念，文本取显示名
pub fn procedure_codes(record: &DicomRecord) -> Vec<CodeableConcept> {
    record
        .procedure_codes
        .iter()
        .filter_map(|item| {
            let coding = coding_from_item(item)?;
            Some(CodeableConcept {
                text: coding.display.clone(),
                coding: vec![coding],
            })
        })
        .collect()
}

/// 申请原因：优先使用编码序列，否则退回自由文本
pub fn reason_codes(record: &DicomRecord) -> Vec<CodeableConcept> {
    let coded: Vec<CodeableConcept> = record
        .reason_codes
        .iter()
        .filter_map(coding_from_item)
        .map(CodeableConcept::from_coding)
        .collect();
    if !coded.is_empty() {
        return coded;
    }
    text(&record.reason_text)
        .map(|reason| vec![CodeableConcept::from_text(reason)])
        .unwrap_or_default()
}

/// 解析 IS 类型的序号；负数与非数字视为缺失
pub fn ordinal(value: &Option<String>) -> Option<u32> {
    let value = text(value)?;
    value.trim_start_matches('+').parse::<u32>().ok()
}

pub fn series_number(record: &DicomRecord) -> Option<u32> {
    ordinal(&record.series_number)
}

pub fn instance_number(record: &DicomRecord) -> Option<u32> {
    ordinal(&record.instance_number)
}

/// 实例标题：结构化报告取文档标题，其余取 ImageType 的多值拼接
pub fn instance_title(record: &DicomRecord) -> Option<String> {
    if text(&record.modality) == Some(STRUCTURED_REPORT_MODALITY) {
        return record
            .concept_name
            .first()
            .and_then(|item| non_blank(item.display.as_deref()))
            .map(str::to_string);
    }
    let parts: Vec<&str> = record
        .image_type
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(MULTI_VALUE_DELIMITER))
}

/// 检查开始时间
pub fn study_started(record: &DicomRecord, tz: &SourceTimezone) -> Option<DateTime<FixedOffset>> {
    tz.combine(text(&record.study_date), text(&record.study_time))
}

/// 系列开始时间
pub fn series_started(record: &DicomRecord, tz: &SourceTimezone) -> Option<DateTime<FixedOffset>> {
    tz.combine(text(&record.series_date), text(&record.series_time))
}

/// 非空的描述文本
pub fn description(value: &Option<String>) -> Option<String> {
    text(value).map(str::to_string)
}
