//! DICOM文件读取
//!
//! 读取 Part-10 文件并提取聚合所需的扁平元数据

use crate::record::{CodeItem, DicomRecord};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{open_file, InMemDicomObject};
use radfhir_core::{RadFhirError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// DICOM记录读取器
pub struct DicomRecordReader;

impl DicomRecordReader {
    /// 读取单个DICOM文件
    pub fn read_file<P: AsRef<Path>>(file_path: P) -> Result<DicomRecord> {
        let file_path = file_path.as_ref();
        debug!("Reading DICOM file: {:?}", file_path);

        let obj = open_file(file_path).map_err(|e| {
            error!("Failed to parse DICOM file {:?}: {}", file_path, e);
            RadFhirError::DicomParse(format!("{}: {}", file_path.display(), e))
        })?;

        let record = Self::extract_record(&obj);
        debug!("Extracted record: {}", record.summary());
        Ok(record)
    }

    /// 列出目录下的所有文件（不递归），按路径排序
    pub fn list_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        info!("Found {} files in {:?}", files.len(), dir);
        Ok(files)
    }

    /// 从数据集中提取扁平记录
    pub fn extract_record(obj: &InMemDicomObject) -> DicomRecord {
        DicomRecord {
            // 检查信息
            study_instance_uid: string_of(obj, tags::STUDY_INSTANCE_UID),
            accession_number: string_of(obj, tags::ACCESSION_NUMBER),
            study_description: string_of(obj, tags::STUDY_DESCRIPTION),
            study_date: string_of(obj, tags::STUDY_DATE),
            study_time: string_of(obj, tags::STUDY_TIME),
            procedure_codes: code_items(obj, tags::PROCEDURE_CODE_SEQUENCE),
            reason_codes: code_items(obj, tags::REASON_FOR_REQUESTED_PROCEDURE_CODE_SEQUENCE),
            reason_text: string_of(obj, tags::REASON_FOR_THE_REQUESTED_PROCEDURE),

            // 序列信息
            series_instance_uid: string_of(obj, tags::SERIES_INSTANCE_UID),
            series_description: string_of(obj, tags::SERIES_DESCRIPTION),
            series_number: string_of(obj, tags::SERIES_NUMBER),
            series_date: string_of(obj, tags::SERIES_DATE),
            series_time: string_of(obj, tags::SERIES_TIME),
            modality: string_of(obj, tags::MODALITY),
            body_part_examined: string_of(obj, tags::BODY_PART_EXAMINED),
            laterality: string_of(obj, tags::LATERALITY),

            // 实例信息
            sop_instance_uid: string_of(obj, tags::SOP_INSTANCE_UID),
            sop_class_uid: string_of(obj, tags::SOP_CLASS_UID),
            instance_number: string_of(obj, tags::INSTANCE_NUMBER),
            image_type: strings_of(obj, tags::IMAGE_TYPE),
            concept_name: code_items(obj, tags::CONCEPT_NAME_CODE_SEQUENCE),

            // 患者信息
            patient_id: string_of(obj, tags::PATIENT_ID),
            issuer_of_patient_id: string_of(obj, tags::ISSUER_OF_PATIENT_ID),
            patient_name: string_of(obj, tags::PATIENT_NAME),
            patient_sex: string_of(obj, tags::PATIENT_SEX),
            patient_birth_date: string_of(obj, tags::PATIENT_BIRTH_DATE),
            patient_weight: string_of(obj, tags::PATIENT_WEIGHT),
            patient_size: string_of(obj, tags::PATIENT_SIZE),

            // 设备信息
            manufacturer: string_of(obj, tags::MANUFACTURER),
            manufacturer_model_name: string_of(obj, tags::MANUFACTURER_MODEL_NAME),
            device_serial_number: string_of(obj, tags::DEVICE_SERIAL_NUMBER),
            software_versions: strings_of(obj, tags::SOFTWARE_VERSIONS),
            station_name: string_of(obj, tags::STATION_NAME),
            institution_name: string_of(obj, tags::INSTITUTION_NAME),
        }
    }
}

fn clean(value: &str) -> Option<String> {
    let value = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!value.is_empty()).then(|| value.to_string())
}

/// 获取字符串类型元素的值，多值时以 `\` 拼接
fn string_of(obj: &InMemDicomObject, tag: Tag) -> Option<String> {
    match obj.element(tag) {
        Ok(element) => match element.to_str() {
            Ok(value) => clean(&value),
            Err(_) => {
                debug!("Tag {} is not a string value", tag);
                None
            }
        },
        Err(_) => None,
    }
}

/// 获取多值字符串元素
fn strings_of(obj: &InMemDicomObject, tag: Tag) -> Vec<String> {
    obj.element(tag)
        .ok()
        .and_then(|element| element.to_multi_str().ok())
        .map(|values| values.iter().filter_map(|v| clean(v)).collect())
        .unwrap_or_default()
}

/// 获取编码序列
fn code_items(obj: &InMemDicomObject, tag: Tag) -> Vec<CodeItem> {
    let Some(items) = obj.element(tag).ok().and_then(|element| element.items()) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| CodeItem {
            code: string_of(item, tags::CODE_VALUE),
            system: string_of(item, tags::CODING_SCHEME_DESIGNATOR),
            display: string_of(item, tags::CODE_MEANING),
        })
        .collect()
}
