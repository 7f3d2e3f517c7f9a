//! 患者资源构建

use radfhir_core::utils::non_blank;
use radfhir_core::{
    AdministrativeGender, CodeableConcept, Coding, HumanName, Identifier, Patient, Reference,
};
use radfhir_dicom::extract::{IDENTIFIER_TYPE_MRN, IDENTIFIER_TYPE_SYSTEM};
use radfhir_dicom::timestamp::parse_da;
use radfhir_dicom::DicomRecord;

/// 从首条记录构建患者
pub fn build_patient(record: &DicomRecord, id: String) -> Patient {
    Patient {
        id,
        identifier: patient_identifier(record).into_iter().collect(),
        active: true,
        name: record
            .patient_name
            .as_deref()
            .and_then(parse_person_name)
            .into_iter()
            .collect(),
        gender: gender(record.patient_sex.as_deref()),
        birth_date: non_blank(record.patient_birth_date.as_deref()).and_then(parse_da),
    }
}

fn patient_identifier(record: &DicomRecord) -> Option<Identifier> {
    let patient_id = non_blank(record.patient_id.as_deref())?;
    Some(Identifier {
        use_: Some("usual".to_string()),
        type_: Some(CodeableConcept::from_coding(Coding::with_system(
            IDENTIFIER_TYPE_MRN,
            IDENTIFIER_TYPE_SYSTEM,
        ))),
        value: Some(patient_id.to_string()),
        assigner: non_blank(record.issuer_of_patient_id.as_deref()).map(Reference::display),
        ..Default::default()
    })
}

/// 解析 PN 值 `Family^Given^Middle^Prefix^Suffix`，只取字母表示部分
pub fn parse_person_name(value: &str) -> Option<HumanName> {
    let alphabetic = value.split('=').next().unwrap_or(value);
    let mut parts = alphabetic.split('^').map(str::trim);
    let component = |part: Option<&str>| part.filter(|p| !p.is_empty()).map(str::to_string);

    let family = component(parts.next());
    let given = component(parts.next());
    let middle = component(parts.next());
    let prefix = component(parts.next());
    let suffix = component(parts.next());

    let name = HumanName {
        family,
        given: given.into_iter().chain(middle).collect(),
        prefix: prefix.into_iter().collect(),
        suffix: suffix.into_iter().collect(),
    };
    if name.family.is_none() && name.given.is_empty() {
        return None;
    }
    Some(name)
}

/// 性别映射，无法识别的取值为 unknown
pub fn gender(sex: Option<&str>) -> AdministrativeGender {
    match non_blank(sex).map(str::to_ascii_uppercase).as_deref() {
        Some("M") => AdministrativeGender::Male,
        Some("F") => AdministrativeGender::Female,
        Some("O") => AdministrativeGender::Other,
        _ => AdministrativeGender::Unknown,
    }
}
