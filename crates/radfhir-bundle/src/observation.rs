//! 派生测量（体征观察值）构建
//!
//! 仅从首条记录读取体重与身高；无法解析的数值直接跳过。

use chrono::{DateTime, FixedOffset};
use radfhir_core::utils::{new_resource_id, non_blank};
use radfhir_core::{
    CodeableConcept, Coding, Observation, ObservationStatus, Quantity, Reference, ResourceKind,
};
use radfhir_dicom::DicomRecord;

const OBSERVATION_CATEGORY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/observation-category";
const LOINC_SYSTEM: &str = "http://loinc.org";
const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// 体征项定义
struct VitalSign {
    loinc: &'static str,
    display: &'static str,
    unit: &'static str,
}

const BODY_WEIGHT: VitalSign = VitalSign {
    loinc: "29463-7",
    display: "Body Weight",
    unit: "kg",
};

const BODY_HEIGHT: VitalSign = VitalSign {
    loinc: "8302-2",
    display: "Body Height",
    unit: "m",
};

/// 测量值的上下文：所属患者、检查与采集时间
pub struct MeasurementContext<'a> {
    pub patient_id: &'a str,
    pub study_id: &'a str,
    pub effective: Option<DateTime<FixedOffset>>,
}

/// 从首条记录构建体征观察值，按体重、身高的顺序
pub fn build_observations(record: &DicomRecord, context: &MeasurementContext<'_>) -> Vec<Observation> {
    [
        (&record.patient_weight, &BODY_WEIGHT),
        (&record.patient_size, &BODY_HEIGHT),
    ]
    .into_iter()
    .filter_map(|(raw, sign)| {
        let value = parse_decimal(raw.as_deref())?;
        Some(vital_sign_observation(sign, value, context))
    })
    .collect()
}

/// 解析 DS 值，非有限数与负数视为缺失
fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    let value = non_blank(raw)?.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn vital_sign_observation(sign: &VitalSign, value: f64, context: &MeasurementContext<'_>) -> Observation {
    Observation {
        id: new_resource_id(),
        status: ObservationStatus::Final,
        category: vec![CodeableConcept::from_coding(Coding::with_system(
            "vital-signs",
            OBSERVATION_CATEGORY_SYSTEM,
        ))],
        code: CodeableConcept {
            coding: vec![Coding::new(sign.loinc, Some(LOINC_SYSTEM), Some(sign.display))],
            text: Some(sign.display.to_string()),
        },
        subject: Some(Reference::to(ResourceKind::Patient, context.patient_id)),
        part_of: vec![Reference::to(ResourceKind::ImagingStudy, context.study_id)],
        effective_date_time: context.effective,
        value_quantity: Some(Quantity {
            value,
            unit: sign.unit.to_string(),
            system: UCUM_SYSTEM.to_string(),
            code: sign.unit.to_string(),
        }),
    }
}
