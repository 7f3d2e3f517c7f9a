//! 检查部位（Body Part Examined）到 SNOMED CT 的映射
//!
//! 取自 DICOM PS3.16 Annex L 中最常见的部分取值。

/// SNOMED CT 编码系统
pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// SNOMED 概念
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnomedConcept {
    pub code: &'static str,
    pub display: &'static str,
}

const fn concept(code: &'static str, display: &'static str) -> SnomedConcept {
    SnomedConcept { code, display }
}

/// 按检查部位取值查找 SNOMED 概念，大小写与首尾空白不敏感
pub fn lookup(body_part: &str) -> Option<SnomedConcept> {
    let key = body_part.trim().to_ascii_uppercase();
    let found = match key.as_str() {
        "ABDOMEN" => concept("818981001", "Abdomen"),
        "ABDOMENPELVIS" => concept("818982008", "Abdomen and Pelvis"),
        "ANKLE" => concept("70258002", "Ankle joint"),
        "ARM" => concept("302538001", "Upper arm"),
        "BRAIN" => concept("12738006", "Brain"),
        "BREAST" => concept("76752008", "Breast"),
        "CHEST" => concept("43799004", "Chest"),
        "CHESTABDOMEN" => concept("416550000", "Chest and Abdomen"),
        "CSPINE" => concept("122494005", "Cervical spine"),
        "ELBOW" => concept("127949000", "Elbow"),
        "EXTREMITY" => concept("66019005", "Extremity"),
        "FOOT" => concept("56459004", "Foot"),
        "HAND" => concept("85562004", "Hand"),
        "HEAD" => concept("69536005", "Head"),
        "HEADNECK" => concept("774007", "Head and Neck"),
        "HEART" => concept("80891009", "Heart"),
        "HIP" => concept("29836001", "Hip"),
        "KIDNEY" => concept("64033007", "Kidney"),
        "KNEE" => concept("72696002", "Knee"),
        "LIVER" => concept("10200004", "Liver"),
        "LSPINE" => concept("122496007", "Lumbar spine"),
        "NECK" => concept("45048000", "Neck"),
        "PELVIS" => concept("816092008", "Pelvis"),
        "SHOULDER" => concept("16982005", "Shoulder"),
        "SKULL" => concept("89546000", "Skull"),
        "SPINE" => concept("421060004", "Spine"),
        "TSPINE" => concept("122495006", "Thoracic spine"),
        "WHOLEBODY" => concept("38266002", "Entire body as a whole"),
        "WRIST" => concept("74670003", "Wrist joint"),
        _ => return None,
    };
    Some(found)
}
