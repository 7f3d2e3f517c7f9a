//! 通用工具函数

use uuid::Uuid;

/// OID 的 URN 前缀
pub const OID_URN_PREFIX: &str = "urn:oid:";

/// 生成新的资源ID
pub fn new_resource_id() -> String {
    Uuid::new_v4().to_string()
}

/// 将 DICOM UID 包装为 `urn:oid:` 形式
pub fn oid_urn(uid: &str) -> String {
    format!("{}{}", OID_URN_PREFIX, uid)
}

/// 验证DICOM UID格式
pub fn is_valid_dicom_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid.len() <= 64
        && uid.chars().all(|c| c.is_ascii_digit() || c == '.')
        && !uid.starts_with('.')
        && !uid.ends_with('.')
        && !uid.contains("..")
}

/// 空白字符串视为缺失
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_resource_id_is_unique() {
        assert_ne!(new_resource_id(), new_resource_id());
    }

    #[test]
    fn test_oid_urn() {
        assert_eq!(oid_urn("1.2.840.10008.5.1.4.1.1.2"), "urn:oid:1.2.840.10008.5.1.4.1.1.2");
    }

    #[test]
    fn test_is_valid_dicom_uid() {
        assert!(is_valid_dicom_uid("1.2.840.10008.5.1.4.1.1.4"));
        assert!(!is_valid_dicom_uid(""));
        assert!(!is_valid_dicom_uid("invalid.uid.with.letters"));
        assert!(!is_valid_dicom_uid("1..2"));
        assert!(!is_valid_dicom_uid(".1.2"));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  CT ")), Some("CT"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
