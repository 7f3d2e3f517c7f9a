//! 错误定义模块

use thiserror::Error;

/// 统一错误类型
#[derive(Error, Debug)]
pub enum RadFhirError {
    #[error("缺少必需字段: {0}")]
    MissingRequiredField(String),

    #[error("尚未聚合任何记录")]
    NoRecordsIngested,

    #[error("配置错误: {0}")]
    Config(String),

    #[error("DICOM解析错误: {0}")]
    DicomParse(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, RadFhirError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message_names_field() {
        let err = RadFhirError::MissingRequiredField("SOPInstanceUID".to_string());
        assert!(err.to_string().contains("SOPInstanceUID"));
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(RadFhirError::Io(_))));
    }
}
