//! # RadFHIR DICOM
//!
//! DICOM 侧的输入边界：扁平元数据记录、Part-10 文件读取、记录校验，
//! 以及把单条记录映射为 FHIR 编码值的字段提取函数。

pub mod bodysite;
pub mod extract;
pub mod parser;
pub mod record;
pub mod timestamp;
pub mod validator;

pub use parser::DicomRecordReader;
pub use record::{CodeItem, DicomRecord, RequiredFields};
pub use timestamp::SourceTimezone;
pub use validator::{RecordValidator, ValidationResult};
