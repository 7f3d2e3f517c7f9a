//! # RadFHIR
//!
//! 把一个检查的 DICOM 元数据聚合为 FHIR ImagingStudy，并组装为事务 Bundle。

pub use radfhir_bundle as bundle;
pub use radfhir_core as fhir;
pub use radfhir_dicom as dicom;

pub use radfhir_bundle::{BundleConfig, ImagingStudyAggregator, IngestOutcome};
pub use radfhir_core::{Bundle, RadFhirError, Result};
pub use radfhir_dicom::DicomRecord;
