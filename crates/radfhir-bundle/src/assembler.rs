//! 事务 Bundle 组装
//!
//! 条目顺序固定为 ImagingStudy、Patient、Device，其后是派生测量。
//! 所有条目都以 PUT 写入 `{类型}/{id}`，重复提交不会产生重复资源。

use crate::aggregator::ImagingStudyAggregator;
use radfhir_core::utils::new_resource_id;
use radfhir_core::{
    Bundle, BundleEntry, BundleEntryRequest, BundleType, HttpVerb, RadFhirError, Resource, Result,
};
use tracing::info;

/// 以 upsert 语义包装一个资源
pub fn upsert_entry(resource: Resource) -> BundleEntry {
    let url = format!("{}/{}", resource.kind(), resource.id());
    BundleEntry {
        resource,
        request: BundleEntryRequest {
            method: HttpVerb::Put,
            url,
        },
    }
}

impl ImagingStudyAggregator {
    /// 组装事务 Bundle；会先执行 finalize
    pub fn assemble(&mut self) -> Result<Bundle> {
        let study = self.finalize()?.clone();
        let patient = self.patient().cloned().ok_or(RadFhirError::NoRecordsIngested)?;
        let device = self.device().cloned().ok_or(RadFhirError::NoRecordsIngested)?;

        let mut entry = vec![
            upsert_entry(Resource::ImagingStudy(study)),
            upsert_entry(Resource::Patient(patient)),
            upsert_entry(Resource::Device(device)),
        ];
        entry.extend(
            self.observations()
                .iter()
                .cloned()
                .map(Resource::Observation)
                .map(upsert_entry),
        );

        let bundle = Bundle {
            id: new_resource_id(),
            type_: BundleType::Transaction,
            entry,
        };
        info!("Assembled transaction Bundle/{} with {} entries", bundle.id, bundle.entry.len());
        Ok(bundle)
    }
}
