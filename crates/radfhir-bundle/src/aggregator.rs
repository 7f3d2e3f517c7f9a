//! 检查聚合引擎
//!
//! 逐条接收同一检查的 DICOM 记录，按 Study → Series → Instance 三级去重，
//! 在 finalize 时从映射重新计算序列数、实例数与模态集合。
//! 首条记录决定检查、患者、设备与派生测量；之后的记录只补充系列与实例。

use crate::config::BundleConfig;
use crate::device::build_device;
use crate::ids::IdGenerator;
use crate::observation::{build_observations, MeasurementContext};
use crate::patient::build_patient;
use crate::state_machine::{AggregatorEvent, AggregatorState};
use radfhir_core::{
    Coding, Device, ImagingStudy, ImagingStudySeries, ImagingStudySeriesInstance,
    ImagingStudyStatus, Observation, Patient, RadFhirError, Reference, ResourceKind, Result,
};
use radfhir_dicom::extract;
use radfhir_dicom::{DicomRecord, RequiredFields, SourceTimezone};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 单条记录的聚合结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IngestOutcome {
    /// 首条记录，检查已建立
    Created,
    /// 新实例已加入
    Added,
    /// 实例已存在，记录被忽略
    DuplicateInstance,
}

/// 聚合统计
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregatorStats {
    pub records_ingested: usize,
    pub duplicate_instances: usize,
    pub series: usize,
    pub instances: usize,
}

/// 保持插入顺序的字符串键映射
#[derive(Debug)]
struct OrderedMap<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.entries.push((key.to_string(), make()));
                let i = self.entries.len() - 1;
                self.index.insert(key.to_string(), i);
                i
            }
        };
        &mut self.entries[i].1
    }

    /// 仅在键不存在时插入，返回是否插入
    fn insert_new(&mut self, key: &str, value: V) -> bool {
        if self.contains_key(key) {
            return false;
        }
        self.get_or_insert_with(key, || value);
        true
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

/// 首条记录确定的会话内容
#[derive(Debug)]
struct Session {
    study_instance_uid: String,
    /// 不含系列与派生计数的检查模板
    study: ImagingStudy,
    patient: Patient,
    device: Device,
    observations: Vec<Observation>,
}

/// 检查聚合引擎
pub struct ImagingStudyAggregator {
    config: BundleConfig,
    timezone: SourceTimezone,
    id_generator: Box<dyn IdGenerator>,
    state: AggregatorState,
    session: Option<Session>,
    series: OrderedMap<ImagingStudySeries>,
    instances: OrderedMap<OrderedMap<ImagingStudySeriesInstance>>,
    finalized: Option<ImagingStudy>,
    records_ingested: usize,
    duplicate_instances: usize,
}

impl std::fmt::Debug for ImagingStudyAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagingStudyAggregator")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ImagingStudyAggregator {
    /// 使用配置中的ID策略创建聚合器
    pub fn new(config: BundleConfig) -> Result<Self> {
        let strategy = config.id_strategy;
        Self::with_id_generator(config, strategy)
    }

    /// 使用自定义ID生成器创建聚合器
    pub fn with_id_generator(config: BundleConfig, id_generator: impl IdGenerator + 'static) -> Result<Self> {
        let timezone = config.timezone()?;
        Ok(Self {
            config,
            timezone,
            id_generator: Box::new(id_generator),
            state: AggregatorState::Empty,
            session: None,
            series: OrderedMap::default(),
            instances: OrderedMap::default(),
            finalized: None,
            records_ingested: 0,
            duplicate_instances: 0,
        })
    }

    /// 接收一条记录
    ///
    /// 缺少必需字段时返回 `MissingRequiredField`，聚合器状态不变。
    pub fn ingest(&mut self, record: &DicomRecord) -> Result<IngestOutcome> {
        let required = record.required_fields()?;
        let next = self.state.transition(AggregatorEvent::Ingest)?;

        let created = self.session.is_none();
        if created {
            let session = self.open_session(record, &required);
            self.session = Some(session);
        } else if let Some(session) = &self.session {
            if session.study_instance_uid != required.study_instance_uid {
                warn!(
                    "Record {} belongs to study {}, aggregating into {}",
                    required.sop_instance_uid, required.study_instance_uid, session.study_instance_uid
                );
            }
        }

        self.upsert_series(record, &required);
        let added = self.upsert_instance(record, &required);

        self.records_ingested += 1;
        self.state = next;

        Ok(match (created, added) {
            (true, _) => IngestOutcome::Created,
            (false, true) => IngestOutcome::Added,
            (false, false) => IngestOutcome::DuplicateInstance,
        })
    }

    fn open_session(&self, record: &DicomRecord, required: &RequiredFields<'_>) -> Session {
        let patient = build_patient(record, self.id_generator.generate(ResourceKind::Patient, record));
        let device = build_device(record, self.id_generator.generate(ResourceKind::Device, record));

        let study = ImagingStudy {
            id: self.id_generator.generate(ResourceKind::ImagingStudy, record),
            status: ImagingStudyStatus::Available,
            identifier: [
                extract::accession_identifier(record),
                extract::study_instance_identifier(record),
            ]
            .into_iter()
            .flatten()
            .collect(),
            subject: Reference::to(ResourceKind::Patient, &patient.id),
            started: extract::study_started(record, &self.timezone),
            procedure_code: extract::procedure_codes(record),
            reason_code: extract::reason_codes(record),
            description: extract::description(&record.study_description),
            ..Default::default()
        };

        let observations = if self.config.include_derived_measurements {
            build_observations(
                record,
                &MeasurementContext {
                    patient_id: &patient.id,
                    study_id: &study.id,
                    effective: study.started,
                },
            )
        } else {
            Vec::new()
        };

        info!(
            "Opened study {} (accession {}) as ImagingStudy/{}",
            required.study_instance_uid, required.accession_number, study.id
        );

        Session {
            study_instance_uid: required.study_instance_uid.to_string(),
            study,
            patient,
            device,
            observations,
        }
    }

    /// 系列以首次出现的记录为准
    fn upsert_series(&mut self, record: &DicomRecord, required: &RequiredFields<'_>) {
        let uid = required.series_instance_uid;
        if self.series.contains_key(uid) {
            return;
        }
        let series = ImagingStudySeries {
            uid: uid.to_string(),
            number: extract::series_number(record),
            modality: extract::modality_coding(record),
            description: extract::description(&record.series_description),
            number_of_instances: 0,
            body_site: extract::body_site_coding(record),
            laterality: extract::laterality_coding(record),
            started: extract::series_started(record, &self.timezone),
            instance: Vec::new(),
        };
        debug!("New series {} ({:?})", uid, series.modality.as_ref().and_then(|m| m.code.as_deref()));
        self.series.insert_new(uid, series);
    }

    fn upsert_instance(&mut self, record: &DicomRecord, required: &RequiredFields<'_>) -> bool {
        let instance = ImagingStudySeriesInstance {
            uid: required.sop_instance_uid.to_string(),
            sop_class: extract::sop_class_coding_from_uid(required.sop_class_uid),
            number: extract::instance_number(record),
            title: extract::instance_title(record),
        };
        let added = self
            .instances
            .get_or_insert_with(required.series_instance_uid, OrderedMap::default)
            .insert_new(required.sop_instance_uid, instance);
        if !added {
            self.duplicate_instances += 1;
            warn!(
                "Duplicate instance {} in series {}, ignored",
                required.sop_instance_uid, required.series_instance_uid
            );
        }
        added
    }

    /// 生成最终的检查资源
    ///
    /// 每次调用都从映射重新计算，重复调用结果相同。
    pub fn finalize(&mut self) -> Result<&ImagingStudy> {
        let session = self.session.as_ref().ok_or(RadFhirError::NoRecordsIngested)?;
        let next = self.state.transition(AggregatorEvent::Finalize)?;

        let include_detail = self.config.include_instance_detail;
        let mut study = session.study.clone();
        study.series = self
            .series
            .iter()
            .map(|(uid, series)| {
                let mut series = series.clone();
                let instances = self.instances.get(uid);
                if include_detail {
                    series.instance = instances
                        .map(|m| m.values().cloned().collect())
                        .unwrap_or_default();
                    series.number_of_instances = series.instance.len() as u32;
                } else {
                    series.instance.clear();
                    series.number_of_instances = instances.map_or(0, |m| m.len()) as u32;
                }
                series
            })
            .collect();
        study.number_of_series = study.series.len() as u32;
        study.number_of_instances = study.series.iter().map(|s| s.number_of_instances).sum();
        study.modality = modality_set(&study.series);

        info!(
            "Finalized ImagingStudy/{}: {} series, {} instances",
            study.id, study.number_of_series, study.number_of_instances
        );

        self.state = next;
        let study: &ImagingStudy = self.finalized.insert(study);
        Ok(study)
    }

    /// 当前状态
    pub fn state(&self) -> AggregatorState {
        self.state
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            records_ingested: self.records_ingested,
            duplicate_instances: self.duplicate_instances,
            series: self.series.len(),
            instances: self.instances.values().map(OrderedMap::len).sum(),
        }
    }

    /// 首条记录构建的患者
    pub fn patient(&self) -> Option<&Patient> {
        self.session.as_ref().map(|s| &s.patient)
    }

    /// 首条记录构建的设备
    pub fn device(&self) -> Option<&Device> {
        self.session.as_ref().map(|s| &s.device)
    }

    /// 派生测量
    pub fn observations(&self) -> &[Observation] {
        self.session
            .as_ref()
            .map(|s| s.observations.as_slice())
            .unwrap_or_default()
    }
}

/// 按首次出现顺序去重的模态集合，无模态的系列不计入
fn modality_set(series: &[ImagingStudySeries]) -> Vec<Coding> {
    let mut modalities: Vec<Coding> = Vec::new();
    for coding in series.iter().filter_map(|s| s.modality.as_ref()) {
        if !modalities.iter().any(|m| m.code == coding.code) {
            modalities.push(coding.clone());
        }
    }
    modalities
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(series: &str, instance: &str, modality: &str) -> DicomRecord {
        DicomRecord {
            study_instance_uid: Some("1.2.840.1".to_string()),
            accession_number: Some("ACC-1".to_string()),
            series_instance_uid: Some(series.to_string()),
            sop_instance_uid: Some(instance.to_string()),
            sop_class_uid: Some("1.2.840.10008.5.1.4.1.1.2".to_string()),
            modality: Some(modality.to_string()),
            ..Default::default()
        }
    }

    fn aggregator() -> ImagingStudyAggregator {
        ImagingStudyAggregator::new(BundleConfig::default()).unwrap()
    }

    #[test]
    fn test_ingest_outcomes() {
        let mut agg = aggregator();
        assert_eq!(agg.state(), AggregatorState::Empty);

        assert_eq!(agg.ingest(&record("s1", "i1", "CT")).unwrap(), IngestOutcome::Created);
        assert_eq!(agg.ingest(&record("s1", "i2", "CT")).unwrap(), IngestOutcome::Added);
        assert_eq!(
            agg.ingest(&record("s1", "i1", "CT")).unwrap(),
            IngestOutcome::DuplicateInstance
        );
        assert_eq!(agg.state(), AggregatorState::Collecting);

        assert_eq!(
            agg.stats(),
            AggregatorStats {
                records_ingested: 3,
                duplicate_instances: 1,
                series: 1,
                instances: 2,
            }
        );
    }

    #[test]
    fn test_missing_required_field_leaves_state_untouched() {
        let mut agg = aggregator();
        let mut r = record("s1", "i1", "CT");
        r.sop_class_uid = None;

        assert!(matches!(
            agg.ingest(&r),
            Err(RadFhirError::MissingRequiredField(ref f)) if f == "SOPClassUID"
        ));
        assert_eq!(agg.state(), AggregatorState::Empty);
        assert_eq!(agg.stats(), AggregatorStats::default());
        assert!(agg.patient().is_none());
    }

    #[test]
    fn test_finalize_empty() {
        let mut agg = aggregator();
        assert!(matches!(agg.finalize(), Err(RadFhirError::NoRecordsIngested)));
        assert_eq!(agg.state(), AggregatorState::Empty);
    }

    #[test]
    fn test_finalize_counts_and_modalities() {
        let mut agg = aggregator();
        agg.ingest(&record("s1", "i1", "CT")).unwrap();
        agg.ingest(&record("s2", "i2", "MR")).unwrap();
        agg.ingest(&record("s3", "i3", "CT")).unwrap();
        agg.ingest(&record("s3", "i4", "CT")).unwrap();

        let study = agg.finalize().unwrap();
        assert_eq!(study.number_of_series, 3);
        assert_eq!(study.number_of_instances, 4);
        let codes: Vec<_> = study.modality.iter().filter_map(|m| m.code.as_deref()).collect();
        assert_eq!(codes, vec!["CT", "MR"]);
        assert_eq!(study.find_series("s3").unwrap().number_of_instances, 2);
        assert!(study.series.iter().all(|s| s.instance.is_empty()));
        assert_eq!(agg.state(), AggregatorState::Finalized);
    }

    #[test]
    fn test_series_without_modality_not_in_set() {
        let mut agg = aggregator();
        let mut r = record("s1", "i1", "CT");
        r.modality = None;
        agg.ingest(&r).unwrap();

        let study = agg.finalize().unwrap();
        assert!(study.modality.is_empty());
        assert_eq!(study.series[0].modality, None);
    }

    #[test]
    fn test_first_record_wins_for_series() {
        let mut agg = aggregator();
        let mut first = record("s1", "i1", "CT");
        first.series_description = Some("Axial".to_string());
        let mut second = record("s1", "i2", "CT");
        second.series_description = Some("Coronal".to_string());

        agg.ingest(&first).unwrap();
        agg.ingest(&second).unwrap();
        let study = agg.finalize().unwrap();
        assert_eq!(study.series[0].description.as_deref(), Some("Axial"));
    }

    #[test]
    fn test_instance_detail() {
        let config = BundleConfig {
            include_instance_detail: true,
            ..Default::default()
        };
        let mut agg = ImagingStudyAggregator::new(config).unwrap();
        agg.ingest(&record("s1", "i1", "CT")).unwrap();
        agg.ingest(&record("s1", "i2", "CT")).unwrap();

        let study = agg.finalize().unwrap();
        let uids: Vec<_> = study.series[0].instance.iter().map(|i| i.uid.as_str()).collect();
        assert_eq!(uids, vec!["i1", "i2"]);
        assert_eq!(study.series[0].number_of_instances, 2);
        assert_eq!(
            study.series[0].instance[0].sop_class.code.as_deref(),
            Some("urn:oid:1.2.840.10008.5.1.4.1.1.2")
        );
    }

    #[test]
    fn test_custom_id_generator() {
        let generator = |kind: ResourceKind, _: &DicomRecord| format!("{}-fixed", kind.as_str().to_lowercase());
        let mut agg = ImagingStudyAggregator::with_id_generator(BundleConfig::default(), generator).unwrap();
        agg.ingest(&record("s1", "i1", "CT")).unwrap();

        let study = agg.finalize().unwrap();
        assert_eq!(study.id, "imagingstudy-fixed");
        assert_eq!(study.subject.reference.as_deref(), Some("Patient/patient-fixed"));
        assert_eq!(agg.device().map(|d| d.id.as_str()), Some("device-fixed"));
    }

    #[test]
    fn test_aggregator_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ImagingStudyAggregator>();
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let config = BundleConfig {
            source_timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ImagingStudyAggregator::new(config),
            Err(RadFhirError::Config(_))
        ));
    }

    #[test]
    fn test_measurements_toggle() {
        let mut r = record("s1", "i1", "CT");
        r.patient_weight = Some("70".to_string());

        let mut agg = aggregator();
        agg.ingest(&r).unwrap();
        assert_eq!(agg.observations().len(), 1);

        let config = BundleConfig {
            include_derived_measurements: false,
            ..Default::default()
        };
        let mut agg = ImagingStudyAggregator::new(config).unwrap();
        agg.ingest(&r).unwrap();
        assert!(agg.observations().is_empty());
    }
}
