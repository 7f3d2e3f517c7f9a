use pretty_assertions::assert_eq;
use radfhir_bundle::{BundleConfig, IdStrategy, ImagingStudyAggregator};
use radfhir_core::{BundleType, HttpVerb, RadFhirError, Resource, ResourceKind};
use radfhir_dicom::DicomRecord;

fn record(series: &str, instance: &str) -> DicomRecord {
    DicomRecord {
        study_instance_uid: Some("1.2.3.4".to_string()),
        accession_number: Some("ACC-77".to_string()),
        series_instance_uid: Some(series.to_string()),
        sop_instance_uid: Some(instance.to_string()),
        sop_class_uid: Some("1.2.840.10008.5.1.4.1.1.4".to_string()),
        modality: Some("MR".to_string()),
        patient_id: Some("PID-5".to_string()),
        patient_sex: Some("F".to_string()),
        patient_weight: Some("61.5".to_string()),
        patient_size: Some("1.65".to_string()),
        manufacturer: Some("ACME".to_string()),
        manufacturer_model_name: Some("MagnaView".to_string()),
        ..Default::default()
    }
}

fn assembled(config: BundleConfig) -> radfhir_core::Bundle {
    let mut agg = ImagingStudyAggregator::new(config).unwrap();
    agg.ingest(&record("S1", "I1")).unwrap();
    agg.ingest(&record("S1", "I2")).unwrap();
    agg.assemble().unwrap()
}

#[test]
fn entries_are_ordered_study_patient_device_observations() {
    let bundle = assembled(BundleConfig::default());
    assert_eq!(bundle.type_, BundleType::Transaction);

    let kinds: Vec<_> = bundle.entry.iter().map(|e| e.resource.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ResourceKind::ImagingStudy,
            ResourceKind::Patient,
            ResourceKind::Device,
            ResourceKind::Observation,
            ResourceKind::Observation,
        ]
    );
}

#[test]
fn every_entry_is_a_put_to_its_own_id() {
    let bundle = assembled(BundleConfig::default());
    for entry in &bundle.entry {
        assert_eq!(entry.request.method, HttpVerb::Put);
        assert_eq!(
            entry.request.url,
            format!("{}/{}", entry.resource.kind(), entry.resource.id())
        );
    }
}

#[test]
fn references_point_at_bundle_resources() {
    let bundle = assembled(BundleConfig::default());
    let patient_id = bundle.resources_of(ResourceKind::Patient).next().unwrap().id().to_string();
    let study_id = bundle.resources_of(ResourceKind::ImagingStudy).next().unwrap().id().to_string();

    match &bundle.entry[0].resource {
        Resource::ImagingStudy(study) => {
            assert_eq!(study.subject.reference, Some(format!("Patient/{}", patient_id)));
        }
        other => panic!("unexpected first resource: {:?}", other.kind()),
    }
    for resource in bundle.resources_of(ResourceKind::Observation) {
        let Resource::Observation(observation) = resource else {
            panic!("expected observation");
        };
        assert_eq!(
            observation.part_of[0].reference,
            Some(format!("ImagingStudy/{}", study_id))
        );
    }
}

#[test]
fn json_shape() {
    let bundle = assembled(BundleConfig::default());
    let json: serde_json::Value = serde_json::from_str(&bundle.to_json_pretty().unwrap()).unwrap();

    assert_eq!(json["resourceType"], "Bundle");
    assert_eq!(json["type"], "transaction");
    assert_eq!(json["entry"][0]["request"]["method"], "PUT");

    let study = &json["entry"][0]["resource"];
    assert_eq!(study["resourceType"], "ImagingStudy");
    assert_eq!(study["status"], "available");
    assert_eq!(study["numberOfSeries"], 1);
    assert_eq!(study["numberOfInstances"], 2);
    assert_eq!(study["modality"][0]["code"], "MR");
    assert!(study["series"][0].get("instance").is_none());

    assert_eq!(json["entry"][1]["resource"]["gender"], "female");
    assert_eq!(json["entry"][3]["resource"]["valueQuantity"]["value"], 61.5);
}

#[test]
fn instance_detail_toggle() {
    let bundle = assembled(BundleConfig {
        include_instance_detail: true,
        ..Default::default()
    });
    let Resource::ImagingStudy(study) = &bundle.entry[0].resource else {
        panic!("expected imaging study");
    };
    let instances: Vec<_> = study.series[0].instance.iter().map(|i| i.uid.as_str()).collect();
    assert_eq!(instances, vec!["I1", "I2"]);
    assert_eq!(study.series[0].number_of_instances, 2);
}

#[test]
fn measurements_toggle() {
    let bundle = assembled(BundleConfig {
        include_derived_measurements: false,
        ..Default::default()
    });
    assert_eq!(bundle.entry.len(), 3);
    assert_eq!(bundle.resources_of(ResourceKind::Observation).count(), 0);
}

#[test]
fn deterministic_ids_are_stable_across_sessions() {
    let first = assembled(BundleConfig::default());
    let second = assembled(BundleConfig::default());
    for i in 0..3 {
        assert_eq!(first.entry[i].request.url, second.entry[i].request.url);
    }
    assert_ne!(first.id, second.id);
}

#[test]
fn random_ids_differ_across_sessions() {
    let config = BundleConfig {
        id_strategy: IdStrategy::Random,
        ..Default::default()
    };
    let first = assembled(config.clone());
    let second = assembled(config);
    assert_ne!(first.entry[0].request.url, second.entry[0].request.url);
}

#[test]
fn assemble_without_records_fails() {
    let mut agg = ImagingStudyAggregator::new(BundleConfig::default()).unwrap();
    assert!(matches!(agg.assemble(), Err(RadFhirError::NoRecordsIngested)));
}
