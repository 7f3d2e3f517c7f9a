//! 聚合演示程序
//!
//! 用内存中构造的记录模拟一次 CT + MR 检查，展示聚合、去重与 Bundle 组装

use radfhir::dicom::{CodeItem, DicomRecord};
use radfhir::{BundleConfig, ImagingStudyAggregator, IngestOutcome};

fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🏥 RadFHIR 聚合演示");
    println!("================================");

    let config = BundleConfig {
        include_instance_detail: true,
        source_timezone: "+08:00".to_string(),
        ..Default::default()
    };
    let mut aggregator = ImagingStudyAggregator::new(config)?;

    println!("\n📥 接收记录...");
    for record in demo_records() {
        let outcome = aggregator.ingest(&record)?;
        let marker = match outcome {
            IngestOutcome::Created => "🆕",
            IngestOutcome::Added => "➕",
            IngestOutcome::DuplicateInstance => "♻️",
        };
        println!("  {} {}", marker, record.summary());
    }

    let stats = aggregator.stats();
    println!("\n📊 统计");
    println!("  记录数: {}", stats.records_ingested);
    println!("  重复实例: {}", stats.duplicate_instances);
    println!("  系列数: {}", stats.series);
    println!("  实例数: {}", stats.instances);

    println!("\n📦 组装事务 Bundle...");
    let bundle = aggregator.assemble()?;
    for entry in &bundle.entry {
        println!("  {:?} {}", entry.request.method, entry.request.url);
    }

    println!("\n{}", bundle.to_json_pretty()?);
    Ok(())
}

fn demo_records() -> Vec<DicomRecord> {
    let base = DicomRecord {
        study_instance_uid: Some("1.2.826.0.1.3680043.8.498.10".to_string()),
        accession_number: Some("ACC-2024-0042".to_string()),
        study_description: Some("Chest CT with contrast".to_string()),
        study_date: Some("20240611".to_string()),
        study_time: Some("083015".to_string()),
        procedure_codes: vec![CodeItem::new("CTCHESTC", "LOCAL", "CT Chest w/ contrast")],
        reason_text: Some("Persistent cough".to_string()),
        sop_class_uid: Some("1.2.840.10008.5.1.4.1.1.2".to_string()),
        image_type: vec!["ORIGINAL".to_string(), "PRIMARY".to_string(), "AXIAL".to_string()],
        patient_id: Some("MRN-001234".to_string()),
        issuer_of_patient_id: Some("General Hospital".to_string()),
        patient_name: Some("Zhang^Wei".to_string()),
        patient_sex: Some("M".to_string()),
        patient_birth_date: Some("19750402".to_string()),
        patient_weight: Some("70.5".to_string()),
        patient_size: Some("1.76".to_string()),
        manufacturer: Some("ACME Medical".to_string()),
        manufacturer_model_name: Some("Scanner 3000".to_string()),
        station_name: Some("CT01".to_string()),
        institution_name: Some("General Hospital".to_string()),
        ..Default::default()
    };

    let instance = |series: &str, number: u32, modality: &str, body_part: &str| DicomRecord {
        series_instance_uid: Some(format!("{}.{}", "1.2.826.0.1.3680043.8.498.10", series)),
        series_number: Some(series.to_string()),
        sop_instance_uid: Some(format!("1.2.826.0.1.3680043.8.498.10.{}.{}", series, number)),
        instance_number: Some(number.to_string()),
        modality: Some(modality.to_string()),
        body_part_examined: Some(body_part.to_string()),
        ..base.clone()
    };

    vec![
        instance("1", 1, "CT", "CHEST"),
        instance("1", 2, "CT", "CHEST"),
        instance("2", 1, "CT", "CHEST"),
        // 重复发送的实例
        instance("1", 2, "CT", "CHEST"),
        instance("3", 1, "MR", "HEAD"),
    ]
}
