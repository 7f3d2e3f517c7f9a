//! RadFHIR 命令行程序
//!
//! 读取目录中同一检查的 DICOM 文件，聚合后把事务 Bundle 以 JSON 输出到 stdout。
//! 日志写到 stderr。

use anyhow::{bail, Context, Result};
use clap::Parser;
use radfhir_bundle::{BundleConfig, ImagingStudyAggregator, IngestOutcome};
use radfhir_dicom::{DicomRecordReader, RecordValidator};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "radfhir")]
#[command(about = "把一个检查的 DICOM 文件聚合为 FHIR ImagingStudy 事务 Bundle")]
struct Args {
    /// DICOM 文件目录
    dir: PathBuf,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 在系列下输出逐实例明细
    #[arg(long)]
    instances: bool,

    /// 不派生体重/身高观察值
    #[arg(long)]
    no_measurements: bool,

    /// 跳过校验出错的记录
    #[arg(long)]
    strict: bool,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = BundleConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.instances {
        config.include_instance_detail = true;
    }
    if args.no_measurements {
        config.include_derived_measurements = false;
    }

    let files = DicomRecordReader::list_files(&args.dir)
        .with_context(|| format!("Failed to list {}", args.dir.display()))?;
    info!("Found {} files in {}", files.len(), args.dir.display());

    let validator = RecordValidator::new();
    let mut aggregator = ImagingStudyAggregator::new(config)?;
    let mut skipped = 0usize;

    for path in &files {
        let source = path.display().to_string();
        let record = match DicomRecordReader::read_file(path) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping {}: {}", source, e);
                skipped += 1;
                continue;
            }
        };

        let validation = validator.validate(&record);
        validation.log(&source);
        if args.strict && validation.has_errors() {
            warn!("Skipping {} in strict mode: {}", source, validation.summary());
            skipped += 1;
            continue;
        }

        match aggregator.ingest(&record) {
            Ok(IngestOutcome::DuplicateInstance) => skipped += 1,
            Ok(_) => {}
            Err(e) => {
                error!("Rejected {}: {}", source, e);
                skipped += 1;
            }
        }
    }

    let stats = aggregator.stats();
    if stats.records_ingested == 0 {
        bail!("No DICOM records ingested from {}", args.dir.display());
    }

    let bundle = aggregator.assemble().context("Failed to assemble bundle")?;
    println!("{}", bundle.to_json_pretty()?);

    info!(
        "Bundle {}: {} series, {} instances, {} entries, {} files skipped",
        bundle.id,
        stats.series,
        stats.instances,
        bundle.entry.len(),
        skipped
    );
    Ok(())
}
