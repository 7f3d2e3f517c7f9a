//! 采集设备资源构建

use radfhir_core::utils::non_blank;
use radfhir_core::{Device, DeviceName, DeviceNameType, DeviceVersion, Reference};
use radfhir_dicom::DicomRecord;

/// 从首条记录构建设备
pub fn build_device(record: &DicomRecord, id: String) -> Device {
    let text = |value: &Option<String>| non_blank(value.as_deref()).map(str::to_string);

    let device_name = [
        (&record.manufacturer_model_name, DeviceNameType::ModelName),
        (&record.station_name, DeviceNameType::UserFriendlyName),
    ]
    .into_iter()
    .filter_map(|(value, type_)| text(value).map(|name| DeviceName { name, type_ }))
    .collect();

    let version = record
        .software_versions
        .iter()
        .filter_map(|v| non_blank(Some(v.as_str())))
        .map(|value| DeviceVersion {
            value: value.to_string(),
        })
        .collect();

    Device {
        id,
        manufacturer: text(&record.manufacturer),
        serial_number: text(&record.device_serial_number),
        device_name,
        version,
        owner: text(&record.institution_name).map(Reference::display),
    }
}
