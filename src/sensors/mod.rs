//! Industrial I/O sensors exposed by the kernel under sysfs.
//!
//! It is assumed the sensors are already bound to their iio drivers; this
//! module only finds them and reads their attribute files.

use std::path::{Path, PathBuf};

mod sensor;

pub use self::sensor::{Sensor, NO_VALUE};

pub const SENSORS_ROOT: &str = "/sys/bus/iio/devices";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Temperature,
    Humidity,
    Luminosity,
    Pressure,
}

impl SensorKind {
    /// Suffix appended to the raw reading when it is displayed.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => " C",
            Self::Humidity => " %H",
            Self::Luminosity => " lux",
            Self::Pressure => " hPa",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Temperature => "temperature",
                Self::Humidity => "humidity",
                Self::Luminosity => "luminosity",
                Self::Pressure => "pressure",
            }
        )
    }
}

/// A sensor we know how to read: the iio device name the driver reports, what
/// it measures and which attribute file holds the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub module: &'static str,
    pub kind: SensorKind,
    pub attribute: &'static str,
}

pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        module: "bh1750",
        kind: SensorKind::Luminosity,
        attribute: "in_illuminance_raw",
    },
    CatalogEntry {
        module: "bmp280",
        kind: SensorKind::Pressure,
        attribute: "in_pressure_input",
    },
    CatalogEntry {
        module: "bmp280",
        kind: SensorKind::Temperature,
        attribute: "in_temp_input",
    },
    CatalogEntry {
        module: "1-0040",
        kind: SensorKind::Humidity,
        attribute: "in_humidityrelative_raw",
    },
    CatalogEntry {
        module: "1-0040",
        kind: SensorKind::Temperature,
        attribute: "in_temp_raw",
    },
];

/// A catalog entry bound to the device directory it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDescriptor {
    pub module: String,
    pub kind: SensorKind,
    pub attribute: String,
    pub device: PathBuf,
}

impl SensorDescriptor {
    pub fn value_path(&self) -> PathBuf {
        self.device.join(&self.attribute)
    }
}

impl std::fmt::Display for SensorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.module, self.kind)
    }
}

/// Scans `root` for devices and returns a descriptor for every catalog entry
/// whose module matches a device's name. Devices are visited in path order;
/// ones without a readable name are skipped.
pub fn discover(root: &Path, catalog: &[CatalogEntry]) -> Vec<SensorDescriptor> {
    let mut devices: Vec<PathBuf> = match root.read_dir() {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(e) => {
            log::warn!("Could not scan {} for sensors: {}", root.display(), e);
            return Vec::new();
        }
    };
    devices.sort();

    let mut found = Vec::new();
    for device in devices {
        let name = match device_name(&device) {
            Some(name) => name,
            None => {
                log::debug!("Skipping {}: no device name", device.display());
                continue;
            }
        };
        log::info!("Found device {} at {}", name, device.display());

        found.extend(
            catalog
                .iter()
                .filter(|entry| entry.module == name)
                .map(|entry| SensorDescriptor {
                    module: name.clone(),
                    kind: entry.kind,
                    attribute: entry.attribute.to_string(),
                    device: device.clone(),
                }),
        );
    }
    found
}

fn device_name(device: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(device.join("name")).ok()?;
    contents.split_whitespace().next().map(str::to_string)
}
