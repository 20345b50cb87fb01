use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Mutex, MutexGuard};

use embedded_graphics::{pixelcolor::Rgb888, prelude::*};

use super::SensorDescriptor;

/// Shown until a sensor has been read successfully once.
pub const NO_VALUE: &str = "--";

/// One sensor attribute kept open for repeated reads. Only the polling worker
/// touches the handle.
#[derive(Debug)]
pub struct Sensor {
    descriptor: SensorDescriptor,
    position: Point,
    color: Rgb888,
    handle: Mutex<Option<File>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Sensor mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl Sensor {
    pub fn new(descriptor: SensorDescriptor, position: Point, color: Rgb888) -> Self {
        let handle = File::open(descriptor.value_path())
            .map_err(|e| {
                log::warn!(
                    "Could not open {}, retrying on next poll: {}",
                    descriptor.value_path().display(),
                    e
                )
            })
            .ok();

        Self {
            descriptor,
            position,
            color,
            handle: Mutex::new(handle),
        }
    }

    pub fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn color(&self) -> Rgb888 {
        self.color
    }

    /// Reads the current value, formatted with its unit. On failure the
    /// handle is reopened for the next poll and `None` is returned, so the
    /// caller keeps showing the previous value.
    pub fn read(&self) -> Option<String> {
        let mut handle = lock(&self.handle);

        match read_token(handle.as_mut()) {
            Ok(raw) => Some(format!("{}{}", raw, self.descriptor.kind.unit())),
            Err(e) => {
                log::warn!("Read failed for {}: {}", self.descriptor, e);
                *handle = None;
                match File::open(self.descriptor.value_path()) {
                    Ok(file) => *handle = Some(file),
                    Err(e) => log::error!(
                        "Retry open failed for {}: {}",
                        self.descriptor.value_path().display(),
                        e
                    ),
                }
                None
            }
        }
    }
}

/// Reads the first whitespace separated token and rewinds, so the next read
/// sees the attribute's then current value without reopening the file.
fn read_token(handle: Option<&mut File>) -> io::Result<String> {
    let file = handle.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not open"))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    file.seek(SeekFrom::Start(0))?;

    contents
        .split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "empty read"))
}
