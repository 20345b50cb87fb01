use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use super::{Frame, Widget, WidgetWrapper};
use crate::fonts::{self, Font};
use crate::sensors::{self, Sensor, CATALOG};
use crate::{Error, Options};

/// Text rows for every sensor discovered at startup, stacked downwards from
/// the configured position and refreshed by a background polling thread.
///
/// Readings are published as one snapshot per poll cycle, so a draw shows
/// either all values of a cycle or none of them, whoever requested it.
pub struct SensorHub {
    font: Font,
    sensors: Arc<[Sensor]>,
    values: Arc<Mutex<Vec<String>>>,
    interval: Duration,
    wrapper: WidgetWrapper,
}

fn lock(values: &Mutex<Vec<String>>) -> MutexGuard<'_, Vec<String>> {
    values.lock().unwrap_or_else(|poisoned| {
        log::warn!("Sensor values mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl SensorHub {
    pub const COMPONENT: &'static str = "SensorHub";
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

    pub fn new(options: &Options, wrapper: WidgetWrapper) -> Result<Self, Error> {
        let node = options.node(Self::COMPONENT, "sensors")?;

        let font = node.font()?;
        let mut position = node.position()?;
        let interval = node
            .find::<u64>("interval_ms", "interval_ms", "Reading poll interval failed")?
            .map(Duration::from_millis)
            .unwrap_or(Self::DEFAULT_INTERVAL);
        let root = node
            .find::<PathBuf>("root", "root", "Reading sensors root failed")?
            .unwrap_or_else(|| PathBuf::from(sensors::SENSORS_ROOT));

        let mut found = Vec::new();
        for descriptor in sensors::discover(&root, CATALOG) {
            let color = match node.color(&descriptor.module)? {
                Some(color) => color,
                None => {
                    log::warn!("No color configured for {}, using white", descriptor.module);
                    Rgb888::WHITE
                }
            };
            log::info!("Showing {} at {}, {}", descriptor, position.x, position.y);
            found.push(Sensor::new(descriptor, position, color));
            position.y += fonts::height(font);
        }

        Ok(Self {
            font,
            values: Arc::new(Mutex::new(vec![sensors::NO_VALUE.to_string(); found.len()])),
            sensors: found.into(),
            interval,
            wrapper,
        })
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// The formatted readings of the last completed poll cycle, in sensor
    /// order.
    pub fn values(&self) -> Vec<String> {
        lock(&self.values).clone()
    }

    /// Spawns the detached polling thread. It reads every sensor, requests a
    /// redraw and sleeps for the poll interval, until the render side shuts
    /// down.
    pub fn start(&self) -> Result<(), Error> {
        let sensors = self.sensors.clone();
        let values = self.values.clone();
        let wrapper = self.wrapper.clone();
        let interval = self.interval;

        std::thread::Builder::new()
            .name("sensor-poll".to_string())
            .spawn(move || poll(&sensors, &values, &wrapper, interval))?;
        Ok(())
    }
}

/// Reads every sensor into a copy of the current values and swaps it in once
/// all reads are done. Failed reads keep their previous value.
fn read_all(sensors: &[Sensor], values: &Mutex<Vec<String>>) {
    let mut staged = lock(values).clone();
    for (sensor, value) in sensors.iter().zip(staged.iter_mut()) {
        if let Some(read) = sensor.read() {
            *value = read;
        }
    }
    *lock(values) = staged;
}

fn poll(
    sensors: &[Sensor],
    values: &Mutex<Vec<String>>,
    wrapper: &WidgetWrapper,
    interval: Duration,
) {
    log::info!("Polling {} sensors every {:?}", sensors.len(), interval);
    loop {
        read_all(sensors, values);
        if !wrapper.request_update() {
            break;
        }
        std::thread::sleep(interval);
    }
    log::info!("Sensor polling stopped");
}

impl std::fmt::Display for SensorHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SensorHub")
    }
}

impl std::fmt::Debug for SensorHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorHub")
            .field("sensors", &self.sensors)
            .field("interval", &self.interval)
            .finish()
    }
}

impl Widget for SensorHub {
    fn draw(&self, frame: &mut Frame) {
        let values = lock(&self.values);
        for (sensor, value) in self.sensors.iter().zip(values.iter()) {
            frame.draw_text(
                value,
                self.font,
                sensor.position(),
                sensor.color(),
            );
        }
    }

    fn request_update(&self) {
        self.wrapper.request_update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{tests::fake_device, SensorKind};
    use crate::widgets::MainWidget;

    use embedded_graphics::prelude::*;
    use std::path::Path;

    fn options(root: &Path, sensors: &str) -> Options {
        Options::from_yaml(
            &format!("sensors:\n  root: {}\n{}", root.display(), sensors),
            ".",
        )
    }

    const LAYOUT: &str = "  font: 6x12\n  position: [10, 20]\n  interval_ms: 10\n  1-0040: [0, 255, 255]\n";

    #[test]
    fn test_stacks_by_font_height() {
        let root = tempfile::tempdir().unwrap();
        fake_device(
            root.path(),
            "iio:device0",
            "1-0040",
            &[("in_humidityrelative_raw", "41"), ("in_temp_raw", "22")],
        );

        let main = MainWidget::new(Rgb888::BLACK);
        let hub = SensorHub::new(&options(root.path(), LAYOUT), main.wrapper()).unwrap();

        let sensors = hub.sensors();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].descriptor().kind, SensorKind::Humidity);
        assert_eq!(sensors[0].position(), Point::new(10, 20));
        assert_eq!(sensors[1].descriptor().kind, SensorKind::Temperature);
        assert_eq!(sensors[1].position(), Point::new(10, 32));
        assert_eq!(sensors[1].color(), Rgb888::new(0, 255, 255));
    }

    #[test]
    fn test_missing_node() {
        let main = MainWidget::new(Rgb888::BLACK);
        let options = Options::from_yaml("clock: {}", ".");
        let err = SensorHub::new(&options, main.wrapper()).unwrap_err();
        assert_eq!(err.field(), Some("node"));
        assert_eq!(err.to_string(), "SensorHub -> Configuration node not found");
    }

    #[test]
    fn test_missing_fields_are_distinct() {
        let root = tempfile::tempdir().unwrap();
        let main = MainWidget::new(Rgb888::BLACK);

        let no_position = options(root.path(), "  font: 6x12\n");
        let err = SensorHub::new(&no_position, main.wrapper()).unwrap_err();
        assert_eq!(err.field(), Some("position"));
        assert_eq!(err.to_string(), "SensorHub -> Reading position failed");

        let no_font = options(root.path(), "  position: [0, 0]\n");
        let err = SensorHub::new(&no_font, main.wrapper()).unwrap_err();
        assert_eq!(err.field(), Some("font"));

        let bad_font = options(root.path(), "  font: hoog32.bdf\n  position: [0, 0]\n");
        let err = SensorHub::new(&bad_font, main.wrapper()).unwrap_err();
        assert_eq!(err.field(), Some("font"));
        assert!(err.to_string().starts_with("SensorHub -> Couldn't load font"));

        let bad_position = options(root.path(), "  font: 6x12\n  position: [a, 0]\n");
        let err = SensorHub::new(&bad_position, main.wrapper()).unwrap_err();
        assert_eq!(err.field(), Some("position"));
    }

    #[test]
    fn test_bad_color_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), "iio:device0", "bh1750", &[("in_illuminance_raw", "120")]);
        let main = MainWidget::new(Rgb888::BLACK);

        let yaml = "  font: 6x12\n  position: [0, 0]\n  bh1750: [0, 0]\n";
        let err = SensorHub::new(&options(root.path(), yaml), main.wrapper()).unwrap_err();
        assert_eq!(err.field(), Some("color"));
    }

    #[test]
    fn test_missing_color_defaults_to_white() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), "iio:device0", "bh1750", &[("in_illuminance_raw", "120")]);
        let main = MainWidget::new(Rgb888::BLACK);

        let hub = SensorHub::new(&options(root.path(), LAYOUT), main.wrapper()).unwrap();
        assert_eq!(hub.sensors().len(), 1);
        assert_eq!(hub.sensors()[0].color(), Rgb888::WHITE);
    }

    #[test]
    fn test_polling_feeds_the_render_loop() {
        let root = tempfile::tempdir().unwrap();
        let device = fake_device(
            root.path(),
            "iio:device0",
            "1-0040",
            &[("in_humidityrelative_raw", "41"), ("in_temp_raw", "22")],
        );

        let main = MainWidget::new(Rgb888::BLACK);
        let hub = SensorHub::new(&options(root.path(), LAYOUT), main.wrapper()).unwrap();
        hub.start().unwrap();
        let sync = main.sync().clone();

        // the first signal only comes after the first full read
        let mut frame = Frame::new(Size::new(64, 64));
        let first = sync
            .draw(|| {
                hub.draw(&mut frame);
                hub.values().remove(1)
            })
            .unwrap();
        assert_eq!(first, "22 C");
        assert!(frame.pixels().any(|Pixel(_, c)| c == Rgb888::new(0, 255, 255)));

        std::fs::write(device.join("in_temp_raw"), "23\n").unwrap();
        let mut value = first;
        for _ in 0..100 {
            value = sync.draw(|| hub.values().remove(1)).unwrap();
            if value == "23 C" {
                break;
            }
        }
        assert_eq!(value, "23 C");
        assert_eq!(hub.values()[0], "41 %H");

        main.shutdown();
    }

    #[test]
    fn test_clock_ticks_never_show_a_partial_cycle() {
        use crate::widgets::Clock;
        use nix::{sys::stat::Mode, unistd::mkfifo};
        use std::os::unix::fs::OpenOptionsExt;

        let root = tempfile::tempdir().unwrap();
        let device = fake_device(
            root.path(),
            "iio:device0",
            "1-0040",
            &[("in_humidityrelative_raw", "41")],
        );
        let yaml = format!(
            "clock:\n  font: 6x10\n  position: [0, 40]\n  color: [255, 0, 0]\nsensors:\n  root: {}\n{}",
            root.path().display(),
            LAYOUT
        );
        let options = Options::from_yaml(&yaml, ".");

        let main = MainWidget::new(Rgb888::BLACK);
        let clock = Clock::new(&options, main.wrapper()).unwrap();
        let hub = SensorHub::new(&options, main.wrapper()).unwrap();
        hub.start().unwrap();
        let sync = main.sync().clone();

        let first = sync.draw(|| hub.values()).unwrap();
        assert_eq!(first, vec!["41 %H", "--"]);

        // opening the temperature attribute now blocks until a writer shows
        // up, so the poll cycle that read the new humidity never finishes
        let fifo = device.join("in_temp_raw");
        mkfifo(&fifo, Mode::S_IRWXU).unwrap();
        std::fs::write(device.join("in_humidityrelative_raw"), "42\n").unwrap();
        std::thread::sleep(Duration::from_millis(200));

        clock.start_ticking().unwrap();
        for _ in 0..2 {
            let seen = sync.draw(|| hub.values()).unwrap();
            assert_eq!(seen, vec!["41 %H", "--"]);
        }

        main.shutdown();
        // let the stalled open return
        let _ = std::fs::OpenOptions::new()
            .write(true)
            .custom_flags(nix::fcntl::OFlag::O_NONBLOCK.bits())
            .open(&fifo);
    }
}
