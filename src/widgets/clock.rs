use std::time::{Duration, SystemTime};

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use embedded_graphics::{pixelcolor::Rgb888, prelude::*};

use super::{Frame, Widget, WidgetWrapper};
use crate::fonts::Font;
use crate::{Error, Options};

/// Wall clock text. The time is formatted on every draw, so it never shows
/// stale data no matter how the render loop is paced.
pub struct Clock {
    font: Font,
    position: Point,
    color: Rgb888,
    format: String,
    wrapper: WidgetWrapper,
}

impl Clock {
    pub const COMPONENT: &'static str = "Clock";
    pub const DEFAULT_FORMAT: &'static str = "%H:%M";

    pub fn new(options: &Options, wrapper: WidgetWrapper) -> Result<Self, Error> {
        let node = options.node(Self::COMPONENT, "clock")?;

        let font = node.font()?;
        let position = node.position()?;
        let color = node.color("color")?.ok_or_else(|| {
            Error::invalid_argument(Self::COMPONENT, "color", "Reading color failed")
        })?;
        let format = node
            .find::<String>("format", "format", "Reading time format failed")?
            .unwrap_or_else(|| Self::DEFAULT_FORMAT.to_string());

        // chrono panics while rendering an invalid format, so reject it here
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::invalid_argument(
                Self::COMPONENT,
                "format",
                format!("Invalid time format '{}'", format),
            ));
        }

        Ok(Self {
            font,
            position,
            color,
            format,
            wrapper,
        })
    }

    pub fn text(&self) -> String {
        Local::now().format(&self.format).to_string()
    }

    /// Spawns a detached thread requesting a redraw at every full second, so
    /// the display keeps moving even with no other producer configured.
    pub fn start_ticking(&self) -> Result<(), Error> {
        let wrapper = self.wrapper.clone();
        std::thread::Builder::new()
            .name("clock-tick".to_string())
            .spawn(move || loop {
                std::thread::sleep(until_next_second());
                if !wrapper.request_update() {
                    log::info!("Clock ticking stopped");
                    break;
                }
            })?;
        Ok(())
    }
}

fn until_next_second() -> Duration {
    let subsec = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|epoch| epoch.subsec_nanos())
        .unwrap_or(0);
    Duration::from_secs(1) - Duration::from_nanos(subsec.into())
}

impl std::fmt::Display for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Clock({})", self.format)
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("position", &self.position)
            .field("color", &self.color)
            .field("format", &self.format)
            .finish()
    }
}

impl Widget for Clock {
    fn draw(&self, frame: &mut Frame) {
        frame.draw_text(&self.text(), self.font, self.position, self.color);
    }

    fn request_update(&self) {
        self.wrapper.request_update();
    }
}
