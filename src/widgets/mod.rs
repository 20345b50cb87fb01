use std::sync::{Arc, Weak};

use embedded_graphics::pixelcolor::Rgb888;

pub use crate::{Frame, FrameSync};

pub trait Widget: std::fmt::Debug + std::fmt::Display {
    /// Renders the current cached state. Never blocks on I/O.
    fn draw(&self, frame: &mut Frame);

    /// Tells the render loop that new data is ready to be shown.
    fn request_update(&self);
}

/// Lets a leaf widget (or its background worker) ask for a redraw without
/// knowing who paces the render loop. Holds only a weak reference, so it
/// never keeps the sync alive on its own.
#[derive(Debug, Clone)]
pub struct WidgetWrapper {
    target: Weak<FrameSync>,
}

impl WidgetWrapper {
    pub fn new(target: &Arc<FrameSync>) -> Self {
        Self {
            target: Arc::downgrade(target),
        }
    }

    /// Returns `false` once the render side is gone or shutting down.
    pub fn request_update(&self) -> bool {
        match self.target.upgrade() {
            Some(sync) => sync.request_update(),
            None => false,
        }
    }
}

/// The root of the widget tree. Owns its children and draws all of them in
/// one pass each time an update was requested.
#[derive(Debug)]
pub struct MainWidget {
    sync: Arc<FrameSync>,
    background: Rgb888,
    widgets: Vec<Box<dyn Widget>>,
}

impl MainWidget {
    pub fn new(background: Rgb888) -> Self {
        Self {
            sync: Arc::new(FrameSync::new()),
            background,
            widgets: Vec::new(),
        }
    }

    pub fn add_widget(&mut self, widget: Box<dyn Widget>) {
        log::info!("Registered widget {}", widget);
        self.widgets.push(widget);
    }

    pub fn add_widgets(&mut self, widgets: Vec<Box<dyn Widget>>) {
        for widget in widgets {
            self.add_widget(widget);
        }
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn wrapper(&self) -> WidgetWrapper {
        WidgetWrapper::new(&self.sync)
    }

    pub fn sync(&self) -> &Arc<FrameSync> {
        &self.sync
    }

    /// Waits for an update request, then redraws every child into `frame`.
    /// Returns `false` without touching the frame once shutdown started.
    pub fn draw_frame(&self, frame: &mut Frame) -> bool {
        self.sync
            .draw(|| {
                frame.fill(self.background);
                for widget in &self.widgets {
                    widget.draw(frame);
                }
            })
            .is_some()
    }

    pub fn shutdown(&self) {
        self.sync.close();
    }
}

impl std::fmt::Display for MainWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MainWidget")
    }
}

impl Widget for MainWidget {
    fn draw(&self, frame: &mut Frame) {
        self.draw_frame(frame);
    }

    // composites only aggregate drawing, they never originate updates
    fn request_update(&self) {}
}

mod clock;
mod sensor_hub;

pub use self::clock::Clock;
pub use self::sensor_hub::SensorHub;
