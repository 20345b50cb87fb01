//! Drives a pixel display from independent widgets: a clock and readouts of
//! the iio sensors found under sysfs. Sensors are polled on a background
//! thread which hands every fresh set of values to the render loop through a
//! single-slot [`FrameSync`].

pub mod error;
pub mod fonts;
pub mod frame;
pub mod matrix;
pub mod options;
pub mod render;
pub mod sensors;
pub mod sync;
pub mod widgets;

pub use error::Error;
pub use frame::Frame;
pub use options::{MatrixOptions, Options};
pub use sync::FrameSync;
