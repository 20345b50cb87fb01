use embedded_graphics::{
    pixelcolor::{BinaryColor, Rgb888},
    prelude::*,
};
use embedded_hal::i2c::{ErrorKind, Operation, SevenBitAddress};
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use i2c_linux::I2c;

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::{Error, Frame, MatrixOptions};

/// The display the render loop swaps finished frames onto.
pub trait Matrix {
    fn create_frame_canvas(&mut self) -> Frame;

    /// Shows `frame` and hands back a buffer to compose the next one into.
    fn swap_on_vsync(&mut self, frame: Frame) -> Result<Frame, Error>;

    fn clear(&mut self) -> Result<(), Error>;
}

/// Opens the panel on the configured I2C device, or a headless matrix when
/// there is none.
pub fn open(options: &MatrixOptions) -> Result<Box<dyn Matrix>, Error> {
    match &options.device {
        Some(device) => {
            log::info!("Opening display on {}", device.display());
            Ok(Box::new(Ssd1306Matrix::new_from_device_path(device, options)?))
        }
        None => {
            log::info!("No display device configured, rendering headless");
            Ok(Box::new(HeadlessMatrix::new(options)))
        }
    }
}

type Display =
    Ssd1306<I2CInterface<I2cBus>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// A Linux `/dev/i2c-*` character device driven through the embedded-hal I2C
/// trait the panel driver expects. Only writes are supported.
struct I2cBus(I2c<File>);

impl I2cBus {
    fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self(I2c::from_path(path)?))
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::IOError(e) if e.kind() != std::io::ErrorKind::Unsupported => ErrorKind::Bus,
            Self::Errno(_) => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

impl embedded_hal::i2c::ErrorType for I2cBus {
    type Error = Error;
}

impl embedded_hal::i2c::I2c<SevenBitAddress> for I2cBus {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        self.0.smbus_set_slave_address(address.into(), false)?;
        for op in operations {
            match op {
                Operation::Write(bytes) => self.0.write_all(bytes)?,
                // the panel is write only
                Operation::Read(_) => {
                    return Err(std::io::Error::from(std::io::ErrorKind::Unsupported).into())
                }
            }
        }
        Ok(())
    }
}

/// A monochrome SSD1306 OLED. Pixels bright enough are lit, the rest stay
/// dark. The whole picture drifts by a few pixels over time against burn-in.
pub struct Ssd1306Matrix {
    display: Display,
    size: Size,
}

impl Ssd1306Matrix {
    pub const BURNIN_OFFSET_MAX: u64 = 5;
    pub const LUMA_THRESHOLD: u32 = 64;

    pub fn new_from_device_path(path: &Path, options: &MatrixOptions) -> Result<Self, Error> {
        let mut display = Ssd1306::new(
            I2CDisplayInterface::new(I2cBus::open(path)?),
            DisplaySize128x64,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();
        display.init()?;
        display.set_display_on(true)?;
        display.set_brightness(brightness(options.brightness))?;

        Ok(Self {
            display,
            size: options.frame_size(),
        })
    }

    fn burn_in_offset() -> Point {
        let tick = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|epoch| epoch.as_secs())
            .unwrap_or(0);
        Point::new(
            (tick / 17 % Self::BURNIN_OFFSET_MAX) as i32,
            (tick / 11 % Self::BURNIN_OFFSET_MAX) as i32,
        )
    }
}

fn brightness(percent: u8) -> Brightness {
    match percent {
        0..=20 => Brightness::DIMMEST,
        21..=40 => Brightness::DIM,
        41..=60 => Brightness::NORMAL,
        61..=80 => Brightness::BRIGHT,
        _ => Brightness::BRIGHTEST,
    }
}

fn is_lit(color: Rgb888) -> bool {
    let luma = (color.r() as u32 * 77 + color.g() as u32 * 150 + color.b() as u32 * 29) >> 8;
    luma >= Ssd1306Matrix::LUMA_THRESHOLD
}

impl Matrix for Ssd1306Matrix {
    fn create_frame_canvas(&mut self) -> Frame {
        Frame::new(self.size)
    }

    fn swap_on_vsync(&mut self, frame: Frame) -> Result<Frame, Error> {
        let offset = Self::burn_in_offset();

        self.display.clear_buffer();
        self.display.draw_iter(
            frame
                .pixels()
                .filter(|Pixel(_, color)| is_lit(*color))
                .map(|Pixel(point, _)| Pixel(point + offset, BinaryColor::On)),
        )?;
        self.display.flush()?;
        Ok(frame)
    }

    fn clear(&mut self) -> Result<(), Error> {
        self.display.clear_buffer();
        self.display.flush()?;
        Ok(())
    }
}

impl Drop for Ssd1306Matrix {
    fn drop(&mut self) {
        // turn off on shut down
        if let Err(e) = self.display.set_display_on(false) {
            log::error!("Could not switch display off: {:?}", e);
        }
    }
}

/// Stand-in for a panel when running without hardware. Swaps take one
/// nominal refresh period.
#[derive(Debug)]
pub struct HeadlessMatrix {
    size: Size,
    swaps: u64,
}

impl HeadlessMatrix {
    pub const REFRESH_PERIOD: Duration = Duration::from_millis(16);

    pub fn new(options: &MatrixOptions) -> Self {
        Self {
            size: options.frame_size(),
            swaps: 0,
        }
    }
}

impl Matrix for HeadlessMatrix {
    fn create_frame_canvas(&mut self) -> Frame {
        Frame::new(self.size)
    }

    fn swap_on_vsync(&mut self, frame: Frame) -> Result<Frame, Error> {
        self.swaps += 1;
        log::trace!(
            "Frame {}: {} pixels lit",
            self.swaps,
            frame.pixels().filter(|Pixel(_, c)| *c != Rgb888::BLACK).count()
        );
        std::thread::sleep(Self::REFRESH_PERIOD);
        Ok(frame)
    }

    fn clear(&mut self) -> Result<(), Error> {
        log::trace!("Cleared after {} frames", self.swaps);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> MatrixOptions {
        MatrixOptions {
            rows: 16,
            cols: 32,
            chain: 2,
            brightness: 50,
            device: None,
        }
    }

    #[test]
    fn test_headless_frame_size() {
        let mut matrix = open(&options()).unwrap();
        let frame = matrix.create_frame_canvas();
        assert_eq!(frame.size(), Size::new(64, 16));

        let frame = matrix.swap_on_vsync(frame).unwrap();
        assert_eq!(frame.size(), Size::new(64, 16));
        matrix.clear().unwrap();
    }

    #[test]
    fn test_luma_threshold() {
        assert!(is_lit(Rgb888::WHITE));
        assert!(is_lit(Rgb888::new(255, 255, 0)));
        assert!(!is_lit(Rgb888::BLACK));
        assert!(!is_lit(Rgb888::new(40, 20, 10)));
    }

    #[test]
    fn test_bus_error_kinds() {
        use embedded_hal::i2c::Error as _;

        let unsupported: Error = std::io::Error::from(std::io::ErrorKind::Unsupported).into();
        assert_eq!(unsupported.kind(), ErrorKind::Other);
        let broken: Error = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert_eq!(broken.kind(), ErrorKind::Bus);
        assert_eq!(Error::invalid_argument("Matrix", "device", "x").kind(), ErrorKind::Other);
    }

    #[test]
    fn test_missing_device() {
        let mut options = options();
        options.device = Some("/nonexistent/i2c-9".into());
        assert!(matches!(open(&options), Err(Error::IOError(_))));
    }
}
