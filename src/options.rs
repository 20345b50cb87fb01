use std::path::{Path, PathBuf};

use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::fonts::{self, Font};
use crate::Error;

/// The parsed configuration document. Built once at startup and only ever
/// read afterwards.
#[derive(Debug, Clone)]
pub struct Options {
    figment: Figment,
    config_dir: PathBuf,
}

/// Hardware parameters of the display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatrixOptions {
    pub rows: u32,
    pub cols: u32,
    pub chain: u32,
    pub brightness: u8,
    #[serde(default)]
    pub device: Option<PathBuf>,
}

impl MatrixOptions {
    pub fn frame_size(&self) -> Size {
        Size::new(self.cols * self.chain, self.rows)
    }

    fn validate(self) -> Result<Self, Error> {
        if self.rows == 0 || self.cols == 0 || self.chain == 0 {
            return Err(Error::invalid_argument(
                "Matrix",
                "matrix",
                "Rows, cols and chain must be positive",
            ));
        }
        if !(1..=100).contains(&self.brightness) {
            return Err(Error::invalid_argument(
                "Matrix",
                "brightness",
                "Brightness is outside usable range",
            ));
        }
        Ok(self)
    }
}

impl Options {
    pub const ENV_PREFIX: &'static str = "PICLOCK_";

    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_argument(
                "Options",
                "config",
                format!("Could not read {}: {}", path.display(), e),
            )
        })?;
        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let figment = Figment::from(Yaml::string(&contents))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));

        // surface syntax errors now rather than on first lookup
        figment.extract::<figment::value::Dict>().map_err(|e| {
            Error::invalid_argument(
                "Options",
                "config",
                format!("Could not parse {}: {}", path.display(), e),
            )
        })?;

        Ok(Self { figment, config_dir })
    }

    /// Parses a document without environment overrides.
    pub fn from_yaml(yaml: &str, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            figment: Figment::from(Yaml::string(yaml)),
            config_dir: config_dir.into(),
        }
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.figment.contains(name)
    }

    pub fn node(&self, component: &'static str, name: &str) -> Result<Node<'_>, Error> {
        if !self.has_node(name) {
            return Err(Error::invalid_argument(
                component,
                "node",
                "Configuration node not found",
            ));
        }
        Ok(Node {
            options: self,
            component,
            name: name.to_string(),
        })
    }

    pub fn matrix(&self) -> Result<MatrixOptions, Error> {
        let node = self.node("Matrix", "matrix")?;
        node.get::<MatrixOptions>(None, "matrix", "Reading matrix parameters failed")?
            .validate()
    }

    pub fn background(&self) -> Result<Rgb888, Error> {
        match self.figment.contains("background") {
            false => Ok(Rgb888::BLACK),
            true => self
                .figment
                .extract_inner::<[u8; 3]>("background")
                .map(|[r, g, b]| Rgb888::new(r, g, b))
                .map_err(|_| {
                    Error::invalid_argument("Options", "background", "Reading background failed")
                }),
        }
    }
}

/// One top level section of the document, tagged with the component that
/// reads it so that failures name their origin.
#[derive(Debug)]
pub struct Node<'a> {
    options: &'a Options,
    component: &'static str,
    name: String,
}

impl Node<'_> {
    fn path(&self, key: Option<&str>) -> String {
        match key {
            Some(key) => format!("{}.{}", self.name, key),
            None => self.name.clone(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.figment.contains(&self.path(Some(key)))
    }

    /// Extracts a required value; `key == None` extracts the whole node.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: Option<&str>,
        field: &'static str,
        message: &str,
    ) -> Result<T, Error> {
        self.options
            .figment
            .extract_inner(&self.path(key))
            .map_err(|e| {
                log::debug!("{}: {}", self.component, e);
                Error::invalid_argument(self.component, field, message)
            })
    }

    /// Like `get`, but a missing key yields `None` instead of an error.
    pub fn find<T: DeserializeOwned>(
        &self,
        key: &str,
        field: &'static str,
        message: &str,
    ) -> Result<Option<T>, Error> {
        if !self.contains(key) {
            return Ok(None);
        }
        self.get(Some(key), field, message).map(Some)
    }

    pub fn font(&self) -> Result<Font, Error> {
        let reference: String = self.get(Some("font"), "font", "Reading font failed")?;
        fonts::load(&reference).ok_or_else(|| {
            let path = self.options.config_dir.join(&reference);
            Error::invalid_argument(
                self.component,
                "font",
                format!("Couldn't load font {}", path.display()),
            )
        })
    }

    pub fn position(&self) -> Result<Point, Error> {
        let [x, y]: [i32; 2] = self.get(Some("position"), "position", "Reading position failed")?;
        Ok(Point::new(x, y))
    }

    pub fn color(&self, key: &str) -> Result<Option<Rgb888>, Error> {
        let color: Option<[u8; 3]> = self.find(key, "color", "Error reading color from yaml")?;
        Ok(color.map(|[r, g, b]| Rgb888::new(r, g, b)))
    }
}
