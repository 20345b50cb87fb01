use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value needed to build a component is missing or malformed.
    /// `field` names the offending key so callers can tell failures apart.
    #[error("{component} -> {message}")]
    InvalidArgument {
        component: &'static str,
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error("display: {0:?}")]
    DisplayError(display_interface::DisplayError),

    #[error(transparent)]
    Errno(#[from] nix::errno::Errno),
}

impl Error {
    pub fn invalid_argument(
        component: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            component,
            field,
            message: message.into(),
        }
    }

    /// The configuration key behind an `InvalidArgument`, if that is what this is.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidArgument { field, .. } => Some(field),
            _ => None,
        }
    }
}

// DisplayError doesn't implement std::error::Error, so no #[from] here
impl From<display_interface::DisplayError> for Error {
    fn from(v: display_interface::DisplayError) -> Self {
        Self::DisplayError(v)
    }
}
