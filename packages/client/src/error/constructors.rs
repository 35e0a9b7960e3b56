//! Internal constructors keeping error creation uniform across the crate.

use url::Url;

use super::types::{Error, Kind};

pub(crate) fn builder_message(message: &str, url: Option<Url>) -> Error {
    let err = Error::new(Kind::Builder).with(std::io::Error::other(message.to_owned()));
    match url {
        Some(url) => err.with_url(url),
        None => err,
    }
}

pub(crate) fn driver(source: curl::Error) -> Error {
    Error::new(Kind::Driver).with(source)
}

pub(crate) fn multi(source: curl::MultiError) -> Error {
    Error::new(Kind::Driver).with(source)
}

pub(crate) fn spawn(source: std::io::Error) -> Error {
    Error::new(Kind::Driver).with(source)
}

pub(crate) fn cancelled() -> Error {
    Error::new(Kind::Cancelled)
}

pub(crate) fn stopped() -> Error {
    Error::new(Kind::Stopped)
}

impl From<curl::Error> for Error {
    fn from(source: curl::Error) -> Self {
        driver(source)
    }
}

impl From<curl::MultiError> for Error {
    fn from(source: curl::MultiError) -> Self {
        multi(source)
    }
}
