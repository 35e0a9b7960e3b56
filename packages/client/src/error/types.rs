use std::error::Error as StdError;
use std::fmt;

use url::Url;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the engine outside of a transfer's `Response`.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync>>,
    url: Option<Url>,
}

/// Semantic error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// The request could not be built (bad URL, invalid option).
    Builder,
    /// The transport driver failed to set up or operate a transfer.
    Driver,
    /// The transfer was cancelled before natural completion.
    Cancelled,
    /// The engine was stopped while the transfer was pending or in flight.
    Stopped,
}

impl Error {
    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                url: None,
            }),
        }
    }

    #[must_use]
    pub(crate) fn with<E: Into<Box<dyn StdError + Send + Sync>>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    #[must_use]
    pub(crate) fn with_url(mut self, url: Url) -> Error {
        self.inner.url = Some(url);
        self
    }

    /// The error's semantic category.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// URL associated with the error, when one is known.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// True when the transfer was cancelled through its handle.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.kind == Kind::Cancelled
    }

    /// True when the engine was stopped with the transfer unresolved.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.kind == Kind::Stopped
    }

    /// True for request construction failures.
    #[inline]
    #[must_use]
    pub fn is_builder(&self) -> bool {
        self.inner.kind == Kind::Builder
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        // Boxed sources cannot be cloned; the kind and URL carry the meaning.
        Error {
            inner: Box::new(Inner {
                kind: self.inner.kind,
                source: None,
                url: self.inner.url.clone(),
            }),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("convoy::Error");
        f.field("kind", &self.inner.kind);
        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }
        if let Some(ref url) = self.inner.url {
            f.field("url", url);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.inner.kind {
            Kind::Builder => "request builder error",
            Kind::Driver => "transport driver error",
            Kind::Cancelled => "the transfer was cancelled",
            Kind::Stopped => "the engine stopped while the transfer was in the pool",
        };
        f.write_str(prefix)?;
        if let Some(ref url) = self.inner.url {
            write!(f, " for url ({url})")?;
        }
        if let Some(ref source) = self.inner.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
