use std::io;

/// Errors raised while encoding or decoding a mesh.
///
/// Every variant is fatal for the call that produced it; codecs never return
/// partially decoded geometry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input does not follow the grammar or layout of its format.
    #[error("format error: {0}")]
    Format(String),

    /// The input ended before the declared amount of data was read.
    #[error("unexpected end of input: {0}")]
    Truncated(String),

    /// The caller handed the encoder geometry it cannot represent.
    #[error("invalid geometry: {0}")]
    Precondition(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    pub fn truncated<S: Into<String>>(msg: S) -> Self {
        Error::Truncated(msg.into())
    }

    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        Error::Precondition(msg.into())
    }
}

/// Maps `UnexpectedEof` from a reader onto [`Error::Truncated`].
///
/// Fixed-size readers (`byteorder` in particular) report running out of input
/// as an I/O error; this keeps the distinction between a short file and a
/// failing device.
pub trait TruncationContext<T> {
    fn or_truncated<F: FnOnce() -> String>(self, what: F) -> Result<T>;
}

impl<T> TruncationContext<T> for io::Result<T> {
    fn or_truncated<F: FnOnce() -> String>(self, what: F) -> Result<T> {
        self.map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::Truncated(what()),
            _ => Error::Io(err),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_becomes_truncation() {
        let res: io::Result<()> = Err(io::ErrorKind::UnexpectedEof.into());
        let err = res.or_truncated(|| "triangle 3".to_string()).unwrap_err();
        assert!(matches!(err, Error::Truncated(ref what) if what == "triangle 3"));
    }

    #[test]
    fn other_io_errors_pass_through() {
        let res: io::Result<()> = Err(io::ErrorKind::PermissionDenied.into());
        let err = res.or_truncated(|| unreachable!()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
