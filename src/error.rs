//! Error kinds and the sticky-error latch used by the lifecycle layer.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;
pub type PassiveResult = Result<()>;

pub use std::io::Error as IoError;
pub use std::io::Result as IoResult;

/// Stable numeric error codes, kept wire-compatible with existing tooling
/// that expects the legacy discriminant values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorKind {
    None = 0,
    Mem = 1,
    NullFp = 2,
    NullHdr = 3,
    InvalidBlockNo = 4,
    InvalidTileNo = 5,
    Read = 6,
    Write = 7,
    Seek = 8,
    Truncate = 9,
    InvalidFileMode = 10,
    IncompatibleVersion = 11,
    MetaDataKey = 12,
    MetaDataValue = 13,
    CannotWriteVersion = 14,
    InvalidBand = 15,
    InvalidCoord = 16,
    InvalidTileSize = 17,
    InvalidRegionSize = 18,
    InvalidBuffer = 19,

    // PNM/PGM/PPM export family: out of scope for this crate, kept only so
    // the numbering stays stable for tooling that switches on these codes.
    ExportUnsupported = 20,
    ExportBlankFile = 21,
    ExportWrite = 22,
    ExportIncomplete = 23,

    // "simple" typed facade family
    UndefinedDataType = 100,
    IncorrectDataType = 101,
    UndefinedEndian = 102,
}

impl ErrorKind {
    /// The human-readable description, mirroring `get_error_description`.
    pub const fn description(self) -> &'static str {
        match self {
            ErrorKind::None => "no error",
            ErrorKind::Mem => "memory allocation failed",
            ErrorKind::NullFp => "no open file handle",
            ErrorKind::NullHdr => "no header loaded",
            ErrorKind::InvalidBlockNo => "invalid block number",
            ErrorKind::InvalidTileNo => "invalid tile index",
            ErrorKind::Read => "read failed",
            ErrorKind::Write => "write failed",
            ErrorKind::Seek => "seek failed",
            ErrorKind::Truncate => "truncate failed",
            ErrorKind::InvalidFileMode => "file is open read-only",
            ErrorKind::IncompatibleVersion => "file format version is newer than this library",
            ErrorKind::MetaDataKey => "meta-data key not found",
            ErrorKind::MetaDataValue => "meta-data value is malformed",
            ErrorKind::CannotWriteVersion => "cannot write requested file format version",
            ErrorKind::InvalidBand => "band index out of range",
            ErrorKind::InvalidCoord => "coordinate out of range",
            ErrorKind::InvalidTileSize => "invalid tile size",
            ErrorKind::InvalidRegionSize => "invalid region size",
            ErrorKind::InvalidBuffer => "buffer has the wrong size",
            ErrorKind::ExportUnsupported => "export format not supported",
            ErrorKind::ExportBlankFile => "could not create blank export file",
            ErrorKind::ExportWrite => "export write failed",
            ErrorKind::ExportIncomplete => "export is not implemented",
            ErrorKind::UndefinedDataType => "undefined simple data type",
            ErrorKind::IncorrectDataType => "data type does not match the file's \"simple\" agreement",
            ErrorKind::UndefinedEndian => "undefined simple endianness",
        }
    }
}

/// The error type returned by every fallible operation in this crate.
///
/// Carries the stable [`ErrorKind`], the name of the operation that failed,
/// and the underlying I/O error when there is one.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub at: &'static str,
    pub source: Option<IoError>,
}

impl Error {
    pub fn new(kind: ErrorKind, at: &'static str) -> Self {
        Error { kind, at, source: None }
    }

    pub fn invalid(at: &'static str, kind: ErrorKind) -> Self {
        Error::new(kind, at)
    }

    pub fn io(at: &'static str, source: IoError) -> Self {
        Error { kind: io_error_kind(&source), at, source: Some(source) }
    }
}

/// Best-effort mapping of an I/O failure onto one of the positioned-I/O
/// error kinds; callers that need a more precise kind construct `Error`
/// directly at the call site (e.g. distinguishing seek from read).
fn io_error_kind(_error: &IoError) -> ErrorKind {
    ErrorKind::Read
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (in {}): {}", self.kind.description(), self.at, self.kind as i32)?;
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Enable using the `?` operator on `io::Result` where the call site does
/// not need a more specific `ErrorKind`.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        Error::io("io", error)
    }
}

/// Free function mirroring the C API's `get_error_description(code)`.
pub fn get_error_description(kind: ErrorKind) -> &'static str {
    kind.description()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn description_is_stable_for_every_kind() {
        assert_eq!(ErrorKind::None.description(), "no error");
        assert_eq!(ErrorKind::InvalidFileMode.description(), "file is open read-only");
        assert_eq!(ErrorKind::UndefinedEndian as i32, 102);
        assert_eq!(ErrorKind::InvalidBuffer as i32, 19);
    }

    #[test]
    fn display_includes_operation_name() {
        let err = Error::new(ErrorKind::InvalidBand, "get_raster");
        let text = format!("{}", err);
        assert!(text.contains("get_raster"));
    }
}
