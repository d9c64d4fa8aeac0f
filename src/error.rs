use quick_error::quick_error;
use std::io::Error as IOError;
use std::path::PathBuf;

use crate::hemi::Hemisphere;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum NeuroformatsError {
        /// Invalid curv file: wrong magic number.
        InvalidCurvFormat {
            display("Invalid Curv file")
        }

        InvalidFsSurfaceFormat {
            display("Invalid FreeSurfer surf file")
        }

        InvalidFsMghFormat {
            display("Invalid FreeSurfer MGH file")
        }

        UnsupportedMghDataType(dtype: i32) {
            display("Unsupported MGH data type code {}", dtype)
        }

        UnsupportedFsAnnotFormatVersion {
            display("Unsupported FreeSurfer annot file format version")
        }

        InvalidFsLabelFormat(msg: String) {
            display("Invalid FreeSurfer label file: {}", msg)
        }

        InvalidLookupTable(msg: String) {
            display("Invalid color lookup table: {}", msg)
        }

        InvalidRegistrationFormat(msg: String) {
            display("Invalid registration matrix: {}", msg)
        }

        InvalidStatsFile(msg: String) {
            display("Invalid stats file: {}", msg)
        }

        /// A parameter was outside its allowed set of values.
        InvalidArgument(msg: String) {
            display("Invalid argument: {}", msg)
        }

        /// Data read successfully, but with shapes that do not fit together.
        Validation(msg: String) {
            display("Validation failed: {}", msg)
        }

        /// I/O error while reading a file that belongs to one hemisphere.
        HemiFileIo(hemi: Hemisphere, path: PathBuf, err: IOError) {
            display("[Errno {}] {}: '{}' for hemi '{}'", err.raw_os_error().unwrap_or(0), err, path.display(), hemi)
            source(err)
        }

        Csv(err: csv::Error) {
            from()
            source(err)
        }

        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
        }
    }
}

impl NeuroformatsError {
    /// Attach the hemisphere and file to a plain I/O error. Other variants pass through unchanged.
    pub fn for_hemi<P: Into<PathBuf>>(self, hemi: Hemisphere, path: P) -> NeuroformatsError {
        match self {
            NeuroformatsError::Io(err) => NeuroformatsError::HemiFileIo(hemi, path.into(), err),
            other => other,
        }
    }

    /// Whether this error is an I/O error, with or without hemisphere tag.
    pub fn is_io(&self) -> bool {
        matches!(self, NeuroformatsError::Io(_) | NeuroformatsError::HemiFileIo(..))
    }

    /// The hemisphere tag, if any.
    pub fn hemi(&self) -> Option<Hemisphere> {
        match self {
            NeuroformatsError::HemiFileIo(hemi, _, _) => Some(*hemi),
            _ => None,
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, NeuroformatsError>;
