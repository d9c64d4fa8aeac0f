//! Closed sets of values for the string parameters used throughout FreeSurfer file naming.

use std::fmt;
use std::str::FromStr;

use crate::error::{NeuroformatsError, Result};


/// A single brain hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hemisphere {
    Lh,
    Rh,
}

impl Hemisphere {
    /// The file name prefix used by FreeSurfer for this hemisphere.
    pub fn as_str(&self) -> &'static str {
        match self {
            Hemisphere::Lh => "lh",
            Hemisphere::Rh => "rh",
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Hemisphere {
    type Err = NeuroformatsError;

    fn from_str(s: &str) -> Result<Hemisphere> {
        match s {
            "lh" => Ok(Hemisphere::Lh),
            "rh" => Ok(Hemisphere::Rh),
            _ => Err(NeuroformatsError::InvalidArgument(format!("hemisphere_label must be one of {{'lh', 'rh'}} but is '{}'.", s))),
        }
    }
}


/// The hemisphere selection for loaders which can work on one or both hemispheres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemi {
    Lh,
    Rh,
    Both,
}

impl Hemi {
    /// The hemispheres covered by this selection, in loading order (lh before rh).
    pub fn hemispheres(&self) -> Vec<Hemisphere> {
        match self {
            Hemi::Lh => vec![Hemisphere::Lh],
            Hemi::Rh => vec![Hemisphere::Rh],
            Hemi::Both => vec![Hemisphere::Lh, Hemisphere::Rh],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Hemi::Lh => "lh",
            Hemi::Rh => "rh",
            Hemi::Both => "both",
        }
    }
}

impl Default for Hemi {
    fn default() -> Hemi {
        Hemi::Both
    }
}

impl From<Hemisphere> for Hemi {
    fn from(h: Hemisphere) -> Hemi {
        match h {
            Hemisphere::Lh => Hemi::Lh,
            Hemisphere::Rh => Hemi::Rh,
        }
    }
}

impl fmt::Display for Hemi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Hemi {
    type Err = NeuroformatsError;

    fn from_str(s: &str) -> Result<Hemi> {
        match s {
            "lh" => Ok(Hemi::Lh),
            "rh" => Ok(Hemi::Rh),
            "both" => Ok(Hemi::Both),
            _ => Err(NeuroformatsError::InvalidArgument(format!("hemi must be one of {{'lh', 'rh', 'both'}} but is '{}'.", s))),
        }
    }
}


/// One value per hemisphere, e.g., custom file names for lh and rh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HemiPair<T> {
    pub lh: T,
    pub rh: T,
}

impl<T> HemiPair<T> {
    pub fn new(lh: T, rh: T) -> HemiPair<T> {
        HemiPair { lh, rh }
    }

    pub fn get(&self, hemi: Hemisphere) -> &T {
        match hemi {
            Hemisphere::Lh => &self.lh,
            Hemisphere::Rh => &self.rh,
        }
    }
}


/// On-disk encoding of per-vertex morphometry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MorphFormat {
    /// FreeSurfer 'curv' format, used for native space data like `lh.thickness`.
    Curv,
    /// MGH volume format, used for data mapped to an average subject like `lh.thickness.fwhm10.fsaverage.mgh`.
    Mgh,
}

impl MorphFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MorphFormat::Curv => "curv",
            MorphFormat::Mgh => "mgh",
        }
    }
}

impl fmt::Display for MorphFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MorphFormat {
    type Err = NeuroformatsError;

    fn from_str(s: &str) -> Result<MorphFormat> {
        match s {
            "curv" => Ok(MorphFormat::Curv),
            "mgh" => Ok(MorphFormat::Mgh),
            _ => Err(NeuroformatsError::InvalidArgument(format!("format must be one of {{'curv', 'mgh'}} but is '{}'.", s))),
        }
    }
}
