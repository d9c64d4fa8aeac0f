//! Functions for reading FreeSurfer color lookup tables, like `FreeSurferColorLUT.txt`.
//!
//! Each non-comment line holds an integer structure code, a structure name and the RGBA color
//! of the structure. The code is the value stored in segmentation volumes like `mri/aseg.mgz`.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{NeuroformatsError, Result};
use crate::util::{record_line, table_fields, whitespace_table_reader};


/// The code of the `Unknown` structure in FreeSurfer lookup tables and segmentations.
pub const UNKNOWN_CODE: i32 = 0;


#[derive(Debug, Clone, PartialEq, Default)]
pub struct FsColorLut {
    pub code: Vec<i32>,
    pub name: Vec<String>,
    pub r: Vec<i32>,
    pub g: Vec<i32>,
    pub b: Vec<i32>,
    pub a: Vec<i32>,
    index_by_code: HashMap<i32, usize>,
}

impl FsColorLut {
    /// Parse a lookup table from the contents of a LUT text file. Empty lines and lines starting with `#` are skipped.
    pub fn from_str_contents(contents: &str) -> Result<FsColorLut> {
        FsColorLut::from_reader(contents.as_bytes())
    }

    /// Parse a lookup table from a reader.
    pub fn from_reader<R: Read>(input: R) -> Result<FsColorLut> {
        let mut lut = FsColorLut::default();
        for result in whitespace_table_reader(input).records() {
            let record = result?;
            let fields = table_fields(&record);
            if fields.is_empty() {
                continue;
            }
            if fields.len() != 6 {
                return Err(NeuroformatsError::InvalidLookupTable(format!("line {} has {} fields, expected 6", record_line(&record), fields.len())));
            }
            let mut ints = [0i32; 5];
            for (target, field_idx) in ints.iter_mut().zip([0usize, 2, 3, 4, 5].iter()) {
                *target = fields[*field_idx].parse::<i32>()
                    .map_err(|e| NeuroformatsError::InvalidLookupTable(format!("line {}: invalid integer '{}': {}", record_line(&record), fields[*field_idx], e)))?;
            }
            lut.push(ints[0], fields[1], [ints[1], ints[2], ints[3], ints[4]]);
        }
        Ok(lut)
    }

    /// Append an entry. A later entry with the same code replaces the earlier one in code lookups.
    pub fn push<N: Into<String>>(&mut self, code: i32, name: N, rgba: [i32; 4]) {
        self.index_by_code.insert(code, self.code.len());
        self.code.push(code);
        self.name.push(name.into());
        self.r.push(rgba[0]);
        self.g.push(rgba[1]);
        self.b.push(rgba[2]);
        self.a.push(rgba[3]);
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// The structure name for the given code, e.g., `Left-Hippocampus` for 17.
    pub fn name_of(&self, code: i32) -> Option<&str> {
        self.index_by_code.get(&code).map(|idx| self.name[*idx].as_str())
    }

    /// The code of the structure with the given name.
    pub fn code_of(&self, name: &str) -> Option<i32> {
        self.name.iter().position(|n| n == name).map(|idx| self.code[idx])
    }

    /// The RGBA color of the structure with the given code.
    pub fn color_of(&self, code: i32) -> Option<[i32; 4]> {
        self.index_by_code.get(&code).map(|idx| [self.r[*idx], self.g[*idx], self.b[*idx], self.a[*idx]])
    }
}

impl fmt::Display for FsColorLut {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Color lookup table with {} structures.", self.len())
    }
}


/// Read a FreeSurfer color lookup table file.
///
/// # Examples
///
/// ```no_run
/// let lut = neuroload::read_lut("/path/to/freesurfer/FreeSurferColorLUT.txt").unwrap();
/// assert_eq!(Some("Left-Hippocampus"), lut.name_of(17));
/// ```
pub fn read_lut<P: AsRef<Path>>(path: P) -> Result<FsColorLut> {
    FsColorLut::from_reader(BufReader::new(File::open(path)?))
}


#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    pub const DEMO_LUT: &str = "#$Id: FreeSurferColorLUT.txt\n\n#No. Label Name:                            R   G   B   A\n\n0   Unknown                                 0   0   0   0\n2   Left-Cerebral-White-Matter              245 245 245 0\n17  Left-Hippocampus                        220 216 20  0\n53  Right-Hippocampus                       220 216 20  0\n";

    #[test]
    fn a_lut_file_can_be_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("FreeSurferColorLUT.txt");
        fs::write(&path, DEMO_LUT).unwrap();

        let lut = read_lut(&path).unwrap();
        assert_eq!(4, lut.len());
        assert_eq!(Some("Left-Hippocampus"), lut.name_of(17));
        assert_eq!(Some("Unknown"), lut.name_of(UNKNOWN_CODE));
        assert_eq!(None, lut.name_of(18));
        assert_eq!(Some(53), lut.code_of("Right-Hippocampus"));
        assert_eq!(Some([245, 245, 245, 0]), lut.color_of(2));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(FsColorLut::from_str_contents("0 Unknown 0 0 0\n").is_err());
        assert!(FsColorLut::from_str_contents("x Unknown 0 0 0 0\n").is_err());
    }

    #[test]
    fn tab_separated_entries_and_indented_comments_are_supported() {
        let lut = FsColorLut::from_str_contents("  # FreeSurfer LUT\n0\tUnknown\t0\t0\t0\t0\n\t1001\tctx-lh-bankssts\t25 100 40 0\n").unwrap();
        assert_eq!(2, lut.len());
        assert_eq!(Some(1001), lut.code_of("ctx-lh-bankssts"));
        assert_eq!(Some([25, 100, 40, 0]), lut.color_of(1001));
    }
}
