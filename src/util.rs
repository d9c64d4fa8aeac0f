//! Utility functions used in all other neuroload modules.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use byteordered::byteorder::ReadBytesExt;
use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Result;

/// Check whether the file extension ends with ".gz".
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Check whether the file is a gzip-compressed MGH file, i.e., ends with ".mgz" or ".gz".
pub fn is_compressed_mgh_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    is_gz_file(&path)
        || path
            .as_ref()
            .file_name()
            .map(|a| a.to_string_lossy().ends_with(".mgz"))
            .unwrap_or(false)
}


/// Open a file for reading. If `gz` is set, the stream is transparently GZip-decoded.
pub fn open_reader<P: AsRef<Path>>(path: P, gz: bool) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if gz {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Create a file for writing. If `gz` is set, the output is GZip-compressed.
pub fn open_writer<P: AsRef<Path>>(path: P, gz: bool) -> Result<Box<dyn Write>> {
    let file = File::create(path)?;
    if gz {
        Ok(Box::new(GzEncoder::new(file, Compression::default())))
    } else {
        Ok(Box::new(file))
    }
}


/// Read a fixed length zero-terminated byte string of the given length from the input. Embedded '\0' chars are allowed, but not added to the returned String.
pub fn read_fixed_length_string<S>(input: &mut S, len: usize) -> Result<String>
where
    S: Read,
{
    let mut info_line = String::with_capacity(len);
    for _ in 0..len {
        let cur_char = input.read_u8()? as char;
        if cur_char != '\0' {
            info_line.push(cur_char);
        }
    }
    Ok(info_line)
}


/// A reader for the whitespace-aligned text tables FreeSurfer writes, like label, lookup table and stats files.
///
/// Every line is one record. Lines starting with `#` are skipped. Use [`table_fields`] to get the columns of a record.
pub fn whitespace_table_reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b' ')
        .quoting(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input)
}

/// The columns of a record from [`whitespace_table_reader`].
///
/// Columns are aligned with runs of blanks or tabs, which the reader reports as empty or tab-joined fields, so
/// fields are split again on whitespace and empty ones are dropped. Indented comment lines yield no columns.
pub fn table_fields(record: &StringRecord) -> Vec<&str> {
    let fields: Vec<&str> = record.iter().flat_map(|f| f.split_whitespace()).collect();
    match fields.first() {
        Some(first) if first.starts_with('#') => Vec::new(),
        _ => fields,
    }
}

/// The 1-based line number of a record, for error messages.
pub fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}


/// Interpret three bytes as a single 24 bit integer, FreeSurfer style.
pub fn interpret_fs_int24(b1: u8, b2: u8, b3: u8) -> i32 {
    ((b1 as i32) << 16) + ((b2 as i32) << 8) + b3 as i32
}

/// Split a 24 bit FreeSurfer magic number into its three bytes.
pub fn fs_int24_bytes(value: i32) -> [u8; 3] {
    [((value >> 16) & 0xff) as u8, ((value >> 8) & 0xff) as u8, (value & 0xff) as u8]
}


#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn gz_files_are_detected_by_name() {
        assert!(is_gz_file("lh.white.gz"));
        assert!(!is_gz_file("lh.white"));
        assert!(is_compressed_mgh_file("brain.mgz"));
        assert!(!is_compressed_mgh_file("lh.thickness.fwhm10.fsaverage.mgh"));
    }

    #[test]
    fn fixed_length_strings_drop_embedded_zeros() {
        let mut input = Cursor::new(b"bankssts\0\0".to_vec());
        assert_eq!("bankssts", read_fixed_length_string(&mut input, 10).unwrap());
    }

    #[test]
    fn table_fields_ignore_alignment_and_comments() {
        let contents = "# header\n17  Left-Hippocampus\t\t220 216  20 0\n\n   # indented comment\n  53 Right-Hippocampus 220 216 20 0  \n";
        let mut rdr = whitespace_table_reader(contents.as_bytes());
        let rows: Vec<Vec<String>> = rdr
            .records()
            .map(|r| table_fields(&r.unwrap()).iter().map(|f| f.to_string()).collect())
            .filter(|fields: &Vec<String>| !fields.is_empty())
            .collect();
        assert_eq!(2, rows.len());
        assert_eq!(vec!["17", "Left-Hippocampus", "220", "216", "20", "0"], rows[0]);
        assert_eq!(vec!["53", "Right-Hippocampus", "220", "216", "20", "0"], rows[1]);
    }

    #[test]
    fn fs_int24_magic_numbers_round_trip() {
        assert_eq!(16777214, interpret_fs_int24(255, 255, 254));
        assert_eq!([255, 255, 255], fs_int24_bytes(16777215));
    }
}
