// Functions for managing FreeSurfer per-vertex data in binary 'curv' files.
// These files store 1 scalar value (typically a morphological descriptor, like cortical thickness at that point)
// for each vertex of the respective brain surface mesh.


use byteordered::ByteOrdered;

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{NeuroformatsError, Result};
use crate::util::{fs_int24_bytes, interpret_fs_int24, is_gz_file, open_reader, open_writer};

pub const CURV_MAGIC_FILE_TYPE_NUMBER: i32 = 16777215;


#[derive(Debug, Clone, PartialEq)]
pub struct CurvHeader {
    pub curv_magic: [u8; 3],
    pub num_vertices: i32,
    pub num_faces: i32,
    pub num_values_per_vertex: i32,
}


impl Default for CurvHeader {
    fn default() -> CurvHeader {
        CurvHeader {
            curv_magic: fs_int24_bytes(CURV_MAGIC_FILE_TYPE_NUMBER),
            num_vertices: 0,
            num_faces: 0,
            num_values_per_vertex: 1,
        }
    }
}

impl CurvHeader {

    /// Read a Curv header from a file.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding. This is not typically the case
    /// for FreeSurfer Curv files, but very handy (and it helps us to reduce the size of our test data).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<CurvHeader> {
        let gz = is_gz_file(&path);
        let mut input = open_reader(path, gz)?;
        CurvHeader::from_reader(&mut input)
    }


    /// Read a Curv header from the given byte stream.
    /// It is assumed that the input is currently at the start of the
    /// Curv header.
    pub fn from_reader<S>(input: &mut S) -> Result<CurvHeader>
    where
        S: Read,
    {
        let mut hdr = CurvHeader::default();

        let mut input = ByteOrdered::be(input);

        for v in &mut hdr.curv_magic {
            *v = input.read_u8()?;
        }

        let magic = interpret_fs_int24(hdr.curv_magic[0], hdr.curv_magic[1], hdr.curv_magic[2]);
        if magic != CURV_MAGIC_FILE_TYPE_NUMBER {
            return Err(NeuroformatsError::InvalidCurvFormat);
        }

        hdr.num_vertices = input.read_i32()?;
        hdr.num_faces = input.read_i32()?;
        hdr.num_values_per_vertex = input.read_i32()?;

        if hdr.num_vertices < 0 || hdr.num_values_per_vertex != 1 {
            return Err(NeuroformatsError::InvalidCurvFormat);
        }

        Ok(hdr)
    }
}


/// Per-vertex data from a FreeSurfer curv file.
#[derive(Debug, Clone, PartialEq)]
pub struct FsCurv {
    pub header: CurvHeader,
    pub data: Vec<f32>,
}

impl FsCurv {
    /// Read an FsCurv instance from a file. GZip-compressed files ending with ".gz" are supported.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsCurv> {
        let gz = is_gz_file(&path);
        let mut input = open_reader(path, gz)?;
        let header = CurvHeader::from_reader(&mut input)?;

        let mut input = ByteOrdered::be(input);
        let mut data: Vec<f32> = Vec::with_capacity(header.num_vertices as usize);
        for _ in 0..header.num_vertices {
            data.push(input.read_f32()?);
        }

        Ok(FsCurv { header, data })
    }
}


/// Read per-vertex data from a FreeSurfer curv file, like `surf/lh.thickness`.
///
/// # Examples
///
/// ```no_run
/// let curv = neuroload::read_curv("/path/to/subjects_dir/subject1/surf/lh.thickness").unwrap();
/// let sum_thickness: f32 = curv.data.iter().sum();
/// ```
pub fn read_curv<P: AsRef<Path>>(path: P) -> Result<FsCurv> {
    FsCurv::from_file(path)
}


/// Write per-vertex data to a FreeSurfer curv file. The face count in the header is written as `num_faces`.
pub fn write_curv<P: AsRef<Path>>(path: P, data: &[f32], num_faces: i32) -> Result<()> {
    let gz = is_gz_file(&path);
    let mut output = ByteOrdered::be(open_writer(path, gz)?);

    for b in fs_int24_bytes(CURV_MAGIC_FILE_TYPE_NUMBER).iter() {
        output.write_u8(*b)?;
    }
    output.write_i32(data.len() as i32)?;
    output.write_i32(num_faces)?;
    output.write_i32(1)?;
    for v in data {
        output.write_f32(*v)?;
    }
    output.flush()?;
    Ok(())
}
