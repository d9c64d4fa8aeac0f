//! Functions for managing FreeSurfer brain volumes in binary 'MGH' files.
//!
//! MGH files store a 4D voxel array (the 4th dimension holds frames, e.g., time points) in big endian
//! byte order, preceded by a fixed size header. The header optionally contains the orientation of the
//! volume in scanner space, from which the vox2ras matrices are computed. MGZ files are GZip-compressed MGH files.

use byteordered::ByteOrdered;
use ndarray::{s, Array, Array4, ShapeBuilder};

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{NeuroformatsError, Result};
use crate::spatial::Affine;
use crate::util::{is_compressed_mgh_file, open_reader, open_writer};

pub const MGH_VERSION: i32 = 1;

pub const MRI_UCHAR: i32 = 0;
pub const MRI_INT: i32 = 1;
pub const MRI_FLOAT: i32 = 3;
pub const MRI_SHORT: i32 = 4;

pub const MGH_DATATYPE_NAMES : [&str; 4] = ["MRI_UCHAR", "MRI_INT", "MRI_FLOAT", "MRI_SHORT"];
pub const MGH_DATATYPE_CODES : [i32; 4] = [MRI_UCHAR, MRI_INT, MRI_FLOAT, MRI_SHORT];
pub const MGH_DATA_START : usize = 284; // The index in bytes where the data part starts in an MGH file.

/// Upper bound for the number of voxels reserved up front. Larger volumes grow while reading.
const MAX_PREALLOCATED_VOXELS: usize = 1 << 24;

/// Bytes of the header which carry data: 7 ints, 1 short, 15 floats.
const MGH_HEADER_USED_BYTES : usize = 7 * 4 + 2 + 15 * 4;

/// Models the header of a FreeSurfer MGH file containing a brain volume.
#[derive(Debug, Clone, PartialEq)]
pub struct FsMghHeader {
    pub mgh_format_version: i32,
    pub dim1len: i32,
    pub dim2len: i32,
    pub dim3len: i32,
    pub dim4len: i32,  // aka "num_frames"
    pub dtype: i32,
    pub dof: i32,
    pub is_ras_good: i16,
    pub delta: [f32; 3],
    pub mdc_raw: [f32; 9],
    pub p_xyz_c: [f32; 3],
}


/// Models a FreeSurfer MGH file. Exactly one of the data fields is set, depending on the `dtype` in the header.
#[derive(Debug, Clone, PartialEq)]
pub struct FsMgh {
    pub header: FsMghHeader,
    pub data_mri_uchar: Option<Array4<u8>>,
    pub data_mri_float: Option<Array4<f32>>,
    pub data_mri_int: Option<Array4<i32>>,
    pub data_mri_short: Option<Array4<i16>>,
}


impl Default for FsMghHeader {
    fn default() -> FsMghHeader {
        FsMghHeader {
            mgh_format_version: MGH_VERSION,
            dim1len: 0,
            dim2len: 0,
            dim3len: 0,
            dim4len: 0,
            dtype: MRI_FLOAT,
            dof: 0,
            is_ras_good: 0,
            delta: [1.0; 3],
            mdc_raw: default_mdc(),
            p_xyz_c: [0.; 3],
        }
    }
}

/// The direction cosines FreeSurfer assumes when the header carries no valid RAS information (coronal slices).
fn default_mdc() -> [f32; 9] {
    [-1., 0., 0.,   0., 0., -1.,   0., 1., 0.]
}

/// The header of an MGH/MGZ file.
impl FsMghHeader {

    /// Read an MGH header from a file. Files ending with ".mgz" or ".gz" are GZip-decoded.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsMghHeader> {
        let gz = is_compressed_mgh_file(&path);
        let mut input = open_reader(path, gz)?;
        FsMghHeader::from_reader(&mut input)
    }


    /// Read an MGH header from the given byte stream.
    /// It is assumed that the input is currently at the start of the
    /// header. The complete header is consumed, the input is left at the start of the voxel data.
    pub fn from_reader<S>(input: &mut S) -> Result<FsMghHeader>
    where
        S: Read,
    {
        let mut hdr = FsMghHeader::default();

        let mut input = ByteOrdered::be(input);

        hdr.mgh_format_version = input.read_i32()?;

        if hdr.mgh_format_version != MGH_VERSION {
            return Err(NeuroformatsError::InvalidFsMghFormat);
        }

        hdr.dim1len = input.read_i32()?;
        hdr.dim2len = input.read_i32()?;
        hdr.dim3len = input.read_i32()?;
        hdr.dim4len = input.read_i32()?;

        hdr.dtype = input.read_i32()?;
        hdr.dof = input.read_i32()?;

        hdr.is_ras_good = input.read_i16()?;

        let mut delta = [0f32; 3];
        let mut mdc_raw = [0f32; 9];
        let mut p_xyz_c = [0f32; 3];
        for v in delta.iter_mut() { *v = input.read_f32()?; }
        for v in mdc_raw.iter_mut() { *v = input.read_f32()?; }
        for v in p_xyz_c.iter_mut() { *v = input.read_f32()?; }

        if hdr.is_ras_good == 1 {
            hdr.delta = delta;
            hdr.mdc_raw = mdc_raw;
            hdr.p_xyz_c = p_xyz_c;
        }

        // We cannot seek in a GZ stream, so the unused rest of the header is read and discarded.
        let mut unused = [0u8; MGH_DATA_START - MGH_HEADER_USED_BYTES];
        input.read_exact(&mut unused)?;

        if hdr.dim1len < 0 || hdr.dim2len < 0 || hdr.dim3len < 0 || hdr.dim4len < 0 {
            return Err(NeuroformatsError::InvalidFsMghFormat);
        }

        Ok(hdr)
    }

    /// The lengths of the 4 dimensions.
    pub fn dim(&self) -> [usize; 4] {
        [self.dim1len as usize, self.dim2len as usize, self.dim3len as usize, self.dim4len as usize]
    }

    /// The voxel sizes along the 3 spatial axes, in mm.
    pub fn zooms(&self) -> [f32; 3] {
        self.delta
    }

    /// The name of the data type, e.g., `MRI_FLOAT`.
    pub fn dtype_name(&self) -> Option<&'static str> {
        MGH_DATATYPE_CODES.iter().position(|c| *c == self.dtype).map(|idx| MGH_DATATYPE_NAMES[idx])
    }

    /// Compute the vox2ras matrix, which maps 0-based voxel indices (CRS) to scanner RAS coordinates.
    ///
    /// The columns of the 3x3 part are the direction cosines scaled by the voxel sizes. The translation
    /// is chosen so that the volume center lands at the center RAS coordinate stored in the header.
    pub fn vox2ras(&self) -> Affine {
        let dims = self.dim();
        let mut m = Affine::identity();
        for col in 0..3 {
            for row in 0..3 {
                m[(row, col)] = (self.mdc_raw[col * 3 + row] * self.delta[col]) as f64;
            }
        }
        for row in 0..3 {
            let mut center = 0.0f64;
            for col in 0..3 {
                center += m[(row, col)] * (dims[col] as f64 / 2.0);
            }
            m[(row, 3)] = self.p_xyz_c[row] as f64 - center;
        }
        m
    }

    /// Inverse of [`FsMghHeader::vox2ras`]. Falls back to the identity for degenerate headers.
    pub fn ras2vox(&self) -> Affine {
        self.vox2ras().try_inverse().unwrap_or_else(Affine::identity)
    }

    /// Compute the tkregister vox2ras matrix, which maps voxel indices to the surface (tkr) RAS space.
    pub fn vox2ras_tkr(&self) -> Affine {
        let dims = self.dim();
        let d = [self.delta[0] as f64, self.delta[1] as f64, self.delta[2] as f64];
        let ns = [dims[0] as f64 * d[0] / 2.0, dims[1] as f64 * d[1] / 2.0, dims[2] as f64 * d[2] / 2.0];
        Affine::new(
            -d[0], 0.0,   0.0,  ns[0],
            0.0,   0.0,   d[2], -ns[2],
            0.0,   -d[1], 0.0,  ns[1],
            0.0,   0.0,   0.0,  1.0,
        )
    }

    /// Inverse of [`FsMghHeader::vox2ras_tkr`].
    pub fn ras2vox_tkr(&self) -> Affine {
        self.vox2ras_tkr().try_inverse().unwrap_or_else(Affine::identity)
    }
}


impl FsMgh {

    /// Read an MGH or MGZ file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsMgh> {
        let gz = is_compressed_mgh_file(&path);
        let mut input = open_reader(path, gz)?;
        FsMgh::from_reader(&mut input)
    }

    /// Read an MGH volume from a byte stream positioned at the start of the header.
    pub fn from_reader<S>(input: &mut S) -> Result<FsMgh>
    where
        S: Read,
    {
        let header = FsMghHeader::from_reader(input)?;
        let dim = header.dim();
        let shape = (dim[0], dim[1], dim[2], dim[3]).f();
        let num_voxels = dim.iter().try_fold(1usize, |acc, d| acc.checked_mul(*d)).ok_or_else(|| {
            NeuroformatsError::Validation(format!("MGH header dimensions {:?} exceed the addressable number of voxels.", dim))
        })?;
        let capacity = num_voxels.min(MAX_PREALLOCATED_VOXELS);

        let mut input = ByteOrdered::be(input);

        let mut mgh = FsMgh {
            header: header.clone(),
            data_mri_uchar: None,
            data_mri_float: None,
            data_mri_int: None,
            data_mri_short: None,
        };

        // The voxel data is stored in Fortran order: the first index varies fastest.
        match header.dtype {
            MRI_UCHAR => {
                let mut data = Vec::with_capacity(capacity);
                for _ in 0..num_voxels { data.push(input.read_u8()?); }
                mgh.data_mri_uchar = Some(into_array(shape, data)?);
            }
            MRI_INT => {
                let mut data = Vec::with_capacity(capacity);
                for _ in 0..num_voxels { data.push(input.read_i32()?); }
                mgh.data_mri_int = Some(into_array(shape, data)?);
            }
            MRI_FLOAT => {
                let mut data = Vec::with_capacity(capacity);
                for _ in 0..num_voxels { data.push(input.read_f32()?); }
                mgh.data_mri_float = Some(into_array(shape, data)?);
            }
            MRI_SHORT => {
                let mut data = Vec::with_capacity(capacity);
                for _ in 0..num_voxels { data.push(input.read_i16()?); }
                mgh.data_mri_short = Some(into_array(shape, data)?);
            }
            other => return Err(NeuroformatsError::UnsupportedMghDataType(other)),
        }
        Ok(mgh)
    }

    /// Wrap float data into an MGH volume with default orientation.
    pub fn from_f32_data(data: Array4<f32>) -> FsMgh {
        let mut header = FsMghHeader::default();
        set_header_dims(&mut header, data.shape());
        header.dtype = MRI_FLOAT;
        FsMgh { header, data_mri_uchar: None, data_mri_float: Some(data), data_mri_int: None, data_mri_short: None }
    }

    /// Wrap integer data into an MGH volume with default orientation. This is how segmentations are stored.
    pub fn from_i32_data(data: Array4<i32>) -> FsMgh {
        let mut header = FsMghHeader::default();
        set_header_dims(&mut header, data.shape());
        header.dtype = MRI_INT;
        FsMgh { header, data_mri_uchar: None, data_mri_float: None, data_mri_int: Some(data), data_mri_short: None }
    }

    /// The shape of the voxel data.
    pub fn dim(&self) -> [usize; 4] {
        self.header.dim()
    }

    /// The value at the given voxel index, converted to f64. Returns `None` if the index is out of bounds.
    pub fn voxel_value(&self, idx: [usize; 4]) -> Option<f64> {
        let idx = (idx[0], idx[1], idx[2], idx[3]);
        if let Some(d) = &self.data_mri_uchar {
            return d.get(idx).map(|v| *v as f64);
        }
        if let Some(d) = &self.data_mri_int {
            return d.get(idx).map(|v| *v as f64);
        }
        if let Some(d) = &self.data_mri_float {
            return d.get(idx).map(|v| *v as f64);
        }
        if let Some(d) = &self.data_mri_short {
            return d.get(idx).map(|v| *v as f64);
        }
        None
    }

    /// Get the voxel data converted to f32, whatever the stored data type.
    pub fn data_as_f32(&self) -> Option<Array4<f32>> {
        if let Some(d) = &self.data_mri_float {
            return Some(d.clone());
        }
        if let Some(d) = &self.data_mri_uchar {
            return Some(d.mapv(|v| v as f32));
        }
        if let Some(d) = &self.data_mri_int {
            return Some(d.mapv(|v| v as f32));
        }
        if let Some(d) = &self.data_mri_short {
            return Some(d.mapv(|v| v as f32));
        }
        None
    }

    /// The values along the first axis at voxel (.., 0, 0, 0).
    ///
    /// Per-vertex data mapped to an average subject is stored in MGH files with shape (num_vertices, 1, 1, 1), so this
    /// extracts the per-vertex data vector. Returns `None` without data or if one of the other axes is empty.
    pub fn first_axis_values(&self) -> Option<Vec<f32>> {
        let data = self.data_as_f32()?;
        if data.shape()[1..].contains(&0) {
            return None;
        }
        Some(data.slice(s![.., 0, 0, 0]).to_vec())
    }
}

impl fmt::Display for FsMgh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let d = self.dim();
        write!(f, "MGH volume of dimension {}x{}x{}x{} with data type {}.", d[0], d[1], d[2], d[3], self.header.dtype_name().unwrap_or("unknown"))
    }
}

fn into_array<T, Sh>(shape: Sh, data: Vec<T>) -> Result<Array4<T>>
where
    Sh: Into<ndarray::StrideShape<ndarray::Ix4>>,
{
    Array::from_shape_vec(shape, data).map_err(|e| NeuroformatsError::Validation(format!("MGH data does not match header dimensions: {}", e)))
}

fn set_header_dims(header: &mut FsMghHeader, shape: &[usize]) {
    header.dim1len = shape[0] as i32;
    header.dim2len = shape[1] as i32;
    header.dim3len = shape[2] as i32;
    header.dim4len = shape[3] as i32;
}


/// Read an MGH or MGZ file.
///
/// # Examples
///
/// ```no_run
/// let mgh = neuroload::read_mgh("/path/to/subjects_dir/subject1/mri/brain.mgz").unwrap();
/// let vox2ras = mgh.header.vox2ras();
/// ```
pub fn read_mgh<P: AsRef<Path>>(path: P) -> Result<FsMgh> {
    FsMgh::from_file(path)
}


/// Write an MGH volume. If the file name ends with ".mgz" or ".gz", the output is compressed.
pub fn write_mgh<P: AsRef<Path>>(path: P, mgh: &FsMgh) -> Result<()> {
    let gz = is_compressed_mgh_file(&path);
    let mut output = ByteOrdered::be(open_writer(path, gz)?);
    let hdr = &mgh.header;

    output.write_i32(MGH_VERSION)?;
    for d in mgh.dim().iter() {
        output.write_i32(*d as i32)?;
    }
    output.write_i32(hdr.dtype)?;
    output.write_i32(hdr.dof)?;
    output.write_i16(hdr.is_ras_good)?;
    for v in hdr.delta.iter().chain(hdr.mdc_raw.iter()).chain(hdr.p_xyz_c.iter()) {
        output.write_f32(*v)?;
    }
    output.write_all(&[0u8; MGH_DATA_START - MGH_HEADER_USED_BYTES])?;

    // Reversing the axes makes the logical iteration order Fortran order.
    match hdr.dtype {
        MRI_UCHAR => {
            let d = mgh.data_mri_uchar.as_ref().ok_or(NeuroformatsError::InvalidFsMghFormat)?;
            for v in d.t().iter() { output.write_u8(*v)?; }
        }
        MRI_INT => {
            let d = mgh.data_mri_int.as_ref().ok_or(NeuroformatsError::InvalidFsMghFormat)?;
            for v in d.t().iter() { output.write_i32(*v)?; }
        }
        MRI_FLOAT => {
            let d = mgh.data_mri_float.as_ref().ok_or(NeuroformatsError::InvalidFsMghFormat)?;
            for v in d.t().iter() { output.write_f32(*v)?; }
        }
        MRI_SHORT => {
            let d = mgh.data_mri_short.as_ref().ok_or(NeuroformatsError::InvalidFsMghFormat)?;
            for v in d.t().iter() { output.write_i16(*v)?; }
        }
        other => return Err(NeuroformatsError::UnsupportedMghDataType(other)),
    }
    output.flush()?;
    Ok(())
}
