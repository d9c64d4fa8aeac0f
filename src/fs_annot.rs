//! Functions for managing FreeSurfer brain surface parcellations in annot files.
//!
//! These files assign each vertex of a brain surface mesh to exactly one brain region
//! or label. A so-called colortable contains data on the regions, including the region's
//! name, an RGB display color, and a unique identifier.
//!
//! Note that the per-vertex values stored in the file are not region indices, but the region color
//! packed into a single integer (see [`FsAnnotColortable::label`]). They have to be matched against
//! the colortable to find the region of a vertex.

use byteordered::ByteOrdered;
use ndarray::{Array1, Axis};
use ndarray_stats::interpolate::Linear;
use ndarray_stats::QuantileExt;
use noisy_float::types::n64;

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{NeuroformatsError, Result};
use crate::traits::VertexColor;
use crate::util::{is_gz_file, open_reader, open_writer, read_fixed_length_string};


/// The colortable version written by FreeSurfer, stored negated in place of the entry count.
const COLORTABLE_VERSION_2: i32 = -2;


#[derive(Debug, Clone, PartialEq, Default)]
pub struct FsAnnotColortable {
    pub id: Vec<i32>, // The structure id from the file. Not used to identify vertices, see 'label'.
    pub name: Vec<String>,
    pub r: Vec<i32>,
    pub g: Vec<i32>,
    pub b: Vec<i32>,
    pub a: Vec<i32>,
    pub label: Vec<i32>, // A unique code computed from r,g,b,a. Used in annot.vertex_labels to identify the region.
}


/// Compute the packed region code FreeSurfer uses in annot files from a region color.
///
/// The code is `r + g * 2^8 + b * 2^16 + a * 2^24` in 32 bit two's complement, so an alpha of 128 or more yields a negative code.
pub fn packed_color_code(r: i32, g: i32, b: i32, a: i32) -> i32 {
    r.wrapping_add(g.wrapping_shl(8))
        .wrapping_add(b.wrapping_shl(16))
        .wrapping_add(a.wrapping_shl(24))
}


impl FsAnnotColortable {

    /// Read a colortable in format version 2 from a reader. The reader must be positioned directly after the version and entry count fields.
    pub fn from_reader<S>(input: &mut S) -> Result<FsAnnotColortable>
    where
        S: Read,
    {
        let mut input = ByteOrdered::be(input);

        let num_chars_orig_filename: i32 = input.read_i32()?; // Length of following string.
        let _orig_filename = read_fixed_length_string(&mut input, num_chars_orig_filename as usize)?;
        let num_colortable_entries: i32 = input.read_i32()?; // Yes, it is stored twice. Once here, once before.
        if num_colortable_entries < 0 {
            return Err(NeuroformatsError::UnsupportedFsAnnotFormatVersion);
        }

        let mut ct = FsAnnotColortable::with_capacity(num_colortable_entries as usize);
        for _ in 0..num_colortable_entries {
            let id = input.read_i32()?;
            let num_chars_region_name: i32 = input.read_i32()?;
            let name = read_fixed_length_string(&mut input, num_chars_region_name as usize)?;
            let (r, g, b, a) = (input.read_i32()?, input.read_i32()?, input.read_i32()?, input.read_i32()?);
            ct.push(id, name, r, g, b, a);
        }
        Ok(ct)
    }

    /// Read a colortable in the old format, which has no version field. The reader must be positioned directly after the entry count.
    fn from_reader_old<S>(input: &mut S, num_colortable_entries: i32) -> Result<FsAnnotColortable>
    where
        S: Read,
    {
        let mut input = ByteOrdered::be(input);

        let num_chars_orig_filename: i32 = input.read_i32()?;
        let _orig_filename = read_fixed_length_string(&mut input, num_chars_orig_filename as usize)?;

        let mut ct = FsAnnotColortable::with_capacity(num_colortable_entries as usize);
        for idx in 0..num_colortable_entries {
            let num_chars_region_name: i32 = input.read_i32()?;
            let name = read_fixed_length_string(&mut input, num_chars_region_name as usize)?;
            let (r, g, b, a) = (input.read_i32()?, input.read_i32()?, input.read_i32()?, input.read_i32()?);
            ct.push(idx, name, r, g, b, a);
        }
        Ok(ct)
    }

    fn with_capacity(n: usize) -> FsAnnotColortable {
        FsAnnotColortable {
            id: Vec::with_capacity(n),
            name: Vec::with_capacity(n),
            r: Vec::with_capacity(n),
            g: Vec::with_capacity(n),
            b: Vec::with_capacity(n),
            a: Vec::with_capacity(n),
            label: Vec::with_capacity(n),
        }
    }

    /// Append a region. Its packed label code is computed from the color.
    pub fn push<N: Into<String>>(&mut self, id: i32, name: N, r: i32, g: i32, b: i32, a: i32) {
        self.id.push(id);
        self.name.push(name.into());
        self.r.push(r);
        self.g.push(g);
        self.b.push(b);
        self.a.push(a);
        self.label.push(packed_color_code(r, g, b, a));
    }

    pub fn num_entries(&self) -> usize {
        self.name.len()
    }

    /// The index of the region with the given packed color code, if any.
    pub fn index_of_label(&self, code: i32) -> Option<usize> {
        self.label.iter().position(|l| *l == code)
    }

    /// The index of the region with the given name, if any.
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.name.iter().position(|n| n == name)
    }

    /// The RGBA color of the region at the given index.
    pub fn rgba(&self, idx: usize) -> [i32; 4] {
        [self.r[idx], self.g[idx], self.b[idx], self.a[idx]]
    }

    fn to_writer<W: Write>(&self, output: W) -> Result<()> {
        let mut output = ByteOrdered::be(output);
        let num_entries = self.num_entries() as i32;
        output.write_i32(COLORTABLE_VERSION_2)?;
        output.write_i32(num_entries)?;
        let orig_filename = b"neuroload.ctab\0";
        output.write_i32(orig_filename.len() as i32)?;
        output.write_all(orig_filename)?;
        output.write_i32(num_entries)?;
        for idx in 0..self.num_entries() {
            output.write_i32(self.id[idx])?;
            let name = self.name[idx].as_bytes();
            output.write_i32(name.len() as i32 + 1)?;
            output.write_all(name)?;
            output.write_u8(0)?;
            for c in self.rgba(idx).iter() {
                output.write_i32(*c)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for FsAnnotColortable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Colortable for {} brain regions.", self.id.len())
    }
}


/// Models a FreeSurfer brain surface parcellation from an annot file. This is the result of applying a brain atlas (like Desikan-Killiani) to a subject. The `vertex_indices` are the 0-based indices used in FreeSurfer. The `vertex_labels` field contains the packed color code of the region for each vertex, see [`FsAnnotColortable::label`]. Use [`FsAnnot::vertex_label_indices`] to get the colortable index for each vertex instead.
#[derive(Debug, Clone, PartialEq)]
pub struct FsAnnot {
    pub vertex_indices: Vec<i32>,
    pub vertex_labels: Vec<i32>,
    pub colortable: FsAnnotColortable,
}

impl FsAnnot {
    /// Read an FsAnnot instance from a file. GZip-compressed files ending with ".gz" are supported.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsAnnot> {
        let gz = is_gz_file(&path);
        let mut input = open_reader(path, gz)?;
        FsAnnot::from_reader(&mut input)
    }

    /// Read an FsAnnot instance from a reader positioned at the start of the annot data.
    pub fn from_reader<S>(input: &mut S) -> Result<FsAnnot>
    where
        S: Read,
    {
        let mut file = ByteOrdered::be(input);

        let num_vertices: i32 = file.read_i32()?;
        if num_vertices < 0 {
            return Err(NeuroformatsError::UnsupportedFsAnnotFormatVersion);
        }

        let mut vertex_indices: Vec<i32> = Vec::with_capacity(num_vertices as usize);
        let mut vertex_labels: Vec<i32> = Vec::with_capacity(num_vertices as usize);
        for _ in 0..num_vertices {
            vertex_indices.push(file.read_i32()?);
            vertex_labels.push(file.read_i32()?);
        }

        let has_colortable: i32 = file.read_i32()?;
        if has_colortable != 1 {
            return Err(NeuroformatsError::UnsupportedFsAnnotFormatVersion);
        }

        let num_colortable_entries: i32 = file.read_i32()?;

        // If this is negative, the absolute value encodes the colortable format version.
        let colortable = if num_colortable_entries > 0 {
            FsAnnotColortable::from_reader_old(file.inner_mut(), num_colortable_entries)?
        } else if num_colortable_entries == COLORTABLE_VERSION_2 {
            let _num_colortable_entries: i32 = file.read_i32()?; // The max structure id, not needed.
            FsAnnotColortable::from_reader(file.inner_mut())?
        } else {
            return Err(NeuroformatsError::UnsupportedFsAnnotFormatVersion);
        };

        Ok(FsAnnot {
            vertex_indices,
            vertex_labels,
            colortable,
        })
    }

    /// Create a parcellation from resolved region indices. Vertices with a negative index are unlabeled.
    pub fn from_label_indices(label_indices: &[i32], colortable: FsAnnotColortable) -> Result<FsAnnot> {
        let mut vertex_labels = Vec::with_capacity(label_indices.len());
        for idx in label_indices {
            if *idx < 0 {
                vertex_labels.push(-1);
            } else if (*idx as usize) < colortable.num_entries() {
                vertex_labels.push(colortable.label[*idx as usize]);
            } else {
                return Err(NeuroformatsError::InvalidArgument(format!("Label index {} exceeds the {} colortable entries.", idx, colortable.num_entries())));
            }
        }
        Ok(FsAnnot {
            vertex_indices: (0..label_indices.len() as i32).collect(),
            vertex_labels,
            colortable,
        })
    }

    /// Get the region names contained in the [`FsAnnot`] struct.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let annot = neuroload::read_annot("/path/to/subjects_dir/subject1/label/lh.aparc.annot").unwrap();
    /// annot.regions();
    /// ```
    pub fn regions(&self) -> Vec<String> {
        self.colortable.name.clone()
    }

    pub fn num_regions(&self) -> usize {
        self.colortable.num_entries()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertex_labels.len()
    }

    /// The packed color codes as stored in the file, one per vertex.
    pub fn orig_ids(&self) -> &[i32] {
        &self.vertex_labels
    }

    /// The colortable index of the region of each vertex, or `-1` for vertices without a region.
    ///
    /// All vertices sharing a packed code share the resulting index.
    pub fn vertex_label_indices(&self) -> Vec<i32> {
        self.vertex_labels
            .iter()
            .map(|code| match self.colortable.index_of_label(*code) {
                Some(idx) => idx as i32,
                None => -1,
            })
            .collect()
    }

    /// Get the indices of all vertices which are part of the given brain region.
    ///
    /// Note that it can happen that no vertices are assigned to the region, in which case the result vector is empty.
    /// An unknown region name is an error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let annot = neuroload::read_annot("/path/to/subjects_dir/subject1/label/lh.aparc.annot").unwrap();
    /// let verts = annot.region_vertices("bankssts").unwrap();
    /// ```
    pub fn region_vertices(&self, region: &str) -> Result<Vec<usize>> {
        let region_idx = self.colortable.index_of_name(region)
            .ok_or_else(|| NeuroformatsError::InvalidArgument(format!("No region '{}' in annotation.", region)))?;
        let region_label = self.colortable.label[region_idx];

        Ok(self.vertex_labels
            .iter()
            .enumerate()
            .filter(|(_, vlabel)| **vlabel == region_label)
            .map(|(idx, _)| idx)
            .collect())
    }

    /// Get the region name for all annot vertices. Vertices without a region get `None`.
    pub fn vertex_regions(&self) -> Vec<Option<&str>> {
        self.vertex_label_indices()
            .iter()
            .map(|idx| if *idx < 0 { None } else { Some(self.colortable.name[*idx as usize].as_str()) })
            .collect()
    }

    /// Get the vertex colors for all annot vertices as u8 RGB(A) values.
    ///
    /// The vertex colors are represented as 3 RGB values per vertex if `alpha` is `false`, and as 4 RGBA values per vertex if `alpha` is `true`.
    ///
    /// # Parameters
    ///
    /// * `alpha`: whether to return the alpha channel value.
    /// * `unmatched_region_index`: Determines the region and thus the color that is used for unassigned vertices. Typically they are assigned to an `unknown` region, which should be at the start of the colortable (at index `0`).
    ///
    /// An `unmatched_region_index` that is out of range is an error.
    pub fn vertex_colors(&self, alpha: bool, unmatched_region_index: usize) -> Result<Vec<u8>> {
        if unmatched_region_index >= self.num_regions() {
            return Err(NeuroformatsError::InvalidArgument(format!("Region index {} out of range for {} regions.", unmatched_region_index, self.num_regions())));
        }
        let capacity = if alpha { self.vertex_labels.len() * 4 } else { self.vertex_labels.len() * 3 };
        let mut vert_colors: Vec<u8> = Vec::with_capacity(capacity);

        for idx in self.vertex_label_indices() {
            let ct_region_idx = if idx < 0 { unmatched_region_index } else { idx as usize };
            let rgba = self.colortable.rgba(ct_region_idx);
            let num_channels = if alpha { 4 } else { 3 };
            vert_colors.extend(rgba[..num_channels].iter().map(|c| *c as u8));
        }
        Ok(vert_colors)
    }
}


/// Unlabeled vertices get the color of the first region, or black for an empty colortable.
impl VertexColor for FsAnnot {
    fn vertex_color_rgb(&self) -> Vec<u8> {
        self.vertex_colors(false, 0).unwrap_or_else(|_| vec![0; self.num_vertices() * 3])
    }

    fn vertex_color_rgba(&self) -> Vec<u8> {
        self.vertex_colors(true, 0).unwrap_or_else(|_| vec![0; self.num_vertices() * 4])
    }
}


impl fmt::Display for FsAnnot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Surface parcellation assigning {} vertices to {} brain regions.", self.vertex_indices.len(), self.colortable.id.len())
    }
}


/// Read a brain parcellation from a FreeSurfer annot file.
///
/// A parcellation assigns each vertex of a brain surface mesh to exactly one brain region.
/// The colortable contains data on the regions, including the region's
/// name, an RGB display color, and a unique identifier. A parcellation is the result of
/// applying a brain atlas to the brain surface reconstruction of a subject.
///
/// # Examples
///
/// ```no_run
/// let annot = neuroload::read_annot("/path/to/subjects_dir/subject1/label/lh.aparc.annot").unwrap();
/// println!("Annotation assigns the {} brain mesh vertices to {} different regions.", annot.vertex_indices.len(), annot.regions().len());
/// ```
pub fn read_annot<P: AsRef<Path>>(path: P) -> Result<FsAnnot> {
    FsAnnot::from_file(path)
}


/// Write a parcellation to a FreeSurfer annot file, using colortable format version 2.
pub fn write_annot<P: AsRef<Path>>(path: P, annot: &FsAnnot) -> Result<()> {
    if annot.vertex_indices.len() != annot.vertex_labels.len() {
        return Err(NeuroformatsError::Validation(format!("Annotation has {} vertex indices but {} labels.", annot.vertex_indices.len(), annot.vertex_labels.len())));
    }
    let gz = is_gz_file(&path);
    let mut output = ByteOrdered::be(open_writer(path, gz)?);

    output.write_i32(annot.vertex_labels.len() as i32)?;
    for (idx, label) in annot.vertex_indices.iter().zip(annot.vertex_labels.iter()) {
        output.write_i32(*idx)?;
        output.write_i32(*label)?;
    }
    output.write_i32(1)?;
    annot.colortable.to_writer(output.inner_mut())?;
    output.flush()?;
    Ok(())
}


/// Generate a boolean mask of length `num_verts_total` that is `true` for the vertices in `verts_in_label`.
///
/// With `invert`, the mask is `false` for the vertices in the label and `true` everywhere else.
pub fn label_to_mask(verts_in_label: &[usize], num_verts_total: usize, invert: bool) -> Result<Vec<bool>> {
    if num_verts_total < verts_in_label.len() {
        return Err(NeuroformatsError::InvalidArgument(format!("Argument num_verts_total is {} but must be at least the length of verts_in_label, which is {}.", num_verts_total, verts_in_label.len())));
    }
    let mut mask = vec![invert; num_verts_total];
    for v in verts_in_label {
        match mask.get_mut(*v) {
            Some(m) => *m = !invert,
            None => return Err(NeuroformatsError::InvalidArgument(format!("Vertex index {} out of range for {} vertices.", v, num_verts_total))),
        }
    }
    Ok(mask)
}


/// Return a copy of `data` in which all values of vertices not in `verts_in_label` are set to NaN.
///
/// With `invert`, the values of the vertices in the label are set to NaN instead.
pub fn mask_data_using_label(data: &[f32], verts_in_label: &[usize], invert: bool) -> Result<Vec<f32>> {
    let mask = label_to_mask(verts_in_label, data.len(), invert)?;
    Ok(data.iter().zip(mask.iter()).map(|(v, keep)| if *keep { *v } else { f32::NAN }).collect())
}


/// Descriptive statistics of the per-vertex values in one region. All values are NaN for regions without vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub region: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
}

impl RegionStats {
    fn empty(region: &str) -> RegionStats {
        RegionStats {
            region: region.to_string(),
            count: 0,
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
            std: f64::NAN,
            median: f64::NAN,
            q25: f64::NAN,
            q75: f64::NAN,
        }
    }

    /// Compute the stats over the given values. NaN values are ignored.
    pub fn from_values(region: &str, values: &[f32]) -> RegionStats {
        let mut values: Array1<f64> = values.iter().filter(|v| !v.is_nan()).map(|v| *v as f64).collect();
        let count = values.len();
        let mean = match values.mean() {
            Some(m) => m,
            None => return RegionStats::empty(region),
        };
        let std = values.std(0.0);
        let min = *values.min_skipnan();
        let max = *values.max_skipnan();
        let mut quantile = |q: f64| -> f64 {
            values.quantile_axis_skipnan_mut(Axis(0), n64(q), &Linear)
                .map(|a| a.into_scalar())
                .unwrap_or(f64::NAN)
        };
        let q25 = quantile(0.25);
        let median = quantile(0.5);
        let q75 = quantile(0.75);

        RegionStats {
            region: region.to_string(),
            count,
            min,
            max,
            mean,
            std,
            median,
            q25,
            q75,
        }
    }
}


/// Compute [`RegionStats`] of the per-vertex `data` for every region of the parcellation, in colortable order.
///
/// The `data` must contain one value per annotated vertex.
pub fn region_stats(annot: &FsAnnot, data: &[f32]) -> Result<Vec<RegionStats>> {
    if data.len() != annot.num_vertices() {
        return Err(NeuroformatsError::Validation(format!("Data has {} values, but the annotation covers {} vertices.", data.len(), annot.num_vertices())));
    }
    let mut per_region: Vec<Vec<f32>> = vec![Vec::new(); annot.num_regions()];
    for (value, idx) in data.iter().zip(annot.vertex_label_indices()) {
        if idx >= 0 {
            per_region[idx as usize].push(*value);
        }
    }
    Ok(annot.colortable.name
        .iter()
        .zip(per_region.iter())
        .map(|(name, values)| RegionStats::from_values(name, values))
        .collect())
}
