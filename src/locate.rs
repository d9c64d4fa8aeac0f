//! Localization of query points in brain meshes and segmentation volumes.
//!
//! [`BrainLocate`] finds the mesh vertex closest to a point. [`BrainVoxLocate`] maps points to the voxels of a
//! segmentation volume (like `mri/aseg.mgz`), and finds the closest voxel which is assigned to a brain structure.

use ndarray::{Array2, ArrayView2};

use std::cmp::Ordering;
use std::path::Path;

use crate::error::{NeuroformatsError, Result};
use crate::fs_lut::{read_lut, FsColorLut, UNKNOWN_CODE};
use crate::fs_mgh::{read_mgh, FsMgh};
use crate::fs_surface::BrainMesh;
use crate::spatial::{apply_affine, Affine};


fn euclidean_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

fn check_coords_shape(coords: &ArrayView2<f64>) -> Result<()> {
    if coords.ncols() != 3 {
        return Err(NeuroformatsError::InvalidArgument(format!("Query coordinates must have shape (n, 3) but have {} columns.", coords.ncols())));
    }
    Ok(())
}


/// Finds the vertices of a mesh closest to query coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BrainLocate {
    pub mesh: BrainMesh,
}

impl BrainLocate {
    pub fn new(mesh: BrainMesh) -> BrainLocate {
        BrainLocate { mesh }
    }

    /// For each row of the `(n, 3)` query coordinates, the index of the closest vertex and its Euclidean distance.
    ///
    /// If several vertices have the same distance, the one with the lowest index is reported.
    pub fn closest_vertex_and_distance(&self, query_coords: ArrayView2<f64>) -> Result<Vec<(usize, f64)>> {
        check_coords_shape(&query_coords)?;
        if self.mesh.num_vertices() == 0 {
            return Err(NeuroformatsError::Validation(String::from("Cannot locate vertices in a mesh without vertices.")));
        }
        let result = query_coords.outer_iter().map(|q| {
            let q = [q[0], q[1], q[2]];
            let mut best = (0usize, f64::INFINITY);
            for idx in 0..self.mesh.num_vertices() {
                let v = self.mesh.vertex(idx);
                let dist = euclidean_distance([v[0] as f64, v[1] as f64, v[2] as f64], q);
                if dist < best.1 {
                    best = (idx, dist);
                }
            }
            best
        }).collect();
        Ok(result)
    }

    /// For each row of the `(n, 3)` query coordinates, the index of the closest vertex.
    pub fn closest_vertex(&self, query_coords: ArrayView2<f64>) -> Result<Vec<usize>> {
        Ok(self.closest_vertex_and_distance(query_coords)?.into_iter().map(|(idx, _)| idx).collect())
    }
}


/// Result of a search for the closest voxel which is assigned to a brain structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledVoxel {
    /// The voxel index (CRS), or `[-1, -1, -1]` if no labeled voxel was found.
    pub voxel: [i64; 3],
    /// The RAS coordinates of the voxel. NaN if no labeled voxel was found.
    pub ras: [f64; 3],
    /// The segmentation code of the voxel, or `-1`.
    pub code: i32,
    /// The distance between the query point and the voxel in RAS space, or `-1.0`.
    pub distance: f64,
}

impl LabeledVoxel {
    /// The result reported when the searched neighborhood contains no labeled voxel.
    pub fn not_found() -> LabeledVoxel {
        LabeledVoxel { voxel: [-1, -1, -1], ras: [f64::NAN; 3], code: -1, distance: -1.0 }
    }

    pub fn is_found(&self) -> bool {
        self.code >= 0 && self.voxel[0] >= 0
    }
}


/// The index ranges `[start, stop)` along each axis of the cubic neighborhood of `voxel`, clipped to the volume.
///
/// The neighborhood covers `neighborhood_size` voxels in each direction, so a size of 0 covers the voxel itself.
/// The range along an axis is empty if the voxel lies outside the volume by more than the neighborhood size.
pub fn neighborhood_bounds(voxel: [i64; 3], neighborhood_size: usize, dims: [usize; 3]) -> [(usize, usize); 3] {
    let n = neighborhood_size as i64;
    let mut bounds = [(0usize, 0usize); 3];
    for axis in 0..3 {
        let start = (voxel[axis] - n).max(0);
        let stop = (voxel[axis] + n + 1).min(dims[axis] as i64);
        bounds[axis] = if stop > start { (start as usize, stop as usize) } else { (0, 0) };
    }
    bounds
}


/// Finds the brain structures of points in a segmentation volume.
#[derive(Debug, Clone, PartialEq)]
pub struct BrainVoxLocate {
    pub volume: FsMgh,
    pub lookup_table: FsColorLut,
    vox2ras: Affine,
    ras2vox: Affine,
}

impl BrainVoxLocate {
    /// Locate in the given segmentation. The volume header defines the voxel to RAS mapping.
    pub fn new(volume: FsMgh, lookup_table: FsColorLut) -> BrainVoxLocate {
        let vox2ras = volume.header.vox2ras();
        let ras2vox = volume.header.ras2vox();
        BrainVoxLocate { volume, lookup_table, vox2ras, ras2vox }
    }

    /// Load the segmentation volume (e.g., `aseg.mgz`) and the lookup table (e.g., `FreeSurferColorLUT.txt`) from files.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(volume_file: P, lookup_file: Q) -> Result<BrainVoxLocate> {
        Ok(BrainVoxLocate::new(read_mgh(volume_file)?, read_lut(lookup_file)?))
    }

    fn spatial_dims(&self) -> [usize; 3] {
        let d = self.volume.dim();
        [d[0], d[1], d[2]]
    }

    /// The voxel containing the given RAS point. It may lie outside the volume.
    pub fn ras_to_vox(&self, ras: [f64; 3]) -> [i64; 3] {
        let v = apply_affine(ras[0], ras[1], ras[2], &self.ras2vox);
        [v[0].round() as i64, v[1].round() as i64, v[2].round() as i64]
    }

    /// The RAS coordinates of the center of the given voxel.
    pub fn vox_to_ras(&self, voxel: [i64; 3]) -> [f64; 3] {
        apply_affine(voxel[0] as f64, voxel[1] as f64, voxel[2] as f64, &self.vox2ras)
    }

    /// Map all rows of an `(n, 3)` RAS coordinate array to voxel indices.
    pub fn ras_to_vox_3d(&self, coords: ArrayView2<f64>) -> Result<Array2<i64>> {
        check_coords_shape(&coords)?;
        let mut voxels = Array2::<i64>::zeros((coords.nrows(), 3));
        for (idx, row) in coords.outer_iter().enumerate() {
            let v = self.ras_to_vox([row[0], row[1], row[2]]);
            for axis in 0..3 {
                voxels[[idx, axis]] = v[axis];
            }
        }
        Ok(voxels)
    }

    /// The segmentation code of a voxel in the first frame, or `None` if the voxel is outside the volume.
    pub fn voxel_label(&self, voxel: [i64; 3]) -> Option<i32> {
        if voxel.iter().any(|v| *v < 0) {
            return None;
        }
        self.volume.voxel_value([voxel[0] as usize, voxel[1] as usize, voxel[2] as usize, 0]).map(|v| v as i32)
    }

    /// The segmentation codes of the given voxels. Voxels outside the volume get `-1`.
    pub fn voxel_labels(&self, voxels: &[[i64; 3]]) -> Vec<i32> {
        voxels.iter().map(|v| self.voxel_label(*v).unwrap_or(-1)).collect()
    }

    /// The structure names of the given voxels, from the lookup table. `None` for voxels outside the volume and unknown codes.
    pub fn voxel_label_names(&self, voxels: &[[i64; 3]]) -> Vec<Option<&str>> {
        voxels.iter().map(|v| self.voxel_label(*v).and_then(|code| self.lookup_table.name_of(code))).collect()
    }

    /// Find the voxel closest to the given voxel which is assigned to a structure other than `Unknown`.
    ///
    /// The search covers the cubic neighborhood of `neighborhood_size` voxels in each direction (see [`neighborhood_bounds`]).
    /// Distances are measured between voxel centers in RAS space. Among voxels at the same distance, the one with the
    /// lexicographically smallest CRS index wins. If the query voxel is labeled itself, it is returned with distance 0.
    ///
    /// This is a brute force search over all voxels of the neighborhood, so it gets slow for large neighborhoods.
    pub fn closest_labeled_voxel(&self, voxel: [i64; 3], neighborhood_size: usize) -> LabeledVoxel {
        let query_ras = self.vox_to_ras(voxel);
        let bounds = neighborhood_bounds(voxel, neighborhood_size, self.spatial_dims());

        let mut candidates: Vec<([i64; 3], [f64; 3], f64)> = Vec::new();
        for c in bounds[0].0..bounds[0].1 {
            for r in bounds[1].0..bounds[1].1 {
                for s in bounds[2].0..bounds[2].1 {
                    let crs = [c as i64, r as i64, s as i64];
                    let ras = self.vox_to_ras(crs);
                    candidates.push((crs, ras, euclidean_distance(query_ras, ras)));
                }
            }
        }
        candidates.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0)));

        for (crs, ras, distance) in candidates {
            match self.voxel_label(crs) {
                Some(code) if code != UNKNOWN_CODE => return LabeledVoxel { voxel: crs, ras, code, distance },
                _ => {}
            }
        }
        LabeledVoxel::not_found()
    }

    /// Like [`BrainVoxLocate::closest_labeled_voxel`], for the voxel containing a RAS point.
    pub fn closest_labeled_voxel_ras(&self, ras: [f64; 3], neighborhood_size: usize) -> LabeledVoxel {
        self.closest_labeled_voxel(self.ras_to_vox(ras), neighborhood_size)
    }
}
