//! Generation of volume and per-vertex data which marks selected voxels or vertices, for display in 3D viewers.

use ndarray::Array3;

use std::fs;
use std::path::Path;

use crate::error::{NeuroformatsError, Result};
use crate::traits::VertexColor;


/// The default color of unmarked vertices, a light gray.
pub const DEFAULT_BACKGROUND_RGB: [u8; 3] = [200, 200, 200];


/// Create a volume of the given shape filled with `background_value`, in which the voxels of each mark are set to the mark value.
///
/// Later marks overwrite earlier ones. A voxel index outside the volume is an error.
///
/// # Examples
///
/// ```
/// let (low, high) = ([[1, 2, 3], [0, 0, 0]], [[4, 4, 4]]);
/// let vol = neuroload::volume_with_marks(&[(&low[..], 40), (&high[..], 160)], 0, [5, 5, 5]).unwrap();
/// assert_eq!(160, vol[[4, 4, 4]]);
/// ```
pub fn volume_with_marks(marks: &[(&[[usize; 3]], u8)], background_value: u8, shape: [usize; 3]) -> Result<Array3<u8>> {
    let mut volume = Array3::<u8>::from_elem((shape[0], shape[1], shape[2]), background_value);
    for (voxels, value) in marks {
        for v in voxels.iter() {
            match volume.get_mut((v[0], v[1], v[2])) {
                Some(target) => *target = *value,
                None => return Err(NeuroformatsError::InvalidArgument(format!("Voxel {:?} is outside of the volume with shape {:?}.", v, shape))),
            }
        }
    }
    Ok(volume)
}


/// One RGB color per vertex of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexOverlay {
    pub colors: Vec<[u8; 3]>,
}

impl VertexOverlay {
    pub fn num_vertices(&self) -> usize {
        self.colors.len()
    }
}

impl VertexColor for VertexOverlay {
    fn vertex_color_rgb(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.iter().copied()).collect()
    }

    fn vertex_color_rgba(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| [c[0], c[1], c[2], 255]).collect()
    }
}


/// Color all `num_verts` vertices with `background_rgb`, then the vertices of each mark with the mark color.
pub fn vertex_overlay_colors(num_verts: usize, marks: &[(&[usize], [u8; 3])], background_rgb: [u8; 3]) -> Result<VertexOverlay> {
    let mut colors = vec![background_rgb; num_verts];
    for (vertices, rgb) in marks {
        for idx in vertices.iter() {
            match colors.get_mut(*idx) {
                Some(target) => *target = *rgb,
                None => return Err(NeuroformatsError::InvalidArgument(format!("Vertex index {} out of range for {} vertices.", idx, num_verts))),
            }
        }
    }
    Ok(VertexOverlay { colors })
}


/// Write an overlay as text with one `r, g, b` line per vertex.
pub fn write_rgb_overlay<P: AsRef<Path>>(path: P, overlay: &VertexOverlay) -> Result<()> {
    let mut contents = String::with_capacity(overlay.num_vertices() * 14);
    for c in overlay.colors.iter() {
        contents.push_str(&format!("{}, {}, {}\n", c[0], c[1], c[2]));
    }
    fs::write(path, contents)?;
    Ok(())
}
