// Functions for managing FreeSurfer brain surface meshes in binary 'surf' files.
// These files store a triangular mesh, where each vertex if defined by its x,y,z coord and
// each face is defined by 3 vertices, stored as 3 indices into the vertices.


use byteordered::ByteOrdered;

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{NeuroformatsError, Result};
use crate::util::{fs_int24_bytes, interpret_fs_int24, is_gz_file, open_reader, open_writer};

pub const TRIS_MAGIC_FILE_TYPE_NUMBER: i32 = 16777214;

/// Upper bound for the number of values reserved up front. Larger meshes grow while reading.
const MAX_PREALLOCATED_VALUES: usize = 1 << 24;

#[derive(Debug, Clone, PartialEq)]
pub struct FsSurfaceHeader {
    pub surf_magic: [u8; 3],
    pub info_line: String,
    pub num_vertices: i32,
    pub num_faces: i32,
}


impl Default for FsSurfaceHeader {
    fn default() -> FsSurfaceHeader {
        FsSurfaceHeader {
            surf_magic: fs_int24_bytes(TRIS_MAGIC_FILE_TYPE_NUMBER),
            info_line: String::from(""),
            num_vertices: 0,
            num_faces: 0
        }
    }
}

impl FsSurfaceHeader {

    /// Read an FsSurface header from a file.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding. This is not typically the case
    /// for FreeSurfer Surf files, but very handy (and it helps us to reduce the size of our test data).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsSurfaceHeader> {
        let gz = is_gz_file(&path);
        let mut input = open_reader(path, gz)?;
        FsSurfaceHeader::from_reader(&mut input)
    }


    /// Read an FsSurface header from the given byte stream.
    /// It is assumed that the input is currently at the start of the
    /// FsSurface header. The two info lines are consumed as well.
    pub fn from_reader<S>(input: &mut S) -> Result<FsSurfaceHeader>
    where
        S: Read,
    {
        let mut hdr = FsSurfaceHeader::default();

        let mut input = ByteOrdered::be(input);

        for v in &mut hdr.surf_magic {
            *v = input.read_u8()?;
        }

        let magic: i32 = interpret_fs_int24(hdr.surf_magic[0], hdr.surf_magic[1], hdr.surf_magic[2]);
        if magic != TRIS_MAGIC_FILE_TYPE_NUMBER {
            return Err(NeuroformatsError::InvalidFsSurfaceFormat);
        }

        // The info line is terminated by two newline chars. We keep everything up to them.
        let mut info_line = String::new();
        let mut last_char = '\0';
        loop {
            let cur_char = input.read_u8()? as char;
            if cur_char == '\n' && last_char == '\n' {
                break;
            }
            info_line.push(cur_char);
            last_char = cur_char;
        }
        info_line.pop();

        hdr.info_line = info_line;
        hdr.num_vertices = input.read_i32()?;
        hdr.num_faces = input.read_i32()?;

        if hdr.num_vertices < 0 || hdr.num_faces < 0 {
            return Err(NeuroformatsError::InvalidFsSurfaceFormat);
        }
        Ok(hdr)
    }
}


/// An FsSurface object
#[derive(Debug, PartialEq, Clone)]
pub struct FsSurface {
    pub header: FsSurfaceHeader,
    pub mesh: BrainMesh,
}

/// A triangular brain mesh.
///
/// The vertices are stored as a flat vector of x,y,z coordinates (3 values per vertex), the faces as a flat vector of
/// 0-based vertex indices (3 values per face).
#[derive(Debug, PartialEq, Clone, Default)]
pub struct BrainMesh {
    pub vertices: Vec<f32>,
    pub faces: Vec<i32>,
}


pub fn read_surf<P: AsRef<Path>>(path: P) -> Result<FsSurface> {
    FsSurface::from_file(path)
}


impl FsSurface {
    /// Read an FsSurface instance from a file.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding. This is not typically the case
    /// for FreeSurfer Surface files, but very handy (and it helps us to reduce the size of our test data).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsSurface> {
        let gz = is_gz_file(&path);
        let mut input = open_reader(path, gz)?;
        FsSurface::from_reader(&mut input)
    }

    /// Read an FsSurface from a byte stream which is positioned at the start of the file.
    pub fn from_reader<S>(input: &mut S) -> Result<FsSurface>
    where
        S: Read,
    {
        let hdr = FsSurfaceHeader::from_reader(input)?;
        let mesh = FsSurface::mesh_from_reader(input, &hdr)?;
        Ok(FsSurface {
            header: hdr,
            mesh,
        })
    }

    /// Read the vertex and face data. The input must be positioned directly after the header.
    pub fn mesh_from_reader<S>(input: &mut S, hdr: &FsSurfaceHeader) -> Result<BrainMesh>
    where
        S: Read,
    {
        let mut input = ByteOrdered::be(input);

        let num_vertex_values = (hdr.num_vertices as usize).checked_mul(3).ok_or(NeuroformatsError::InvalidFsSurfaceFormat)?;
        let num_face_values = (hdr.num_faces as usize).checked_mul(3).ok_or(NeuroformatsError::InvalidFsSurfaceFormat)?;

        let mut vertex_data : Vec<f32> = Vec::with_capacity(num_vertex_values.min(MAX_PREALLOCATED_VALUES));
        for _ in 0..num_vertex_values {
            vertex_data.push(input.read_f32()?);
        }

        let mut face_data : Vec<i32> = Vec::with_capacity(num_face_values.min(MAX_PREALLOCATED_VALUES));
        for _ in 0..num_face_values {
            face_data.push(input.read_i32()?);
        }

        let mesh = BrainMesh {
            vertices : vertex_data,
            faces : face_data
        };
        mesh.validate()?;
        Ok(mesh)
    }
}


/// Write a mesh to a FreeSurfer surf file in triangle format. If the file name ends with ".gz", the output is compressed.
pub fn write_surf<P: AsRef<Path>>(path: P, mesh: &BrainMesh) -> Result<()> {
    let gz = is_gz_file(&path);
    let mut output = open_writer(path, gz)?;
    write_surf_to(&mut output, mesh)?;
    output.flush()?;
    Ok(())
}

fn write_surf_to<W: Write>(output: &mut W, mesh: &BrainMesh) -> Result<()> {
    let mut output = ByteOrdered::be(output);
    for b in fs_int24_bytes(TRIS_MAGIC_FILE_TYPE_NUMBER).iter() {
        output.write_u8(*b)?;
    }
    output.write_all(b"created by neuroload\n\n")?;
    output.write_i32(mesh.num_vertices() as i32)?;
    output.write_i32(mesh.num_faces() as i32)?;
    for v in mesh.vertices.iter() {
        output.write_f32(*v)?;
    }
    for f in mesh.faces.iter() {
        output.write_i32(*f)?;
    }
    Ok(())
}


impl BrainMesh {

    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len() / 3
    }

    /// The x,y,z coordinates of the vertex at the given index.
    pub fn vertex(&self, idx: usize) -> [f32; 3] {
        [self.vertices[idx * 3], self.vertices[idx * 3 + 1], self.vertices[idx * 3 + 2]]
    }

    /// The 3 vertex indices of the face at the given index.
    pub fn face(&self, idx: usize) -> [usize; 3] {
        [self.faces[idx * 3] as usize, self.faces[idx * 3 + 1] as usize, self.faces[idx * 3 + 2] as usize]
    }

    /// Check that every face references an existing vertex.
    pub fn validate(&self) -> Result<()> {
        let nv = self.num_vertices() as i32;
        if self.vertices.len() % 3 != 0 || self.faces.len() % 3 != 0 {
            return Err(NeuroformatsError::Validation(String::from("Mesh vertex and face vectors must contain 3 values per element.")));
        }
        if let Some(bad) = self.faces.iter().find(|&&f| f < 0 || f >= nv) {
            return Err(NeuroformatsError::Validation(format!("Face references vertex {} but the mesh has only {} vertices.", bad, nv)));
        }
        Ok(())
    }

    /// Append another mesh to this one.
    ///
    /// The vertices of `other` are appended after the vertices of `self`, and the face indices of `other` are
    /// shifted by the vertex count of `self` so they keep referencing the same vertices.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let lh = neuroload::read_surf("/path/to/subjects_dir/subject1/surf/lh.white").unwrap();
    /// let rh = neuroload::read_surf("/path/to/subjects_dir/subject1/surf/rh.white").unwrap();
    /// let brain = lh.mesh.merge(&rh.mesh);
    /// assert_eq!(brain.num_vertices(), lh.mesh.num_vertices() + rh.mesh.num_vertices());
    /// ```
    pub fn merge(&self, other: &BrainMesh) -> BrainMesh {
        merge_meshes(&[self, other])
    }

    /// The area of every face, in face order.
    pub fn face_areas(&self) -> Vec<f32> {
        (0..self.num_faces())
            .map(|fidx| {
                let [a, b, c] = self.face(fidx);
                face_area(self.vertex(a), self.vertex(b), self.vertex(c))
            })
            .collect()
    }

    /// Mean of all vertex coordinates, or `None` for an empty mesh.
    pub fn center(&self) -> Option<[f32; 3]> {
        let nv = self.num_vertices();
        if nv == 0 {
            return None;
        }
        let mut sum = [0f64; 3];
        for chunk in self.vertices.chunks(3) {
            for dim in 0..3 {
                sum[dim] += chunk[dim] as f64;
            }
        }
        Some([(sum[0] / nv as f64) as f32, (sum[1] / nv as f64) as f32, (sum[2] / nv as f64) as f32])
    }

    /// Adjacency lists of the undirected edge graph implied by the faces.
    pub fn adjacency(&self) -> Vec<BTreeSet<usize>> {
        let mut adj: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.num_vertices()];
        for fidx in 0..self.num_faces() {
            let [a, b, c] = self.face(fidx);
            for &(u, v) in [(a, b), (b, c), (c, a)].iter() {
                adj[u].insert(v);
                adj[v].insert(u);
            }
        }
        adj
    }

    /// All vertices reachable from `source` along at most `max_hops` mesh edges, including `source` itself.
    ///
    /// The result is sorted by vertex index. An out of range `source` yields an empty vector.
    pub fn neighbors_up_to_dist(&self, source: usize, max_hops: usize) -> Vec<usize> {
        if source >= self.num_vertices() {
            return Vec::new();
        }
        let adj = self.adjacency();
        let mut hops: Vec<Option<usize>> = vec![None; self.num_vertices()];
        hops[source] = Some(0);
        let mut queue = VecDeque::new();
        queue.push_back(source);
        while let Some(u) = queue.pop_front() {
            let du = hops[u].unwrap_or(0);
            if du == max_hops {
                continue;
            }
            for &v in adj[u].iter() {
                if hops[v].is_none() {
                    hops[v] = Some(du + 1);
                    queue.push_back(v);
                }
            }
        }
        hops.iter().enumerate().filter(|(_, d)| d.is_some()).map(|(idx, _)| idx).collect()
    }
}

impl fmt::Display for BrainMesh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Brain trimesh with {} vertices and {} faces.", self.num_vertices(), self.num_faces())
    }
}


/// Concatenate meshes in order.
///
/// The face indices of each mesh are shifted by the number of vertices of all meshes before it. With
/// the left hemisphere first, this is the standard way to build a whole-brain mesh.
pub fn merge_meshes(meshes: &[&BrainMesh]) -> BrainMesh {
    let total_verts: usize = meshes.iter().map(|m| m.vertices.len()).sum();
    let total_faces: usize = meshes.iter().map(|m| m.faces.len()).sum();
    let mut vertices: Vec<f32> = Vec::with_capacity(total_verts);
    let mut faces: Vec<i32> = Vec::with_capacity(total_faces);

    for mesh in meshes {
        let vertex_index_shift = (vertices.len() / 3) as i32;
        vertices.extend_from_slice(&mesh.vertices);
        faces.extend(mesh.faces.iter().map(|f| f + vertex_index_shift));
    }
    BrainMesh { vertices, faces }
}


/// Area of the 3D triangle with corners a, b and c: half the norm of the cross product of two edges.
pub fn face_area(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> f32 {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let cross = [u[1] * v[2] - u[2] * v[1], u[2] * v[0] - u[0] * v[2], u[0] * v[1] - u[1] * v[0]];
    0.5 * (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt()
}


#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    fn tetrahedron() -> BrainMesh {
        BrainMesh {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            faces: vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
        }
    }

    #[test]
    fn a_written_surf_file_can_be_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lh.white");
        let mesh = tetrahedron();
        write_surf(&path, &mesh).unwrap();

        let surf = read_surf(&path).unwrap();
        assert_eq!(4, surf.header.num_vertices);
        assert_eq!(4, surf.header.num_faces);
        assert_eq!(mesh, surf.mesh);
    }

    #[test]
    fn a_gz_compressed_surf_file_can_be_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lh.white.gz");
        write_surf(&path, &tetrahedron()).unwrap();
        let surf = read_surf(&path).unwrap();
        assert_eq!(12, surf.mesh.faces.len());
    }

    #[test]
    fn a_file_with_wrong_magic_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lh.broken");
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        match read_surf(&path) {
            Err(NeuroformatsError::InvalidFsSurfaceFormat) => {}
            other => panic!("expected InvalidFsSurfaceFormat, got {:?}", other),
        }
    }

    #[test]
    fn a_header_with_huge_counts_and_little_data_fails_to_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lh.truncated");
        let mut bytes = vec![0xFF, 0xFF, 0xFE];
        bytes.extend_from_slice(b"created by test\n\n");
        bytes.extend_from_slice(&i32::MAX.to_be_bytes());
        bytes.extend_from_slice(&i32::MAX.to_be_bytes());
        bytes.extend_from_slice(&1.0f32.to_be_bytes());
        std::fs::write(&path, bytes).unwrap();

        match read_surf(&path) {
            Err(err) => assert!(err.is_io()),
            Ok(surf) => panic!("expected an I/O error, got a mesh with {} vertices", surf.mesh.num_vertices()),
        }
    }

    #[test]
    fn merged_mesh_faces_are_shifted_by_first_vertex_count() {
        let lh = tetrahedron();
        let rh = BrainMesh {
            vertices: vec![5.0, 5.0, 5.0, 6.0, 5.0, 5.0, 5.0, 6.0, 5.0],
            faces: vec![0, 1, 2],
        };
        let both = lh.merge(&rh);

        assert_eq!(7, both.num_vertices());
        assert_eq!(5, both.num_faces());
        assert_eq!(&lh.faces[..], &both.faces[..12]);
        assert_eq!(&[4, 5, 6], &both.faces[12..]);
        assert!(both.faces.iter().all(|&f| f >= 0 && (f as usize) < both.num_vertices()));
        assert_eq!([5.0, 6.0, 5.0], both.vertex(6));
        both.validate().unwrap();
    }

    #[test]
    fn merging_no_meshes_gives_an_empty_mesh() {
        let merged = merge_meshes(&[]);
        assert_eq!(0, merged.num_vertices());
        assert_eq!(None, merged.center());
    }

    #[test]
    fn face_area_is_half_the_cross_product_norm() {
        assert_abs_diff_eq!(12.5, face_area([0.0, 0.0, 0.0], [5.0, 0.0, 0.0], [5.0, 5.0, 0.0]), epsilon = 1e-5);

        let mesh = BrainMesh {
            vertices: vec![0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 5.0, 5.0, 0.0, 10.0, 0.0, 0.0],
            faces: vec![0, 1, 2, 1, 2, 3],
        };
        let areas = mesh.face_areas();
        assert_eq!(2, areas.len());
        assert_abs_diff_eq!(12.5, areas[0], epsilon = 1e-5);
        assert_abs_diff_eq!(12.5, areas[1], epsilon = 1e-5);
    }

    #[test]
    fn invalid_face_indices_are_detected() {
        let mesh = BrainMesh { vertices: vec![0.0; 6], faces: vec![0, 1, 2] };
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn neighborhoods_grow_with_hop_count() {
        // A strip of triangles: 0-1-2, 1-2-3, 2-3-4
        let mesh = BrainMesh {
            vertices: vec![0.0; 15],
            faces: vec![0, 1, 2, 1, 2, 3, 2, 3, 4],
        };
        assert_eq!(vec![0], mesh.neighbors_up_to_dist(0, 0));
        assert_eq!(vec![0, 1, 2], mesh.neighbors_up_to_dist(0, 1));
        assert_eq!(vec![0, 1, 2, 3, 4], mesh.neighbors_up_to_dist(0, 2));
        assert!(mesh.neighbors_up_to_dist(99, 2).is_empty());
    }
}
