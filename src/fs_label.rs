//! Functions for reading FreeSurfer label files.
//!
//! A label is a set of vertices (surface label) or voxels (volume label), stored in an ASCII file
//! like `label/lh.cortex.label`. The first line is a comment, the second line holds the number of
//! entries, and each following line contains a vertex index, x, y, z coordinates and a scalar value.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{NeuroformatsError, Result};
use crate::hemi::{Hemi, Hemisphere};
use crate::meta::{hemi_key, MetaData};
use crate::util::{open_writer, record_line, table_fields, whitespace_table_reader};


#[derive(Debug, Clone, PartialEq, Default)]
pub struct FsLabel {
    pub vertex_index: Vec<i32>,
    pub coord1: Vec<f32>,
    pub coord2: Vec<f32>,
    pub coord3: Vec<f32>,
    pub value: Vec<f32>,
}

impl FsLabel {
    /// Parse a label from the contents of an ASCII label file.
    pub fn from_str_contents(contents: &str) -> Result<FsLabel> {
        FsLabel::from_reader(contents.as_bytes())
    }

    /// Parse an ASCII label from a reader positioned at the start of the file.
    pub fn from_reader<R: Read>(input: R) -> Result<FsLabel> {
        let mut rdr = whitespace_table_reader(input);
        let mut num_entries: Option<usize> = None;
        let mut label = FsLabel::default();

        for result in rdr.records() {
            let record = result?;
            let fields = table_fields(&record);
            if fields.is_empty() {
                continue;
            }
            let line = record_line(&record);
            let invalid = |e: &dyn std::fmt::Display| NeuroformatsError::InvalidFsLabelFormat(format!("line {}: {}", line, e));

            if num_entries.is_none() {
                if fields.len() != 1 {
                    return Err(invalid(&"expected the entry count"));
                }
                num_entries = Some(fields[0].parse::<usize>().map_err(|e| invalid(&e))?);
                continue;
            }
            if fields.len() != 5 {
                return Err(invalid(&format!("{} fields, expected 5", fields.len())));
            }
            label.vertex_index.push(fields[0].parse::<i32>().map_err(|e| invalid(&e))?);
            label.coord1.push(fields[1].parse::<f32>().map_err(|e| invalid(&e))?);
            label.coord2.push(fields[2].parse::<f32>().map_err(|e| invalid(&e))?);
            label.coord3.push(fields[3].parse::<f32>().map_err(|e| invalid(&e))?);
            label.value.push(fields[4].parse::<f32>().map_err(|e| invalid(&e))?);
        }

        let num_entries = num_entries.ok_or_else(|| NeuroformatsError::InvalidFsLabelFormat(String::from("missing entry count line")))?;
        if label.vertex_index.len() != num_entries {
            return Err(NeuroformatsError::InvalidFsLabelFormat(format!("header announces {} entries, but file contains {}", num_entries, label.vertex_index.len())));
        }
        Ok(label)
    }

    pub fn len(&self) -> usize {
        self.vertex_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_index.is_empty()
    }

    /// The vertex indices of the label as `usize`. Negative indices are an error.
    pub fn vertices(&self) -> Result<Vec<usize>> {
        self.vertex_index
            .iter()
            .map(|v| {
                if *v < 0 {
                    Err(NeuroformatsError::InvalidFsLabelFormat(format!("negative vertex index {}", v)))
                } else {
                    Ok(*v as usize)
                }
            })
            .collect()
    }
}


/// Read an ASCII FreeSurfer label file.
///
/// # Examples
///
/// ```no_run
/// let label = neuroload::read_label("/path/to/subjects_dir/subject1/label/lh.cortex.label").unwrap();
/// println!("Label contains {} vertices.", label.len());
/// ```
pub fn read_label<P: AsRef<Path>>(path: P) -> Result<FsLabel> {
    FsLabel::from_reader(BufReader::new(File::open(path)?))
}


/// Write a label to an ASCII FreeSurfer label file.
pub fn write_label<P: AsRef<Path>>(path: P, label: &FsLabel) -> Result<()> {
    let n = label.len();
    if label.coord1.len() != n || label.coord2.len() != n || label.coord3.len() != n || label.value.len() != n {
        return Err(NeuroformatsError::Validation(String::from("All label columns must have the same length.")));
    }
    let mut output = open_writer(path, false)?;
    writeln!(output, "#!ascii label , written by neuroload")?;
    writeln!(output, "{}", n)?;
    for idx in 0..n {
        writeln!(output, "{} {:.3} {:.3} {:.3} {:.10}", label.vertex_index[idx], label.coord1[idx], label.coord2[idx], label.coord3[idx], label.value[idx])?;
    }
    output.flush()?;
    Ok(())
}


/// Path of the label file of a subject, e.g., `subjects_dir/subject1/label/lh.cortex.label`.
pub fn label_file_path<P: AsRef<Path>>(subjects_dir: P, subject_id: &str, hemi: Hemisphere, label: &str) -> PathBuf {
    subjects_dir.as_ref().join(subject_id).join("label").join(format!("{}.{}.label", hemi, label))
}


/// Read a label file and record its path in a metadata fragment under `?h.label_file`.
pub fn read_label_md<P: AsRef<Path>>(path: P, hemi: Hemisphere) -> Result<(Vec<usize>, MetaData)> {
    let label = read_label(&path).map_err(|e| e.for_hemi(hemi, path.as_ref()))?;
    let mut meta = MetaData::new();
    meta.insert_hemi(hemi, "label_file", path.as_ref());
    Ok((label.vertices()?, meta))
}


/// Load the vertex indices of a label for one or both hemispheres of a subject.
///
/// For `Hemi::Both`, the rh vertex indices are shifted by the number of lh vertices, so they index into
/// data of both hemispheres concatenated. That number is taken from `meta` (key `lh.num_vertices`, or
/// `lh.num_data_points` as a fallback), which is typically the metadata returned when the data was loaded.
pub fn label<P: AsRef<Path>>(subjects_dir: P, subject_id: &str, label: &str, hemi: Hemi, meta: &MetaData) -> Result<(Vec<usize>, MetaData)> {
    let subjects_dir = subjects_dir.as_ref();
    match hemi {
        Hemi::Lh | Hemi::Rh => {
            let h = if hemi == Hemi::Lh { Hemisphere::Lh } else { Hemisphere::Rh };
            read_label_md(label_file_path(subjects_dir, subject_id, h, label), h)
        }
        Hemi::Both => {
            let rh_shift = meta.get_int(&hemi_key(Hemisphere::Lh, "num_vertices"))
                .or_else(|| meta.get_int(&hemi_key(Hemisphere::Lh, "num_data_points")))
                .ok_or_else(|| NeuroformatsError::InvalidArgument(String::from("Argument 'hemi' is set to 'both'. In this case, the metadata must contain the key 'lh.num_data_points' or 'lh.num_vertices'.")))?;
            let (mut verts, mut md) = read_label_md(label_file_path(subjects_dir, subject_id, Hemisphere::Lh, label), Hemisphere::Lh)?;
            let (rh_verts, rh_md) = read_label_md(label_file_path(subjects_dir, subject_id, Hemisphere::Rh, label), Hemisphere::Rh)?;
            verts.extend(rh_verts.iter().map(|v| v + rh_shift as usize));
            md.merge(rh_md);
            Ok((verts, md))
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const DEMO_LABEL: &str = "#!ascii label  , from subject subject1 vox2ras=TkReg\n3\n1  -1.852  -107.983  22.770 0.0000000000\n7  -1.100  -107.000  22.000 0.5000000000\n9  -2.000  -106.500  21.250 1.0000000000\n";

    fn write_subject_label(subjects_dir: &Path, hemi: Hemisphere, contents: &str) {
        let label_dir = subjects_dir.join("subject1").join("label");
        fs::create_dir_all(&label_dir).unwrap();
        fs::write(label_dir.join(format!("{}.cortex.label", hemi)), contents).unwrap();
    }

    #[test]
    fn an_ascii_label_can_be_parsed() {
        let label = FsLabel::from_str_contents(DEMO_LABEL).unwrap();
        assert_eq!(3, label.len());
        assert_eq!(vec![1, 7, 9], label.vertex_index);
        assert_eq!(-107.983, label.coord2[0]);
        assert_eq!(vec![1, 7, 9], label.vertices().unwrap());
    }

    #[test]
    fn tab_aligned_labels_with_windows_line_endings_can_be_parsed() {
        let contents = "#!ascii label  , from subject subject1\r\n2\r\n\r\n  1\t-1.5\t2.0  3.25\t0.0\r\n12 4.0 5.0 6.0 1.0\r\n";
        let label = FsLabel::from_str_contents(contents).unwrap();
        assert_eq!(vec![1, 12], label.vertex_index);
        assert_eq!(vec![3.25, 6.0], label.coord3);
        assert_eq!(vec![0.0, 1.0], label.value);
    }

    #[test]
    fn a_label_with_wrong_entry_count_is_rejected() {
        let broken = DEMO_LABEL.replacen("\n3\n", "\n4\n", 1);
        assert!(FsLabel::from_str_contents(&broken).is_err());
        match FsLabel::from_str_contents("#!ascii label\n1\n1 2 3\n") {
            Err(NeuroformatsError::InvalidFsLabelFormat(msg)) => assert!(msg.contains("3 fields, expected 5")),
            other => panic!("expected InvalidFsLabelFormat, got {:?}", other),
        }
        assert!(FsLabel::from_str_contents("#!ascii label\n").is_err());
    }

    #[test]
    fn a_written_label_can_be_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lh.test.label");
        let label = FsLabel::from_str_contents(DEMO_LABEL).unwrap();
        write_label(&path, &label).unwrap();
        assert_eq!(label, read_label(&path).unwrap());
    }

    #[test]
    fn rh_label_vertices_are_shifted_for_both_hemispheres() {
        let dir = tempdir().unwrap();
        write_subject_label(dir.path(), Hemisphere::Lh, DEMO_LABEL);
        write_subject_label(dir.path(), Hemisphere::Rh, DEMO_LABEL);

        let meta = MetaData::new().with("lh.num_vertices", 100usize);
        let (verts, md) = label(dir.path(), "subject1", "cortex", Hemi::Both, &meta).unwrap();
        assert_eq!(vec![1, 7, 9, 101, 107, 109], verts);
        assert!(md.contains_key("lh.label_file"));
        assert!(md.contains_key("rh.label_file"));

        let (verts, _) = label(dir.path(), "subject1", "cortex", Hemi::Rh, &MetaData::new()).unwrap();
        assert_eq!(vec![1, 7, 9], verts);
    }

    #[test]
    fn both_hemispheres_require_the_lh_vertex_count() {
        let dir = tempdir().unwrap();
        write_subject_label(dir.path(), Hemisphere::Lh, DEMO_LABEL);
        write_subject_label(dir.path(), Hemisphere::Rh, DEMO_LABEL);
        let meta = MetaData::new().with("lh.num_data_points", 10usize);
        let (verts, _) = label(dir.path(), "subject1", "cortex", Hemi::Both, &meta).unwrap();
        assert_eq!(19, verts[5]);
        assert!(label(dir.path(), "subject1", "cortex", Hemi::Both, &MetaData::new()).is_err());
    }

    #[test]
    fn a_missing_label_file_is_tagged_with_its_hemisphere() {
        let dir = tempdir().unwrap();
        write_subject_label(dir.path(), Hemisphere::Lh, DEMO_LABEL);
        let meta = MetaData::new().with("lh.num_vertices", 100usize);
        let err = label(dir.path(), "subject1", "cortex", Hemi::Both, &meta).unwrap_err();
        assert_eq!(Some(Hemisphere::Rh), err.hemi());
    }
}
