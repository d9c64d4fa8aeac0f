//! Loading of the surface and morphometry data of a single subject from a FreeSurfer subjects directory.
//!
//! File names follow the FreeSurfer conventions: surfaces are stored in `<subject>/surf/<hemi>.<surf>`, native space
//! morphometry data in `<subject>/surf/<hemi>.<measure><surf_suffix>` and data mapped to an average subject in
//! `<subject>/surf/<hemi>.<measure><surf_suffix>.fwhm<N>.<average_subject>.mgh`. The surface suffix is empty for the
//! `white` surface, and `.<surf>` for all others.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{NeuroformatsError, Result};
use crate::fs_annot::{read_annot, FsAnnotColortable};
use crate::fs_curv::read_curv;
use crate::fs_mgh::read_mgh;
use crate::fs_surface::{merge_meshes, read_surf, BrainMesh};
use crate::hemi::{Hemi, HemiPair, Hemisphere, MorphFormat};
use crate::meta::MetaData;


/// The subjects directory from the `SUBJECTS_DIR` environment variable, or the current working directory.
pub fn default_subjects_dir() -> PathBuf {
    match env::var_os("SUBJECTS_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}


/// Settings for loading the data of a single subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectOptions {
    pub subjects_dir: PathBuf,
    /// The surface the morphometry data was computed on, e.g., `white` or `pial`.
    pub surf: String,
    /// The surface of the average subject to load for standard space data.
    pub display_surf: String,
    pub measure: String,
    pub hemi: Hemi,
    /// The smoothing kernel part of standard space file names. `None` selects the file without a `.fwhm<N>` part.
    pub fwhm: Option<String>,
    pub average_subject: String,
    /// The subjects directory containing the average subject. Defaults to `subjects_dir`.
    pub average_subjects_dir: Option<PathBuf>,
    pub load_surface_files: bool,
    pub load_morphometry_data: bool,
    /// Standard space morphometry file names to use instead of the conventional ones, relative to `<subject>/surf`.
    pub custom_morphometry_files: Option<HemiPair<String>>,
}

impl Default for SubjectOptions {
    fn default() -> SubjectOptions {
        SubjectOptions {
            subjects_dir: default_subjects_dir(),
            surf: String::from("white"),
            display_surf: String::from("white"),
            measure: String::from("area"),
            hemi: Hemi::Both,
            fwhm: Some(String::from("10")),
            average_subject: String::from("fsaverage"),
            average_subjects_dir: None,
            load_surface_files: true,
            load_morphometry_data: true,
            custom_morphometry_files: None,
        }
    }
}

impl SubjectOptions {
    /// Default options for the given subjects directory.
    pub fn with_subjects_dir<P: Into<PathBuf>>(subjects_dir: P) -> SubjectOptions {
        SubjectOptions {
            subjects_dir: subjects_dir.into(),
            ..SubjectOptions::default()
        }
    }

    fn average_subjects_dir(&self) -> &Path {
        self.average_subjects_dir.as_deref().unwrap_or(&self.subjects_dir)
    }
}


/// The data loaded for a subject. Fields which were not requested are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectData {
    pub mesh: Option<BrainMesh>,
    /// Per-vertex data. For both hemispheres, the rh values follow the lh values.
    pub morphometry: Option<Vec<f32>>,
    pub meta: MetaData,
}


/// The file name suffix of morphometry data for a surface: empty for `white`, `.<surf>` otherwise.
pub fn morphometry_suffix_for_surface(surf: &str) -> String {
    if surf == "white" {
        String::new()
    } else {
        format!(".{}", surf)
    }
}

/// Path of a surface file, e.g., `subjects_dir/subject1/surf/lh.white`.
pub fn surface_file_path<P: AsRef<Path>>(subjects_dir: P, subject_id: &str, hemi: Hemisphere, surf: &str) -> PathBuf {
    subjects_dir.as_ref().join(subject_id).join("surf").join(format!("{}.{}", hemi, surf))
}

/// Path of a native space morphometry file, e.g., `subjects_dir/subject1/surf/lh.area.pial`.
pub fn morphometry_file_path<P: AsRef<Path>>(subjects_dir: P, subject_id: &str, hemi: Hemisphere, measure: &str, surf: &str) -> PathBuf {
    subjects_dir.as_ref().join(subject_id).join("surf").join(format!("{}.{}{}", hemi, measure, morphometry_suffix_for_surface(surf)))
}

/// File name of morphometry data mapped to an average subject, e.g., `lh.area.pial.fwhm10.fsaverage.mgh`.
pub fn standard_space_file_name(hemi: Hemisphere, measure: &str, surf: &str, fwhm: Option<&str>, average_subject: &str) -> String {
    let fwhm_tag = match fwhm {
        Some(f) => format!(".fwhm{}", f),
        None => String::new(),
    };
    format!("{}.{}{}{}.{}.mgh", hemi, measure, morphometry_suffix_for_surface(surf), fwhm_tag, average_subject)
}


/// Read a surface file and record `?h.num_vertices`, `?h.num_faces` and `?h.surf_file`. I/O errors carry the hemisphere.
pub fn read_surface_md<P: AsRef<Path>>(surf_file: P, hemi: Hemisphere) -> Result<(BrainMesh, MetaData)> {
    let surf_file = surf_file.as_ref();
    let surf = read_surf(surf_file).map_err(|e| e.for_hemi(hemi, surf_file))?;
    let mut meta = MetaData::new();
    meta.insert_hemi(hemi, "num_vertices", surf.mesh.num_vertices());
    meta.insert_hemi(hemi, "num_faces", surf.mesh.num_faces());
    meta.insert_hemi(hemi, "surf_file", surf_file);
    Ok((surf.mesh, meta))
}

/// Read a morphometry file and record `?h.num_data_points`, `?h.morphometry_file` and `?h.morphometry_file_format`.
///
/// MGH files must hold the per-vertex values along their first axis.
pub fn read_morphometry_md<P: AsRef<Path>>(morph_file: P, hemi: Hemisphere, format: MorphFormat) -> Result<(Vec<f32>, MetaData)> {
    let morph_file = morph_file.as_ref();
    let data = match format {
        MorphFormat::Curv => read_curv(morph_file).map(|c| c.data),
        MorphFormat::Mgh => read_mgh(morph_file).and_then(|m| m.first_axis_values().ok_or(NeuroformatsError::InvalidFsMghFormat)),
    }
    .map_err(|e| e.for_hemi(hemi, morph_file))?;

    let mut meta = MetaData::new();
    meta.insert_hemi(hemi, "num_data_points", data.len());
    meta.insert_hemi(hemi, "morphometry_file", morph_file);
    meta.insert_hemi(hemi, "morphometry_file_format", format.as_str());
    Ok((data, meta))
}


/// Load the meshes of the selected hemispheres. For both hemispheres, the rh mesh is appended to the lh mesh.
pub fn load_subject_mesh_files<P: AsRef<Path>>(lh_surf_file: P, rh_surf_file: P, hemi: Hemi) -> Result<(BrainMesh, MetaData)> {
    let files = HemiPair::new(lh_surf_file.as_ref(), rh_surf_file.as_ref());
    let mut meta = MetaData::new();
    let mut meshes = Vec::with_capacity(2);
    for h in hemi.hemispheres() {
        let (mesh, md) = read_surface_md(files.get(h), h)?;
        meta.merge(md);
        meshes.push(mesh);
    }
    let mesh = match meshes.len() {
        1 => meshes.remove(0),
        _ => merge_meshes(&meshes.iter().collect::<Vec<&BrainMesh>>()),
    };
    Ok((mesh, meta))
}

/// Load the morphometry data of the selected hemispheres. For both hemispheres, the rh values are appended to the lh values.
pub fn load_subject_morphometry_files<P: AsRef<Path>>(lh_morph_file: P, rh_morph_file: P, hemi: Hemi, format: MorphFormat) -> Result<(Vec<f32>, MetaData)> {
    let files = HemiPair::new(lh_morph_file.as_ref(), rh_morph_file.as_ref());
    let mut meta = MetaData::new();
    let mut data = Vec::new();
    for h in hemi.hemispheres() {
        let (values, md) = read_morphometry_md(files.get(h), h, format)?;
        meta.merge(md);
        data.extend(values);
    }
    Ok((data, meta))
}


/// Load the native space surface and morphometry data of a subject.
///
/// The `average_subject`, `display_surf`, `fwhm` and `custom_morphometry_files` options are not used.
///
/// # Examples
///
/// ```no_run
/// use neuroload::{subject, SubjectOptions};
/// let opts = SubjectOptions { measure: String::from("thickness"), ..SubjectOptions::with_subjects_dir("/data/study1") };
/// let data = subject("subject1", &opts).unwrap();
/// println!("Loaded {} vertices.", data.meta.get_int("lh.num_vertices").unwrap_or(0));
/// ```
pub fn subject(subject_id: &str, opts: &SubjectOptions) -> Result<SubjectData> {
    let subjects_dir = opts.subjects_dir.as_path();
    let mut meta = MetaData::new();

    let mut mesh = None;
    let mut display_subject = None;
    let mut display_surf = None;
    if opts.load_surface_files {
        let (m, md) = load_subject_mesh_files(
            surface_file_path(subjects_dir, subject_id, Hemisphere::Lh, &opts.surf),
            surface_file_path(subjects_dir, subject_id, Hemisphere::Rh, &opts.surf),
            opts.hemi,
        )?;
        meta.merge(md);
        mesh = Some(m);
        display_subject = Some(subject_id.to_string());
        display_surf = Some(opts.surf.clone());
    }

    let mut morphometry = None;
    let mut measure = None;
    if opts.load_morphometry_data {
        let (data, md) = load_subject_morphometry_files(
            morphometry_file_path(subjects_dir, subject_id, Hemisphere::Lh, &opts.measure, &opts.surf),
            morphometry_file_path(subjects_dir, subject_id, Hemisphere::Rh, &opts.measure, &opts.surf),
            opts.hemi,
            MorphFormat::Curv,
        )?;
        meta.merge(md);
        morphometry = Some(data);
        measure = Some(opts.measure.clone());
    }

    meta.insert("subject_id", subject_id);
    meta.insert("display_subject", display_subject);
    meta.insert("subjects_dir", subjects_dir);
    meta.insert("surf", opts.surf.as_str());
    meta.insert("display_surf", display_surf);
    meta.insert("measure", measure);
    meta.insert("space", "native_space");
    meta.insert("hemi", opts.hemi.as_str());

    Ok(SubjectData { mesh, morphometry, meta })
}


/// Load the morphometry data of a subject mapped to an average subject, and the surface of the average subject.
///
/// The data is read from the MGH files created by FreeSurfer's `recon-all -qcache`, e.g., `lh.area.fwhm10.fsaverage.mgh`,
/// or from `custom_morphometry_files` if set. The mesh is the `display_surf` of the `average_subject`.
pub fn subject_avg(subject_id: &str, opts: &SubjectOptions) -> Result<SubjectData> {
    let subjects_dir = opts.subjects_dir.as_path();
    let average_subjects_dir = opts.average_subjects_dir();
    let mut meta = MetaData::new();

    let mut mesh = None;
    let mut display_subject = None;
    let mut display_surf = None;
    if opts.load_surface_files {
        let (m, md) = load_subject_mesh_files(
            surface_file_path(average_subjects_dir, &opts.average_subject, Hemisphere::Lh, &opts.display_surf),
            surface_file_path(average_subjects_dir, &opts.average_subject, Hemisphere::Rh, &opts.display_surf),
            opts.hemi,
        )?;
        meta.merge(md);
        mesh = Some(m);
        display_subject = Some(opts.average_subject.clone());
        display_surf = Some(opts.display_surf.clone());
    }

    let mut morphometry = None;
    let mut measure = None;
    if opts.load_morphometry_data {
        let subject_surf_dir = subjects_dir.join(subject_id).join("surf");
        let file_name = |hemi: Hemisphere| -> String {
            match &opts.custom_morphometry_files {
                Some(custom) => custom.get(hemi).clone(),
                None => standard_space_file_name(hemi, &opts.measure, &opts.surf, opts.fwhm.as_deref(), &opts.average_subject),
            }
        };
        meta.insert("custom_morphometry_files_used", opts.custom_morphometry_files.is_some());
        let (data, md) = load_subject_morphometry_files(
            subject_surf_dir.join(file_name(Hemisphere::Lh)),
            subject_surf_dir.join(file_name(Hemisphere::Rh)),
            opts.hemi,
            MorphFormat::Mgh,
        )?;
        meta.merge(md);
        morphometry = Some(data);
        measure = Some(opts.measure.clone());
    }

    meta.insert("measure", measure);
    meta.insert("subject_id", subject_id);
    meta.insert("subjects_dir", subjects_dir);
    meta.insert("display_surf", display_surf);
    meta.insert("display_subject", display_subject);
    meta.insert("average_subjects_dir", average_subjects_dir);
    meta.insert("surf", opts.surf.as_str());
    meta.insert("space", "standard_space");
    meta.insert("average_subject", opts.average_subject.as_str());
    meta.insert("fwhm", opts.fwhm.clone());
    meta.insert("hemi", opts.hemi.as_str());

    Ok(SubjectData { mesh, morphometry, meta })
}


/// Load only the mesh of a subject.
pub fn subject_mesh<P: AsRef<Path>>(subject_id: &str, subjects_dir: P, surf: &str, hemi: Hemi) -> Result<(BrainMesh, MetaData)> {
    let opts = SubjectOptions {
        subjects_dir: subjects_dir.as_ref().to_path_buf(),
        surf: surf.to_string(),
        hemi,
        load_morphometry_data: false,
        ..SubjectOptions::default()
    };
    let data = subject(subject_id, &opts)?;
    Ok((data.mesh.unwrap_or_default(), data.meta))
}

/// Load only the native space morphometry data of a subject, computed on the `white` surface.
pub fn subject_data_native<P: AsRef<Path>>(subject_id: &str, subjects_dir: P, measure: &str, hemi: Hemi) -> Result<(Vec<f32>, MetaData)> {
    let opts = SubjectOptions {
        subjects_dir: subjects_dir.as_ref().to_path_buf(),
        measure: measure.to_string(),
        hemi,
        load_surface_files: false,
        ..SubjectOptions::default()
    };
    let data = subject(subject_id, &opts)?;
    Ok((data.morphometry.unwrap_or_default(), data.meta))
}

/// Load only the standard space morphometry data of a subject, computed on the `white` surface.
pub fn subject_data_standard<P: AsRef<Path>>(subject_id: &str, subjects_dir: P, measure: &str, hemi: Hemi, fwhm: Option<&str>, average_subject: &str) -> Result<(Vec<f32>, MetaData)> {
    let opts = SubjectOptions {
        subjects_dir: subjects_dir.as_ref().to_path_buf(),
        measure: measure.to_string(),
        hemi,
        fwhm: fwhm.map(|f| f.to_string()),
        average_subject: average_subject.to_string(),
        load_surface_files: false,
        ..SubjectOptions::default()
    };
    let data = subject_avg(subject_id, &opts)?;
    Ok((data.morphometry.unwrap_or_default(), data.meta))
}


/// A parcellation of one or both hemispheres of a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectAnnot {
    /// Per-vertex colortable indices (`-1` for unlabeled vertices), or the packed color codes if loaded with `orig_ids`.
    pub vertex_labels: Vec<i32>,
    pub colortable: FsAnnotColortable,
    pub meta: MetaData,
}

impl SubjectAnnot {
    pub fn label_names(&self) -> &[String] {
        &self.colortable.name
    }
}

/// Path of an annotation file, e.g., `subjects_dir/subject1/label/lh.aparc.annot`.
pub fn annot_file_path<P: AsRef<Path>>(subjects_dir: P, subject_id: &str, hemi: Hemisphere, annotation: &str) -> PathBuf {
    subjects_dir.as_ref().join(subject_id).join("label").join(format!("{}.{}.annot", hemi, annotation))
}

/// Load the parcellation `annotation` (e.g., `aparc` or `aparc.a2009s`) of a subject.
///
/// With `orig_ids`, the vertex labels are the packed color codes stored in the files. Otherwise, they are indices into the colortable.
/// For both hemispheres, the vertex labels of rh follow those of lh, and both hemispheres must have identical colortables.
pub fn annot<P: AsRef<Path>>(subject_id: &str, subjects_dir: P, annotation: &str, hemi: Hemi, orig_ids: bool) -> Result<SubjectAnnot> {
    let mut meta = MetaData::new();
    let mut vertex_labels = Vec::new();
    let mut colortable: Option<FsAnnotColortable> = None;

    for h in hemi.hemispheres() {
        let annot_file = annot_file_path(subjects_dir.as_ref(), subject_id, h, annotation);
        let a = read_annot(&annot_file).map_err(|e| e.for_hemi(h, &annot_file))?;
        meta.insert_hemi(h, "annotation_file", annot_file.as_path());
        if orig_ids {
            vertex_labels.extend_from_slice(a.orig_ids());
        } else {
            vertex_labels.extend(a.vertex_label_indices());
        }
        match &colortable {
            None => colortable = Some(a.colortable),
            Some(lh_ct) => check_identical_colortables(lh_ct, &a.colortable, annotation)?,
        }
    }

    Ok(SubjectAnnot {
        vertex_labels,
        colortable: colortable.unwrap_or_default(),
        meta,
    })
}

fn check_identical_colortables(lh: &FsAnnotColortable, rh: &FsAnnotColortable, annotation: &str) -> Result<()> {
    if lh.num_entries() != rh.num_entries() {
        return Err(NeuroformatsError::Validation(format!("The lh has {} regions and the rh has {} regions for annotation '{}', but they should be identical.", lh.num_entries(), rh.num_entries(), annotation)));
    }
    let first_difference = |field: &str, idx: usize| {
        NeuroformatsError::Validation(format!("The region {} of lh and rh differ for annotation '{}', first at region index {} ('{}' in lh).", field, annotation, idx, lh.name[idx]))
    };
    if let Some(idx) = (0..lh.num_entries()).find(|i| lh.name[*i] != rh.name[*i]) {
        return Err(first_difference("names", idx));
    }
    if let Some(idx) = (0..lh.num_entries()).find(|i| lh.a[*i] != rh.a[*i]) {
        return Err(first_difference("alpha values", idx));
    }
    if let Some(idx) = (0..lh.num_entries()).find(|i| lh.label[*i] != rh.label[*i]) {
        return Err(first_difference("label codes", idx));
    }
    Ok(())
}
