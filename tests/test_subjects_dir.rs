use approx::assert_abs_diff_eq;
use ndarray::Array4;
use tempfile::{tempdir, TempDir};

use std::fs;

use neuroload::{
    annot, load_group_data, subject, write_annot, write_curv, write_mgh, write_subjects_file, write_surf,
    BrainDataConsistency, BrainDescriptors, BrainMesh, FsAnnot, FsAnnotColortable, FsMgh, GroupOptions, Hemi,
    SubjectOptions, SubjectsDetectionMode,
};

const SUBJECTS: [&str; 3] = ["subject1", "subject2", "subject3"];

/// A tetrahedron, so every hemisphere has 4 vertices and 4 faces.
fn tetrahedron(shift: f32) -> BrainMesh {
    BrainMesh {
        vertices: vec![shift, 0.0, 0.0, shift + 1.0, 0.0, 0.0, shift, 1.0, 0.0, shift, 0.0, 1.0],
        faces: vec![0, 1, 2, 0, 1, 3, 0, 2, 3, 1, 2, 3],
    }
}

fn parcellation() -> FsAnnot {
    let mut ct = FsAnnotColortable::default();
    ct.push(0, "unknown", 25, 5, 25, 0);
    ct.push(1, "precentral", 60, 20, 220, 0);
    FsAnnot::from_label_indices(&[0, 1, 1, -1], ct).unwrap()
}

/// Create a subjects directory with 3 subjects and the fsaverage subject. Each subject has surfaces, native space
/// thickness, standard space thickness and an aparc parcellation.
fn write_subjects_dir() -> TempDir {
    let dir = tempdir().unwrap();
    for subject_id in SUBJECTS.iter().chain(["fsaverage"].iter()) {
        let surf_dir = dir.path().join(subject_id).join("surf");
        let label_dir = dir.path().join(subject_id).join("label");
        fs::create_dir_all(&surf_dir).unwrap();
        fs::create_dir_all(&label_dir).unwrap();
        for (hemi, shift) in [("lh", -2.0), ("rh", 2.0)].iter() {
            write_surf(surf_dir.join(format!("{}.white", hemi)), &tetrahedron(*shift)).unwrap();
            write_surf(surf_dir.join(format!("{}.pial", hemi)), &tetrahedron(*shift)).unwrap();
            write_curv(surf_dir.join(format!("{}.thickness", hemi)), &[2.0, 2.5, 3.5, 1.0], 4).unwrap();
            write_annot(label_dir.join(format!("{}.aparc.annot", hemi)), &parcellation()).unwrap();
        }
    }
    for (idx, subject_id) in SUBJECTS.iter().enumerate() {
        let surf_dir = dir.path().join(subject_id).join("surf");
        for hemi in ["lh", "rh"].iter() {
            let data = Array4::from_shape_fn((4, 1, 1, 1), |(v, _, _, _)| (idx * 10 + v) as f32);
            write_mgh(surf_dir.join(format!("{}.thickness.fwhm10.fsaverage.mgh", hemi)), &FsMgh::from_f32_data(data)).unwrap();
        }
    }
    dir
}

fn subjects_list() -> Vec<String> {
    SUBJECTS.iter().map(|s| s.to_string()).collect()
}

#[test]
fn a_subject_is_loaded_with_both_hemispheres() {
    let dir = write_subjects_dir();
    let opts = SubjectOptions { measure: String::from("thickness"), ..SubjectOptions::with_subjects_dir(dir.path()) };
    let data = subject("subject2", &opts).unwrap();

    let mesh = data.mesh.unwrap();
    assert_eq!(8, mesh.num_vertices());
    assert_eq!(8, mesh.num_faces());
    assert!(mesh.faces[12..].iter().all(|f| *f >= 4 && *f < 8));
    assert_eq!(8, data.morphometry.unwrap().len());
    assert_eq!(Some(4), data.meta.get_int("rh.num_vertices"));

    let parc = annot("subject2", dir.path(), "aparc", Hemi::Both, false).unwrap();
    assert_eq!(vec![0, 1, 1, -1, 0, 1, 1, -1], parc.vertex_labels);
}

#[test]
fn group_data_is_loaded_from_the_subjects_file() {
    let dir = write_subjects_dir();
    write_subjects_file(dir.path().join("subjects.txt"), &["subject3", "subject1"]).unwrap();
    let opts = GroupOptions {
        measure: String::from("thickness"),
        subjects_dir: dir.path().to_path_buf(),
        subjects_detection_mode: SubjectsDetectionMode::File,
        ..GroupOptions::default()
    };
    let group = load_group_data(&opts).unwrap();

    assert_eq!(vec!["subject3", "subject1"], group.subjects);
    assert_eq!((2, 8), group.data.dim());
    assert_eq!(20.0, group.data[[0, 0]]);
    assert_eq!(3.0, group.data[[1, 7]]);
    assert_eq!(Some(true), group.run_meta.get_bool("subjects_file_used"));
}

#[test]
fn the_directory_scan_ignores_the_average_subject() {
    let dir = write_subjects_dir();
    let opts = GroupOptions { measure: String::from("thickness"), subjects_dir: dir.path().to_path_buf(), ..GroupOptions::default() };
    let group = load_group_data(&opts).unwrap();
    assert_eq!(subjects_list(), group.subjects);
    assert_eq!(Some("search_dir"), group.run_meta.get_str("subjects_detection_mode_auto_used_method"));
}

#[test]
fn the_consistency_report_lists_broken_subjects() {
    let dir = write_subjects_dir();
    write_curv(dir.path().join("subject2/surf/rh.thickness"), &[1.0, 2.0], 4).unwrap();
    fs::remove_file(dir.path().join("subject3/surf/lh.pial")).unwrap();

    let mut bdc = BrainDataConsistency::new(dir.path(), subjects_list(), Hemi::Both);
    let report = bdc.check_custom(&["thickness"]);
    assert!(report.contains("subject1: OK"));
    assert!(report.contains("subject2: 1 inconsistencies: MORPH_MISMATCH__thickness_rh"));
    assert_eq!(vec!["NO_SURFACE_FILE__pial_lh", "VERT_MISMATCH_SURFACES__white_pial_lh"], bdc.subject_issue_tags("subject3"));
    assert!(report.ends_with("Summary: 1 subjects OK and 2 with inconsistencies out of 3 total."));
}

#[test]
fn region_means_become_descriptors() {
    let dir = write_subjects_dir();
    let mut bd = BrainDescriptors::new(dir.path(), subjects_list(), Hemi::Both);
    bd.add_custom_measure_stats(&["aparc"], &["thickness"]).unwrap();

    assert_eq!(4, bd.num_descriptors());
    let precentral = bd.descriptor("custom_rh.aparc_thickness_mean_precentral").unwrap();
    assert_eq!(3, precentral.len());
    assert_abs_diff_eq!(3.0, precentral[0], epsilon = 1e-6);

    let checks = bd.check_for_segmentation_stats_files(&["aseg"]);
    assert_eq!(3, checks[0].num_missing());
    assert!(!checks[0].missing[0].exists());
}
