//! Loading of structural neuroimaging data for single subjects and groups.
//!
//! The focus of this package is on surface-based MRI data as produced by FreeSurfer: surface meshes,
//! per-vertex morphometry data, volumes, parcellations, labels and stats files. On top of the file format
//! readers, it finds and loads the data of subjects in a FreeSurfer subjects directory following the
//! FreeSurfer file naming conventions.

pub mod descriptors;
pub mod error;
pub mod fs_annot;
pub mod fs_curv;
pub mod fs_label;
pub mod fs_lut;
pub mod fs_mgh;
pub mod fs_stats;
pub mod fs_surface;
pub mod group;
pub mod hemi;
pub mod locate;
pub mod meta;
pub mod overlay;
pub mod qa;
pub mod spatial;
pub mod subject;
pub mod subjects;
pub mod traits;
pub mod util;

pub use descriptors::{BrainDescriptors, FileCheck};
pub use error::{NeuroformatsError, Result};
pub use fs_annot::{label_to_mask, mask_data_using_label, read_annot, region_stats, write_annot, FsAnnot, FsAnnotColortable, RegionStats};
pub use fs_curv::{read_curv, write_curv, CurvHeader, FsCurv};
pub use fs_label::{label, read_label, write_label, FsLabel};
pub use fs_lut::{read_lut, FsColorLut};
pub use fs_mgh::{read_mgh, write_mgh, FsMgh, FsMghHeader};
pub use fs_stats::{group_stats, group_stats_aseg, read_stats, FsStats, GroupStats};
pub use fs_surface::{merge_meshes, read_surf, write_surf, BrainMesh, FsSurface, FsSurfaceHeader};
pub use group::{load_group_data, GroupData, GroupOptions, SubjectsDetectionMode};
pub use hemi::{Hemi, HemiPair, Hemisphere, MorphFormat};
pub use locate::{BrainLocate, BrainVoxLocate, LabeledVoxel};
pub use meta::{MetaData, MetaValue};
pub use overlay::{vertex_overlay_colors, volume_with_marks, write_rgb_overlay, VertexOverlay};
pub use qa::BrainDataConsistency;
pub use spatial::{apply_affine, apply_affine_3d, read_registration_file, Affine, Axis};
pub use subject::{annot, subject, subject_avg, subject_data_native, subject_data_standard, subject_mesh, SubjectData, SubjectOptions};
pub use subjects::{detect_subjects_in_directory, fill_template_filename, read_subjects_file, write_subjects_file};
pub use traits::VertexColor;
