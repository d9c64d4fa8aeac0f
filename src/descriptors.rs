//! Collection of brain descriptors for a group of subjects.
//!
//! A descriptor is a single named value per subject, like the total cortical volume or the mean thickness in a region.
//! Descriptors are collected from the stats files FreeSurfer writes to `<subject>/stats`, or computed from native space
//! morphometry data and a parcellation.

use csv::WriterBuilder;
use ndarray::{concatenate, Array2, Axis};

use std::path::{Path, PathBuf};

use crate::error::{NeuroformatsError, Result};
use crate::fs_annot::{read_annot, region_stats};
use crate::fs_stats::{group_stats, typelist_for_aparc_atlas_stats, typelist_for_aseg_stats, GroupColumn, GroupStats, REGION_NAME_COLUMN};
use crate::hemi::{Hemi, Hemisphere};
use crate::subject::{annot_file_path, subject_data_native};


/// The result of checking whether a file exists for all subjects.
#[derive(Debug, Clone, PartialEq)]
pub struct FileCheck {
    /// The file name relative to the subject directory, e.g., `stats/lh.aparc.stats`.
    pub file_name: String,
    pub ok: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

impl FileCheck {
    pub fn num_ok(&self) -> usize {
        self.ok.len()
    }

    pub fn num_missing(&self) -> usize {
        self.missing.len()
    }
}


/// Descriptors of a group of subjects, as a matrix with one row per subject and one column per descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct BrainDescriptors {
    pub subjects_dir: PathBuf,
    pub subjects_list: Vec<String>,
    pub hemi: Hemi,
    pub descriptor_names: Vec<String>,
    /// Shape (num_subjects, num_descriptors).
    pub descriptor_values: Array2<f64>,
}

impl BrainDescriptors {
    pub fn new<P: Into<PathBuf>>(subjects_dir: P, subjects_list: Vec<String>, hemi: Hemi) -> BrainDescriptors {
        let num_subjects = subjects_list.len();
        BrainDescriptors {
            subjects_dir: subjects_dir.into(),
            subjects_list,
            hemi,
            descriptor_names: Vec::new(),
            descriptor_values: Array2::zeros((num_subjects, 0)),
        }
    }

    pub fn num_descriptors(&self) -> usize {
        self.descriptor_names.len()
    }

    /// The values of a descriptor, one per subject.
    pub fn descriptor(&self, name: &str) -> Option<Vec<f64>> {
        self.descriptor_names.iter().position(|n| n == name).map(|idx| self.descriptor_values.column(idx).to_vec())
    }

    fn append(&mut self, names: Vec<String>, values: Array2<f64>) -> Result<()> {
        if values.nrows() != self.subjects_list.len() || values.ncols() != names.len() {
            return Err(NeuroformatsError::Validation(format!("Cannot add {} descriptor names with values of shape {:?} for {} subjects.", names.len(), values.shape(), self.subjects_list.len())));
        }
        self.descriptor_values = concatenate(Axis(1), &[self.descriptor_values.view(), values.view()])
            .map_err(|e| NeuroformatsError::Validation(e.to_string()))?;
        self.descriptor_names.extend(names);
        Ok(())
    }

    /// Add the measures and the numeric table columns of aggregated stats. Table descriptors get one value per region.
    fn add_group_stats(&mut self, stats: &GroupStats, tag: &str, ignore_columns: &[&str]) -> Result<()> {
        let names = stats.measure_names.iter().map(|m| format!("stats_{}_measure_{}", tag, m)).collect();
        self.append(names, stats.measure_values.clone())?;

        let region_names: Vec<String> = match stats.column(REGION_NAME_COLUMN) {
            Some(GroupColumn::Str(rows)) => rows.first().cloned().unwrap_or_default(),
            _ => return Ok(()),
        };
        for (column_name, column) in stats.table.iter() {
            if column_name == REGION_NAME_COLUMN || ignore_columns.contains(&column_name.as_str()) {
                continue;
            }
            if let GroupColumn::Numeric(values) = column {
                let names = region_names.iter().map(|r| format!("stats_{}_table_{}_{}", tag, column_name, r)).collect();
                self.append(names, values.clone())?;
            }
        }
        Ok(())
    }

    /// Add the data of the parcellation stats files `stats/?h.<atlas>.stats`, e.g., for atlas `aparc`.
    ///
    /// Descriptor names are `stats_<hemi>.<atlas>_measure_<measure>` and `stats_<hemi>.<atlas>_table_<column>_<region>`.
    pub fn add_parcellation_stats(&mut self, atlas_list: &[&str]) -> Result<()> {
        for hemi in self.hemi.hemispheres() {
            for atlas in atlas_list {
                let stats = group_stats(&self.subjects_list, &self.subjects_dir, &format!("{}.{}.stats", hemi, atlas), Some(&typelist_for_aparc_atlas_stats()))?;
                self.add_group_stats(&stats, &format!("{}.{}", hemi, atlas), &[])?;
                log::info!("Added {} stats for hemi {}, now at {} descriptors.", atlas, hemi, self.num_descriptors());
            }
        }
        Ok(())
    }

    /// Add the data of the segmentation stats files `stats/<segmentation>.stats`, e.g., for segmentation `aseg`.
    ///
    /// The `Index` and `SegId` columns are skipped. Descriptor names are `stats_<segmentation>_measure_<measure>` and
    /// `stats_<segmentation>_table_<column>_<region>`.
    pub fn add_segmentation_stats(&mut self, segmentation_list: &[&str]) -> Result<()> {
        for seg in segmentation_list {
            let stats = group_stats(&self.subjects_list, &self.subjects_dir, &format!("{}.stats", seg), Some(&typelist_for_aseg_stats()))?;
            self.add_group_stats(&stats, seg, &["Index", "SegId"])?;
            log::info!("Added {} stats, now at {} descriptors.", seg, self.num_descriptors());
        }
        Ok(())
    }

    /// Add the mean of native space morphometry data in each region of a parcellation.
    ///
    /// Descriptor names are `custom_<hemi>.<atlas>_<measure>_mean_<region>`. Regions without vertices yield NaN.
    pub fn add_custom_measure_stats(&mut self, atlas_list: &[&str], measure_list: &[&str]) -> Result<()> {
        for hemi in self.hemi.hemispheres() {
            for atlas in atlas_list {
                for measure in measure_list {
                    self.add_custom_measure_stats_single(atlas, measure, hemi)?;
                }
            }
        }
        Ok(())
    }

    fn add_custom_measure_stats_single(&mut self, atlas: &str, measure: &str, hemi: Hemisphere) -> Result<()> {
        let mut region_names: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(self.subjects_list.len());
        for subject_id in self.subjects_list.iter() {
            let (data, _) = subject_data_native(subject_id, &self.subjects_dir, measure, hemi.into())?;
            let annot_file = annot_file_path(&self.subjects_dir, subject_id, hemi, atlas);
            let annot = read_annot(&annot_file).map_err(|e| e.for_hemi(hemi, &annot_file))?;
            let stats = region_stats(&annot, &data)?;

            let names: Vec<String> = stats.iter().map(|s| s.region.clone()).collect();
            if rows.is_empty() {
                region_names = names;
            } else if names != region_names {
                return Err(NeuroformatsError::Validation(format!("The regions of atlas '{}' for subject '{}' differ from those of subject '{}'.", atlas, subject_id, self.subjects_list[0])));
            }
            rows.push(stats.iter().map(|s| s.mean).collect());
        }

        let names = region_names.iter().map(|r| format!("custom_{}.{}_{}_mean_{}", hemi, atlas, measure, r)).collect();
        let mut flat = Vec::with_capacity(rows.len() * region_names.len());
        for row in rows {
            flat.extend(row);
        }
        let values = Array2::from_shape_vec((self.subjects_list.len(), region_names.len()), flat)
            .map_err(|e| NeuroformatsError::Validation(e.to_string()))?;
        self.append(names, values)
    }

    fn check_file(&self, parts: &[String]) -> FileCheck {
        let mut check = FileCheck { file_name: parts.join("/"), ok: Vec::new(), missing: Vec::new() };
        for subject_id in self.subjects_list.iter() {
            let mut file = self.subjects_dir.join(subject_id);
            for part in parts {
                file = file.join(part);
            }
            if file.is_file() {
                check.ok.push(file);
            } else {
                check.missing.push(file);
            }
        }
        if check.missing.is_empty() {
            log::info!("{} MISSING, {} OK for file '{}'.", check.num_missing(), check.num_ok(), check.file_name);
        } else {
            log::warn!("{} MISSING, {} OK for file '{}'.", check.num_missing(), check.num_ok(), check.file_name);
        }
        check
    }

    /// Check which subjects have the parcellation stats files `stats/?h.<atlas>.stats`. One check per hemisphere and atlas.
    pub fn check_for_parcellation_stats_files(&self, atlas_list: &[&str]) -> Vec<FileCheck> {
        let mut checks = Vec::new();
        for atlas in atlas_list {
            for hemi in self.hemi.hemispheres() {
                checks.push(self.check_file(&[String::from("stats"), format!("{}.{}.stats", hemi, atlas)]));
            }
        }
        checks
    }

    /// Check which subjects have the segmentation stats files `stats/<segmentation>.stats`.
    pub fn check_for_segmentation_stats_files(&self, segmentation_list: &[&str]) -> Vec<FileCheck> {
        segmentation_list.iter().map(|seg| self.check_file(&[String::from("stats"), format!("{}.stats", seg)])).collect()
    }

    /// Write the descriptors as CSV with a header line. The first column holds the subject identifiers.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_path(path)?;
        let mut header = vec![String::from("subject_id")];
        header.extend(self.descriptor_names.iter().cloned());
        wtr.write_record(&header)?;
        for (subject_id, values) in self.subjects_list.iter().zip(self.descriptor_values.outer_iter()) {
            let mut record = vec![subject_id.clone()];
            record.extend(values.iter().map(|v| v.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::fs_annot::test::demo_annot;
    use crate::fs_annot::write_annot;
    use crate::fs_curv::write_curv;
    use crate::fs_stats::test::ASEG_STATS;
    use crate::subject::morphometry_file_path;
    use approx::assert_abs_diff_eq;
    use std::fs;
    use tempfile::tempdir;

    fn aparc_stats(scale: f64) -> String {
        format!("# Measure Cortex, NumVert, Number of Vertices, {}, unitless
# Measure Cortex, WhiteSurfArea, White Surface Total Area, {}, mm^2
# ColHeaders StructName NumVert SurfArea GrayVol ThickAvg ThickStd MeanCurv GausCurv FoldInd CurvInd
bankssts 1722 1180 2911 {} 0.427 0.107 0.021 11 1.5
insula 5420 3516 10230 2.904 0.677 0.118 0.023 48 5.2
", 120000.0 * scale, 85000.5 * scale, 2.5 * scale)
    }

    fn write_stats(subjects_dir: &Path, subject_id: &str, file_name: &str, contents: &str) {
        let stats_dir = subjects_dir.join(subject_id).join("stats");
        fs::create_dir_all(&stats_dir).unwrap();
        fs::write(stats_dir.join(file_name), contents).unwrap();
    }

    fn subjects() -> Vec<String> {
        vec![String::from("subject1"), String::from("subject2")]
    }

    #[test]
    fn parcellation_stats_are_added_per_hemisphere() {
        let dir = tempdir().unwrap();
        for (subject_id, scale) in [("subject1", 1.0), ("subject2", 2.0)].iter() {
            write_stats(dir.path(), subject_id, "lh.aparc.stats", &aparc_stats(*scale));
        }
        let mut bd = BrainDescriptors::new(dir.path(), subjects(), Hemi::Lh);
        bd.add_parcellation_stats(&["aparc"]).unwrap();

        assert_eq!(2 + 9 * 2, bd.num_descriptors());
        assert_eq!((2, 20), bd.descriptor_values.dim());
        assert_eq!(Some(vec![120000.0, 240000.0]), bd.descriptor("stats_lh.aparc_measure_Cortex_NumVert"));
        let thick = bd.descriptor("stats_lh.aparc_table_ThickAvg_bankssts").unwrap();
        assert_abs_diff_eq!(5.0, thick[1], epsilon = 1e-5);
        assert!(bd.descriptor("stats_lh.aparc_table_StructName_insula").is_none());
    }

    #[test]
    fn segmentation_stats_skip_index_columns() {
        let dir = tempdir().unwrap();
        for subject_id in subjects().iter() {
            write_stats(dir.path(), subject_id, "aseg.stats", ASEG_STATS);
        }
        let mut bd = BrainDescriptors::new(dir.path(), subjects(), Hemi::Both);
        bd.add_segmentation_stats(&["aseg"]).unwrap();

        assert_eq!(2 + 7 * 3, bd.num_descriptors());
        assert_eq!(Some(vec![1243340.0, 1243340.0]), bd.descriptor("stats_aseg_measure_BrainSeg_BrainSegVol"));
        assert_eq!(Some(vec![478.0, 478.0]), bd.descriptor("stats_aseg_table_NVoxels_Left-Inf-Lat-Vent"));
        assert!(bd.descriptor_names.iter().all(|n| !n.contains("_SegId_") && !n.contains("_Index_")));
    }

    #[test]
    fn missing_stats_files_fail_aggregation() {
        let dir = tempdir().unwrap();
        write_stats(dir.path(), "subject1", "aseg.stats", ASEG_STATS);
        let mut bd = BrainDescriptors::new(dir.path(), subjects(), Hemi::Both);
        assert!(bd.add_segmentation_stats(&["aseg"]).is_err());
        assert_eq!(0, bd.num_descriptors());
    }

    #[test]
    fn custom_measure_stats_are_region_means() {
        let dir = tempdir().unwrap();
        for (idx, subject_id) in subjects().iter().enumerate() {
            fs::create_dir_all(dir.path().join(subject_id).join("surf")).unwrap();
            fs::create_dir_all(dir.path().join(subject_id).join("label")).unwrap();
            let offset = idx as f32 * 10.0;
            let data: Vec<f32> = [1.0, 2.0, 4.0, 3.0, 5.0, 9.0].iter().map(|v| v + offset).collect();
            write_curv(morphometry_file_path(dir.path(), subject_id, Hemisphere::Lh, "area", "white"), &data, 1).unwrap();
            write_annot(annot_file_path(dir.path(), subject_id, Hemisphere::Lh, "aparc"), &demo_annot()).unwrap();
        }
        let mut bd = BrainDescriptors::new(dir.path(), subjects(), Hemi::Lh);
        bd.add_custom_measure_stats(&["aparc"], &["area"]).unwrap();

        assert_eq!(vec!["custom_lh.aparc_area_mean_unknown", "custom_lh.aparc_area_mean_bankssts", "custom_lh.aparc_area_mean_insula"], bd.descriptor_names);
        assert_eq!(Some(vec![3.0, 13.0]), bd.descriptor("custom_lh.aparc_area_mean_bankssts"));
        assert_eq!(Some(vec![4.0, 14.0]), bd.descriptor("custom_lh.aparc_area_mean_insula"));
    }

    #[test]
    fn stats_files_are_checked_for_all_subjects() {
        let dir = tempdir().unwrap();
        write_stats(dir.path(), "subject1", "aseg.stats", ASEG_STATS);
        write_stats(dir.path(), "subject1", "lh.aparc.stats", &aparc_stats(1.0));
        write_stats(dir.path(), "subject2", "lh.aparc.stats", &aparc_stats(1.0));
        let bd = BrainDescriptors::new(dir.path(), subjects(), Hemi::Both);

        let seg = bd.check_for_segmentation_stats_files(&["aseg"]);
        assert_eq!(1, seg.len());
        assert_eq!((1, 1), (seg[0].num_ok(), seg[0].num_missing()));
        assert_eq!(dir.path().join("subject2").join("stats").join("aseg.stats"), seg[0].missing[0]);

        let parc = bd.check_for_parcellation_stats_files(&["aparc"]);
        assert_eq!(2, parc.len());
        assert_eq!("stats/lh.aparc.stats", parc[0].file_name);
        assert_eq!(2, parc[0].num_ok());
        assert_eq!(2, parc[1].num_missing());
    }

    #[test]
    fn descriptors_can_be_written_as_csv() {
        let dir = tempdir().unwrap();
        for subject_id in subjects().iter() {
            write_stats(dir.path(), subject_id, "aseg.stats", ASEG_STATS);
        }
        let mut bd = BrainDescriptors::new(dir.path(), subjects(), Hemi::Both);
        bd.add_segmentation_stats(&["aseg"]).unwrap();
        let path = dir.path().join("descriptors.csv");
        bd.write_csv(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(3, lines.len());
        assert!(lines[0].starts_with("subject_id,stats_aseg_measure_BrainSeg_BrainSegVol,"));
        assert!(lines[2].starts_with("subject2,1243340,"));
    }
}
