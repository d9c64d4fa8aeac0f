//! Loading of standard space morphometry data for a group of subjects.
//!
//! All subjects must have their data mapped to the same average subject, so every subject contributes a row of the
//! same length to the group data matrix.

use ndarray::Array2;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{NeuroformatsError, Result};
use crate::fs_stats::stack_rows;
use crate::hemi::{Hemi, HemiPair, Hemisphere};
use crate::meta::MetaData;
use crate::subject::{default_subjects_dir, morphometry_suffix_for_surface, subject_avg, SubjectOptions};
use crate::subjects::{detect_subjects_in_directory, fill_template_filename, read_subjects_file};


/// How the subjects of a group are determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectsDetectionMode {
    /// Use the subjects list if given, else the subjects file if it exists, else search the subjects directory.
    Auto,
    /// Read the subjects file, which must exist.
    File,
    /// Use the given subjects list.
    List,
    /// Use all subjects found in the subjects directory, see [`detect_subjects_in_directory`].
    SearchDir,
}

impl SubjectsDetectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectsDetectionMode::Auto => "auto",
            SubjectsDetectionMode::File => "file",
            SubjectsDetectionMode::List => "list",
            SubjectsDetectionMode::SearchDir => "search_dir",
        }
    }
}

impl fmt::Display for SubjectsDetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubjectsDetectionMode {
    type Err = NeuroformatsError;

    fn from_str(s: &str) -> Result<SubjectsDetectionMode> {
        match s {
            "auto" => Ok(SubjectsDetectionMode::Auto),
            "file" => Ok(SubjectsDetectionMode::File),
            "list" => Ok(SubjectsDetectionMode::List),
            "search_dir" => Ok(SubjectsDetectionMode::SearchDir),
            _ => Err(NeuroformatsError::InvalidArgument(format!("subjects_detection_mode must be one of {{'auto', 'file', 'list', 'search_dir'}} but is '{}'.", s))),
        }
    }
}


/// Settings for [`load_group_data`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOptions {
    pub measure: String,
    pub surf: String,
    pub hemi: Hemi,
    pub fwhm: Option<String>,
    pub subjects_dir: PathBuf,
    pub average_subject: String,
    pub subjects_list: Option<Vec<String>>,
    pub subjects_file: String,
    /// The directory containing the subjects file. Defaults to `subjects_dir`.
    pub subjects_file_dir: Option<PathBuf>,
    /// File name templates for the morphometry files, relative to `<subject>/surf`. See [`template_substitutions`] for the variables.
    pub custom_morphometry_file_templates: Option<HemiPair<String>>,
    pub subjects_detection_mode: SubjectsDetectionMode,
}

impl Default for GroupOptions {
    fn default() -> GroupOptions {
        GroupOptions {
            measure: String::from("area"),
            surf: String::from("white"),
            hemi: Hemi::Both,
            fwhm: Some(String::from("10")),
            subjects_dir: default_subjects_dir(),
            average_subject: String::from("fsaverage"),
            subjects_list: None,
            subjects_file: String::from("subjects.txt"),
            subjects_file_dir: None,
            custom_morphometry_file_templates: None,
            subjects_detection_mode: SubjectsDetectionMode::Auto,
        }
    }
}


/// The data of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupData {
    /// Shape (num_subjects, num_values). Row `i` holds the data of `subjects[i]`.
    pub data: Array2<f32>,
    pub subjects: Vec<String>,
    /// The metadata of each subject.
    pub subject_meta: BTreeMap<String, MetaData>,
    /// How the subjects were determined and which templates were used.
    pub run_meta: MetaData,
}


/// The template variables for the morphometry file of one subject and hemisphere:
/// `MEASURE`, `SURF_RAW` (the surface name), `SURF` (the file name suffix of the surface, see
/// [`morphometry_suffix_for_surface`]), `HEMI`, `FWHM`, `SUBJECT_ID` and `AVERAGE_SUBJECT`.
pub fn template_substitutions(opts: &GroupOptions, subject_id: &str, hemi: Hemisphere) -> HashMap<&'static str, String> {
    let mut subs = HashMap::new();
    subs.insert("MEASURE", opts.measure.clone());
    subs.insert("SURF_RAW", opts.surf.clone());
    subs.insert("SURF", morphometry_suffix_for_surface(&opts.surf));
    subs.insert("HEMI", hemi.to_string());
    subs.insert("FWHM", opts.fwhm.clone().unwrap_or_default());
    subs.insert("SUBJECT_ID", subject_id.to_string());
    subs.insert("AVERAGE_SUBJECT", opts.average_subject.clone());
    subs
}


/// Determine the subjects of the group according to the `subjects_detection_mode`, and record how in `run_meta`.
pub fn resolve_subjects(opts: &GroupOptions, run_meta: &mut MetaData) -> Result<Vec<String>> {
    let mode = opts.subjects_detection_mode;
    run_meta.insert("subjects_detection_mode", mode.as_str());
    run_meta.insert("subjects_file_used", false);

    if (mode == SubjectsDetectionMode::File || mode == SubjectsDetectionMode::SearchDir) && opts.subjects_list.is_some() {
        return Err(NeuroformatsError::InvalidArgument(format!("subjects_detection_mode is set to '{}' but a subjects_list was given. Not supported in subjects_detection_mode 'file' and 'search_dir'.", mode)));
    }

    let search_dir = || detect_subjects_in_directory(&opts.subjects_dir, &[opts.average_subject.as_str()], &["surf"]);

    match (mode, &opts.subjects_list) {
        (SubjectsDetectionMode::Auto, Some(list)) => {
            run_meta.insert("subjects_detection_mode_auto_used_method", "list");
            Ok(list.clone())
        }
        (SubjectsDetectionMode::List, Some(list)) => Ok(list.clone()),
        (SubjectsDetectionMode::List, None) => Err(NeuroformatsError::InvalidArgument(String::from("subjects_detection_mode is set to 'list' but the subjects_list parameter was not given."))),
        (SubjectsDetectionMode::SearchDir, _) => search_dir(),
        _ => {
            // Modes 'auto' without list, and 'file'.
            let subjects_file = opts.subjects_file_dir.as_ref().unwrap_or(&opts.subjects_dir).join(&opts.subjects_file);
            if subjects_file.is_file() {
                let subjects = read_subjects_file(&subjects_file, false, 0, b',')?;
                run_meta.insert("subjects_file_used", true);
                run_meta.insert("subjects_file", subjects_file.as_path());
                if mode == SubjectsDetectionMode::Auto {
                    run_meta.insert("subjects_detection_mode_auto_used_method", "file");
                }
                Ok(subjects)
            } else if mode == SubjectsDetectionMode::File {
                Err(NeuroformatsError::InvalidArgument(format!("subjects_detection_mode is set to 'file' but the subjects_file '{}' does not exist.", subjects_file.display())))
            } else {
                run_meta.insert("subjects_detection_mode_auto_used_method", "search_dir");
                search_dir()
            }
        }
    }
}


/// Load the standard space morphometry data of all subjects of a group into a matrix with one row per subject.
///
/// # Examples
///
/// ```no_run
/// use neuroload::{load_group_data, GroupOptions};
/// let opts = GroupOptions { measure: String::from("thickness"), ..GroupOptions::default() };
/// let group = load_group_data(&opts).unwrap();
/// println!("Loaded data for {} subjects.", group.subjects.len());
/// ```
pub fn load_group_data(opts: &GroupOptions) -> Result<GroupData> {
    let mut run_meta = MetaData::new();
    let subjects = resolve_subjects(opts, &mut run_meta)?;
    log::info!("Loading '{}' data for {} subjects in '{}'.", opts.measure, subjects.len(), opts.subjects_dir.display());

    match &opts.custom_morphometry_file_templates {
        Some(templates) => {
            run_meta.insert("custom_morphometry_file_templates_used", true);
            run_meta.insert("lh.custom_morphometry_file_template", templates.lh.as_str());
            run_meta.insert("rh.custom_morphometry_file_template", templates.rh.as_str());
        }
        None => run_meta.insert("custom_morphometry_file_templates_used", false),
    }

    let mut rows: Vec<Vec<f32>> = Vec::with_capacity(subjects.len());
    let mut subject_meta = BTreeMap::new();
    for subject_id in subjects.iter() {
        let custom_morphometry_files = match &opts.custom_morphometry_file_templates {
            Some(templates) => Some(HemiPair::new(
                fill_template_filename(&templates.lh, &template_substitutions(opts, subject_id, Hemisphere::Lh))?,
                fill_template_filename(&templates.rh, &template_substitutions(opts, subject_id, Hemisphere::Rh))?,
            )),
            None => None,
        };
        let subject_opts = SubjectOptions {
            subjects_dir: opts.subjects_dir.clone(),
            surf: opts.surf.clone(),
            measure: opts.measure.clone(),
            hemi: opts.hemi,
            fwhm: opts.fwhm.clone(),
            average_subject: opts.average_subject.clone(),
            load_surface_files: false,
            custom_morphometry_files,
            ..SubjectOptions::default()
        };
        let data = subject_avg(subject_id, &subject_opts)?;
        rows.push(data.morphometry.unwrap_or_default());
        subject_meta.insert(subject_id.clone(), data.meta);
    }

    let row_len = rows.first().map(|r| r.len()).unwrap_or(0);
    let data = stack_rows(&rows, row_len).map_err(|_| {
        NeuroformatsError::Validation(format!("Subjects have different numbers of data values for measure '{}', cannot build group data matrix.", opts.measure))
    })?;

    Ok(GroupData {
        data,
        subjects,
        subject_meta,
        run_meta,
    })
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::subject::test::write_standard_space_data;
    use crate::subjects::write_subjects_file;
    use std::fs;
    use tempfile::tempdir;

    fn group_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for (idx, subject_id) in ["subject1", "subject2", "subject3"].iter().enumerate() {
            write_standard_space_data(dir.path(), subject_id, "area", 3, idx as f32 * 1000.0);
        }
        fs::create_dir_all(dir.path().join("fsaverage").join("surf")).unwrap();
        dir
    }

    fn options(dir: &tempfile::TempDir) -> GroupOptions {
        GroupOptions { subjects_dir: dir.path().to_path_buf(), ..GroupOptions::default() }
    }

    #[test]
    fn detection_modes_are_parsed() {
        assert_eq!(SubjectsDetectionMode::SearchDir, "search_dir".parse().unwrap());
        assert!("dir".parse::<SubjectsDetectionMode>().unwrap_err().to_string().contains("'dir'"));
    }

    #[test]
    fn auto_mode_prefers_the_list() {
        let dir = group_dir();
        write_subjects_file(dir.path().join("subjects.txt"), &["subject1"]).unwrap();
        let opts = GroupOptions { subjects_list: Some(vec![String::from("subject3"), String::from("subject2")]), ..options(&dir) };
        let mut run_meta = MetaData::new();
        assert_eq!(vec!["subject3", "subject2"], resolve_subjects(&opts, &mut run_meta).unwrap());
        assert_eq!(Some("list"), run_meta.get_str("subjects_detection_mode_auto_used_method"));
    }

    #[test]
    fn auto_mode_uses_the_subjects_file_before_the_directory() {
        let dir = group_dir();
        write_subjects_file(dir.path().join("subjects.txt"), &["subject2"]).unwrap();
        let mut run_meta = MetaData::new();
        assert_eq!(vec!["subject2"], resolve_subjects(&options(&dir), &mut run_meta).unwrap());
        assert_eq!(Some("file"), run_meta.get_str("subjects_detection_mode_auto_used_method"));
        assert_eq!(Some(true), run_meta.get_bool("subjects_file_used"));
    }

    #[test]
    fn auto_mode_falls_back_to_searching_the_directory() {
        let dir = group_dir();
        let mut run_meta = MetaData::new();
        assert_eq!(vec!["subject1", "subject2", "subject3"], resolve_subjects(&options(&dir), &mut run_meta).unwrap());
        assert_eq!(Some("search_dir"), run_meta.get_str("subjects_detection_mode_auto_used_method"));
    }

    #[test]
    fn invalid_mode_combinations_are_rejected() {
        let dir = group_dir();
        let mut run_meta = MetaData::new();
        let file_mode = GroupOptions { subjects_detection_mode: SubjectsDetectionMode::File, ..options(&dir) };
        assert!(resolve_subjects(&file_mode, &mut run_meta).is_err());
        let list_mode = GroupOptions { subjects_detection_mode: SubjectsDetectionMode::List, ..options(&dir) };
        assert!(resolve_subjects(&list_mode, &mut run_meta).is_err());
        let search_with_list = GroupOptions { subjects_detection_mode: SubjectsDetectionMode::SearchDir, subjects_list: Some(vec![String::from("subject1")]), ..options(&dir) };
        assert!(resolve_subjects(&search_with_list, &mut run_meta).is_err());
    }

    #[test]
    fn group_data_has_one_row_per_subject() {
        let dir = group_dir();
        let group = load_group_data(&options(&dir)).unwrap();
        assert_eq!((3, 6), group.data.dim());
        assert_eq!(1001.0, group.data[[1, 1]]);
        assert_eq!(2100.0, group.data[[2, 3]]);
        assert_eq!(Some(3), group.subject_meta["subject2"].get_int("rh.num_data_points"));
        assert_eq!(Some(false), group.run_meta.get_bool("custom_morphometry_file_templates_used"));
    }

    #[test]
    fn group_rows_hold_the_subject_data_unchanged() {
        let dir = group_dir();
        write_standard_space_data(dir.path(), "subject2", "area", 3, 0.1);
        let group = load_group_data(&options(&dir)).unwrap();

        let opts = SubjectOptions { measure: String::from("area"), load_surface_files: false, ..SubjectOptions::with_subjects_dir(dir.path()) };
        let subject2 = subject_avg("subject2", &opts).unwrap().morphometry.unwrap();
        assert_eq!(subject2, group.data.row(1).to_vec());
        assert_eq!(0.1f32, group.data[[1, 0]]);
    }

    #[test]
    fn custom_templates_are_filled_per_subject_and_hemisphere() {
        let dir = group_dir();
        let opts = GroupOptions {
            hemi: Hemi::Lh,
            custom_morphometry_file_templates: Some(HemiPair::new(
                String::from("${HEMI}.${MEASURE}${SURF}.fwhm${FWHM}.${AVERAGE_SUBJECT}.mgh"),
                String::from("${HEMI}.${MEASURE}${SURF}.fwhm${FWHM}.${AVERAGE_SUBJECT}.mgh"),
            )),
            ..options(&dir)
        };
        let group = load_group_data(&opts).unwrap();
        assert_eq!((3, 3), group.data.dim());
        assert_eq!(Some(true), group.subject_meta["subject1"].get_bool("custom_morphometry_files_used"));
    }

    #[test]
    fn subjects_with_different_vertex_counts_are_rejected() {
        let dir = group_dir();
        write_standard_space_data(dir.path(), "subject3", "area", 4, 0.0);
        match load_group_data(&options(&dir)) {
            Err(NeuroformatsError::Validation(_)) => {}
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
