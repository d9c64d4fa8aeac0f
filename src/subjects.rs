//! Discovery of the subjects in a FreeSurfer subjects directory, subjects files and file name templates.

use csv::{ReaderBuilder, WriterBuilder};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NeuroformatsError, Result};


/// Read subject identifiers from a CSV file with one subject per row.
///
/// # Parameters
///
/// * `has_header_line`: whether the first line is a header which should be skipped.
/// * `index_of_subject_id_field`: the 0-based column holding the subject identifier.
/// * `delimiter`: the field separator, typically `b','`.
///
/// # Examples
///
/// ```no_run
/// let subjects = neuroload::read_subjects_file("/data/study1/subjects.txt", false, 0, b',').unwrap();
/// ```
pub fn read_subjects_file<P: AsRef<Path>>(subjects_file: P, has_header_line: bool, index_of_subject_id_field: usize, delimiter: u8) -> Result<Vec<String>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(has_header_line)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(subjects_file)?;

    let mut subject_ids = Vec::new();
    for result in rdr.records() {
        let record = result?;
        match record.get(index_of_subject_id_field) {
            Some(id) => subject_ids.push(id.trim().to_string()),
            None => return Err(NeuroformatsError::InvalidArgument(format!("Subjects file row {} has no field with index {}.", subject_ids.len() + 1, index_of_subject_id_field))),
        }
    }
    Ok(subject_ids)
}


/// Write a subjects file with one subject identifier per line.
pub fn write_subjects_file<P: AsRef<Path>, S: AsRef<str>>(file_name: P, subjects_list: &[S]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(file_name)?;
    for subject_id in subjects_list {
        wtr.write_record(&[subject_id.as_ref()])?;
    }
    wtr.flush()?;
    Ok(())
}


/// Find the subjects in a subjects directory.
///
/// A subject is a direct sub directory that contains all `required_subdirs_for_hits` (typically `surf`) and is not in
/// `ignore_dir_names` (typically the average subject `fsaverage`). The result is sorted.
pub fn detect_subjects_in_directory<P: AsRef<Path>>(subjects_dir: P, ignore_dir_names: &[&str], required_subdirs_for_hits: &[&str]) -> Result<Vec<String>> {
    let mut detected_subjects = Vec::new();
    for entry in fs::read_dir(subjects_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let subject_id = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        if ignore_dir_names.contains(&subject_id.as_str()) {
            continue;
        }
        if required_subdirs_for_hits.iter().all(|sub| path.join(sub).is_dir()) {
            detected_subjects.push(subject_id);
        }
    }
    detected_subjects.sort();
    Ok(detected_subjects)
}


/// Substitute the variables in a file name template.
///
/// Variables are written as `${NAME}` or `$NAME`, and `$$` is a literal `$`. A variable without a substitution is an error.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// let mut subs = HashMap::new();
/// subs.insert("HEMI", String::from("lh"));
/// subs.insert("MEASURE", String::from("area"));
/// let name = neuroload::fill_template_filename("${HEMI}.${MEASURE}.mgh", &subs).unwrap();
/// assert_eq!("lh.area.mgh", name);
/// ```
pub fn fill_template_filename(template: &str, substitutions: &HashMap<&str, String>) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let name = match chars.peek() {
            Some((_, '$')) => {
                chars.next();
                result.push('$');
                continue;
            }
            Some((_, '{')) => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, ch)) => name.push(ch),
                        None => return Err(NeuroformatsError::InvalidArgument(format!("Unclosed '${{' at position {} in template '{}'.", pos, template))),
                    }
                }
                name
            }
            Some((_, ch)) if ch.is_ascii_alphabetic() || *ch == '_' => {
                let mut name = String::new();
                while let Some((_, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || *ch == '_' {
                        name.push(*ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                name
            }
            _ => return Err(NeuroformatsError::InvalidArgument(format!("Invalid placeholder at position {} in template '{}'.", pos, template))),
        };
        match substitutions.get(name.as_str()) {
            Some(value) => result.push_str(value),
            None => return Err(NeuroformatsError::InvalidArgument(format!("No substitution for template variable '{}' in template '{}'.", name, template))),
        }
    }
    Ok(result)
}


/// The file to look for in [`do_subject_files_exist`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectFile {
    /// The same file name for all subjects.
    Name(String),
    /// A file name template, in which `${SUBJECT_ID}` is replaced with the subject identifier.
    Template(String),
}

/// Check for each subject whether a file exists in `subjects_dir/<subject>/<sub_dir>`.
///
/// Returns the missing files by subject. Subjects which have the file are not listed.
pub fn do_subject_files_exist<P: AsRef<Path>, S: AsRef<str>>(subjects_list: &[S], subjects_dir: P, file: &SubjectFile, sub_dir: Option<&str>) -> Result<BTreeMap<String, PathBuf>> {
    let mut missing_files_by_subject = BTreeMap::new();
    for subject_id in subjects_list {
        let subject_id = subject_id.as_ref();
        let file_name = match file {
            SubjectFile::Name(name) => name.clone(),
            SubjectFile::Template(template) => {
                let mut subs = HashMap::new();
                subs.insert("SUBJECT_ID", subject_id.to_string());
                fill_template_filename(template, &subs)?
            }
        };
        let mut full_file = subjects_dir.as_ref().join(subject_id);
        if let Some(sub_dir) = sub_dir {
            full_file = full_file.join(sub_dir);
        }
        let full_file = full_file.join(file_name);
        if !full_file.is_file() {
            missing_files_by_subject.insert(subject_id.to_string(), full_file);
        }
    }
    Ok(missing_files_by_subject)
}


/// Load vertex indices from a text file with one index per line, or comma-separated indices.
pub fn load_vertex_indices<P: AsRef<Path>>(vertex_indices_file: P) -> Result<Vec<usize>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(vertex_indices_file)?;

    let mut indices = Vec::new();
    for result in rdr.records() {
        for field in result?.iter() {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            indices.push(parse_index(field)?);
        }
    }
    Ok(indices)
}

/// Parse an index written as an integer or as an integral float like `3.000000000000000000e+00`.
fn parse_index(field: &str) -> Result<usize> {
    if let Ok(idx) = field.parse::<usize>() {
        return Ok(idx);
    }
    match field.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as usize),
        _ => Err(NeuroformatsError::InvalidArgument(format!("'{}' is not a valid vertex index.", field))),
    }
}

/// Save vertex indices to a text file, one index per line.
pub fn save_vertex_indices<P: AsRef<Path>>(vertex_indices_file: P, vertex_indices: &[usize]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(vertex_indices_file)?;
    for idx in vertex_indices {
        wtr.write_record(&[idx.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}


#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    fn substitutions() -> HashMap<&'static str, String> {
        let mut subs = HashMap::new();
        subs.insert("HEMI", String::from("lh"));
        subs.insert("MEASURE", String::from("area"));
        subs.insert("SUBJECT_ID", String::from("subject1"));
        subs
    }

    #[test]
    fn subjects_files_can_be_written_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subjects.txt");
        write_subjects_file(&path, &["subject1", "subject2", "subject3"]).unwrap();
        assert_eq!(vec!["subject1", "subject2", "subject3"], read_subjects_file(&path, false, 0, b',').unwrap());
    }

    #[test]
    fn subjects_files_with_header_and_several_columns_are_supported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subjects.csv");
        fs::write(&path, "age,id,group\n23,subject1,control\n31,subject2,patient\n").unwrap();
        assert_eq!(vec!["subject1", "subject2"], read_subjects_file(&path, true, 1, b',').unwrap());
        assert!(read_subjects_file(&path, true, 3, b',').is_err());
    }

    #[test]
    fn subjects_are_detected_by_their_surf_dir() {
        let dir = tempdir().unwrap();
        for sub in ["subject2/surf", "subject1/surf", "fsaverage/surf", "notasubject/mri"].iter() {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        fs::write(dir.path().join("subjects.txt"), "subject1\n").unwrap();

        let subjects = detect_subjects_in_directory(dir.path(), &["fsaverage"], &["surf"]).unwrap();
        assert_eq!(vec!["subject1", "subject2"], subjects);
        let subjects = detect_subjects_in_directory(dir.path(), &[], &["surf"]).unwrap();
        assert_eq!(3, subjects.len());
    }

    #[test]
    fn template_variables_are_substituted() {
        let subs = substitutions();
        assert_eq!("lh.area.fwhm10.mgh", fill_template_filename("${HEMI}.${MEASURE}.fwhm10.mgh", &subs).unwrap());
        assert_eq!("subject1/lh_cost$", fill_template_filename("$SUBJECT_ID/${HEMI}_cost$$", &subs).unwrap());
        assert!(fill_template_filename("${FWHM}", &subs).is_err());
        assert!(fill_template_filename("${HEMI", &subs).is_err());
    }

    #[test]
    fn missing_subject_files_are_reported() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("subject1/surf")).unwrap();
        fs::create_dir_all(dir.path().join("subject2/surf")).unwrap();
        fs::write(dir.path().join("subject1/surf/lh.area"), "").unwrap();
        fs::write(dir.path().join("subject2/surf/subject2.txt"), "").unwrap();

        let missing = do_subject_files_exist(&["subject1", "subject2"], dir.path(), &SubjectFile::Name(String::from("lh.area")), Some("surf")).unwrap();
        assert_eq!(1, missing.len());
        assert_eq!(dir.path().join("subject2/surf/lh.area"), missing["subject2"]);

        let missing = do_subject_files_exist(&["subject1", "subject2"], dir.path(), &SubjectFile::Template(String::from("${SUBJECT_ID}.txt")), Some("surf")).unwrap();
        assert_eq!(vec!["subject1"], missing.keys().cloned().collect::<Vec<String>>());
    }

    #[test]
    fn vertex_indices_can_be_saved_and_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("verts.txt");
        save_vertex_indices(&path, &[3, 4, 6, 9]).unwrap();
        assert_eq!(vec![3, 4, 6, 9], load_vertex_indices(&path).unwrap());

        fs::write(&path, "3.000000000000000000e+00\n1.100000000000000000e+01\n").unwrap();
        assert_eq!(vec![3, 11], load_vertex_indices(&path).unwrap());
        fs::write(&path, "-1\n").unwrap();
        assert!(load_vertex_indices(&path).is_err());
    }
}
