//! Consistency checks for the FreeSurfer data of a group of subjects.
//!
//! The checks compare the vertex counts of surfaces and native space morphometry files, and optionally the modification
//! times of morphometry files and the surfaces they were computed from. Findings are collected per subject as issues,
//! they never abort the checks.

use chrono::{TimeZone, Utc};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::Result;
use crate::hemi::{Hemi, Hemisphere};
use crate::subject::{morphometry_file_path, subject_data_native, subject_mesh, surface_file_path};


pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The default grace period in seconds for files which should have been written after others.
pub const DEFAULT_TIME_BUFFER: f64 = 2.0;

/// The measures checked by [`BrainDataConsistency::check_essentials`].
pub const ESSENTIAL_MEASURES: [&str; 3] = ["area", "volume", "thickness"];


/// A problem found for a subject. The `file` is the file the issue relates to.
#[derive(Debug, Clone, PartialEq)]
pub struct QaIssue {
    pub tag: String,
    pub file: PathBuf,
}


/// An explanation of an issue tag. Tags with parameters like `NO_SURFACE_FILE__white_lh` are explained by their prefix.
pub fn issue_explanation(issue_tag: &str) -> String {
    let base_tag = issue_tag.split("__").next().unwrap_or(issue_tag);
    let expl = match base_tag {
        "MISSING_MORPH_FILE" => "The native space morphology file cannot be read.",
        "TIME_MORPH_FILE" => "The native space morphology file was created/modified before the respective surface file. Note: This can report false positives if the files were changed afterwards, depending on your filesystem or from copying the files.",
        "MORPH_MISMATCH" => "The value count in the native space morphology file does not match the number of vertices in the surface file.",
        "VERT_MISMATCH_SURFACES" => "The vertex count does not match for the surface pair.",
        "NO_SURFACE_FILE" => "The surface file cannot be read.",
        "ALL_SUBJECT_DATA_MISSING" => "The subject directory for the subject cannot be read.",
        _ => return format!("Sorry, no explanation available for issue tag '{}' (from '{}').", base_tag, issue_tag),
    };
    expl.to_string()
}

/// Format seconds since the epoch as UTC time, e.g., `2018-09-13 14:02:57`.
pub fn format_timestamp(timestamp: f64) -> String {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    match Utc.timestamp_opt(secs as i64, nanos).single() {
        Some(dt) => dt.format(TIME_FORMAT).to_string(),
        None => format!("{}", timestamp),
    }
}

/// Format a time difference in seconds like `0:00:25 later`, or `1 day, 2:00:00 earlier` for negative differences.
pub fn format_time_difference(timediff_seconds: f64) -> String {
    let rel = if timediff_seconds < 0.0 { "earlier" } else { "later" };
    let total_micros = (timediff_seconds.abs() * 1e6).round() as u64;
    let micros = total_micros % 1_000_000;
    let total_secs = total_micros / 1_000_000;
    let days = total_secs / 86_400;
    let (h, m, s) = ((total_secs % 86_400) / 3600, (total_secs % 3600) / 60, total_secs % 60);

    let mut formatted = String::new();
    if days > 0 {
        formatted.push_str(&format!("{} day{}, ", days, if days == 1 { "" } else { "s" }));
    }
    formatted.push_str(&format!("{}:{:02}:{:02}", h, m, s));
    if micros > 0 {
        formatted.push_str(&format!(".{:06}", micros));
    }
    format!("{} {}", formatted, rel)
}

fn modification_time(path: &Path) -> Option<f64> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    modified.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs_f64())
}


/// Surface data of one subject and hemisphere, collected during the checks.
#[derive(Debug, Clone, Default, PartialEq)]
struct SurfaceInfo {
    white_vertex_count: usize,
    pial_vertex_count: usize,
    pial_file: Option<PathBuf>,
}


/// Checks the FreeSurfer data of a group of subjects for consistency.
///
/// # Examples
///
/// ```no_run
/// use neuroload::{BrainDataConsistency, Hemi};
/// let subjects = vec![String::from("subject1"), String::from("subject2")];
/// let mut bdc = BrainDataConsistency::new("/data/study1", subjects, Hemi::Both);
/// bdc.check_file_modification_times = true;
/// println!("{}", bdc.check_essentials());
/// bdc.save_html_report("/data/study1/qa.html").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BrainDataConsistency {
    pub subjects_dir: PathBuf,
    pub subjects_list: Vec<String>,
    pub hemi: Hemi,
    /// Whether to report morphometry files which are older than the pial surface.
    pub check_file_modification_times: bool,
    /// Grace period in seconds for the modification time check.
    pub time_buffer: f64,
    issues: Vec<Vec<QaIssue>>,
    surfaces: Vec<Vec<SurfaceInfo>>,
}

impl BrainDataConsistency {
    pub fn new<P: Into<PathBuf>>(subjects_dir: P, subjects_list: Vec<String>, hemi: Hemi) -> BrainDataConsistency {
        let subjects_dir = subjects_dir.into();
        log::info!("Checking data consistency for {} subjects in subjects_dir '{}'.", subjects_list.len(), subjects_dir.display());
        BrainDataConsistency {
            issues: vec![Vec::new(); subjects_list.len()],
            surfaces: Vec::new(),
            subjects_dir,
            subjects_list,
            hemi,
            check_file_modification_times: false,
            time_buffer: DEFAULT_TIME_BUFFER,
        }
    }

    /// The issues found for a subject, in the order they were found.
    pub fn subject_issues(&self, subject_id: &str) -> Option<&[QaIssue]> {
        self.subjects_list.iter().position(|s| s == subject_id).map(|idx| self.issues[idx].as_slice())
    }

    /// The issue tags found for a subject.
    pub fn subject_issue_tags(&self, subject_id: &str) -> Vec<&str> {
        self.subject_issues(subject_id).map(|issues| issues.iter().map(|i| i.tag.as_str()).collect()).unwrap_or_default()
    }

    /// Check the surfaces and the native space `area`, `volume` and `thickness` data. Returns the report by subject.
    pub fn check_essentials(&mut self) -> String {
        self.check_custom(&ESSENTIAL_MEASURES)
    }

    /// Check the surfaces and the given native space measures. Returns the report by subject.
    ///
    /// Each call starts with an empty issue list.
    pub fn check_custom(&mut self, native_measures: &[&str]) -> String {
        log::info!("Performing checks for {} native measures: {}.", native_measures.len(), native_measures.join(", "));
        self.issues = vec![Vec::new(); self.subjects_list.len()];
        self.check_subject_dirs_exist();
        self.count_surface_vertices();
        self.check_surfaces_have_identical_vertex_count();
        for measure in native_measures {
            self.check_native_space_data(measure);
        }
        let report = self.report_by_subject();
        log::info!("{}", report);
        report
    }

    fn append_issue(&mut self, subject_index: usize, tag: String, file: PathBuf) {
        self.issues[subject_index].push(QaIssue { tag, file });
    }

    fn check_subject_dirs_exist(&mut self) {
        for subject_index in 0..self.subjects_list.len() {
            let subject_dir = self.subjects_dir.join(&self.subjects_list[subject_index]);
            if !subject_dir.is_dir() {
                log::warn!("[{}] Missing subject data directory '{}'.", self.subjects_list[subject_index], subject_dir.display());
                self.append_issue(subject_index, String::from("ALL_SUBJECT_DATA_MISSING"), subject_dir);
            }
        }
    }

    fn count_surface_vertices(&mut self) {
        let hemis = self.hemi.hemispheres();
        self.surfaces = vec![vec![SurfaceInfo::default(); hemis.len()]; self.subjects_list.len()];
        for subject_index in 0..self.subjects_list.len() {
            let subject_id = self.subjects_list[subject_index].clone();
            for (hemi_index, hemi) in hemis.iter().enumerate() {
                for surf in ["white", "pial"].iter() {
                    match subject_mesh(&subject_id, &self.subjects_dir, surf, (*hemi).into()) {
                        Ok((mesh, meta)) => {
                            let info = &mut self.surfaces[subject_index][hemi_index];
                            if *surf == "white" {
                                info.white_vertex_count = mesh.num_vertices();
                            } else {
                                info.pial_vertex_count = mesh.num_vertices();
                                info.pial_file = meta.get_path(&format!("{}.surf_file", hemi)).map(|p| p.to_path_buf());
                            }
                        }
                        Err(_) => {
                            let surf_file = surface_file_path(&self.subjects_dir, &subject_id, *hemi, surf);
                            log::warn!("[{}][{}] Missing surface file for surface '{}': '{}'.", subject_id, hemi, surf, surf_file.display());
                            self.append_issue(subject_index, format!("NO_SURFACE_FILE__{}_{}", surf, hemi), surf_file);
                        }
                    }
                }
            }
        }
    }

    fn check_surfaces_have_identical_vertex_count(&mut self) {
        for (hemi_index, hemi) in self.hemi.hemispheres().into_iter().enumerate() {
            for subject_index in 0..self.subjects_list.len() {
                let info = self.surfaces[subject_index][hemi_index].clone();
                if info.white_vertex_count != info.pial_vertex_count {
                    let subject_id = &self.subjects_list[subject_index];
                    log::warn!("[{}][{}] Vertex count mismatch between surfaces white and pial: {} != {}.", subject_id, hemi, info.white_vertex_count, info.pial_vertex_count);
                    let pial_file = surface_file_path(&self.subjects_dir, subject_id, hemi, "pial");
                    self.append_issue(subject_index, format!("VERT_MISMATCH_SURFACES__white_pial_{}", hemi), pial_file);
                }
            }
        }
    }

    fn check_native_space_data(&mut self, measure: &str) {
        log::info!("Verifying native space data for measure '{}'.", measure);
        for (hemi_index, hemi) in self.hemi.hemispheres().into_iter().enumerate() {
            for subject_index in 0..self.subjects_list.len() {
                let subject_id = self.subjects_list[subject_index].clone();
                let info = self.surfaces[subject_index][hemi_index].clone();
                let morph_file = morphometry_file_path(&self.subjects_dir, &subject_id, hemi, measure, "white");

                let num_values = match subject_data_native(&subject_id, &self.subjects_dir, measure, hemi.into()) {
                    Ok((data, _)) => {
                        if self.check_file_modification_times {
                            self.check_modification_time(subject_index, hemi, measure, &morph_file, info.pial_file.as_deref());
                        }
                        data.len()
                    }
                    Err(_) => {
                        log::warn!("[{}][{}] Missing file for native space vertex data of measure '{}': '{}'.", subject_id, hemi, measure, morph_file.display());
                        self.append_issue(subject_index, format!("MISSING_MORPH_FILE__{}_{}", measure, hemi), morph_file.clone());
                        0
                    }
                };

                if num_values != info.white_vertex_count {
                    log::warn!("[{}][{}] Mismatch between length of vertex data for native space measure '{}' and number of vertices of surface white: {} != {}.", subject_id, hemi, measure, num_values, info.white_vertex_count);
                    self.append_issue(subject_index, format!("MORPH_MISMATCH__{}_{}", measure, hemi), morph_file);
                }
            }
        }
    }

    fn check_modification_time(&mut self, subject_index: usize, hemi: Hemisphere, measure: &str, morph_file: &Path, surf_file: Option<&Path>) {
        let (ts_morph, ts_surf) = match (modification_time(morph_file), surf_file.and_then(modification_time)) {
            (Some(m), Some(s)) => (m, s),
            _ => return,
        };
        if ts_morph + self.time_buffer < ts_surf {
            log::warn!("[{}][{}] Morphometry file for measure '{}' was last changed earlier than surface file: {} is before {} ({}).",
                self.subjects_list[subject_index], hemi, measure, format_timestamp(ts_morph), format_timestamp(ts_surf), format_time_difference(ts_morph - ts_surf));
            self.append_issue(subject_index, format!("TIME_MORPH_FILE__{}_{}", measure, hemi), morph_file.to_path_buf());
        }
    }

    /// One line per subject with `OK` or the issue tags, and a summary line.
    pub fn report_by_subject(&self) -> String {
        let mut report = format!("----- Report by subject follows for {} subjects -----\n", self.subjects_list.len());
        let mut num_ok = 0;
        for (subject_id, issues) in self.subjects_list.iter().zip(self.issues.iter()) {
            if issues.is_empty() {
                num_ok += 1;
                report.push_str(&format!("{}: OK\n", subject_id));
            } else {
                let tags: Vec<&str> = issues.iter().map(|i| i.tag.as_str()).collect();
                report.push_str(&format!("{}: {} inconsistencies: {}\n", subject_id, issues.len(), tags.join(" ")));
            }
        }
        report.push_str("----- End of report by subject -----\n");
        report.push_str(&format!("Summary: {} subjects OK and {} with inconsistencies out of {} total.", num_ok, self.subjects_list.len() - num_ok, self.subjects_list.len()));
        report
    }

    /// An HTML page with a table of all subjects and all issue tags found for any subject, in alphabetical order.
    pub fn report_html(&self) -> String {
        let unique_issues: BTreeSet<&str> = self.issues.iter().flat_map(|issues| issues.iter().map(|i| i.tag.as_str())).collect();

        let mut html = format!("<html>\n<head>\n{}</head>\n<body>\n", CSS_STYLE);
        html.push_str("<h1>Braindata QA Report</h1><h4>Hover mouse over issues to see full file path.</h4>\n");
        html.push_str("<table class='issues_table'>\n<tr><th title='The subject identifier'>subject_id</th><th title='Number of issues detected for this subject'>num_issues</th>");
        for issue in unique_issues.iter() {
            html.push_str(&format!("<th title='{}'>{}</th>", issue_explanation(issue), issue));
        }
        html.push_str("</tr>\n");

        for (subject_id, issues) in self.subjects_list.iter().zip(self.issues.iter()) {
            let class = if issues.is_empty() { "count_no_issue" } else { "count_has_issue" };
            html.push_str(&format!("<tr><td class='subject_id'>{}</td><td class='issue_count_subject {}'>{}</td>", subject_id, class, issues.len()));
            for tag in unique_issues.iter() {
                match issues.iter().find(|i| i.tag == *tag) {
                    Some(issue) => html.push_str(&format!("<td class='check_issue' title='{}'>{}</td>\n", issue.file.display(), tag)),
                    None => html.push_str("<td class='check_ok'>ok</td>\n"),
                }
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</table>\n");
        html.push_str(&format!("<h4>Checked {} subjects for issues.</h4>\n", self.subjects_list.len()));
        html.push_str("</body>\n</html>");
        html
    }

    /// Write the [`BrainDataConsistency::report_html`] to a file.
    pub fn save_html_report<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), self.report_html())?;
        log::info!("HTML report written to file '{}'.", path.as_ref().display());
        Ok(())
    }
}


const CSS_STYLE: &str = "<style>
body {
  width: 95%;
}
table {
  border-collapse: collapse;
  border: 1px solid silver;
  width: 100%;
}
th {
  text-align: center;
  padding: 8px;
  background-color: #0000FF;
  color: white;
}
td {
  text-align: left;
  padding: 8px;
}
td.check_issue {
  background-color: #99555555
}
td.count_no_issue {
  background-color: #55995555
}
td.count_has_issue {
  background-color: #99555555
}
tr:nth-child(even){background-color: #D5D5D5}
tr:hover {
  background: silver;
  cursor: pointer;
}
</style>";
