//! Functions for parsing FreeSurfer stats files, like `stats/aseg.stats` or `stats/lh.aparc.stats`.
//!
//! A stats file mixes comment lines starting with `#` and whitespace-separated table rows. Some comment lines carry
//! data: `# Measure` lines hold global measures (like the total brain volume), and the `# TableCol`, `# NRows`,
//! `# NTableCols` and `# ColHeaders` lines describe the table.

use csv::{ReaderBuilder, Trim};
use ndarray::{Array1, Array2, ArrayView1};

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{NeuroformatsError, Result};
use crate::util::{table_fields, whitespace_table_reader};


const MEASURE_PREFIX: &str = "# Measure ";

/// The name of the column holding the region names in atlas and segmentation stats tables.
pub const REGION_NAME_COLUMN: &str = "StructName";


/// A global measure from a `# Measure` line, like `BrainSeg, BrainSegVol, Brain Segmentation Volume, 1243340.000000, mm^3`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsMeasure {
    pub fields: Vec<String>,
}

impl StatsMeasure {
    /// Parse the comma-separated fields following the `# Measure` prefix.
    fn from_line(line: &str) -> Result<StatsMeasure> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(line[MEASURE_PREFIX.len()..].as_bytes());
        let fields = match rdr.records().next() {
            Some(record) => record?.iter().map(|s| s.to_string()).collect(),
            None => Vec::new(),
        };
        Ok(StatsMeasure { fields })
    }

    pub fn name(&self) -> &str {
        self.field(0)
    }

    pub fn short_name(&self) -> &str {
        self.field(1)
    }

    pub fn description(&self) -> &str {
        self.field(2)
    }

    pub fn unit(&self) -> &str {
        self.field(4)
    }

    /// The name under which this measure is reported in group data, e.g., `BrainSeg_BrainSegVol`.
    pub fn unique_name(&self) -> String {
        format!("{}_{}", self.name(), self.short_name())
    }

    pub fn value(&self) -> Result<f64> {
        self.field(3).trim().parse::<f64>()
            .map_err(|e| NeuroformatsError::InvalidStatsFile(format!("measure '{}' has no numeric value: {}", self.unique_name(), e)))
    }

    fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(|s| s.as_str()).unwrap_or("")
    }
}


/// The table description from a stats file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsTableMetaData {
    /// Simple properties, e.g., `NRows` and `ColHeaders`.
    pub entries: BTreeMap<String, String>,
    /// Per-column properties from `# TableCol` lines, by 1-based column index.
    pub column_info: BTreeMap<usize, BTreeMap<String, String>>,
}

impl StatsTableMetaData {
    fn add_line(&mut self, line: &str) -> Result<()> {
        if line.starts_with("# TableCol") {
            let parts = split_n_whitespace(line, 5);
            if parts.len() < 5 {
                return Err(NeuroformatsError::InvalidStatsFile(format!("incomplete TableCol line '{}'", line)));
            }
            let column_index: usize = parts[2].parse()
                .map_err(|e| NeuroformatsError::InvalidStatsFile(format!("invalid column index in line '{}': {}", line, e)))?;
            self.column_info.entry(column_index).or_insert_with(BTreeMap::new).insert(parts[3].to_string(), parts[4].trim_end().to_string());
        } else {
            let parts = split_n_whitespace(line, 3);
            if parts.len() < 3 {
                return Err(NeuroformatsError::InvalidStatsFile(format!("table property line '{}' has no value", line)));
            }
            self.entries.insert(parts[1].to_string(), parts[2].trim_end().to_string());
        }
        Ok(())
    }

    /// The column headers, preferring the `# TableCol` data over the `# ColHeaders` line.
    fn column_headers(&self) -> Result<Vec<String>> {
        let from_col_headers: Option<Vec<String>> = self.entries.get("ColHeaders").map(|h| h.split_whitespace().map(|s| s.to_string()).collect());
        let from_table_col: Option<Vec<String>> = if self.column_info.is_empty() {
            None
        } else {
            self.column_info.values().map(|info| info.get("ColHeader").cloned()).collect()
        };

        match (from_table_col, from_col_headers) {
            (None, None) => Err(NeuroformatsError::InvalidStatsFile(String::from("Could not determine header line: stats file contains no table header information."))),
            (Some(h), None) | (None, Some(h)) => {
                log::warn!("Stats data is missing some header data. Incomplete stats file? Could still parse requested data, but you may want to check the stats file.");
                Ok(h)
            }
            (Some(table_col), Some(col_headers)) => {
                if table_col != col_headers {
                    log::warn!("Stats data regarding table header is inconsistent between ColHeaders and TableCol->ColHeader entries. Returning data based on TableCol->ColHeader entries.");
                }
                Ok(table_col)
            }
        }
    }
}

/// Split a line into at most `n` whitespace-separated parts. The last part keeps its inner whitespace.
fn split_n_whitespace(line: &str, n: usize) -> Vec<String> {
    let mut parts = Vec::with_capacity(n);
    let mut rest = line.trim_start();
    while parts.len() + 1 < n {
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}


/// The parsed contents of a stats file. All table values are kept as strings, see [`stats_table_to_columns`] for typed data.
#[derive(Debug, Clone, PartialEq)]
pub struct FsStats {
    pub ignored_lines: Vec<String>,
    pub measures: Vec<StatsMeasure>,
    pub table_data: Vec<Vec<String>>,
    pub table_meta_data: StatsTableMetaData,
    pub table_column_headers: Vec<String>,
}

impl FsStats {
    /// Parse the lines of a stats file.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<FsStats> {
        let mut ignored_lines = Vec::new();
        let mut measures = Vec::new();
        let mut table_lines = String::new();
        let mut table_meta_data = StatsTableMetaData::default();

        for line in lines {
            let line = line.as_ref();
            if line.starts_with('#') {
                if line.starts_with(MEASURE_PREFIX) {
                    measures.push(StatsMeasure::from_line(line)?);
                } else if line.starts_with("# TableCol") || line.starts_with("# NRows") || line.starts_with("# NTableCols") || line.starts_with("# ColHeaders") {
                    table_meta_data.add_line(line)?;
                } else {
                    ignored_lines.push(line.to_string());
                }
            } else {
                table_lines.push_str(line);
                table_lines.push('\n');
            }
        }

        let mut table_data = Vec::new();
        for result in whitespace_table_reader(table_lines.as_bytes()).records() {
            let record = result?;
            let fields = table_fields(&record);
            if !fields.is_empty() {
                table_data.push(fields.iter().map(|s| s.to_string()).collect());
            }
        }

        let table_column_headers = table_meta_data.column_headers()?;
        Ok(FsStats {
            ignored_lines,
            measures,
            table_data,
            table_meta_data,
            table_column_headers,
        })
    }

    /// The measure with the given unique name, see [`StatsMeasure::unique_name`].
    pub fn measure(&self, unique_name: &str) -> Option<&StatsMeasure> {
        self.measures.iter().find(|m| m.unique_name() == unique_name)
    }
}

impl fmt::Display for FsStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Stats with {} measures and a table of {} rows with {} columns.", self.measures.len(), self.table_data.len(), self.table_column_headers.len())
    }
}


/// Read a FreeSurfer stats file.
///
/// # Examples
///
/// ```no_run
/// let stats = neuroload::read_stats("/path/to/subjects_dir/subject1/stats/aseg.stats").unwrap();
/// println!("{} measures, table columns: {}", stats.measures.len(), stats.table_column_headers.join(","));
/// ```
pub fn read_stats<P: AsRef<Path>>(path: P) -> Result<FsStats> {
    let contents = fs::read_to_string(path)?;
    let lines: Vec<&str> = contents.lines().collect();
    FsStats::from_lines(&lines)
}


/// The data type of a stats table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Str,
}

/// The types of the 10 columns of `aseg.stats`: Index SegId NVoxels Volume_mm3 StructName normMean normStdDev normMin normMax normRange.
pub fn typelist_for_aseg_stats() -> Vec<ColumnType> {
    use ColumnType::*;
    vec![Int, Int, Int, Float, Str, Float, Float, Float, Float, Float]
}

/// The types of the 10 columns of the atlas stats files like `?h.aparc.stats`, `?h.aparc.a2009s.stats` and `?h.aparc.DKTatlas.stats`:
/// StructName NumVert SurfArea GrayVol ThickAvg ThickStd MeanCurv GausCurv FoldInd CurvInd.
pub fn typelist_for_aparc_atlas_stats() -> Vec<ColumnType> {
    use ColumnType::*;
    vec![Str, Int, Int, Int, Float, Float, Float, Float, Int, Float]
}


/// A typed stats table column.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsColumn {
    Int(Array1<i32>),
    Float(Array1<f32>),
    Str(Vec<String>),
}

impl StatsColumn {
    pub fn len(&self) -> usize {
        match self {
            StatsColumn::Int(a) => a.len(),
            StatsColumn::Float(a) => a.len(),
            StatsColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The values as f64, or `None` for string columns.
    pub fn to_f64(&self) -> Option<Array1<f64>> {
        match self {
            StatsColumn::Int(a) => Some(a.mapv(|v| v as f64)),
            StatsColumn::Float(a) => Some(a.mapv(|v| v as f64)),
            StatsColumn::Str(_) => None,
        }
    }
}


/// Typed stats table columns, in table order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsTable {
    pub columns: Vec<(String, StatsColumn)>,
}

impl StatsTable {
    pub fn get(&self, name: &str) -> Option<&StatsColumn> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }
}


/// Convert the string table of a stats file into typed columns. The `type_list` must contain one type per column.
pub fn stats_table_to_columns(stats: &FsStats, type_list: &[ColumnType]) -> Result<StatsTable> {
    let header = &stats.table_column_headers;
    if type_list.len() != header.len() {
        return Err(NeuroformatsError::InvalidArgument(format!("Length of type_list ({}) must match number of table column headers ({}).", type_list.len(), header.len())));
    }
    for (row_idx, row) in stats.table_data.iter().enumerate() {
        if row.len() != header.len() {
            return Err(NeuroformatsError::InvalidStatsFile(format!("table row {} has {} values, but there are {} columns", row_idx + 1, row.len(), header.len())));
        }
    }

    let mut table = StatsTable::default();
    for (col_idx, (name, ctype)) in header.iter().zip(type_list.iter()).enumerate() {
        let raw = stats.table_data.iter().map(|row| row[col_idx].as_str());
        let invalid = |v: &str| NeuroformatsError::InvalidStatsFile(format!("invalid value '{}' in column '{}'", v, name));
        let column = match ctype {
            ColumnType::Int => StatsColumn::Int(raw.map(|v| v.parse::<i32>().map_err(|_| invalid(v))).collect::<Result<Array1<i32>>>()?),
            ColumnType::Float => StatsColumn::Float(raw.map(|v| v.parse::<f32>().map_err(|_| invalid(v))).collect::<Result<Array1<f32>>>()?),
            ColumnType::Str => StatsColumn::Str(raw.map(|v| v.to_string()).collect()),
        };
        table.columns.push((name.clone(), column));
    }
    Ok(table)
}


/// A table column aggregated over several subjects.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupColumn {
    /// Shape (num_subjects, num_rows).
    Numeric(Array2<f64>),
    /// One vector of row values per subject.
    Str(Vec<Vec<String>>),
}


/// Stats data of one stats file, aggregated over several subjects.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub subjects: Vec<String>,
    /// The unique measure names, see [`StatsMeasure::unique_name`].
    pub measure_names: Vec<String>,
    /// Shape (num_subjects, num_measures).
    pub measure_values: Array2<f64>,
    pub table: Vec<(String, GroupColumn)>,
}

impl GroupStats {
    /// The values of a measure, one per subject.
    pub fn measure(&self, unique_name: &str) -> Option<ArrayView1<f64>> {
        self.measure_names.iter().position(|n| n == unique_name).map(|idx| self.measure_values.column(idx))
    }

    pub fn column(&self, name: &str) -> Option<&GroupColumn> {
        self.table.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}


/// Read the stats file `stats_file_name` from the `stats` directory of all subjects and aggregate the data.
///
/// The measures become one value per subject. If a `type_list` is given, the table columns are converted and stacked into
/// one row per subject. All subjects must have the same measures and the same number of table rows.
pub fn group_stats<P: AsRef<Path>, S: AsRef<str>>(subjects_list: &[S], subjects_dir: P, stats_file_name: &str, type_list: Option<&[ColumnType]>) -> Result<GroupStats> {
    let mut measure_names: Vec<String> = Vec::new();
    let mut measure_rows: Vec<Vec<f64>> = Vec::with_capacity(subjects_list.len());
    let mut tables: Vec<StatsTable> = Vec::new();

    for (subject_idx, subject_id) in subjects_list.iter().enumerate() {
        let subject_id = subject_id.as_ref();
        let stats_file = subjects_dir.as_ref().join(subject_id).join("stats").join(stats_file_name);
        let stats = read_stats(&stats_file)?;

        let names: Vec<String> = stats.measures.iter().map(|m| m.unique_name()).collect();
        let values = stats.measures.iter().map(|m| m.value()).collect::<Result<Vec<f64>>>()?;
        if subject_idx == 0 {
            measure_names = names;
        } else if names != measure_names {
            return Err(NeuroformatsError::Validation(format!("Subject '{}' has {} measures in '{}', expected the {} measures of subject '{}'.", subject_id, names.len(), stats_file_name, measure_names.len(), subjects_list[0].as_ref())));
        }
        measure_rows.push(values);

        if let Some(type_list) = type_list {
            tables.push(stats_table_to_columns(&stats, type_list)?);
        }
    }

    let measure_values = stack_rows(&measure_rows, measure_names.len())?;
    let mut table = Vec::new();
    if let Some(first) = tables.first() {
        for (col_idx, (name, col)) in first.columns.iter().enumerate() {
            let group_col = match col {
                StatsColumn::Str(_) => GroupColumn::Str(tables.iter().map(|t| match &t.columns[col_idx].1 {
                    StatsColumn::Str(v) => v.clone(),
                    _ => Vec::new(),
                }).collect()),
                _ => {
                    let rows: Vec<Vec<f64>> = tables.iter().map(|t| t.columns[col_idx].1.to_f64().map(|a| a.to_vec()).unwrap_or_default()).collect();
                    GroupColumn::Numeric(stack_rows(&rows, col.len())?)
                }
            };
            table.push((name.clone(), group_col));
        }
    }

    Ok(GroupStats {
        subjects: subjects_list.iter().map(|s| s.as_ref().to_string()).collect(),
        measure_names,
        measure_values,
        table,
    })
}


/// Aggregate `aseg.stats` for all subjects, see [`group_stats`].
pub fn group_stats_aseg<P: AsRef<Path>, S: AsRef<str>>(subjects_list: &[S], subjects_dir: P) -> Result<GroupStats> {
    group_stats(subjects_list, subjects_dir, "aseg.stats", Some(&typelist_for_aseg_stats()))
}


/// Stack rows of identical length into a 2D array.
pub(crate) fn stack_rows<T: Clone>(rows: &[Vec<T>], row_len: usize) -> Result<Array2<T>> {
    let mut flat = Vec::with_capacity(rows.len() * row_len);
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != row_len {
            return Err(NeuroformatsError::Validation(format!("Row {} has length {}, expected {}.", idx, row.len(), row_len)));
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((rows.len(), row_len), flat).map_err(|e| NeuroformatsError::Validation(e.to_string()))
}


#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use tempfile::tempdir;

    pub const ASEG_STATS: &str = "# Title Segmentation Statistics
# generating_program mri_segstats
# Measure BrainSeg, BrainSegVol, Brain Segmentation Volume, 1243340.000000, mm^3
# Measure Cortex, CortexVol, Total cortical gray matter volume, 482179.254091, mm^3
# NRows 3
# NTableCols 10
# TableCol  1 ColHeader Index
# TableCol  1 FieldName Index
# TableCol  2 ColHeader SegId
# TableCol  3 ColHeader NVoxels
# TableCol  4 ColHeader Volume_mm3
# TableCol  4 Units     mm^3
# TableCol  5 ColHeader StructName
# TableCol  6 ColHeader normMean
# TableCol  7 ColHeader normStdDev
# TableCol  8 ColHeader normMin
# TableCol  9 ColHeader normMax
# TableCol 10 ColHeader normRange
# ColHeaders  Index SegId NVoxels Volume_mm3 StructName normMean normStdDev normMin normMax normRange
  1   4     12353    12353.1  Left-Lateral-Ventricle  36.4  10.5  16.0  88.0  72.0
  2   5       478      474.9  Left-Inf-Lat-Vent       51.2  10.1  22.0  84.0  62.0
  3   7     16163    15871.4  Left-Cerebellum-White-Matter  89.7  6.7  32.0  107.0  75.0
";

    fn write_subject_stats(subjects_dir: &Path, subject_id: &str, contents: &str) {
        let stats_dir = subjects_dir.join(subject_id).join("stats");
        fs::create_dir_all(&stats_dir).unwrap();
        fs::write(stats_dir.join("aseg.stats"), contents).unwrap();
    }

    #[test]
    fn measures_and_table_are_parsed() {
        let lines: Vec<&str> = ASEG_STATS.lines().collect();
        let stats = FsStats::from_lines(&lines).unwrap();

        assert_eq!(2, stats.measures.len());
        assert_eq!(vec!["BrainSeg", "BrainSegVol", "Brain Segmentation Volume", "1243340.000000", "mm^3"], stats.measures[0].fields);
        assert_eq!("CortexVol", stats.measures[1].short_name());
        assert_eq!(1243340.0, stats.measure("BrainSeg_BrainSegVol").unwrap().value().unwrap());

        assert_eq!(3, stats.table_data.len());
        assert_eq!(10, stats.table_data[0].len());
        assert_eq!(Some(&String::from("3")), stats.table_meta_data.entries.get("NRows"));
        assert_eq!(Some(&String::from("mm^3")), stats.table_meta_data.column_info[&4].get("Units"));
        assert_eq!("Index", stats.table_column_headers[0]);
        assert_eq!("normRange", stats.table_column_headers[9]);
        assert_eq!(2, stats.ignored_lines.len());
    }

    #[test]
    fn column_headers_fall_back_to_the_col_headers_line() {
        let lines = ["# ColHeaders StructName NumVert", "bankssts 1722"];
        let stats = FsStats::from_lines(&lines).unwrap();
        assert_eq!(vec!["StructName", "NumVert"], stats.table_column_headers);
    }

    #[test]
    fn table_col_headers_win_over_inconsistent_col_headers() {
        let lines = ["# TableCol 2 ColHeader B", "# TableCol 1 ColHeader A", "# ColHeaders A C", "1 2"];
        let stats = FsStats::from_lines(&lines).unwrap();
        assert_eq!(vec!["A", "B"], stats.table_column_headers);
    }

    #[test]
    fn tab_aligned_rows_and_loosely_spaced_measures_are_parsed() {
        let lines = [
            "# Measure Cortex,CortexVol ,  Total cortical gray matter volume,482179.25, mm^3",
            "# ColHeaders StructName NumVert",
            "\tbankssts\t\t1722",
            "",
            "  insula   2860  ",
        ];
        let stats = FsStats::from_lines(&lines).unwrap();
        assert_eq!(vec!["Cortex", "CortexVol", "Total cortical gray matter volume", "482179.25", "mm^3"], stats.measures[0].fields);
        assert_eq!(482179.25, stats.measures[0].value().unwrap());
        assert_eq!(vec![vec!["bankssts", "1722"], vec!["insula", "2860"]], stats.table_data);
    }

    #[test]
    fn a_stats_file_without_header_information_is_rejected() {
        let lines = ["# Measure BrainSeg, BrainSegVol, Brain Segmentation Volume, 1.0, mm^3", "1 2 3"];
        assert!(FsStats::from_lines(&lines).is_err());
    }

    #[test]
    fn table_columns_are_typed() {
        let lines: Vec<&str> = ASEG_STATS.lines().collect();
        let stats = FsStats::from_lines(&lines).unwrap();
        let table = stats_table_to_columns(&stats, &typelist_for_aseg_stats()).unwrap();

        assert_eq!(10, table.columns.len());
        match table.get("NVoxels") {
            Some(StatsColumn::Int(a)) => assert_eq!(vec![12353, 478, 16163], a.to_vec()),
            other => panic!("unexpected column {:?}", other),
        }
        match table.get(REGION_NAME_COLUMN) {
            Some(StatsColumn::Str(v)) => assert_eq!("Left-Inf-Lat-Vent", v[1]),
            other => panic!("unexpected column {:?}", other),
        }
        assert!(stats_table_to_columns(&stats, &typelist_for_aparc_atlas_stats()).is_err());
        assert!(stats_table_to_columns(&stats, &typelist_for_aseg_stats()[..9]).is_err());
    }

    #[test]
    fn stats_are_aggregated_over_subjects() {
        let dir = tempdir().unwrap();
        write_subject_stats(dir.path(), "subject1", ASEG_STATS);
        write_subject_stats(dir.path(), "subject2", &ASEG_STATS.replace("1243340.000000", "1000000.0"));

        let group = group_stats_aseg(&["subject1", "subject2"], dir.path()).unwrap();
        assert_eq!((2, 2), group.measure_values.dim());
        let brain_seg = group.measure("BrainSeg_BrainSegVol").unwrap();
        assert_eq!(1243340.0, brain_seg[0]);
        assert_eq!(1000000.0, brain_seg[1]);

        match group.column("Volume_mm3") {
            Some(GroupColumn::Numeric(a)) => {
                assert_eq!((2, 3), a.dim());
                assert_eq!(474.9f32 as f64, a[[1, 1]]);
            }
            other => panic!("unexpected column {:?}", other),
        }
        match group.column(REGION_NAME_COLUMN) {
            Some(GroupColumn::Str(v)) => assert_eq!(2, v.len()),
            other => panic!("unexpected column {:?}", other),
        }
    }

    #[test]
    fn subjects_with_different_measures_cannot_be_aggregated() {
        let dir = tempdir().unwrap();
        write_subject_stats(dir.path(), "subject1", ASEG_STATS);
        let fewer_measures: String = ASEG_STATS.lines().filter(|l| !l.starts_with("# Measure Cortex")).map(|l| format!("{}\n", l)).collect();
        write_subject_stats(dir.path(), "subject2", &fewer_measures);

        match group_stats(&["subject1", "subject2"], dir.path(), "aseg.stats", None) {
            Err(NeuroformatsError::Validation(_)) => {}
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn subjects_with_different_table_lengths_cannot_be_aggregated() {
        let dir = tempdir().unwrap();
        write_subject_stats(dir.path(), "subject1", ASEG_STATS);
        let fewer_rows: String = ASEG_STATS.lines().filter(|l| !l.contains("Left-Inf-Lat-Vent")).map(|l| format!("{}\n", l)).collect();
        write_subject_stats(dir.path(), "subject2", &fewer_rows);

        assert!(group_stats_aseg(&["subject1", "subject2"], dir.path()).is_err());
    }
}
