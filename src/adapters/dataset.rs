//! In-memory reference dataset loaded from CSV.
//!
//! The file is read once; afterwards every query is a hash lookup. The CSV
//! may sit on disk as-is or inside a `.zip` archive.

use crate::domain::model::ZipRecord;
use crate::domain::ports::ZipLookup;
use crate::utils::error::{EnrichError, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

const STANDARD_ZIP_TYPE: &str = "standard";

#[derive(Debug, Deserialize)]
struct DatasetRow {
    zipcode: String,
    #[serde(default)]
    zipcode_type: Option<String>,
    #[serde(default)]
    major_city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default, deserialize_with = "real_cell")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "real_cell")]
    lng: Option<f64>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default, deserialize_with = "real_cell")]
    radius_in_miles: Option<f64>,
    #[serde(default, deserialize_with = "count_cell")]
    population: Option<u64>,
    #[serde(default, deserialize_with = "real_cell")]
    population_density: Option<f64>,
    #[serde(default, deserialize_with = "count_cell")]
    housing_units: Option<u64>,
    #[serde(default, deserialize_with = "count_cell")]
    occupied_housing_units: Option<u64>,
    #[serde(default, deserialize_with = "count_cell")]
    median_home_value: Option<u64>,
    #[serde(default, deserialize_with = "count_cell")]
    median_household_income: Option<u64>,
}

/// Empty cells are missing values; anything else must parse.
fn real_cell<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = match Option::<String>::deserialize(deserializer)? {
        Some(cell) if !cell.trim().is_empty() => cell,
        _ => return Ok(None),
    };
    let cell = cell.trim();
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("'{}' is not a number", cell)))
}

/// Counts and dollar amounts. Float spellings of whole numbers (`21102.0`,
/// as pandas exports them) are accepted; real fractions are rejected.
fn count_cell<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = match Option::<String>::deserialize(deserializer)? {
        Some(cell) if !cell.trim().is_empty() => cell,
        _ => return Ok(None),
    };
    let cell = cell.trim();
    if let Ok(value) = cell.parse::<u64>() {
        return Ok(Some(value));
    }

    match cell.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 => {
            Ok(Some(value as u64))
        }
        _ => Err(serde::de::Error::custom(format!(
            "'{}' is not a whole non-negative number",
            cell
        ))),
    }
}

impl DatasetRow {
    fn into_entry(self) -> DatasetEntry {
        let text = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let standard = self
            .zipcode_type
            .as_deref()
            .map(|t| t.trim().eq_ignore_ascii_case(STANDARD_ZIP_TYPE))
            .unwrap_or(true);

        DatasetEntry {
            state: text(self.state).map(|s| s.to_uppercase()),
            standard,
            record: ZipRecord {
                zipcode: self.zipcode.trim().to_string(),
                major_city: text(self.major_city),
                lat: self.lat,
                lng: self.lng,
                timezone: text(self.timezone),
                radius_in_miles: self.radius_in_miles,
                population: self.population,
                population_density: self.population_density,
                housing_units: self.housing_units,
                occupied_housing_units: self.occupied_housing_units,
                median_home_value: self.median_home_value,
                median_household_income: self.median_household_income,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct DatasetEntry {
    record: ZipRecord,
    state: Option<String>,
    standard: bool,
}

type AreaKey = (String, String);

fn area_key(city: &str, state: &str) -> AreaKey {
    (city.trim().to_lowercase(), state.trim().to_uppercase())
}

#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    source: String,
    entries: Vec<DatasetEntry>,
    by_zip: HashMap<String, usize>,
    by_area: HashMap<AreaKey, Vec<usize>>,
}

impl ReferenceDataset {
    /// Parses CSV with a header row. `source` only labels log lines and errors.
    pub fn from_reader<R: Read>(reader: R, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if !headers.iter().any(|h| h == "zipcode") {
            return Err(EnrichError::dataset(format!(
                "{}: missing 'zipcode' column (found: {})",
                source,
                headers.iter().collect::<Vec<_>>().join(", ")
            )));
        }

        let mut dataset = Self {
            source,
            entries: Vec::new(),
            by_zip: HashMap::new(),
            by_area: HashMap::new(),
        };

        for row in csv_reader.deserialize::<DatasetRow>() {
            let row = row.map_err(|e| EnrichError::dataset(format!("{}: {}", dataset.source, e)))?;
            dataset.insert(row.into_entry());
        }

        info!(
            "Loaded {} zip codes from reference dataset '{}'",
            dataset.len(),
            dataset.source
        );
        Ok(dataset)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading reference dataset CSV: {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), path.display().to_string())
    }

    /// Loads `entry` from a zip archive, or the first `.csv` entry when
    /// `entry` is `None`.
    pub fn from_zip_archive<P: AsRef<Path>>(path: P, entry: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading reference dataset archive: {}", path.display());
        let mut archive = zip::ZipArchive::new(BufReader::new(File::open(path)?))?;

        let entry_name = match entry {
            Some(name) => name.to_string(),
            None => archive
                .file_names()
                .filter(|name| name.to_ascii_lowercase().ends_with(".csv"))
                .min()
                .map(str::to_string)
                .ok_or_else(|| {
                    EnrichError::dataset(format!("{}: archive holds no .csv entry", path.display()))
                })?,
        };

        let file = archive.by_name(&entry_name)?;
        Self::from_reader(file, format!("{}!{}", path.display(), entry_name))
    }

    /// Dispatches on the file extension: `.zip` archives, anything else CSV.
    pub fn open<P: AsRef<Path>>(path: P, archive_entry: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let is_archive = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));

        if is_archive {
            Self::from_zip_archive(path, archive_entry)
        } else {
            Self::from_csv_path(path)
        }
    }

    fn insert(&mut self, entry: DatasetEntry) {
        if entry.record.zipcode.is_empty() {
            warn!("{}: skipping row with empty zipcode", self.source);
            return;
        }
        if self.by_zip.contains_key(&entry.record.zipcode) {
            warn!(
                "{}: duplicate zipcode '{}', keeping the first row",
                self.source, entry.record.zipcode
            );
            return;
        }

        let index = self.entries.len();
        self.by_zip.insert(entry.record.zipcode.clone(), index);

        if entry.standard {
            if let (Some(city), Some(state)) = (entry.record.major_city.as_deref(), entry.state.as_deref()) {
                self.by_area.entry(area_key(city, state)).or_default().push(index);
            }
        }

        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Two-letter state of a zip code, when the dataset carries it.
    pub fn state_of(&self, zipcode: &str) -> Option<&str> {
        self.by_zip
            .get(zipcode)
            .and_then(|&i| self.entries[i].state.as_deref())
    }
}

impl ZipLookup for ReferenceDataset {
    fn lookup(&self, zipcode: &str) -> Result<Option<ZipRecord>> {
        Ok(self
            .by_zip
            .get(zipcode)
            .map(|&i| self.entries[i].record.clone()))
    }

    fn by_city_state(
        &self,
        city: &str,
        state: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ZipRecord>> {
        let indexes = match self.by_area.get(&area_key(city, state)) {
            Some(indexes) => indexes,
            None => return Ok(Vec::new()),
        };

        Ok(indexes
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|&i| self.entries[i].record.clone())
            .collect())
    }

    fn name(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};
    use zip::write::{FileOptions, ZipWriter};

    const SAMPLE: &str = "\
zipcode,zipcode_type,major_city,state,lat,lng,timezone,radius_in_miles,population,population_density,housing_units,occupied_housing_units,median_home_value,median_household_income
10001,Standard,New York,NY,40.75,-73.99,America/New_York,0.9090909090909091,21102,33959.0,12476,11031,650200,81671
10011,Standard,New York,NY,40.74,-74.0,America/New_York,0.9375,50594,88226.0,33271,30466,,103463
10008,PO Box,New York,NY,40.71,-74.01,America/New_York,,,,,,,
00501,Unique,Holtsville,NY,40.81,-73.04,America/New_York,,,,,,,
";

    fn temp_with_suffix(suffix: &str) -> NamedTempFile {
        Builder::new().suffix(suffix).tempfile().unwrap()
    }

    fn sample() -> ReferenceDataset {
        ReferenceDataset::from_reader(SAMPLE.as_bytes(), "sample").unwrap()
    }

    #[test]
    fn test_lookup_full_record() {
        let dataset = sample();
        let record = dataset.lookup("10001").unwrap().unwrap();

        assert_eq!(dataset.len(), 4);
        assert_eq!(record.major_city.as_deref(), Some("New York"));
        assert_eq!(record.lat, Some(40.75));
        assert_eq!(record.timezone.as_deref(), Some("America/New_York"));
        assert_eq!(record.population, Some(21102));
        assert_eq!(record.median_household_income, Some(81671));
        assert_eq!(dataset.state_of("10001"), Some("NY"));
    }

    #[test]
    fn test_empty_cells_are_none() {
        let dataset = sample();
        let record = dataset.lookup("10011").unwrap().unwrap();
        assert_eq!(record.median_home_value, None);
        assert_eq!(record.median_household_income, Some(103463));

        let sparse = dataset.lookup("00501").unwrap().unwrap();
        assert_eq!(sparse.population, None);
        assert_eq!(sparse.radius_in_miles, None);
    }

    #[test]
    fn test_leading_zeros_preserved() {
        let dataset = sample();
        assert!(dataset.lookup("00501").unwrap().is_some());
        assert!(dataset.lookup("501").unwrap().is_none());
    }

    #[test]
    fn test_city_state_skips_non_standard() {
        let dataset = sample();
        let records = dataset.by_city_state("new york", "ny", None).unwrap();
        let zips: Vec<&str> = records.iter().map(|r| r.zipcode.as_str()).collect();

        assert_eq!(zips, vec!["10001", "10011"]);
        assert_eq!(dataset.by_city_state("New York", "NY", Some(1)).unwrap().len(), 1);
        assert!(dataset.by_city_state("Holtsville", "NY", None).unwrap().is_empty());
    }

    #[test]
    fn test_float_formatted_counts_are_read() {
        let csv = "zipcode,major_city,population,housing_units,median_household_income,population_density\n\
10001,New York,21102.0,12476.0,81671.0,33959.5\n";
        let dataset = ReferenceDataset::from_reader(csv.as_bytes(), "pandas-export").unwrap();
        let record = dataset.lookup("10001").unwrap().unwrap();

        assert_eq!(record.population, Some(21102));
        assert_eq!(record.housing_units, Some(12476));
        assert_eq!(record.median_household_income, Some(81671));
        assert_eq!(record.population_density, Some(33959.5));
    }

    #[test]
    fn test_blank_numeric_cells_are_none() {
        let csv = "zipcode,population,lat\n12345, ,\n";
        let dataset = ReferenceDataset::from_reader(csv.as_bytes(), "blank").unwrap();
        let record = dataset.lookup("12345").unwrap().unwrap();

        assert_eq!(record.population, None);
        assert_eq!(record.lat, None);
    }

    #[test]
    fn test_fractional_count_is_rejected() {
        let csv = "zipcode,population\n12345,10.5\n";
        let err = ReferenceDataset::from_reader(csv.as_bytes(), "fractional").unwrap_err();

        assert!(matches!(err, EnrichError::DatasetError { .. }));
        assert!(err.to_string().contains("10.5"));
    }

    #[test]
    fn test_unparseable_number_is_rejected() {
        let csv = "zipcode,major_city,lat\n12345,Schenectady,not-a-number\n";
        let err = ReferenceDataset::from_reader(csv.as_bytes(), "messy").unwrap_err();

        assert!(err.to_string().contains("messy"));
        assert!(err.to_string().contains("not-a-number"));
    }

    #[test]
    fn test_missing_zipcode_column_is_rejected() {
        let csv = "zip,city\n10001,New York\n";
        let err = ReferenceDataset::from_reader(csv.as_bytes(), "bad").unwrap_err();
        assert!(matches!(err, EnrichError::DatasetError { .. }));
    }

    #[test]
    fn test_duplicate_zipcode_keeps_first() {
        let csv = "zipcode,major_city\n10001,New York\n10001,Elsewhere\n";
        let dataset = ReferenceDataset::from_reader(csv.as_bytes(), "dupes").unwrap();

        assert_eq!(dataset.len(), 1);
        let record = dataset.lookup("10001").unwrap().unwrap();
        assert_eq!(record.major_city.as_deref(), Some("New York"));
    }

    #[test]
    fn test_open_csv_file() {
        let mut file = temp_with_suffix(".csv");
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let dataset = ReferenceDataset::open(file.path(), None).unwrap();
        assert_eq!(dataset.len(), 4);
    }

    #[test]
    fn test_open_zip_archive() {
        let mut file = temp_with_suffix(".zip");
        {
            let mut zip = ZipWriter::new(file.as_file_mut());
            zip.start_file::<_, ()>("README.txt", FileOptions::default()).unwrap();
            zip.write_all(b"reference data").unwrap();
            zip.start_file::<_, ()>("zipcodes.csv", FileOptions::default()).unwrap();
            zip.write_all(SAMPLE.as_bytes()).unwrap();
            zip.finish().unwrap();
        }

        let dataset = ReferenceDataset::open(file.path(), None).unwrap();
        assert_eq!(dataset.len(), 4);
        assert!(dataset.source().ends_with("!zipcodes.csv"));

        let missing = ReferenceDataset::open(file.path(), Some("other.csv"));
        assert!(matches!(missing, Err(EnrichError::ZipError(_))));
    }
}
