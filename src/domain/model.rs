use serde::{Deserialize, Serialize};

/// Column order of a [`ZipRecord`] in every tabular output.
pub const ZIP_RECORD_COLUMNS: [&str; 12] = [
    "zipcode",
    "major_city",
    "lat",
    "lng",
    "timezone",
    "radius_in_miles",
    "population",
    "population_density",
    "housing_units",
    "occupied_housing_units",
    "median_home_value",
    "median_household_income",
];

/// Geographic and demographic attributes of one zip code.
///
/// Every attribute other than `zipcode` is optional: the reference data is
/// sparse for PO boxes, military codes and thinly populated areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipRecord {
    pub zipcode: String,
    pub major_city: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub timezone: Option<String>,
    pub radius_in_miles: Option<f64>,
    pub population: Option<u64>,
    pub population_density: Option<f64>,
    pub housing_units: Option<u64>,
    pub occupied_housing_units: Option<u64>,
    pub median_home_value: Option<u64>,
    pub median_household_income: Option<u64>,
}

impl ZipRecord {
    /// A record carrying only its key.
    pub fn empty(zipcode: impl Into<String>) -> Self {
        Self {
            zipcode: zipcode.into(),
            major_city: None,
            lat: None,
            lng: None,
            timezone: None,
            radius_in_miles: None,
            population: None,
            population_density: None,
            housing_units: None,
            occupied_housing_units: None,
            median_home_value: None,
            median_household_income: None,
        }
    }

    /// True when nothing beyond the zip code is known.
    pub fn is_sparse(&self) -> bool {
        self.major_city.is_none()
            && self.lat.is_none()
            && self.lng.is_none()
            && self.timezone.is_none()
            && self.radius_in_miles.is_none()
            && self.population.is_none()
            && self.population_density.is_none()
            && self.housing_units.is_none()
            && self.occupied_housing_units.is_none()
            && self.median_home_value.is_none()
            && self.median_household_income.is_none()
    }

    /// Numeric columns replaced by zero where missing; radius and density
    /// truncated to whole numbers.
    pub fn filled(&self) -> Self {
        Self {
            zipcode: self.zipcode.clone(),
            major_city: self.major_city.clone(),
            lat: Some(self.lat.unwrap_or(0.0)),
            lng: Some(self.lng.unwrap_or(0.0)),
            timezone: self.timezone.clone(),
            radius_in_miles: Some(self.radius_in_miles.unwrap_or(0.0).trunc()),
            population: Some(self.population.unwrap_or(0)),
            population_density: Some(self.population_density.unwrap_or(0.0).trunc()),
            housing_units: Some(self.housing_units.unwrap_or(0)),
            occupied_housing_units: Some(self.occupied_housing_units.unwrap_or(0)),
            median_home_value: Some(self.median_home_value.unwrap_or(0)),
            median_household_income: Some(self.median_household_income.unwrap_or(0)),
        }
    }

    /// Cells in [`ZIP_RECORD_COLUMNS`] order; missing values are empty strings.
    pub fn to_cells(&self) -> Vec<String> {
        fn cell<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        vec![
            self.zipcode.clone(),
            cell(&self.major_city),
            cell(&self.lat),
            cell(&self.lng),
            cell(&self.timezone),
            cell(&self.radius_in_miles),
            cell(&self.population),
            cell(&self.population_density),
            cell(&self.housing_units),
            cell(&self.occupied_housing_units),
            cell(&self.median_home_value),
            cell(&self.median_household_income),
        ]
    }
}

/// How a batch row is resolved against the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupMode {
    /// One record per row, keyed by the row's zip code.
    #[default]
    #[serde(alias = "zipcode")]
    Zip,
    /// Every standard zip code of the row's city/state pair.
    #[serde(alias = "city_state")]
    CityState,
}

impl std::str::FromStr for LookupMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "zip" | "zipcode" => Ok(Self::Zip),
            "city-state" => Ok(Self::CityState),
            other => Err(format!(
                "unknown lookup mode '{}', expected 'zip' or 'city-state'",
                other
            )),
        }
    }
}

impl std::fmt::Display for LookupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zip => write!(f, "zip"),
            Self::CityState => write!(f, "city-state"),
        }
    }
}

/// One input row of a batch run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    pub zip: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// All remaining input columns, in input order.
    pub extra: Vec<(String, String)>,
}

impl Address {
    pub fn new(zip: Option<&str>, city: Option<&str>, state: Option<&str>) -> Self {
        Self {
            zip: zip.map(str::to_string),
            city: city.map(str::to_string),
            state: state.map(str::to_string),
            extra: Vec::new(),
        }
    }

    /// Title-cased city, upper-cased state, zip cut to five characters.
    /// Blank values become `None`.
    pub fn normalized(&self) -> Self {
        Self {
            zip: non_blank(&self.zip).map(|z| z.chars().take(5).collect()),
            city: non_blank(&self.city).map(title_case),
            state: non_blank(&self.state).map(|s| s.to_uppercase()),
            extra: self.extra.clone(),
        }
    }

    pub fn label(&self) -> String {
        format!(
            "zip={} city={} state={}",
            self.zip.as_deref().unwrap_or("-"),
            self.city.as_deref().unwrap_or("-"),
            self.state.as_deref().unwrap_or("-")
        )
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// A record joined with the extra columns of the address it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub record: ZipRecord,
    pub extra: Vec<(String, String)>,
}

/// An address the provider could not resolve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedRow {
    pub zip: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub reason: String,
    /// The address's other input columns, so the row can be joined back.
    pub extra: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub enriched: Vec<EnrichedRow>,
    pub unresolved: Vec<UnresolvedRow>,
}
