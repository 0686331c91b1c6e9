use crate::domain::model::ZipRecord;
use crate::domain::ports::ZipLookup;
use crate::utils::error::{EnrichError, Result};

/// Lookup backed by the dataset bundled with the `zipcodes` crate.
///
/// That dataset carries names but no census figures, so every record it
/// yields has only `major_city` set. Useful when no reference file is at hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipcodesProvider;

impl ZipcodesProvider {
    pub fn new() -> Self {
        Self
    }
}

fn sparse_record(zipcode: &str, city: &str) -> ZipRecord {
    let mut record = ZipRecord::empty(zipcode);
    record.major_city = Some(city.to_string()).filter(|c| !c.is_empty());
    record
}

impl ZipLookup for ZipcodesProvider {
    fn lookup(&self, zipcode: &str) -> Result<Option<ZipRecord>> {
        // filter_by rather than zipcodes::matching, which prints to stdout.
        let results =
            zipcodes::filter_by(vec![|z: &zipcodes::Zipcode| z.zip_code == zipcode], None)
                .map_err(|_| EnrichError::provider("zipcodes dataset could not be searched"))?;

        Ok(results
            .first()
            .map(|info| sparse_record(&info.zip_code, &info.city)))
    }

    fn by_city_state(
        &self,
        city: &str,
        state: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ZipRecord>> {
        let city = city.trim();
        let state = state.trim();
        let results = zipcodes::filter_by(
            vec![|z: &zipcodes::Zipcode| {
                z.city.eq_ignore_ascii_case(city) && z.state.eq_ignore_ascii_case(state)
            }],
            None,
        )
        .map_err(|_| EnrichError::provider("zipcodes dataset could not be searched"))?;

        Ok(results
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|info| sparse_record(&info.zip_code, &info.city))
            .collect())
    }

    fn name(&self) -> &str {
        "zipcodes"
    }
}
