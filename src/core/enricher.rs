use crate::domain::model::{Address, LookupMode, ZipRecord};
use crate::domain::ports::ZipLookup;
use crate::utils::error::{EnrichError, Result};
use tracing::{debug, warn};

/// Projects provider lookups into [`ZipRecord`]s.
///
/// `enrich` forwards its input untouched: no trimming, no format checks.
/// Normalization only happens on the batch path through [`enrich_address`].
///
/// [`enrich_address`]: ZipCodeEnricher::enrich_address
pub struct ZipCodeEnricher<L: ZipLookup> {
    provider: L,
}

impl<L: ZipLookup> ZipCodeEnricher<L> {
    pub fn new(provider: L) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &L {
        &self.provider
    }

    /// The record for `zipcode`, or [`EnrichError::NotFound`].
    ///
    /// Provider failures are returned as raised. A record whose attributes
    /// are all missing is still a success.
    pub fn enrich(&self, zipcode: &str) -> Result<ZipRecord> {
        match self.provider.lookup(zipcode)? {
            Some(mut record) => {
                if record.zipcode != zipcode {
                    warn!(
                        "Provider '{}' answered '{}' for zip code '{}'",
                        self.provider.name(),
                        record.zipcode,
                        zipcode
                    );
                    record.zipcode = zipcode.to_string();
                }
                Ok(record)
            }
            None => {
                debug!("Zip code '{}' not found in '{}'", zipcode, self.provider.name());
                Err(EnrichError::not_found(zipcode))
            }
        }
    }

    /// All standard zip codes of a municipal area.
    pub fn by_city_state(
        &self,
        city: &str,
        state: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ZipRecord>> {
        let mut records = self.provider.by_city_state(city, state, limit)?;
        if let Some(limit) = limit {
            records.truncate(limit);
        }

        if records.is_empty() {
            debug!("No zip codes for {}, {}", city, state);
            return Err(EnrichError::not_found(format!("{}, {}", city, state)));
        }

        Ok(records)
    }

    /// Normalizes `address` and resolves it according to `mode`.
    pub fn enrich_address(
        &self,
        address: &Address,
        mode: LookupMode,
        limit: Option<usize>,
    ) -> Result<Vec<ZipRecord>> {
        let address = address.normalized();

        match mode {
            LookupMode::Zip => {
                let zip = address.zip.as_deref().unwrap_or_default();
                self.enrich(zip).map(|record| vec![record])
            }
            LookupMode::CityState => match (address.city.as_deref(), address.state.as_deref()) {
                (Some(city), Some(state)) => self.by_city_state(city, state, limit),
                _ => Err(EnrichError::not_found(address.label())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockLookup {
        records: HashMap<String, ZipRecord>,
        areas: HashMap<(String, String), Vec<String>>,
        calls: AtomicUsize,
    }

    impl MockLookup {
        fn new() -> Self {
            let mut manhattan = ZipRecord::empty("10001");
            manhattan.major_city = Some("New York".to_string());
            manhattan.timezone = Some("America/New_York".to_string());
            manhattan.population = Some(21_102);
            manhattan.median_household_income = Some(85_221);

            let mut chelsea = ZipRecord::empty("10011");
            chelsea.major_city = Some("New York".to_string());

            let mut records = HashMap::new();
            records.insert("10001".to_string(), manhattan);
            records.insert("10011".to_string(), chelsea);
            records.insert("00501".to_string(), ZipRecord::empty("00501"));

            let mut areas = HashMap::new();
            areas.insert(
                ("New York".to_string(), "NY".to_string()),
                vec!["10001".to_string(), "10011".to_string()],
            );

            Self {
                records,
                areas,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ZipLookup for MockLookup {
        fn lookup(&self, zipcode: &str) -> Result<Option<ZipRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if zipcode == "boom" {
                return Err(EnrichError::provider("backend unavailable"));
            }
            Ok(self.records.get(zipcode).cloned())
        }

        fn by_city_state(
            &self,
            city: &str,
            state: &str,
            _limit: Option<usize>,
        ) -> Result<Vec<ZipRecord>> {
            Ok(self
                .areas
                .get(&(city.to_string(), state.to_string()))
                .map(|zips| zips.iter().filter_map(|z| self.records.get(z).cloned()).collect())
                .unwrap_or_default())
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    /// Answers every query with the same record.
    struct MisroutingLookup;

    impl ZipLookup for MisroutingLookup {
        fn lookup(&self, _zipcode: &str) -> Result<Option<ZipRecord>> {
            Ok(Some(ZipRecord::empty("99999")))
        }

        fn by_city_state(&self, _: &str, _: &str, _: Option<usize>) -> Result<Vec<ZipRecord>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "misrouting"
        }
    }

    #[test]
    fn test_enrich_known_zip() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());
        let record = enricher.enrich("10001").unwrap();

        assert_eq!(record.zipcode, "10001");
        assert_eq!(record.major_city.as_deref(), Some("New York"));
        assert_eq!(record.population, Some(21_102));
    }

    #[test]
    fn test_enrich_unknown_zip_is_not_found() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());
        let err = enricher.enrich("00000").unwrap_err();

        assert!(matches!(err, EnrichError::NotFound { ref zipcode } if zipcode == "00000"));
    }

    #[test]
    fn test_enrich_forwards_input_unchanged() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());

        assert!(enricher.enrich(" 10001").unwrap_err().is_not_found());
        assert!(enricher.enrich("10001-0000").unwrap_err().is_not_found());
    }

    #[test]
    fn test_sparse_record_is_success() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());
        let record = enricher.enrich("00501").unwrap();

        assert!(record.is_sparse());
    }

    #[test]
    fn test_provider_error_propagates() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());
        let err = enricher.enrich("boom").unwrap_err();

        assert!(matches!(err, EnrichError::Provider { .. }));
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());
        let first = enricher.enrich("10001").unwrap();
        let second = enricher.enrich("10001").unwrap();

        assert_eq!(first, second);
        assert_eq!(enricher.provider().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_enrich_restamps_mismatched_zip() {
        let enricher = ZipCodeEnricher::new(MisroutingLookup);
        let record = enricher.enrich("12345").unwrap();

        assert_eq!(record.zipcode, "12345");
    }

    #[test]
    fn test_by_city_state_with_limit() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());

        let all = enricher.by_city_state("New York", "NY", None).unwrap();
        assert_eq!(all.len(), 2);

        let limited = enricher.by_city_state("New York", "NY", Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].zipcode, "10001");
    }

    #[test]
    fn test_by_city_state_unknown_area() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());
        let err = enricher.by_city_state("Atlantis", "ZZ", None).unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_enrich_address_normalizes_zip() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());
        let address = Address::new(Some("10001-4321"), None, None);

        let records = enricher.enrich_address(&address, LookupMode::Zip, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].zipcode, "10001");
    }

    #[test]
    fn test_enrich_address_by_city_state_normalizes_case() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());
        let address = Address::new(None, Some(" new york"), Some("ny "));

        let records = enricher
            .enrich_address(&address, LookupMode::CityState, None)
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_enrich_address_missing_fields() {
        let enricher = ZipCodeEnricher::new(MockLookup::new());

        let no_zip = Address::new(None, Some("New York"), Some("NY"));
        assert!(enricher
            .enrich_address(&no_zip, LookupMode::Zip, None)
            .unwrap_err()
            .is_not_found());

        let no_state = Address::new(Some("10001"), Some("New York"), None);
        assert!(enricher
            .enrich_address(&no_state, LookupMode::CityState, None)
            .unwrap_err()
            .is_not_found());
    }
}
