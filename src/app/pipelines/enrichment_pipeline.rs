use crate::core::enricher::ZipCodeEnricher;
use crate::domain::model::{
    Address, EnrichedRow, LookupMode, TransformResult, UnresolvedRow, ZIP_RECORD_COLUMNS,
};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage, ZipLookup};
use crate::utils::error::{EnrichError, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use zip::write::{FileOptions, ZipWriter};

pub const ENRICHED_CSV: &str = "enriched_addresses.csv";
pub const ENRICHED_JSON: &str = "enriched_addresses.json";
pub const UNRESOLVED_CSV: &str = "unresolved_addresses.csv";
pub const BUNDLE_ZIP: &str = "enriched_addresses.zip";

const UNRESOLVED_COLUMNS: [&str; 4] = ["Zip", "City", "State", "Reason"];
const RENAMED_COLUMN_PREFIX: &str = "input_";

/// Output names for the pass-through input columns. A name already taken by
/// `reserved` (or by an earlier renamed column) gets `input_` prepended until
/// it is unique.
fn extra_column_names(names: &[String], reserved: &[&str]) -> Vec<String> {
    let mut taken: Vec<String> = reserved.iter().map(|r| r.to_string()).collect();
    taken.extend(names.iter().cloned());

    let mut output = Vec::with_capacity(names.len());
    for name in names {
        if !reserved.contains(&name.as_str()) {
            output.push(name.clone());
            continue;
        }

        let mut renamed = format!("{}{}", RENAMED_COLUMN_PREFIX, name);
        while taken.contains(&renamed) {
            renamed = format!("{}{}", RENAMED_COLUMN_PREFIX, renamed);
        }
        tracing::warn!(
            "Input column '{}' clashes with an output column, written as '{}'",
            name,
            renamed
        );
        taken.push(renamed.clone());
        output.push(renamed);
    }
    output
}

/// Reads address rows, enriches each one and writes the results.
pub struct EnrichmentPipeline<S: Storage, C: ConfigProvider, L: ZipLookup + 'static> {
    storage: S,
    config: C,
    enricher: Arc<ZipCodeEnricher<L>>,
}

impl<S: Storage, C: ConfigProvider, L: ZipLookup + 'static> EnrichmentPipeline<S, C, L> {
    pub fn new(storage: S, config: C, provider: L) -> Self {
        Self {
            storage,
            config,
            enricher: Arc::new(ZipCodeEnricher::new(provider)),
        }
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    fn parse_addresses(&self, data: &[u8]) -> Result<Vec<Address>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(data);
        let headers = reader.headers()?.clone();

        let column = |name: &str| headers.iter().position(|h| h == name);
        let zip_idx = column(self.config.zip_column());
        let city_idx = column(self.config.city_column());
        let state_idx = column(self.config.state_column());

        let required: Vec<(&str, Option<usize>)> = match self.config.lookup_mode() {
            LookupMode::Zip => vec![(self.config.zip_column(), zip_idx)],
            LookupMode::CityState => vec![
                (self.config.city_column(), city_idx),
                (self.config.state_column(), state_idx),
            ],
        };
        for (name, idx) in required {
            if idx.is_none() {
                return Err(EnrichError::ConfigValidationError {
                    field: "input columns".to_string(),
                    message: format!(
                        "column '{}' not found in {} (found: {})",
                        name,
                        self.config.input_path(),
                        headers.iter().collect::<Vec<_>>().join(", ")
                    ),
                });
            }
        }

        let keyed = [zip_idx, city_idx, state_idx];
        let mut addresses = Vec::new();
        for row in reader.records() {
            let row = row?;
            let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::to_string);

            let extra = headers
                .iter()
                .enumerate()
                .filter(|(i, _)| !keyed.contains(&Some(*i)))
                .map(|(i, name)| (name.to_string(), row.get(i).unwrap_or_default().to_string()))
                .collect();

            addresses.push(Address {
                zip: cell(zip_idx),
                city: cell(city_idx),
                state: cell(state_idx),
                extra,
            });
        }

        Ok(addresses)
    }

    fn enriched_csv(&self, rows: &[EnrichedRow], extra_headers: &[String]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header: Vec<&str> = ZIP_RECORD_COLUMNS.to_vec();
        header.extend(extra_headers.iter().map(String::as_str));
        writer.write_record(&header)?;

        for row in rows {
            let mut cells = row.record.to_cells();
            cells.extend(row.extra.iter().map(|(_, value)| value.clone()));
            writer.write_record(&cells)?;
        }

        writer
            .into_inner()
            .map_err(|e| EnrichError::processing(format!("flushing enriched CSV: {}", e)))
    }

    fn enriched_json(&self, rows: &[EnrichedRow], extra_headers: &[String]) -> Result<Vec<u8>> {
        let mut objects = Vec::with_capacity(rows.len());
        for row in rows {
            let mut value = serde_json::to_value(&row.record)?;
            if let serde_json::Value::Object(map) = &mut value {
                for (name, (_, cell)) in extra_headers.iter().zip(&row.extra) {
                    map.insert(name.clone(), serde_json::Value::String(cell.clone()));
                }
            }
            objects.push(value);
        }
        Ok(serde_json::to_vec_pretty(&objects)?)
    }

    fn unresolved_csv(&self, rows: &[UnresolvedRow], extra_headers: &[String]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header: Vec<&str> = UNRESOLVED_COLUMNS.to_vec();
        header.extend(extra_headers.iter().map(String::as_str));
        writer.write_record(&header)?;

        for row in rows {
            let mut cells = vec![
                row.zip.as_deref().unwrap_or_default(),
                row.city.as_deref().unwrap_or_default(),
                row.state.as_deref().unwrap_or_default(),
                row.reason.as_str(),
            ];
            cells.extend(row.extra.iter().map(|(_, value)| value.as_str()));
            writer.write_record(&cells)?;
        }
        writer
            .into_inner()
            .map_err(|e| EnrichError::processing(format!("flushing unresolved CSV: {}", e)))
    }
}

enum Outcome {
    Enriched(Vec<EnrichedRow>),
    Unresolved(UnresolvedRow),
}

fn resolve<L: ZipLookup>(
    enricher: &ZipCodeEnricher<L>,
    address: Address,
    mode: LookupMode,
    limit: Option<usize>,
    fill_missing: bool,
) -> Result<Outcome> {
    match enricher.enrich_address(&address, mode, limit) {
        Ok(records) => Ok(Outcome::Enriched(
            records
                .into_iter()
                .map(|record| EnrichedRow {
                    record: if fill_missing { record.filled() } else { record },
                    extra: address.extra.clone(),
                })
                .collect(),
        )),
        Err(e @ (EnrichError::NotFound { .. } | EnrichError::Provider { .. })) => {
            tracing::debug!("Could not resolve {}: {}", address.label(), e);
            let normalized = address.normalized();
            Ok(Outcome::Unresolved(UnresolvedRow {
                zip: normalized.zip,
                city: normalized.city,
                state: normalized.state,
                reason: e.to_string(),
                extra: normalized.extra,
            }))
        }
        Err(e) => Err(e),
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, L: ZipLookup + 'static> Pipeline for EnrichmentPipeline<S, C, L> {
    async fn extract(&self) -> Result<Vec<Address>> {
        tracing::debug!("Reading addresses from: {}", self.config.input_path());
        let data = self.storage.read_file(self.config.input_path()).await?;
        let addresses = self.parse_addresses(&data)?;
        tracing::info!(
            "Read {} address rows from {}",
            addresses.len(),
            self.config.input_path()
        );
        Ok(addresses)
    }

    async fn transform(&self, data: Vec<Address>) -> Result<TransformResult> {
        let mode = self.config.lookup_mode();
        let limit = self.config.result_limit();
        let fill_missing = self.config.fill_missing();
        let workers = self.config.workers().max(1);
        let chunk_size = data.len().div_ceil(workers).max(1);

        tracing::debug!(
            "Enriching {} rows by {} with {} worker(s) using '{}'",
            data.len(),
            mode,
            workers,
            self.enricher.provider().name()
        );

        let mut handles = Vec::with_capacity(workers);
        let mut rows = data.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<Address> = rows.by_ref().take(chunk_size).collect();
            let enricher = Arc::clone(&self.enricher);
            handles.push(tokio::task::spawn_blocking(move || {
                chunk
                    .into_iter()
                    .map(|address| resolve(&enricher, address, mode, limit, fill_missing))
                    .collect::<Result<Vec<Outcome>>>()
            }));
        }

        // Chunks are joined in spawn order, so output order follows input order.
        let mut result = TransformResult::default();
        for handle in handles {
            let outcomes = handle
                .await
                .map_err(|e| EnrichError::processing(format!("enrichment worker failed: {}", e)))??;
            for outcome in outcomes {
                match outcome {
                    Outcome::Enriched(rows) => result.enriched.extend(rows),
                    Outcome::Unresolved(row) => result.unresolved.push(row),
                }
            }
        }

        tracing::info!(
            "Enriched into {} rows, {} addresses unresolved",
            result.enriched.len(),
            result.unresolved.len()
        );
        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let formats = self.config.output_formats();
        // every row carries the same pass-through columns
        let input_names: Vec<String> = result
            .enriched
            .first()
            .map(|row| &row.extra)
            .or_else(|| result.unresolved.first().map(|row| &row.extra))
            .map(|extra| extra.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default();

        let mut files: Vec<(&str, Vec<u8>)> = Vec::new();
        let extra_headers = extra_column_names(&input_names, &ZIP_RECORD_COLUMNS);
        if formats.iter().any(|f| f == "csv") {
            files.push((ENRICHED_CSV, self.enriched_csv(&result.enriched, &extra_headers)?));
        }
        if formats.iter().any(|f| f == "json") {
            files.push((ENRICHED_JSON, self.enriched_json(&result.enriched, &extra_headers)?));
        }
        if !result.unresolved.is_empty() {
            tracing::warn!(
                "{} addresses could not be resolved, see {}",
                result.unresolved.len(),
                UNRESOLVED_CSV
            );
            let extra_headers = extra_column_names(&input_names, &UNRESOLVED_COLUMNS);
            files.push((UNRESOLVED_CSV, self.unresolved_csv(&result.unresolved, &extra_headers)?));
        }

        let primary = if self.config.compress_output() {
            tracing::debug!("Creating ZIP bundle with {} files", files.len());
            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file::<_, ()>(*name, FileOptions::default())?;
                    zip.write_all(data)?;
                }
                zip.finish()?.into_inner()
            };
            let bundle = self.output_file(BUNDLE_ZIP);
            self.storage.write_file(&bundle, &zip_data).await?;
            bundle
        } else {
            let mut written = Vec::with_capacity(files.len());
            for (name, data) in &files {
                let path = self.output_file(name);
                tracing::debug!("Writing {} ({} bytes)", path, data.len());
                self.storage.write_file(&path, data).await?;
                written.push(path);
            }
            written
                .into_iter()
                .next()
                .ok_or_else(|| EnrichError::processing("no output files were produced"))?
        };

        Ok(primary)
    }
}
