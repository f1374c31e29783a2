use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::Mutex;

use super::{
    merge_rate, next_version, sort_records, RateWriteMode, RateWriteOutcome, Record,
    RecordFilter, Storage, StorageResult,
};
use crate::models::{
    EquityHolding, ExchangeRateObservation, FixedIncomeHolding, Id, PrivateFund, Property,
};

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   equities/{id}.json
///   fixed_income/{id}.json
///   properties/{id}.json
///   funds/{id}.json
///   exchange_rates.json
/// ```
///
/// Writes go through a single async lock so that version checks and rate
/// upserts are atomic for this process.
pub struct JsonFileStorage {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.base_path.join(collection)
    }

    fn record_file(&self, collection: &str, id: &Id) -> anyhow::Result<PathBuf> {
        if !Id::is_path_safe(id.as_str()) {
            anyhow::bail!("Refusing to use unsafe id as file name: {id:?}");
        }
        Ok(self.collection_dir(collection).join(format!("{id}.json")))
    }

    fn rates_file(&self) -> PathBuf {
        self.base_path.join("exchange_rates.json")
    }

    async fn ensure_dir(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(
        &self,
        path: &Path,
    ) -> anyhow::Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {path:?}"))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {path:?}")),
        }
    }

    /// Write via a temp file and rename so readers never see a torn file.
    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {tmp:?}"))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to move {tmp:?} into place"))?;
        Ok(())
    }

    async fn get_record<T: Record>(&self, collection: &str, id: &Id) -> StorageResult<Option<T>> {
        let path = self.record_file(collection, id)?;
        Ok(self.read_json(&path).await?)
    }

    async fn list_records<T: Record>(
        &self,
        collection: &str,
        filter: &RecordFilter,
    ) -> StorageResult<Vec<T>> {
        let dir = self.collection_dir(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = self.read_json::<T>(&path).await? {
                if record.matches(filter) {
                    records.push(record);
                }
            }
        }
        sort_records(&mut records);
        Ok(records)
    }

    async fn save_record<T: Record>(&self, collection: &str, record: &T) -> StorageResult<u64> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_file(collection, record.record_id())?;
        let stored: Option<T> = self.read_json(&path).await?;
        let version = next_version(stored.as_ref(), record)?;
        let mut next = record.clone();
        next.set_record_version(version);
        self.write_json(&path, &next).await?;
        Ok(version)
    }

    async fn read_rates(&self) -> anyhow::Result<Vec<ExchangeRateObservation>> {
        Ok(self.read_json(&self.rates_file()).await?.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn get_equity(&self, id: &Id) -> StorageResult<Option<EquityHolding>> {
        self.get_record("equities", id).await
    }

    async fn list_equities(&self, filter: &RecordFilter) -> StorageResult<Vec<EquityHolding>> {
        self.list_records("equities", filter).await
    }

    async fn save_equity(&self, holding: &EquityHolding) -> StorageResult<u64> {
        self.save_record("equities", holding).await
    }

    async fn get_fixed_income(&self, id: &Id) -> StorageResult<Option<FixedIncomeHolding>> {
        self.get_record("fixed_income", id).await
    }

    async fn list_fixed_income(
        &self,
        filter: &RecordFilter,
    ) -> StorageResult<Vec<FixedIncomeHolding>> {
        self.list_records("fixed_income", filter).await
    }

    async fn save_fixed_income(&self, holding: &FixedIncomeHolding) -> StorageResult<u64> {
        self.save_record("fixed_income", holding).await
    }

    async fn get_property(&self, id: &Id) -> StorageResult<Option<Property>> {
        self.get_record("properties", id).await
    }

    async fn list_properties(&self, filter: &RecordFilter) -> StorageResult<Vec<Property>> {
        self.list_records("properties", filter).await
    }

    async fn save_property(&self, property: &Property) -> StorageResult<u64> {
        self.save_record("properties", property).await
    }

    async fn get_fund(&self, id: &Id) -> StorageResult<Option<PrivateFund>> {
        self.get_record("funds", id).await
    }

    async fn list_funds(&self, filter: &RecordFilter) -> StorageResult<Vec<PrivateFund>> {
        self.list_records("funds", filter).await
    }

    async fn save_fund(&self, fund: &PrivateFund) -> StorageResult<u64> {
        self.save_record("funds", fund).await
    }

    async fn list_rates(&self, include_deleted: bool) -> StorageResult<Vec<ExchangeRateObservation>> {
        let mut rates = self.read_rates().await?;
        if !include_deleted {
            rates.retain(|obs| !obs.is_deleted());
        }
        Ok(rates)
    }

    async fn write_rate(
        &self,
        observation: ExchangeRateObservation,
        mode: RateWriteMode,
    ) -> StorageResult<(ExchangeRateObservation, RateWriteOutcome)> {
        let _guard = self.write_lock.lock().await;
        let mut rates = self.read_rates().await?;
        let (stored, outcome) = merge_rate(&mut rates, observation, mode);
        if outcome != RateWriteOutcome::Skipped {
            self.write_json(&self.rates_file(), &rates).await?;
        }
        Ok((stored, outcome))
    }

    async fn soft_delete_rate(
        &self,
        id: &Id,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<ExchangeRateObservation>> {
        let _guard = self.write_lock.lock().await;
        let mut rates = self.read_rates().await?;
        let Some(obs) = rates
            .iter_mut()
            .find(|obs| &obs.id == id && !obs.is_deleted())
        else {
            return Ok(None);
        };
        obs.deleted_at = Some(at);
        obs.updated_at = at;
        let deleted = obs.clone();
        self.write_json(&self.rates_file(), &rates).await?;
        Ok(Some(deleted))
    }
}
