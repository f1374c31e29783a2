//! In-memory storage, used by tests and by embedders that bring their own
//! persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::models::{
    EquityHolding, ExchangeRateObservation, FixedIncomeHolding, Id, PrivateFund, Property,
};

use super::{
    merge_rate, next_version, sort_records, RateWriteMode, RateWriteOutcome, Record,
    RecordFilter, Storage, StorageResult,
};

pub struct MemoryStorage {
    equities: Mutex<HashMap<Id, EquityHolding>>,
    fixed_income: Mutex<HashMap<Id, FixedIncomeHolding>>,
    properties: Mutex<HashMap<Id, Property>>,
    funds: Mutex<HashMap<Id, PrivateFund>>,
    rates: Mutex<Vec<ExchangeRateObservation>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            equities: Mutex::new(HashMap::new()),
            fixed_income: Mutex::new(HashMap::new()),
            properties: Mutex::new(HashMap::new()),
            funds: Mutex::new(HashMap::new()),
            rates: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

async fn get_in<T: Record>(map: &Mutex<HashMap<Id, T>>, id: &Id) -> Option<T> {
    map.lock().await.get(id).cloned()
}

async fn list_in<T: Record>(map: &Mutex<HashMap<Id, T>>, filter: &RecordFilter) -> Vec<T> {
    let mut records: Vec<T> = map
        .lock()
        .await
        .values()
        .filter(|r| r.matches(filter))
        .cloned()
        .collect();
    sort_records(&mut records);
    records
}

async fn save_in<T: Record>(map: &Mutex<HashMap<Id, T>>, record: &T) -> StorageResult<u64> {
    let mut records = map.lock().await;
    let version = next_version(records.get(record.record_id()), record)?;
    let mut stored = record.clone();
    stored.set_record_version(version);
    records.insert(record.record_id().clone(), stored);
    Ok(version)
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn get_equity(&self, id: &Id) -> StorageResult<Option<EquityHolding>> {
        Ok(get_in(&self.equities, id).await)
    }

    async fn list_equities(&self, filter: &RecordFilter) -> StorageResult<Vec<EquityHolding>> {
        Ok(list_in(&self.equities, filter).await)
    }

    async fn save_equity(&self, holding: &EquityHolding) -> StorageResult<u64> {
        save_in(&self.equities, holding).await
    }

    async fn get_fixed_income(&self, id: &Id) -> StorageResult<Option<FixedIncomeHolding>> {
        Ok(get_in(&self.fixed_income, id).await)
    }

    async fn list_fixed_income(
        &self,
        filter: &RecordFilter,
    ) -> StorageResult<Vec<FixedIncomeHolding>> {
        Ok(list_in(&self.fixed_income, filter).await)
    }

    async fn save_fixed_income(&self, holding: &FixedIncomeHolding) -> StorageResult<u64> {
        save_in(&self.fixed_income, holding).await
    }

    async fn get_property(&self, id: &Id) -> StorageResult<Option<Property>> {
        Ok(get_in(&self.properties, id).await)
    }

    async fn list_properties(&self, filter: &RecordFilter) -> StorageResult<Vec<Property>> {
        Ok(list_in(&self.properties, filter).await)
    }

    async fn save_property(&self, property: &Property) -> StorageResult<u64> {
        save_in(&self.properties, property).await
    }

    async fn get_fund(&self, id: &Id) -> StorageResult<Option<PrivateFund>> {
        Ok(get_in(&self.funds, id).await)
    }

    async fn list_funds(&self, filter: &RecordFilter) -> StorageResult<Vec<PrivateFund>> {
        Ok(list_in(&self.funds, filter).await)
    }

    async fn save_fund(&self, fund: &PrivateFund) -> StorageResult<u64> {
        save_in(&self.funds, fund).await
    }

    async fn list_rates(&self, include_deleted: bool) -> StorageResult<Vec<ExchangeRateObservation>> {
        let rates = self.rates.lock().await;
        Ok(rates
            .iter()
            .filter(|obs| include_deleted || !obs.is_deleted())
            .cloned()
            .collect())
    }

    async fn write_rate(
        &self,
        observation: ExchangeRateObservation,
        mode: RateWriteMode,
    ) -> StorageResult<(ExchangeRateObservation, RateWriteOutcome)> {
        let mut rates = self.rates.lock().await;
        Ok(merge_rate(&mut rates, observation, mode))
    }

    async fn soft_delete_rate(
        &self,
        id: &Id,
        at: DateTime<Utc>,
    ) -> StorageResult<Option<ExchangeRateObservation>> {
        let mut rates = self.rates.lock().await;
        Ok(rates
            .iter_mut()
            .find(|obs| &obs.id == id && !obs.is_deleted())
            .map(|obs| {
                obs.deleted_at = Some(at);
                obs.updated_at = at;
                obs.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CurrencyCode, FundType, Money, NewPrivateFund};
    use crate::storage::StorageError;

    fn fund() -> PrivateFund {
        PrivateFund::new(
            NewPrivateFund {
                name: "Infra Fund".to_string(),
                fund_type: FundType::Infrastructure,
                fund_manager: None,
                vintage_year: None,
                geography: Some("Europe".to_string()),
                sector: Some("Energy".to_string()),
                committed_capital: Money::new(1_000_000, CurrencyCode::usd()),
                management_fee: None,
                carried_interest: None,
                fund_term_years: None,
                investment_period_end: None,
                fund_end_date: None,
                notes: None,
            },
            &CurrencyCode::kwd(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() -> anyhow::Result<()> {
        let storage = MemoryStorage::new();
        let f = fund();
        assert_eq!(storage.save_fund(&f).await?, 1);

        let mut a = storage.get_fund(&f.id).await?.expect("saved");
        let b = a.clone();
        a.notes = Some("first writer".to_string());
        assert_eq!(storage.save_fund(&a).await?, 2);

        let err = storage.save_fund(&b).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { entity: "private_fund", .. }));
        let stored = storage.get_fund(&f.id).await?.expect("saved");
        assert_eq!(stored.notes.as_deref(), Some("first writer"));
        Ok(())
    }

    #[tokio::test]
    async fn listing_hides_deleted_and_filters() -> anyhow::Result<()> {
        let storage = MemoryStorage::new();
        let live = fund();
        let mut gone = fund();
        gone.deleted_at = Some(Utc::now());
        storage.save_fund(&live).await?;
        storage.save_fund(&gone).await?;

        assert_eq!(storage.list_funds(&RecordFilter::live()).await?.len(), 1);
        assert_eq!(storage.list_funds(&RecordFilter::with_deleted()).await?.len(), 2);

        let asia = RecordFilter {
            country: Some("Asia".to_string()),
            ..RecordFilter::live()
        };
        assert!(storage.list_funds(&asia).await?.is_empty());
        Ok(())
    }
}
