//! # Multi-Source Price Aggregator
//!
//! Blends several independent `PriceSource`s into one price:
//! 1. Query every source; failures and zero prices contribute nothing
//! 2. Require a minimum number of valid answers, else return the `0` sentinel
//! 3. Optionally drop outliers that deviate too far from the median
//! 4. Combine survivors by mean, median or weight
//!
//! Sources and parameters are owner-administered until `freeze`, after which
//! the aggregator is an immutable price function.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use ethnum::U256;
use tracing::{debug, info};

use crate::constants::{BPS_DENOMINATOR, DEFAULT_MIN_SOURCES, MAX_SOURCES};
use crate::errors::{OracleError, OracleResult, SourceError};
use crate::math::{mul_div_floor, to_u128};
use crate::oracle::source::PriceSource;
use crate::types::AccountId;

/// Price returned when too few sources answered
pub const INSUFFICIENT_SOURCES: u128 = 0;

/// How surviving values are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "snake_case"))]
pub enum AggregationMethod {
    /// Floor of the arithmetic mean
    Mean,
    /// Middle value; floor average of the two middles for even counts
    #[default]
    Median,
    /// Weight-proportional mean
    Weighted,
}

/// A configured source and its bookkeeping
pub struct OracleSource {
    id: AccountId,
    source: Arc<dyn PriceSource>,
    weight: u32,
    last_call_failed: AtomicBool,
}

impl OracleSource {
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Configured weight; zero means "unset"
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Weight used in weighted aggregation, defaulting unset weights to 1
    pub fn effective_weight(&self) -> u32 {
        if self.weight == 0 {
            1
        } else {
            self.weight
        }
    }

    /// Whether this source failed or returned zero on the most recent query
    pub fn last_call_failed(&self) -> bool {
        self.last_call_failed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for OracleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleSource")
            .field("id", &self.id)
            .field("weight", &self.weight)
            .field("last_call_failed", &self.last_call_failed())
            .finish()
    }
}

/// Persistable view of the aggregator's configuration
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregatorSnapshot {
    pub method: AggregationMethod,
    pub min_sources: u32,
    pub max_deviation_bps: u32,
    pub frozen: bool,
    /// `(id, weight)` in configuration order
    pub sources: Vec<(AccountId, u32)>,
}

/// Median-filtered, weighted multi-source oracle
#[derive(Debug)]
pub struct MultiSourceAggregator {
    owner: AccountId,
    sources: Vec<OracleSource>,
    method: AggregationMethod,
    min_sources: usize,
    max_deviation_bps: u32,
    frozen: bool,
}

impl MultiSourceAggregator {
    pub fn new(owner: AccountId, method: AggregationMethod) -> OracleResult<Self> {
        if owner.is_zero() {
            return Err(OracleError::ZeroAddress);
        }
        Ok(Self {
            owner,
            sources: Vec::new(),
            method,
            min_sources: DEFAULT_MIN_SOURCES,
            max_deviation_bps: 0,
            frozen: false,
        })
    }

    // ========================================================================
    // Administration
    // ========================================================================

    fn ensure_admin(&self, caller: &AccountId) -> OracleResult<()> {
        if *caller != self.owner {
            return Err(OracleError::Unauthorized);
        }
        if self.frozen {
            return Err(OracleError::Frozen);
        }
        Ok(())
    }

    /// Register a source. A weight of zero means "unset" (treated as 1).
    pub fn add_source(
        &mut self,
        caller: &AccountId,
        id: AccountId,
        source: Arc<dyn PriceSource>,
        weight: u32,
    ) -> OracleResult<()> {
        self.ensure_admin(caller)?;
        if id.is_zero() {
            return Err(OracleError::ZeroAddress);
        }
        if self.sources.iter().any(|s| s.id == id) {
            return Err(OracleError::DuplicateSource);
        }
        if self.sources.len() >= MAX_SOURCES {
            return Err(OracleError::TooManySources(self.sources.len() + 1, MAX_SOURCES));
        }

        self.sources.push(OracleSource {
            id,
            source,
            weight,
            last_call_failed: AtomicBool::new(false),
        });
        info!(source = %id, weight, "Price source added");
        Ok(())
    }

    pub fn remove_source(&mut self, caller: &AccountId, id: &AccountId) -> OracleResult<()> {
        self.ensure_admin(caller)?;
        let index = self
            .sources
            .iter()
            .position(|s| s.id == *id)
            .ok_or(OracleError::SourceNotFound)?;
        self.sources.remove(index);
        info!(source = %id, "Price source removed");
        Ok(())
    }

    pub fn set_weight(&mut self, caller: &AccountId, id: &AccountId, weight: u32) -> OracleResult<()> {
        self.ensure_admin(caller)?;
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or(OracleError::SourceNotFound)?;
        source.weight = weight;
        Ok(())
    }

    pub fn set_method(&mut self, caller: &AccountId, method: AggregationMethod) -> OracleResult<()> {
        self.ensure_admin(caller)?;
        self.method = method;
        Ok(())
    }

    pub fn set_min_sources(&mut self, caller: &AccountId, min_sources: usize) -> OracleResult<()> {
        self.ensure_admin(caller)?;
        if min_sources == 0 {
            return Err(OracleError::invalid_parameter("min_sources", "must be greater than 0"));
        }
        if min_sources > MAX_SOURCES {
            return Err(OracleError::invalid_parameter(
                "min_sources",
                &format!("at most {}", MAX_SOURCES),
            ));
        }
        self.min_sources = min_sources;
        Ok(())
    }

    /// Set the outlier threshold in basis points; zero disables filtering
    pub fn set_max_deviation_bps(&mut self, caller: &AccountId, max_deviation_bps: u32) -> OracleResult<()> {
        self.ensure_admin(caller)?;
        if u128::from(max_deviation_bps) > BPS_DENOMINATOR {
            return Err(OracleError::invalid_parameter(
                "max_deviation_bps",
                "at most 10000 (100%)",
            ));
        }
        self.max_deviation_bps = max_deviation_bps;
        Ok(())
    }

    /// One-way: no further administration is possible afterwards
    pub fn freeze(&mut self, caller: &AccountId) -> OracleResult<()> {
        self.ensure_admin(caller)?;
        self.frozen = true;
        info!(sources = self.sources.len(), "Aggregator frozen");
        Ok(())
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn method(&self) -> AggregationMethod {
        self.method
    }

    pub fn min_sources(&self) -> usize {
        self.min_sources
    }

    pub fn max_deviation_bps(&self) -> u32 {
        self.max_deviation_bps
    }

    pub fn sources(&self) -> &[OracleSource] {
        &self.sources
    }

    pub fn snapshot(&self) -> AggregatorSnapshot {
        AggregatorSnapshot {
            method: self.method,
            min_sources: self.min_sources as u32,
            max_deviation_bps: self.max_deviation_bps,
            frozen: self.frozen,
            sources: self.sources.iter().map(|s| (s.id, s.weight)).collect(),
        }
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    /// Aggregated price, or `INSUFFICIENT_SOURCES` when too few sources agree
    pub fn aggregate(&self) -> u128 {
        let mut valid: Vec<(u128, u32)> = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.source.get_price() {
                Ok(price) if price > 0 => {
                    source.last_call_failed.store(false, Ordering::Relaxed);
                    valid.push((price, source.effective_weight()));
                }
                Ok(_) => {
                    source.last_call_failed.store(true, Ordering::Relaxed);
                    debug!(source = %source.id, "Source returned zero price, skipping");
                }
                Err(e) => {
                    source.last_call_failed.store(true, Ordering::Relaxed);
                    debug!(source = %source.id, error = %e, "Source failed, skipping");
                }
            }
        }

        if valid.len() < self.min_sources {
            debug!(valid = valid.len(), required = self.min_sources, "Insufficient sources");
            return INSUFFICIENT_SOURCES;
        }

        if self.max_deviation_bps > 0 && valid.len() > 2 {
            let values: Vec<u128> = valid.iter().map(|(v, _)| *v).collect();
            let center = median(&values);
            valid.retain(|(value, _)| !exceeds_deviation(*value, center, self.max_deviation_bps));

            if valid.len() < self.min_sources {
                debug!(
                    valid = valid.len(),
                    required = self.min_sources,
                    "Insufficient sources after outlier filter"
                );
                return INSUFFICIENT_SOURCES;
            }
        }

        combine(self.method, &valid, self.sources.len())
    }
}

/// Combine surviving `(value, weight)` readings taken from `configured` sources
fn combine(method: AggregationMethod, valid: &[(u128, u32)], configured: usize) -> u128 {
    match method {
        AggregationMethod::Mean => mean(valid),
        AggregationMethod::Median => {
            let values: Vec<u128> = valid.iter().map(|(v, _)| *v).collect();
            median(&values)
        }
        // Weights only line up with readings one per source
        AggregationMethod::Weighted if valid.len() > configured => mean(valid),
        AggregationMethod::Weighted => weighted_mean(valid).unwrap_or_else(|| mean(valid)),
    }
}

impl PriceSource for MultiSourceAggregator {
    fn get_price(&self) -> Result<u128, SourceError> {
        Ok(self.aggregate())
    }
}

/// Median of `values`: middle element, or floor average of the two middles
pub fn median(values: &[u128]) -> u128 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        let (a, b) = (sorted[mid - 1], sorted[mid]);
        // floor((a + b) / 2) without overflow
        a / 2 + b / 2 + (a % 2 + b % 2) / 2
    }
}

/// Whether `value` deviates from `center` by more than `max_bps` basis points
fn exceeds_deviation(value: u128, center: u128, max_bps: u32) -> bool {
    if center == 0 {
        return true;
    }
    let diff = U256::new(value.abs_diff(center));
    match mul_div_floor(diff, U256::new(BPS_DENOMINATOR), U256::new(center)) {
        Ok(bps) => bps > U256::from(max_bps),
        Err(_) => true,
    }
}

fn mean(values: &[(u128, u32)]) -> u128 {
    if values.is_empty() {
        return 0;
    }
    let sum = values
        .iter()
        .fold(U256::ZERO, |acc, (value, _)| acc + U256::new(*value));
    // Average of u128 values always fits back into u128
    to_u128(sum / U256::new(values.len() as u128)).unwrap_or(u128::MAX)
}

/// `None` when the total weight is zero
fn weighted_mean(values: &[(u128, u32)]) -> Option<u128> {
    let (weighted_sum, total_weight) = values.iter().fold(
        (U256::ZERO, U256::ZERO),
        |(sum, total), (value, weight)| {
            let w = U256::from(*weight);
            (sum + U256::new(*value) * w, total + w)
        },
    );
    if total_weight == U256::ZERO {
        return None;
    }
    to_u128(weighted_sum / total_weight).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: AccountId = AccountId::new([1; 32]);

    struct Fixed(Result<u128, SourceError>);

    impl PriceSource for Fixed {
        fn get_price(&self) -> Result<u128, SourceError> {
            self.0.clone()
        }
    }

    fn id(n: u8) -> AccountId {
        AccountId::new([n + 10; 32])
    }

    fn aggregator_with(prices: &[Result<u128, SourceError>], method: AggregationMethod) -> MultiSourceAggregator {
        let mut agg = MultiSourceAggregator::new(OWNER, method).unwrap();
        for (i, price) in prices.iter().enumerate() {
            agg.add_source(&OWNER, id(i as u8), Arc::new(Fixed(price.clone())), 0)
                .unwrap();
        }
        agg
    }

    #[test]
    fn test_median_tie_break() {
        assert_eq!(median(&[5, 1, 3]), 3);
        assert_eq!(median(&[4, 1, 3, 2]), 2);
        assert_eq!(median(&[100, 101]), 100);
        assert_eq!(median(&[u128::MAX, u128::MAX]), u128::MAX);
        assert_eq!(median(&[]), 0);
    }

    #[test]
    fn test_min_sources_sentinel() {
        let mut agg = aggregator_with(
            &[
                Ok(100),
                Err(SourceError::unavailable("down")),
                Err(SourceError::InsufficientHistory),
            ],
            AggregationMethod::Mean,
        );
        agg.set_min_sources(&OWNER, 2).unwrap();

        assert_eq!(agg.get_price().unwrap(), INSUFFICIENT_SOURCES);
        assert!(!agg.sources()[0].last_call_failed());
        assert!(agg.sources()[1].last_call_failed());
        assert!(agg.sources()[2].last_call_failed());
    }

    #[test]
    fn test_outlier_filter() {
        let mut agg = aggregator_with(&[Ok(100), Ok(100), Ok(1000)], AggregationMethod::Median);
        agg.set_min_sources(&OWNER, 2).unwrap();
        agg.set_max_deviation_bps(&OWNER, 500).unwrap();

        assert_eq!(agg.get_price().unwrap(), 100);

        agg.set_method(&OWNER, AggregationMethod::Mean).unwrap();
        assert_eq!(agg.get_price().unwrap(), 100);
    }

    #[test]
    fn test_outlier_filter_can_starve_sources() {
        let mut agg = aggregator_with(&[Ok(100), Ok(200), Ok(400)], AggregationMethod::Mean);
        agg.set_min_sources(&OWNER, 2).unwrap();
        agg.set_max_deviation_bps(&OWNER, 100).unwrap();

        // Median 200; 100 and 400 both deviate 50%+, leaving one survivor
        assert_eq!(agg.get_price().unwrap(), INSUFFICIENT_SOURCES);
    }

    #[test]
    fn test_filter_needs_more_than_two_values() {
        let mut agg = aggregator_with(&[Ok(100), Ok(1000)], AggregationMethod::Mean);
        agg.set_max_deviation_bps(&OWNER, 500).unwrap();
        assert_eq!(agg.get_price().unwrap(), 550);
    }

    #[test]
    fn test_zero_price_is_skipped() {
        let agg = aggregator_with(&[Ok(0), Ok(90), Ok(110)], AggregationMethod::Mean);
        assert_eq!(agg.get_price().unwrap(), 100);
        assert!(agg.sources()[0].last_call_failed());
    }

    #[test]
    fn test_mean_floors() {
        let agg = aggregator_with(&[Ok(10), Ok(11)], AggregationMethod::Mean);
        assert_eq!(agg.get_price().unwrap(), 10);
    }

    #[test]
    fn test_weighted_mean() {
        let mut agg = aggregator_with(&[Ok(100), Ok(200)], AggregationMethod::Weighted);
        agg.set_weight(&OWNER, &id(0), 3).unwrap();
        // (100*3 + 200*1) / 4
        assert_eq!(agg.get_price().unwrap(), 125);
    }

    #[test]
    fn test_weighted_skips_failed_source_weight() {
        let mut agg = aggregator_with(
            &[Ok(100), Err(SourceError::unavailable("down")), Ok(400)],
            AggregationMethod::Weighted,
        );
        agg.set_weight(&OWNER, &id(1), 50).unwrap();
        agg.set_weight(&OWNER, &id(2), 2).unwrap();
        // (100*1 + 400*2) / 3
        assert_eq!(agg.get_price().unwrap(), 300);
    }

    #[test]
    fn test_weighted_falls_back_to_mean_on_surplus_readings() {
        let readings = [(100, 3), (200, 1), (600, 1)];
        assert_eq!(combine(AggregationMethod::Weighted, &readings, 3), 220);
        assert_eq!(combine(AggregationMethod::Weighted, &readings, 2), 300);
        assert_eq!(combine(AggregationMethod::Weighted, &[(100, 0), (300, 0)], 2), 200);
    }

    #[test]
    fn test_admin_requires_owner() {
        let mut agg = aggregator_with(&[Ok(1)], AggregationMethod::Mean);
        let stranger = AccountId::new([99; 32]);
        assert_eq!(
            agg.set_method(&stranger, AggregationMethod::Median),
            Err(OracleError::Unauthorized)
        );
        assert_eq!(
            agg.add_source(&OWNER, id(0), Arc::new(Fixed(Ok(1))), 1),
            Err(OracleError::DuplicateSource)
        );
        assert_eq!(
            agg.add_source(&OWNER, AccountId::ZERO, Arc::new(Fixed(Ok(1))), 1),
            Err(OracleError::ZeroAddress)
        );
        assert!(agg.set_min_sources(&OWNER, 0).is_err());
        assert!(agg.set_max_deviation_bps(&OWNER, 10_001).is_err());
    }

    #[test]
    fn test_source_limit() {
        let mut agg = MultiSourceAggregator::new(OWNER, AggregationMethod::Mean).unwrap();
        for i in 0..MAX_SOURCES {
            agg.add_source(&OWNER, id(i as u8), Arc::new(Fixed(Ok(1))), 0).unwrap();
        }
        assert_eq!(
            agg.add_source(&OWNER, id(200), Arc::new(Fixed(Ok(1))), 0),
            Err(OracleError::TooManySources(MAX_SOURCES + 1, MAX_SOURCES))
        );
    }

    #[test]
    fn test_freeze_is_permanent() {
        let mut agg = aggregator_with(&[Ok(100)], AggregationMethod::Mean);
        agg.freeze(&OWNER).unwrap();

        assert!(agg.is_frozen());
        assert_eq!(agg.freeze(&OWNER), Err(OracleError::Frozen));
        assert_eq!(
            agg.add_source(&OWNER, id(5), Arc::new(Fixed(Ok(1))), 0),
            Err(OracleError::Frozen)
        );
        assert_eq!(agg.remove_source(&OWNER, &id(0)), Err(OracleError::Frozen));
        assert_eq!(agg.set_weight(&OWNER, &id(0), 2), Err(OracleError::Frozen));
        assert_eq!(agg.get_price().unwrap(), 100);
    }

    #[test]
    fn test_remove_source_and_snapshot() {
        let mut agg = aggregator_with(&[Ok(100), Ok(300)], AggregationMethod::Mean);
        agg.remove_source(&OWNER, &id(1)).unwrap();
        assert_eq!(agg.remove_source(&OWNER, &id(1)), Err(OracleError::SourceNotFound));

        let snapshot = agg.snapshot();
        assert_eq!(snapshot.sources, vec![(id(0), 0)]);
        assert_eq!(snapshot.method, AggregationMethod::Mean);
        assert!(!snapshot.frozen);

        let bytes = snapshot.try_to_vec().unwrap();
        assert_eq!(AggregatorSnapshot::try_from_slice(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_nested_aggregators() {
        let inner = aggregator_with(&[Ok(100), Ok(200)], AggregationMethod::Mean);
        let mut outer = MultiSourceAggregator::new(OWNER, AggregationMethod::Median).unwrap();
        outer.add_source(&OWNER, id(1), Arc::new(inner), 0).unwrap();
        outer.add_source(&OWNER, id(2), Arc::new(Fixed(Ok(160))), 0).unwrap();
        // median(150, 160)
        assert_eq!(outer.get_price().unwrap(), 155);
    }
}
