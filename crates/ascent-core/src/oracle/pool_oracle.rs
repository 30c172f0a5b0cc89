//! Single-pool price oracle: TWAP tick -> sqrt ratio -> scaled price.

use tracing::debug;

use crate::constants::PRICE_OUTPUT_MULTIPLIER;
use crate::errors::{OracleError, OracleResult, SourceError};
use crate::math::{price_from_sqrt_ratio, sqrt_ratio_at_tick, PriceScale};
use crate::oracle::source::{Pool, PriceSource};
use crate::oracle::twap::{TwapReader, TwapTick};
use crate::types::{AccountId, PricePoint};

/// Prices one asset from one pool's observation history
#[derive(Debug)]
pub struct PoolPriceOracle<P: Pool> {
    pool: P,
    asset: AccountId,
    asset_is_token0: bool,
    scale: PriceScale,
    reader: TwapReader,
}

impl<P: Pool> PoolPriceOracle<P> {
    /// Build an oracle for `asset` quoted in the pool's other token.
    ///
    /// Token order is resolved once here; the pool's tokens never change.
    pub fn new(
        pool: P,
        asset: AccountId,
        asset_decimals: u8,
        quote_decimals: u8,
        window: u32,
    ) -> OracleResult<Self> {
        if asset.is_zero() {
            return Err(OracleError::ZeroAddress);
        }

        let (token0, token1) = pool.tokens();
        let asset_is_token0 = if asset == token0 {
            true
        } else if asset == token1 {
            false
        } else {
            return Err(OracleError::AssetNotInPool);
        };

        let scale = PriceScale::new(PRICE_OUTPUT_MULTIPLIER, asset_decimals, quote_decimals)?;

        Ok(Self {
            pool,
            asset,
            asset_is_token0,
            scale,
            reader: TwapReader::new(window),
        })
    }

    pub fn asset(&self) -> AccountId {
        self.asset
    }

    pub fn asset_is_token0(&self) -> bool {
        self.asset_is_token0
    }

    pub fn window(&self) -> u32 {
        self.reader.window()
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Average tick with its provenance
    pub fn twap_tick(&self) -> TwapTick {
        self.reader.read_tick(&self.pool)
    }

    /// Full price read over the configured window
    pub fn price_point(&self) -> Result<PricePoint, SourceError> {
        let reading = self.twap_tick();
        let sqrt_ratio = sqrt_ratio_at_tick(reading.tick)?;
        let scaled_price = price_from_sqrt_ratio(sqrt_ratio, self.asset_is_token0, &self.scale)?;

        debug!(
            tick = reading.tick,
            source = ?reading.source,
            price = scaled_price,
            "Pool oracle price"
        );

        Ok(PricePoint {
            raw_tick: reading.tick,
            sqrt_ratio,
            scaled_price,
        })
    }

    /// Instantaneous price from the pool's current sqrt ratio
    pub fn spot_price(&self) -> Result<u128, SourceError> {
        let slot0 = self.pool.slot0()?;
        Ok(price_from_sqrt_ratio(
            slot0.sqrt_ratio,
            self.asset_is_token0,
            &self.scale,
        )?)
    }
}

impl<P: Pool> PriceSource for PoolPriceOracle<P> {
    fn get_price(&self) -> Result<u128, SourceError> {
        Ok(self.price_point()?.scaled_price)
    }
}
