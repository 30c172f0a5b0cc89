use std::sync::Mutex;

use ascent_core::errors::SourceError;
use ascent_core::oracle::PriceSource;

/// Always returns the same price
#[derive(Debug, Clone, Copy)]
pub struct StaticPriceSource(pub u128);

impl PriceSource for StaticPriceSource {
    fn get_price(&self) -> Result<u128, SourceError> {
        Ok(self.0)
    }
}

/// Always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingPriceSource;

impl PriceSource for FailingPriceSource {
    fn get_price(&self) -> Result<u128, SourceError> {
        Err(SourceError::unavailable("source offline"))
    }
}

/// Price source whose answer can be changed between calls
#[derive(Debug)]
pub struct SwitchablePriceSource {
    answer: Mutex<Result<u128, SourceError>>,
}

impl SwitchablePriceSource {
    pub fn new(price: u128) -> Self {
        Self {
            answer: Mutex::new(Ok(price)),
        }
    }

    pub fn set_price(&self, price: u128) {
        *self.answer.lock().unwrap() = Ok(price);
    }

    pub fn set_failing(&self) {
        *self.answer.lock().unwrap() = Err(SourceError::unavailable("source offline"));
    }
}

impl PriceSource for SwitchablePriceSource {
    fn get_price(&self) -> Result<u128, SourceError> {
        self.answer.lock().unwrap().clone()
    }
}
