use async_trait::async_trait;
use rust_decimal::Decimal;
use spacebook_core::{traits::RateProvider, AppResult};

/// Always answers with the configured rate
#[derive(Debug, Clone, Copy)]
pub struct FixedRateProvider {
    rate: Decimal,
}

impl FixedRateProvider {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn fetch_rate(&self) -> AppResult<Decimal> {
        Ok(self.rate)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
