//! Quote access for building conversion snapshots.
//!
//! A [`PricingContext`] holds one quote for a batch of processing. Callers
//! fetch it once, build every entry in the batch from it, and refresh it
//! explicitly when it ages out.

use crate::error::LedgerError;
use crate::models::{CryptoConv, Currency, LedgerAccount, LedgerLeg, QuoteResponse};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

/// Anything able to produce a current market quote.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_quote(&self) -> Result<QuoteResponse, LedgerError>;
}

/// Always returns the same quote. Used for replays and tests.
#[derive(Debug, Clone)]
pub struct FixedQuoteProvider {
    quote: QuoteResponse,
}

impl FixedQuoteProvider {
    pub fn new(quote: QuoteResponse) -> Self {
        Self { quote }
    }
}

#[async_trait]
impl QuoteProvider for FixedQuoteProvider {
    async fn get_quote(&self) -> Result<QuoteResponse, LedgerError> {
        Ok(self.quote.clone())
    }
}

#[derive(Debug, Clone)]
pub struct PricingContext {
    quote: QuoteResponse,
}

impl PricingContext {
    pub fn new(quote: QuoteResponse) -> Result<Self, LedgerError> {
        quote.validate()?;
        Ok(Self { quote })
    }

    #[instrument(skip(provider))]
    pub async fn fetch<P>(provider: &P) -> Result<Self, LedgerError>
    where
        P: QuoteProvider + ?Sized,
    {
        let quote = provider.get_quote().await?;
        info!(source = %quote.source, fetch_date = %quote.fetch_date, "Fetched quote");
        Self::new(quote)
    }

    pub fn quote(&self) -> &QuoteResponse {
        &self.quote
    }

    /// Replace the held quote with a fresh one from `provider`.
    pub async fn refresh<P>(&mut self, provider: &P) -> Result<(), LedgerError>
    where
        P: QuoteProvider + ?Sized,
    {
        let quote = provider.get_quote().await?;
        quote.validate()?;
        self.quote = quote;
        Ok(())
    }

    /// Refresh when the held quote is older than `max_age` at `now`.
    ///
    /// A failed refresh keeps the old quote and returns the error.
    pub async fn ensure_fresh<P>(
        &mut self,
        provider: &P,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerError>
    where
        P: QuoteProvider + ?Sized,
    {
        let age = self.quote.age(now);
        if age <= max_age {
            return Ok(false);
        }
        if let Err(e) = self.refresh(provider).await {
            warn!(age_secs = age.num_seconds(), error = %e, "Quote refresh failed");
            return Err(e);
        }
        Ok(true)
    }

    pub fn conv(&self, amount: Decimal, unit: Currency) -> Result<CryptoConv, LedgerError> {
        CryptoConv::from_quote(amount, unit, &self.quote)
    }

    /// A leg valued with the held quote.
    pub fn leg(
        &self,
        account: LedgerAccount,
        amount: Decimal,
        unit: Currency,
    ) -> Result<LedgerLeg, LedgerError> {
        Ok(LedgerLeg::new(account, amount, unit, self.conv(amount, unit)?))
    }
}
