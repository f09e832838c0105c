use std::{fmt::Display, str::FromStr};

use agm_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(pub &'static str, pub String);

//--------------------------------------      Currency       ---------------------------------------------------------
/// The two currencies the engine understands. Prices in [`Currency::Usd`] are normalised to the local currency
/// with the run's exchange rate before any profitability math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ars,
    Usd,
}

impl Currency {
    pub fn is_foreign(&self) -> bool {
        matches!(self, Currency::Usd)
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Ars => write!(f, "ARS"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

impl FromStr for Currency {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ARS" | "ars" => Ok(Self::Ars),
            "USD" | "usd" => Ok(Self::Usd),
            s => Err(ConversionError("currency", s.to_string())),
        }
    }
}

//--------------------------------------   QuotationStatus    --------------------------------------------------------
/// The business outcome of a quotation. `Pending → Processing → { Matched | NoMatches | Failed }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Pending,
    Processing,
    Matched,
    NoMatches,
    Failed,
}

impl Display for QuotationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotationStatus::Pending => write!(f, "pending"),
            QuotationStatus::Processing => write!(f, "processing"),
            QuotationStatus::Matched => write!(f, "matched"),
            QuotationStatus::NoMatches => write!(f, "no_matches"),
            QuotationStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for QuotationStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "matched" => Ok(Self::Matched),
            "no_matches" => Ok(Self::NoMatches),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError("quotation status", s.to_string())),
        }
    }
}

//--------------------------------------   ProcessingStatus   --------------------------------------------------------
/// The coarse dedup guard, independent of business outcome. A quotation whose processing status is `Completed` is
/// never automatically re-enqueued, even when the business status is `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStatus::Pending => write!(f, "pending"),
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Completed => write!(f, "completed"),
        }
    }
}

//-------------------------------------- ReferenceDiffType    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReferenceDiffType {
    Fixed,
    Percentage,
}

impl Display for ReferenceDiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceDiffType::Fixed => write!(f, "fixed"),
            ReferenceDiffType::Percentage => write!(f, "percentage"),
        }
    }
}

//--------------------------------------       Product        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
}

//--------------------------------------       Location       --------------------------------------------------------
/// A geographic point. Persisted locations have non-negative ids; the synthetic benchmark location uses the
/// reserved negative namespace and must never reach the route cache.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub place_id: String,
}

impl Location {
    pub fn is_synthetic(&self) -> bool {
        self.id < 0
    }
}

//--------------------------------------      Quotation       --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quotation {
    pub id: i64,
    pub product_id: i64,
    pub location_id: i64,
    pub quantity_tons: f64,
    pub name: String,
    pub cellphone: String,
    pub email: String,
    pub status: QuotationStatus,
    pub processing_status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quotation with its product and origin location loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotationContext {
    pub quotation: Quotation,
    pub product: Product,
    pub location: Location,
}

impl QuotationContext {
    pub fn id(&self) -> i64 {
        self.quotation.id
    }

    pub fn quantity_tons(&self) -> f64 {
        self.quotation.quantity_tons
    }
}

//--------------------------------------     Opportunity      --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: i64,
    pub product_id: i64,
    pub location_id: i64,
    pub quantity_tons: Option<f64>,
    pub name: String,
    pub quality: Option<String>,
    pub market_type: String,
    pub currency: Currency,
    pub status: String,
    pub is_promoted: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Benchmark opportunities are fabricated in memory with ids in the reserved negative namespace
    /// (one slot per product). They are used for comparison math only and are never persisted as matches.
    pub fn is_benchmark(&self) -> bool {
        self.id < 0
    }
}

/// An opportunity with its product, location and payment options loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityContext {
    pub opportunity: Opportunity,
    pub product: Product,
    pub location: Location,
    pub payment_options: Vec<PaymentOption>,
}

impl OpportunityContext {
    pub fn id(&self) -> i64 {
        self.opportunity.id
    }

    pub fn is_benchmark(&self) -> bool {
        self.opportunity.is_benchmark()
    }

    pub fn payment_option(&self, id: i64) -> Option<&PaymentOption> {
        self.payment_options.iter().find(|po| po.id == id)
    }
}

//--------------------------------------    PaymentOption     --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentOption {
    pub id: i64,
    pub opportunity_id: i64,
    pub price_per_ton: Option<Money>,
    pub payment_term_days: i64,
    pub is_reference_based: bool,
    pub reference_diff: Option<Money>,
    pub reference_diff_type: ReferenceDiffType,
    pub reference_diff_currency: Currency,
}

//--------------------------------------   ReferencePrice     --------------------------------------------------------
/// The latest stored price for a product at the reference market. Feeds the benchmark synthesizer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub id: i64,
    pub product_id: i64,
    pub price_per_ton: Money,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Route         --------------------------------------------------------
/// A cached directional route between two persisted locations.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Route {
    pub id: i64,
    pub origin_id: i64,
    pub destination_id: i64,
    pub distance_meters: i64,
    pub duration_seconds: i64,
    pub geometry: Option<String>,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewMatch       --------------------------------------------------------
/// A fully computed match, ready for insertion. All monetary fields have been clamped to the storable range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMatch {
    pub quotation_id: i64,
    pub opportunity_id: i64,
    pub payment_option_id: i64,
    pub score: Money,
    pub profitability: Money,
    pub commission: Money,
    pub transportation_cost: Money,
    pub price_per_ton: Money,
    pub total_amount: Money,
    pub exchange_rate_used: Option<f64>,
    pub distance_km: i64,
    pub is_promoted: bool,
    pub transport_rate_applied: Option<Money>,
    pub payment_term_days: i64,
    pub is_reference_based: bool,
    pub reference_diff_display: Option<String>,
    pub benchmark_price_per_ton: Option<Money>,
    pub benchmark_difference: Option<Money>,
    pub benchmark_difference_percent: Option<f64>,
}

//--------------------------------------        Match         --------------------------------------------------------
/// A persisted match row. Created once per (quotation, opportunity) pair; never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub quotation_id: i64,
    pub opportunity_id: i64,
    pub payment_option_id: i64,
    pub score: Money,
    pub profitability: Money,
    pub commission: Money,
    pub transportation_cost: Money,
    pub price_per_ton: Money,
    pub total_amount: Money,
    pub exchange_rate_used: Option<f64>,
    pub distance_km: i64,
    pub is_promoted: bool,
    pub transport_rate_applied: Option<Money>,
    pub payment_term_days: i64,
    pub is_reference_based: bool,
    pub reference_diff_display: Option<String>,
    pub benchmark_price_per_ton: Option<Money>,
    pub benchmark_difference: Option<Money>,
    pub benchmark_difference_percent: Option<f64>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      JobState        --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Active,
    Completed,
    Failed,
}

impl Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "queued"),
            JobState::Active => write!(f, "active"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------      JobOrigin       --------------------------------------------------------
/// How a job entered the queue. Recovery jobs come from the startup sweep over stuck quotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobOrigin {
    Enqueued,
    Recovery,
    Manual,
    Cron,
}

impl Display for JobOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOrigin::Enqueued => write!(f, "enqueued"),
            JobOrigin::Recovery => write!(f, "recovery"),
            JobOrigin::Manual => write!(f, "manual"),
            JobOrigin::Cron => write!(f, "cron"),
        }
    }
}

//--------------------------------------       MatchJob       --------------------------------------------------------
/// A durable queue entry. Jobs are processed at least once; bounded retries with exponential backoff are a
/// queue-level concern and never re-flag the quotation's business status.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MatchJob {
    pub id: i64,
    pub quotation_id: i64,
    pub origin: JobOrigin,
    pub state: JobState,
    pub attempts: i64,
    pub max_attempts: i64,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchJob {
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
