//! Health record collaborators
//!
//! Wellbeing scores, glucose readings and meal plans live behind traits so
//! agents never care where records are kept. Values are validated when they
//! are constructed; the stores only check ownership and time windows.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::greeter::USER_ID_RANGE;
use crate::core::{truncate_chars, AssistantError, Result};

pub const MIN_WELLBEING_SCORE: i64 = 1;
pub const MAX_WELLBEING_SCORE: i64 = 10;
/// Lowest plausible CGM reading, mg/dL
pub const MIN_READING: f64 = 20.0;
/// Highest plausible CGM reading, mg/dL
pub const MAX_READING: f64 = 600.0;
pub const MIN_HISTORY_DAYS: i64 = 1;
pub const MAX_HISTORY_DAYS: i64 = 90;
/// Longest description kept per meal
pub const MAX_MEAL_CHARS: usize = 500;

/// Clamp a look-back window into the supported range
pub fn history_days(days: i64) -> i64 {
    days.clamp(MIN_HISTORY_DAYS, MAX_HISTORY_DAYS)
}

fn cutoff(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(history_days(days))
}

fn check_user(user_id: i64) -> Result<i64> {
    if USER_ID_RANGE.contains(&user_id) {
        Ok(user_id)
    } else {
        Err(AssistantError::invalid(format!("Invalid user ID {}", user_id)))
    }
}

fn poisoned(store: &str) -> AssistantError {
    AssistantError::storage(format!("{} lock poisoned", store))
}

// ---------------------------------------------------------------------------
// Wellbeing
// ---------------------------------------------------------------------------

/// What a wellbeing score measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellbeingKind {
    Energy,
    Mood,
    Stress,
    SleepQuality,
}

impl WellbeingKind {
    pub const ALL: [WellbeingKind; 4] = [
        WellbeingKind::Energy,
        WellbeingKind::Mood,
        WellbeingKind::Stress,
        WellbeingKind::SleepQuality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WellbeingKind::Energy => "energy",
            WellbeingKind::Mood => "mood",
            WellbeingKind::Stress => "stress",
            WellbeingKind::SleepQuality => "sleep_quality",
        }
    }
}

impl fmt::Display for WellbeingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WellbeingKind {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_lowercase();
        WellbeingKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| {
                let valid: Vec<&str> = WellbeingKind::ALL.iter().map(|k| k.as_str()).collect();
                AssistantError::invalid(format!(
                    "Invalid log type. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

/// A score between 1 and 10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WellbeingScore(u8);

impl WellbeingScore {
    pub fn new(score: i64) -> Result<Self> {
        if (MIN_WELLBEING_SCORE..=MAX_WELLBEING_SCORE).contains(&score) {
            Ok(Self(score as u8))
        } else {
            Err(AssistantError::invalid(format!(
                "Invalid score. Please provide a value between {} and {}",
                MIN_WELLBEING_SCORE, MAX_WELLBEING_SCORE
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellbeingEntry {
    pub user_id: i64,
    pub score: WellbeingScore,
    pub kind: WellbeingKind,
    pub recorded_at: DateTime<Utc>,
}

/// Wellbeing entries over a window, newest first, with per-kind averages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellbeingHistory {
    pub days: i64,
    pub entries: Vec<WellbeingEntry>,
    pub averages: BTreeMap<WellbeingKind, f64>,
}

impl WellbeingHistory {
    fn from_entries(days: i64, mut entries: Vec<WellbeingEntry>) -> Self {
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

        let mut sums: BTreeMap<WellbeingKind, (u32, u32)> = BTreeMap::new();
        for entry in &entries {
            let (sum, count) = sums.entry(entry.kind).or_default();
            *sum += u32::from(entry.score.value());
            *count += 1;
        }
        let averages = sums
            .into_iter()
            .map(|(kind, (sum, count))| (kind, f64::from(sum) / f64::from(count)))
            .collect();

        Self {
            days,
            entries,
            averages,
        }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// One-line digest, e.g. `mood 6.5, stress 4.0`
    pub fn summary(&self) -> String {
        self.averages
            .iter()
            .map(|(kind, avg)| format!("{} {:.1}", kind, avg))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Where wellbeing scores are kept
#[async_trait]
pub trait WellbeingLog: Send + Sync {
    async fn log_wellbeing(
        &self,
        user_id: i64,
        score: WellbeingScore,
        kind: WellbeingKind,
    ) -> Result<WellbeingEntry>;

    /// Entries from the last `days` days (clamped to 1..=90)
    async fn wellbeing_history(&self, user_id: i64, days: i64) -> Result<WellbeingHistory>;
}

#[derive(Debug, Default)]
pub struct InMemoryWellbeingLog {
    entries: Mutex<Vec<WellbeingEntry>>,
}

impl InMemoryWellbeingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry as-is, timestamp included
    pub fn record(&self, entry: WellbeingEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| poisoned("wellbeing log"))?
            .push(entry);
        Ok(())
    }
}

#[async_trait]
impl WellbeingLog for InMemoryWellbeingLog {
    async fn log_wellbeing(
        &self,
        user_id: i64,
        score: WellbeingScore,
        kind: WellbeingKind,
    ) -> Result<WellbeingEntry> {
        let entry = WellbeingEntry {
            user_id: check_user(user_id)?,
            score,
            kind,
            recorded_at: Utc::now(),
        };
        self.record(entry.clone())?;
        Ok(entry)
    }

    async fn wellbeing_history(&self, user_id: i64, days: i64) -> Result<WellbeingHistory> {
        let user_id = check_user(user_id)?;
        let days = history_days(days);
        let since = cutoff(days);

        let entries = self
            .entries
            .lock()
            .map_err(|_| poisoned("wellbeing log"))?
            .iter()
            .filter(|e| e.user_id == user_id && e.recorded_at >= since)
            .cloned()
            .collect();

        Ok(WellbeingHistory::from_entries(days, entries))
    }
}

// ---------------------------------------------------------------------------
// Glucose readings
// ---------------------------------------------------------------------------

/// A plausible CGM reading in mg/dL
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct GlucoseReading(f64);

impl GlucoseReading {
    pub fn new(mg_dl: f64) -> Result<Self> {
        if mg_dl.is_finite() && (MIN_READING..=MAX_READING).contains(&mg_dl) {
            Ok(Self(mg_dl))
        } else {
            Err(AssistantError::invalid(format!(
                "Invalid reading. Please provide a value between {} and {}",
                MIN_READING, MAX_READING
            )))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Meal a reading is associated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
        }
    }

    /// Slot for a local hour of day: 6-10 breakfast, 11-15 lunch, else dinner
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            6..=10 => MealSlot::Breakfast,
            11..=15 => MealSlot::Lunch,
            _ => MealSlot::Dinner,
        }
    }

    /// First slot named in `text`
    pub fn mentioned_in(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        MealSlot::ALL
            .into_iter()
            .filter_map(|slot| lower.find(slot.as_str()).map(|at| (at, slot)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, slot)| slot)
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingEntry {
    pub user_id: i64,
    pub reading: GlucoseReading,
    pub slot: MealSlot,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotStats {
    pub average: f64,
    pub count: usize,
}

/// Reading statistics over a window. Slots without readings are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingStats {
    pub days: i64,
    pub count: usize,
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub by_slot: BTreeMap<MealSlot, SlotStats>,
}

impl ReadingStats {
    fn from_entries<'a>(days: i64, entries: impl Iterator<Item = &'a ReadingEntry>) -> Self {
        let mut values = Vec::new();
        let mut slots: BTreeMap<MealSlot, (f64, usize)> = BTreeMap::new();
        for entry in entries {
            let value = entry.reading.value();
            values.push(value);
            let (sum, count) = slots.entry(entry.slot).or_default();
            *sum += value;
            *count += 1;
        }

        let count = values.len();
        let average = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
        let minimum = values.iter().copied().reduce(f64::min);
        let maximum = values.iter().copied().reduce(f64::max);
        let by_slot = slots
            .into_iter()
            .map(|(slot, (sum, count))| {
                (
                    slot,
                    SlotStats {
                        average: sum / count as f64,
                        count,
                    },
                )
            })
            .collect();

        Self {
            days,
            count,
            average,
            minimum,
            maximum,
            by_slot,
        }
    }

    /// One-line digest for prompts
    pub fn summary(&self) -> String {
        match (self.average, self.minimum, self.maximum) {
            (Some(avg), Some(min), Some(max)) => format!(
                "{} reading(s) in {} day(s), average {:.0} mg/dL (range {:.0}-{:.0})",
                self.count, self.days, avg, min, max
            ),
            _ => format!("no readings in {} day(s)", self.days),
        }
    }
}

/// Where glucose readings are kept
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn log_reading(
        &self,
        user_id: i64,
        reading: GlucoseReading,
        slot: MealSlot,
    ) -> Result<ReadingEntry>;

    /// Statistics over the last `days` days (clamped to 1..=90)
    async fn reading_statistics(&self, user_id: i64, days: i64) -> Result<ReadingStats>;
}

#[derive(Debug, Default)]
pub struct InMemoryReadingStore {
    readings: Mutex<Vec<ReadingEntry>>,
}

impl InMemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading as-is, timestamp included
    pub fn record(&self, entry: ReadingEntry) -> Result<()> {
        self.readings
            .lock()
            .map_err(|_| poisoned("reading store"))?
            .push(entry);
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for InMemoryReadingStore {
    async fn log_reading(
        &self,
        user_id: i64,
        reading: GlucoseReading,
        slot: MealSlot,
    ) -> Result<ReadingEntry> {
        let entry = ReadingEntry {
            user_id: check_user(user_id)?,
            reading,
            slot,
            recorded_at: Utc::now(),
        };
        self.record(entry.clone())?;
        Ok(entry)
    }

    async fn reading_statistics(&self, user_id: i64, days: i64) -> Result<ReadingStats> {
        let user_id = check_user(user_id)?;
        let days = history_days(days);
        let since = cutoff(days);

        let readings = self.readings.lock().map_err(|_| poisoned("reading store"))?;
        Ok(ReadingStats::from_entries(
            days,
            readings
                .iter()
                .filter(|r| r.user_id == user_id && r.recorded_at >= since),
        ))
    }
}

// ---------------------------------------------------------------------------
// Meal plans
// ---------------------------------------------------------------------------

/// One day's meals for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub user_id: i64,
    pub date: NaiveDate,
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MealPlan {
    /// Trims each meal and caps it at 500 characters. Every meal is required.
    pub fn new(
        user_id: i64,
        date: NaiveDate,
        breakfast: &str,
        lunch: &str,
        dinner: &str,
    ) -> Result<Self> {
        let clean = |meal: &str| truncate_chars(meal.trim(), MAX_MEAL_CHARS).trim_end().to_string();
        let (breakfast, lunch, dinner) = (clean(breakfast), clean(lunch), clean(dinner));

        if breakfast.is_empty() || lunch.is_empty() || dinner.is_empty() {
            return Err(AssistantError::invalid("All meal descriptions are required"));
        }

        Ok(Self {
            user_id,
            date,
            breakfast,
            lunch,
            dinner,
            created_at: Utc::now(),
            updated_at: None,
        })
    }
}

/// Parse a `YYYY-MM-DD` date, or use `default` when none is given
pub fn parse_plan_date(raw: Option<&str>, default: NaiveDate) -> Result<NaiveDate> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|_| AssistantError::invalid("Invalid date format. Please use YYYY-MM-DD")),
    }
}

/// Where meal plans are kept. One plan per user and date.
#[async_trait]
pub trait MealPlanStore: Send + Sync {
    /// Create or replace the plan for the plan's user and date
    async fn save_meal_plan(&self, plan: MealPlan) -> Result<MealPlan>;

    async fn meal_plan(&self, user_id: i64, date: NaiveDate) -> Result<Option<MealPlan>>;
}

#[derive(Debug, Default)]
pub struct InMemoryMealPlanStore {
    plans: Mutex<HashMap<(i64, NaiveDate), MealPlan>>,
}

impl InMemoryMealPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MealPlanStore for InMemoryMealPlanStore {
    async fn save_meal_plan(&self, mut plan: MealPlan) -> Result<MealPlan> {
        check_user(plan.user_id)?;
        let mut plans = self.plans.lock().map_err(|_| poisoned("meal plan store"))?;

        let key = (plan.user_id, plan.date);
        if let Some(existing) = plans.get(&key) {
            plan.created_at = existing.created_at;
            plan.updated_at = Some(Utc::now());
        }
        plans.insert(key, plan.clone());
        Ok(plan)
    }

    async fn meal_plan(&self, user_id: i64, date: NaiveDate) -> Result<Option<MealPlan>> {
        let user_id = check_user(user_id)?;
        let plans = self.plans.lock().map_err(|_| poisoned("meal plan store"))?;
        Ok(plans.get(&(user_id, date)).cloned())
    }
}
