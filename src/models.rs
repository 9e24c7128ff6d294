use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseRangeError;

/// An individual meal log entry, as stored in the user document.
///
/// `date` is `YYYY-MM-DD`, optionally with an embedded time-of-day suffix
/// (`2024-01-01T18:00`). The suffix is kept on the entry so the day
/// inspector can show logging times; aggregation strips it.
///
/// Numeric fields are `None` when the stored value was absent or not
/// parseable as a number. The engine treats `None` as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEntry {
    pub date: String,
    /// Meal name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Calories (kcal)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    /// Protein (g)
    #[serde(rename = "p", skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    /// Carbs (g)
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    /// Fat (g)
    #[serde(rename = "f", skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
}

/// A weight measurement entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: String,
    /// Weight in lbs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Goal settings from the user profile.
///
/// The three targets are percentages of calories and need not sum to 100.
/// Every field is optional; the goal resolver substitutes defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Daily calorie target (kcal)
    #[serde(rename = "dailyGoal", skip_serializing_if = "Option::is_none")]
    pub daily_goal: Option<f64>,
    /// Percent of calories from protein
    #[serde(rename = "targetP", skip_serializing_if = "Option::is_none")]
    pub target_protein: Option<f64>,
    /// Percent of calories from carbs
    #[serde(rename = "targetC", skip_serializing_if = "Option::is_none")]
    pub target_carbs: Option<f64>,
    /// Percent of calories from fat
    #[serde(rename = "targetF", skip_serializing_if = "Option::is_none")]
    pub target_fat: Option<f64>,
}

/// The complete per-user record fetched from the store.
///
/// Sections missing from the stored document decode to empty defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub history: Vec<LogEntry>,
    #[serde(rename = "weightHistory", default)]
    pub weight_history: Vec<WeightEntry>,
}

/// The three tracked macronutrients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Macro {
    Protein,
    Carbs,
    Fat,
}

impl Macro {
    /// Returns all macro variants in display order.
    pub fn all() -> &'static [Macro] {
        &[Macro::Protein, Macro::Carbs, Macro::Fat]
    }

    /// Energy density used to convert grams to calories.
    pub fn kcal_per_gram(&self) -> f64 {
        match self {
            Macro::Protein | Macro::Carbs => 4.0,
            Macro::Fat => 9.0,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Macro::Protein => "Protein",
            Macro::Carbs => "Carbs",
            Macro::Fat => "Fat",
        }
    }
}

/// The user-selected chart window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    /// Trailing window of the most recent `n` days.
    Days(u32),
    /// The full history.
    All,
}

impl FromStr for TimeRange {
    type Err = ParseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(TimeRange::All);
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(TimeRange::Days(n)),
            _ => Err(ParseRangeError(s.to_string())),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeRange::Days(n) => write!(f, "{}", n),
            TimeRange::All => write!(f, "all"),
        }
    }
}

/// Sum of all meal entries sharing one calendar day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyAggregate {
    pub date: String,
    pub calories: f64,
    #[serde(rename = "p")]
    pub protein: f64,
    #[serde(rename = "c")]
    pub carbs: f64,
    #[serde(rename = "f")]
    pub fat: f64,
}

/// A weight measurement annotated with its trailing 7-sample average.
#[derive(Debug, Clone, Serialize)]
pub struct MovingAverageEntry {
    pub date: String,
    pub weight: f64,
    /// Mean of this and up to 6 preceding measurements, 1 decimal place
    #[serde(rename = "movingAvg")]
    pub moving_avg: f64,
}

/// Calorie and per-macro gram targets resolved from the profile.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Targets {
    #[serde(rename = "cal")]
    pub calories: i64,
    /// Protein target (g)
    #[serde(rename = "p")]
    pub protein: i64,
    /// Carbs target (g)
    #[serde(rename = "c")]
    pub carbs: i64,
    /// Fat target (g)
    #[serde(rename = "f")]
    pub fat: i64,
}

/// Rounded daily means over the filtered range.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Averages {
    #[serde(rename = "cal")]
    pub calories: i64,
    #[serde(rename = "p")]
    pub protein: i64,
    #[serde(rename = "c")]
    pub carbs: i64,
    #[serde(rename = "f")]
    pub fat: i64,
    /// Latest filtered measurement, not a mean; 0 when none exists
    pub weight: f64,
}

/// Classification of one heatmap day against the calorie goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    /// No entries logged that day.
    Empty,
    /// Within 80%..=110% of the goal.
    Good,
    /// Below 80% of the goal.
    Under,
    /// Above 110% of the goal.
    Over,
}

/// One cell of the 365-day consistency heatmap.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapDay {
    pub date: String,
    pub status: DayStatus,
    /// 0 when no entries were logged that day
    pub calories: f64,
}

/// Status tallies across the heatmap window. Empty days are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeatmapStats {
    /// Days with at least one entry
    #[serde(rename = "total")]
    pub logged: u32,
    #[serde(rename = "green")]
    pub on_track: u32,
    #[serde(rename = "yellow")]
    pub under: u32,
    #[serde(rename = "red")]
    pub over: u32,
}

/// Actual-vs-goal performance for one macro.
#[derive(Debug, Clone, Serialize)]
pub struct MacroComparison {
    pub name: &'static str,
    /// Average grams consumed per day over the filtered range
    pub actual: i64,
    /// Goal (g)
    pub target: i64,
    /// `round(actual / target * 100)`; 0 when the target is 0
    pub pct: i64,
}

/// Percentage of actual consumed calories contributed by each macro.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MacroSplit {
    #[serde(rename = "p")]
    pub protein: i64,
    #[serde(rename = "c")]
    pub carbs: i64,
    #[serde(rename = "f")]
    pub fat: i64,
}

/// Summed intake for the inspected calendar day.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DailyTotals {
    #[serde(rename = "cal")]
    pub calories: f64,
    #[serde(rename = "p")]
    pub protein: f64,
    #[serde(rename = "c")]
    pub carbs: f64,
    #[serde(rename = "f")]
    pub fat: f64,
}

/// The full derived bundle consumed by the dashboard views.
///
/// Freshly constructed on every derivation pass; safe to hand to
/// concurrent readers.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub chart_data: Vec<DailyAggregate>,
    pub weight_data: Vec<MovingAverageEntry>,
    pub averages: Averages,
    pub targets: Targets,
    pub heatmap_data: Vec<HeatmapDay>,
    pub heatmap_stats: HeatmapStats,
    pub selected_meals: Vec<LogEntry>,
    pub macro_comparison_data: Vec<MacroComparison>,
    pub macro_split: MacroSplit,
    pub daily_totals: DailyTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_from_str() {
        assert_eq!(TimeRange::from_str("7").unwrap(), TimeRange::Days(7));
        assert_eq!(TimeRange::from_str("30").unwrap(), TimeRange::Days(30));
        assert_eq!(TimeRange::from_str("90").unwrap(), TimeRange::Days(90));
        assert_eq!(TimeRange::from_str("all").unwrap(), TimeRange::All);
        assert_eq!(TimeRange::from_str("ALL").unwrap(), TimeRange::All);
        assert_eq!(TimeRange::from_str(" 7 ").unwrap(), TimeRange::Days(7));
    }

    #[test]
    fn test_time_range_rejects_invalid() {
        assert!(TimeRange::from_str("").is_err());
        assert!(TimeRange::from_str("0").is_err());
        assert!(TimeRange::from_str("-7").is_err());
        assert!(TimeRange::from_str("week").is_err());
    }

    #[test]
    fn test_time_range_display_round_trips() {
        for range in [TimeRange::Days(7), TimeRange::Days(30), TimeRange::All] {
            let parsed = TimeRange::from_str(&range.to_string()).unwrap();
            assert_eq!(parsed, range);
        }
    }

    #[test]
    fn test_macro_energy_density() {
        assert_eq!(Macro::Protein.kcal_per_gram(), 4.0);
        assert_eq!(Macro::Carbs.kcal_per_gram(), 4.0);
        assert_eq!(Macro::Fat.kcal_per_gram(), 9.0);
        assert_eq!(Macro::all().len(), 3);
    }

    #[test]
    fn test_user_record_defaults_missing_sections() {
        let record: UserRecord = serde_json::from_str("{}").unwrap();
        assert!(record.history.is_empty());
        assert!(record.weight_history.is_empty());
        assert!(record.profile.daily_goal.is_none());
    }

    #[test]
    fn test_day_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DayStatus::Empty).unwrap(),
            "\"empty\""
        );
        assert_eq!(serde_json::to_string(&DayStatus::Good).unwrap(), "\"good\"");
    }
}
