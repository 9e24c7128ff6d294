//! The analytics engine: one pure derivation pass from a raw user record
//! to the series and summaries behind every dashboard view.
//!
//! Every function here is a total function of its explicit inputs,
//! including `today`: there is no hidden clock and no I/O. The caller
//! re-runs [`derive_dashboard`] whenever the record, the selected range,
//! or the selected date changes; outputs are freshly constructed values.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::models::{
    Averages, DailyAggregate, DailyTotals, Dashboard, DayStatus, HeatmapDay, HeatmapStats,
    LogEntry, Macro, MacroComparison, MacroSplit, MovingAverageEntry, Profile, Targets, TimeRange,
    UserRecord, WeightEntry,
};

/// Trailing sample count for the weight moving average.
pub const MOVING_AVG_WINDOW: usize = 7;

/// Length of the consistency heatmap window, ending today.
pub const HEATMAP_DAYS: usize = 365;

/// Below this fraction of the calorie goal a logged day counts as under.
pub const UNDER_RATIO: f64 = 0.8;

/// Above this fraction of the calorie goal a logged day counts as over.
pub const OVER_RATIO: f64 = 1.1;

/// Calorie goal substituted when the profile has none.
pub const DEFAULT_CALORIE_GOAL: i64 = 2000;

/// Macro percentage split (protein/carbs/fat) substituted per missing field.
pub const DEFAULT_SPLIT: (i64, i64, i64) = (40, 30, 30);

/// The calendar-day portion of a raw date string.
///
/// Entries may carry an embedded time-of-day (`2024-01-01T18:00`); grouping
/// and range cutoffs only ever see the day. All date comparisons in the
/// engine go through this function and [`format_day`], so plain string
/// ordering stays safe: every day is the same fixed-width `YYYY-MM-DD`.
pub fn calendar_day(date: &str) -> &str {
    match date.split_once('T') {
        Some((day, _)) => day,
        None => date,
    }
}

/// Formats a date in the engine's canonical `YYYY-MM-DD` representation.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Series entries that carry a calendar date.
pub trait Dated {
    fn date(&self) -> &str;
}

impl Dated for DailyAggregate {
    fn date(&self) -> &str {
        &self.date
    }
}

impl Dated for MovingAverageEntry {
    fn date(&self) -> &str {
        &self.date
    }
}

/// Groups raw log entries by calendar day and sums their macro fields,
/// keyed by day for date lookups. Missing or malformed numeric fields
/// count as zero; aggregation never fails.
pub fn daily_map(history: &[LogEntry]) -> BTreeMap<String, DailyAggregate> {
    let mut days: BTreeMap<String, DailyAggregate> = BTreeMap::new();
    for entry in history {
        let day = calendar_day(&entry.date);
        let agg = days.entry(day.to_string()).or_insert_with(|| DailyAggregate {
            date: day.to_string(),
            ..DailyAggregate::default()
        });
        agg.calories += entry.calories.unwrap_or(0.0);
        agg.protein += entry.protein.unwrap_or(0.0);
        agg.carbs += entry.carbs.unwrap_or(0.0);
        agg.fat += entry.fat.unwrap_or(0.0);
    }
    days
}

/// The daily aggregate series, strictly ascending by date, one entry per
/// distinct calendar day present in the input.
pub fn aggregate_daily(history: &[LogEntry]) -> Vec<DailyAggregate> {
    daily_map(history).into_values().collect()
}

/// Restricts an ascending date-ordered series to the selected trailing
/// window. `All` is the identity. A numeric range keeps entries dated on
/// or after `today - n` days; future-dated entries are retained.
pub fn filter_range<T: Dated>(series: Vec<T>, range: TimeRange, today: NaiveDate) -> Vec<T> {
    match range {
        TimeRange::All => series,
        TimeRange::Days(n) => {
            let cutoff = format_day(today - Duration::days(i64::from(n)));
            series
                .into_iter()
                .filter(|entry| calendar_day(entry.date()) >= cutoff.as_str())
                .collect()
        }
    }
}

/// Annotates a weight series with its trailing moving average.
///
/// Entries are sorted ascending by date first. The window for position `i`
/// is the entries `[max(0, i - 6) ..= i]`; it is defined by entry count,
/// not elapsed calendar time, and shrinks at the start of the series.
pub fn moving_average(weight_history: &[WeightEntry]) -> Vec<MovingAverageEntry> {
    let mut sorted: Vec<&WeightEntry> = weight_history.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    sorted
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let start = i.saturating_sub(MOVING_AVG_WINDOW - 1);
            let window = &sorted[start..=i];
            let sum: f64 = window.iter().map(|e| e.weight.unwrap_or(0.0)).sum();
            MovingAverageEntry {
                date: entry.date.clone(),
                weight: entry.weight.unwrap_or(0.0),
                moving_avg: round1(sum / window.len() as f64),
            }
        })
        .collect()
}

/// Integer coercion for stored goal fields: truncate toward zero, and fall
/// back to the default when the value is missing, unparseable, or zero.
fn int_or(value: Option<f64>, default: i64) -> i64 {
    match value {
        Some(v) => {
            let n = v.trunc() as i64;
            if n != 0 {
                n
            } else {
                default
            }
        }
        None => default,
    }
}

/// Derives calorie and per-macro gram targets from the profile.
///
/// Always returns a complete value: the calorie goal defaults to 2000 and
/// the percentage split to 40/30/30. Gram targets are
/// `round(cal * pct / 100 / kcal_per_gram)`.
pub fn resolve_targets(profile: &Profile) -> Targets {
    let calories = int_or(profile.daily_goal, DEFAULT_CALORIE_GOAL);
    let grams = |pct: i64, m: Macro| -> i64 {
        ((calories as f64 * pct as f64 / 100.0) / m.kcal_per_gram()).round() as i64
    };
    let (p_pct, c_pct, f_pct) = DEFAULT_SPLIT;
    Targets {
        calories,
        protein: grams(int_or(profile.target_protein, p_pct), Macro::Protein),
        carbs: grams(int_or(profile.target_carbs, c_pct), Macro::Carbs),
        fat: grams(int_or(profile.target_fat, f_pct), Macro::Fat),
    }
}

/// Rounded daily means over the filtered range. The divisor is floored at
/// 1, so an empty range yields zeros rather than a division by zero. The
/// weight figure is the latest filtered measurement, not a mean.
pub fn compute_averages(
    filtered: &[DailyAggregate],
    filtered_weight: &[MovingAverageEntry],
) -> Averages {
    let days = filtered.len().max(1) as f64;
    let mean = |field: fn(&DailyAggregate) -> f64| -> i64 {
        (filtered.iter().map(field).sum::<f64>() / days).round() as i64
    };
    Averages {
        calories: mean(|d| d.calories),
        protein: mean(|d| d.protein),
        carbs: mean(|d| d.carbs),
        fat: mean(|d| d.fat),
        weight: filtered_weight.last().map(|w| w.weight).unwrap_or(0.0),
    }
}

/// Actual-vs-goal percentages per macro. A zero target yields 0% instead
/// of a non-finite value.
pub fn macro_comparison(averages: &Averages, targets: &Targets) -> Vec<MacroComparison> {
    Macro::all()
        .iter()
        .map(|m| {
            let (actual, target) = match m {
                Macro::Protein => (averages.protein, targets.protein),
                Macro::Carbs => (averages.carbs, targets.carbs),
                Macro::Fat => (averages.fat, targets.fat),
            };
            let pct = if target != 0 {
                (actual as f64 / target as f64 * 100.0).round() as i64
            } else {
                0
            };
            MacroComparison {
                name: m.display_name(),
                actual,
                target,
                pct,
            }
        })
        .collect()
}

/// Percentage of actual consumed calories contributed by each macro,
/// weighted by energy density. The denominator is floored at 1 so an
/// all-zero range yields zeros.
pub fn macro_split(averages: &Averages) -> MacroSplit {
    let protein_kcal = averages.protein as f64 * Macro::Protein.kcal_per_gram();
    let carbs_kcal = averages.carbs as f64 * Macro::Carbs.kcal_per_gram();
    let fat_kcal = averages.fat as f64 * Macro::Fat.kcal_per_gram();
    let total = (protein_kcal + carbs_kcal + fat_kcal).max(1.0);
    MacroSplit {
        protein: (protein_kcal / total * 100.0).round() as i64,
        carbs: (carbs_kcal / total * 100.0).round() as i64,
        fat: (fat_kcal / total * 100.0).round() as i64,
    }
}

/// Classifies the 365 calendar days ending today (oldest first) by
/// adherence to the calorie goal.
///
/// Takes the unfiltered daily map: the heatmap window is fixed and does
/// not follow the selected chart range. Days without an aggregate are
/// `Empty` with 0 kcal and count toward no tally.
pub fn build_heatmap(
    days: &BTreeMap<String, DailyAggregate>,
    target_calories: i64,
    today: NaiveDate,
) -> (Vec<HeatmapDay>, HeatmapStats) {
    let goal = if target_calories != 0 {
        target_calories as f64
    } else {
        DEFAULT_CALORIE_GOAL as f64
    };

    let mut cells = Vec::with_capacity(HEATMAP_DAYS);
    let mut stats = HeatmapStats::default();
    for offset in (0..HEATMAP_DAYS).rev() {
        let date = format_day(today - Duration::days(offset as i64));
        let cell = match days.get(&date) {
            Some(agg) => {
                stats.logged += 1;
                let ratio = agg.calories / goal;
                let status = if ratio > OVER_RATIO {
                    stats.over += 1;
                    DayStatus::Over
                } else if ratio < UNDER_RATIO {
                    stats.under += 1;
                    DayStatus::Under
                } else {
                    stats.on_track += 1;
                    DayStatus::Good
                };
                HeatmapDay {
                    date,
                    status,
                    calories: agg.calories,
                }
            }
            None => HeatmapDay {
                date,
                status: DayStatus::Empty,
                calories: 0.0,
            },
        };
        cells.push(cell);
    }
    (cells, stats)
}

/// Extracts and totals the raw entries for one selected calendar day.
///
/// Matching is by prefix on the raw `date` field, so a date-only selection
/// matches entries with an embedded time-of-day. No selection yields an
/// empty list and zeroed totals.
pub fn inspect_day(history: &[LogEntry], selected: Option<&str>) -> (Vec<LogEntry>, DailyTotals) {
    let Some(day) = selected else {
        return (Vec::new(), DailyTotals::default());
    };

    let meals: Vec<LogEntry> = history
        .iter()
        .filter(|entry| entry.date.starts_with(day))
        .cloned()
        .collect();

    let mut totals = DailyTotals::default();
    for meal in &meals {
        totals.calories += meal.calories.unwrap_or(0.0);
        totals.protein += meal.protein.unwrap_or(0.0);
        totals.carbs += meal.carbs.unwrap_or(0.0);
        totals.fat += meal.fat.unwrap_or(0.0);
    }
    (meals, totals)
}

/// The full derivation pass.
///
/// Recomputes every derived value from the raw record, the selected range,
/// and the selected date. Callers may memoize by input identity, but
/// correctness never depends on caching.
pub fn derive_dashboard(
    record: &UserRecord,
    range: TimeRange,
    selected_date: Option<&str>,
    today: NaiveDate,
) -> Dashboard {
    let days = daily_map(&record.history);
    let targets = resolve_targets(&record.profile);

    let chart_data = filter_range(days.values().cloned().collect(), range, today);
    let weight_data = filter_range(moving_average(&record.weight_history), range, today);

    let averages = compute_averages(&chart_data, &weight_data);
    let comparison = macro_comparison(&averages, &targets);
    let split = macro_split(&averages);

    let (heatmap_data, heatmap_stats) = build_heatmap(&days, targets.calories, today);
    let (selected_meals, daily_totals) = inspect_day(&record.history, selected_date);

    Dashboard {
        chart_data,
        weight_data,
        averages,
        targets,
        heatmap_data,
        heatmap_stats,
        selected_meals,
        macro_comparison_data: comparison,
        macro_split: split,
        daily_totals,
    }
}
