use std::time::Duration;

use chrono::NaiveDate;
use macrotrack_analytics::client::MacroTrackClient;
use macrotrack_analytics::engine::{derive_dashboard, HEATMAP_DAYS};
use macrotrack_analytics::error::StoreError;
use macrotrack_analytics::models::{LogEntry, Profile, TimeRange, UserRecord, WeightEntry};
use macrotrack_analytics::pairing::PairingSession;

fn connected_user_id() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("MACROTRACK_USER_ID").ok()
}

fn meal(date: &str, calories: f64, p: f64, c: f64, f: f64) -> LogEntry {
    LogEntry {
        date: date.to_string(),
        name: None,
        calories: Some(calories),
        protein: Some(p),
        carbs: Some(c),
        fat: Some(f),
    }
}

#[test]
fn full_derivation_pass_over_a_constructed_record() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    let record = UserRecord {
        profile: Profile {
            daily_goal: Some(2000.0),
            target_protein: Some(35.0),
            target_carbs: Some(40.0),
            target_fat: Some(25.0),
        },
        history: vec![
            meal("2024-06-08", 1850.0, 140.0, 180.0, 55.0),
            meal("2024-06-09T08:30", 550.0, 35.0, 60.0, 18.0),
            meal("2024-06-09T13:00", 700.0, 45.0, 70.0, 22.0),
            meal("2024-06-09T19:45", 800.0, 50.0, 75.0, 30.0),
            meal("2024-06-10", 1200.0, 90.0, 100.0, 35.0),
            meal("2024-02-01", 2600.0, 150.0, 250.0, 90.0),
        ],
        weight_history: vec![
            WeightEntry {
                date: "2024-06-08".to_string(),
                weight: Some(181.0),
            },
            WeightEntry {
                date: "2024-06-09".to_string(),
                weight: Some(180.4),
            },
            WeightEntry {
                date: "2024-06-10".to_string(),
                weight: Some(180.0),
            },
        ],
    };

    let dashboard = derive_dashboard(&record, TimeRange::Days(7), Some("2024-06-09"), today);

    // Three aggregated days fall inside the 7-day window; February does not.
    assert_eq!(dashboard.chart_data.len(), 3);
    let june9 = &dashboard.chart_data[1];
    assert_eq!(june9.date, "2024-06-09");
    assert_eq!(june9.calories, 2050.0);

    assert_eq!(dashboard.weight_data.len(), 3);
    assert_eq!(dashboard.averages.weight, 180.0);

    // 2000 * 0.35 / 4, 2000 * 0.40 / 4, 2000 * 0.25 / 9
    assert_eq!(dashboard.targets.protein, 175);
    assert_eq!(dashboard.targets.carbs, 200);
    assert_eq!(dashboard.targets.fat, 56);

    assert_eq!(dashboard.heatmap_data.len(), HEATMAP_DAYS);
    // Four logged days in the window: 1850 good, 2050 good, 1200 under,
    // plus the February day at 2600 over.
    assert_eq!(dashboard.heatmap_stats.logged, 4);
    assert_eq!(dashboard.heatmap_stats.on_track, 2);
    assert_eq!(dashboard.heatmap_stats.under, 1);
    assert_eq!(dashboard.heatmap_stats.over, 1);

    assert_eq!(dashboard.selected_meals.len(), 3);
    assert_eq!(dashboard.daily_totals.calories, 2050.0);

    let split = dashboard.macro_split;
    let sum = split.protein + split.carbs + split.fat;
    assert!((99..=101).contains(&sum), "split sums to {}", sum);
}

#[test]
fn derived_bundle_serializes_with_dashboard_keys() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    let record = UserRecord {
        history: vec![meal("2024-06-10", 1900.0, 120.0, 180.0, 60.0)],
        ..UserRecord::default()
    };
    let dashboard = derive_dashboard(&record, TimeRange::All, None, today);

    let value = serde_json::to_value(&dashboard).unwrap();
    assert!(value.get("chartData").is_some());
    assert!(value.get("weightData").is_some());
    assert!(value.get("heatmapData").is_some());
    assert!(value.get("macroComparisonData").is_some());
    assert_eq!(value["chartData"][0]["p"], 120.0);
    assert_eq!(value["heatmapStats"]["total"], 1);
    assert_eq!(value["dailyTotals"]["cal"], 0.0);
}

#[tokio::test]
async fn fetch_record_for_connected_user() {
    let Some(user_id) = connected_user_id() else {
        eprintln!("skipping fetch_record_for_connected_user: MACROTRACK_USER_ID not set");
        return;
    };
    let _ = env_logger::builder().is_test(true).try_init();

    let client = MacroTrackClient::new();
    let record = client.fetch_record(&user_id).await.unwrap();
    let dashboard = client
        .fetch_dashboard(&user_id, TimeRange::Days(30), None)
        .await
        .unwrap();

    assert_eq!(dashboard.heatmap_data.len(), HEATMAP_DAYS);
    assert!(dashboard.chart_data.len() <= record.history.len().max(1));
}

#[tokio::test]
async fn fetch_unknown_user_is_not_found() {
    if connected_user_id().is_none() {
        eprintln!("skipping fetch_unknown_user_is_not_found: MACROTRACK_USER_ID not set");
        return;
    }

    let client = MacroTrackClient::new();
    let err = client
        .fetch_record("no-such-user-id-000000")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn pairing_session_can_be_created_and_released() {
    if connected_user_id().is_none() {
        eprintln!("skipping pairing_session_can_be_created_and_released: MACROTRACK_USER_ID not set");
        return;
    }
    let _ = env_logger::builder().is_test(true).try_init();

    let client = MacroTrackClient::new();
    let session = PairingSession::begin(&client.store).await.unwrap();
    assert_eq!(session.session_id().len(), 13);

    let mut watch = session.watch();
    // Nothing claims the session; the wait must time out without resolving.
    let resolved =
        tokio::time::timeout(Duration::from_secs(4), watch.wait_for_user()).await;
    assert!(resolved.is_err());

    watch.finish().await.unwrap();
}
