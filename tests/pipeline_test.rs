// End-to-end refresh cycle tests: URL build -> fetch -> extract -> render
// Uses mockito for the telemetry endpoint

use chrono::{TimeZone, Utc};
use mockito::{Matcher, Server, ServerGuard};
use reservoir_level_monitor::chart::{ChartSettings, ChartView, NoDataReason};
use reservoir_level_monitor::clock::UrlTemplate;
use reservoir_level_monitor::fetcher::TelemetryFetcher;
use reservoir_level_monitor::pipeline::{DashboardSnapshot, Pipeline};
use reservoir_level_monitor::scheduler;
use std::time::Duration;
use tokio::sync::watch;

const SAMPLE_PAYLOAD: &str = r#"{
    "medicoes": [
        {"data": "2025-03-07 08:00:00", "cotareal": "220.41", "cotajusante": "196.10", "vazao": {"afluente": 1200}},
        {"data": "2025-03-07 08:01:00", "cotareal": "N/D", "cotajusante": "196.11", "vazao": {"afluente": 1201}},
        {"data": "2025-03-07 08:02:00", "cotareal": "220.43", "cotajusante": "196.12", "vazao": {"afluente": 1202}}
    ]
}"#;

fn create_test_pipeline(server: &ServerGuard) -> Pipeline {
    Pipeline::new(
        TelemetryFetcher::new(),
        UrlTemplate {
            endpoint: format!("{}/lerMedicoes", server.url()),
            token: "test-token".to_string(),
            station_code: "1476".to_string(),
        },
        chrono_tz::America::Sao_Paulo,
        ChartSettings::default(),
    )
}

fn label_text(view: &ChartView) -> Option<String> {
    view.spec()?["layer"]
        .as_array()?
        .iter()
        .find(|layer| layer["mark"]["type"] == "text")
        .and_then(|layer| layer["data"]["values"][0]["rotulo"].as_str())
        .map(str::to_string)
}

#[tokio::test]
async fn test_cycle_renders_chart_for_station_date() {
    let mut server = Server::new_async().await;

    // 01:30 UTC on the 8th is still the 7th in Sao Paulo
    let now = Utc.with_ymd_and_hms(2025, 3, 8, 1, 30, 0).unwrap();

    let mock = server
        .mock("GET", Matcher::Regex(r"^/lerMedicoes".to_string()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("data".into(), "2025-03-07".into()),
            Matcher::UrlEncoded("token".into(), "test-token".into()),
            Matcher::UrlEncoded("codigo".into(), "1476".into()),
            Matcher::UrlEncoded("tipo".into(), "json".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SAMPLE_PAYLOAD)
        .create_async()
        .await;

    let snapshot = create_test_pipeline(&server).run_cycle_at(now).await;

    assert!(snapshot.has_data());
    assert_eq!(snapshot.source_date.as_deref(), Some("2025-03-07"));
    assert_eq!(snapshot.series.len(), 3);
    assert_eq!(snapshot.series.rows[1].montante, None);
    assert_eq!(snapshot.series.latest().unwrap().hora, "08:02");
    assert_eq!(label_text(&snapshot.view).as_deref(), Some("220.43"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_cycle_http_500_degrades_to_no_data() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", Matcher::Regex(r"^/lerMedicoes".to_string()))
        .with_status(500)
        .create_async()
        .await;

    let snapshot = create_test_pipeline(&server).run_cycle().await;

    assert!(!snapshot.has_data());
    assert!(snapshot.series.is_empty());
    assert_eq!(snapshot.view, ChartView::no_data(NoDataReason::FetchFailed));
    assert!(snapshot.refreshed_at.is_some());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_cycle_malformed_body_degrades_to_no_data() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", Matcher::Regex(r"^/lerMedicoes".to_string()))
        .with_status(200)
        .with_body("<html>manutenção</html>")
        .create_async()
        .await;

    let snapshot = create_test_pipeline(&server).run_cycle().await;

    assert_eq!(snapshot.view, ChartView::no_data(NoDataReason::FetchFailed));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cycle_empty_measurements() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", Matcher::Regex(r"^/lerMedicoes".to_string()))
        .with_status(200)
        .with_body(r#"{"medicoes": []}"#)
        .create_async()
        .await;

    let snapshot = create_test_pipeline(&server).run_cycle().await;

    assert!(snapshot.series.is_empty());
    match &snapshot.view {
        ChartView::NoData { reason, message } => {
            assert_eq!(*reason, NoDataReason::EmptyData);
            assert_eq!(message, "Nenhum dado disponível para exibir.");
        }
        other => panic!("Expected NoData view, got {:?}", other),
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_scheduler_publishes_first_cycle_immediately() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", Matcher::Regex(r"^/lerMedicoes".to_string()))
        .with_status(200)
        .with_body(SAMPLE_PAYLOAD)
        .expect_at_least(1)
        .create_async()
        .await;

    let (publisher, mut snapshots) = watch::channel(DashboardSnapshot::pending());
    let pipeline = create_test_pipeline(&server);

    let handle = tokio::spawn(async move {
        scheduler::start_refresh_scheduler(pipeline, publisher, Duration::from_secs(3600)).await;
    });

    tokio::time::timeout(Duration::from_secs(10), snapshots.changed())
        .await
        .expect("scheduler did not publish in time")
        .expect("scheduler dropped the publisher");

    let snapshot = snapshots.borrow().clone();
    assert!(snapshot.has_data());
    assert_eq!(snapshot.series.len(), 3);

    handle.abort();
}
