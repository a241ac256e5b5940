mod common;

use chrono::NaiveDate;
use serde_json::json;

use common::{MockBackend, Reply};
use npi_outreach::{
    error::ApiError,
    filter::FilterCriteria,
    recipients::RecipientSet,
    registry::{export_csv, save_export},
    view::RegistryView,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(npi: &str, phone: &str, city: &str, updated: &str) -> serde_json::Value {
    json!({
        "npi": npi,
        "firstName": "Ada",
        "lastName": "Byron",
        "city": city,
        "state": "LA",
        "phone": phone,
        "updatedAt": updated,
    })
}

#[tokio::test]
async fn third_ui_page_requests_api_page_three_with_bearer() {
    let mock = MockBackend::default();
    mock.json(
        "/get-npi-data",
        json!({
            "data": [
                row("1000000001", "3374278230", "Lafayette", "2026-10-13T09:00:00Z"),
                row("1000000002", "3374278231", "Lafayette", "2026-10-14T09:00:00Z"),
                row("1000000003", "3374278232", "Lafayette", "2026-10-15T09:00:00Z"),
            ],
            "total": 3
        }),
    );
    let client = mock.client(Some("tok")).await;

    let mut view = RegistryView::new(FilterCriteria::for_week_of(day(2026, 10, 15)));
    view.set_page(2);
    view.load(&client).await.unwrap();

    let requests = mock.requests_to("/get-npi-data");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.query["page"], "3");
    assert_eq!(request.query["limit"], "25");
    assert_eq!(request.query["startDate"], "2026-10-12");
    assert_eq!(request.query["endDate"], "2026-10-18");
    assert_eq!(request.bearer.as_deref(), Some("tok"));

    assert_eq!(view.visible_rows().len(), 3);
    assert_eq!(view.page_count(), 1);
}

#[tokio::test]
async fn location_filter_pulls_everything_and_paginates_locally() {
    let mock = MockBackend::default();
    let rows: Vec<_> = (0..12)
        .map(|i| {
            let city = if i % 2 == 0 { "Lafayette" } else { "Eunice" };
            row(&format!("20000000{i:02}"), "3374278230", city, "2026-10-14")
        })
        .collect();
    mock.json("/get-npi-data/filter-data", json!(rows));
    let client = mock.client(None).await;

    let mut view = RegistryView::new(FilterCriteria {
        city: "Lafayette".into(),
        ..FilterCriteria::for_week_of(day(2026, 10, 15))
    });
    view.set_rows_per_page(10).unwrap();
    view.set_page(0);
    view.load(&client).await.unwrap();

    assert!(mock.requests_to("/get-npi-data").is_empty());
    let request = &mock.requests_to("/get-npi-data/filter-data")[0];
    assert_eq!(request.query["city"], "Lafayette");
    assert_eq!(request.bearer, None);

    assert_eq!(view.total(), 6);
    assert_eq!(view.rows().len(), 6);
    assert_eq!(view.page_count(), 1);
}

#[tokio::test]
async fn export_is_always_named_npi_data_csv() {
    let mock = MockBackend::default();
    mock.reply(
        "/get-npi-data/export-csv",
        Reply::Csv("npi,phone\n1000000001,3374278230\n".into()),
    );
    let client = mock.client(Some("tok")).await;
    let dir = tempfile::tempdir().unwrap();

    let bytes = export_csv(&client, Some(day(2026, 10, 1)), None).await.unwrap();
    let path = save_export(&bytes, dir.path()).unwrap();

    assert_eq!(path.file_name().unwrap(), "npi-data.csv");
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "npi,phone\n1000000001,3374278230\n"
    );
    let request = &mock.requests_to("/get-npi-data/export-csv")[0];
    assert_eq!(request.query["startDate"], "2026-10-01");
    assert_eq!(request.query["endDate"], "");
}

#[tokio::test]
async fn backend_error_message_is_surfaced() {
    let mock = MockBackend::default();
    mock.reply(
        "/get-npi-data",
        Reply::Json(
            axum::http::StatusCode::UNAUTHORIZED,
            json!({"message": "Token expired"}),
        ),
    );
    let client = mock.client(Some("old")).await;

    let mut view = RegistryView::new(FilterCriteria::for_week_of(day(2026, 10, 15)));
    let err = view.load(&client).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { .. }));
    assert_eq!(err.user_message(), "Token expired");
    assert_eq!(view.total(), 0);
}

#[tokio::test]
async fn collecting_all_filtered_skips_messaged_rows_and_landlines() {
    let mock = MockBackend::default();
    mock.json(
        "/get-npi-data/filter-data",
        json!([
            row("1", "(337) 427-8230", "Lafayette", "2026-10-14"),
            {"npi": "2", "phone": 3374278231u64, "messageSent": true},
            row("3", "212-555-0100", "Lafayette", "2026-10-14"),
            {"npi": "4"},
            row("5", "337.427.8230", "Lafayette", "2026-10-14"),
            row("6", "555-01", "Lafayette", "2026-10-14"),
        ]),
    );
    let client = mock.client(None).await;

    let mut set = RecipientSet::new();
    let report = set
        .collect_all_filtered(
            &client,
            &FilterCriteria {
                state: "LA".into(),
                ..FilterCriteria::for_week_of(day(2026, 10, 15))
            },
        )
        .await
        .unwrap();

    assert_eq!(set.phones(), vec!["3374278230".to_string()]);
    assert_eq!(report.added, 1);
    assert_eq!(report.landlines, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.invalid, 1);
}
