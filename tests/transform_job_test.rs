use anyhow::Result;
use chrono::NaiveDate;
use facility_pipeline::app::ports::ObjectStorePort;
use facility_pipeline::app::transform_use_case::TransformUseCase;
use facility_pipeline::clock::FixedClock;
use facility_pipeline::config::StorageConfig;
use facility_pipeline::infra::object_store::InMemoryObjectStore;
use std::sync::Arc;

const RAW_BUCKET: &str = "healthcare-facility";
const RAW_KEY: &str = "raw/sample_facility_data.json";
const OUT_KEY: &str = "transformed/expiring_facilities.json";

fn use_case_on(store: Arc<InMemoryObjectStore>, today: NaiveDate) -> TransformUseCase {
    TransformUseCase::new(
        store,
        Arc::new(FixedClock::at_date(today)),
        StorageConfig::default(),
    )
}

async fn seed_feed(store: &InMemoryObjectStore, feed: &str) -> Result<()> {
    store
        .put_object(RAW_BUCKET, RAW_KEY, feed.as_bytes().to_vec())
        .await?;
    Ok(())
}

async fn read_output(store: &InMemoryObjectStore) -> Result<serde_json::Value> {
    let bytes = store.get_object(RAW_BUCKET, OUT_KEY).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn test_transform_keeps_facilities_expiring_within_six_months() -> Result<()> {
    let store = Arc::new(InMemoryObjectStore::new());
    seed_feed(
        &store,
        r#"{"facility_name":"A","accreditations":[{"accreditation_body":"JCI","valid_until":"2024-01-01"}]}
{"facility_name":"B","accreditations":[{"accreditation_body":"DNV","valid_until":"2031-06-30"}]}
this line is not json
{"facility_name":"C","accreditations":[]}
{"facility_name":"D","accreditations":[{"valid_until":"not-a-date"},{"valid_until":"2023-09-15"}]}"#,
    )
    .await?;

    // Today 2023-08-01, so the cutoff lands on 2024-02-01.
    let today = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap();
    let summary = use_case_on(store.clone(), today).run().await;

    assert_eq!(summary.total_facilities, 4);
    assert_eq!(summary.expiring_facilities, 2);
    assert!(summary.errors.is_empty());

    let output = read_output(&store).await?;
    let names: Vec<&str> = output
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["facility_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["A", "D"]);
    Ok(())
}

#[tokio::test]
async fn test_transform_excludes_everything_outside_the_horizon() -> Result<()> {
    let store = Arc::new(InMemoryObjectStore::new());
    seed_feed(
        &store,
        r#"{"facility_name":"A","accreditations":[{"accreditation_body":"JCI","valid_until":"2024-01-01"}]}"#,
    )
    .await?;

    // Today 2023-01-01 puts the cutoff at 2023-07-01; A's expiry is past it.
    let today = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let summary = use_case_on(store.clone(), today).run().await;

    assert_eq!(summary.total_facilities, 1);
    assert_eq!(summary.expiring_facilities, 0);
    assert_eq!(read_output(&store).await?.as_array().unwrap().len(), 0);
    Ok(())
}

#[tokio::test]
async fn test_transform_overwrites_previous_output() -> Result<()> {
    let store = Arc::new(InMemoryObjectStore::new());
    let today = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap();

    seed_feed(
        &store,
        r#"{"facility_name":"A","accreditations":[{"valid_until":"2023-09-01"}]}
{"facility_name":"B","accreditations":[{"valid_until":"2023-10-01"}]}"#,
    )
    .await?;
    use_case_on(store.clone(), today).run().await;
    assert_eq!(read_output(&store).await?.as_array().unwrap().len(), 2);

    seed_feed(
        &store,
        r#"{"facility_name":"C","accreditations":[{"valid_until":"2023-11-01"}]}"#,
    )
    .await?;
    use_case_on(store.clone(), today).run().await;

    let output = read_output(&store).await?;
    assert_eq!(output.as_array().unwrap().len(), 1);
    assert_eq!(output[0]["facility_name"], "C");
    Ok(())
}

#[tokio::test]
async fn test_transform_survives_missing_input() -> Result<()> {
    let store = Arc::new(InMemoryObjectStore::new());
    let today = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap();

    let summary = use_case_on(store.clone(), today).run().await;

    assert_eq!(summary.total_facilities, 0);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(read_output(&store).await?.as_array().unwrap().len(), 0);
    Ok(())
}
