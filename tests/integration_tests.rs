use anyhow::Result;
use chrono::{Duration, Local};
use httpmock::prelude::*;
use roster_etl::app::run_enrichment;
use roster_etl::config::toml_config::EnrichSettings;
use roster_etl::config::Credentials;
use roster_etl::{EtlEngine, EtlError, IdExtractor, LocalStorage};
use secrecy::SecretString;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn path_str(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

fn credentials() -> Credentials {
    Credentials {
        client_id: "client_abc".to_string(),
        client_secret: SecretString::from("secret_xyz".to_string()),
    }
}

fn settings_for(server: &MockServer, temp_dir: &TempDir) -> EnrichSettings {
    let mut settings = EnrichSettings::default();
    settings.api.base_url = server.url("/v1");
    settings.api.token_url = server.url("/oauth2/token");
    settings.files.input = path_str(&temp_dir.path().join("OSU-Events-Users.csv"));
    settings.files.output = path_str(&temp_dir.path().join("out/output.csv"));
    settings.usage.usage_dir = Some(path_str(&temp_dir.path().join("usage")));
    settings
}

fn mock_degrees(server: &MockServer, id: &str, degrees: serde_json::Value) {
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/v1/students/{}/degrees", id))
            .query_param("term", "current")
            .header("authorization", "Bearer live_token");
        then.status(200).json_body(json!({ "data": degrees }));
    });
}

fn mock_classification(server: &MockServer, id: &str, classification: &str) {
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/v1/students/{}/classification", id))
            .header("authorization", "Bearer live_token");
        then.status(200).json_body(json!({
            "data": {"id": id, "attributes": {"classification": classification}}
        }));
    });
}

#[tokio::test]
async fn test_extract_ids_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("student_ids.json");
    let output = temp_dir.path().join("OSU-Events-Users.csv");
    std::fs::write(
        &input,
        r#"{"data":[{"STUDENT_ID":"111"},{"STUDENT_ID":"222"}]}"#,
    )?;

    let extractor = IdExtractor::new(LocalStorage::current_dir(), path_str(&input), path_str(&output));
    let written = EtlEngine::new(extractor).run().await?;

    assert_eq!(written, path_str(&output));
    let csv = std::fs::read_to_string(&output)?;
    assert_eq!(csv.lines().collect::<Vec<_>>(), vec!["STUDENT_ID", "111", "222"]);
    Ok(())
}

#[tokio::test]
async fn test_enrichment_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    let token_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/oauth2/token")
            .body_contains("grant_type=client_credentials")
            .body_contains("client_id=client_abc");
        then.status(200).json_body(json!({"access_token": "live_token"}));
    });

    // 111: engineering graduate
    mock_degrees(
        &server,
        "111",
        json!([{"attributes": {"college": "College of Engineering", "degree": "BS CS"}}]),
    );
    mock_classification(&server, "111", "Determine from Student Type");

    // 222: neither engineering nor honors
    mock_degrees(
        &server,
        "222",
        json!([{"attributes": {"college": "College of Business", "degree": "BS Finance"}}]),
    );
    let skipped_classification = server.mock(|when, then| {
        when.method(GET).path("/v1/students/222/classification");
        then.status(200).json_body(json!({"data": {"attributes": {"classification": "Junior"}}}));
    });

    // 333: API failure
    server.mock(|when, then| {
        when.method(GET).path("/v1/students/333/degrees");
        then.status(500);
    });

    // 444: engineering and honors in two colleges
    mock_degrees(
        &server,
        "444",
        json!([
            {"attributes": {"college": "College of Engineering", "degree": "BS ME"}},
            {"attributes": {"college": "Honors College", "degree": "Honors Baccalaureate"}}
        ]),
    );
    mock_classification(&server, "444", "Junior");

    let settings = settings_for(&server, &temp_dir);
    std::fs::write(&settings.files.input, "111\n222\n\n333\n  444  \n")?;

    let usage_dir = temp_dir.path().join("usage");
    std::fs::create_dir_all(&usage_dir)?;
    let today = Local::now().date_naive();
    for (offset, ids) in [(0, json!(["111", "444"])), (1, json!(["111", "111"])), (95, json!(["444"]))] {
        let date = (today - Duration::days(offset)).format("%Y-%m-%d").to_string();
        std::fs::write(
            usage_dir.join(format!("{}.json", date)),
            json!({ "openedIDs": ids }).to_string(),
        )?;
    }

    let output = run_enrichment(&settings, &credentials(), None, false).await?;

    token_mock.assert();
    skipped_classification.assert_hits(0);
    assert_eq!(output, settings.files.output);

    let csv = std::fs::read_to_string(&settings.files.output)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "STUDENT_ID,CLASSIFICATION,PRIMARY_COLLEGE,SECONDARY_COLLEGE,HC_OR_COE,USAGE_OVER_LAST_90_DAYS",
            "111,Graduate,College of Engineering,N/A,COE,2",
            "444,Junior,College of Engineering,Honors College,Both,1",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_token_failure_is_fatal() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/oauth2/token");
        then.status(401).json_body(json!({"error": "invalid_client"}));
    });
    let degrees_mock = server.mock(|when, then| {
        when.method(GET).path_contains("/degrees");
        then.status(200).json_body(json!({"data": []}));
    });

    let settings = settings_for(&server, &temp_dir);
    std::fs::write(&settings.files.input, "111\n")?;

    let err = run_enrichment(&settings, &credentials(), None, false)
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::AuthError { .. }));
    assert_ne!(err.exit_code(), 0);
    degrees_mock.assert_hits(0);
    assert!(!Path::new(&settings.files.output).exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_input_file_aborts_after_token() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/oauth2/token");
        then.status(200).json_body(json!({"access_token": "live_token"}));
    });

    let settings = settings_for(&server, &temp_dir);
    let err = run_enrichment(&settings, &credentials(), None, false)
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::IoError(_)));
    Ok(())
}
