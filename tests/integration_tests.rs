use anyhow::Result;
use httpmock::prelude::*;
use ip_batch_lookup::core::LookupRecord;
use ip_batch_lookup::{LookupEngine, LookupError, LookupSettings, RetryPolicy, TelegramNotifier};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn settings_for(server: &MockServer, input: PathBuf, output_dir: &Path) -> LookupSettings {
    let mut settings = LookupSettings::new(input);
    settings.api_endpoint = server.url("/json");
    settings.output_dir = output_dir.to_path_buf();
    settings.retry = RetryPolicy::default().with_base_delay(Duration::from_millis(5));
    settings
}

fn read_results(path: &Path) -> Vec<LookupRecord> {
    let bytes = std::fs::read(path).unwrap();
    let body = bytes.strip_prefix("\u{feff}".as_bytes()).unwrap_or(&bytes[..]);
    csv::Reader::from_reader(body)
        .deserialize()
        .collect::<std::result::Result<Vec<LookupRecord>, _>>()
        .unwrap()
}

fn mock_success<'a>(server: &'a MockServer, domain: &str, country: &str) -> httpmock::Mock<'a> {
    let path = format!("/json/{}", domain);
    let country = country.to_string();
    server.mock(move |when, then| {
        when.method(GET).path(path.as_str());
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "status": "success",
                "country": country,
                "isp": "Example ISP",
                "org": "Example Org",
                "as": "AS64500 Example"
            }));
    })
}

#[tokio::test]
async fn test_end_to_end_partial_success() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_input(&temp_dir, "domains.txt", "a.com\nhttps://b.com/landing\n");

    let server = MockServer::start();
    let a_mock = mock_success(&server, "a.com", "Netherlands");
    let b_mock = server.mock(|when, then| {
        when.method(GET).path("/json/b.com");
        then.status(200)
            .json_body(serde_json::json!({"status": "fail", "message": "private range"}));
    });

    let settings = settings_for(&server, input, &temp_dir.path().join("results"));
    let report = LookupEngine::new(settings).run().await?;

    a_mock.assert();
    b_mock.assert();
    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert!(report.output.starts_with(temp_dir.path().join("results")));

    let records = read_results(&report.output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].domain, "a.com");
    assert_eq!(records[0].country.as_deref(), Some("Netherlands"));
    assert_eq!(records[0].organization.as_deref(), Some("Example Org"));
    assert_eq!(records[0].as_number.as_deref(), Some("AS64500 Example"));
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_multiple_chunks_from_json() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let domains: Vec<String> = (0..7).map(|i| format!("site{}.org", i)).collect();
    let input = write_input(
        &temp_dir,
        "domains.json",
        &serde_json::json!({ "domains": domains }).to_string(),
    );

    let server = MockServer::start();
    let mocks: Vec<_> = domains
        .iter()
        .map(|domain| mock_success(&server, domain, "Germany"))
        .collect();

    let mut settings = settings_for(&server, input, temp_dir.path());
    settings.chunk_size = 3;
    settings.workers = 2;
    let report = LookupEngine::new(settings).run().await?;

    for mock in &mocks {
        mock.assert();
    }
    assert_eq!(report.chunks, 3);
    assert_eq!(report.succeeded, 7);
    assert_eq!(report.failed, 0);

    let mut stored: Vec<String> = read_results(&report.output)
        .into_iter()
        .map(|record| record.domain)
        .collect();
    stored.sort();
    assert_eq!(stored, domains);
    Ok(())
}

#[tokio::test]
async fn test_transient_failures_do_not_abort_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_input(&temp_dir, "domains.txt", "ok.com\ndown.com\nbroken.com\n");

    let server = MockServer::start();
    mock_success(&server, "ok.com", "France");
    let down_mock = server.mock(|when, then| {
        when.method(GET).path("/json/down.com");
        then.status(503);
    });
    server.mock(|when, then| {
        when.method(GET).path("/json/broken.com");
        then.status(200).body("not json");
    });

    let settings = settings_for(&server, input, temp_dir.path());
    let report = LookupEngine::new(settings).run().await?;

    down_mock.assert_hits(4);
    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(read_results(&report.output).len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_input_is_input_error() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    let settings = settings_for(&server, temp_dir.path().join("nope.txt"), temp_dir.path());
    let result = LookupEngine::new(settings).run().await;

    assert!(matches!(result, Err(LookupError::Input { .. })));
}

#[tokio::test]
async fn test_unsupported_input_aborts_before_lookups() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_input(&temp_dir, "domains.csv", "a.com\n");

    let server = MockServer::start();
    let api_mock = mock_success(&server, "a.com", "Spain");

    let settings = settings_for(&server, input, &temp_dir.path().join("results"));
    let result = LookupEngine::new(settings).run().await;

    assert!(matches!(result, Err(LookupError::Input { .. })));
    api_mock.assert_hits(0);
    assert!(!temp_dir.path().join("results").exists());
}

#[tokio::test]
async fn test_notifier_receives_summary_and_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_input(&temp_dir, "domains.txt", "a.com\n");

    let server = MockServer::start();
    mock_success(&server, "a.com", "Italy");
    let message_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/bottoken/sendMessage")
            .body_contains("Batch ip-lookup finished");
        then.status(200).json_body(serde_json::json!({"ok": true}));
    });
    let document_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/bottoken/sendDocument")
            .body_contains("a.com,Italy");
        then.status(200).json_body(serde_json::json!({"ok": true}));
    });

    let settings = settings_for(&server, input, temp_dir.path());
    let engine = LookupEngine::new(settings).with_notifier(Box::new(
        TelegramNotifier::with_api_base(&server.base_url(), "token", "42"),
    ));
    let report = engine.run().await?;

    message_mock.assert();
    document_mock.assert();
    assert_eq!(report.succeeded, 1);
    Ok(())
}

#[tokio::test]
async fn test_notification_failure_is_not_a_run_failure() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_input(&temp_dir, "domains.txt", "a.com\n");

    let server = MockServer::start();
    mock_success(&server, "a.com", "Italy");
    server.mock(|when, then| {
        when.method(POST).path_contains("/botdenied/");
        then.status(403);
    });

    let settings = settings_for(&server, input, temp_dir.path());
    let engine = LookupEngine::new(settings).with_notifier(Box::new(
        TelegramNotifier::with_api_base(&server.base_url(), "denied", "42"),
    ));

    let report = tokio_test::assert_ok!(engine.run().await);
    assert_eq!(report.total, 1);
}

#[tokio::test]
async fn test_exhausted_quota_delays_following_dispatch() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_input(&temp_dir, "domains.txt", "first.com\nsecond.com\n");

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/json/first.com");
        then.status(200)
            .header("X-Rl", "0")
            .header("X-Ttl", "5")
            .json_body(serde_json::json!({"status": "success", "country": "Japan"}));
    });
    let second_mock = mock_success(&server, "second.com", "Japan");

    let mut settings = settings_for(&server, input, temp_dir.path());
    settings.workers = 1;

    let started = Instant::now();
    let report = LookupEngine::new(settings).run().await?;

    second_mock.assert();
    assert_eq!(report.succeeded, 2);
    assert!(started.elapsed() >= Duration::from_secs(5));
    Ok(())
}
