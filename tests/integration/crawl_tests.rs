//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the GitHub REST API and run the
//! full crawl cycle end-to-end, from repository source to CSV export.

use base64::{engine::general_purpose, Engine as _};
use bfile_scout::config::{
    resolve_config, ApiConfig, Config, CrawlerConfig, Credential, OutputConfig, ResolvedConfig,
    SourceConfig,
};
use bfile_scout::crawler::{crawl, CancelSignal, CrawlReport};
use bfile_scout::{DiagnosticKind, RepoState, ScoutError};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

/// Creates a resolved configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &Path, source: SourceConfig) -> ResolvedConfig {
    let config = Config {
        api: ApiConfig {
            base_url: base_url.to_string(),
            page_size: 2,
            ..ApiConfig::default()
        },
        crawler: CrawlerConfig {
            max_concurrent_repos: 2,
            max_retries: 2,
            backoff_base_ms: 10, // Very short for testing
            backoff_max_ms: 50,
            ..CrawlerConfig::default()
        },
        source: Some(source),
        output: OutputConfig {
            csv_path: dir.join("bfiles.csv"),
            utf8_bom: false,
            summary_path: Some(dir.join("summary.md")),
        },
    };

    resolve_config(config, None, Credential::new(TOKEN)).expect("config should be valid")
}

fn list_source(dir: &Path, repos: &[&str]) -> SourceConfig {
    let list = dir.join("repos.csv");
    let mut content = String::from("repo\n");
    for repo in repos {
        content.push_str(repo);
        content.push('\n');
    }
    std::fs::write(&list, content).expect("Failed to write repository list");

    SourceConfig::List {
        path: list,
        column: "repo".to_string(),
    }
}

fn file_item(base_url: &str, repo: &str, item_path: &str) -> serde_json::Value {
    let name = item_path.rsplit('/').next().unwrap_or(item_path);
    json!({
        "name": name,
        "path": item_path,
        "type": "file",
        "sha": "0000",
        "url": format!("{}/repos/{}/contents/{}?ref=main", base_url, repo, item_path),
    })
}

fn dir_item(base_url: &str, repo: &str, item_path: &str) -> serde_json::Value {
    let name = item_path.rsplit('/').next().unwrap_or(item_path);
    json!({
        "name": name,
        "path": item_path,
        "type": "dir",
        "sha": "0000",
        "url": format!("{}/repos/{}/contents/{}?ref=main", base_url, repo, item_path),
    })
}

fn file_body(text: &str) -> serde_json::Value {
    json!({
        "type": "file",
        "encoding": "base64",
        "content": general_purpose::STANDARD.encode(text),
    })
}

fn read_export(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("bfiles.csv")).expect("Failed to read export")
}

#[tokio::test]
async fn test_full_crawl_list_mode() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    // Root listing: one directory and one non-candidate file
    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            dir_item(&base_url, "org/app", "config"),
            file_item(&base_url, "org/app", "README.md"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents/config"))
        .and(query_param("ref", "main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            file_item(&base_url, "org/app", "config/bfile"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents/config/bfile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_body(
            "managed: true\nflavor: java\nenvironment:\n  - dev\n  - prod\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Non-candidate files are never fetched
    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents/README.md"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_body("# app")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, dir.path(), list_source(dir.path(), &["org/app"]));

    // Run the crawl
    let report = crawl(&config, CancelSignal::new())
        .await
        .expect("Crawl should succeed");

    assert_eq!(
        read_export(dir.path()),
        "repo,bfile_path,flavor,environments\norg/app,config/bfile,java,environments: dev-prod\n"
    );
    assert_eq!(report.rows.len(), 1);
    assert!(report.summary.diagnostics.is_empty());
    assert_eq!(report.summary.count(RepoState::Completed), 1);
    assert_eq!(report.summary.api_requests, 3);

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("**Rows Exported**: 1"));
}

#[tokio::test]
async fn test_org_mode_follows_pagination() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"full_name": "acme/api"},
            {"full_name": "acme/web"},
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"full_name": "acme/ops"},
        ])))
        .mount(&mock_server)
        .await;

    for repo in ["acme/api", "acme/web"] {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{}/contents", repo)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/repos/acme/ops/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            file_item(&base_url, "acme/ops", "BFILE"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/ops/contents/BFILE"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(file_body("managed: true\nenvironment: prod\n")),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &base_url,
        dir.path(),
        SourceConfig::Org {
            org: "acme".to_string(),
        },
    );

    let report = crawl(&config, CancelSignal::new())
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.summary.total_repositories, 3);
    assert_eq!(report.summary.count(RepoState::Completed), 3);
    assert_eq!(
        read_export(dir.path()),
        "repo,bfile_path,flavor,environments\nacme/ops,BFILE,,environments: prod\n"
    );
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    // First request is rate limited, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            file_item(&base_url, "org/app", "bfile"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents/bfile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_body(
            "managed: true\nflavor: python\n",
        )))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, dir.path(), list_source(dir.path(), &["org/app"]));

    let report = crawl(&config, CancelSignal::new())
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].flavor, "python");
    assert_eq!(report.summary.rate_limit_hits, 1);
    assert_eq!(report.summary.api_requests, 3);
}

/// Asserts the single repository of a run failed at its root listing
fn assert_root_failure(report: &CrawlReport) {
    assert!(report.rows.is_empty());
    assert_eq!(report.summary.count(RepoState::Failed), 1);
    assert_eq!(report.summary.diagnostics.len(), 1);
    assert_eq!(
        report.summary.diagnostics[0].kind,
        DiagnosticKind::RepositoryUnreachable
    );
}

#[tokio::test]
async fn test_retries_exhausted_fail_repository() {
    for status in [403u16, 429, 502] {
        let mock_server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        // max_retries = 2, so three attempts in total
        let mut response = ResponseTemplate::new(status);
        if status == 429 {
            response = response.insert_header("retry-after", "0");
        }
        Mock::given(method("GET"))
            .and(path("/repos/org/app/contents"))
            .respond_with(response)
            .expect(3)
            .mount(&mock_server)
            .await;

        let config = create_test_config(
            &mock_server.uri(),
            dir.path(),
            list_source(dir.path(), &["org/app"]),
        );

        let report = crawl(&config, CancelSignal::new())
            .await
            .expect("Crawl should succeed");

        assert_root_failure(&report);
        assert_eq!(report.summary.api_requests, 3, "HTTP {}", status);
        assert_eq!(read_export(dir.path()), "repo,bfile_path,flavor,environments\n");
    }
}

#[tokio::test]
async fn test_forbidden_without_rate_limit_headers_is_not_a_rate_limit() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &mock_server.uri(),
        dir.path(),
        list_source(dir.path(), &["org/app"]),
    );

    let report = crawl(&config, CancelSignal::new())
        .await
        .expect("Crawl should succeed");

    assert_root_failure(&report);
    assert_eq!(report.summary.rate_limit_hits, 0);
}

#[tokio::test]
async fn test_forbidden_with_exhausted_quota_is_a_rate_limit() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "0"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &mock_server.uri(),
        dir.path(),
        list_source(dir.path(), &["org/app"]),
    );

    let report = crawl(&config, CancelSignal::new())
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.summary.count(RepoState::Completed), 1);
    assert_eq!(report.summary.rate_limit_hits, 1);
    assert_eq!(report.summary.api_requests, 2);
}

#[tokio::test]
async fn test_slow_root_listing_times_out() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(
        &mock_server.uri(),
        dir.path(),
        list_source(dir.path(), &["org/app"]),
    );
    config.config.api.request_timeout_secs = 1;
    config.config.crawler.max_retries = 1;

    let report = crawl(&config, CancelSignal::new())
        .await
        .expect("Crawl should succeed");

    assert_root_failure(&report);
    assert_eq!(report.summary.api_requests, 2);
    assert!(report.summary.diagnostics[0].message.contains("Request timeout"));
}

#[tokio::test]
async fn test_unreachable_repository_is_isolated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/org/gone/contents"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            file_item(&base_url, "org/app", "bfile"),
        ])))
        .mount(&mock_server)
        .await;

    // A body the decoder rejects becomes a file-level diagnostic
    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents/bfile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "file",
            "encoding": "none",
            "content": "",
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &base_url,
        dir.path(),
        list_source(dir.path(), &["org/gone", "org/app"]),
    );

    let report = crawl(&config, CancelSignal::new())
        .await
        .expect("Crawl should succeed");

    assert!(report.rows.is_empty());
    assert_eq!(report.summary.count(RepoState::Failed), 1);
    assert_eq!(report.summary.count(RepoState::Completed), 1);

    let mut kinds: Vec<_> = report
        .summary
        .diagnostics
        .iter()
        .map(|d| (d.repository.to_string(), d.kind))
        .collect();
    kinds.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        kinds,
        vec![
            ("org/app".to_string(), DiagnosticKind::Decode),
            ("org/gone".to_string(), DiagnosticKind::RepositoryUnreachable),
        ]
    );
    assert_eq!(read_export(dir.path()), "repo,bfile_path,flavor,environments\n");
}

#[tokio::test]
async fn test_org_listing_failure_writes_header_only_export() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &mock_server.uri(),
        dir.path(),
        SourceConfig::Org {
            org: "acme".to_string(),
        },
    );

    let report = crawl(&config, CancelSignal::new())
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.summary.total_repositories, 0);
    assert_eq!(read_export(dir.path()), "repo,bfile_path,flavor,environments\n");
}

#[tokio::test]
async fn test_unreachable_api_is_fatal() {
    let dir = TempDir::new().unwrap();

    // Nothing listens on port 9
    let config = create_test_config(
        "http://127.0.0.1:9",
        dir.path(),
        SourceConfig::Org {
            org: "acme".to_string(),
        },
    );

    let result = crawl(&config, CancelSignal::new()).await;

    assert!(matches!(result, Err(ScoutError::Source(_))));
    assert!(!dir.path().join("bfiles.csv").exists());
}
