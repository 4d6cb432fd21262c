//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, with real history and output files
//! in a temporary directory.

use lodestone::config::Config;
use lodestone::output::{category_report_name, FileSink, ResultSink};
use lodestone::storage::{FileFingerprintLog, FingerprintLog};
use lodestone::{Category, Crawler, Deduplicator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const F1: &str = "AABBCCDDEEFF00112233445566778899AABBCCDD";

/// Creates a test configuration writing into `dir`
fn create_test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.workers = 3;
    config.crawler.request_delay_ms = 0;
    config.crawler.site_delay_ms = 0;
    config.crawler.fetch_timeout_secs = 2;
    config.crawler.poll_interval_ms = 50;

    let file = |name: &str| dir.join(name).display().to_string();
    config.output.history_path = file("history.txt");
    config.output.extra_history = vec![file("downloaded.txt")];
    config.output.new_links_path = file("new-links.txt");
    config.output.reports_dir = dir.display().to_string();
    config.output.database_path = file("lodestone.db");
    config.output.summary_path = file("summary.md");
    config
}

/// Wires history, deduplicator and file sink together the way the binary does
fn create_crawler(config: Config) -> Crawler {
    let extra: Vec<PathBuf> = config.output.extra_history.iter().map(PathBuf::from).collect();
    let history: Arc<dyn FingerprintLog> = Arc::new(
        FileFingerprintLog::open(Path::new(&config.output.history_path), &extra)
            .expect("history log should open"),
    );
    let dedup = Deduplicator::from_history(history.as_ref()).expect("history should load");
    let sink: Arc<dyn ResultSink> = Arc::new(
        FileSink::create(
            Path::new(&config.output.new_links_path),
            Arc::clone(&history),
            Path::new(&config.output.reports_dir),
        )
        .expect("sink should open"),
    );

    Crawler::new(config, Arc::new(dedup), sink).expect("crawler should build")
}

fn html_page(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            "<html><head><title>Test</title></head><body>{}</body></html>",
            body
        ))
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn magnet(fingerprint: &str, name: &str) -> String {
    format!(
        r#"<a href="magnet:?xt=urn:btih:{}&amp;dn={}&amp;tr=udp%3A%2F%2Ftracker.test%3A80">get</a>"#,
        fingerprint, name
    )
}

fn read_lines(path: &str) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn seed(server: &MockServer) -> Vec<Url> {
    vec![Url::parse(&server.uri()).unwrap()]
}

#[tokio::test]
async fn test_duplicate_fingerprints_accepted_once_and_scope_respected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let new_links = config.output.new_links_path.clone();
    let history = config.output.history_path.clone();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(format!(
            r#"{}{}<a href="/page2">next</a><a href="https://other.test/">elsewhere</a>"#,
            magnet(F1, "Some.Movie.1080p"),
            magnet(&F1.to_lowercase(), "Some.Movie.1080p.REPACK"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html_page("<p>nothing here</p>".to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let mut crawler = create_crawler(config);
    let summary = crawler.run(&seed(&server)).await.unwrap();

    let session = &summary.sessions[0];
    assert_eq!(session.pages_visited, 2);
    assert_eq!(session.identifiers_found, 1);
    assert_eq!(session.accepted, 1);
    assert_eq!(session.errors.total(), 0);
    assert!(!summary.interrupted);

    let emitted = read_lines(&new_links);
    assert_eq!(emitted.len(), 1);
    assert!(emitted[0].contains(F1));
    assert_eq!(read_lines(&history), emitted);

    let movies = Category::new("Movies");
    assert_eq!(summary.categories, vec![(movies.clone(), 1)]);
    let report = std::fs::read_to_string(dir.path().join(category_report_name(&movies))).unwrap();
    assert!(report.starts_with("# Category: Movies\n# Total links: 1\n"));
    assert!(report.contains(F1));
}

#[tokio::test]
async fn test_known_fingerprint_from_history_not_emitted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    std::fs::write(
        &config.output.history_path,
        format!("magnet:?xt=urn:btih:{}&dn=Old.Release\n", F1),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(magnet(&F1.to_lowercase(), "Old.Release")))
        .mount(&server)
        .await;

    let new_links = config.output.new_links_path.clone();
    let history = config.output.history_path.clone();
    let mut crawler = create_crawler(config);
    let summary = crawler.run(&seed(&server)).await.unwrap();

    assert_eq!(summary.total_accepted(), 0);
    assert_eq!(summary.sessions[0].already_known, 1);
    assert!(read_lines(&new_links).is_empty());
    assert_eq!(read_lines(&history).len(), 1);
    assert!(summary.categories.is_empty());
}

#[tokio::test]
async fn test_extra_history_counts_as_known() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    std::fs::write(
        &config.output.extra_history[0],
        format!("# downloaded by hand\nmagnet:?xt=urn:btih:{}\n", F1),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(magnet(F1, "Anything")))
        .mount(&server)
        .await;

    let mut crawler = create_crawler(config);
    let summary = crawler.run(&seed(&server)).await.unwrap();

    assert_eq!(summary.total_accepted(), 0);
    assert_eq!(summary.total_already_known(), 1);
}

#[tokio::test]
async fn test_robots_timeout_fails_open() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.fetch_timeout_secs = 1;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(magnet(F1, "Album.FLAC")))
        .expect(1)
        .mount(&server)
        .await;

    let mut crawler = create_crawler(config);
    let summary = crawler.run(&seed(&server)).await.unwrap();

    let session = &summary.sessions[0];
    assert!(session.robots_unavailable);
    assert_eq!(session.policy_denied, 0);
    assert_eq!(session.pages_visited, 1);
    assert_eq!(session.accepted, 1);
    assert_eq!(summary.robots_unavailable_sites().len(), 1);
}

#[tokio::test]
async fn test_robots_disallow_respected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /private/\n")
                .insert_header("content-type", "text/plain"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<a href="/private/list">hidden</a><a href="/public">open</a>"#.to_string(),
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(html_page(String::new()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private/list"))
        .respond_with(html_page(magnet(F1, "Secret")))
        .expect(0)
        .mount(&server)
        .await;

    let mut crawler = create_crawler(config);
    let summary = crawler.run(&seed(&server)).await.unwrap();

    let session = &summary.sessions[0];
    assert!(!session.robots_unavailable);
    assert_eq!(session.policy_denied, 1);
    assert_eq!(session.pages_visited, 2);
    assert_eq!(session.identifiers_found, 0);
}

#[tokio::test]
async fn test_crawl_delay_slows_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.workers = 1;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1\n"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(r#"<a href="/next">next</a>"#.to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html_page(String::new()))
        .mount(&server)
        .await;

    let mut crawler = create_crawler(config);
    let summary = crawler.run(&seed(&server)).await.unwrap();

    let session = &summary.sessions[0];
    assert_eq!(session.pages_visited, 2);
    assert!(session.elapsed_ms >= 2000);
}

#[tokio::test]
async fn test_fetch_errors_counted_by_class() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<a href="/gone">gone</a><a href="/broken">broken</a><a href="/feed">feed</a>"#
                .to_string(),
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<rss/>")
                .insert_header("content-type", "application/rss+xml"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut crawler = create_crawler(config);
    let summary = crawler.run(&seed(&server)).await.unwrap();

    let errors = summary.sessions[0].errors;
    assert_eq!(errors.http_status, 2);
    assert_eq!(errors.non_html, 1);
    assert_eq!(errors.timeout, 0);
    assert_eq!(summary.sessions[0].pages_visited, 4);
}

#[tokio::test]
async fn test_cyclic_site_terminates() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    for (page, links) in [
        ("/", r#"<a href="/a">a</a><a href="/b">b</a>"#),
        ("/a", r#"<a href="/b">b</a><a href="/">home</a><a href="/a?">self</a>"#),
        ("/b", r#"<a href="/a#top">a</a><a href="/">home</a>"#),
    ] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html_page(links.to_string()))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut crawler = create_crawler(config);
    let summary = tokio::time::timeout(Duration::from_secs(10), crawler.run(&seed(&server)))
        .await
        .expect("crawl of a finite site should terminate")
        .unwrap();

    assert_eq!(summary.sessions[0].pages_visited, 3);
    assert!(!summary.interrupted);
}

#[tokio::test]
async fn test_stop_interrupts_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.workers = 2;
    config.crawler.request_delay_ms = 200;

    let links: String = (0..100)
        .map(|i| format!(r#"<a href="/item/{}">{}</a>"#, i, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(links))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html_page(String::new()))
        .mount(&server)
        .await;

    let mut crawler = create_crawler(config);
    let stop = crawler.stop_signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(800)).await;
        stop.stop();
    });

    let summary = tokio::time::timeout(Duration::from_secs(10), crawler.run(&seed(&server)))
        .await
        .expect("stop should end the crawl promptly")
        .unwrap();

    assert!(summary.interrupted);
    assert!(summary.sessions[0].interrupted);
    assert!(summary.sessions[0].pages_visited < 100);
}

#[tokio::test]
async fn test_redirects_checked_before_each_hop() {
    let server = MockServer::start().await;
    let offsite = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let new_links = config.output.new_links_path.clone();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /members/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<a href="/mirror">mirror</a><a href="/login">login</a><a href="/latest">latest</a>"#
                .to_string(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mirror"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/files", offsite.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/members/home"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/members/home"))
        .respond_with(html_page(magnet(F1, "Members.Only")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/latest/today"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest/today"))
        .respond_with(html_page(magnet(
            "00112233445566778899AABBCCDDEEFF00112233",
            "Daily.Show",
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html_page(magnet(F1, "Offsite.Copy")))
        .expect(0)
        .mount(&offsite)
        .await;

    let mut crawler = create_crawler(config);
    let summary = crawler.run(&seed(&server)).await.unwrap();

    let session = &summary.sessions[0];
    assert_eq!(session.pages_visited, 4);
    assert_eq!(session.policy_denied, 1);
    assert_eq!(session.accepted, 1);
    assert!(offsite.received_requests().await.unwrap().is_empty());

    let lines = read_lines(&new_links);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("00112233445566778899AABBCCDDEEFF00112233"));
}
