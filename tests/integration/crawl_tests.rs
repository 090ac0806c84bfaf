//! Integration tests for the mirroring engine
//!
//! These tests use wiremock to serve small sites and check the full
//! crawl, rewrite and save cycle end-to-end.

use scraper::{Html, Selector};
use site_mirror::config::{HttpConfig, PoolConfig};
use site_mirror::site::SiteAssets;
use site_mirror::storage::{SqliteTaskStore, TaskStore};
use site_mirror::{crawl, CrawlConfig, JobSummary, ReplacementRule, TaskManager, TaskStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves an HTML page that must be fetched exactly `times` times
async fn mount_page(server: &MockServer, p: &str, html: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_asset(server: &MockServer, p: &str, body: &[u8], content_type: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.to_vec())
                .insert_header("content-type", content_type),
        )
        .expect(times)
        .mount(server)
        .await;
}

fn config(server: &MockServer) -> CrawlConfig {
    let mut config = CrawlConfig::new(server.uri());
    config.output_name = Some("site".to_string());
    config
}

async fn run(config: CrawlConfig, out: &TempDir) -> JobSummary {
    crawl(config, out.path(), &HttpConfig::default(), SiteAssets::default())
        .await
        .expect("crawl should succeed")
}

/// Host directory of the mock server inside a job's output
fn site_dir(summary: &JobSummary) -> PathBuf {
    summary.output_directory.join("127.0.0.1")
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
}

fn attr(html: &str, selector: &str, name: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(name))
        .map(str::to_string)
}

const HOME: &str = r#"<html><head><title>Home</title>
<link rel="stylesheet" href="/css/site.css"></head>
<body><a id="about" href="/about">About</a> <a id="news" href="/news/">News</a></body></html>"#;

#[tokio::test]
async fn test_mirror_small_site_downloads_shared_assets_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/", HOME, 1).await;
    mount_page(
        &server,
        "/about",
        r#"<html><head><link rel="stylesheet" href="/css/site.css"></head>
        <body><a href="/">Home</a> <a href="/news/">News</a></body></html>"#,
        1,
    )
    .await;
    mount_page(
        &server,
        "/news/",
        r#"<html><head><link rel="stylesheet" href="../css/site.css"></head>
        <body><a href="/about">About</a></body></html>"#,
        1,
    )
    .await;
    mount_asset(
        &server,
        "/css/site.css",
        b"body{background:url(../img/bg.png)}",
        "text/css",
        1,
    )
    .await;
    mount_asset(&server, "/img/bg.png", &[0x89, b'P', b'N', b'G'], "image/png", 1).await;

    let out = TempDir::new().unwrap();
    let mut config = config(&server);
    config.max_depth = 2;
    let summary = run(config, &out).await;

    assert_eq!(summary.pages_downloaded, 3);
    assert_eq!(summary.assets_downloaded, 2);
    assert!(summary.errors.is_empty(), "unexpected errors: {:?}", summary.errors);

    let site = site_dir(&summary);
    let home = read(&site.join("index.html"));
    assert_eq!(attr(&home, "#about", "href").unwrap(), "about.html");
    assert_eq!(attr(&home, "#news", "href").unwrap(), "news/");
    assert_eq!(attr(&home, "link[rel=stylesheet]", "href").unwrap(), "css/site.css");

    let news = read(&site.join("news").join("index.html"));
    assert_eq!(attr(&news, "link[rel=stylesheet]", "href").unwrap(), "../css/site.css");

    assert!(site.join("about.html").exists());
    assert_eq!(read(&site.join("css").join("site.css")), "body{background:url('../img/bg.png')}");
    assert!(site.join("img").join("bg.png").exists());
    assert!(site.join("favicon.ico").exists());
}

#[tokio::test]
async fn test_missing_page_is_skipped_silently() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/gone">Gone</a></body></html>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let summary = run(config(&server), &out).await;

    assert_eq!(summary.pages_downloaded, 1);
    assert!(summary.errors.is_empty());
    assert!(!site_dir(&summary).join("gone.html").exists());
}

#[tokio::test]
async fn test_max_depth_zero_only_fetches_start_page() {
    let server = MockServer::start().await;
    mount_page(&server, "/", HOME, 1).await;
    mount_page(&server, "/about", "<html><body>about</body></html>", 0).await;
    mount_page(&server, "/news/", "<html><body>news</body></html>", 0).await;
    mount_asset(&server, "/css/site.css", b"body{}", "text/css", 1).await;

    let out = TempDir::new().unwrap();
    let mut config = config(&server);
    config.max_depth = 0;
    let summary = run(config, &out).await;

    assert_eq!(summary.pages_downloaded, 1);
    assert_eq!(summary.saved_pages, vec![format!("{}/", server.uri())]);
}

#[tokio::test]
async fn test_max_pages_bounds_the_crawl() {
    let server = MockServer::start().await;
    mount_page(&server, "/", HOME, 1).await;
    mount_page(&server, "/about", "<html><body>about</body></html>", 0).await;
    mount_page(&server, "/news/", "<html><body>news</body></html>", 0).await;
    mount_asset(&server, "/css/site.css", b"body{}", "text/css", 1).await;

    let out = TempDir::new().unwrap();
    let mut config = config(&server);
    config.max_pages = 1;
    let summary = run(config, &out).await;

    assert_eq!(summary.pages_downloaded, 1);
    assert!(!site_dir(&summary).join("about.html").exists());
}

#[tokio::test]
async fn test_debug_only_home_stops_after_first_page() {
    let server = MockServer::start().await;
    mount_page(&server, "/", HOME, 1).await;
    mount_page(&server, "/about", "<html><body>about</body></html>", 0).await;
    mount_page(&server, "/news/", "<html><body>news</body></html>", 0).await;
    mount_asset(&server, "/css/site.css", b"body{}", "text/css", 1).await;

    let out = TempDir::new().unwrap();
    let mut config = config(&server);
    config.debug_only_home = true;
    let summary = run(config, &out).await;

    assert_eq!(summary.pages_downloaded, 1);
    assert!(site_dir(&summary).join("sitemap.xml").exists());
}

#[tokio::test]
async fn test_cross_domain_anchor_points_to_root() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
        <a id="away" href="https://elsewhere.example/page">Elsewhere</a>
        <a id="mail" href="mailto:info@example.com">Mail</a>
        </body></html>"#,
        1,
    )
    .await;

    let out = TempDir::new().unwrap();
    let summary = run(config(&server), &out).await;

    let home = read(&site_dir(&summary).join("index.html"));
    assert_eq!(attr(&home, "#away", "href").unwrap(), "/");
    assert_eq!(attr(&home, "#mail", "href").unwrap(), "mailto:info@example.com");
    assert_eq!(summary.pages_downloaded, 1);
}

#[tokio::test]
async fn test_sitemap_lists_saved_pages() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/about">About</a> <a href="/news/">News</a></body></html>"#,
        1,
    )
    .await;
    mount_page(&server, "/about", "<html><body>about</body></html>", 1).await;
    mount_page(&server, "/news/", "<html><body>news</body></html>", 1).await;

    let out = TempDir::new().unwrap();
    let mut config = config(&server);
    config.sitemap_domain = Some("https://mirror.example/".to_string());
    let summary = run(config, &out).await;

    let sitemap = read(&site_dir(&summary).join("sitemap.xml"));
    let locs: Vec<&str> = sitemap
        .lines()
        .filter_map(|l| l.trim().strip_prefix("<loc>"))
        .filter_map(|l| l.strip_suffix("</loc>"))
        .collect();
    assert_eq!(
        locs,
        vec![
            "https://mirror.example/",
            "https://mirror.example/about",
            "https://mirror.example/news/"
        ]
    );

    let home = read(&site_dir(&summary).join("index.html"));
    assert!(home.contains(r#"<a href="/sitemap.xml">Sitemap</a>"#));
}

#[tokio::test]
async fn test_replacement_rules_apply_to_pages_and_stylesheets() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><head><title>Acme Corp</title><link rel="stylesheet" href="/site.css"></head>
        <body><p id="who">Welcome to Acme Corp</p></body></html>"#,
        1,
    )
    .await;
    mount_asset(
        &server,
        "/site.css",
        b"/* Acme Corp theme */ p{color:red}",
        "text/css",
        1,
    )
    .await;

    let out = TempDir::new().unwrap();
    let mut config = config(&server);
    config.title_suffix = Some("Archive".to_string());
    config.replace_rules = vec![ReplacementRule::new("Acme Corp", "Mirror Inc")];
    let summary = run(config, &out).await;

    let site = site_dir(&summary);
    let home = read(&site.join("index.html"));
    assert!(home.contains("Welcome to Mirror Inc"));
    assert!(home.contains("<title>Mirror Inc-Archive</title>"));
    assert!(!home.contains("Acme Corp"));
    assert_eq!(read(&site.join("site.css")), "/* Mirror Inc theme */ p{color:red}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_task_manager_runs_jobs_and_records_history() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<html><body>home</body></html>", 2).await;

    let out = TempDir::new().unwrap();
    let store = Arc::new(SqliteTaskStore::new(&out.path().join("history.db")).unwrap());
    let pool = PoolConfig {
        workers: 2,
        queue_capacity: 4,
    };
    let manager = TaskManager::start(
        &pool,
        out.path().join("mirrors"),
        HttpConfig::default(),
        SiteAssets::default(),
        store.clone(),
    )
    .unwrap();

    let mut first = config(&server);
    first.output_name = Some("first".to_string());
    let mut second = config(&server);
    second.output_name = Some("second".to_string());
    let ids = vec![manager.submit(first).unwrap(), manager.submit(second).unwrap()];

    for _ in 0..200 {
        if manager.list().iter().all(|t| t.status.is_terminal()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    for id in &ids {
        let task = manager.get(id).unwrap();
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.summary.unwrap().pages_downloaded, 1);
    }
    assert!(out.path().join("mirrors").join("first").join("127.0.0.1").join("index.html").exists());
    assert!(out.path().join("mirrors").join("second").join("127.0.0.1").join("index.html").exists());

    let history = store.recent(10).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|t| t.status == TaskStatus::Succeeded));

    tokio::task::spawn_blocking(move || manager.shutdown()).await.unwrap();
}
