// End-to-end crawls against a mock site

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use web2md_scanner::{
    CrawlConfig, Crawler, HttpMediaFetcher, HttpRenderer, MediaOptions, PageOutcome,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

// ============================================================================
// Helpers
// ============================================================================

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!("<html><body><main>{}</main></body></html>", body)),
        )
        .mount(server)
        .await;
}

async fn mount_untouched(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string("<main>never</main>"))
        .expect(0)
        .mount(server)
        .await;
}

fn crawler(config: CrawlConfig) -> Crawler {
    let renderer = HttpRenderer::new(Duration::from_secs(5), false).unwrap();
    let fetcher = HttpMediaFetcher::new(Duration::from_secs(5), false).unwrap();
    Crawler::new(config, Arc::new(renderer), Arc::new(fetcher))
}

fn target(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

// ============================================================================
// Traversal
// ============================================================================

#[tokio::test]
async fn test_crawl_writes_markdown_with_local_links() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/docs/home",
        r#"<h1>Home</h1><p>Read the <a href="/docs/guide">guide</a>.</p>"#,
    )
    .await;
    mount_page(&server, "/docs/guide", "<h1>Guide</h1><p>Steps</p>").await;

    let temp_dir = TempDir::new().unwrap();
    let summary = crawler(CrawlConfig::new(temp_dir.path()))
        .crawl(&target(&server, "/docs/home"))
        .await
        .unwrap();

    assert_eq!(summary.saved, 2);
    assert_eq!(summary.base_url, format!("{}/docs/", server.uri()));

    let home = std::fs::read_to_string(temp_dir.path().join("home.md")).unwrap();
    assert!(home.contains("# Home"));
    assert!(home.contains("[guide](guide.md)"));

    let guide = std::fs::read_to_string(temp_dir.path().join("guide.md")).unwrap();
    assert!(guide.contains("# Guide"));
}

#[tokio::test]
async fn test_depth_limit_bounds_the_crawl() {
    let server = MockServer::start().await;
    mount_page(&server, "/docs/home", r#"<a href="/docs/home/a">a</a>"#).await;
    mount_page(&server, "/docs/home/a", r#"<a href="/docs/home/a/b">b</a>"#).await;
    mount_untouched(&server, "/docs/home/a/b").await;

    let temp_dir = TempDir::new().unwrap();
    let summary = crawler(CrawlConfig::new(temp_dir.path()).with_max_depth(2))
        .crawl(&target(&server, "/docs/home"))
        .await
        .unwrap();

    assert_eq!(summary.saved, 2);
    assert!(temp_dir.path().join("home.md").exists());
    assert!(temp_dir.path().join("home_a.md").exists());
    assert!(!temp_dir.path().join("home_a_b.md").exists());
}

#[tokio::test]
async fn test_page_reachable_from_two_parents_is_fetched_once() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/docs/home",
        r#"<a href="/docs/one">one</a><a href="/docs/two">two</a>"#,
    )
    .await;
    mount_page(&server, "/docs/one", r#"<a href="/docs/shared#top">shared</a>"#).await;
    mount_page(&server, "/docs/two", r#"<a href="/docs/shared">shared</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/shared"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<main>shared</main>"))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let summary = crawler(CrawlConfig::new(temp_dir.path()).with_workers(3))
        .crawl(&target(&server, "/docs/home"))
        .await
        .unwrap();

    assert_eq!(summary.saved, 4);
    assert_eq!(summary.pages.len(), 4);
}

#[tokio::test]
async fn test_out_of_scope_and_excluded_links_are_not_fetched() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/docs/home",
        r#"<a href="/blog/post">blog</a><a href="/docs/manual.PDF">pdf</a><a href="mailto:a@b.test">mail</a>"#,
    )
    .await;
    mount_untouched(&server, "/blog/post").await;
    mount_untouched(&server, "/docs/manual.PDF").await;

    let temp_dir = TempDir::new().unwrap();
    let summary = crawler(CrawlConfig::new(temp_dir.path()))
        .crawl(&target(&server, "/docs/home"))
        .await
        .unwrap();

    assert_eq!(summary.pages.len(), 1);

    // Links the crawl will not follow are left as authored
    let home = std::fs::read_to_string(temp_dir.path().join("home.md")).unwrap();
    assert!(home.contains("[blog](/blog/post)"));
}

#[tokio::test]
async fn test_max_count_stops_saving() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/docs/home",
        r#"<a href="/docs/a">a</a><a href="/docs/b">b</a>"#,
    )
    .await;
    mount_page(&server, "/docs/a", "<p>a</p>").await;
    mount_untouched(&server, "/docs/b").await;

    let temp_dir = TempDir::new().unwrap();
    let summary = crawler(CrawlConfig::new(temp_dir.path()).with_max_count(2))
        .crawl(&target(&server, "/docs/home"))
        .await
        .unwrap();

    assert_eq!(summary.saved, 2);
    assert!(!temp_dir.path().join("b.md").exists());
}

#[tokio::test]
async fn test_missing_page_fails_without_stopping_siblings() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/docs/home",
        r#"<a href="/docs/gone">gone</a><a href="/docs/ok">ok</a>"#,
    )
    .await;
    mount_page(&server, "/docs/ok", "<p>ok</p>").await;
    Mock::given(method("GET"))
        .and(path("/docs/gone"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let summary = crawler(CrawlConfig::new(temp_dir.path()))
        .crawl(&target(&server, "/docs/home"))
        .await
        .unwrap();

    assert_eq!(summary.saved, 2);
    assert_eq!(summary.count(PageOutcome::Failed), 1);
    assert!(temp_dir.path().join("ok.md").exists());
}

// ============================================================================
// Media
// ============================================================================

#[tokio::test]
async fn test_protocol_relative_data_src_is_downloaded() {
    let server = MockServer::start().await;
    let image = format!("//{}/assets/p.png", server.address());
    mount_page(
        &server,
        "/docs/home",
        &format!(r#"<h1>Pics</h1><img data-src="{}" alt="p">"#, image),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/assets/p.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let media = MediaOptions {
        images: true,
        videos: false,
    };
    let summary = crawler(CrawlConfig::new(temp_dir.path()).with_media(media))
        .crawl(&target(&server, "/docs/home"))
        .await
        .unwrap();

    assert_eq!(summary.media_saved(), 1);

    let images: Vec<_> = std::fs::read_dir(temp_dir.path().join("images"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(images.len(), 1);
    assert!(images[0].starts_with("p_"));
    assert!(images[0].ends_with(".png"));

    let home = std::fs::read_to_string(temp_dir.path().join("home.md")).unwrap();
    assert!(home.contains(&format!("images/{}", images[0])));
}

#[tokio::test]
async fn test_disallowed_media_extension_keeps_remote_url() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/docs/home",
        r#"<h1>Pics</h1><img src="/assets/diagram.tiff">"#,
    )
    .await;
    mount_untouched(&server, "/assets/diagram.tiff").await;

    let temp_dir = TempDir::new().unwrap();
    let media = MediaOptions {
        images: true,
        videos: true,
    };
    crawler(CrawlConfig::new(temp_dir.path()).with_media(media))
        .crawl(&target(&server, "/docs/home"))
        .await
        .unwrap();

    let home = std::fs::read_to_string(temp_dir.path().join("home.md")).unwrap();
    assert!(home.contains(&format!("{}/assets/diagram.tiff", server.uri())));
    assert!(!temp_dir.path().join("images").exists());
}

#[tokio::test]
async fn test_failed_media_download_degrades_to_remote_url() {
    let server = MockServer::start().await;
    mount_page(&server, "/docs/home", r#"<h1>Pics</h1><img src="/assets/missing.png">"#).await;
    Mock::given(method("GET"))
        .and(path("/assets/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let media = MediaOptions {
        images: true,
        videos: false,
    };
    let summary = crawler(CrawlConfig::new(temp_dir.path()).with_media(media))
        .crawl(&target(&server, "/docs/home"))
        .await
        .unwrap();

    assert_eq!(summary.saved, 1);
    assert_eq!(summary.media_saved(), 0);
    let home = std::fs::read_to_string(temp_dir.path().join("home.md")).unwrap();
    assert!(home.contains(&format!("{}/assets/missing.png", server.uri())));
}
