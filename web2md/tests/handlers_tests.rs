use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use web2md::handlers::*;
use web2md::{command_argument_builder, derive_output_dir, extract_url_path};
use web2md_core::crawl::RendererKind;

fn matches(args: &[&str]) -> Result<clap::ArgMatches, clap::Error> {
    let mut argv = vec!["web2md"];
    argv.extend_from_slice(args);
    command_argument_builder().try_get_matches_from(argv)
}

#[test]
fn test_parse_target_url_accepts_http_and_https() {
    assert!(parse_target_url("https://example.com/docs/home").is_ok());
    assert!(parse_target_url("http://localhost:8080/guide").is_ok());
}

#[test]
fn test_parse_target_url_rejects_other_schemes() {
    assert!(parse_target_url("ftp://example.com/docs").is_err());
    assert!(parse_target_url("file:///etc/passwd").is_err());
}

#[test]
fn test_parse_target_url_rejects_garbage() {
    assert!(parse_target_url("not a valid url!!!").is_err());
    assert!(parse_target_url("example.com/docs").is_err());
}

#[test]
fn test_extract_url_path() {
    assert_eq!(
        extract_url_path("https://example.com/docs/home"),
        "/docs/home"
    );
    assert_eq!(extract_url_path("https://example.com/"), "/");
}

#[test]
fn test_resolve_output_dir_derives_from_target() {
    let target = Url::parse("https://example.com/docs/home").unwrap();
    let dir = resolve_output_dir(None, &target).unwrap();

    assert!(dir.is_absolute());
    assert_eq!(
        dir.file_name().unwrap().to_string_lossy(),
        derive_output_dir(&target)
    );
}

#[test]
fn test_resolve_output_dir_expands_tilde() {
    let target = Url::parse("https://example.com/docs/home").unwrap();
    let dir = resolve_output_dir(Some("~/mirror"), &target).unwrap();

    assert!(dir.is_absolute());
    assert!(!dir.to_string_lossy().contains('~'));
    assert!(dir.ends_with("mirror"));
}

#[test]
fn test_resolve_output_dir_keeps_absolute_path() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let target = Url::parse("https://example.com/docs/home").unwrap();
    let path = temp_dir.path().join("out");

    let dir = resolve_output_dir(Some(path.to_str().unwrap()), &target).unwrap();
    assert_eq!(dir, path);
}

#[test]
fn test_command_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let m = matches(&["https://example.com/docs/home", "/tmp/docs"])?;
    let options = build_crawl_options(&m)?;

    assert_eq!(options.target.as_str(), "https://example.com/docs/home");
    assert_eq!(options.output_dir, PathBuf::from("/tmp/docs"));
    assert_eq!(options.max_depth, 5);
    assert_eq!(options.max_count, 999);
    assert_eq!(options.workers, 1);
    assert!(!options.media.images);
    assert!(!options.media.videos);
    assert!(options.accept_invalid_certs);
    assert_eq!(options.renderer, RendererKind::Http);
    assert_eq!(options.render_timeout, Duration::from_secs(60));
    Ok(())
}

#[test]
fn test_command_flags() -> Result<(), Box<dyn std::error::Error>> {
    let m = matches(&[
        "https://example.com/docs/home",
        "/tmp/docs",
        "--depth",
        "2",
        "-c",
        "0",
        "--picture",
        "--video",
        "-w",
        "4",
        "-e",
        "/private/",
        "-e",
        r"\.json$",
        "--strict-tls",
        "--timeout",
        "15",
    ])?;
    let options = build_crawl_options(&m)?;

    assert_eq!(options.max_depth, 2);
    assert_eq!(options.max_count, 0);
    assert!(options.media.images);
    assert!(options.media.videos);
    assert_eq!(options.workers, 4);
    assert_eq!(options.exclude_patterns, vec!["/private/", r"\.json$"]);
    assert!(!options.accept_invalid_certs);
    assert_eq!(options.render_timeout, Duration::from_secs(15));
    Ok(())
}

#[test]
fn test_command_rejects_invalid_values() {
    assert!(matches(&[]).is_err());
    assert!(matches(&["ftp://example.com/docs"]).is_err());
    assert!(matches(&["https://example.com/docs", "--depth", "-1"]).is_err());
    assert!(matches(&["https://example.com/docs", "--count", "many"]).is_err());
    assert!(matches(&["https://example.com/docs", "--workers", "0"]).is_err());
    assert!(matches(&["https://example.com/docs", "--renderer", "lynx"]).is_err());
}

#[test]
fn test_banner_stays_off_stdout_for_json_and_quiet() -> Result<(), Box<dyn std::error::Error>> {
    let url = "https://example.com/docs/home";
    assert!(show_banner(&matches(&[url])?));
    assert!(show_banner(&matches(&[url, "-f", "text"])?));
    assert!(!show_banner(&matches(&[url, "-f", "json"])?));
    assert!(!show_banner(&matches(&[url, "--quiet"])?));
    Ok(())
}
