use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/"><channel>
  <title>Example News</title>
  <link>https://news.example.com/</link>
  <description>news</description>
  <item>
    <title>A story</title>
    <link>https://news.example.com/1</link>
    <description>A teaser.</description>
    <content:encoded>Story body that is long enough to produce an excerpt.</content:encoded>
    <pubDate>Mon, 04 Mar 2024 09:00:00 GMT</pubDate>
  </item>
</channel></rss>"#;

fn write_config(dir: &TempDir, feed_url: &str) -> std::path::PathBuf {
    let content = format!(
        r#"[general]
output_directory = "{out}"
cache_directory = "{cache}"

[[digests]]
name = "Example Daily"
output_formats = ["json", "rss"]

[[digests.sources]]
url = "{feed_url}"
"#,
        out = dir.path().join("output").display(),
        cache = dir.path().join(".cache").display(),
    );
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    path
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("feed-digest");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("output_directory"));
    assert!(content.contains("[[digests]]"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# existing").expect("write config");

    let mut cmd = cargo_bin_cmd!("feed-digest");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn run_fails_for_missing_config_file() {
    let mut cmd = cargo_bin_cmd!("feed-digest");
    cmd.args(["run", "--config", "/nonexistent/config.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_produces_digest_files_without_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir, &format!("{}/feed.xml", server.uri()));

    let mut cmd = cargo_bin_cmd!("feed-digest");
    cmd.env_remove("ANTHROPIC_API_KEY")
        .args(["run", "--config"])
        .arg(&config_path)
        .assert()
        .success();

    let output_dir = dir.path().join("output");
    assert!(output_dir.join("example_daily.json").exists());
    assert!(output_dir.join("example_daily.xml").exists());
    assert!(output_dir.join("index.html").exists());

    let json = fs::read_to_string(output_dir.join("example_daily.json")).expect("read json");
    let value: Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["title"], "Example Daily");
    // Without an API key summaries fall back to excerpts of the body.
    assert!(
        value["items"][0]["content_text"]
            .as_str()
            .expect("content_text")
            .contains("Story body")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn run_exits_with_2_when_nothing_is_produced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir, &format!("{}/feed.xml", server.uri()));

    // The filter matches no digest name, so no output is written.
    let mut cmd = cargo_bin_cmd!("feed-digest");
    let assert = cmd
        .env_remove("ANTHROPIC_API_KEY")
        .args(["run", "--digest", "No Such Digest", "--config"])
        .arg(&config_path)
        .assert();
    assert.code(2);
}
