//! Smoke tests against a live chromedriver. Run with a driver listening on
//! `WEBPILOT_WEBDRIVER_URL` (default localhost:9515):
//!
//! `cargo test -p webpilot-browser -- --ignored`

use std::time::Duration;
use tempfile::TempDir;
use webpilot_browser::{BrowserConfig, BrowserManager, ElementQuery};

fn config(profile: &TempDir) -> BrowserConfig {
    BrowserConfig {
        webdriver_url: std::env::var("WEBPILOT_WEBDRIVER_URL")
            .unwrap_or_else(|_| "http://localhost:9515".into()),
        user_data_dir: profile.path().to_path_buf(),
    }
}

#[tokio::test]
#[ignore]
async fn navigate_and_snapshot() {
    let profile = TempDir::new().unwrap();
    let browser = BrowserManager::launch(&config(&profile)).await.unwrap();

    let page = browser.active_page().await.unwrap();
    page.goto("https://example.com", Duration::from_secs(30))
        .await
        .unwrap();
    page.wait_for_ready(Duration::from_secs(10)).await.unwrap();

    let title = page.title().await.unwrap();
    assert!(title.contains("Example"));

    let snapshot = page.aria_snapshot().await.unwrap();
    assert!(snapshot.contains("heading"));

    let link = page.locator(ElementQuery::Role {
        role: "link".into(),
        name: Some("More information".into()),
    });
    assert!(link.count().await.unwrap() >= 1);

    browser.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn extra_tabs_are_closed() {
    let profile = TempDir::new().unwrap();
    let browser = BrowserManager::launch(&config(&profile)).await.unwrap();

    browser.new_page().await.unwrap();
    browser.new_page().await.unwrap();
    assert!(browser.pages().await.unwrap().len() >= 3);

    let closed = browser.close_extra_tabs().await.unwrap();
    assert!(closed >= 2);
    assert_eq!(browser.pages().await.unwrap().len(), 1);

    browser.close().await.unwrap();
}
