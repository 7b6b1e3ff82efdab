use jobhound_browser::{BrowserActions, BrowserEngine, Locator, ReplayDriver};
use jobhound_core::BrowserConfig;

fn headless() -> BrowserConfig {
    BrowserConfig {
        headless: true,
        ..BrowserConfig::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_engine_creation() {
    let engine = BrowserEngine::new(&headless()).await;
    assert!(engine.is_ok(), "Failed to create browser engine");
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_navigation_and_locators() {
    let engine = BrowserEngine::new(&headless()).await.unwrap();

    engine.navigate("https://example.com").await.unwrap();
    let heading = Locator::css("h1").first();
    engine.wait_visible(&heading, 5000).await.unwrap();
    assert_eq!(engine.text(&heading).await.unwrap(), "Example Domain");
    assert_eq!(engine.count(&Locator::css("p")).await.unwrap(), 2);
    assert!(engine.extent(&heading).await.unwrap() > 0.0);
    assert!(engine.viewport().await.unwrap().is_some());
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_navigation_throttled_not_rejected() {
    let engine = BrowserEngine::new(&headless()).await.unwrap();

    // Second navigation to the same domain waits its turn instead of failing
    assert!(engine.navigate("https://example.com").await.is_ok());
    let start = std::time::Instant::now();
    assert!(engine.navigate("https://example.com/").await.is_ok());
    assert!(start.elapsed().as_millis() >= 900);
}

#[tokio::test]
async fn test_replay_records_interactions() {
    let driver = ReplayDriver::new().with_page(
        "https://www.zhipin.com/",
        r#"<div class="job-list-container" data-extent="1800"><a class="job-name">x</a></div>"#,
    );
    driver.navigate("https://www.zhipin.com/web/geek/jobs").await.unwrap();

    let container = Locator::css(".job-list-container");
    driver.hover(&container).await.unwrap();
    let extent = driver.extent(&container).await.unwrap();
    driver.scroll(extent).await.unwrap();
    driver.move_pointer(200.0, 300.0).await.unwrap();

    assert_eq!(extent, 1800.0);
    assert_eq!(driver.navigations(), vec!["https://www.zhipin.com/web/geek/jobs"]);
    assert_eq!(driver.hovers(), vec![".job-list-container"]);
    assert_eq!(driver.scrolls(), vec![1800.0]);
    assert_eq!(driver.pointer_moves(), vec![(200.0, 300.0)]);
}
