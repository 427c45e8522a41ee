use std::time::Duration;

use feed_history::{
    Element, HostPage, InMemoryPage, InMemoryStorage, InitOutcome, ReadyState, Selector,
    PANEL_ROOT_ID,
};
use tokio::time::{sleep, Instant};

use crate::support::boot;

#[tokio::test(start_paused = true)]
async fn every_entry_point_funnels_into_one_init() {
    let page = InMemoryPage::from_body_html(r#"<div id="app"></div>"#);
    let boot = boot(&page, &InMemoryStorage::new());

    let (ready, load, fallback) = tokio::join!(
        boot.on_document_ready(),
        boot.on_window_load(),
        boot.on_delayed_fallback()
    );
    let outcomes = [ready.unwrap(), load.unwrap(), fallback.unwrap()];
    let initialized = outcomes
        .iter()
        .filter(|outcome| **outcome == InitOutcome::Initialized)
        .count();
    assert_eq!(initialized, 1);
    assert_eq!(page.observer_count(), 1);
    assert_eq!(page.find_all(&Selector::id(PANEL_ROOT_ID)).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn attach_retries_until_a_container_appears() {
    let page = InMemoryPage::blank();
    let boot = boot(&page, &InMemoryStorage::new());
    let start = Instant::now();

    let (outcome, ()) = tokio::join!(boot.initialize(), async {
        sleep(Duration::from_millis(3500)).await;
        page.append_child(
            &Selector::tag("html"),
            Element::new("body").with_child(Element::new("div").with_attr("id", "app")),
        )
        .unwrap();
    });

    assert_eq!(outcome.unwrap(), InitOutcome::Initialized);
    assert!(boot.watcher().is_attached());
    assert_eq!(start.elapsed(), Duration::from_secs(4));
    assert!(page.has_element_with_id(PANEL_ROOT_ID));
}

#[tokio::test(start_paused = true)]
async fn run_waits_for_the_document_to_stop_loading() {
    let page = InMemoryPage::from_body_html(r#"<div id="app"></div>"#);
    page.set_ready_state(ReadyState::Loading);
    let boot = boot(&page, &InMemoryStorage::new());
    let start = Instant::now();

    let (outcome, ()) = tokio::join!(boot.run(), async {
        sleep(Duration::from_millis(2500)).await;
        page.set_ready_state(ReadyState::Interactive);
    });

    assert_eq!(outcome.unwrap(), InitOutcome::Initialized);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn run_on_a_parsed_document_uses_the_delayed_fallback() {
    let page = InMemoryPage::from_body_html(r#"<div id="i_cecream"></div>"#);
    let boot = boot(&page, &InMemoryStorage::new());
    let start = Instant::now();

    assert_eq!(boot.run().await.unwrap(), InitOutcome::Initialized);
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn fallback_waits_longer_without_a_site_container() {
    let page = InMemoryPage::new();
    let boot = boot(&page, &InMemoryStorage::new());
    let start = Instant::now();

    assert_eq!(boot.on_delayed_fallback().await.unwrap(), InitOutcome::Initialized);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
    assert!(boot.watcher().is_attached());
}

#[tokio::test(start_paused = true)]
async fn window_load_is_the_last_resort() {
    let page = InMemoryPage::from_body_html(r#"<main></main>"#);
    let boot = boot(&page, &InMemoryStorage::new());
    let start = Instant::now();

    assert_eq!(boot.on_window_load().await.unwrap(), InitOutcome::Initialized);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn visibility_change_places_a_late_refresh_control_button() {
    let page = InMemoryPage::from_body_html(r#"<div id="app"></div>"#);
    let boot = boot(&page, &InMemoryStorage::new());
    boot.initialize().await.unwrap();
    boot.watcher().detach().unwrap();

    // the control shows up while nobody is watching
    page.append_child(
        &Selector::id("app"),
        Element::new("div").with_child(Element::new("span").with_attr("class", "btn-random")),
    )
    .unwrap();
    assert!(!page.has_element_with_id(feed_history::HISTORY_BUTTON_ID));

    assert!(boot.on_visibility_change(true).await.unwrap());
    assert!(page.has_element_with_id(feed_history::HISTORY_BUTTON_ID));
}
