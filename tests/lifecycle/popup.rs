use std::sync::Arc;

use feed_history::{
    InMemoryPage, InMemoryStorage, PopupController, Selector, StorageKeys,
};

use crate::support::{boot, card};

#[tokio::test(start_paused = true)]
async fn popup_counts_what_the_page_captured_and_clears_it() {
    let page = InMemoryPage::from_body_html(r#"<div id="app"></div>"#);
    let storage = InMemoryStorage::new();
    let boot = boot(&page, &storage);
    boot.initialize().await.unwrap();
    page.append_child(&Selector::id("app"), card("BV1")).unwrap();
    page.append_child(&Selector::id("app"), card("BV2")).unwrap();
    page.remove_matching(&Selector::class("feed-card")).unwrap();

    boot.store().flush().await;

    let popup = PopupController::new(Arc::new(storage.clone()), &StorageKeys::default());
    assert_eq!(popup.view().await.count, 2);

    assert!(popup.clear_all(true).await.is_some());
    assert_eq!(popup.view().await.count, 0);

    // a fresh page starts from nothing
    let reloaded = InMemoryPage::from_body_html(r#"<div id="app"></div>"#);
    let next = crate::support::boot(&reloaded, &storage);
    next.initialize().await.unwrap();
    assert!(next.store().is_empty().unwrap());
}
