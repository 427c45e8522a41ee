use std::sync::Arc;

use feed_history::dom::parse_fragment;
use feed_history::{Bootstrap, Element, FeedHistoryConfig, InMemoryPage, InMemoryStorage};

pub fn boot(page: &InMemoryPage, storage: &InMemoryStorage) -> Bootstrap<InMemoryPage> {
    Bootstrap::new(
        page.clone(),
        Arc::new(storage.clone()),
        FeedHistoryConfig::default(),
    )
}

pub fn card(bvid: &str) -> Element {
    let markup = format!(
        r#"<div class="feed-card"><a href="/video/{bvid}" onclick="go()"><h3>{bvid}</h3></a></div>"#
    );
    parse_fragment(&markup)
        .into_iter()
        .find_map(|node| node.into_element())
        .expect("card markup")
}
