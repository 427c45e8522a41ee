//! Host markup fixtures modelled on the live recommendation feed.

use std::sync::Arc;

use feed_history::dom::parse_fragment;
use feed_history::{
    Element, FeedHistoryConfig, HistoryStore, InMemoryPage, InMemoryStorage, MutationWatcher,
};

pub struct Feed {
    pub page: InMemoryPage,
    pub storage: InMemoryStorage,
    pub store: HistoryStore,
    pub watcher: MutationWatcher<InMemoryPage>,
}

impl Feed {
    /// A page with an empty `.feed-list` inside `#i_cecream`.
    pub fn new() -> Self {
        let page = InMemoryPage::from_body_html(
            r#"<div id="i_cecream"><div class="recommend-container">
                 <div class="feed-roll-btn"><button class="primary-btn roll-btn">换一换</button></div>
                 <div class="feed-list"></div>
               </div></div>"#,
        );
        let storage = InMemoryStorage::new();
        let config = Arc::new(FeedHistoryConfig::default());
        let store = HistoryStore::new(Arc::new(storage.clone()), &config);
        let watcher = MutationWatcher::new(page.clone(), store.clone(), config);
        Feed {
            page,
            storage,
            store,
            watcher,
        }
    }
}

/// One `.bili-video-card` the way the host renders it.
pub fn video_card(bvid: &str, title: &str) -> Element {
    let markup = format!(
        r#"<div class="bili-video-card is-rcmd" data-report="tianma.1-1-1">
             <div class="bili-video-card__wrap">
               <a href="https://www.bilibili.com/video/{bvid}/?spm_id_from=333.1007" target="_blank" onclick="report()">
                 <img src="//i0.hdslb.com/bfs/archive/{bvid}.jpg" onerror="fallback(this)">
               </a>
               <div class="bili-video-card__info">
                 <h3 class="bili-video-card__info--tit" title="{title}">{title}</h3>
                 <span class="bili-video-card__info--author">UP主</span>
               </div>
               <script>track("{bvid}")</script>
             </div>
           </div>"#
    );
    first_element(&markup)
}

pub fn first_element(markup: &str) -> Element {
    parse_fragment(markup)
        .into_iter()
        .find_map(|node| node.into_element())
        .expect("fixture markup has an element")
}
