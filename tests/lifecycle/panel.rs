use feed_history::{
    ElementLike, InMemoryPage, InMemoryStorage, PanelAction, Selector, HISTORY_BUTTON_ID,
};
use serde_json::json;

use crate::support::{boot, card};

#[tokio::test(start_paused = true)]
async fn panel_shows_what_the_feed_dropped() {
    let page = InMemoryPage::from_body_html(r#"<div id="app"><div class="feed"></div></div>"#);
    let storage = InMemoryStorage::new();
    let boot = boot(&page, &storage);
    boot.initialize().await.unwrap();

    page.replace_children(&Selector::class("feed"), vec![card("BV1"), card("BV2")])
        .unwrap();
    page.replace_children(&Selector::class("feed"), vec![card("BV3")]).unwrap();

    let action = PanelAction::from_control(HISTORY_BUTTON_ID, None).unwrap();
    let view = boot.panel().dispatch(action).unwrap();
    assert!(view.visible);
    let ids: Vec<&str> = view.items.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["card_BV2", "card_BV1"]);

    let rendered = page.find(&Selector::class("fh-card")).unwrap();
    assert_eq!(rendered.get_attribute("data-id"), Some("card_BV2"));
    assert!(rendered
        .descendants_and_self()
        .iter()
        .all(|el| !el.has_attribute("onclick")));
}

#[tokio::test(start_paused = true)]
async fn panel_rerenders_are_never_captured() {
    // no site container: the watcher falls back to body, where the panel lives
    let page = InMemoryPage::new();
    let storage = InMemoryStorage::new();
    let boot = boot(&page, &storage);
    boot.initialize().await.unwrap();
    assert!(boot.watcher().is_attached());

    page.append_child(&Selector::tag("body"), card("BV1")).unwrap();
    page.remove_matching(&Selector::class("feed-card")).unwrap();
    assert_eq!(boot.store().len().unwrap(), 1);

    for _ in 0..3 {
        boot.panel().dispatch(PanelAction::Toggle).unwrap();
    }
    assert_eq!(boot.store().len().unwrap(), 1);
    assert_eq!(boot.watcher().totals().duplicates, 0);
}

#[tokio::test(start_paused = true)]
async fn limit_and_clear_from_the_panel_reach_storage() {
    let page = InMemoryPage::from_body_html(r#"<div id="app"><div class="feed"></div></div>"#);
    let storage = InMemoryStorage::new();
    let boot = boot(&page, &storage);
    boot.initialize().await.unwrap();

    page.replace_children(
        &Selector::class("feed"),
        vec![card("BV1"), card("BV2"), card("BV3")],
    )
    .unwrap();
    page.replace_children(&Selector::class("feed"), Vec::new()).unwrap();

    let view = boot.panel().dispatch(PanelAction::SetLimit("2".into())).unwrap();
    assert_eq!(view.count, 2);
    boot.store().flush().await;
    assert_eq!(storage.peek("feedHistoryLimit").unwrap(), Some(json!("2")));

    let view = boot.panel().dispatch(PanelAction::SetLimit("two".into())).unwrap();
    assert_eq!(view.limit_input, "2");
    boot.store().flush().await;
    assert_eq!(storage.peek("feedHistoryLimit").unwrap(), Some(json!("2")));

    boot.panel().dispatch(PanelAction::ClearAll).unwrap();
    boot.store().flush().await;
    assert_eq!(storage.peek("feedHistory").unwrap(), Some(json!([])));
    assert_eq!(page.prompts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn history_survives_a_reload() {
    let storage = InMemoryStorage::new();
    {
        let page = InMemoryPage::from_body_html(r#"<div id="app"></div>"#);
        let boot = boot(&page, &storage);
        boot.initialize().await.unwrap();
        page.append_child(&Selector::id("app"), card("BV1")).unwrap();
        page.remove_matching(&Selector::class("feed-card")).unwrap();
        boot.teardown().await.unwrap();
    }

    let page = InMemoryPage::from_body_html(r#"<div id="app"></div>"#);
    let boot = boot(&page, &storage);
    boot.initialize().await.unwrap();
    let view = boot.panel().view().unwrap();
    assert_eq!(view.count, 1);
    assert_eq!(view.items[0].id, "card_BV1");
}
