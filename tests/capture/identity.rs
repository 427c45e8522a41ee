use feed_history::resolve_identity;

use crate::support::{first_element, video_card};

#[test]
fn video_link_wins() {
    let card = video_card("BV1xy4y1z7AB", "anything");
    assert_eq!(resolve_identity(&card).as_deref(), Some("card_BV1xy4y1z7AB"));
}

#[test]
fn content_id_attribute_when_no_link() {
    let card = first_element(r#"<div class="feed-card" data-aid="170001"><h3>t</h3></div>"#);
    assert_eq!(resolve_identity(&card).as_deref(), Some("card_170001"));
}

#[test]
fn cover_image_path_when_no_link_or_aid() {
    let card = first_element(
        r#"<div class="feed-card"><img src="https://cdn.example/bvid/BV9zz?w=320"><h3>t</h3></div>"#,
    );
    assert_eq!(resolve_identity(&card).as_deref(), Some("card_BV9zz"));
}

#[test]
fn title_text_is_cleaned_and_truncated() {
    let card = first_element(
        r#"<div class="feed-card"><h3 class="video-title">【4K】Hello, world! A very long title that keeps going</h3></div>"#,
    );
    // first 30 chars, punctuation stripped
    assert_eq!(
        resolve_identity(&card).as_deref(),
        Some("card_4KHello world A very long")
    );
}

#[test]
fn uploader_when_title_missing() {
    let card = first_element(r#"<div class="feed-card"><span class="up-name">SomeUploader</span></div>"#);
    assert_eq!(resolve_identity(&card).as_deref(), Some("card_SomeUploader"));
}

#[test]
fn nothing_usable_is_unidentifiable() {
    let card = first_element(r#"<div class="feed-card"><div class="cover"></div></div>"#);
    assert_eq!(resolve_identity(&card), None);
}

#[test]
fn cjk_title_keeps_its_letters() {
    let card = first_element(
        r#"<div class="feed-card"><h3 class="video-title">【原神】新版本前瞻！</h3></div>"#,
    );
    // brackets and full-width punctuation go, the ideographs stay
    assert_eq!(resolve_identity(&card).as_deref(), Some("card_原神新版本前瞻"));
}

#[test]
fn punctuation_only_title_is_unidentifiable() {
    let card = first_element(
        r#"<div class="feed-card"><h3 class="video-title">【！？】</h3><span class="up-name">SomeUploader</span></div>"#,
    );
    assert_eq!(resolve_identity(&card), None);
}
