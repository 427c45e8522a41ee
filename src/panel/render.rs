use chrono::{DateTime, Local, Utc};

use crate::dom::{Element, Node};
use crate::settings::Theme;
use crate::watcher::INJECTED_MARKER;

use super::PANEL_ROOT_ID;

pub const TOGGLE_ID: &str = "fh-toggle";
pub const CONTENT_ID: &str = "fh-content";
pub const CLOSE_ID: &str = "fh-close";
pub const THEME_ID: &str = "fh-theme";
pub const COUNT_ID: &str = "fh-count";
pub const LIMIT_INPUT_ID: &str = "fh-limit-input";
pub const LIMIT_APPLY_ID: &str = "fh-limit-apply";
pub const REFRESH_ID: &str = "fh-refresh";
pub const CLEAR_ID: &str = "fh-clear";
pub const NOTICE_ID: &str = "fh-notice";
pub const VIDEOS_ID: &str = "fh-videos";

const EMPTY_MESSAGE: &str = "暂无历史记录";

/// Everything the panel shows, read from the store at render time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelView {
    pub visible: bool,
    pub theme: Theme,
    pub count: usize,
    /// Text currently in the limit field.
    pub limit_input: String,
    pub notice: Option<String>,
    /// Newest first.
    pub items: Vec<PanelItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelItem {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    /// Sanitized again at render time.
    pub content: Vec<Node>,
}

pub fn render_panel(view: &PanelView) -> Element {
    Element::new("div")
        .with_attr("id", PANEL_ROOT_ID)
        .with_attr("class", format!("fh-theme-{}", view.theme))
        .with_attr(INJECTED_MARKER, "panel")
        .with_child(Element::new("style").with_text(PANEL_CSS))
        .with_child(
            Element::new("div")
                .with_attr("id", TOGGLE_ID)
                .with_attr("title", "显示/隐藏历史推荐")
                .with_text("🕒 历史"),
        )
        .with_child(render_content(view))
}

fn render_content(view: &PanelView) -> Element {
    let display = if view.visible { "display: block;" } else { "display: none;" };
    let mut content = Element::new("div")
        .with_attr("id", CONTENT_ID)
        .with_attr("style", display)
        .with_child(render_header(view.theme))
        .with_child(
            Element::new("div")
                .with_attr("id", "fh-stats")
                .with_text("已保存 ")
                .with_child(Element::new("span").with_attr("id", COUNT_ID).with_text(view.count.to_string()))
                .with_text(" 个视频"),
        )
        .with_child(render_controls(&view.limit_input));

    if let Some(notice) = &view.notice {
        content.append_child(Element::new("div").with_attr("id", NOTICE_ID).with_text(notice.as_str()));
    }

    let mut videos = Element::new("div").with_attr("id", VIDEOS_ID);
    if view.items.is_empty() {
        videos.append_child(Element::new("p").with_attr("class", "fh-empty").with_text(EMPTY_MESSAGE));
    }
    for item in &view.items {
        videos.append_child(render_item(item));
    }
    content.with_child(videos)
}

fn render_header(theme: Theme) -> Element {
    let theme_label = match theme {
        Theme::Light => "🌙",
        Theme::Dark => "☀",
    };
    Element::new("div")
        .with_attr("class", "fh-header")
        .with_child(Element::new("h3").with_text("B站推荐历史"))
        .with_child(
            Element::new("button")
                .with_attr("id", THEME_ID)
                .with_attr("type", "button")
                .with_attr("title", "切换主题")
                .with_text(theme_label),
        )
        .with_child(
            Element::new("span")
                .with_attr("id", CLOSE_ID)
                .with_attr("title", "关闭")
                .with_text("×"),
        )
}

fn render_controls(limit_input: &str) -> Element {
    Element::new("div")
        .with_attr("class", "fh-controls")
        .with_child(
            Element::new("label")
                .with_attr("for", LIMIT_INPUT_ID)
                .with_text("保留上限"),
        )
        .with_child(
            Element::new("input")
                .with_attr("id", LIMIT_INPUT_ID)
                .with_attr("type", "number")
                .with_attr("min", "1")
                .with_attr("max", "99999")
                .with_attr("value", limit_input),
        )
        .with_child(button(LIMIT_APPLY_ID, "保存"))
        .with_child(button(REFRESH_ID, "刷新"))
        .with_child(button(CLEAR_ID, "清空"))
}

fn button(id: &str, label: &str) -> Element {
    Element::new("button")
        .with_attr("id", id)
        .with_attr("type", "button")
        .with_text(label)
}

fn render_item(item: &PanelItem) -> Element {
    let captured = item
        .captured_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    Element::new("div")
        .with_attr("class", "fh-card")
        .with_attr(INJECTED_MARKER, "item")
        .with_attr("data-id", item.id.as_str())
        .with_child(Element::new("div").with_attr("class", "fh-item-header").with_text(captured))
        .with_children(item.content.iter().cloned())
}

const PANEL_CSS: &str = "
#bilibili-feed-history-panel { position: fixed; left: 20px; top: 20px; width: 300px; z-index: 99999; }
#fh-toggle { width: 120px; height: 40px; background-color: #fb7299; color: white; display: flex;
  justify-content: center; align-items: center; font-size: 14px; cursor: pointer; border-radius: 4px;
  box-shadow: 0 4px 12px rgba(0,0,0,0.3); font-weight: bold; }
#fh-content { background: white; border: 2px solid #fb7299; border-radius: 8px; margin-top: 10px;
  padding: 15px; max-height: 60vh; overflow-y: auto; box-shadow: 0 4px 20px rgba(0,0,0,0.2); }
.fh-header { display: flex; justify-content: space-between; align-items: center; margin-bottom: 10px;
  padding-bottom: 5px; border-bottom: 1px solid #eee; }
.fh-header h3 { margin: 0; font-size: 16px; color: #fb7299; }
#fh-close { font-size: 24px; cursor: pointer; color: #999; }
#fh-stats { color: #666; font-size: 14px; margin-bottom: 10px; padding: 5px; background: #f9f9f9; border-radius: 4px; }
.fh-controls { display: flex; gap: 6px; align-items: center; margin-bottom: 10px; font-size: 12px; }
.fh-controls input { width: 70px; }
#fh-notice { color: #d33; font-size: 12px; margin-bottom: 8px; }
#fh-videos { max-height: 50vh; overflow-y: auto; }
.fh-card { margin-bottom: 10px; border: 1px solid #eee; border-radius: 4px; overflow: hidden; }
.fh-item-header { background: #f5f5f5; padding: 5px; font-size: 12px; color: #666; }
.fh-theme-dark #fh-content { background: #1f1f1f; color: #ddd; border-color: #d4567a; }
.fh-theme-dark #fh-stats, .fh-theme-dark .fh-item-header { background: #2a2a2a; color: #aaa; }
.fh-theme-dark .fh-card { border-color: #333; }
";
