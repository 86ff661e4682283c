//! Social share buttons.

use crate::page::{Change, Element, EventKind, Flow, Page, Scope};
use std::rc::Rc;

/// What is being shared. Defaults come from the page when unset.
#[derive(Debug, Clone, Default)]
pub struct ShareContent {
    pub title: Option<String>,
    pub url: Option<String>,
}

const DEFAULT_TITLE: &str = "Global temperature change (1850-2024)";

type Action = Rc<dyn Fn(&mut Scope)>;

struct Platform {
    name: &'static str,
    action: Action,
}

fn platforms(title: &str) -> Vec<Platform> {
    let notice = |platform: &'static str| -> Action {
        let message = format!("Take a screenshot of \"{title}\" to share it on {platform}");
        Rc::new(move |scope: &mut Scope| {
            scope.doc.record(Change::Alert {
                message: message.clone(),
            })
        })
    };

    vec![
        Platform {
            name: "WeChat",
            action: notice("WeChat"),
        },
        Platform {
            name: "Douyin",
            action: notice("Douyin"),
        },
        Platform {
            name: "Xiaohongshu",
            action: notice("Xiaohongshu"),
        },
        Platform {
            name: "Bilibili",
            action: Rc::new(|scope: &mut Scope| {
                scope.doc.record(Change::WindowOpened {
                    url: "https://www.bilibili.com".to_string(),
                })
            }),
        },
    ]
}

/// Fill the container with one button per platform.
///
/// Each button's click handler owns its platform action.
pub fn attach(page: &mut Page, container_id: &str, content: &ShareContent) {
    let Some(container) = page.document().by_id(container_id) else {
        return;
    };
    let title = content.title.as_deref().unwrap_or(DEFAULT_TITLE);
    let url = content
        .url
        .clone()
        .unwrap_or_else(|| page.document().location().to_string());
    log::debug!("share buttons for {title:?} at {url}");

    let doc = &mut page.scope().doc;
    let row = doc.append(
        Element::new("div")
            .with_class("share-buttons flex items-center gap-3 mt-4")
            .with_parent(container),
    );
    doc.append(
        Element::new("span")
            .with_class("text-sm text-slate-500")
            .with_parent(row)
            .with_text("Share to:"),
    );

    for platform in platforms(title) {
        let button = page.scope().doc.append(
            Element::new("button")
                .with_class("share-btn w-8 h-8 flex items-center justify-center rounded-full")
                .with_parent(row)
                .with_text(platform.name),
        );
        let action = platform.action;
        page.add_listener(Some(button), EventKind::Click, move |scope, _| {
            action(scope);
            Flow::Continue
        });
    }
}
