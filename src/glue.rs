//! Page behavior: menu, scroll effects, anchors, toasts, forms and mounts.

use crate::page::{Change, Element, Event, EventKind, Flow, Handle, Page, Scope};
use crate::share::{self, ShareContent};
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, rc::Rc};

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Warning,
    #[serde(other)]
    Info,
}

impl Level {
    fn bg_class(self) -> &'static str {
        match self {
            Level::Success => "bg-green-500",
            Level::Error => "bg-red-500",
            Level::Warning => "bg-yellow-500",
            Level::Info => "bg-blue-500",
        }
    }
}

/// A chart to mount into a container element.
#[derive(Debug, Clone)]
pub struct ChartMount {
    pub container: String,
    pub name: String,
}

/// What the page mounts besides its own behavior.
#[derive(Debug, Clone, Default)]
pub struct SiteContent {
    pub charts: Vec<ChartMount>,
    pub share: Option<ShareContent>,
}

pub const MENU_BUTTON_ID: &str = "mobile-menu-btn";
pub const MENU_ID: &str = "mobile-menu";
pub const BACKGROUND_ID: &str = "p5-container";
pub const SHARE_ID: &str = "share-buttons";

const SLIDE_OUT_CLASS: &str = "translate-x-full";
const TOAST_CLASSES: &str =
    "fixed top-4 right-4 z-50 p-4 rounded-lg shadow-lg transition-all duration-300 transform";

/// Wire up every behavior of the site, as done once the document has loaded.
pub fn init_site(page: &mut Page, content: &SiteContent) {
    init_mobile_menu(page);
    init_scroll_animations(page);
    for chart in &content.charts {
        mount_chart(page, chart);
    }
    mount_background(page);
    init_smooth_scrolling(page);
    init_nav_shadow(page);
    init_forms(page);
    if let Some(share) = &content.share {
        share::attach(page, SHARE_ID, share);
    }
}

pub fn init_mobile_menu(page: &mut Page) {
    let doc = page.document();
    let (Some(button), Some(menu)) = (doc.by_id(MENU_BUTTON_ID), doc.by_id(MENU_ID)) else {
        log::debug!("no mobile menu on this page");
        return;
    };
    page.add_listener(Some(button), EventKind::Click, move |scope, _| {
        scope.doc.toggle_class(menu, "hidden");
        Flow::Continue
    });
}

/// Reveal `animate-fade-in` elements the first time they scroll into view.
pub fn init_scroll_animations(page: &mut Page) {
    let observed = Rc::new(RefCell::new(page.document().by_class("animate-fade-in")));
    if observed.borrow().is_empty() {
        return;
    }

    for kind in [EventKind::Scroll, EventKind::Resize] {
        let observed = Rc::clone(&observed);
        page.add_listener(None, kind, move |scope, _| {
            reveal_visible(scope, &observed);
            Flow::Continue
        });
    }

    // Observation reports the initial state right away.
    reveal_visible(page.scope(), &observed);
}

fn reveal_visible(scope: &mut Scope, observed: &RefCell<Vec<Handle>>) {
    let margin = scope.settings.reveal_bottom_margin;
    let threshold = scope.settings.reveal_threshold;

    let revealed: Vec<Handle> = {
        let mut observed = observed.borrow_mut();
        let (revealed, waiting) = observed.iter().partition(|&&handle| {
            scope
                .doc
                .visible_ratio(handle, margin)
                .is_some_and(|ratio| ratio >= threshold)
        });
        *observed = waiting;
        revealed
    };

    for handle in revealed {
        scope.doc.add_class(handle, "visible");
        if scope.doc.has_class(handle, "card-hover") {
            stagger_cards(scope, handle);
        }
    }
}

fn stagger_cards(scope: &mut Scope, card: Handle) {
    let parent = scope.doc.get(card).and_then(|el| el.parent);
    let cards: Vec<Handle> = scope
        .doc
        .children(parent)
        .into_iter()
        .filter(|&handle| scope.doc.has_class(handle, "card-hover"))
        .collect();
    let step = scope.settings.stagger_step_s;

    scope.set_timeout(scope.settings.stagger_delay_ms, move |scope| {
        for (idx, &card) in cards.iter().enumerate() {
            let delay = (idx as f64 * step * 1000.0).round() / 1000.0;
            scope.doc.set_style(card, "animation-delay", &format!("{delay}s"));
        }
    });
}

/// Shadow under the navigation bar once the page is scrolled down.
pub fn init_nav_shadow(page: &mut Page) {
    let Some(&nav) = page.document().by_tag("nav").first() else {
        return;
    };
    page.add_listener(None, EventKind::Scroll, move |scope, _| {
        if scope.doc.scroll_y() > scope.settings.nav_shadow_offset {
            scope.doc.add_class(nav, "shadow-lg");
        } else {
            scope.doc.remove_class(nav, "shadow-lg");
        }
        Flow::Continue
    });
}

/// Turn in-page anchor jumps into smooth scrolls.
pub fn init_smooth_scrolling(page: &mut Page) {
    let anchors: Vec<(Handle, String)> = page
        .document()
        .iter()
        .filter(|(_, el)| el.tag == "a")
        .filter_map(|(handle, el)| {
            let href = el.href.as_deref()?;
            href.starts_with('#').then(|| (handle, href.to_string()))
        })
        .collect();

    for (anchor, href) in anchors {
        page.add_listener(Some(anchor), EventKind::Click, move |scope, _| {
            let target = href
                .strip_prefix('#')
                .filter(|id| !id.is_empty())
                .and_then(|id| scope.doc.by_id(id));
            match target {
                Some(target) => {
                    let top = scope.doc.get(target).map_or(0.0, |el| el.top);
                    scope.doc.request_scroll(top, true);
                    scope.queue_event(Event::Scroll);
                }
                None => log::warn!("no element for anchor {href:?}"),
            }
            Flow::PreventDefault
        });
    }
}

/// Show a toast that slides in, stays for a while and is then removed.
pub fn show_notification(scope: &mut Scope, message: &str, level: Level) {
    let toast = Element::new("div")
        .with_class(TOAST_CLASSES)
        .with_class(SLIDE_OUT_CLASS)
        .with_class(level.bg_class())
        .with_class("text-white")
        .with_text(message);
    let toast = scope.doc.append(toast);

    scope.set_timeout(scope.settings.toast_enter_ms, move |scope| {
        scope.doc.remove_class(toast, SLIDE_OUT_CLASS);
    });
    scope.set_timeout(scope.settings.toast_visible_ms, move |scope| {
        scope.doc.add_class(toast, SLIDE_OUT_CLASS);
        scope.set_timeout(scope.settings.toast_exit_ms, move |scope| {
            scope.doc.remove(toast);
        });
    });
}

/// Simulate submitting every form on the page.
pub fn init_forms(page: &mut Page) {
    let forms = page.document().by_tag("form");
    for form in forms {
        let button = page.document().iter().find_map(|(handle, el)| {
            let is_submit = el.tag == "button" && el.button_type.as_deref() == Some("submit");
            (is_submit && page.document().is_inside(handle, form)).then_some(handle)
        });

        page.add_listener(Some(form), EventKind::Submit, move |scope, _| {
            let Some(button) = button else {
                log::warn!("form has no submit button");
                return Flow::PreventDefault;
            };
            let Some(original) = scope.doc.get(button).map(|el| el.text.clone()) else {
                return Flow::PreventDefault;
            };
            if scope.doc.get(button).is_some_and(|el| el.disabled) {
                // Already submitting.
                return Flow::PreventDefault;
            }

            scope.doc.set_text(button, "Submitting...");
            scope.doc.set_disabled(button, true);

            scope.set_timeout(scope.settings.submit_delay_ms, move |scope| {
                scope.doc.set_text(button, &original);
                scope.doc.set_disabled(button, false);
                show_notification(scope, "Form submitted successfully!", Level::Success);
            });
            Flow::PreventDefault
        });
    }
}

pub fn mount_chart(page: &mut Page, chart: &ChartMount) {
    let Some(container) = page.document().by_id(&chart.container) else {
        log::debug!("no container {:?} for chart {:?}", chart.container, chart.name);
        return;
    };
    page.scope().doc.record(Change::ChartMounted {
        element: container,
        chart: chart.name.clone(),
    });
}

pub fn mount_background(page: &mut Page) {
    let Some(container) = page.document().by_id(BACKGROUND_ID) else {
        return;
    };
    page.scope()
        .doc
        .record(Change::BackgroundMounted { element: container });
}
