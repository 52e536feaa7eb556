//! Accessibility rule engines.
//!
//! [`AuditEngine`] is the seam the crawler audits pages through. A browser-backed
//! engine (axe-core running in the page) plugs in here; [`StaticRuleEngine`] is
//! the built-in fallback that checks a handful of structural rules against the
//! fetched HTML. Rule ids, impacts and help links follow the axe-core catalogue
//! so reports read the same whichever engine produced them.

use crate::error::{Result, ScanError};
use crate::result::{Impact, LoadedPage, Violation};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

const HELP_BASE: &str = "https://dequeuniversity.com/rules/axe/4.10";

/// Input types that never need a visible label.
const UNLABELLED_INPUT_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

#[async_trait]
pub trait AuditEngine<P: Send + Sync>: Send + Sync {
    /// Run every rule against the page, returning violations in rule order.
    async fn audit(&self, page: &P) -> Result<Vec<Violation>>;
}

/// Structural checks evaluated directly on the served HTML.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticRuleEngine;

impl StaticRuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate all rules against an HTML document.
    pub fn audit_html(&self, html: &str) -> Vec<Violation> {
        let document = Html::parse_document(html);

        [
            check_image_alt(&document),
            check_html_lang(&document),
            check_document_title(&document),
            check_link_name(&document),
            check_button_name(&document),
            check_form_labels(&document),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[async_trait]
impl AuditEngine<LoadedPage> for StaticRuleEngine {
    async fn audit(&self, page: &LoadedPage) -> Result<Vec<Violation>> {
        if !page.is_html() {
            return Err(ScanError::ParseError(format!(
                "unsupported content type {}",
                page.content_type.as_deref().unwrap_or("(none)")
            )));
        }
        Ok(self.audit_html(&page.body))
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static IMG_WITH_ALT: LazyLock<Selector> = LazyLock::new(|| selector("img[alt]"));
static HTML: LazyLock<Selector> = LazyLock::new(|| selector("html"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static BUTTON: LazyLock<Selector> = LazyLock::new(|| selector("button"));
static LABEL_FOR: LazyLock<Selector> = LazyLock::new(|| selector("label[for]"));
static FORM_FIELD: LazyLock<Selector> = LazyLock::new(|| selector("input, select, textarea"));

fn help_url(rule_id: &str) -> String {
    format!("{}/{}", HELP_BASE, rule_id)
}

/// Opening tag of an element, used as the reported DOM snippet.
fn opening_tag(element: &ElementRef) -> String {
    let attrs: String = element
        .value()
        .attrs()
        .map(|(k, v)| format!(" {}=\"{}\"", k, v))
        .collect();
    format!("<{}{}>", element.value().name(), attrs)
}

fn has_text(element: &ElementRef) -> bool {
    element.text().any(|t| !t.trim().is_empty())
}

fn has_attr_text(element: &ElementRef, attr: &str) -> bool {
    element
        .value()
        .attr(attr)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

fn has_aria_name(element: &ElementRef) -> bool {
    has_attr_text(element, "aria-label") || has_attr_text(element, "aria-labelledby")
}

fn violation(rule_id: &str, impact: Impact, description: &str, nodes: Vec<String>) -> Option<Violation> {
    if nodes.is_empty() {
        return None;
    }
    Some(
        Violation::new(rule_id, impact, description)
            .with_help_url(&help_url(rule_id))
            .with_nodes(nodes),
    )
}

fn check_image_alt(document: &Html) -> Option<Violation> {
    let nodes = document
        .select(&IMG)
        .filter(|img| {
            let role = img.value().attr("role").unwrap_or("");
            img.value().attr("alt").is_none()
                && !has_aria_name(img)
                && role != "presentation"
                && role != "none"
        })
        .map(|img| opening_tag(&img))
        .collect();

    violation(
        "image-alt",
        Impact::Critical,
        "Images must have alternative text",
        nodes,
    )
}

fn check_html_lang(document: &Html) -> Option<Violation> {
    let nodes = document
        .select(&HTML)
        .filter(|html| !has_attr_text(html, "lang"))
        .map(|html| opening_tag(&html))
        .collect();

    violation(
        "html-has-lang",
        Impact::Serious,
        "<html> element must have a lang attribute",
        nodes,
    )
}

fn check_document_title(document: &Html) -> Option<Violation> {
    let has_title = document
        .select(&TITLE)
        .any(|title| has_text(&title));
    if has_title {
        return None;
    }

    violation(
        "document-title",
        Impact::Serious,
        "Documents must have <title> element to aid in navigation",
        vec!["<html>".to_string()],
    )
}

fn check_link_name(document: &Html) -> Option<Violation> {
    let nodes = document
        .select(&LINK)
        .filter(|link| {
            let image_named = link.select(&IMG_WITH_ALT).any(|i| has_attr_text(&i, "alt"));
            !has_text(link) && !has_aria_name(link) && !has_attr_text(link, "title") && !image_named
        })
        .map(|link| opening_tag(&link))
        .collect();

    violation(
        "link-name",
        Impact::Serious,
        "Links must have discernible text",
        nodes,
    )
}

fn check_button_name(document: &Html) -> Option<Violation> {
    let nodes = document
        .select(&BUTTON)
        .filter(|button| {
            !has_text(button) && !has_aria_name(button) && !has_attr_text(button, "title")
        })
        .map(|button| opening_tag(&button))
        .collect();

    violation(
        "button-name",
        Impact::Critical,
        "Buttons must have discernible text",
        nodes,
    )
}

fn check_form_labels(document: &Html) -> Option<Violation> {
    let labelled_ids: HashSet<&str> = document
        .select(&LABEL_FOR)
        .filter_map(|label| label.value().attr("for"))
        .collect();

    let nodes = document
        .select(&FORM_FIELD)
        .filter(|field| {
            let input_type = field.value().attr("type").unwrap_or("text").to_lowercase();
            if field.value().name() == "input" && UNLABELLED_INPUT_TYPES.contains(&input_type.as_str()) {
                return false;
            }
            let referenced = field
                .value()
                .attr("id")
                .map(|id| labelled_ids.contains(id))
                .unwrap_or(false);
            let wrapped = field.ancestors().any(|node| {
                node.value()
                    .as_element()
                    .map(|e| e.name() == "label")
                    .unwrap_or(false)
            });
            !referenced && !wrapped && !has_aria_name(field) && !has_attr_text(field, "title")
        })
        .map(|field| opening_tag(&field))
        .collect();

    violation(
        "label",
        Impact::Critical,
        "Form elements must have labels",
        nodes,
    )
}
