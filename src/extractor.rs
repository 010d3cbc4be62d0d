use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::models::ProductRecord;
use crate::utils::error::{AppError, Result};

/// Ordered selector lists. Earlier entries win.
#[derive(Debug, Clone)]
pub struct SelectorRules {
    pub cards: Vec<String>,
    pub names: Vec<String>,
    pub prices: Vec<String>,
    pub link: String,
    /// Page-wide scan used when no card selector matched anything.
    pub fallback: String,
}

impl Default for SelectorRules {
    fn default() -> Self {
        // Class names used by the common Tebex themes
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            cards: owned(&[".package-card", ".package", ".package-list-item", ".package--card"]),
            names: owned(&[".package-name", ".package-title", ".name", "h3", "h2"]),
            prices: owned(&[".price", ".package-price", ".pkg-price", ".price-text"]),
            link: "a[href]".to_string(),
            fallback: ".package-name, .package-title, .package".to_string(),
        }
    }
}

pub struct ProductExtractor {
    cards: Vec<Selector>,
    names: Vec<Selector>,
    prices: Vec<Selector>,
    link: Selector,
    fallback: Selector,
}

impl ProductExtractor {
    pub fn new() -> Result<Self> {
        Self::with_rules(&SelectorRules::default())
    }

    pub fn with_rules(rules: &SelectorRules) -> Result<Self> {
        Ok(Self {
            cards: parse_all(&rules.cards)?,
            names: parse_all(&rules.names)?,
            prices: parse_all(&rules.prices)?,
            link: parse_selector(&rules.link)?,
            fallback: parse_selector(&rules.fallback)?,
        })
    }

    /// Pull product records out of a rendered page, in document order.
    ///
    /// Root-relative links are made absolute against `base_url`. An empty
    /// result is a normal outcome, not an error.
    pub fn extract(&self, html: &str, base_url: &str) -> Vec<ProductRecord> {
        let document = Html::parse_document(html);

        let cards = self.find_cards(&document);
        if !cards.is_empty() {
            return cards
                .into_iter()
                .map(|card| self.extract_card(card, base_url))
                .collect();
        }

        info!("No package cards found; trying fallback selectors for names");
        document
            .select(&self.fallback)
            .filter_map(|element| {
                let text = element_text(element);
                (!text.is_empty()).then(|| ProductRecord::name_only(text))
            })
            .collect()
    }

    /// Matches of the first card selector that hits anything. Never merged across selectors.
    fn find_cards<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for selector in &self.cards {
            let cards: Vec<ElementRef> = document.select(selector).collect();
            if !cards.is_empty() {
                debug!("Card selector {:?} matched {} elements", selector, cards.len());
                return cards;
            }
        }
        Vec::new()
    }

    fn extract_card(&self, card: ElementRef, base_url: &str) -> ProductRecord {
        let name = first_text(card, &self.names);
        let price = first_text(card, &self.prices);
        let link = first_descendant(card, &self.link)
            .and_then(|anchor| anchor.value().attr("href"))
            .filter(|href| !href.is_empty())
            .map(|href| resolve_link(href, base_url));

        ProductRecord::new(name, price, link)
    }
}

/// Make a root-relative href absolute; anything else is returned verbatim.
pub fn resolve_link(href: &str, base_url: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        href.to_string()
    }
}

/// Text nodes trimmed individually and concatenated, blanks dropped.
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// First match strictly below `card`; the card itself is not a candidate.
fn first_descendant<'a>(card: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    card.select(selector).find(|element| element.id() != card.id())
}

/// For each selector in turn, look at its first match only; stop at the first non-empty text.
fn first_text(card: ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        first_descendant(card, selector)
            .map(element_text)
            .filter(|text| !text.is_empty())
    })
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn parse_all(selectors: &[String]) -> Result<Vec<Selector>> {
    selectors.iter().map(|s| parse_selector(s)).collect()
}
