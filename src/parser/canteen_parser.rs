// Studierendenwerk canteen-plan HTML parsing
use crate::model::{Dish, ParserError};
use ::scraper::{ElementRef, Html, Selector};

pub trait Parser: Send + Sync {
    fn parse(&self, html: &str) -> Result<Vec<Dish>, ParserError>;
}

pub struct CanteenParser;

impl CanteenParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CanteenParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for CanteenParser {
    fn parse(&self, html: &str) -> Result<Vec<Dish>, ParserError> {
        if html.trim().is_empty() {
            return Err(ParserError::EmptyDocument);
        }

        let document = Html::parse_document(html);

        let dish_selector = selector(".dish-description")?;
        let price_selector = selector(".price")?;
        let icon_selector = selector("img")?;

        let dishes = document
            .select(&dish_selector)
            .map(|node| dish_from_node(node, &price_selector, &icon_selector))
            .collect();

        Ok(dishes)
    }
}

fn selector(css: &str) -> Result<Selector, ParserError> {
    Selector::parse(css).map_err(|e| ParserError::HtmlParseError(e.to_string()))
}

fn dish_from_node(node: ElementRef<'_>, price_selector: &Selector, icon_selector: &Selector) -> Dish {
    let mut dish = Dish {
        name: normalize_name(&node_text(node)),
        ..Default::default()
    };

    // Price cells are siblings of the description inside the same row.
    if let Some(parent) = node.parent().and_then(ElementRef::wrap) {
        for (slot, price) in dish.prices.iter_mut().zip(parent.select(price_selector)) {
            *slot = node_text(price).replace('\u{a0}', "");
        }
    }

    for icon in node.select(icon_selector) {
        let title = icon.value().attr("title").unwrap_or("").to_lowercase();
        match title.as_str() {
            "vegetarisch" => dish.is_vegetarian = true,
            "vegan" => dish.is_vegan = true,
            "mit rind" => dish.contains_beef = true,
            "mit schwein" => dish.contains_pork = true,
            "mit fisch" => dish.contains_fish = true,
            "mit geflügel" => dish.contains_chicken = true,
            "laktosefrei" => dish.lactose_free = true,
            _ => {}
        }
    }
    dish.is_vegetarian |= dish.is_vegan;

    dish
}

/// Text of all descendant text nodes, each trimmed, joined by single spaces.
fn node_text(node: ElementRef<'_>) -> String {
    node.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One pass of whitespace cleanup on a dish title. Not idempotent: runs of
/// three or more spaces only shrink by one step per call.
pub fn normalize_name(raw: &str) -> String {
    raw.trim_matches([' ', '\t', '\n'])
        .replace("  ", " ")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace(" ,", ",")
}
