// Renders dishes and static texts into Mattermost markdown
use crate::model::Dish;

pub const TABLE_HEADER: &str = "| Essen | Features | Preise |\n| -- | -- | -- |\n";

pub const LEGEND: &str = "**Legende:**\n\
    :heart_eyes: = Lieblingsgericht\n\
    :sunflower: = Veganes Gericht\n\
    :carrot: = Vegetarisches Gericht\n\
    :cow2: = Enthält Rindfleisch\n\
    :pig2: = Enthält Schweinefleisch\n\
    :fish: = Enthält Fisch\n\
    :rooster: = Enthält Geflügel\n\
    :milk_glass: = Laktose**freies**(!) Gericht\n";

pub const MENU_UNAVAILABLE: &str = "_Der Speiseplan ist gerade nicht erreichbar._";

/// Emoji markers for the Features column, in display order.
pub fn dish_markers(dish: &Dish, favorites: &[String]) -> Vec<&'static str> {
    let mut markers = Vec::new();
    if dish.is_favorite(favorites) {
        markers.push(":heart_eyes:");
    }
    if dish.is_vegan {
        markers.push(":sunflower:");
    } else if dish.is_vegetarian {
        markers.push(":carrot:");
    }
    if dish.contains_beef {
        markers.push(":cow2:");
    }
    if dish.contains_pork {
        markers.push(":pig2:");
    }
    if dish.contains_fish {
        markers.push(":fish:");
    }
    if dish.contains_chicken {
        markers.push(":rooster:");
    }
    if dish.lactose_free {
        markers.push(":milk_glass:");
    }
    markers
}

pub fn format_dish(dish: &Dish, favorites: &[String]) -> String {
    let mut row = format!("| {} |", dish.name);
    for marker in dish_markers(dish, favorites) {
        row.push(' ');
        row.push_str(marker);
    }
    row.push_str(" |");
    row.push_str(&format!(
        " {} // {} // {} |",
        dish.prices[0], dish.prices[1], dish.prices[2]
    ));
    row
}

/// Header line, a blank line, then the dish table. An empty `dishes` slice
/// still yields the table header and separator.
pub fn format_menu(header: &str, dishes: &[Dish], favorites: &[String]) -> String {
    let mut message = String::with_capacity(TABLE_HEADER.len() + header.len() + dishes.len() * 64);
    message.push_str(header);
    message.push_str("\n\n");
    message.push_str(TABLE_HEADER);
    for dish in dishes {
        message.push_str(&format_dish(dish, favorites));
        message.push('\n');
    }
    message
}

pub fn help_text(mention_name: &str) -> String {
    format!(
        "**Befehle** (mit `{mention} ` am Anfang, im Debug-Kanal auch ohne):\n\
        - `heute` / `today`: Speiseplan für heute\n\
        - `morgen` / `tomorrow`: Speiseplan für morgen\n\
        - `legende` / `legend`: Erklärung der Symbole\n\
        - `alive` / `running` / `up`: Lebenszeichen\n\
        - `help` / `command`: diese Hilfe\n",
        mention = mention_name
    )
}
