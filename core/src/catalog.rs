use crate::models::FoodItem;

/// Common foods offered for quick logging, with calories per portion.
pub const FOOD_CATALOG: &[(&str, i32)] = &[
    ("Tempe Goreng", 75),
    ("Telur Dadar", 154),
    ("Bubur Ayam", 240),
    ("Roti Gandum", 70),
    ("Nasi Putih", 180),
    ("Ayam Goreng", 250),
    ("Sayur Asem", 50),
    ("Pisang", 89),
];

/// Catalog foods whose name contains `query`, ignoring case. A blank query
/// returns the whole catalog.
#[must_use]
pub fn search_catalog(query: &str) -> Vec<FoodItem> {
    let needle = query.trim().to_lowercase();
    FOOD_CATALOG
        .iter()
        .filter(|(name, _)| needle.is_empty() || name.to_lowercase().contains(&needle))
        .map(|(name, calories)| FoodItem::new(*name, *calories))
        .collect()
}
