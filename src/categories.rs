//! Business types offered by the category picker, most searched first.
//!
//! Free-text categories are still accepted; this list only backs pickers and
//! the `categories` command.

pub const TOP_COMPANY_TYPES: &[&str] = &[
    "restaurant",
    "cafe",
    "pharmacy",
    "hospital",
    "hotel",
    "school",
    "bank",
    "supermarket",
    "bakery",
    "clinic",
    "bar",
    "gym",
    "gas station",
    "library",
    "shopping mall",
    "laundry",
    "car repair",
    "beauty salon",
    "movie theater",
    "museum",
    "park",
    "church",
    "mosque",
    "police",
    "fire station",
    "train station",
    "bus station",
    "airport",
    "dentist",
    "vet",
    "painter",
    "plumber",
    "electrician",
    "lawyer",
    "insurance agency",
    "real estate",
    "construction",
    "furniture store",
    "clothing store",
    "electronics store",
    "pet store",
    "hair salon",
    "spa",
    "doctor",
    "optician",
    "toy store",
    "book store",
    "jewelry store",
    "travel agency",
    "taxi",
    "car rental",
    "night club",
    "fast food",
    "ice cream shop",
    "pizzeria",
    "barber",
    "bank ATM",
    "car wash",
    "hardware store",
    "garden center",
    "florist",
    "beauty supply",
    "convenience store",
    "liquor store",
    "shoe store",
    "mobile phone shop",
    "internet cafe",
    "coffee shop",
    "hotel chain",
    "restaurant chain",
    "school district",
    "daycare",
    "fitness center",
    "swimming pool",
    "museum gallery",
    "art gallery",
    "language school",
    "driving school",
    "computer store",
    "electronics repair",
    "printing service",
    "photography studio",
    "cleaning service",
    "laundromat",
    "massage therapist",
    "nail salon",
    "tattoo studio",
    "travel tour",
    "casino",
    "billiard hall",
    "bowling alley",
    "sports club",
    "yoga studio",
    "dance school",
    "movie rental",
    "pet grooming",
    "gaming store",
    "stationery store",
];

pub fn is_known_category(category: &str) -> bool {
    let needle = category.trim();
    TOP_COMPANY_TYPES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(needle))
}
