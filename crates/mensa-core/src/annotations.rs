//! Allergen and additive legend published by the provider
//!
//! Menu rows carry raw codes in their `data-kennz` attribute. Codes 21–37
//! (with letter sub-codes) are allergens, 2–20 are additives.

/// Classification of a `data-kennz` code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Allergen(&'static str),
    Additive(&'static str),
}

const ALLERGENS: &[(&str, &str)] = &[
    ("21", "Gluten-containing cereals"),
    ("21a", "Wheat"),
    ("21b", "Rye"),
    ("21c", "Barley"),
    ("21d", "Oats"),
    ("21e", "Spelt"),
    ("21f", "Kamut"),
    ("22", "Crustaceans"),
    ("23", "Eggs"),
    ("24", "Fish"),
    ("25", "Peanuts"),
    ("26", "Tree nuts"),
    ("26a", "Almonds"),
    ("26b", "Hazelnuts"),
    ("26c", "Walnuts"),
    ("26d", "Cashews"),
    ("26e", "Pecans"),
    ("26f", "Brazil nuts"),
    ("26g", "Pistachios"),
    ("26h", "Macadamia nuts"),
    ("27", "Celery"),
    ("28", "Soy"),
    ("29", "Mustard"),
    ("30", "Milk and dairy products (incl. lactose)"),
    ("31", "Sesame"),
    ("32", "Sulfur dioxide and sulfites"),
    ("33", "Lupins"),
    ("34", "Mollusks"),
    ("35", "Nitrite curing salt"),
    ("36", "Yeast"),
    ("37", "Blue poppy seeds"),
];

const ADDITIVES: &[(&str, &str)] = &[
    ("2", "Pork or pork gelatin"),
    ("3", "Alcohol"),
    ("4", "Flavor enhancer"),
    ("5", "Waxed"),
    ("6", "Preserved"),
    ("7", "Antioxidants"),
    ("8", "Food coloring"),
    ("9", "Phosphate"),
    ("10", "Blackened"),
    ("12", "Contains phenylalanine source"),
    ("13", "Sweeteners"),
    ("14", "Contains partially finely minced meat"),
    ("16", "Contains caffeine"),
    ("17", "Contains quinine"),
    ("19", "Sulfured"),
    ("20", "May have laxative effects"),
];

fn lookup(table: &'static [(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, label)| *label)
}

/// Classify a raw code; unknown codes yield `None`
pub fn classify(code: &str) -> Option<Annotation> {
    let code = code.trim();
    lookup(ALLERGENS, code)
        .map(Annotation::Allergen)
        .or_else(|| lookup(ADDITIVES, code).map(Annotation::Additive))
}

pub fn allergen_label(code: &str) -> Option<&'static str> {
    lookup(ALLERGENS, code.trim())
}

pub fn additive_label(code: &str) -> Option<&'static str> {
    lookup(ADDITIVES, code.trim())
}
