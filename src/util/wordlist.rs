//! Embedded dictionary for memorable password generation.

/// Common 5–7 letter words; four capitalized words concatenate to a
/// 20–28 character candidate.
pub const WORDS: &[&str] = &[
    "amber", "anchor", "apple", "autumn", "basket", "beacon", "berry", "bishop",
    "blanket", "breeze", "bright", "bronze", "butter", "cabin", "candle", "canyon",
    "carbon", "castle", "cedar", "charm", "cherry", "circle", "citrus", "cloud",
    "clover", "cobalt", "comet", "copper", "coral", "cotton", "cricket", "crystal",
    "curtain", "delta", "desert", "drift", "eagle", "ember", "engine", "falcon",
    "feather", "fiddle", "flame", "forest", "fossil", "garden", "garnet", "giant",
    "ginger", "glacier", "granite", "grape", "gravel", "hammer", "harbor", "hazel",
    "heron", "hollow", "honey", "horizon", "hunter", "island", "ivory", "jasper",
    "jungle", "kettle", "lagoon", "lantern", "laurel", "lemon", "linen", "lively",
    "lobster", "locket", "lunar", "magnet", "mango", "maple", "marble", "meadow",
    "mellow", "meteor", "mirror", "molten", "morning", "mosaic", "muffin", "mustard",
    "nectar", "noble", "north", "nugget", "oasis", "ocean", "olive", "onion",
    "orange", "orbit", "orchid", "otter", "oyster", "palace", "panda", "pantry",
    "paper", "parrot", "pebble", "pepper", "phoenix", "pillow", "planet", "pocket",
    "polar", "poppy", "prairie", "pretzel", "prism", "pumpkin", "purple", "quartz",
    "quiet", "rabbit", "raven", "ribbon", "river", "rocket", "rustic", "saddle",
    "saffron", "salmon", "sandal", "scarlet", "shadow", "silver", "sketch", "sleepy",
    "smooth", "sparrow", "spice", "spiral", "spruce", "stone", "storm", "summer",
    "sunset", "syrup", "tango", "temple", "thistle", "thunder", "tiger", "timber",
    "topaz", "trail", "trumpet", "tulip", "tundra", "turtle", "umber", "valley",
    "velvet", "violet", "walnut", "whale", "willow", "winter", "wonder", "zephyr",
];
