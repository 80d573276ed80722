//! Location tiers for the scoring rubric's geographic multiplier.
//!
//! The same table renders criterion 3 of the scoring prompt and backs the
//! arithmetic used for the worked example, so prompt and code cannot drift.

/// Market tier of a lead's location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationTier {
    /// Multiplier 1.0.
    Primary,
    /// Multiplier 0.8.
    Secondary,
    /// Multiplier 0.5.
    Other,
}

/// A country as named in the prompt, plus the spellings that identify it.
#[derive(Debug, Clone, Copy)]
pub struct Country {
    pub display: &'static str,
    aliases: &'static [&'static str],
}

pub const PRIMARY_COUNTRIES: &[Country] = &[
    Country {
        display: "USA",
        aliases: &[
            "usa",
            "us",
            "u s",
            "u s a",
            "united states",
            "united states of america",
        ],
    },
    Country {
        display: "Canada",
        aliases: &["canada"],
    },
    Country {
        display: "UK",
        aliases: &[
            "uk",
            "u k",
            "united kingdom",
            "great britain",
            "england",
            "scotland",
            "wales",
            "northern ireland",
        ],
    },
    Country {
        display: "Germany",
        aliases: &["germany", "deutschland"],
    },
    Country {
        display: "Italy",
        aliases: &["italy", "italia"],
    },
    Country {
        display: "France",
        aliases: &["france"],
    },
    Country {
        display: "Netherlands",
        aliases: &["netherlands", "the netherlands", "holland"],
    },
    Country {
        display: "Switzerland",
        aliases: &["switzerland"],
    },
    Country {
        display: "Sweden",
        aliases: &["sweden"],
    },
    Country {
        display: "Ireland",
        aliases: &["ireland"],
    },
    Country {
        display: "Australia",
        aliases: &["australia"],
    },
    Country {
        display: "Singapore",
        aliases: &["singapore"],
    },
];

pub const SECONDARY_COUNTRIES: &[Country] = &[
    Country {
        display: "India",
        aliases: &["india"],
    },
    Country {
        display: "UAE",
        aliases: &["uae", "u a e", "united arab emirates", "dubai", "abu dhabi"],
    },
    Country {
        display: "Saudi Arabia",
        aliases: &["saudi arabia", "ksa", "kingdom of saudi arabia"],
    },
    Country {
        display: "Israel",
        aliases: &["israel"],
    },
    Country {
        display: "Qatar",
        aliases: &["qatar"],
    },
    Country {
        display: "Egypt",
        aliases: &["egypt"],
    },
];

impl LocationTier {
    pub fn multiplier(self) -> f64 {
        match self {
            LocationTier::Primary => 1.0,
            LocationTier::Secondary => 0.8,
            LocationTier::Other => 0.5,
        }
    }

    pub fn countries(self) -> &'static [Country] {
        match self {
            LocationTier::Primary => PRIMARY_COUNTRIES,
            LocationTier::Secondary => SECONDARY_COUNTRIES,
            LocationTier::Other => &[],
        }
    }

    /// Comma-separated display names, as listed in the prompt.
    pub fn country_list(self) -> String {
        self.countries()
            .iter()
            .map(|c| c.display)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Best-effort tier for a free-text location such as "Austin, Texas, United States".
    ///
    /// Matching is on whole words, so "Indiana" is not India and "Australia"
    /// is not "us". Missing or unrecognised locations fall into `Other`.
    pub fn classify(location: Option<&str>) -> Self {
        let Some(location) = location else {
            return LocationTier::Other;
        };
        let words = normalize_words(location);
        if words.is_empty() {
            return LocationTier::Other;
        }

        for tier in [LocationTier::Primary, LocationTier::Secondary] {
            let matched = tier.countries().iter().any(|country| {
                country
                    .aliases
                    .iter()
                    .any(|alias| contains_phrase(&words, alias))
            });
            if matched {
                return tier;
            }
        }
        LocationTier::Other
    }
}

/// Applies the tier multiplier to a base score, rounding half up.
pub fn apply_multiplier(base: u8, tier: LocationTier) -> u8 {
    let scaled = f64::from(base.min(100)) * tier.multiplier();
    // base <= 100 and multiplier <= 1.0, so the result fits in u8
    (scaled + 0.5).floor().clamp(0.0, 100.0) as u8
}

fn normalize_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split(' ').collect();
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}
