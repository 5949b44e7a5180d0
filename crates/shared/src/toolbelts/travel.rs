use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::register_toolbelt;
use crate::schemas::required_str;

pub struct Destination {
    pub key: &'static str,
    pub country: &'static str,
    pub currency: &'static str,
    pub airport: &'static str,
    pub highlights: &'static [&'static str],
    pub dining: &'static [&'static str],
}

pub static DESTINATIONS: &[Destination] = &[
    Destination {
        key: "paris",
        country: "France",
        currency: "EUR",
        airport: "CDG",
        highlights: &[
            "Eiffel Tower at sunset",
            "Seine dinner cruise",
            "Day trip to Versailles",
        ],
        dining: &[
            "Le Jardin Secret - seasonal tasting menu in Le Marais",
            "Chez Camille - convivial bistro near Canal Saint-Martin",
            "Nuage - rooftop cocktails with Eiffel Tower views",
        ],
    },
    Destination {
        key: "tokyo",
        country: "Japan",
        currency: "JPY",
        airport: "HND",
        highlights: &[
            "Sushi masterclass in Tsukiji",
            "Ghibli Museum visit",
            "Day trip to Hakone hot springs",
        ],
        dining: &[
            "Sora Sushi - omakase with Tsukiji market fish",
            "Yakitori Kobo - late-night grill in Shinjuku",
            "Momiji Kaiseki - Kyoto-style seasonal courses",
        ],
    },
    Destination {
        key: "rome",
        country: "Italy",
        currency: "EUR",
        airport: "FCO",
        highlights: &[
            "Colosseum underground tour",
            "Private pasta masterclass",
            "Sunset walk through Trastevere",
        ],
        dining: &[
            "Trattoria del Colosseo - handmade pasta near the Forum",
            "Mercato Centrale - gourmet food hall tastings",
            "Il Tramonto - rooftop aperitivo overlooking Trastevere",
        ],
    },
];

const ORIGINS: &[&str] = &["seattle", "new york", "san francisco", "london"];

/// Known destination for `name`, Paris otherwise.
pub fn destination(name: &str) -> &'static Destination {
    let lowered = name.trim().to_lowercase();
    DESTINATIONS
        .iter()
        .find(|d| d.key == lowered)
        .unwrap_or(&DESTINATIONS[0])
}

/// First known destination mentioned in the request, title-cased.
pub fn pick_destination(request: &str) -> String {
    let lowered = request.to_lowercase();
    DESTINATIONS
        .iter()
        .find(|d| lowered.contains(d.key))
        .map(|d| title_case(d.key))
        .unwrap_or_else(|| "Paris".to_string())
}

/// First known origin city mentioned in the request, title-cased.
pub fn pick_origin(request: &str) -> String {
    let lowered = request.to_lowercase();
    ORIGINS
        .iter()
        .find(|city| lowered.contains(*city))
        .map(|city| title_case(city))
        .unwrap_or_else(|| "Seattle".to_string())
}

pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn seeded_rng(seed: impl Hash) -> StdRng {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

/// Synthetic flight, hotel, activity and dining searches.
#[derive(Default)]
pub struct Travel;

register_toolbelt! {
    Travel {
        description: "Synthetic travel search APIs",
        tools: {
            "search_flights" => search_flights {
                description: "Return a synthetic flight option for the supplied route and date.",
                params: [
                    "origin": "string" => "Departure city",
                    "destination": "string" => "Arrival city",
                    "departure": "string" => "Departure date (YYYY-MM-DD)"
                ]
            },
            "search_hotels" => search_hotels {
                description: "Return a synthetic boutique hotel option.",
                params: [
                    "destination": "string" => "City to stay in",
                    "check_in": "string" => "Check-in date (YYYY-MM-DD)",
                    "check_out": "string" => "Check-out date (YYYY-MM-DD)"
                ]
            },
            "search_activities" => search_activities {
                description: "Return highlight activities for the destination.",
                params: [
                    "destination": "string" => "City to explore"
                ]
            },
            "search_dining" => search_dining {
                description: "Return dining experiences for the destination.",
                params: [
                    "destination": "string" => "City to dine in"
                ]
            }
        }
    }
}

impl Travel {
    async fn search_flights(&self, args: &Value) -> Result<String> {
        let origin = required_str(args, "origin")?;
        let destination = required_str(args, "destination")?;
        let departure = required_str(args, "departure")?;

        let mut rng = seeded_rng((origin, destination, departure));
        let airline = ["SkyLine", "AeroJet", "CloudNine"]
            .choose(&mut rng)
            .copied()
            .unwrap_or("SkyLine");
        let fare: u32 = rng.gen_range(700..=1250);

        Ok(format!(
            "Top choice: {} non-stop {}->{}, depart {} 09:05, arrive 16:55. Premium economy fare ${} return.",
            airline, origin, destination, departure, fare
        ))
    }

    async fn search_hotels(&self, args: &Value) -> Result<String> {
        let destination = required_str(args, "destination")?;
        let check_in = required_str(args, "check_in")?;
        let check_out = required_str(args, "check_out")?;

        let mut rng = seeded_rng((destination, check_in, check_out));
        let name = ["Maison Azure", "Le Jardin", "Vista Royale"]
            .choose(&mut rng)
            .copied()
            .unwrap_or("Maison Azure");
        let rate: u32 = rng.gen_range(220..=380);

        Ok(format!(
            "{} near the historic centre. Chic suites, rooftop lounge, average nightly rate ${} with breakfast.",
            name, rate
        ))
    }

    async fn search_activities(&self, args: &Value) -> Result<String> {
        let name = required_str(args, "destination")?;
        let bullets = destination(name)
            .highlights
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!("Signature experiences in {}:\n{}", title_case(name), bullets))
    }

    async fn search_dining(&self, args: &Value) -> Result<String> {
        let name = required_str(args, "destination")?;
        let mut picks = destination(name).dining.to_vec();
        picks.shuffle(&mut seeded_rng((name.to_lowercase(), "dining")));

        let bullets = picks
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!("Dining highlights in {}:\n{}", title_case(name), bullets))
    }
}
