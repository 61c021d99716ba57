use rayon::prelude::*;

use crate::geofile::feature::Feature;

pub const NAME_TAG: &str = "Nazwa polska";
pub const CIRCUMFERENCE_TAG: &str = "Obwód pnia w cm";
pub const NO_DATA: &str = "brak danych";

/// Species qualifying as monuments from `threshold_cm` of trunk circumference.
pub struct Tier {
    pub threshold_cm: i64,
    pub species: &'static [&'static str],
}

pub const MONUMENT_TIERS: [Tier; 7] = [
    Tier {
        threshold_cm: 50,
        species: &[
            "bez koralowy",
            "cis pospolity",
            "jałowiec pospolity",
            "kruszyna pospolita",
            "rokitnik zwyczajny",
            "szakłak pospolity",
            "trzmielina",
        ],
    },
    Tier {
        threshold_cm: 100,
        species: &[
            "bez czarny",
            "cyprysik",
            "czeremcha zwyczajna",
            "czereśnia",
            "głóg",
            "jabłoń",
            "jarząb pospolity",
            "jarząb szwedzki",
            "leszczyna pospolita",
            "żywotnik zachodni",
        ],
    },
    Tier {
        threshold_cm: 150,
        species: &[
            "grusza",
            "klon polny",
            "magnolia drzewiasta",
            "miłorząb",
            "sosna Banksa",
            "sosna limba",
            "wierzba iwa",
            "żywotnik olbrzymi",
        ],
    },
    Tier {
        threshold_cm: 200,
        species: &[
            "brzoza brodawkowata",
            "brzoza omszona",
            "choina",
            "grab zwyczajny",
            "olsza szara",
            "orzech",
            "sosna wejmutka",
            "topola osika",
            "tulipanowiec",
            "wiąz górski",
            "wiąz polny",
            "wiąz szypułkowy",
            "wierzba pięciopręcikowa",
        ],
    },
    Tier {
        threshold_cm: 250,
        species: &[
            "daglezja",
            "iglicznia",
            "jesion wyniosły",
            "jodła pospolita",
            "kasztanowiec zwyczajny",
            "kasztanowiec pospolity",
            "klon jawor",
            "klon zwyczajny",
            "klon pospolity",
            "leszczyna turecka",
            "modrzew",
            "olsza czarna",
            "perełkowiec",
            "sosna czarna",
            "sosna zwyczajna",
            "świerk pospolity",
        ],
    },
    Tier {
        threshold_cm: 300,
        species: &[
            "buk zwyczajny",
            "buk pospolity",
            "dąb bezszypułkowy",
            "dąb szypułkowy",
            "lipa",
            "platan",
            "topola biała",
            "wierzba biała",
            "wierzba krucha",
        ],
    },
    Tier {
        threshold_cm: 350,
        species: &["topola"],
    },
];

/// Parses a comma separated list of whole centimetres, e.g. `"100, 60"`.
pub fn parse_circumferences(value: &str) -> Option<Vec<i64>> {
    value
        .split(',')
        .map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// The largest stem plus half of all other stems, rounded down. `None` for an
/// empty list or when the sum does not fit in `i64`.
pub fn weighted_circumference(circumferences: &[i64]) -> Option<i64> {
    let max = *circumferences.iter().max()?;
    let total = circumferences
        .iter()
        .try_fold(0i64, |total, circumference| total.checked_add(*circumference))?;
    let others = total.checked_sub(max)?;
    max.checked_add(others.div_euclid(2))
}

impl Tier {
    /// Species are matched as lowercase substrings of `name`.
    fn admits(&self, name: &str, circumference: i64) -> bool {
        circumference >= self.threshold_cm
            && self
                .species
                .iter()
                .any(|species| name.contains(&species.to_lowercase()))
    }
}

pub fn is_tree_monument(feature: &Feature) -> bool {
    let (Some(name), Some(circumferences)) =
        (feature.tag(NAME_TAG), feature.tag(CIRCUMFERENCE_TAG))
    else {
        return false;
    };
    if name.contains(NO_DATA) {
        return false;
    }
    let Some(circumference) =
        parse_circumferences(circumferences).and_then(|values| weighted_circumference(&values))
    else {
        return false;
    };
    let name = name.to_lowercase();
    MONUMENT_TIERS
        .iter()
        .any(|tier| tier.admits(&name, circumference))
}

pub fn filter_monuments(features: &[Feature]) -> Vec<Feature> {
    features
        .par_iter()
        .filter(|feature| is_tree_monument(feature))
        .cloned()
        .collect()
}
