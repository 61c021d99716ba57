use serde::Deserialize;

/// One inventoried tree, as copied by hand from the city portal.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Tree {
    pub species_polish: String,
    pub species_latin: String,
    pub circumferences_cm: Vec<u32>,
    pub height_m: u32,
    pub lat: f64,
    pub lon: f64,
    /// Date of the inventory measurement.
    pub date: String,
    pub inventory_ref: String,
    pub operator: String,
}

impl Tree {
    pub fn location(&self) -> geo::Point {
        geo::Point::new(self.lon, self.lat)
    }

    pub fn circumference_summary(&self) -> String {
        self.circumferences_cm
            .iter()
            .map(|circumference| format!("{} cm", circumference))
            .collect::<Vec<String>>()
            .join(", ")
    }
}

/// Everything the application form states besides the looked-up address and map.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApplicationInput {
    pub tree: Tree,
    pub signature: String,
    pub place: String,
    pub recipient: Vec<String>,
    pub data_source: String,
}

impl Default for ApplicationInput {
    fn default() -> Self {
        Self {
            tree: Tree {
                species_polish: "czereśnia ptasia".to_string(),
                species_latin: "Prunus avium (L.) L.".to_string(),
                circumferences_cm: vec![157],
                height_m: 8,
                lat: 52.364509,
                lon: 20.945023,
                date: "28.05.2014".to_string(),
                inventory_ref: "D370612".to_string(),
                operator: "Dzielnica Białołęka".to_string(),
            },
            signature: "Filip Czaplicki".to_string(),
            place: "Warszawa".to_string(),
            recipient: vec![
                "Biuro Ochrony Środowiska".to_string(),
                "Sekretariat.BOS@um.warszawa.pl".to_string(),
            ],
            data_source: "mapa.um.warszawa.pl".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::ApplicationInput;

    #[rstest]
    #[case(vec![157], "157 cm")]
    #[case(vec![100, 60], "100 cm, 60 cm")]
    #[case(vec![], "")]
    fn test_circumference_summary(#[case] circumferences: Vec<u32>, #[case] expected: &str) {
        let mut tree = ApplicationInput::default().tree;
        tree.circumferences_cm = circumferences;
        assert_eq!(tree.circumference_summary(), expected);
    }

    #[rstest]
    fn test_location_is_lon_lat() {
        let tree = ApplicationInput::default().tree;
        assert_eq!(tree.location().x(), 20.945023);
        assert_eq!(tree.location().y(), 52.364509);
    }

    #[rstest]
    fn test_partial_yaml_keeps_defaults() {
        let input: ApplicationInput = serde_yaml::from_str("signature: Jan Kowalski").unwrap();
        assert_eq!(input.signature, "Jan Kowalski");
        assert_eq!(input.tree.inventory_ref, "D370612");
        assert_eq!(input.place, "Warszawa");
    }
}
