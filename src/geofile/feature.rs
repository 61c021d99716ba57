use indexmap::IndexMap;

/// Attribute names to values, in the order the portal lists them.
pub type Tags = IndexMap<String, String>;

/// A single point feature in WGS84, x = longitude, y = latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: geo::Point,
    pub tags: Tags,
}

impl Feature {
    pub fn new(geometry: geo::Point, tags: Tags) -> Self {
        Self { geometry, tags }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// All tags as `key: value` lines.
    pub fn describe(&self) -> String {
        self.tags
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<String>>()
            .join("\n")
    }
}

impl From<geo::Point> for Feature {
    fn from(value: geo::Point) -> Self {
        Self {
            geometry: value,
            tags: Tags::new(),
        }
    }
}
