use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Nearest postal address of a coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressResult {
    pub house_number: String,
    pub street: String,
    pub suburb: String,
    pub city: String,
    pub post_code: String,
}

impl AddressResult {
    /// `street number, postcode city`
    pub fn postal_line(&self) -> String {
        format!(
            "{} {}, {} {}",
            self.street, self.house_number, self.post_code, self.city
        )
    }
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("reverse geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder answered {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed geocoder response: {0}")]
    Body(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug)]
struct ReverseResponse {
    address: Option<HashMap<String, String>>,
}

/// Reads a Nominatim `reverse` answer. `Ok(None)` means the service answered but
/// has no complete address for the point.
pub fn parse_reverse_response(body: &str) -> Result<Option<AddressResult>, GeocodeError> {
    let response: ReverseResponse = serde_json::from_str(body)?;
    let Some(mut address) = response.address else {
        return Ok(None);
    };
    let mut take = |key: &str| address.remove(key);
    Ok(
        match (
            take("house_number"),
            take("road"),
            take("suburb"),
            take("city"),
            take("postcode"),
        ) {
            (Some(house_number), Some(street), Some(suburb), Some(city), Some(post_code)) => {
                Some(AddressResult {
                    house_number,
                    street,
                    suburb,
                    city,
                    post_code,
                })
            }
            _ => None,
        },
    )
}

pub fn reverse_geocode(
    client: &reqwest::blocking::Client,
    url: &str,
    location: geo::Point,
) -> Result<Option<AddressResult>, GeocodeError> {
    let lat = location.y().to_string();
    let lon = location.x().to_string();
    let response = client
        .get(url)
        .query(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "json")])
        .send()?;
    if !response.status().is_success() {
        return Err(GeocodeError::Status(response.status()));
    }
    parse_reverse_response(&response.text()?)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{parse_reverse_response, AddressResult};

    const FULL: &str = r#"{
        "place_id": 1,
        "display_name": "12, Modlińska, Białołęka, Warszawa",
        "address": {
            "house_number": "12",
            "road": "Modlińska",
            "suburb": "Białołęka",
            "city": "Warszawa",
            "ISO3166-2-lvl4": "PL-14",
            "postcode": "03-216",
            "country": "Polska"
        }
    }"#;

    #[rstest]
    fn test_full_address() {
        let address = parse_reverse_response(FULL).unwrap().unwrap();
        assert_eq!(
            address,
            AddressResult {
                house_number: "12".to_string(),
                street: "Modlińska".to_string(),
                suburb: "Białołęka".to_string(),
                city: "Warszawa".to_string(),
                post_code: "03-216".to_string(),
            }
        );
        assert_eq!(address.postal_line(), "Modlińska 12, 03-216 Warszawa");
    }

    #[rstest]
    #[case(r#"{"address": {"road": "Modlińska", "city": "Warszawa"}}"#)]
    #[case(r#"{"error": "Unable to geocode"}"#)]
    fn test_incomplete_address_is_absent(#[case] body: &str) {
        assert_eq!(parse_reverse_response(body).unwrap(), None);
    }

    #[rstest]
    #[case("<html>429 Too Many Requests</html>")]
    #[case("")]
    fn test_malformed_body_is_an_error(#[case] body: &str) {
        assert!(parse_reverse_response(body).is_err());
    }
}
