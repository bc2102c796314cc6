//! Experience Records
//!
//! Points of interest delivered on the `experiences` side channel. The client
//! never edits an experience; it only decides which list it belongs to.

use serde::{Deserialize, Deserializer, Serialize};

/// A point of interest as sent by the backend
///
/// Field names follow the wire format (`family_friendly`, `includes_food`...).
/// Everything except `id` and `name` may be missing or `null` on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// Backend identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Short description
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    /// Latitude in degrees
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude in degrees
    #[serde(default)]
    pub lon: Option<f64>,
    /// Human-readable duration ("3 horas")
    #[serde(default)]
    pub duration: Option<String>,
    /// Where the experience takes place
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    /// Destination grouping (e.g. a region)
    #[serde(default)]
    pub destination: Option<String>,
    /// Ordered highlight bullets
    #[serde(default, deserialize_with = "null_as_default")]
    pub highlights: Vec<String>,
    /// Category
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Physical intensity
    #[serde(default)]
    pub intensity: Option<String>,
    /// Suitable for families
    #[serde(default)]
    pub family_friendly: Option<bool>,
    /// Food included
    #[serde(default)]
    pub includes_food: Option<bool>,
    /// Transport included
    #[serde(default)]
    pub includes_transport: Option<bool>,
    /// Search similarity score
    #[serde(default)]
    pub similarity: Option<f64>,
}

impl Experience {
    /// Create a record with only the required fields set
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            summary: String::new(),
            lat: None,
            lon: None,
            duration: None,
            location: String::new(),
            destination: None,
            highlights: Vec::new(),
            kind: None,
            intensity: None,
            family_friendly: None,
            includes_food: None,
            includes_transport: None,
            similarity: None,
        }
    }

    /// Builder-style setter for the coordinate pair
    #[must_use]
    pub fn with_coordinates(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    /// The `(lat, lon)` pair, if both are present and in range
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if valid_lat(lat) && valid_lon(lon) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Check the coordinate invariant: both present and valid, or both absent
    ///
    /// A record failing this is still a valid record; it just has no
    /// mappable location and [`Experience::coordinates`] returns `None`.
    ///
    /// # Errors
    ///
    /// Returns a description of the violation.
    pub fn validate(&self) -> Result<(), String> {
        match (self.lat, self.lon) {
            (None, None) => Ok(()),
            (Some(lat), Some(lon)) => {
                if !valid_lat(lat) {
                    Err(format!("experience {}: latitude {lat} out of range", self.id))
                } else if !valid_lon(lon) {
                    Err(format!("experience {}: longitude {lon} out of range", self.id))
                } else {
                    Ok(())
                }
            }
            _ => Err(format!(
                "experience {}: lat and lon must be given together",
                self.id
            )),
        }
    }
}

/// Explicit `null` reads as the field's default, same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn valid_lat(lat: f64) -> bool {
    lat.is_finite() && (-90.0..=90.0).contains(&lat)
}

fn valid_lon(lon: f64) -> bool {
    lon.is_finite() && (-180.0..=180.0).contains(&lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wire_record() {
        let json = r#"{
            "id": "e1",
            "name": "Cenote X",
            "summary": "Nado en cenote",
            "lat": 20.21,
            "lon": -87.46,
            "duration": "3 horas",
            "location": "Tulum",
            "destination": null,
            "highlights": ["agua cristalina", "snorkel"],
            "type": "naturaleza",
            "intensity": "baja",
            "family_friendly": true,
            "includes_food": false,
            "includes_transport": null,
            "similarity": 0.87
        }"#;

        let exp: Experience = serde_json::from_str(json).unwrap();
        assert_eq!(exp.id, "e1");
        assert_eq!(exp.kind.as_deref(), Some("naturaleza"));
        assert_eq!(exp.highlights, vec!["agua cristalina", "snorkel"]);
        assert_eq!(exp.family_friendly, Some(true));
        assert_eq!(exp.includes_transport, None);
        assert_eq!(exp.coordinates(), Some((20.21, -87.46)));
        assert!(exp.validate().is_ok());
    }

    #[test]
    fn test_minimal_record_has_no_coordinates() {
        let exp: Experience = serde_json::from_str(r#"{"id":"e2","name":"Taller"}"#).unwrap();
        assert!(exp.coordinates().is_none());
        assert!(exp.validate().is_ok());
        assert!(exp.highlights.is_empty());
    }

    #[test]
    fn test_half_coordinates_invalid() {
        let mut exp = Experience::new("e3", "Solo lat");
        exp.lat = Some(20.0);
        assert!(exp.coordinates().is_none());
        assert!(exp.validate().unwrap_err().contains("together"));
    }

    #[test]
    fn test_out_of_range_coordinates_invalid() {
        let exp = Experience::new("e4", "Lejos").with_coordinates(120.0, 10.0);
        assert!(exp.coordinates().is_none());
        assert!(exp.validate().unwrap_err().contains("latitude"));

        let exp = Experience::new("e5", "Lejos").with_coordinates(10.0, -200.0);
        assert!(exp.validate().unwrap_err().contains("longitude"));
    }

    #[test]
    fn test_null_text_fields_read_as_empty() {
        let exp: Experience = serde_json::from_str(
            r#"{"id":"e7","name":"Cenote","summary":null,"location":null,"highlights":null}"#,
        )
        .unwrap();
        assert_eq!(exp.summary, "");
        assert_eq!(exp.location, "");
        assert!(exp.highlights.is_empty());
    }

    #[test]
    fn test_null_summary_alone() {
        let exp: Experience =
            serde_json::from_str(r#"{"id":"e8","name":"X","summary":null}"#).unwrap();
        assert_eq!(exp.summary, "");
    }

    #[test]
    fn test_null_location_alone() {
        let exp: Experience =
            serde_json::from_str(r#"{"id":"e9","name":"X","location":null}"#).unwrap();
        assert_eq!(exp.location, "");
    }

    #[test]
    fn test_null_highlights_alone() {
        let exp: Experience =
            serde_json::from_str(r#"{"id":"e10","name":"X","highlights":null}"#).unwrap();
        assert!(exp.highlights.is_empty());
    }

    #[test]
    fn test_type_field_serializes_with_wire_name() {
        let mut exp = Experience::new("e6", "Tour");
        exp.kind = Some("cultural".to_string());
        let value = serde_json::to_value(&exp).unwrap();
        assert_eq!(value["type"], "cultural");
        assert!(value.get("kind").is_none());
    }
}
