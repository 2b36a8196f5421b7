//! Org Units
//!
//! Organisation units as the dashboard receives them: GeoJSON features
//! keyed by the DHIS2 org unit id, with the display name in `properties`.

use serde::{Deserialize, Serialize};

/// An org unit feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgUnitFeature {
    pub id: String,
    #[serde(default)]
    pub properties: OrgUnitProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgUnitProperties {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl OrgUnitFeature {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: OrgUnitProperties {
                name: name.into(),
                level: None,
            },
        }
    }

    /// Display name, falling back to the id
    pub fn name(&self) -> &str {
        if self.properties.name.is_empty() {
            &self.id
        } else {
            &self.properties.name
        }
    }
}

/// Either a bare feature list or a GeoJSON `FeatureCollection`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureDocument {
    Collection { features: Vec<OrgUnitFeature> },
    List(Vec<OrgUnitFeature>),
}

/// Parse org unit features from JSON
pub fn parse_features(json: &str) -> Result<Vec<OrgUnitFeature>, serde_json::Error> {
    let document: FeatureDocument = serde_json::from_str(json)?;
    Ok(match document {
        FeatureDocument::Collection { features } => features,
        FeatureDocument::List(features) => features,
    })
}
