// Footprint records as served by the host CMS, and the fetch of the record list.
// Coordinates arrive as numbers or numeric strings; anything else decodes to None.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::cluster::Geotagged;
use crate::error::EngineError;
use crate::geo::LngLat;

/// Payload of a single footprint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootprintSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub footprint_type: Option<String>,
    /// ISO-8601 instant as written by the host.
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Linked article URL.
    #[serde(default)]
    pub article: Option<String>,
}

impl Geotagged for FootprintSpec {
    fn position(&self) -> Option<LngLat> {
        let p = LngLat::new(self.longitude?, self.latitude?);
        p.is_finite().then_some(p)
    }
}

/// Wire envelope: `{ "spec": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintRecord {
    pub spec: FootprintSpec,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCoordinate {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawCoordinate>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawCoordinate::Number(n)) => Some(n),
        Some(RawCoordinate::Text(s)) => s.trim().parse::<f64>().ok(),
        Some(RawCoordinate::Other(_)) | None => None,
    })
}

/// Decode the record list returned by the footprint endpoint.
pub fn parse_footprints(json: &str) -> Result<Vec<FootprintSpec>, EngineError> {
    let records: Vec<FootprintRecord> = serde_json::from_str(json)
        .map_err(|e| EngineError::Source(format!("unexpected footprint payload: {}", e)))?;
    Ok(records.into_iter().map(|r| r.spec).collect())
}

/// Like [`parse_footprints`], but a bad payload yields an empty list.
pub fn parse_footprints_or_empty(json: &str) -> Vec<FootprintSpec> {
    match parse_footprints(json) {
        Ok(footprints) => footprints,
        Err(err) => {
            warn!(error = %err, "footprint list unavailable, map starts empty");
            Vec::new()
        }
    }
}

/// Fetch the footprint list. Network or decode failures yield an empty list.
#[cfg(target_arch = "wasm32")]
pub async fn fetch_footprints(url: &str) -> Vec<FootprintSpec> {
    use gloo_net::http::Request;

    let body = match Request::get(url).send().await {
        Ok(resp) if resp.ok() => resp.text().await,
        Ok(resp) => {
            warn!(status = resp.status(), url, "footprint request rejected");
            return Vec::new();
        }
        Err(err) => Err(err),
    };

    match body {
        Ok(text) => parse_footprints_or_empty(&text),
        Err(err) => {
            warn!(error = %err, url, "failed to fetch footprints");
            Vec::new()
        }
    }
}
