//! PubChem PUG-REST name lookup.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::{NameResolver, ResolverError, ResolverResult};

/// Public PubChem PUG-REST endpoint.
pub const PUBCHEM_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";

/// Blocking PubChem client mapping compound names to canonical SMILES.
pub struct PubChemResolver {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl PubChemResolver {
    /// Create a client with a per-request timeout.
    pub fn new(base_url: &str, timeout_secs: u64) -> ResolverResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ResolverError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Public PubChem with a 10 second timeout.
    pub fn default_public() -> ResolverResult<Self> {
        Self::new(PUBCHEM_BASE_URL, 10)
    }

    fn property_url(&self, name: &str) -> ResolverResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ResolverError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ResolverError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["compound", "name", name, "property", "CanonicalSMILES", "JSON"]);
        Ok(url)
    }
}

impl NameResolver for PubChemResolver {
    fn lookup(&self, name: &str) -> ResolverResult<Option<String>> {
        let url = self.property_url(name)?;

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                ResolverError::Timeout(self.timeout_secs)
            } else {
                ResolverError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ResolverError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                ResolverError::Timeout(self.timeout_secs)
            } else {
                ResolverError::Http(e.to_string())
            }
        })?;
        parse_property_table(&body)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyTableResponse {
    property_table: PropertyTable,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyTable {
    #[serde(default)]
    properties: Vec<CompoundProperties>,
}

/// PubChem has renamed the SMILES properties over time; accept each spelling.
#[derive(Deserialize)]
struct CompoundProperties {
    #[serde(rename = "CanonicalSMILES")]
    canonical: Option<String>,
    #[serde(rename = "ConnectivitySMILES")]
    connectivity: Option<String>,
    #[serde(rename = "SMILES")]
    smiles: Option<String>,
}

impl CompoundProperties {
    fn into_smiles(self) -> Option<String> {
        [self.canonical, self.connectivity, self.smiles]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}

/// Pull the first compound's SMILES out of a PUG-REST property table.
pub fn parse_property_table(body: &str) -> ResolverResult<Option<String>> {
    let parsed: PropertyTableResponse =
        serde_json::from_str(body).map_err(|e| ResolverError::InvalidResponse(e.to_string()))?;

    Ok(parsed
        .property_table
        .properties
        .into_iter()
        .find_map(CompoundProperties::into_smiles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_smiles() {
        let body = r#"{"PropertyTable":{"Properties":[{"CID":2244,"CanonicalSMILES":"CC(=O)OC1=CC=CC=C1C(=O)O"}]}}"#;
        assert_eq!(
            parse_property_table(body).unwrap(),
            Some("CC(=O)OC1=CC=CC=C1C(=O)O".to_string())
        );
    }

    #[test]
    fn test_parse_connectivity_smiles() {
        let body = r#"{"PropertyTable":{"Properties":[{"CID":3672,"ConnectivitySMILES":"CC(C)CC1=CC=C(C=C1)C(C)C(=O)O"}]}}"#;
        assert_eq!(
            parse_property_table(body).unwrap(),
            Some("CC(C)CC1=CC=C(C=C1)C(C)C(=O)O".to_string())
        );
    }

    #[test]
    fn test_parse_prefers_canonical_when_both_present() {
        let body = r#"{"PropertyTable":{"Properties":[{"CID":2244,"SMILES":"CC(=O)Oc1ccccc1C(=O)O","CanonicalSMILES":"CC(=O)OC1=CC=CC=C1C(=O)O"}]}}"#;
        assert_eq!(
            parse_property_table(body).unwrap(),
            Some("CC(=O)OC1=CC=CC=C1C(=O)O".to_string())
        );
    }

    #[test]
    fn test_parse_first_compound_wins() {
        let body = r#"{"PropertyTable":{"Properties":[{"CID":1,"CanonicalSMILES":"C"},{"CID":2,"CanonicalSMILES":"CC"}]}}"#;
        assert_eq!(parse_property_table(body).unwrap(), Some("C".to_string()));
    }

    #[test]
    fn test_parse_empty_table() {
        let body = r#"{"PropertyTable":{"Properties":[]}}"#;
        assert_eq!(parse_property_table(body).unwrap(), None);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_property_table("<html>"),
            Err(ResolverError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_property_url_encodes_name() {
        let resolver = PubChemResolver::new("https://example.org/rest/pug/", 5).unwrap();
        let url = resolver.property_url("acetylsalicylic acid").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/rest/pug/compound/name/acetylsalicylic%20acid/property/CanonicalSMILES/JSON"
        );
    }

    #[test]
    fn test_constructor_trims_trailing_slash() {
        let resolver = PubChemResolver::new("http://localhost:8080/", 3).unwrap();
        assert_eq!(resolver.base_url, "http://localhost:8080");
        assert_eq!(resolver.timeout_secs, 3);
    }
}
