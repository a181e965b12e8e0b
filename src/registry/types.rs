//! Registry request and response types.
//!
//! The search endpoint returns every requested field as a one-element array,
//! so the wire types are decoded first and then flattened into
//! [`PackageDescriptor`]s.

use serde::{Deserialize, Serialize};

/// A package discovered on the remote registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// The package name.
    pub name: String,
    /// The latest published version.
    pub version: String,
    /// Short description, may be empty.
    #[serde(default)]
    pub description: String,
}

impl PackageDescriptor {
    /// Create a new descriptor.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}

/// Search response body.
///
/// Returned by `GET /query`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Ranked hits, ordered by the `sort` parameter of the request.
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

/// A single hit in a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub version: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
}

impl SearchHit {
    /// Flatten the hit into a descriptor.
    ///
    /// Returns `None` for hits without a name.
    pub fn into_descriptor(self) -> Option<PackageDescriptor> {
        let name = self.name.into_iter().next().filter(|n| !n.is_empty())?;
        Some(PackageDescriptor {
            name,
            version: self.version.into_iter().next().unwrap_or_default(),
            description: self.description.into_iter().next().unwrap_or_default(),
        })
    }
}

impl SearchResponse {
    /// Convert the response into descriptors, preserving registry order.
    pub fn into_descriptors(self) -> Vec<PackageDescriptor> {
        self.results
            .into_iter()
            .filter_map(SearchHit::into_descriptor)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_flattens_arrays() {
        let json = r#"{
            "results": [
                {"name": ["hain-plugin-a"], "version": ["1.2.0"], "description": ["first"], "rating": [9.1]},
                {"name": ["hain-plugin-b"], "version": ["0.1.0"], "description": ["second"]}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let packages = response.into_descriptors();

        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0], PackageDescriptor::new("hain-plugin-a", "1.2.0", "first"));
        assert_eq!(packages[1].name, "hain-plugin-b");
    }

    #[test]
    fn test_search_hit_without_name_is_skipped() {
        let json = r#"{"results": [{"version": ["1.0.0"]}, {"name": [""]}]}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_descriptors().is_empty());
    }

    #[test]
    fn test_search_hit_missing_fields_default_to_empty() {
        let json = r#"{"results": [{"name": ["solo"]}]}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let packages = response.into_descriptors();
        assert_eq!(packages[0].version, "");
        assert_eq!(packages[0].description, "");
    }

    #[test]
    fn test_search_response_without_results() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_descriptors().is_empty());
    }
}
