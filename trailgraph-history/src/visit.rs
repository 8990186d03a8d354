use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Provider-assigned visit identifier.
///
/// Browsers hand these out as strings, `places.sqlite` as integers. Both are
/// accepted and compared as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawVisitId", into = "String")]
pub struct VisitId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVisitId {
    Text(String),
    Number(i64),
}

impl From<RawVisitId> for VisitId {
    fn from(raw: RawVisitId) -> Self {
        match raw {
            RawVisitId::Text(s) => VisitId(s),
            RawVisitId::Number(n) => VisitId(n.to_string()),
        }
    }
}

impl From<VisitId> for String {
    fn from(id: VisitId) -> Self {
        id.0
    }
}

impl From<String> for VisitId {
    fn from(s: String) -> Self {
        VisitId(s)
    }
}

impl From<&str> for VisitId {
    fn from(s: &str) -> Self {
        VisitId(s.to_string())
    }
}

impl From<i64> for VisitId {
    fn from(n: i64) -> Self {
        VisitId(n.to_string())
    }
}

impl VisitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One browsing event as reported by a history provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub visit_id: VisitId,
    #[serde(default)]
    pub url: String,
    /// Milliseconds since the Unix epoch
    #[serde(
        default,
        deserialize_with = "deserialize_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub visit_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referring_visit_id: Option<VisitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
}

impl VisitRecord {
    pub fn new(visit_id: impl Into<VisitId>, url: impl Into<String>) -> Self {
        Self {
            visit_id: visit_id.into(),
            url: url.into(),
            visit_time: None,
            referring_visit_id: None,
            transition: None,
        }
    }

    pub fn with_referrer(mut self, referring_visit_id: impl Into<VisitId>) -> Self {
        self.referring_visit_id = Some(referring_visit_id.into());
        self
    }

    pub fn with_visit_time(mut self, millis: i64) -> Self {
        self.visit_time = Some(millis);
        self
    }

    pub fn with_transition(mut self, transition: impl Into<String>) -> Self {
        self.transition = Some(transition.into());
        self
    }
}

/// A distinct URL returned by the top-level history search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitedUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_visit_time: Option<i64>,
}

impl VisitedUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            last_visit_time: None,
        }
    }
}

// Browser APIs report fractional milliseconds
fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map(|ms| ms as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_id_accepts_numbers_and_strings() {
        let from_number: VisitId = serde_json::from_str("42").unwrap();
        let from_text: VisitId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_number, from_text);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"42\"");
    }

    #[test]
    fn test_visit_record_from_browser_json() {
        let json = r#"{
            "visitId": "17",
            "visitTime": 1700000000123.75,
            "referringVisitId": "16",
            "transition": "link"
        }"#;
        let record: VisitRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.visit_id.as_str(), "17");
        assert_eq!(record.url, "");
        assert_eq!(record.visit_time, Some(1700000000123));
        assert_eq!(record.referring_visit_id, Some(VisitId::from("16")));
        assert_eq!(record.transition.as_deref(), Some("link"));
    }

    #[test]
    fn test_visit_record_serializes_camel_case_and_skips_absent_fields() {
        let record = VisitRecord::new(1, "https://x.com/");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["visitId"], "1");
        assert_eq!(json["url"], "https://x.com/");
        assert!(json.get("referringVisitId").is_none());
        assert!(json.get("visitTime").is_none());
    }
}
