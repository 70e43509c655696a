//! Wire types for the gap-analysis request and the structured report it
//! returns. Field names match the backend schema exactly.

use serde::{Deserialize, Serialize};

/// Request body for `POST /analyze/jd-gap`.
///
/// Deliberately has no credential field: the access key travels only as a
/// request header, never inside this payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapRequest {
    pub session_id: String,
    pub jd_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_role: Option<String>,
}

/// Priority of a single gap, as assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A matching strength between the résumé and the job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strength {
    pub point: String,
    pub evidence: String,
}

/// A mismatch between résumé content and a JD requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub point: String,
    pub priority: Priority,
    pub suggestion: String,
}

/// A JD keyword with matching evidence and a phrasing suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub jd_keyword: String,
    #[serde(default)]
    pub evidence: Option<String>,
    pub recommended_phrase: String,
}

/// Full gap report. List ordering reflects backend-determined priority and
/// must be preserved for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    /// 0–100; the backend schema already constrains the range.
    pub match_score: u8,
    pub summary: String,
    pub strengths: Vec<Strength>,
    pub gaps: Vec<Gap>,
    pub keywords: Vec<Keyword>,
    pub craft_questions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_serde_lowercase() {
        assert_eq!(serde_json::from_str::<Priority>(r#""high""#).unwrap(), Priority::High);
        assert_eq!(serde_json::from_str::<Priority>(r#""medium""#).unwrap(), Priority::Medium);
        assert_eq!(serde_json::from_str::<Priority>(r#""low""#).unwrap(), Priority::Low);
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), r#""high""#);
    }

    #[test]
    fn test_gap_request_omits_absent_target_role() {
        let req = GapRequest {
            session_id: "s1".to_string(),
            jd_text: "a".repeat(60),
            target_role: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("target_role").is_none());
    }

    #[test]
    fn test_gap_request_body_never_contains_credential_field() {
        let req = GapRequest {
            session_id: "s1".to_string(),
            jd_text: "x".repeat(60),
            target_role: Some("Backend Engineer".to_string()),
        };
        let json = serde_json::to_value(&req).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["jd_text", "session_id", "target_role"]);
    }

    #[test]
    fn test_gap_report_deserializes_full_wire_format() {
        let json = r#"{
            "match_score": 72,
            "summary": "Solid backend fit with gaps in cloud infrastructure.",
            "strengths": [
                {"point": "Rust expertise", "evidence": "4 years building services"}
            ],
            "gaps": [
                {"point": "No Kubernetes experience", "priority": "high", "suggestion": "Highlight container work"},
                {"point": "Limited SQL tuning", "priority": "low", "suggestion": "Mention query optimization"}
            ],
            "keywords": [
                {"jd_keyword": "gRPC", "evidence": "internal RPC framework", "recommended_phrase": "designed gRPC services"},
                {"jd_keyword": "Terraform", "recommended_phrase": "infrastructure as code"}
            ],
            "craft_questions": ["Have you led an on-call rotation?"]
        }"#;
        let report: GapReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.match_score, 72);
        assert_eq!(report.gaps.len(), 2);
        assert_eq!(report.gaps[0].priority, Priority::High);
        assert_eq!(report.keywords[1].evidence, None);
        assert_eq!(report.craft_questions.len(), 1);
    }

    #[test]
    fn test_gap_report_preserves_gap_order() {
        let json = r#"{
            "match_score": 50,
            "summary": "",
            "strengths": [],
            "gaps": [
                {"point": "b", "priority": "medium", "suggestion": ""},
                {"point": "a", "priority": "high", "suggestion": ""},
                {"point": "c", "priority": "low", "suggestion": ""}
            ],
            "keywords": [],
            "craft_questions": []
        }"#;
        let report: GapReport = serde_json::from_str(json).unwrap();
        let points: Vec<&str> = report.gaps.iter().map(|g| g.point.as_str()).collect();
        assert_eq!(points, ["b", "a", "c"]);
    }
}
