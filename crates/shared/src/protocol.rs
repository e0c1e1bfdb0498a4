use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AnswerSet, College, Course, Resource, SessionId, TestKind, TestQuestion};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTestRequest {
    pub kind: TestKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartTestResponse {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub questions: Option<Vec<TestQuestion>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSubmission {
    pub session_id: SessionId,
    pub answers: AnswerSet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AptitudeResultResponse {
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub out_of: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalityResultResponse {
    #[serde(default)]
    pub traits: Option<IndexMap<String, Value>>,
}

/// `/recommendations` takes an empty object; the bearer token selects the profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationsRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default)]
    pub aptitude20: Option<f64>,
    #[serde(default)]
    pub courses: Option<Vec<Course>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesRequest {
    pub course_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesResponse {
    #[serde(default)]
    pub resources: Option<Vec<Resource>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollegesResponse {
    #[serde(default)]
    pub colleges: Option<Vec<College>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollegeDetailResponse {
    #[serde(default)]
    pub college: Option<College>,
}
