use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        College, CollegeId, CollegeQuery, Profile, RecommendationResult, Resource, TestKind,
        TestOutcome, TestQuestion,
    },
    protocol::{
        AptitudeResultResponse, CollegeDetailResponse, CollegesResponse, Credentials,
        LoginResponse, PersonalityResultResponse, RecommendationsRequest,
        RecommendationsResponse, ResourcesRequest, ResourcesResponse, StartTestRequest,
        StartTestResponse, TestSubmission,
    },
};
use tracing::debug;

use crate::{
    error::FlowError,
    transport::{decode_response, ApiBase},
};

#[derive(Debug, Clone, PartialEq)]
pub struct StartedTest {
    pub session_id: shared::domain::SessionId,
    pub questions: Vec<TestQuestion>,
}

/// `token` is the bearer credential; `None` sends the request unauthenticated
/// and lets the backend reject it.
#[async_trait]
pub trait CareerApi: Send + Sync {
    async fn signup(&self, credentials: &Credentials) -> Result<(), FlowError>;
    async fn login(&self, credentials: &Credentials) -> Result<String, FlowError>;
    async fn save_profile(&self, token: Option<&str>, profile: &Profile) -> Result<(), FlowError>;
    async fn start_test(&self, token: Option<&str>, kind: TestKind)
        -> Result<StartedTest, FlowError>;
    /// `kind` must be the kind the session was started with; it selects how the reply is read.
    async fn submit_test(
        &self,
        token: Option<&str>,
        kind: TestKind,
        submission: &TestSubmission,
    ) -> Result<TestOutcome, FlowError>;
    async fn recommendations(&self, token: Option<&str>)
        -> Result<RecommendationResult, FlowError>;
    async fn resources(&self, token: Option<&str>, course_code: &str)
        -> Result<Vec<Resource>, FlowError>;
    async fn colleges(&self, token: Option<&str>, query: &CollegeQuery)
        -> Result<Vec<College>, FlowError>;
    async fn college(&self, token: Option<&str>, college_id: CollegeId)
        -> Result<College, FlowError>;
}

pub struct HttpCareerApi {
    http: Client,
    base: ApiBase,
}

impl HttpCareerApi {
    pub fn new(base: ApiBase) -> Self {
        Self {
            http: Client::new(),
            base,
        }
    }

    pub fn with_timeout(base: ApiBase, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &ApiBase {
        &self.base
    }

    fn post(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        let request = self.http.post(self.base.endpoint(path));
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, FlowError> {
        debug!(path, authenticated = token.is_some(), "POST");
        let response = self.post(path, token).json(body).send().await?;
        decode_response(response).await
    }
}

#[async_trait]
impl CareerApi for HttpCareerApi {
    async fn signup(&self, credentials: &Credentials) -> Result<(), FlowError> {
        let _: serde_json::Value = self.post_json("signup", None, credentials).await?;
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<String, FlowError> {
        let body: LoginResponse = self.post_json("login", None, credentials).await?;
        body.token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| FlowError::Application("Login failed".into()))
    }

    async fn save_profile(&self, token: Option<&str>, profile: &Profile) -> Result<(), FlowError> {
        let _: serde_json::Value = self.post_json("form", token, profile).await?;
        Ok(())
    }

    async fn start_test(
        &self,
        token: Option<&str>,
        kind: TestKind,
    ) -> Result<StartedTest, FlowError> {
        let body: StartTestResponse = self
            .post_json("test/start", token, &StartTestRequest { kind })
            .await?;
        let session_id = body
            .session_id
            .ok_or_else(|| FlowError::Application("Unable to start test".into()))?;
        let questions = body
            .questions
            .ok_or_else(|| FlowError::Decode("test start reply has no questions".into()))?;
        Ok(StartedTest {
            session_id,
            questions,
        })
    }

    async fn submit_test(
        &self,
        token: Option<&str>,
        kind: TestKind,
        submission: &TestSubmission,
    ) -> Result<TestOutcome, FlowError> {
        match kind {
            TestKind::Aptitude => {
                let body: AptitudeResultResponse =
                    self.post_json("test/submit", token, submission).await?;
                Ok(TestOutcome::Aptitude {
                    score: body.score,
                    out_of: body.out_of,
                })
            }
            TestKind::Personality => {
                let body: PersonalityResultResponse =
                    self.post_json("test/submit", token, submission).await?;
                Ok(TestOutcome::Personality {
                    traits: body.traits.unwrap_or_default(),
                })
            }
        }
    }

    async fn recommendations(
        &self,
        token: Option<&str>,
    ) -> Result<RecommendationResult, FlowError> {
        let body: RecommendationsResponse = self
            .post_json("recommendations", token, &RecommendationsRequest {})
            .await?;
        let courses = body
            .courses
            .ok_or_else(|| FlowError::Application("Error getting recommendations.".into()))?;
        Ok(RecommendationResult {
            personality: body.personality,
            aptitude20: body.aptitude20,
            courses,
        })
    }

    async fn resources(
        &self,
        token: Option<&str>,
        course_code: &str,
    ) -> Result<Vec<Resource>, FlowError> {
        let body: ResourcesResponse = self
            .post_json(
                "resources",
                token,
                &ResourcesRequest {
                    course_code: course_code.to_string(),
                },
            )
            .await?;
        Ok(body.resources.unwrap_or_default())
    }

    async fn colleges(
        &self,
        token: Option<&str>,
        query: &CollegeQuery,
    ) -> Result<Vec<College>, FlowError> {
        let body: CollegesResponse = self.post_json("colleges", token, query).await?;
        Ok(body.colleges.unwrap_or_default())
    }

    async fn college(
        &self,
        token: Option<&str>,
        college_id: CollegeId,
    ) -> Result<College, FlowError> {
        debug!(college_id = college_id.0, "GET college");
        let mut request = self
            .http
            .get(self.base.endpoint("college"))
            .query(&[("id", college_id.0)]);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let body: CollegeDetailResponse = decode_response(response).await?;
        body.college
            .ok_or_else(|| FlowError::Application("not found".into()))
    }
}
