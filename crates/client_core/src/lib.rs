use shared::{
    domain::{
        CollegeId, CollegeQuery, Profile, QuestionId, RecommendationResult, TestKind,
    },
    protocol::{Credentials, TestSubmission},
};
use tracing::{debug, info, warn};

pub mod decision;
pub mod error;
pub mod protocol_client;
pub mod render;
pub mod token_store;
pub mod transport;
pub mod types;

pub use decision::{decide_flow, FlowDecision};
pub use error::{FlowError, FlowErrorKind};
pub use protocol_client::{CareerApi, HttpCareerApi, StartedTest};
pub use render::{Panel, RenderInstruction, Surface};
pub use token_store::{MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use transport::ApiBase;
pub use types::{ActiveTest, AnswerSheet, SelectionError, Session};

const SIGNUP_FAILED: &str = "Signup failed. Try again.";
const LOGIN_FAILED: &str = "Login error. Try again.";
const SAVE_PROFILE_FAILED: &str = "Error saving form. Try again.";
const START_TEST_FAILED: &str = "Cannot start test. Try again.";
const SUBMIT_TEST_FAILED: &str = "Error submitting test. Try again.";
const RECOMMENDATIONS_FAILED: &str = "Failed to get recommendations.";
const RESOURCES_FAILED: &str = "Failed to load resources.";
const COLLEGES_FAILED: &str = "Failed to load colleges.";
const COLLEGE_FAILED: &str = "Failed to load college.";

const NO_ACTIVE_TEST: &str = "No active test. Start a test first.";
const NO_RECOMMENDATIONS: &str = "Get recommendations first.";
const NO_COURSE_SELECTED: &str = "Select a recommended course first.";
const NO_PROFILE: &str = "Submit your profile first.";

/// Operations never return errors: each failure is logged and rendered as a
/// message, and the controller state is left as it was before the call.
pub struct FlowController<A: CareerApi, S: TokenStore> {
    api: A,
    store: S,
    session: Session,
    profile: Option<Profile>,
    sheet: Option<AnswerSheet>,
    recommendations: Option<RecommendationResult>,
    selected_course: Option<String>,
}

impl<A: CareerApi, S: TokenStore> FlowController<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Self {
            api,
            store,
            session: Session::default(),
            profile: None,
            sheet: None,
            recommendations: None,
            selected_course: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn answer_sheet(&self) -> Option<&AnswerSheet> {
        self.sheet.as_ref()
    }

    pub fn recommendations(&self) -> Option<&RecommendationResult> {
        self.recommendations.as_ref()
    }

    pub fn selected_course(&self) -> Option<&str> {
        self.selected_course.as_deref()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn restore(&mut self) -> Vec<RenderInstruction> {
        match self.store.load_token().await {
            Ok(Some(token)) => {
                info!("restored persisted session");
                self.session.token = Some(token);
                render::signed_in()
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read persisted token");
                Vec::new()
            }
        }
    }

    pub async fn signup(&mut self, email: &str, password: &str) -> Vec<RenderInstruction> {
        let credentials = credentials(email, password);
        match self.api.signup(&credentials).await {
            Ok(()) => {
                info!(email = %credentials.email, "account created");
                render::signed_up()
            }
            Err(err) => fail(Surface::Auth, "signup", &err, SIGNUP_FAILED),
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Vec<RenderInstruction> {
        let credentials = credentials(email, password);
        let token = match self.api.login(&credentials).await {
            Ok(token) => token,
            Err(err) => return fail(Surface::Auth, "login", &err, LOGIN_FAILED),
        };

        if let Err(err) = self.store.save_token(&token).await {
            warn!(error = %err, "failed to persist session token");
        }
        self.reset_flow();
        self.session.token = Some(token);
        info!(email = %credentials.email, "logged in");
        render::logged_in()
    }

    pub async fn logout(&mut self) -> Vec<RenderInstruction> {
        if let Err(err) = self.store.clear_token().await {
            warn!(error = %err, "failed to remove persisted session token");
        }
        self.reset_flow();
        self.session.token = None;
        info!("logged out");
        render::logged_out()
    }

    /// Saves the profile, then starts whichever branch [`decide_flow`] picks.
    pub async fn save_profile(&mut self, profile: Profile) -> Vec<RenderInstruction> {
        let profile = profile.normalized();
        if let Err(err) = self.api.save_profile(self.token(), &profile).await {
            return fail(Surface::Form, "save_profile", &err, SAVE_PROFILE_FAILED);
        }

        let decision = decide_flow(&profile);
        info!(?decision, "profile saved");
        self.profile = Some(profile);

        let mut out = render::profile_saved();
        match decision {
            FlowDecision::DirectRecommendations => out.extend(self.fetch_recommendations().await),
            FlowDecision::Test(kind) => out.extend(self.start_test(kind).await),
        }
        out
    }

    pub async fn start_test(&mut self, kind: TestKind) -> Vec<RenderInstruction> {
        let started = match self.api.start_test(self.token(), kind).await {
            Ok(started) => started,
            Err(err) => return fail(Surface::Form, "start_test", &err, START_TEST_FAILED),
        };

        info!(
            %kind,
            session_id = started.session_id.0,
            questions = started.questions.len(),
            "test started"
        );
        self.session.current_test = Some(ActiveTest {
            kind,
            session_id: started.session_id,
        });
        let sheet = AnswerSheet::new(started.questions);
        let out = render::test_started(kind, sheet.questions());
        self.sheet = Some(sheet);
        out
    }

    pub fn select_answer(&mut self, question_id: QuestionId, key: &str) -> Vec<RenderInstruction> {
        let Some(sheet) = self.sheet.as_mut() else {
            return precondition(Surface::Test, "select_answer", NO_ACTIVE_TEST);
        };
        match sheet.select(question_id, key) {
            Ok(()) => {
                debug!(question_id = question_id.0, key, "answer selected");
                Vec::new()
            }
            Err(err) => precondition(Surface::Test, "select_answer", &err.to_string()),
        }
    }

    pub fn clear_answer(&mut self, question_id: QuestionId) -> Vec<RenderInstruction> {
        let Some(sheet) = self.sheet.as_mut() else {
            return precondition(Surface::Test, "clear_answer", NO_ACTIVE_TEST);
        };
        if sheet.clear(question_id) {
            debug!(question_id = question_id.0, "answer cleared");
        }
        Vec::new()
    }

    pub async fn submit_test(&mut self) -> Vec<RenderInstruction> {
        let Some(active) = self.session.current_test else {
            return precondition(Surface::Test, "submit_test", NO_ACTIVE_TEST);
        };
        let submission = TestSubmission {
            session_id: active.session_id,
            answers: self
                .sheet
                .as_ref()
                .map(|sheet| sheet.answers().clone())
                .unwrap_or_default(),
        };

        let outcome = match self
            .api
            .submit_test(self.token(), active.kind, &submission)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => return fail(Surface::Test, "submit_test", &err, SUBMIT_TEST_FAILED),
        };

        info!(
            kind = %outcome.kind(),
            session_id = active.session_id.0,
            answered = submission.answers.len(),
            "test submitted"
        );
        self.session.current_test = None;
        self.sheet = None;

        let mut out = render::test_submitted(&outcome);
        out.extend(self.fetch_recommendations().await);
        out
    }

    pub async fn fetch_recommendations(&mut self) -> Vec<RenderInstruction> {
        let result = match self.api.recommendations(self.token()).await {
            Ok(result) => result,
            Err(err) => {
                return fail(Surface::Form, "recommendations", &err, RECOMMENDATIONS_FAILED)
            }
        };

        info!(courses = result.courses.len(), "recommendations received");
        let out = render::recommendations(&result);
        self.recommendations = Some(result);
        self.selected_course = None;
        out
    }

    pub fn select_course(&mut self, code: &str) -> Vec<RenderInstruction> {
        let Some(result) = self.recommendations.as_ref() else {
            return precondition(Surface::Form, "select_course", NO_RECOMMENDATIONS);
        };
        if code.is_empty() {
            return precondition(Surface::Form, "select_course", NO_COURSE_SELECTED);
        }
        if !result.offers_course(code) {
            let text = format!("Course {code} is not among the recommendations.");
            return precondition(Surface::Form, "select_course", &text);
        }
        debug!(course_code = code, "course selected");
        self.selected_course = Some(code.to_string());
        Vec::new()
    }

    pub async fn load_resources(&mut self) -> Vec<RenderInstruction> {
        let Some(code) = self.selected_course.as_deref() else {
            return precondition(Surface::Form, "resources", NO_COURSE_SELECTED);
        };
        match self.api.resources(self.token(), code).await {
            Ok(resources) => render::resources(&resources),
            Err(err) => fail(Surface::Form, "resources", &err, RESOURCES_FAILED),
        }
    }

    pub async fn load_colleges(&mut self) -> Vec<RenderInstruction> {
        let Some(code) = self.selected_course.as_deref() else {
            return precondition(Surface::Form, "colleges", NO_COURSE_SELECTED);
        };
        let Some(profile) = self.profile.as_ref() else {
            return precondition(Surface::Form, "colleges", NO_PROFILE);
        };
        let query = CollegeQuery::for_course(code, profile);
        match self.api.colleges(self.token(), &query).await {
            Ok(colleges) => render::colleges(&colleges),
            Err(err) => fail(Surface::Form, "colleges", &err, COLLEGES_FAILED),
        }
    }

    pub async fn load_college(&mut self, college_id: CollegeId) -> Vec<RenderInstruction> {
        match self.api.college(self.token(), college_id).await {
            Ok(college) => render::college_detail(&college),
            Err(err) => fail(Surface::Form, "college", &err, COLLEGE_FAILED),
        }
    }

    fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    fn reset_flow(&mut self) {
        self.session.current_test = None;
        self.profile = None;
        self.sheet = None;
        self.recommendations = None;
        self.selected_course = None;
    }
}

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials {
        email: email.trim().to_string(),
        password: password.to_string(),
    }
}

fn fail(
    surface: Surface,
    operation: &'static str,
    err: &FlowError,
    fallback: &str,
) -> Vec<RenderInstruction> {
    warn!(operation, kind = ?err.kind(), error = %err, "operation failed");
    render::failure(surface, err, fallback)
}

fn precondition(surface: Surface, operation: &'static str, text: &str) -> Vec<RenderInstruction> {
    let err = FlowError::Precondition(text.to_string());
    fail(surface, operation, &err, text)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/protocol_client_tests.rs"]
mod protocol_client_tests;
