use super::*;
use async_trait::async_trait;
use serde_json::json;
use shared::domain::{College, Course, Resource, SessionId, TestOutcome, TestQuestion};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Signup(String),
    Login(String),
    SaveProfile(Profile),
    StartTest(TestKind),
    SubmitTest(TestKind, TestSubmission),
    Recommendations,
    Resources(String),
    Colleges(CollegeQuery),
    College(CollegeId),
}

struct FakeApi {
    calls: Mutex<Vec<Call>>,
    next_session_id: Mutex<i64>,
    login_reply: Mutex<Result<String, FlowError>>,
    save_profile_failure: Mutex<Option<FlowError>>,
    start_test_failure: Mutex<Option<FlowError>>,
    submit_test_failure: Mutex<Option<FlowError>>,
    recommendations_reply: Mutex<Result<RecommendationResult, FlowError>>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_session_id: Mutex::new(40),
            login_reply: Mutex::new(Ok("tok-abc".into())),
            save_profile_failure: Mutex::new(None),
            start_test_failure: Mutex::new(None),
            submit_test_failure: Mutex::new(None),
            recommendations_reply: Mutex::new(Ok(sample_recommendations())),
        }
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }

    async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn count(&self, matcher: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().await.iter().filter(|call| matcher(call)).count()
    }
}

fn require_token(token: Option<&str>) -> Result<(), FlowError> {
    match token {
        Some(_) => Ok(()),
        None => Err(FlowError::Application("unauthorized".into())),
    }
}

fn sample_questions() -> Vec<TestQuestion> {
    vec![
        TestQuestion {
            id: QuestionId(1),
            question: "2 + 2 = ?".into(),
            options: [("A", "3"), ("B", "4"), ("C", "5")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        },
        TestQuestion {
            id: QuestionId(2),
            question: "Next in 1, 4, 9 ?".into(),
            options: [("A", "12"), ("B", "16")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        },
    ]
}

fn sample_recommendations() -> RecommendationResult {
    RecommendationResult {
        personality: Some("Analytical".into()),
        aptitude20: Some(15.0),
        courses: vec![
            Course {
                name: "Computer Science & Engineering".into(),
                code: "CSE".into(),
                fit: json!(91),
            },
            Course {
                name: "Data Science".into(),
                code: "DS".into(),
                fit: json!(84),
            },
        ],
    }
}

#[async_trait]
impl CareerApi for FakeApi {
    async fn signup(&self, credentials: &Credentials) -> Result<(), FlowError> {
        self.record(Call::Signup(credentials.email.clone())).await;
        if credentials.email == "taken@example.com" {
            return Err(FlowError::Application("email already exists".into()));
        }
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<String, FlowError> {
        self.record(Call::Login(credentials.email.clone())).await;
        self.login_reply.lock().await.clone()
    }

    async fn save_profile(&self, token: Option<&str>, profile: &Profile) -> Result<(), FlowError> {
        self.record(Call::SaveProfile(profile.clone())).await;
        require_token(token)?;
        match self.save_profile_failure.lock().await.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn start_test(
        &self,
        token: Option<&str>,
        kind: TestKind,
    ) -> Result<StartedTest, FlowError> {
        self.record(Call::StartTest(kind)).await;
        require_token(token)?;
        if let Some(err) = self.start_test_failure.lock().await.clone() {
            return Err(err);
        }
        let mut next = self.next_session_id.lock().await;
        *next += 1;
        Ok(StartedTest {
            session_id: SessionId(*next),
            questions: sample_questions(),
        })
    }

    async fn submit_test(
        &self,
        token: Option<&str>,
        kind: TestKind,
        submission: &TestSubmission,
    ) -> Result<TestOutcome, FlowError> {
        self.record(Call::SubmitTest(kind, submission.clone())).await;
        require_token(token)?;
        if let Some(err) = self.submit_test_failure.lock().await.clone() {
            return Err(err);
        }
        Ok(match kind {
            TestKind::Aptitude => TestOutcome::Aptitude {
                score: Some(submission.answers.len() as i64),
                out_of: Some(2),
            },
            TestKind::Personality => TestOutcome::Personality {
                traits: [("Analytical", json!(3)), ("Creative", json!(1))]
                    .into_iter()
                    .map(|(name, score)| (name.to_string(), score))
                    .collect(),
            },
        })
    }

    async fn recommendations(
        &self,
        token: Option<&str>,
    ) -> Result<RecommendationResult, FlowError> {
        self.record(Call::Recommendations).await;
        require_token(token)?;
        self.recommendations_reply.lock().await.clone()
    }

    async fn resources(
        &self,
        token: Option<&str>,
        course_code: &str,
    ) -> Result<Vec<Resource>, FlowError> {
        self.record(Call::Resources(course_code.to_string())).await;
        require_token(token)?;
        Ok(vec![Resource {
            title: format!("{course_code} primer"),
            url: "https://example.org/primer".into(),
        }])
    }

    async fn colleges(
        &self,
        token: Option<&str>,
        query: &CollegeQuery,
    ) -> Result<Vec<College>, FlowError> {
        self.record(Call::Colleges(query.clone())).await;
        require_token(token)?;
        Ok(Vec::new())
    }

    async fn college(
        &self,
        token: Option<&str>,
        college_id: CollegeId,
    ) -> Result<College, FlowError> {
        self.record(Call::College(college_id)).await;
        require_token(token)?;
        Err(FlowError::Application("not found".into()))
    }
}

fn profile(qualification: &str, dream_course: Option<&str>) -> Profile {
    Profile {
        highest_qualification: qualification.into(),
        stream: "Science".into(),
        board_marks: 88.0,
        city: "Bengaluru".into(),
        country: "India".into(),
        abroad: false,
        budget: 200000.0,
        dream_course: dream_course.map(str::to_string),
    }
}

async fn logged_in_controller() -> FlowController<FakeApi, MemoryTokenStore> {
    let mut controller = FlowController::new(FakeApi::new(), MemoryTokenStore::new());
    controller.login("student@example.com", "pw").await;
    controller
}

fn messages(out: &[RenderInstruction], surface: Surface) -> Vec<String> {
    out.iter()
        .filter_map(|instruction| match instruction {
            RenderInstruction::Message { surface: s, text } if *s == surface => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn has_recommendations(out: &[RenderInstruction]) -> bool {
    out.iter()
        .any(|instruction| matches!(instruction, RenderInstruction::Recommendations(_)))
}

#[tokio::test]
async fn login_persists_token_and_shows_form() {
    let mut controller = FlowController::new(FakeApi::new(), MemoryTokenStore::new());
    let out = controller.login("  student@example.com ", "pw").await;

    assert_eq!(messages(&out, Surface::Auth), vec!["Login successful"]);
    assert!(out.contains(&RenderInstruction::Hide(Panel::Auth)));
    assert!(out.contains(&RenderInstruction::Show(Panel::Form)));
    assert_eq!(controller.session().token.as_deref(), Some("tok-abc"));
    assert_eq!(controller.store().current().await.as_deref(), Some("tok-abc"));
    assert_eq!(
        controller.api().calls().await,
        vec![Call::Login("student@example.com".into())]
    );
}

#[tokio::test]
async fn failed_login_leaves_session_empty() {
    let api = FakeApi::new();
    *api.login_reply.lock().await = Err(FlowError::Application("invalid credentials".into()));
    let mut controller = FlowController::new(api, MemoryTokenStore::new());

    let out = controller.login("student@example.com", "wrong").await;

    assert_eq!(messages(&out, Surface::Auth), vec!["invalid credentials"]);
    assert!(!controller.session().is_authenticated());
    assert_eq!(controller.store().current().await, None);
}

#[tokio::test]
async fn login_transport_failure_shows_fallback() {
    let api = FakeApi::new();
    *api.login_reply.lock().await = Err(FlowError::Transport("connection refused".into()));
    let mut controller = FlowController::new(api, MemoryTokenStore::new());

    let out = controller.login("student@example.com", "pw").await;
    assert_eq!(messages(&out, Surface::Auth), vec!["Login error. Try again."]);
}

#[tokio::test]
async fn signup_reports_created_or_server_error() {
    let mut controller = FlowController::new(FakeApi::new(), MemoryTokenStore::new());
    let out = controller.signup("new@example.com", "pw").await;
    assert_eq!(messages(&out, Surface::Auth), vec!["Account created. Please login."]);

    let out = controller.signup("taken@example.com", "pw").await;
    assert_eq!(messages(&out, Surface::Auth), vec!["email already exists"]);
    assert!(!controller.session().is_authenticated());
}

#[tokio::test]
async fn restore_reads_persisted_token() {
    let mut controller =
        FlowController::new(FakeApi::new(), MemoryTokenStore::with_token("saved-token"));
    let out = controller.restore().await;
    assert_eq!(
        out,
        vec![RenderInstruction::Hide(Panel::Auth), RenderInstruction::Show(Panel::Form)]
    );
    assert_eq!(controller.session().token.as_deref(), Some("saved-token"));
}

#[tokio::test]
async fn restore_without_token_keeps_login_screen() {
    let mut controller = FlowController::new(FakeApi::new(), MemoryTokenStore::new());
    assert!(controller.restore().await.is_empty());
    assert!(!controller.session().is_authenticated());
}

#[tokio::test]
async fn class_10_profile_fetches_recommendations_without_tests() {
    for qualification in ["Class 10", " 10 ", "CLASS10"] {
        let mut controller = logged_in_controller().await;
        let out = controller.save_profile(profile(qualification, Some("CSE"))).await;

        assert_eq!(messages(&out, Surface::Form), vec!["Saved. Processing..."]);
        assert!(has_recommendations(&out));
        let api = controller.api();
        assert_eq!(api.count(|c| matches!(c, Call::StartTest(_))).await, 0);
        assert_eq!(api.count(|c| matches!(c, Call::Recommendations)).await, 1);
    }
}

#[tokio::test]
async fn dream_course_starts_aptitude_test() {
    let mut controller = logged_in_controller().await;
    let out = controller.save_profile(profile("B.Sc", Some("Engineering"))).await;

    assert!(out.iter().any(|instruction| matches!(
        instruction,
        RenderInstruction::TestForm {
            kind: TestKind::Aptitude,
            title,
            ..
        } if title == "Aptitude Test (max 20)"
    )));
    assert!(out.contains(&RenderInstruction::Show(Panel::Test)));
    assert_eq!(
        controller.session().current_test,
        Some(ActiveTest {
            kind: TestKind::Aptitude,
            session_id: SessionId(41),
        })
    );
    assert_eq!(
        controller.api().count(|c| matches!(c, Call::Recommendations)).await,
        0
    );
}

#[tokio::test]
async fn missing_or_empty_dream_course_starts_personality_test() {
    for dream_course in [None, Some("")] {
        let mut controller = logged_in_controller().await;
        controller.save_profile(profile("B.Sc", dream_course)).await;
        assert_eq!(
            controller.session().current_test.map(|t| t.kind),
            Some(TestKind::Personality)
        );
    }
}

#[tokio::test]
async fn empty_dream_course_is_sent_as_none() {
    let mut controller = logged_in_controller().await;
    controller.save_profile(profile("B.Sc", Some(""))).await;
    let calls = controller.api().calls().await;
    let Some(Call::SaveProfile(sent)) = calls.get(1) else {
        panic!("expected profile save, got {calls:?}");
    };
    assert_eq!(sent.dream_course, None);
}

#[tokio::test]
async fn failed_save_runs_no_decision_and_keeps_state() {
    let mut controller = logged_in_controller().await;
    *controller.api().save_profile_failure.lock().await =
        Some(FlowError::Transport("timed out".into()));

    let out = controller.save_profile(profile("B.Sc", Some("CSE"))).await;

    assert_eq!(messages(&out, Surface::Form), vec!["Error saving form. Try again."]);
    assert!(controller.profile().is_none());
    assert!(controller.session().current_test.is_none());
    let api = controller.api();
    assert_eq!(api.count(|c| matches!(c, Call::StartTest(_))).await, 0);
    assert_eq!(api.count(|c| matches!(c, Call::Recommendations)).await, 0);
}

#[tokio::test]
async fn failed_start_keeps_previous_test_session() {
    let mut controller = logged_in_controller().await;
    controller.start_test(TestKind::Aptitude).await;
    let before = controller.session().current_test;

    *controller.api().start_test_failure.lock().await =
        Some(FlowError::Application("invalid kind".into()));
    let out = controller.start_test(TestKind::Personality).await;

    assert_eq!(messages(&out, Surface::Form), vec!["invalid kind"]);
    assert_eq!(controller.session().current_test, before);
    assert!(controller.answer_sheet().is_some());
}

#[tokio::test]
async fn submit_sends_only_answered_questions_with_latest_choice() {
    let mut controller = logged_in_controller().await;
    controller.start_test(TestKind::Aptitude).await;

    assert!(controller.select_answer(QuestionId(1), "A").is_empty());
    assert!(controller.select_answer(QuestionId(1), "B").is_empty());
    controller.submit_test().await;

    let calls = controller.api().calls().await;
    let submission = calls
        .iter()
        .find_map(|call| match call {
            Call::SubmitTest(_, submission) => Some(submission.clone()),
            _ => None,
        })
        .expect("submit call");
    assert_eq!(submission.session_id, SessionId(41));
    assert_eq!(submission.answers.len(), 1);
    assert_eq!(submission.answers.get(QuestionId(1)), Some("B"));
    assert_eq!(submission.answers.get(QuestionId(2)), None);
}

#[tokio::test]
async fn cleared_answer_is_omitted() {
    let mut controller = logged_in_controller().await;
    controller.start_test(TestKind::Aptitude).await;
    controller.select_answer(QuestionId(2), "B");
    controller.clear_answer(QuestionId(2));

    let sheet = controller.answer_sheet().expect("sheet");
    assert!(sheet.answers().is_empty());
    assert_eq!(sheet.unanswered().count(), 2);
}

#[tokio::test]
async fn selecting_unknown_question_or_option_is_rejected() {
    let mut controller = logged_in_controller().await;
    controller.start_test(TestKind::Aptitude).await;

    let out = controller.select_answer(QuestionId(99), "A");
    assert_eq!(
        messages(&out, Surface::Test),
        vec!["Question 99 is not part of this test."]
    );
    let out = controller.select_answer(QuestionId(2), "Z");
    assert_eq!(
        messages(&out, Surface::Test),
        vec!["Option Z is not available for question 2."]
    );
    assert!(controller.answer_sheet().expect("sheet").answers().is_empty());
}

#[tokio::test]
async fn aptitude_submit_renders_score_and_chains_one_recommendation_fetch() {
    let mut controller = logged_in_controller().await;
    controller.start_test(TestKind::Aptitude).await;
    controller.select_answer(QuestionId(1), "B");

    let out = controller.submit_test().await;

    assert_eq!(messages(&out, Surface::Test), vec!["Score: 1 / 2"]);
    assert!(out.contains(&RenderInstruction::Hide(Panel::Test)));
    assert!(has_recommendations(&out));
    assert!(controller.session().current_test.is_none());
    assert!(controller.answer_sheet().is_none());
    assert_eq!(
        controller.api().count(|c| matches!(c, Call::Recommendations)).await,
        1
    );
}

#[tokio::test]
async fn personality_submit_uses_kind_recorded_at_start() {
    let mut controller = logged_in_controller().await;
    controller.start_test(TestKind::Personality).await;

    let out = controller.submit_test().await;

    assert_eq!(
        messages(&out, Surface::Test),
        vec!["Personality: Analytical:3, Creative:1"]
    );
    let calls = controller.api().calls().await;
    assert!(calls
        .iter()
        .any(|call| matches!(call, Call::SubmitTest(TestKind::Personality, _))));
}

#[tokio::test]
async fn submit_without_active_test_is_a_precondition_failure() {
    let mut controller = logged_in_controller().await;
    let out = controller.submit_test().await;

    assert_eq!(
        messages(&out, Surface::Test),
        vec!["No active test. Start a test first."]
    );
    assert_eq!(
        controller.api().count(|c| matches!(c, Call::SubmitTest(..))).await,
        0
    );
}

#[tokio::test]
async fn failed_submit_keeps_test_session_for_manual_retry() {
    let mut controller = logged_in_controller().await;
    controller.start_test(TestKind::Aptitude).await;
    controller.select_answer(QuestionId(1), "B");
    *controller.api().submit_test_failure.lock().await =
        Some(FlowError::Application("invalid session".into()));

    let out = controller.submit_test().await;

    assert_eq!(messages(&out, Surface::Test), vec!["invalid session"]);
    assert!(!has_recommendations(&out));
    assert!(controller.session().current_test.is_some());
    assert_eq!(
        controller
            .answer_sheet()
            .expect("sheet")
            .answers()
            .get(QuestionId(1)),
        Some("B")
    );
    assert_eq!(
        controller.api().count(|c| matches!(c, Call::Recommendations)).await,
        0
    );
}

#[tokio::test]
async fn submit_success_with_failed_recommendations_still_clears_test() {
    let mut controller = logged_in_controller().await;
    controller.start_test(TestKind::Aptitude).await;
    *controller.api().recommendations_reply.lock().await =
        Err(FlowError::Application("please submit form first".into()));

    let out = controller.submit_test().await;

    assert_eq!(messages(&out, Surface::Test), vec!["Score: 0 / 2"]);
    assert_eq!(messages(&out, Surface::Form), vec!["please submit form first"]);
    assert!(controller.session().current_test.is_none());
}

#[tokio::test]
async fn failed_recommendations_keep_previous_result() {
    let mut controller = logged_in_controller().await;
    controller.fetch_recommendations().await;
    controller.select_course("DS");

    *controller.api().recommendations_reply.lock().await =
        Err(FlowError::Decode("expected value at line 1".into()));
    let out = controller.fetch_recommendations().await;

    assert_eq!(messages(&out, Surface::Form), vec!["Failed to get recommendations."]);
    assert_eq!(controller.recommendations(), Some(&sample_recommendations()));
    assert_eq!(controller.selected_course(), Some("DS"));
}

#[tokio::test]
async fn only_recommended_course_codes_can_be_selected() {
    let mut controller = logged_in_controller().await;
    let out = controller.select_course("CSE");
    assert_eq!(messages(&out, Surface::Form), vec!["Get recommendations first."]);

    controller.fetch_recommendations().await;
    let out = controller.select_course("LAW");
    assert_eq!(
        messages(&out, Surface::Form),
        vec!["Course LAW is not among the recommendations."]
    );
    assert_eq!(controller.selected_course(), None);

    assert!(controller.select_course("CSE").is_empty());
    assert_eq!(controller.selected_course(), Some("CSE"));
}

#[tokio::test]
async fn codeless_course_row_cannot_be_selected() {
    let mut controller = logged_in_controller().await;
    let mut result = sample_recommendations();
    result.courses.push(Course {
        name: "Unlisted".into(),
        code: String::new(),
        fit: json!(null),
    });
    *controller.api().recommendations_reply.lock().await = Ok(result);
    controller.fetch_recommendations().await;

    let out = controller.select_course("");
    assert_eq!(
        messages(&out, Surface::Form),
        vec!["Select a recommended course first."]
    );
    assert_eq!(controller.selected_course(), None);
}

#[tokio::test]
async fn dependent_lookups_require_a_selected_course() {
    let mut controller = logged_in_controller().await;
    controller.fetch_recommendations().await;

    let out = controller.load_resources().await;
    assert_eq!(
        messages(&out, Surface::Form),
        vec!["Select a recommended course first."]
    );
    let out = controller.load_colleges().await;
    assert_eq!(
        messages(&out, Surface::Form),
        vec!["Select a recommended course first."]
    );
    assert_eq!(
        controller
            .api()
            .count(|c| matches!(c, Call::Resources(_) | Call::Colleges(_)))
            .await,
        0
    );
}

#[tokio::test]
async fn college_lookup_uses_profile_fields_and_forces_both_filters() {
    let mut controller = logged_in_controller().await;
    let mut submitted = profile("10", None);
    submitted.abroad = true;
    submitted.country = "India".into();
    controller.save_profile(submitted).await;
    controller.select_course("CSE");

    let colleges = controller.load_colleges().await;
    let resources = controller.load_resources().await;

    assert_eq!(colleges, vec![RenderInstruction::Colleges(Vec::new())]);
    assert!(matches!(
        &resources[0],
        RenderInstruction::Resources(items) if items[0].title == "CSE primer"
    ));
    let calls = controller.api().calls().await;
    let query = calls
        .iter()
        .find_map(|call| match call {
            Call::Colleges(query) => Some(query.clone()),
            _ => None,
        })
        .expect("college query");
    assert_eq!(
        query,
        CollegeQuery {
            course_code: "CSE".into(),
            city: "Bengaluru".into(),
            country: "India".into(),
            abroad: true,
            budget: 200000.0,
            include_private: true,
            include_government: true,
        }
    );
}

#[tokio::test]
async fn colleges_need_a_saved_profile() {
    let mut controller = logged_in_controller().await;
    controller.fetch_recommendations().await;
    controller.select_course("DS");

    let out = controller.load_colleges().await;
    assert_eq!(messages(&out, Surface::Form), vec!["Submit your profile first."]);
}

#[tokio::test]
async fn college_detail_failure_is_rendered() {
    let mut controller = logged_in_controller().await;
    let out = controller.load_college(CollegeId(5)).await;
    assert_eq!(messages(&out, Surface::Form), vec!["not found"]);
}

#[tokio::test]
async fn logout_clears_token_and_later_calls_fail_gracefully() {
    let mut controller = logged_in_controller().await;
    controller.start_test(TestKind::Aptitude).await;

    let out = controller.logout().await;

    assert_eq!(out[0], RenderInstruction::Show(Panel::Auth));
    assert!(out.contains(&RenderInstruction::Hide(Panel::Form)));
    assert!(out.contains(&RenderInstruction::Hide(Panel::Results)));
    assert_eq!(messages(&out, Surface::Auth), vec!["Logged out successfully"]);
    assert_eq!(controller.store().current().await, None);
    assert_eq!(controller.session(), &Session::default());

    let out = controller.fetch_recommendations().await;
    assert_eq!(messages(&out, Surface::Form), vec!["unauthorized"]);
}
