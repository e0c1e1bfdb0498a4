use serde_json::Value;
use shared::domain::{College, RecommendationResult, Resource, TestKind, TestOutcome, TestQuestion};

use crate::error::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Auth,
    Form,
    Test,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Auth,
    Form,
    Test,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionView {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub id: i64,
    pub prompt: String,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseRow {
    pub code: String,
    pub label: String,
    pub fit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationView {
    pub summary: String,
    pub courses: Vec<CourseRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollegeRow {
    pub name: String,
    pub website: Option<String>,
    pub city: String,
    pub country: String,
    pub ownership: &'static str,
    pub fees_per_year: String,
    pub scholarships: String,
    pub placements: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderInstruction {
    Show(Panel),
    Hide(Panel),
    Message { surface: Surface, text: String },
    TestForm {
        kind: TestKind,
        title: String,
        questions: Vec<QuestionView>,
    },
    Recommendations(RecommendationView),
    Resources(Vec<ResourceView>),
    Colleges(Vec<CollegeRow>),
    CollegeDetail(CollegeRow),
}

fn message(surface: Surface, text: impl Into<String>) -> RenderInstruction {
    RenderInstruction::Message {
        surface,
        text: text.into(),
    }
}

pub fn failure(surface: Surface, err: &FlowError, fallback: &str) -> Vec<RenderInstruction> {
    vec![message(surface, err.user_message(fallback))]
}

pub fn signed_in() -> Vec<RenderInstruction> {
    vec![RenderInstruction::Hide(Panel::Auth), RenderInstruction::Show(Panel::Form)]
}

pub fn signed_up() -> Vec<RenderInstruction> {
    vec![message(Surface::Auth, "Account created. Please login.")]
}

pub fn logged_in() -> Vec<RenderInstruction> {
    let mut out = vec![message(Surface::Auth, "Login successful")];
    out.extend(signed_in());
    out
}

pub fn logged_out() -> Vec<RenderInstruction> {
    vec![
        RenderInstruction::Show(Panel::Auth),
        RenderInstruction::Hide(Panel::Form),
        RenderInstruction::Hide(Panel::Test),
        RenderInstruction::Hide(Panel::Results),
        message(Surface::Auth, "Logged out successfully"),
    ]
}

pub fn profile_saved() -> Vec<RenderInstruction> {
    vec![message(Surface::Form, "Saved. Processing...")]
}

pub fn test_started(kind: TestKind, questions: &[TestQuestion]) -> Vec<RenderInstruction> {
    vec![
        RenderInstruction::Hide(Panel::Results),
        RenderInstruction::TestForm {
            kind,
            title: kind.title().to_string(),
            questions: questions.iter().map(question_view).collect(),
        },
        RenderInstruction::Show(Panel::Test),
        message(Surface::Test, ""),
    ]
}

fn question_view(question: &TestQuestion) -> QuestionView {
    QuestionView {
        id: question.id.0,
        prompt: format!("Q{}. {}", question.id, question.question),
        options: question
            .options
            .iter()
            .map(|(key, text)| OptionView {
                key: key.to_string(),
                label: format!("{key}) {text}"),
            })
            .collect(),
    }
}

pub fn test_submitted(outcome: &TestOutcome) -> Vec<RenderInstruction> {
    vec![
        message(Surface::Test, outcome_text(outcome)),
        RenderInstruction::Hide(Panel::Test),
    ]
}

fn outcome_text(outcome: &TestOutcome) -> String {
    match outcome {
        TestOutcome::Aptitude { score, out_of } => {
            format!("Score: {} / {}", optional(score), optional(out_of))
        }
        TestOutcome::Personality { traits } => {
            let traits = traits
                .iter()
                .map(|(name, value)| format!("{name}:{}", value_text(value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("Personality: {traits}")
        }
    }
}

pub fn recommendations(result: &RecommendationResult) -> Vec<RenderInstruction> {
    let summary = format!(
        "Personality: {} | Aptitude(0-20): {}",
        result.personality.as_deref().unwrap_or("n/a"),
        optional(&result.aptitude20)
    );
    let courses = result
        .courses
        .iter()
        .map(|course| CourseRow {
            code: course.code.clone(),
            label: format!("{} ({})", course.name, course.code),
            fit: value_text(&course.fit),
        })
        .collect();
    vec![
        RenderInstruction::Show(Panel::Results),
        RenderInstruction::Recommendations(RecommendationView { summary, courses }),
    ]
}

pub fn resources(resources: &[Resource]) -> Vec<RenderInstruction> {
    vec![RenderInstruction::Resources(
        resources
            .iter()
            .map(|resource| ResourceView {
                title: resource.title.clone(),
                url: resource.url.clone(),
            })
            .collect(),
    )]
}

pub fn colleges(colleges: &[College]) -> Vec<RenderInstruction> {
    vec![RenderInstruction::Colleges(
        colleges.iter().map(college_row).collect(),
    )]
}

pub fn college_detail(college: &College) -> Vec<RenderInstruction> {
    vec![RenderInstruction::CollegeDetail(college_row(college))]
}

fn college_row(college: &College) -> CollegeRow {
    CollegeRow {
        name: college.name.clone(),
        website: college.website.clone(),
        city: college.city.clone(),
        country: college.country.clone(),
        ownership: if college.is_government { "Govt" } else { "Private" },
        fees_per_year: optional(&college.fees_per_year),
        scholarships: college.scholarships.clone().unwrap_or_default(),
        placements: college.placements.clone().unwrap_or_default(),
    }
}

fn optional<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "n/a".to_string())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "n/a".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
