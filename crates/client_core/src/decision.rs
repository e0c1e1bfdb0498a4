use shared::domain::{Profile, TestKind};

/// Qualifications that skip testing entirely. Compared after trimming and lower-casing.
const CLASS_10_QUALIFICATIONS: [&str; 3] = ["class 10", "10", "class10"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDecision {
    DirectRecommendations,
    Test(TestKind),
}

pub fn decide_flow(profile: &Profile) -> FlowDecision {
    let qualification = profile.highest_qualification.trim().to_lowercase();
    if CLASS_10_QUALIFICATIONS.contains(&qualification.as_str()) {
        return FlowDecision::DirectRecommendations;
    }

    match profile.dream_course.as_deref() {
        Some(course) if !course.is_empty() => FlowDecision::Test(TestKind::Aptitude),
        _ => FlowDecision::Test(TestKind::Personality),
    }
}
