use shared::domain::{AnswerSet, QuestionId, SessionId, TestKind, TestQuestion};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTest {
    pub kind: TestKind,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub current_test: Option<ActiveTest>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerSheet {
    questions: Vec<TestQuestion>,
    answers: AnswerSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Question {0} is not part of this test.")]
    UnknownQuestion(QuestionId),
    #[error("Option {key} is not available for question {question_id}.")]
    UnknownOption { question_id: QuestionId, key: String },
}

impl AnswerSheet {
    pub fn new(questions: Vec<TestQuestion>) -> Self {
        Self {
            questions,
            answers: AnswerSet::new(),
        }
    }

    pub fn questions(&self) -> &[TestQuestion] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn select(&mut self, question_id: QuestionId, key: &str) -> Result<(), SelectionError> {
        let question = self
            .questions
            .iter()
            .find(|question| question.id == question_id)
            .ok_or(SelectionError::UnknownQuestion(question_id))?;
        if !question.options.contains_key(key) {
            return Err(SelectionError::UnknownOption {
                question_id,
                key: key.to_string(),
            });
        }
        self.answers.select(question_id, key);
        Ok(())
    }

    pub fn clear(&mut self, question_id: QuestionId) -> bool {
        self.answers.clear(question_id).is_some()
    }

    pub fn unanswered(&self) -> impl Iterator<Item = &TestQuestion> {
        self.questions
            .iter()
            .filter(|question| self.answers.get(question.id).is_none())
    }
}
