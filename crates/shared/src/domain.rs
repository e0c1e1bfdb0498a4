use std::{collections::BTreeMap, fmt, marker::PhantomData, str::FromStr};

use indexmap::{map::Entry, IndexMap};
use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_json::Value;

use crate::error::UnknownTestKind;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(QuestionId);
id_newtype!(SessionId);
id_newtype!(CollegeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Aptitude,
    Personality,
}

impl TestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Aptitude => "aptitude",
            TestKind::Personality => "personality",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            TestKind::Aptitude => "Aptitude Test (max 20)",
            TestKind::Personality => "Personality Test (max 20)",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = UnknownTestKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aptitude" => Ok(TestKind::Aptitude),
            "personality" => Ok(TestKind::Personality),
            _ => Err(UnknownTestKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub highest_qualification: String,
    pub stream: String,
    pub board_marks: f64,
    pub city: String,
    pub country: String,
    pub abroad: bool,
    pub budget: f64,
    pub dream_course: Option<String>,
}

impl Profile {
    /// An empty dream course means "no dream course" on the wire.
    pub fn normalized(mut self) -> Self {
        if self.dream_course.as_deref().is_some_and(str::is_empty) {
            self.dream_course = None;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestQuestion {
    pub id: QuestionId,
    pub question: String,
    #[serde(deserialize_with = "unique_keys")]
    pub options: IndexMap<String, String>,
}

/// Chosen option key per question. Unanswered questions are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<QuestionId, String>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, question_id: QuestionId, key: impl Into<String>) {
        self.0.insert(question_id, key.into());
    }

    pub fn clear(&mut self, question_id: QuestionId) -> Option<String> {
        self.0.remove(&question_id)
    }

    pub fn get(&self, question_id: QuestionId) -> Option<&str> {
        self.0.get(&question_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &str)> {
        self.0.iter().map(|(id, key)| (*id, key.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    Aptitude {
        score: Option<i64>,
        out_of: Option<i64>,
    },
    Personality {
        traits: IndexMap<String, Value>,
    },
}

impl TestOutcome {
    pub fn kind(&self) -> TestKind {
        match self {
            TestOutcome::Aptitude { .. } => TestKind::Aptitude,
            TestOutcome::Personality { .. } => TestKind::Personality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub code: String,
    /// Backend-computed suitability; opaque to the client.
    #[serde(default)]
    pub fit: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub personality: Option<String>,
    pub aptitude20: Option<f64>,
    pub courses: Vec<Course>,
}

impl RecommendationResult {
    pub fn offers_course(&self, code: &str) -> bool {
        !code.is_empty() && self.courses.iter().any(|course| course.code == code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollegeQuery {
    pub course_code: String,
    pub city: String,
    pub country: String,
    pub abroad: bool,
    pub budget: f64,
    pub include_private: bool,
    pub include_government: bool,
}

impl CollegeQuery {
    /// Builds the lookup from the submitted profile. Both ownership filters stay on.
    pub fn for_course(course_code: impl Into<String>, profile: &Profile) -> Self {
        Self {
            course_code: course_code.into(),
            city: profile.city.clone(),
            country: profile.country.clone(),
            abroad: profile.abroad,
            budget: profile.budget,
            include_private: true,
            include_government: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct College {
    #[serde(default)]
    pub id: Option<CollegeId>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub city: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub country: String,
    #[serde(default, deserialize_with = "flag_or_int")]
    pub is_government: bool,
    #[serde(default)]
    pub fees_per_year: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub scholarships: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub placements: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub website: Option<String>,
}

// SQLite-backed servers report booleans as 0/1.
fn flag_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Ok(flag),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected boolean or 0/1, got {other}"
        ))),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

// Raw database rows may carry NULL in any column.
fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn unique_keys<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueKeys<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeys<V> {
        type Value = IndexMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object with unique keys")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or_default());
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                match map.entry(key) {
                    Entry::Occupied(entry) => {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate key '{}'",
                            entry.key()
                        )))
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(value);
                    }
                }
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueKeys(PhantomData))
}
