// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use thiserror::Error;
use validator::Validate;

use crate::utils::html::clean_html;

/// Namespace of bundled question ids.
pub const BUNDLED_ID_PREFIX: &str = "bundled:";

/// Identifier of a question inside a pool.
///
/// Remote documents carry numeric ids, older stored reports may carry
/// string ids. `1` and `"1"` are different identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionId::Number(n) => write!(f, "{}", n),
            QuestionId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for QuestionId {
    fn from(value: i64) -> Self {
        QuestionId::Number(value)
    }
}

impl QuestionId {
    /// Id of a question from the bundled list. Remote rows are always
    /// numeric, so the two sources never share an id.
    pub fn bundled(raw: &QuestionId) -> Self {
        QuestionId::Text(format!("{}{}", BUNDLED_ID_PREFIX, raw))
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        QuestionId::Text(value.to_string())
    }
}

/// Difficulty label. Serialized capitalized, parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(QuestionError::UnknownDifficulty(s.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuestionError {
    #[error("question has no options")]
    NoOptions,
    #[error("correct option '{0}' is not one of the options")]
    CorrectOptionMissing(String),
    #[error("unknown difficulty label '{0}'")]
    UnknownDifficulty(String),
}

/// A quiz question as presented inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub options: Vec<String>,
    pub correct_option: String,
    pub explanation: String,
    pub difficulty: Difficulty,
}

impl Question {
    /// Builds a question, checking that the correct option is one of the options.
    pub fn new(
        id: QuestionId,
        prompt: String,
        image: Option<String>,
        options: Vec<String>,
        correct_option: String,
        explanation: String,
        difficulty: Difficulty,
    ) -> Result<Self, QuestionError> {
        if options.is_empty() {
            return Err(QuestionError::NoOptions);
        }
        if !options.contains(&correct_option) {
            return Err(QuestionError::CorrectOptionMissing(correct_option));
        }

        Ok(Self {
            id,
            prompt,
            image: image.filter(|i| !i.trim().is_empty()),
            options,
            correct_option,
            explanation,
            difficulty,
        })
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// Row of the 'questions' table in the remote collection.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionDocument {
    pub id: i64,
    pub lesson_id: String,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: String,
    pub explanation: String,
    pub difficulty_level: String,
    pub image_url: Option<String>,
}

impl TryFrom<QuestionDocument> for Question {
    type Error = QuestionError;

    fn try_from(doc: QuestionDocument) -> Result<Self, Self::Error> {
        let difficulty = doc.difficulty_level.parse()?;
        Question::new(
            QuestionId::Number(doc.id),
            doc.question,
            doc.image_url,
            doc.options.0,
            doc.correct_answer,
            doc.explanation,
            difficulty,
        )
    }
}

/// Question shape of the bundled fallback file.
#[derive(Debug, Clone, Deserialize)]
pub struct BundledQuestion {
    pub id: QuestionId,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
    pub difficulty_level: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl TryFrom<BundledQuestion> for Question {
    type Error = QuestionError;

    fn try_from(q: BundledQuestion) -> Result<Self, Self::Error> {
        let difficulty = q.difficulty_level.parse()?;
        Question::new(
            QuestionId::bundled(&q.id),
            q.question,
            q.image,
            q.options,
            q.answer,
            q.explanation,
            difficulty,
        )
    }
}

/// DTO for sending a question to the student (excludes answer and explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: QuestionId,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question: q.prompt.clone(),
            image: q.image.clone(),
            options: q.options.clone(),
            difficulty: q.difficulty,
        }
    }
}

/// One element of an admin question upload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadQuestion {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub explanation: String,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,
    #[validate(custom(function = validate_image))]
    pub image: Option<String>,
}

/// A validated, sanitized question ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub image_url: Option<String>,
}

impl UploadQuestion {
    /// Validates the element and sanitizes its text for storage.
    /// The answer is checked after sanitizing so it still matches its option.
    pub fn into_new_question(self) -> Result<NewQuestion, String> {
        self.validate().map_err(|e| e.to_string())?;

        let options: Vec<String> = self.options.iter().map(|o| clean_html(o)).collect();
        let correct_answer = clean_html(&self.answer);
        if !options.contains(&correct_answer) {
            return Err(format!("answer '{}' is not one of the options", self.answer));
        }
        let difficulty = self
            .difficulty
            .parse::<Difficulty>()
            .map_err(|e| e.to_string())?;

        Ok(NewQuestion {
            question: clean_html(&self.question),
            options,
            correct_answer,
            explanation: clean_html(&self.explanation),
            difficulty,
            image_url: self.image,
        })
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    if options.len() > 10 {
        return Err(validator::ValidationError::new("too_many_options"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("option_length"));
        }
    }
    Ok(())
}

fn validate_difficulty(difficulty: &str) -> Result<(), validator::ValidationError> {
    difficulty
        .parse::<Difficulty>()
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("unknown_difficulty"))
}

fn validate_image(image: &str) -> Result<(), validator::ValidationError> {
    match url::Url::parse(image) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
        _ => Err(validator::ValidationError::new("image_must_be_http_url")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["North".to_string(), "South".to_string()]
    }

    #[test]
    fn test_question_id_untagged() {
        let ids: Vec<QuestionId> = serde_json::from_str(r#"[1, "abc"]"#).unwrap();
        assert_eq!(ids, vec![QuestionId::Number(1), QuestionId::Text("abc".into())]);
        assert_ne!(QuestionId::Number(1), QuestionId::Text("1".into()));
    }

    #[test]
    fn test_difficulty_case_insensitive() {
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("MEDIUM".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(" Hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
        assert_eq!(serde_json::to_string(&Difficulty::Easy).unwrap(), "\"Easy\"");
    }

    #[test]
    fn test_question_requires_correct_option_in_options() {
        let err = Question::new(
            QuestionId::Number(1),
            "Which pole?".into(),
            None,
            options(),
            "East".into(),
            String::new(),
            Difficulty::Easy,
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::CorrectOptionMissing("East".into()));

        let err = Question::new(
            QuestionId::Number(1),
            "Which pole?".into(),
            None,
            vec![],
            "East".into(),
            String::new(),
            Difficulty::Easy,
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::NoOptions);
    }

    #[test]
    fn test_blank_image_is_dropped() {
        let q = Question::new(
            QuestionId::Number(1),
            "Which pole?".into(),
            Some("".into()),
            options(),
            "North".into(),
            String::new(),
            Difficulty::Easy,
        )
        .unwrap();
        assert!(q.image.is_none());
    }

    #[test]
    fn test_bundled_question_renames_answer() {
        let raw = r#"{
            "id": 3,
            "question": "Opposite poles",
            "options": ["attract", "repel"],
            "answer": "attract",
            "explanation": "Unlike poles attract.",
            "difficulty_level": "easy",
            "image": ""
        }"#;
        let bundled: BundledQuestion = serde_json::from_str(raw).unwrap();
        let q = Question::try_from(bundled).unwrap();
        assert_eq!(q.correct_option, "attract");
        assert_eq!(q.difficulty, Difficulty::Easy);
        assert_eq!(q.id, QuestionId::Text("bundled:3".into()));
        assert_ne!(q.id, QuestionId::Number(3));
        assert!(q.image.is_none());
    }

    #[test]
    fn test_upload_validation() {
        let good: UploadQuestion = serde_json::from_value(serde_json::json!({
            "question": "Q",
            "options": ["A", "B"],
            "answer": "A",
            "explanation": "because",
            "difficulty": "easy",
            "image": "https://example.com/magnet.png"
        }))
        .unwrap();
        assert!(good.validate().is_ok());

        let bad_difficulty = UploadQuestion {
            difficulty: "trivial".into(),
            ..good.clone()
        };
        assert!(bad_difficulty.validate().is_err());

        let bad_image = UploadQuestion {
            image: Some("javascript:alert(1)".into()),
            ..good.clone()
        };
        assert!(bad_image.validate().is_err());

        let no_options = UploadQuestion {
            options: vec![],
            ..good
        };
        assert!(no_options.validate().is_err());
    }

    #[test]
    fn test_upload_answer_must_be_an_option() {
        let upload = UploadQuestion {
            question: "Q".into(),
            options: vec!["A".into(), "B".into()],
            answer: "C".into(),
            explanation: String::new(),
            difficulty: "Hard".into(),
            image: None,
        };
        assert!(upload.into_new_question().is_err());
    }

    #[test]
    fn test_upload_sanitizes_text() {
        let upload = UploadQuestion {
            question: "Which <script>alert(1)</script>pole?".into(),
            options: vec!["North".into(), "South".into()],
            answer: "North".into(),
            explanation: "<b>North</b> seeking".into(),
            difficulty: "medium".into(),
            image: None,
        };
        let q = upload.into_new_question().unwrap();
        assert_eq!(q.question, "Which pole?");
        assert_eq!(q.explanation, "<b>North</b> seeking");
        assert_eq!(q.correct_answer, "North");
        assert_eq!(q.difficulty, Difficulty::Medium);
    }
}
