//! Developmental screener questionnaire
//!
//! Five fixed questions, each answered Usually / Sometimes / Rarely. The
//! questionnaire is walked one question at a time; the total score maps
//! to a coarse risk level. This is a parent-facing guide, not a diagnosis.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::client::dto::ScreenerSubmitRequest;

// ============================================================================
// QUESTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerChoice {
    Usually,
    Sometimes,
    Rarely,
}

impl AnswerChoice {
    pub const ALL: [AnswerChoice; 3] = [
        AnswerChoice::Usually,
        AnswerChoice::Sometimes,
        AnswerChoice::Rarely,
    ];

    pub fn points(&self) -> u32 {
        match self {
            AnswerChoice::Usually => 2,
            AnswerChoice::Sometimes => 1,
            AnswerChoice::Rarely => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerChoice::Usually => "Usually",
            AnswerChoice::Sometimes => "Sometimes",
            AnswerChoice::Rarely => "Rarely",
        }
    }
}

impl std::fmt::Display for AnswerChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnswerChoice {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usually" | "u" => Ok(AnswerChoice::Usually),
            "sometimes" | "s" => Ok(AnswerChoice::Sometimes),
            "rarely" | "r" => Ok(AnswerChoice::Rarely),
            _ => Err(ScreenerError::InvalidOption(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: &'static str,
    pub text: &'static str,
    pub options: &'static [AnswerChoice],
}

pub const QUESTIONS: [Question; 5] = [
    Question {
        id: "q1",
        text: "Does your child look at something you are looking at?",
        options: &AnswerChoice::ALL,
    },
    Question {
        id: "q2",
        text: "Does your child point to things to show you something interesting?",
        options: &AnswerChoice::ALL,
    },
    Question {
        id: "q3",
        text: "Does your child seem overly sensitive to noise?",
        options: &AnswerChoice::ALL,
    },
    Question {
        id: "q4",
        text: "Does your child engage in repetitive movements (e.g., hand-flapping, rocking)?",
        options: &AnswerChoice::ALL,
    },
    Question {
        id: "q5",
        text: "Does your child respond when you call their name?",
        options: &AnswerChoice::ALL,
    },
];

// ============================================================================
// SCORING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// `> 6` is high, `> 3` medium, anything else low
    pub fn from_score(score: u32) -> Self {
        if score > 6 {
            RiskLevel::High
        } else if score > 3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Probability of ASD Traits",
            RiskLevel::Medium => "Medium Probability of ASD Traits",
            RiskLevel::High => "High Probability of ASD Traits",
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            RiskLevel::Low => {
                "Based on your answers, the observed behaviors show a low probability of being \
                 associated with Autism Spectrum Disorder. Continue to monitor your child's \
                 development and consult a pediatrician with any concerns."
            }
            RiskLevel::Medium => {
                "The behaviors reported suggest a medium probability of being associated with ASD. \
                 It is recommended to discuss these observations with a child development \
                 specialist for a more comprehensive evaluation."
            }
            RiskLevel::High => {
                "The behaviors reported show a high correlation with traits of ASD. We strongly \
                 recommend scheduling a consultation with a developmental pediatrician or a \
                 qualified specialist for a formal diagnostic evaluation."
            }
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// Result of a completed questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerOutcome {
    pub score: u32,
    pub risk: RiskLevel,
    /// Question id to answer, in question order
    pub answers: BTreeMap<String, AnswerChoice>,
}

/// Child details sent along with the answers for the backend model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub name: String,
    pub age: i32,
    pub sex: String,
    pub ethnicity: String,
    pub jaundice: bool,
    pub family_asd: bool,
}

impl ScreenerOutcome {
    /// Per-question points in question order
    pub fn answer_points(&self) -> Vec<i32> {
        QUESTIONS
            .iter()
            .map(|q| self.answers.get(q.id).map_or(0, |a| a.points() as i32))
            .collect()
    }

    pub fn to_submit_request(&self, demographics: &Demographics) -> ScreenerSubmitRequest {
        ScreenerSubmitRequest {
            name: demographics.name.clone(),
            age: demographics.age,
            sex: demographics.sex.clone(),
            ethnicity: demographics.ethnicity.clone(),
            jaundice: demographics.jaundice,
            family_asd: demographics.family_asd,
            answers: self.answer_points(),
        }
    }
}

// ============================================================================
// QUESTIONNAIRE STATE
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum ScreenerError {
    #[error("'{0}' is not one of the offered answers")]
    InvalidOption(String),

    #[error("Question {0} has not been answered")]
    Unanswered(&'static str),

    #[error("Already at the last question")]
    AtLastQuestion,

    #[error("Already at the first question")]
    AtFirstQuestion,

    #[error("A screener needs at least one question")]
    NoQuestions,
}

#[derive(Debug, Clone)]
pub struct Screener {
    questions: &'static [Question],
    current: usize,
    answers: Vec<Option<AnswerChoice>>,
}

impl Screener {
    pub fn new() -> Self {
        Self::over(&QUESTIONS)
    }

    /// Screener over a custom question list, which must not be empty
    pub fn with_questions(questions: &'static [Question]) -> Result<Self, ScreenerError> {
        if questions.is_empty() {
            return Err(ScreenerError::NoQuestions);
        }
        Ok(Self::over(questions))
    }

    fn over(questions: &'static [Question]) -> Self {
        Self {
            questions,
            current: 0,
            answers: vec![None; questions.len()],
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    /// Answer recorded for the current question
    pub fn current_answer(&self) -> Option<AnswerChoice> {
        self.answers[self.current]
    }

    /// Fraction of the way through, counting the current question
    pub fn progress(&self) -> f32 {
        (self.current + 1) as f32 / self.questions.len() as f32
    }

    /// Record an answer for the current question
    pub fn answer(&mut self, choice: AnswerChoice) -> Result<(), ScreenerError> {
        let question = self.current_question();
        if !question.options.contains(&choice) {
            return Err(ScreenerError::InvalidOption(choice.to_string()));
        }
        self.answers[self.current] = Some(choice);
        Ok(())
    }

    /// Advance exactly one question
    pub fn next(&mut self) -> Result<(), ScreenerError> {
        if self.current_answer().is_none() {
            return Err(ScreenerError::Unanswered(self.current_question().id));
        }
        if self.is_last() {
            return Err(ScreenerError::AtLastQuestion);
        }
        self.current += 1;
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), ScreenerError> {
        if self.current == 0 {
            return Err(ScreenerError::AtFirstQuestion);
        }
        self.current -= 1;
        Ok(())
    }

    /// Score a fully answered questionnaire; the cursor must be on the
    /// last question
    pub fn submit(&self) -> Result<ScreenerOutcome, ScreenerError> {
        if let Some(index) = self.answers.iter().position(Option::is_none) {
            return Err(ScreenerError::Unanswered(self.questions[index].id));
        }
        if !self.is_last() {
            return Err(ScreenerError::Unanswered(
                self.questions[self.questions.len() - 1].id,
            ));
        }

        let answers: BTreeMap<String, AnswerChoice> = self
            .questions
            .iter()
            .zip(&self.answers)
            .filter_map(|(q, a)| a.map(|a| (q.id.to_string(), a)))
            .collect();
        let score = answers.values().map(AnswerChoice::points).sum();

        Ok(ScreenerOutcome {
            score,
            risk: RiskLevel::from_score(score),
            answers,
        })
    }
}

impl Default for Screener {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer_all(choices: [AnswerChoice; 5]) -> Screener {
        let mut s = Screener::new();
        for (i, choice) in choices.iter().enumerate() {
            s.answer(*choice).unwrap();
            if i < 4 {
                s.next().unwrap();
            }
        }
        s
    }

    #[test]
    fn test_next_advances_one() {
        let mut s = Screener::new();
        s.answer(AnswerChoice::Usually).unwrap();
        s.next().unwrap();
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.current_question().id, "q2");
    }

    #[test]
    fn test_empty_question_list_rejected() {
        assert_eq!(Screener::with_questions(&[]).unwrap_err(), ScreenerError::NoQuestions);

        let all: &'static [Question] = &QUESTIONS;
        let s = Screener::with_questions(&all[..2]).unwrap();
        assert_eq!(s.total(), 2);
        assert_eq!(s.current_question().id, "q1");
    }

    #[test]
    fn test_next_requires_answer() {
        let mut s = Screener::new();
        assert_eq!(s.next(), Err(ScreenerError::Unanswered("q1")));
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn test_cannot_pass_last() {
        let mut s = answer_all([AnswerChoice::Rarely; 5]);
        assert_eq!(s.current_index(), 4);
        assert_eq!(s.next(), Err(ScreenerError::AtLastQuestion));
        assert_eq!(s.current_index(), 4);
    }

    #[test]
    fn test_back() {
        let mut s = Screener::new();
        assert_eq!(s.back(), Err(ScreenerError::AtFirstQuestion));
        s.answer(AnswerChoice::Sometimes).unwrap();
        s.next().unwrap();
        s.back().unwrap();
        assert_eq!(s.current_answer(), Some(AnswerChoice::Sometimes));
    }

    #[test]
    fn test_progress() {
        let mut s = Screener::new();
        assert!((s.progress() - 0.2).abs() < f32::EPSILON);
        s.answer(AnswerChoice::Usually).unwrap();
        s.next().unwrap();
        assert!((s.progress() - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_scoring_thresholds() {
        use AnswerChoice::*;
        // 2+2+2+1+0 = 7
        let high = answer_all([Usually, Usually, Usually, Sometimes, Rarely]).submit().unwrap();
        assert_eq!(high.score, 7);
        assert_eq!(high.risk, RiskLevel::High);

        // 2+2+2+0+0 = 6, not strictly above 6
        let medium = answer_all([Usually, Usually, Usually, Rarely, Rarely]).submit().unwrap();
        assert_eq!(medium.risk, RiskLevel::Medium);

        // 2+1+0+0+0 = 3
        let low = answer_all([Usually, Sometimes, Rarely, Rarely, Rarely]).submit().unwrap();
        assert_eq!(low.risk, RiskLevel::Low);
    }

    #[test]
    fn test_submit_requires_completion() {
        let mut s = Screener::new();
        s.answer(AnswerChoice::Usually).unwrap();
        assert_eq!(s.submit(), Err(ScreenerError::Unanswered("q2")));
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!("usually".parse::<AnswerChoice>(), Ok(AnswerChoice::Usually));
        assert_eq!("R".parse::<AnswerChoice>(), Ok(AnswerChoice::Rarely));
        assert!(matches!(
            "never".parse::<AnswerChoice>(),
            Err(ScreenerError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_submit_request() {
        use AnswerChoice::*;
        let outcome = answer_all([Usually, Sometimes, Rarely, Usually, Sometimes])
            .submit()
            .unwrap();
        let request = outcome.to_submit_request(&Demographics {
            name: "Kid".into(),
            age: 3,
            sex: "f".into(),
            ethnicity: "unknown".into(),
            jaundice: true,
            family_asd: false,
        });
        assert_eq!(request.answers, vec![2, 1, 0, 2, 1]);
        assert!(request.jaundice);
    }
}
