//! Quiz grading. Pure: the same questions and answers always give the same grade.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::domain::{QuestionResult, Quiz, QuizAttempt};
use crate::error::ValidationError;

#[derive(Clone, Debug, PartialEq)]
pub struct Grade {
  /// 0..=100, unrounded.
  pub score: f64,
  pub results: Vec<QuestionResult>,
}

impl Grade {
  pub fn correct_count(&self) -> usize {
    self.results.iter().filter(|r| r.is_correct).count()
  }

  pub fn into_attempt(self, student_id: &str, course_id: &str, lecture_id: &str) -> QuizAttempt {
    QuizAttempt {
      student_id: student_id.to_string(),
      course_id: course_id.to_string(),
      lecture_id: lecture_id.to_string(),
      score: self.score,
      completed_at: Utc::now(),
      results: self.results,
    }
  }
}

/// Grade `answers` (question index -> chosen option index) against `quiz`.
///
/// Exactly one answer per question is required; anything else is an
/// incomplete submission and nothing is graded.
pub fn grade_submission(quiz: &Quiz, answers: &BTreeMap<usize, usize>) -> Result<Grade, ValidationError> {
  let total = quiz.questions.len();
  if total == 0 {
    return Err(ValidationError::field("quiz", "Quiz has no questions"));
  }
  let answered_all = answers.len() == total && answers.keys().all(|&i| i < total);
  if !answered_all {
    return Err(ValidationError::field("answers", "incomplete submission"));
  }

  let mut results = Vec::with_capacity(total);
  for (i, q) in quiz.questions.iter().enumerate() {
    let chosen = answers[&i];
    let user_answer = q.options.get(chosen).ok_or_else(|| {
      ValidationError::field("answers", format!("Answer for question {} is not one of its options", i + 1))
    })?;
    let correct_answer = q.options.get(q.correct_answer).cloned().unwrap_or_default();
    results.push(QuestionResult {
      question: q.question_text.clone(),
      user_answer: user_answer.clone(),
      correct_answer,
      is_correct: chosen == q.correct_answer,
    });
  }

  let correct = results.iter().filter(|r| r.is_correct).count();
  let score = 100.0 * correct as f64 / total as f64;
  Ok(Grade { score, results })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Question;

  fn q(text: &str, correct: usize) -> Question {
    Question {
      question_text: text.into(),
      options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
      correct_answer: correct,
    }
  }

  fn answers(pairs: &[(usize, usize)]) -> BTreeMap<usize, usize> {
    pairs.iter().copied().collect()
  }

  #[test]
  fn single_correct_answer_scores_full() {
    let quiz = Quiz { questions: vec![q("Q1", 2)] };
    let g = grade_submission(&quiz, &answers(&[(0, 2)])).unwrap();
    assert_eq!(g.score, 100.0);
    assert_eq!(g.results.len(), 1);
    assert!(g.results[0].is_correct);
    assert_eq!(g.results[0].user_answer, "C");
    assert_eq!(g.results[0].correct_answer, "C");
  }

  #[test]
  fn partial_score_is_exact() {
    let quiz = Quiz { questions: vec![q("Q1", 0), q("Q2", 1), q("Q3", 2)] };
    let g = grade_submission(&quiz, &answers(&[(0, 0), (1, 3), (2, 3)])).unwrap();
    assert!((g.score - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(g.correct_count(), 1);
    assert_eq!(g.results[1].user_answer, "D");
    assert_eq!(g.results[1].correct_answer, "B");
  }

  #[test]
  fn grading_is_deterministic_and_bounded() {
    let quiz = Quiz { questions: vec![q("Q1", 0), q("Q2", 1)] };
    for a in [answers(&[(0, 0), (1, 1)]), answers(&[(0, 3), (1, 3)]), answers(&[(0, 0), (1, 0)])] {
      let first = grade_submission(&quiz, &a).unwrap();
      let second = grade_submission(&quiz, &a).unwrap();
      assert_eq!(first, second);
      assert!((0.0..=100.0).contains(&first.score));
    }
  }

  #[test]
  fn incomplete_submission_is_rejected() {
    let quiz = Quiz { questions: vec![q("Q1", 0), q("Q2", 1)] };
    let err = grade_submission(&quiz, &answers(&[(0, 0)])).unwrap_err();
    assert_eq!(err.message, "incomplete submission");
    // Right count but a key outside the question range.
    assert!(grade_submission(&quiz, &answers(&[(0, 0), (5, 1)])).is_err());
  }

  #[test]
  fn out_of_range_option_is_rejected() {
    let quiz = Quiz { questions: vec![q("Q1", 0)] };
    assert!(grade_submission(&quiz, &answers(&[(0, 4)])).is_err());
  }

  #[test]
  fn attempt_carries_grade() {
    let quiz = Quiz { questions: vec![q("Q1", 1)] };
    let a = grade_submission(&quiz, &answers(&[(0, 0)])).unwrap().into_attempt("s1", "c1", "l1");
    assert_eq!(a.score, 0.0);
    assert_eq!(a.lecture_id, "l1");
    assert!(!a.results[0].is_correct);
  }
}
