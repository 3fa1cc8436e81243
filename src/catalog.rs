//! Course catalog rules: authoring input validation, quiz shape checks, and the
//! store listing (search, filters, sort).

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{Course, Lecture, Level, Quiz};
use crate::error::ValidationError;

/// Course upload form.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
  pub title: String,
  pub description: String,
  pub price: f64,
  pub duration_hours: u32,
  pub level: Level,
  pub category: String,
  #[serde(default)]
  pub thumbnail_url: Option<String>,
  pub video_url: String,
}

impl NewCourse {
  pub fn validate(&self, categories: &[String]) -> Result<(), ValidationError> {
    let mut blank = vec![];
    if self.title.trim().is_empty() { blank.push("title".to_string()); }
    if self.description.trim().is_empty() { blank.push("description".to_string()); }
    if self.video_url.trim().is_empty() { blank.push("videoUrl".to_string()); }
    if !blank.is_empty() {
      let msg = format!("Missing required fields: {}", blank.join(", "));
      return Err(ValidationError::fields(blank, msg));
    }
    if !self.price.is_finite() || self.price < 0.0 {
      return Err(ValidationError::field("price", "Price must be zero or more"));
    }
    if self.duration_hours < 1 {
      return Err(ValidationError::field("durationHours", "Duration must be at least 1 hour"));
    }
    if !categories.iter().any(|c| c == &self.category) {
      return Err(ValidationError::field("category", format!("Unknown category: {}", self.category)));
    }
    Ok(())
  }

  /// Build the stored course. `students_enrolled` and `rating` start at zero.
  pub fn into_course(self, instructor: &str, instructor_id: &str, default_thumbnail: &str) -> Course {
    let now = Utc::now();
    let thumbnail_url = self
      .thumbnail_url
      .filter(|s| !s.trim().is_empty())
      .unwrap_or_else(|| default_thumbnail.to_string());
    Course {
      id: Uuid::new_v4().to_string(),
      title: self.title.trim().to_string(),
      description: self.description.trim().to_string(),
      instructor: instructor.to_string(),
      instructor_id: instructor_id.to_string(),
      category: self.category,
      level: self.level,
      price: self.price,
      duration_hours: self.duration_hours,
      thumbnail_url,
      video_url: self.video_url.trim().to_string(),
      rating: 0.0,
      students_enrolled: 0,
      lectures: Vec::new(),
      created_at: now,
      updated_at: now,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLecture {
  pub title: String,
  pub video_url: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub attachments: Option<Vec<String>>,
  #[serde(default)]
  pub quiz: Option<Quiz>,
}

impl NewLecture {
  /// Title and URL must be present; a quiz, when given, must be well formed.
  /// The video URL is accepted as-is.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.title.trim().is_empty() {
      return Err(ValidationError::field("title", "Lecture title is required"));
    }
    if self.video_url.trim().is_empty() {
      return Err(ValidationError::field("videoUrl", "Video URL is required"));
    }
    if let Some(q) = &self.quiz {
      validate_quiz(q)?;
    }
    Ok(())
  }

  pub fn into_lecture(self) -> Lecture {
    let has_quiz = self.quiz.is_some();
    Lecture {
      id: Uuid::new_v4().to_string(),
      title: self.title.trim().to_string(),
      video_url: self.video_url.trim().to_string(),
      description: self.description.unwrap_or_default(),
      attachments: self.attachments.unwrap_or_default(),
      quiz: self.quiz,
      has_quiz,
      created_at: Utc::now(),
    }
  }
}

/// Every question needs text, at least two options, and a `correct_answer`
/// that indexes into its options. An empty quiz is rejected.
pub fn validate_quiz(quiz: &Quiz) -> Result<(), ValidationError> {
  if quiz.questions.is_empty() {
    return Err(ValidationError::field("quiz", "A quiz needs at least one question"));
  }
  for (i, q) in quiz.questions.iter().enumerate() {
    if q.question_text.trim().is_empty() {
      return Err(ValidationError::field("quiz", format!("Question {} has no text", i + 1)));
    }
    if q.options.len() < 2 {
      return Err(ValidationError::field("quiz", format!("Question {} needs at least two options", i + 1)));
    }
    if q.correct_answer >= q.options.len() {
      return Err(ValidationError::field(
        "quiz",
        format!("Question {} has correctAnswer {} outside its {} options", i + 1, q.correct_answer, q.options.len()),
      ));
    }
  }
  Ok(())
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
  #[default]
  Popular,
  Newest,
  PriceLow,
  PriceHigh,
}

/// Store query. "All" (or absent) disables a filter.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CourseFilter {
  pub search: Option<String>,
  pub category: Option<String>,
  pub level: Option<String>,
  #[serde(default)]
  pub sort: SortBy,
}

fn active(v: &Option<String>) -> Option<&str> {
  v.as_deref().map(str::trim).filter(|s| !s.is_empty() && *s != "All")
}

impl CourseFilter {
  pub fn matches(&self, c: &Course) -> bool {
    if let Some(q) = active(&self.search) {
      let q = q.to_lowercase();
      if !c.title.to_lowercase().contains(&q) && !c.instructor.to_lowercase().contains(&q) {
        return false;
      }
    }
    if let Some(cat) = active(&self.category) {
      if c.category != cat { return false; }
    }
    if let Some(level) = active(&self.level) {
      if Level::parse(level) != Some(c.level) { return false; }
    }
    true
  }

  pub fn apply(&self, courses: impl IntoIterator<Item = Course>) -> Vec<Course> {
    let mut out: Vec<Course> = courses.into_iter().filter(|c| self.matches(c)).collect();
    sort_courses(&mut out, self.sort);
    out
  }
}

pub fn sort_courses(courses: &mut [Course], sort: SortBy) {
  let popularity = |c: &Course| c.rating * c.students_enrolled as f64;
  match sort {
    SortBy::Popular => courses.sort_by(|a, b| popularity(b).total_cmp(&popularity(a))),
    SortBy::Newest => courses.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    SortBy::PriceLow => courses.sort_by(|a, b| a.price.total_cmp(&b.price)),
    SortBy::PriceHigh => courses.sort_by(|a, b| b.price.total_cmp(&a.price)),
  }
}
