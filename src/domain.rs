//! Domain models: profiles, courses with their lectures and quizzes, enrollment
//! records and quiz attempts. Field names serialize in camelCase, the shape the
//! documents are stored and served in.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chosen at signup; never changes afterwards.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Student,
  Teacher,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Student => "student",
      Role::Teacher => "teacher",
    }
  }
}

impl std::fmt::Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Degree {
  #[serde(rename = "BTech/BE")]
  BTechBe,
  #[serde(rename = "SSC")]
  Ssc,
  #[serde(rename = "HSC")]
  Hsc,
}

impl Degree {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim() {
      "BTech/BE" => Some(Degree::BTechBe),
      "SSC" => Some(Degree::Ssc),
      "HSC" => Some(Degree::Hsc),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
  pub name: String,
  pub school: String,
  pub class: String,
  pub age: u8,
  pub degree: Degree,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherInfo {
  pub name: String,
  pub current_organization: String,
  /// Years; fractions allowed.
  pub experience: f64,
  pub qualification: String,
  pub mobile_no: String,
}

/// Role-specific part of a profile. `info` stays `None` until the profile form
/// has been accepted, which is what "profile completed" means.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ProfileDetails {
  Student {
    #[serde(default)]
    info: Option<StudentInfo>,
    #[serde(default, rename = "enrolledCourses")]
    enrolled_courses: Vec<EnrollmentRecord>,
  },
  Teacher {
    #[serde(default)]
    info: Option<TeacherInfo>,
  },
}

/// Stored as one document per uid. Serialized documents also carry the derived
/// `profileCompleted` flag; it is ignored when reading one back.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", into = "ProfileDocument")]
pub struct UserProfile {
  pub uid: String,
  pub email: String,
  pub display_name: String,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub details: ProfileDetails,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDocument {
  uid: String,
  email: String,
  display_name: String,
  created_at: DateTime<Utc>,
  updated_at: Option<DateTime<Utc>>,
  profile_completed: bool,
  #[serde(flatten)]
  details: ProfileDetails,
}

impl From<UserProfile> for ProfileDocument {
  fn from(p: UserProfile) -> Self {
    ProfileDocument {
      profile_completed: p.profile_completed(),
      uid: p.uid,
      email: p.email,
      display_name: p.display_name,
      created_at: p.created_at,
      updated_at: p.updated_at,
      details: p.details,
    }
  }
}

impl UserProfile {
  /// Fresh profile as created at signup.
  pub fn new(uid: String, email: String, role: Role) -> Self {
    let display_name = email.split('@').next().unwrap_or_default().to_string();
    let details = match role {
      Role::Student => ProfileDetails::Student { info: None, enrolled_courses: Vec::new() },
      Role::Teacher => ProfileDetails::Teacher { info: None },
    };
    Self { uid, email, display_name, created_at: Utc::now(), updated_at: None, details }
  }

  pub fn role(&self) -> Role {
    match self.details {
      ProfileDetails::Student { .. } => Role::Student,
      ProfileDetails::Teacher { .. } => Role::Teacher,
    }
  }

  pub fn profile_completed(&self) -> bool {
    match &self.details {
      ProfileDetails::Student { info, .. } => info.is_some(),
      ProfileDetails::Teacher { info } => info.is_some(),
    }
  }

  /// Name from the completed profile, falling back to the display name.
  pub fn name(&self) -> &str {
    match &self.details {
      ProfileDetails::Student { info: Some(i), .. } => &i.name,
      ProfileDetails::Teacher { info: Some(i) } => &i.name,
      _ => &self.display_name,
    }
  }

  pub fn enrollments(&self) -> &[EnrollmentRecord] {
    match &self.details {
      ProfileDetails::Student { enrolled_courses, .. } => enrolled_courses,
      ProfileDetails::Teacher { .. } => &[],
    }
  }

  pub fn enrollments_mut(&mut self) -> Option<&mut Vec<EnrollmentRecord>> {
    match &mut self.details {
      ProfileDetails::Student { enrolled_courses, .. } => Some(enrolled_courses),
      ProfileDetails::Teacher { .. } => None,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Level {
  Beginner,
  Intermediate,
  Advanced,
}

impl Level {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim() {
      "Beginner" => Some(Level::Beginner),
      "Intermediate" => Some(Level::Intermediate),
      "Advanced" => Some(Level::Advanced),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub question_text: String,
  pub options: Vec<String>,
  /// Index into `options`.
  pub correct_answer: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quiz {
  pub questions: Vec<Question>,
}

/// Embedded in a course; display order is the order of `Course::lectures`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
  pub id: String,
  pub title: String,
  pub video_url: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub attachments: Vec<String>,
  #[serde(default)]
  pub quiz: Option<Quiz>,
  pub has_quiz: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
  pub id: String,
  pub title: String,
  pub description: String,
  pub instructor: String,
  pub instructor_id: String,
  pub category: String,
  pub level: Level,
  pub price: f64,
  pub duration_hours: u32,
  pub thumbnail_url: String,
  pub video_url: String,
  pub rating: f64,
  pub students_enrolled: u32,
  #[serde(default)]
  pub lectures: Vec<Lecture>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Course {
  pub fn lecture(&self, lecture_id: &str) -> Option<&Lecture> {
    self.lectures.iter().find(|l| l.id == lecture_id)
  }
}

/// One element of a student's `enrolledCourses`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRecord {
  pub course_id: String,
  pub enrolled_at: DateTime<Utc>,
  #[serde(default)]
  pub completed_lectures: BTreeSet<String>,
  #[serde(default)]
  pub progress: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
  pub question: String,
  pub user_answer: String,
  pub correct_answer: String,
  pub is_correct: bool,
}

/// The single stored submission of one student for one lecture's quiz.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
  pub student_id: String,
  pub course_id: String,
  pub lecture_id: String,
  pub score: f64,
  pub completed_at: DateTime<Utc>,
  pub results: Vec<QuestionResult>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_profile_is_incomplete_and_keeps_role() {
    let p = UserProfile::new("u1".into(), "ada@example.com".into(), Role::Teacher);
    assert_eq!(p.role(), Role::Teacher);
    assert!(!p.profile_completed());
    assert_eq!(p.display_name, "ada");
    assert!(p.enrollments().is_empty());
  }

  #[test]
  fn profile_serializes_role_tag_and_camel_case() {
    let p = UserProfile::new("u1".into(), "s@example.com".into(), Role::Student);
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v["role"], "student");
    assert!(v["enrolledCourses"].as_array().unwrap().is_empty());
    assert!(v.get("displayName").is_some());
    assert_eq!(v["profileCompleted"], false);
  }

  #[test]
  fn completed_profile_reports_flag_and_reads_back() {
    let mut p = UserProfile::new("u1".into(), "s@example.com".into(), Role::Student);
    if let ProfileDetails::Student { info, .. } = &mut p.details {
      *info = Some(StudentInfo {
        name: "Asha".into(),
        school: "City".into(),
        class: "10".into(),
        age: 16,
        degree: Degree::Ssc,
      });
    }
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v["profileCompleted"], true);
    assert_eq!(v["info"]["name"], "Asha");
    let back: UserProfile = serde_json::from_value(v).unwrap();
    assert_eq!(back, p);
  }

  #[test]
  fn degree_uses_display_labels() {
    assert_eq!(serde_json::to_string(&Degree::BTechBe).unwrap(), "\"BTech/BE\"");
    assert_eq!(Degree::parse("HSC"), Some(Degree::Hsc));
    assert_eq!(Degree::parse("PhD"), None);
  }
}
