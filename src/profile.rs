//! Profile completion rules and the navigation gate.
//!
//! A profile is "completed" once the role-specific form has been validated and
//! stored. Until then every role is sent to the profile form.

use serde::Deserialize;

use crate::domain::{Degree, Role, StudentInfo, TeacherInfo, UserProfile};
use crate::error::ValidationError;

/// Where a signed-in user should land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
  ProfileForm,
  Dashboard(Role),
}

impl Route {
  pub fn path(&self) -> &'static str {
    match self {
      Route::ProfileForm => "/profile",
      Route::Dashboard(Role::Student) => "/dashboard",
      Route::Dashboard(Role::Teacher) => "/lectures",
    }
  }

  pub fn view(&self) -> &'static str {
    match self {
      Route::ProfileForm => "profile_form",
      Route::Dashboard(_) => "dashboard",
    }
  }
}

pub fn route_for(profile: &UserProfile) -> Route {
  if profile.profile_completed() {
    Route::Dashboard(profile.role())
  } else {
    Route::ProfileForm
  }
}

/// Numeric form inputs arrive either as JSON numbers or as the raw text of the input box.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum NumberField {
  Number(f64),
  Text(String),
}

impl NumberField {
  fn is_blank(&self) -> bool {
    matches!(self, NumberField::Text(s) if s.trim().is_empty())
  }

  fn value(&self) -> Option<f64> {
    match self {
      NumberField::Number(n) => Some(*n),
      NumberField::Text(s) => s.trim().parse::<f64>().ok(),
    }
  }
}

/// Raw profile form. Which fields are required depends on the stored role.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSubmission {
  pub name: Option<String>,
  // student
  pub school: Option<String>,
  pub class: Option<String>,
  pub age: Option<NumberField>,
  pub degree: Option<String>,
  // teacher
  pub current_organization: Option<String>,
  pub experience: Option<NumberField>,
  pub qualification: Option<String>,
  pub mobile_no: Option<String>,
}

/// Validated role-specific fields, ready to store.
#[derive(Clone, Debug, PartialEq)]
pub enum CompletedInfo {
  Student(StudentInfo),
  Teacher(TeacherInfo),
}

fn text(v: &Option<String>) -> Option<&str> {
  v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn number_present(v: &Option<NumberField>) -> bool {
  v.as_ref().map(|n| !n.is_blank()).unwrap_or(false)
}

fn missing(fields: &[(&str, bool)]) -> Result<(), ValidationError> {
  let missing: Vec<String> = fields
    .iter()
    .filter(|(_, present)| !present)
    .map(|(name, _)| name.to_string())
    .collect();
  if missing.is_empty() {
    Ok(())
  } else {
    let msg = format!("Missing required fields: {}", missing.join(", "));
    Err(ValidationError::fields(missing, msg))
  }
}

impl ProfileSubmission {
  pub fn validate(&self, role: Role) -> Result<CompletedInfo, ValidationError> {
    match role {
      Role::Student => self.validate_student().map(CompletedInfo::Student),
      Role::Teacher => self.validate_teacher().map(CompletedInfo::Teacher),
    }
  }

  fn validate_student(&self) -> Result<StudentInfo, ValidationError> {
    missing(&[
      ("name", text(&self.name).is_some()),
      ("school", text(&self.school).is_some()),
      ("class", text(&self.class).is_some()),
      ("age", number_present(&self.age)),
      ("degree", text(&self.degree).is_some()),
    ])?;

    let age = self
      .age
      .as_ref()
      .and_then(NumberField::value)
      .filter(|a| a.fract() == 0.0 && (10.0..=100.0).contains(a))
      .ok_or_else(|| ValidationError::field("age", "Age must be between 10 and 100"))?;

    let degree = text(&self.degree)
      .and_then(Degree::parse)
      .ok_or_else(|| ValidationError::field("degree", "Invalid degree selected"))?;

    Ok(StudentInfo {
      name: text(&self.name).unwrap_or_default().to_string(),
      school: text(&self.school).unwrap_or_default().to_string(),
      class: text(&self.class).unwrap_or_default().to_string(),
      age: age as u8,
      degree,
    })
  }

  fn validate_teacher(&self) -> Result<TeacherInfo, ValidationError> {
    missing(&[
      ("name", text(&self.name).is_some()),
      ("currentOrganization", text(&self.current_organization).is_some()),
      ("experience", number_present(&self.experience)),
      ("qualification", text(&self.qualification).is_some()),
      ("mobileNo", text(&self.mobile_no).is_some()),
    ])?;

    let experience = self
      .experience
      .as_ref()
      .and_then(NumberField::value)
      .filter(|e| e.is_finite() && *e >= 0.0)
      .ok_or_else(|| ValidationError::field("experience", "Experience must be a positive number"))?;

    let mobile = text(&self.mobile_no).unwrap_or_default();
    if mobile.len() != 10 || !mobile.bytes().all(|b| b.is_ascii_digit()) {
      return Err(ValidationError::field("mobileNo", "Mobile number must be 10 digits"));
    }

    Ok(TeacherInfo {
      name: text(&self.name).unwrap_or_default().to_string(),
      current_organization: text(&self.current_organization).unwrap_or_default().to_string(),
      experience,
      qualification: text(&self.qualification).unwrap_or_default().to_string(),
      mobile_no: mobile.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ProfileDetails;

  fn student_form() -> ProfileSubmission {
    ProfileSubmission {
      name: Some("Asha".into()),
      school: Some("City College".into()),
      class: Some("2nd year".into()),
      age: Some(NumberField::Text("19".into())),
      degree: Some("BTech/BE".into()),
      ..Default::default()
    }
  }

  fn teacher_form() -> ProfileSubmission {
    ProfileSubmission {
      name: Some("Ravi".into()),
      current_organization: Some("Acme".into()),
      experience: Some(NumberField::Number(0.0)),
      qualification: Some("MSc".into()),
      mobile_no: Some("9876543210".into()),
      ..Default::default()
    }
  }

  #[test]
  fn incomplete_profile_always_routes_to_form() {
    for role in [Role::Student, Role::Teacher] {
      let p = UserProfile::new("u".into(), "u@example.com".into(), role);
      assert_eq!(route_for(&p), Route::ProfileForm);
      assert_eq!(route_for(&p).path(), "/profile");
    }
  }

  #[test]
  fn completed_profile_routes_to_role_dashboard() {
    let mut p = UserProfile::new("u".into(), "u@example.com".into(), Role::Teacher);
    let CompletedInfo::Teacher(info) = teacher_form().validate(Role::Teacher).unwrap() else {
      panic!("expected teacher info");
    };
    p.details = ProfileDetails::Teacher { info: Some(info) };
    assert_eq!(route_for(&p), Route::Dashboard(Role::Teacher));
    assert_eq!(route_for(&p).path(), "/lectures");
  }

  #[test]
  fn student_form_validates() {
    let info = student_form().validate(Role::Student).unwrap();
    match info {
      CompletedInfo::Student(s) => {
        assert_eq!(s.age, 19);
        assert_eq!(s.degree, Degree::BTechBe);
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn missing_fields_are_reported_together() {
    let form = ProfileSubmission { name: Some("  ".into()), ..student_form() };
    let form = ProfileSubmission { school: None, ..form };
    let err = form.validate(Role::Student).unwrap_err();
    assert_eq!(err.fields, vec!["name".to_string(), "school".to_string()]);
    assert_eq!(err.message, "Missing required fields: name, school");
  }

  #[test]
  fn age_bounds_are_enforced() {
    for bad in ["9", "101", "abc", "19.5"] {
      let form = ProfileSubmission { age: Some(NumberField::Text(bad.into())), ..student_form() };
      let err = form.validate(Role::Student).unwrap_err();
      assert_eq!(err.message, "Age must be between 10 and 100", "age {bad}");
    }
    let edge = ProfileSubmission { age: Some(NumberField::Number(100.0)), ..student_form() };
    assert!(edge.validate(Role::Student).is_ok());
  }

  #[test]
  fn unknown_degree_is_rejected() {
    let form = ProfileSubmission { degree: Some("PhD".into()), ..student_form() };
    assert_eq!(form.validate(Role::Student).unwrap_err().fields, vec!["degree".to_string()]);
  }

  #[test]
  fn teacher_mobile_must_be_ten_digits() {
    for bad in ["12345", "98765432101", "98765abcde"] {
      let form = ProfileSubmission { mobile_no: Some(bad.into()), ..teacher_form() };
      let err = form.validate(Role::Teacher).unwrap_err();
      assert_eq!(err.message, "Mobile number must be 10 digits");
    }
  }

  #[test]
  fn teacher_experience_cannot_be_negative() {
    let form = ProfileSubmission { experience: Some(NumberField::Number(-1.0)), ..teacher_form() };
    assert_eq!(form.validate(Role::Teacher).unwrap_err().message, "Experience must be a positive number");
  }

  #[test]
  fn fractional_experience_is_kept() {
    let form = ProfileSubmission { experience: Some(NumberField::Text("2.5".into())), ..teacher_form() };
    match form.validate(Role::Teacher).unwrap() {
      CompletedInfo::Teacher(t) => assert_eq!(t.experience, 2.5),
      other => panic!("expected teacher info, got {other:?}"),
    }
    assert!(teacher_form().validate(Role::Teacher).is_ok());
  }

  #[test]
  fn role_decides_required_fields() {
    // A student form submitted for a teacher profile misses every teacher field.
    let err = student_form().validate(Role::Teacher).unwrap_err();
    assert_eq!(err.fields.len(), 4);
  }
}
