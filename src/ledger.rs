//! Enrollment ledger bookkeeping: the pure part of enrolling and toggling
//! lecture completion. Locking and persistence live in `state`.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::domain::EnrollmentRecord;

/// `round(100 * completed / max(total, 1))`, capped at 100 so that dangling
/// completions of removed lectures can't push it past a full course.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
  let total = total.max(1) as f64;
  let pct = (100.0 * completed as f64 / total).round();
  pct.min(100.0) as u8
}

/// Add `lecture_id` if absent, remove it if present.
/// Returns whether the lecture is completed afterwards.
pub fn toggle(set: &mut BTreeSet<String>, lecture_id: &str) -> bool {
  if set.remove(lecture_id) {
    false
  } else {
    set.insert(lecture_id.to_string());
    true
  }
}

pub fn new_record(course_id: &str) -> EnrollmentRecord {
  EnrollmentRecord {
    course_id: course_id.to_string(),
    enrolled_at: Utc::now(),
    completed_lectures: BTreeSet::new(),
    progress: 0,
  }
}

impl EnrollmentRecord {
  /// Flip one lecture and recompute progress against the course's current lecture count.
  pub fn toggle_lecture(&mut self, lecture_id: &str, total_lectures: usize) -> bool {
    let now_completed = toggle(&mut self.completed_lectures, lecture_id);
    self.recompute_progress(total_lectures);
    now_completed
  }

  /// Lectures can be added or removed after the last toggle, so readers
  /// recompute against the course as it is now.
  pub fn recompute_progress(&mut self, total_lectures: usize) {
    self.progress = progress_percent(self.completed_lectures.len(), total_lectures);
  }
}

pub fn find<'a>(records: &'a [EnrollmentRecord], course_id: &str) -> Option<&'a EnrollmentRecord> {
  records.iter().find(|r| r.course_id == course_id)
}

pub fn find_mut<'a>(records: &'a mut [EnrollmentRecord], course_id: &str) -> Option<&'a mut EnrollmentRecord> {
  records.iter_mut().find(|r| r.course_id == course_id)
}
