//! Application state: document collections, sessions, collaborators, and every
//! mutating operation of the catalog, the enrollment ledger and the quiz engine.
//!
//! Collections:
//!   - profiles: uid -> UserProfile (students carry their enrollment records)
//!   - courses: course id -> Course (lectures embedded)
//!   - attempts: (student uid, lecture id) -> QuizAttempt
//!   - sessions: token -> uid
//!
//! Lock order is profiles -> courses -> attempts. Each operation below runs as one
//! server-side read-modify-write under the locks it needs, so concurrent toggles
//! and enrollments cannot lose updates.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::catalog::{CourseFilter, NewCourse, NewLecture};
use crate::config::{load_config_from_env, AppConfig};
use crate::domain::{Course, EnrollmentRecord, Lecture, ProfileDetails, QuizAttempt, Role, UserProfile};
use crate::error::{AppError, AppResult, AuthError, ValidationError};
use crate::identity::{Account, Identity};
use crate::ledger;
use crate::openai::OpenAI;
use crate::profile::{CompletedInfo, ProfileSubmission};
use crate::quiz::grade_submission;
use crate::session::SessionContext;

#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<RwLock<HashMap<String, UserProfile>>>,
    pub courses: Arc<RwLock<HashMap<String, Course>>>,
    pub attempts: Arc<RwLock<HashMap<(String, String), QuizAttempt>>>,
    pub sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    pub identity: Identity,
    pub openai: Option<OpenAI>,
    pub config: AppConfig,
}

/// One signed-in token.
#[derive(Clone, Debug)]
pub struct SessionEntry {
    pub uid: String,
    pub opened_at: DateTime<Utc>,
}

fn require_role(profile: &UserProfile, role: Role) -> AppResult<()> {
    if profile.role() != role {
        return Err(AppError::Forbidden(format!("Only {}s can do this", role)));
    }
    Ok(())
}

fn require_completed(profile: &UserProfile) -> AppResult<()> {
    if !profile.profile_completed() {
        return Err(AppError::Forbidden("Complete your profile first".into()));
    }
    Ok(())
}

fn not_enrolled(course_id: &str) -> AppError {
    AppError::NotFound(format!("Not enrolled in course {}", course_id))
}

impl AppState {
    /// Build state from env: load config, pick the identity provider, init the assistant client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_config_from_env();
        let identity = Identity::from_env();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "skillstream", base_url = %oa.base_url, model = %oa.model, "Assistant enabled.");
        } else {
            // Not fatal: assistant calls answer with the inline apology.
            error!(target: "skillstream", "OPENAI_API_KEY not set; assistant replies are disabled.");
        }

        Self::with_parts(config, identity, openai)
    }

    pub fn with_parts(config: AppConfig, identity: Identity, openai: Option<OpenAI>) -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            courses: Arc::new(RwLock::new(HashMap::new())),
            attempts: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            identity,
            openai,
            config,
        }
    }

    // --- identity & sessions ---

    fn session_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now - entry.opened_at >= Duration::minutes(self.config.sessions.ttl_minutes)
    }

    /// Register the provider token, pruning expired entries on the way.
    async fn open_session(&self, account: &Account, profile: UserProfile) -> SessionContext {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| !self.session_expired(e, now));
        if sessions.len() < before {
            info!(target: "identity", pruned = before - sessions.len(), "Expired sessions removed");
        }
        sessions.insert(account.token.clone(), SessionEntry { uid: account.uid.clone(), opened_at: now });
        SessionContext { token: account.token.clone(), profile }
    }

    /// Create the account with the identity provider, then its profile, then a session.
    #[instrument(level = "info", skip(self, email, password), fields(%role))]
    pub async fn sign_up(&self, email: &str, password: &str, role: Role) -> AppResult<SessionContext> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ValidationError::new("Please fill in all fields").into());
        }
        if password.chars().count() < 6 {
            return Err(ValidationError::field("password", "Password must be at least 6 characters").into());
        }

        let account = self.identity.sign_up(email.trim(), password).await?;
        let profile = UserProfile::new(account.uid.clone(), account.email.clone(), role);
        {
            let mut profiles = self.profiles.write().await;
            if profiles.contains_key(&account.uid) {
                return Err(AppError::Conflict("A profile already exists for this account".into()));
            }
            profiles.insert(account.uid.clone(), profile.clone());
        }
        info!(target: "identity", uid = %account.uid, %role, "Account created");
        Ok(self.open_session(&account, profile).await)
    }

    #[instrument(level = "info", skip(self, email, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<SessionContext> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ValidationError::new("Please fill in all fields").into());
        }
        let account = self.identity.sign_in(email.trim(), password).await?;
        let profile = self
            .profiles
            .read()
            .await
            .get(&account.uid)
            .cloned()
            .ok_or_else(|| AppError::NotFound("No profile found for this account".into()))?;
        info!(target: "identity", uid = %account.uid, role = %profile.role(), "Signed in");
        Ok(self.open_session(&account, profile).await)
    }

    /// Resolve a token into a fresh session context.
    pub async fn session(&self, token: &str) -> AppResult<SessionContext> {
        let entry = self
            .sessions
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)?;
        if self.session_expired(&entry, Utc::now()) {
            self.sessions.write().await.remove(token);
            info!(target: "identity", uid = %entry.uid, "Session expired");
            return Err(AuthError::InvalidToken.into());
        }
        let profile = self.profile(&entry.uid).await?;
        Ok(SessionContext { token: token.to_string(), profile })
    }

    pub async fn close_session(&self, token: &str) {
        if let Some(entry) = self.sessions.write().await.remove(token) {
            info!(target: "identity", uid = %entry.uid, "Signed out");
        }
    }

    // --- profiles ---

    pub async fn profile(&self, uid: &str) -> AppResult<UserProfile> {
        self.profiles
            .read()
            .await
            .get(uid)
            .cloned()
            .ok_or_else(|| AppError::Persistence(format!("Profile document {} is missing", uid)))
    }

    /// Validate the role-specific form and store it in one write. Nothing is
    /// saved when validation fails.
    #[instrument(level = "info", skip(self, submission), fields(%uid))]
    pub async fn complete_profile(&self, uid: &str, submission: &ProfileSubmission) -> AppResult<UserProfile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| AppError::Persistence(format!("Profile document {} is missing", uid)))?;
        if profile.profile_completed() {
            return Err(AppError::Conflict("Profile is already completed".into()));
        }

        let completed = submission.validate(profile.role())?;
        match (&mut profile.details, completed) {
            (ProfileDetails::Student { info, .. }, CompletedInfo::Student(s)) => *info = Some(s),
            (ProfileDetails::Teacher { info }, CompletedInfo::Teacher(t)) => *info = Some(t),
            _ => return Err(AppError::Persistence("Profile role does not match submitted fields".into())),
        }
        profile.updated_at = Some(Utc::now());
        info!(target: "profile", %uid, role = %profile.role(), "Profile completed");
        Ok(profile.clone())
    }

    // --- catalog ---

    #[instrument(level = "info", skip(self, new_course), fields(%uid, title = %new_course.title))]
    pub async fn create_course(&self, uid: &str, new_course: NewCourse) -> AppResult<Course> {
        let teacher = self.profile(uid).await?;
        require_role(&teacher, Role::Teacher)?;
        require_completed(&teacher)?;
        new_course.validate(&self.config.catalog.categories)?;

        let course = new_course.into_course(teacher.name(), uid, &self.config.catalog.default_thumbnail_url);
        self.courses.write().await.insert(course.id.clone(), course.clone());
        info!(target: "catalog", course_id = %course.id, instructor_id = %uid, "Course created");
        Ok(course)
    }

    pub async fn get_course(&self, course_id: &str) -> AppResult<Course> {
        self.courses
            .read()
            .await
            .get(course_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", course_id)))
    }

    pub async fn list_courses(&self, filter: &CourseFilter) -> Vec<Course> {
        let all: Vec<Course> = self.courses.read().await.values().cloned().collect();
        filter.apply(all)
    }

    /// Courses owned by one teacher, newest first.
    pub async fn teacher_courses(&self, uid: &str) -> Vec<Course> {
        let mut own: Vec<Course> = self
            .courses
            .read()
            .await
            .values()
            .filter(|c| c.instructor_id == uid)
            .cloned()
            .collect();
        own.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        own
    }

    fn owned_mut<'a>(courses: &'a mut HashMap<String, Course>, uid: &str, course_id: &str) -> AppResult<&'a mut Course> {
        let course = courses
            .get_mut(course_id)
            .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", course_id)))?;
        if course.instructor_id != uid {
            return Err(AppError::Forbidden("Only the course instructor can change its lectures".into()));
        }
        Ok(course)
    }

    /// Append a lecture; display order is append order.
    #[instrument(level = "info", skip(self, new_lecture), fields(%uid, %course_id))]
    pub async fn add_lecture(&self, uid: &str, course_id: &str, new_lecture: NewLecture) -> AppResult<Lecture> {
        new_lecture.validate()?;
        let mut courses = self.courses.write().await;
        let course = Self::owned_mut(&mut courses, uid, course_id)?;
        let lecture = new_lecture.into_lecture();
        course.lectures.push(lecture.clone());
        course.updated_at = Utc::now();
        info!(target: "catalog", %course_id, lecture_id = %lecture.id, has_quiz = lecture.has_quiz, "Lecture added");
        Ok(lecture)
    }

    /// Remove a lecture. Quiz attempts and completion marks that reference it
    /// are left in place.
    #[instrument(level = "info", skip(self), fields(%uid, %course_id, %lecture_id))]
    pub async fn remove_lecture(&self, uid: &str, course_id: &str, lecture_id: &str) -> AppResult<()> {
        let mut courses = self.courses.write().await;
        let course = Self::owned_mut(&mut courses, uid, course_id)?;
        let before = course.lectures.len();
        course.lectures.retain(|l| l.id != lecture_id);
        if course.lectures.len() == before {
            return Err(AppError::NotFound(format!("Lecture not found: {}", lecture_id)));
        }
        course.updated_at = Utc::now();
        info!(target: "catalog", %course_id, %lecture_id, remaining = course.lectures.len(), "Lecture removed");
        Ok(())
    }

    // --- enrollment ledger ---

    /// Enroll a student. Idempotent per (student, course): a repeat returns the
    /// existing record with `false`. The record append and the counter bump
    /// happen under the same locks.
    #[instrument(level = "info", skip(self), fields(%uid, %course_id))]
    pub async fn enroll(&self, uid: &str, course_id: &str) -> AppResult<(EnrollmentRecord, bool)> {
        let mut profiles = self.profiles.write().await;
        let mut courses = self.courses.write().await;

        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| AppError::Persistence(format!("Profile document {} is missing", uid)))?;
        require_role(profile, Role::Student)?;
        require_completed(profile)?;
        let course = courses
            .get_mut(course_id)
            .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", course_id)))?;

        let records = profile
            .enrollments_mut()
            .ok_or_else(|| AppError::Forbidden("Only students can enroll".into()))?;
        if let Some(existing) = ledger::find(records, course_id) {
            info!(target: "ledger", %uid, %course_id, "Already enrolled");
            return Ok((existing.clone(), false));
        }

        let record = ledger::new_record(course_id);
        records.push(record.clone());
        course.students_enrolled += 1;
        info!(target: "ledger", %uid, %course_id, students_enrolled = course.students_enrolled, "Enrolled");
        Ok((record, true))
    }

    /// Flip one lecture's completion and recompute progress from the course's
    /// current lecture count.
    #[instrument(level = "info", skip(self), fields(%uid, %course_id, %lecture_id))]
    pub async fn toggle_lecture_completion(&self, uid: &str, course_id: &str, lecture_id: &str) -> AppResult<EnrollmentRecord> {
        let mut profiles = self.profiles.write().await;
        let courses = self.courses.read().await;

        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| AppError::Persistence(format!("Profile document {} is missing", uid)))?;
        require_role(profile, Role::Student)?;
        let course = courses
            .get(course_id)
            .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", course_id)))?;
        let records = profile.enrollments_mut().ok_or_else(|| not_enrolled(course_id))?;
        let record = ledger::find_mut(records, course_id).ok_or_else(|| not_enrolled(course_id))?;

        // Unmarking a removed lecture is allowed; marking one is not.
        if course.lecture(lecture_id).is_none() && !record.completed_lectures.contains(lecture_id) {
            return Err(AppError::NotFound(format!("Lecture not found: {}", lecture_id)));
        }

        let completed = record.toggle_lecture(lecture_id, course.lectures.len());
        info!(target: "ledger", %uid, %course_id, %lecture_id, completed, progress = record.progress, "Lecture completion toggled");
        Ok(record.clone())
    }

    /// Enrolled courses joined with their course records, most recent enrollment first.
    /// Records whose course no longer exists are skipped.
    pub async fn dashboard(&self, uid: &str) -> AppResult<Vec<(Course, EnrollmentRecord)>> {
        let profile = self.profile(uid).await?;
        require_role(&profile, Role::Student)?;
        let courses = self.courses.read().await;
        let mut out: Vec<(Course, EnrollmentRecord)> = profile
            .enrollments()
            .iter()
            .filter_map(|r| match courses.get(&r.course_id) {
                Some(c) => {
                    let mut record = r.clone();
                    record.recompute_progress(c.lectures.len());
                    Some((c.clone(), record))
                }
                None => {
                    warn!(target: "ledger", %uid, course_id = %r.course_id, "Enrollment references a missing course");
                    None
                }
            })
            .collect();
        out.sort_by(|a, b| b.1.enrolled_at.cmp(&a.1.enrolled_at));
        Ok(out)
    }

    // --- quizzes ---

    /// Grade and store the one allowed attempt for (student, lecture).
    #[instrument(level = "info", skip(self, answers), fields(%uid, %course_id, %lecture_id, answered = answers.len()))]
    pub async fn submit_quiz(
        &self,
        uid: &str,
        course_id: &str,
        lecture_id: &str,
        answers: &BTreeMap<usize, usize>,
    ) -> AppResult<QuizAttempt> {
        {
            let profiles = self.profiles.read().await;
            let profile = profiles
                .get(uid)
                .ok_or_else(|| AppError::Persistence(format!("Profile document {} is missing", uid)))?;
            require_role(profile, Role::Student)?;
            if ledger::find(profile.enrollments(), course_id).is_none() {
                return Err(not_enrolled(course_id));
            }
        }

        let quiz = {
            let courses = self.courses.read().await;
            let course = courses
                .get(course_id)
                .ok_or_else(|| AppError::NotFound(format!("Course not found: {}", course_id)))?;
            let lecture = course
                .lecture(lecture_id)
                .ok_or_else(|| AppError::NotFound(format!("Lecture not found: {}", lecture_id)))?;
            lecture
                .quiz
                .clone()
                .ok_or_else(|| AppError::NotFound(format!("Lecture {} has no quiz", lecture_id)))?
        };

        let key = (uid.to_string(), lecture_id.to_string());
        if self.attempts.read().await.contains_key(&key) {
            return Err(AppError::Conflict("Quiz already attempted".into()));
        }

        let grade = grade_submission(&quiz, answers)?;
        let correct = grade.correct_count();
        let attempt = grade.into_attempt(uid, course_id, lecture_id);

        let mut attempts = self.attempts.write().await;
        if attempts.contains_key(&key) {
            return Err(AppError::Conflict("Quiz already attempted".into()));
        }
        attempts.insert(key, attempt.clone());
        info!(target: "quiz", %uid, %lecture_id, correct, score = %format!("{:.1}", attempt.score), "Quiz attempt recorded");
        Ok(attempt)
    }

    pub async fn get_attempt(&self, uid: &str, lecture_id: &str) -> Option<QuizAttempt> {
        self.attempts
            .read()
            .await
            .get(&(uid.to_string(), lecture_id.to_string()))
            .cloned()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::NewLecture;
    use crate::domain::{Level, Question, Quiz};
    use crate::identity::MemoryIdentity;
    use crate::profile::NumberField;

    pub(crate) fn test_state() -> AppState {
        AppState::with_parts(AppConfig::default(), Identity::Memory(MemoryIdentity::default()), None)
    }

    pub(crate) fn teacher_form() -> ProfileSubmission {
        ProfileSubmission {
            name: Some("Ravi Kumar".into()),
            current_organization: Some("Acme".into()),
            experience: Some(NumberField::Number(5.0)),
            qualification: Some("MTech".into()),
            mobile_no: Some("9876543210".into()),
            ..Default::default()
        }
    }

    pub(crate) fn student_form() -> ProfileSubmission {
        ProfileSubmission {
            name: Some("Asha".into()),
            school: Some("City College".into()),
            class: Some("2".into()),
            age: Some(NumberField::Number(20.0)),
            degree: Some("SSC".into()),
            ..Default::default()
        }
    }

    pub(crate) fn new_course() -> NewCourse {
        NewCourse {
            title: "Rust for Beginners".into(),
            description: "Ownership, borrowing and more".into(),
            price: 19.0,
            duration_hours: 4,
            level: Level::Beginner,
            category: "Web Development".into(),
            thumbnail_url: None,
            video_url: "https://youtube.com/watch?v=rust".into(),
        }
    }

    fn lecture(title: &str, quiz: Option<Quiz>) -> NewLecture {
        NewLecture {
            title: title.into(),
            video_url: format!("https://youtube.com/watch?v={title}"),
            description: None,
            attachments: None,
            quiz,
        }
    }

    fn quiz(n: usize) -> Quiz {
        Quiz {
            questions: (0..n)
                .map(|i| Question {
                    question_text: format!("Q{i}"),
                    options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    correct_answer: i % 4,
                })
                .collect(),
        }
    }

    async fn signed_up(state: &AppState, email: &str, role: Role) -> String {
        let s = state.sign_up(email, "secret1", role).await.unwrap();
        let form = match role {
            Role::Teacher => teacher_form(),
            Role::Student => student_form(),
        };
        state.complete_profile(s.uid(), &form).await.unwrap();
        s.uid().to_string()
    }

    /// Teacher with one course of `n` lectures; returns (teacher, course id, lecture ids).
    async fn course_with_lectures(state: &AppState, n: usize) -> (String, String, Vec<String>) {
        let teacher = signed_up(state, "t@example.com", Role::Teacher).await;
        let course = state.create_course(&teacher, new_course()).await.unwrap();
        let mut ids = vec![];
        for i in 0..n {
            let l = state.add_lecture(&teacher, &course.id, lecture(&format!("L{i}"), None)).await.unwrap();
            ids.push(l.id);
        }
        (teacher, course.id, ids)
    }

    #[tokio::test]
    async fn signup_then_signin_shares_profile() {
        let state = test_state();
        let up = state.sign_up("s@example.com", "secret1", Role::Student).await.unwrap();
        assert!(!up.profile.profile_completed());
        let mut ctx = state.sign_in("s@example.com", "secret1").await.unwrap();
        assert_eq!(ctx.uid(), up.uid());
        state.complete_profile(ctx.uid(), &student_form()).await.unwrap();
        ctx.refresh(&state).await.unwrap();
        assert!(ctx.profile.profile_completed());
    }

    #[tokio::test]
    async fn invalidated_session_stops_resolving() {
        let state = test_state();
        let ctx = state.sign_up("s@example.com", "secret1", Role::Student).await.unwrap();
        let token = ctx.token.clone();
        assert!(state.session(&token).await.is_ok());
        ctx.invalidate(&state).await;
        assert!(matches!(state.session(&token).await, Err(AppError::Auth(AuthError::InvalidToken))));
    }

    #[tokio::test]
    async fn expired_session_stops_resolving_and_is_pruned() {
        let mut config = AppConfig::default();
        config.sessions.ttl_minutes = 0;
        let state = AppState::with_parts(config, Identity::Memory(MemoryIdentity::default()), None);
        let ctx = state.sign_up("s@example.com", "secret1", Role::Student).await.unwrap();
        assert!(matches!(state.session(&ctx.token).await, Err(AppError::Auth(AuthError::InvalidToken))));
        assert!(state.sessions.read().await.is_empty());

        state.sign_in("s@example.com", "secret1").await.unwrap();
        state.sign_in("s@example.com", "secret1").await.unwrap();
        assert_eq!(state.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn short_password_is_a_validation_error() {
        let state = test_state();
        let err = state.sign_up("s@example.com", "123", Role::Student).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn invalid_profile_leaves_it_incomplete() {
        let state = test_state();
        let ctx = state.sign_up("t@example.com", "secret1", Role::Teacher).await.unwrap();
        let bad = ProfileSubmission { mobile_no: Some("123".into()), ..teacher_form() };
        assert!(state.complete_profile(ctx.uid(), &bad).await.is_err());
        assert!(!state.profile(ctx.uid()).await.unwrap().profile_completed());
        state.complete_profile(ctx.uid(), &teacher_form()).await.unwrap();
        let again = state.complete_profile(ctx.uid(), &teacher_form()).await.unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn enroll_and_toggle_scenario() {
        let state = test_state();
        let (_, course_id, lectures) = course_with_lectures(&state, 3).await;
        let student = signed_up(&state, "s@example.com", Role::Student).await;

        let (record, created) = state.enroll(&student, &course_id).await.unwrap();
        assert!(created);
        assert_eq!(record.progress, 0);
        assert_eq!(state.profile(&student).await.unwrap().enrollments().len(), 1);

        let r = state.toggle_lecture_completion(&student, &course_id, &lectures[1]).await.unwrap();
        assert_eq!(r.progress, 33);
        let r = state.toggle_lecture_completion(&student, &course_id, &lectures[1]).await.unwrap();
        assert_eq!(r.progress, 0);
        assert!(r.completed_lectures.is_empty());
    }

    #[tokio::test]
    async fn repeated_enroll_is_idempotent() {
        let state = test_state();
        let (_, course_id, _) = course_with_lectures(&state, 1).await;
        let student = signed_up(&state, "s@example.com", Role::Student).await;
        state.enroll(&student, &course_id).await.unwrap();
        let (_, created) = state.enroll(&student, &course_id).await.unwrap();
        assert!(!created);
        assert_eq!(state.profile(&student).await.unwrap().enrollments().len(), 1);
        assert_eq!(state.get_course(&course_id).await.unwrap().students_enrolled, 1);
    }

    #[tokio::test]
    async fn concurrent_enrollments_are_all_counted() {
        let state = test_state();
        let (_, course_id, _) = course_with_lectures(&state, 1).await;
        let mut students = vec![];
        for i in 0..8 {
            students.push(signed_up(&state, &format!("s{i}@example.com"), Role::Student).await);
        }
        let handles: Vec<_> = students
            .into_iter()
            .map(|uid| {
                let st = state.clone();
                let cid = course_id.clone();
                tokio::spawn(async move { st.enroll(&uid, &cid).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(state.get_course(&course_id).await.unwrap().students_enrolled, 8);
    }

    #[tokio::test]
    async fn concurrent_toggles_do_not_lose_updates() {
        let state = test_state();
        let (_, course_id, lectures) = course_with_lectures(&state, 4).await;
        let student = signed_up(&state, "s@example.com", Role::Student).await;
        state.enroll(&student, &course_id).await.unwrap();

        let handles: Vec<_> = lectures
            .iter()
            .cloned()
            .map(|lid| {
                let st = state.clone();
                let (uid, cid) = (student.clone(), course_id.clone());
                tokio::spawn(async move { st.toggle_lecture_completion(&uid, &cid, &lid).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let profile = state.profile(&student).await.unwrap();
        let record = ledger::find(profile.enrollments(), &course_id).unwrap();
        assert_eq!(record.completed_lectures.len(), 4);
        assert_eq!(record.progress, 100);
    }

    #[tokio::test]
    async fn teacher_cannot_enroll_and_student_cannot_author() {
        let state = test_state();
        let (teacher, course_id, _) = course_with_lectures(&state, 1).await;
        let student = signed_up(&state, "s@example.com", Role::Student).await;
        assert!(matches!(state.enroll(&teacher, &course_id).await, Err(AppError::Forbidden(_))));
        assert!(matches!(state.create_course(&student, new_course()).await, Err(AppError::Forbidden(_))));
        assert!(matches!(
            state.add_lecture(&student, &course_id, lecture("x", None)).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn toggling_unknown_lecture_is_not_found() {
        let state = test_state();
        let (_, course_id, _) = course_with_lectures(&state, 2).await;
        let student = signed_up(&state, "s@example.com", Role::Student).await;
        assert!(matches!(
            state.toggle_lecture_completion(&student, &course_id, "nope").await,
            Err(AppError::NotFound(_))
        ));
        state.enroll(&student, &course_id).await.unwrap();
        assert!(matches!(
            state.toggle_lecture_completion(&student, &course_id, "nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn quiz_lecture_scenario() {
        let state = test_state();
        let (teacher, course_id, _) = course_with_lectures(&state, 1).await;
        let l = state.add_lecture(&teacher, &course_id, lecture("Quiz time", Some(quiz(5)))).await.unwrap();
        assert!(l.has_quiz);

        let student = signed_up(&state, "s@example.com", Role::Student).await;
        state.enroll(&student, &course_id).await.unwrap();

        let incomplete: BTreeMap<usize, usize> = [(0, 0), (1, 1)].into_iter().collect();
        let err = state.submit_quiz(&student, &course_id, &l.id, &incomplete).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(state.get_attempt(&student, &l.id).await.is_none());

        // Questions 0..4 are correct at i % 4; answer two of them right.
        let answers: BTreeMap<usize, usize> = [(0, 0), (1, 1), (2, 0), (3, 0), (4, 1)].into_iter().collect();
        let attempt = state.submit_quiz(&student, &course_id, &l.id, &answers).await.unwrap();
        assert!((attempt.score - 40.0).abs() < 1e-9);
        assert_eq!(attempt.results.len(), 5);

        let again = state.submit_quiz(&student, &course_id, &l.id, &answers).await.unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));

        // Removing the lecture leaves the attempt dangling and does not fail.
        state.remove_lecture(&teacher, &course_id, &l.id).await.unwrap();
        assert!(state.get_attempt(&student, &l.id).await.is_some());
        assert!(state.get_course(&course_id).await.unwrap().lecture(&l.id).is_none());
    }

    #[tokio::test]
    async fn dangling_completion_can_be_cleared() {
        let state = test_state();
        let (teacher, course_id, lectures) = course_with_lectures(&state, 2).await;
        let student = signed_up(&state, "s@example.com", Role::Student).await;
        state.enroll(&student, &course_id).await.unwrap();
        state.toggle_lecture_completion(&student, &course_id, &lectures[0]).await.unwrap();
        state.remove_lecture(&teacher, &course_id, &lectures[0]).await.unwrap();

        let r = state.toggle_lecture_completion(&student, &course_id, &lectures[0]).await.unwrap();
        assert!(r.completed_lectures.is_empty());
        assert_eq!(r.progress, 0);
    }

    #[tokio::test]
    async fn dashboard_progress_follows_lecture_count() {
        let state = test_state();
        let (teacher, course_id, lectures) = course_with_lectures(&state, 2).await;
        let student = signed_up(&state, "s@example.com", Role::Student).await;
        state.enroll(&student, &course_id).await.unwrap();
        let r = state.toggle_lecture_completion(&student, &course_id, &lectures[0]).await.unwrap();
        assert_eq!(r.progress, 50);

        for title in ["L2", "L3"] {
            state.add_lecture(&teacher, &course_id, lecture(title, None)).await.unwrap();
        }
        let dash = state.dashboard(&student).await.unwrap();
        assert_eq!(dash[0].0.lectures.len(), 4);
        assert_eq!(dash[0].1.progress, 25);

        state.remove_lecture(&teacher, &course_id, &lectures[1]).await.unwrap();
        let dash = state.dashboard(&student).await.unwrap();
        assert_eq!(dash[0].1.progress, 33);
    }

    #[tokio::test]
    async fn only_owner_removes_lectures() {
        let state = test_state();
        let (_, course_id, lectures) = course_with_lectures(&state, 1).await;
        let other = signed_up(&state, "t2@example.com", Role::Teacher).await;
        assert!(matches!(
            state.remove_lecture(&other, &course_id, &lectures[0]).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn dashboard_lists_newest_enrollment_first() {
        let state = test_state();
        let (teacher, first, _) = course_with_lectures(&state, 1).await;
        let second = state.create_course(&teacher, new_course()).await.unwrap();
        let student = signed_up(&state, "s@example.com", Role::Student).await;
        state.enroll(&student, &first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        state.enroll(&student, &second.id).await.unwrap();

        let dash = state.dashboard(&student).await.unwrap();
        let ids: Vec<_> = dash.iter().map(|(c, _)| c.id.clone()).collect();
        assert_eq!(ids, vec![second.id.clone(), first]);
        assert_eq!(state.teacher_courses(&teacher).await.len(), 2);
    }
}
