//! Student transcript, course identity, and claimed-course bookkeeping.
//!
//! Courses never carry their own "already used" flag. Instead, the audit threads a
//! [`ClaimedCourses`] set from one program to the next and asks the transcript for
//! the courses that are still [candidates](Transcript::candidates).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::program::{normalize_title, CourseRef};
use crate::report::BlockReport;

/// Rejected client input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("Invalid course_code '{0}'. Course codes must be numeric.")]
    InvalidCourseCode(String),

    #[error("at least one program title is required")]
    NoPrograms,
}

/// Identity of a course, independent of credits and grade.
///
/// Subject codes compare case-insensitively; both parts ignore surrounding
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseKey {
    pub subject_code: String,
    pub course_code: String,
}

impl CourseKey {
    pub fn new(subject_code: &str, course_code: &str) -> Self {
        Self {
            subject_code: subject_code.trim().to_ascii_uppercase(),
            course_code: course_code.trim().to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject_code, self.course_code)
    }
}

/// A completed course on the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub subject_code: String,
    pub course_code: String,
    pub credit: u32,
    pub grade: String,
}

impl Course {
    pub fn new(
        subject_code: impl Into<String>,
        course_code: impl Into<String>,
        credit: u32,
        grade: impl Into<String>,
    ) -> Self {
        Self {
            subject_code: subject_code.into(),
            course_code: course_code.into(),
            credit,
            grade: grade.into(),
        }
    }

    /// Failed courses earn no credit and are never offered for matching.
    pub fn is_usable(&self) -> bool {
        self.credit != 0
    }

    pub fn key(&self) -> CourseKey {
        CourseKey::new(&self.subject_code, &self.course_code)
    }
}

/// A course offered to the matching engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCourse {
    pub subject_code: String,
    pub course_code: String,
    pub credit: u32,
    pub grade: String,
}

impl CandidateCourse {
    pub fn key(&self) -> CourseKey {
        CourseKey::new(&self.subject_code, &self.course_code)
    }

    /// The triple form used in requirement trees and reports.
    pub fn to_course_ref(&self) -> CourseRef {
        CourseRef::new(
            self.subject_code.clone(),
            self.course_code.clone(),
            self.credit.to_string(),
        )
    }
}

impl From<&Course> for CandidateCourse {
    fn from(course: &Course) -> Self {
        Self {
            subject_code: course.subject_code.trim().to_string(),
            course_code: course.course_code.trim().to_string(),
            credit: course.credit,
            grade: course.grade.clone(),
        }
    }
}

/// Where a claimed course went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseClaim {
    pub program_title: String,
    pub block_name: String,
}

/// Courses already assigned by an earlier report in the same audit run.
#[derive(Debug, Clone, Default)]
pub struct ClaimedCourses {
    claims: HashMap<CourseKey, CourseClaim>,
}

impl ClaimedCourses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, key: &CourseKey) -> bool {
        self.claims.contains_key(key)
    }

    pub fn get(&self, key: &CourseKey) -> Option<&CourseClaim> {
        self.claims.get(key)
    }

    /// Claim a course. The first claim wins; returns `false` if it was already held.
    pub fn claim(&mut self, key: CourseKey, claim: CourseClaim) -> bool {
        match self.claims.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(claim);
                true
            }
        }
    }

    /// Claim every course listed anywhere in `report` for `program_title`.
    ///
    /// Returns the number of newly claimed courses.
    pub fn record_report(&mut self, program_title: &str, report: &BlockReport) -> usize {
        let mut added = 0;
        for block in report.iter() {
            for course in &block.courses {
                let claim = CourseClaim {
                    program_title: program_title.to_string(),
                    block_name: block.name.clone(),
                };
                if self.claim(course.key(), claim) {
                    added += 1;
                }
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// A student's transcript and the programs to audit it against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    courses: Vec<Course>,
    program_titles: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, title: impl Into<String>) -> Self {
        self.add_program(title);
        self
    }

    pub fn with_course(mut self, course: Course) -> Self {
        self.add_course(course);
        self
    }

    /// Add a program title. Blank titles are ignored, as are repeats that differ
    /// only in case or surrounding whitespace.
    pub fn add_program(&mut self, title: impl Into<String>) {
        let title = title.into().trim().to_string();
        let key = normalize_title(&title);
        if !title.is_empty()
            && !self
                .program_titles
                .iter()
                .any(|known| normalize_title(known) == key)
        {
            self.program_titles.push(title);
        }
    }

    pub fn add_course(&mut self, course: Course) {
        self.courses.push(course);
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn program_titles(&self) -> &[String] {
        &self.program_titles
    }

    pub fn usable_courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.iter().filter(|c| c.is_usable())
    }

    /// Usable courses not yet claimed, in transcript order, each listed once.
    pub fn candidates(&self, claimed: &ClaimedCourses) -> Vec<CandidateCourse> {
        let mut seen = std::collections::HashSet::new();
        self.usable_courses()
            .filter(|c| !claimed.is_claimed(&c.key()))
            .filter(|c| seen.insert(c.key()))
            .map(CandidateCourse::from)
            .collect()
    }
}

/// One course as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseInput {
    pub subject_code: String,
    pub course_code: String,
    pub grade: String,
    pub credit: u32,
}

/// Audit request body: the programs to audit and the courses taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub program_titles: Vec<String>,
    pub courses: Vec<CourseInput>,
}

impl AuditRequest {
    /// Validate client input and build a transcript from it.
    pub fn into_transcript(self) -> Result<Transcript, TranscriptError> {
        let mut transcript = Transcript::new();
        for title in self.program_titles {
            transcript.add_program(title);
        }
        if transcript.program_titles().is_empty() {
            return Err(TranscriptError::NoPrograms);
        }

        for input in self.courses {
            let code = input.course_code.trim();
            if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
                return Err(TranscriptError::InvalidCourseCode(input.course_code));
            }
            transcript.add_course(Course::new(
                input.subject_code.trim(),
                code,
                input.credit,
                input.grade,
            ));
        }

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::BlockType;
    use crate::report::ReportStatus;

    fn transcript() -> Transcript {
        Transcript::new()
            .with_program("Computer Science Major Concentration (B.A.)")
            .with_course(Course::new("COMP", "206", 3, "A"))
            .with_course(Course::new("MATH", "223", 3, "B+"))
            .with_course(Course::new("COMP", "250", 0, "F"))
    }

    #[test]
    fn test_failed_course_is_not_usable() {
        let t = transcript();
        assert_eq!(t.courses().len(), 3);
        assert_eq!(t.usable_courses().count(), 2);
        assert!(t
            .candidates(&ClaimedCourses::new())
            .iter()
            .all(|c| c.course_code != "250"));
    }

    #[test]
    fn test_claimed_courses_are_not_candidates() {
        let t = transcript();
        let mut claimed = ClaimedCourses::new();
        claimed.claim(
            CourseKey::new("math", "223"),
            CourseClaim {
                program_title: "Economics Major Concentration (B.A.)".into(),
                block_name: "Required Courses".into(),
            },
        );

        let candidates = t.candidates(&claimed);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].key(), CourseKey::new("COMP", "206"));
    }

    #[test]
    fn test_first_claim_wins() {
        let mut claimed = ClaimedCourses::new();
        let key = CourseKey::new("COMP", "206");
        let first = CourseClaim {
            program_title: "A".into(),
            block_name: "Required Courses".into(),
        };
        let second = CourseClaim {
            program_title: "B".into(),
            block_name: "Required Courses".into(),
        };

        assert!(claimed.claim(key.clone(), first.clone()));
        assert!(!claimed.claim(key.clone(), second));
        assert_eq!(claimed.get(&key), Some(&first));
    }

    #[test]
    fn test_record_report_claims_nested_courses() {
        let report = BlockReport {
            name: "CS".into(),
            block_type: BlockType::Program,
            minimum_credit: Some(36),
            received_credit: Some(6),
            status: ReportStatus::Unfulfilled,
            notes: vec![],
            courses: vec![],
            blocks: vec![BlockReport {
                name: "Required Courses".into(),
                block_type: BlockType::Required,
                minimum_credit: Some(18),
                received_credit: Some(6),
                status: ReportStatus::Unfulfilled,
                notes: vec![],
                courses: vec![
                    CourseRef::new("COMP", "206", "3"),
                    CourseRef::new("MATH", "223", "3"),
                ],
                blocks: vec![],
            }],
        };

        let mut claimed = ClaimedCourses::new();
        assert_eq!(claimed.record_report("CS", &report), 2);
        assert_eq!(
            claimed.get(&CourseKey::new("MATH", "223")).unwrap().block_name,
            "Required Courses"
        );
    }

    #[test]
    fn test_duplicate_transcript_entries_offered_once() {
        let t = Transcript::new()
            .with_course(Course::new("COMP", "206", 3, "F"))
            .with_course(Course::new("COMP", "206", 3, "A"));
        assert_eq!(t.candidates(&ClaimedCourses::new()).len(), 1);
    }

    #[test]
    fn test_program_titles_deduplicated() {
        let t = Transcript::new()
            .with_program("Economics Major Concentration (B.A.)")
            .with_program(" Economics Major Concentration (B.A.) ")
            .with_program("economics major concentration (b.a.)")
            .with_program("");
        assert_eq!(t.program_titles(), ["Economics Major Concentration (B.A.)"]);
    }

    #[test]
    fn test_request_rejects_non_numeric_code() {
        let request = AuditRequest {
            program_titles: vec!["Economics Major Concentration (B.A.)".into()],
            courses: vec![CourseInput {
                subject_code: "ECON".into(),
                course_code: "227D1".into(),
                grade: "A".into(),
                credit: 3,
            }],
        };
        assert_eq!(
            request.into_transcript().unwrap_err(),
            TranscriptError::InvalidCourseCode("227D1".into())
        );
    }

    #[test]
    fn test_request_requires_programs() {
        let request = AuditRequest {
            program_titles: vec!["  ".into()],
            courses: vec![],
        };
        assert_eq!(
            request.into_transcript().unwrap_err(),
            TranscriptError::NoPrograms
        );
    }

    #[test]
    fn test_request_builds_transcript() {
        let request: AuditRequest = serde_json::from_str(
            r#"{
                "program_titles": ["Computer Science Major Concentration (B.A.)"],
                "courses": [
                    {"subject_code": "COMP", "course_code": " 206", "grade": "B+", "credit": 3},
                    {"subject_code": "MATH", "course_code": "223", "grade": "F", "credit": 0}
                ]
            }"#,
        )
        .unwrap();

        let transcript = request.into_transcript().unwrap();
        assert_eq!(transcript.courses()[0].course_code, "206");
        assert_eq!(transcript.usable_courses().count(), 1);
    }
}
