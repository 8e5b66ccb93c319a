//! Content factories the pipeline hands its drafts to
//!
//! Persisting courses, sections, lessons and quizzes belongs to the host
//! application. [`InMemoryContent`] implements every factory by recording
//! drafts, for tests and dry runs.

use super::model::{
    CourseDraft, CourseRef, LessonDraft, LessonRef, QuizDraft, QuizRef, SectionDraft, SectionRef,
};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// Creates courses
#[async_trait]
pub trait CourseFactory: Send + Sync {
    /// Create a course and return its id
    async fn create_course(&self, draft: CourseDraft) -> Result<CourseRef>;
}

/// Creates sections
#[async_trait]
pub trait SectionFactory: Send + Sync {
    /// Create a section and return its id
    async fn create_section(&self, draft: SectionDraft) -> Result<SectionRef>;
}

/// Creates lessons with their items
#[async_trait]
pub trait LessonFactory: Send + Sync {
    /// Create a lesson and return its id
    async fn create_lesson(&self, draft: LessonDraft) -> Result<LessonRef>;
}

/// Creates quizzes with their questions
#[async_trait]
pub trait QuizFactory: Send + Sync {
    /// Create a quiz and return its id
    async fn create_quiz(&self, draft: QuizDraft) -> Result<QuizRef>;
}

/// Records every draft and hands out sequential ids
#[derive(Default)]
pub struct InMemoryContent {
    next_id: AtomicI64,
    courses: Mutex<Vec<(CourseRef, CourseDraft)>>,
    sections: Mutex<Vec<(SectionRef, SectionDraft)>>,
    lessons: Mutex<Vec<(LessonRef, LessonDraft)>>,
    quizzes: Mutex<Vec<(QuizRef, QuizDraft)>>,
}

impl InMemoryContent {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Courses created so far
    pub fn courses(&self) -> Vec<(CourseRef, CourseDraft)> {
        lock(&self.courses).clone()
    }

    /// Sections created so far
    pub fn sections(&self) -> Vec<(SectionRef, SectionDraft)> {
        lock(&self.sections).clone()
    }

    /// Lessons created so far
    pub fn lessons(&self) -> Vec<(LessonRef, LessonDraft)> {
        lock(&self.lessons).clone()
    }

    /// Quizzes created so far
    pub fn quizzes(&self) -> Vec<(QuizRef, QuizDraft)> {
        lock(&self.quizzes).clone()
    }

    /// Total number of entities created
    pub fn total(&self) -> usize {
        lock(&self.courses).len()
            + lock(&self.sections).len()
            + lock(&self.lessons).len()
            + lock(&self.quizzes).len()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl CourseFactory for InMemoryContent {
    async fn create_course(&self, draft: CourseDraft) -> Result<CourseRef> {
        let id = CourseRef(self.next_id());
        lock(&self.courses).push((id, draft));
        Ok(id)
    }
}

#[async_trait]
impl SectionFactory for InMemoryContent {
    async fn create_section(&self, draft: SectionDraft) -> Result<SectionRef> {
        let id = SectionRef(self.next_id());
        lock(&self.sections).push((id, draft));
        Ok(id)
    }
}

#[async_trait]
impl LessonFactory for InMemoryContent {
    async fn create_lesson(&self, draft: LessonDraft) -> Result<LessonRef> {
        let id = LessonRef(self.next_id());
        lock(&self.lessons).push((id, draft));
        Ok(id)
    }
}

#[async_trait]
impl QuizFactory for InMemoryContent {
    async fn create_quiz(&self, draft: QuizDraft) -> Result<QuizRef> {
        let id = QuizRef(self.next_id());
        lock(&self.quizzes).push((id, draft));
        Ok(id)
    }
}
