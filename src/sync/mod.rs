//! Board to course synchronization
//!
//! [`ContentSyncPipeline`] imports a board from the external board service
//! and turns it into a course through the content factories:
//!
//! 1. **Guarding**: at most one run per credential, enforced by an
//!    in-process lock ([`SyncLocks`]) and the persisted syncing flag.
//! 2. **Fetching**: the board's lists, in board order.
//! 3. **Dispatching**: each list is classified by its name
//!    ([`classify_list`]) and handed to the matching factory, downloading
//!    attachments on the way.
//! 4. **Releasing**: the syncing flag is cleared whatever happened.
//!
//! Failures after the guard are wrapped in
//! [`Error::SyncPipeline`](crate::Error::SyncPipeline) with the stage that
//! failed.

mod classify;
mod factories;
mod guard;
mod model;
mod pipeline;
mod trello;

pub use classify::{CardTag, ClassifiedListType, classify_card, classify_list, parse_marks, strip_tags};
pub use factories::{CourseFactory, InMemoryContent, LessonFactory, QuizFactory, SectionFactory};
pub use guard::SyncLocks;
pub use model::{
    CourseDraft, CourseRef, ExternalAttachment, ExternalCard, ExternalList, LessonDraft,
    LessonItemContent, LessonItemDraft, LessonRef, QuestionDraft, QuizDraft, QuizRef,
    SectionDraft, SectionRef,
};
pub use pipeline::{ContentFactories, ContentSyncPipeline, SyncBoardArgs, SyncDependencies};
pub use trello::TrelloClient;
