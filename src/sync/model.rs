//! Board projections and content drafts

use crate::storage::StoredFile;
use crate::types::CredentialId;
use serde::{Deserialize, Serialize};

/// A list on the external board
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalList {
    /// Board service id
    pub id: String,
    /// List name, carrying the classification tag
    pub name: String,
    /// Archived lists are reported but not imported
    #[serde(default)]
    pub closed: bool,
}

/// A card inside a list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCard {
    /// Board service id
    pub id: String,
    /// Card name, carrying the card tag
    pub name: String,
    /// Card description (`desc` on the wire)
    #[serde(rename = "desc", default)]
    pub description: String,
    /// Attachments in the order the service reports them
    #[serde(default)]
    pub attachments: Vec<ExternalAttachment>,
}

/// A file or link attached to a card
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAttachment {
    /// Board service id
    pub id: String,
    /// Display name, usually the original file name
    #[serde(default)]
    pub name: String,
    /// Download URL
    pub url: String,
    /// MIME type reported by the service
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
    /// True for uploaded files, false for links
    #[serde(rename = "isUpload", default)]
    pub is_upload: bool,
}

impl ExternalCard {
    /// The first attachment, if any
    pub fn first_attachment(&self) -> Option<&ExternalAttachment> {
        self.attachments.first()
    }

    /// Description with surrounding whitespace removed, None when blank
    pub fn description_text(&self) -> Option<&str> {
        Some(self.description.trim()).filter(|d| !d.is_empty())
    }
}

macro_rules! entity_ref {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_ref!(
    /// Id of a course created by a [`CourseFactory`](super::CourseFactory)
    CourseRef
);
entity_ref!(
    /// Id of a section created by a [`SectionFactory`](super::SectionFactory)
    SectionRef
);
entity_ref!(
    /// Id of a lesson created by a [`LessonFactory`](super::LessonFactory)
    LessonRef
);
entity_ref!(
    /// Id of a quiz created by a [`QuizFactory`](super::QuizFactory)
    QuizRef
);

/// A course to create
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDraft {
    /// Credential whose board the course came from
    pub credential: CredentialId,
    /// List the course was built from
    pub source_list_id: String,
    /// Title, the list name without its tag
    pub title: String,
    /// Text of the `[Description]` card
    pub description: Option<String>,
    /// Cover image from the `[Image]` card
    pub cover: Option<StoredFile>,
}

/// A section to create
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDraft {
    /// Owning course
    pub course: CourseRef,
    /// Title, the list name without its tag
    pub title: String,
    /// Text of the `[Description]` card
    pub description: Option<String>,
    /// Position within the course, starting at 1
    pub order: u32,
}

/// A lesson to create, with its items
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDraft {
    /// Owning course
    pub course: CourseRef,
    /// Owning section
    pub section: SectionRef,
    /// Title, the list name without its tag
    pub title: String,
    /// Position within the section, starting at 1
    pub order: u32,
    /// Items in card order
    pub items: Vec<LessonItemDraft>,
}

/// One item of a lesson
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonItemDraft {
    /// Position within the lesson, starting at 1
    pub order: u32,
    /// Title, the card name without its tag
    pub title: String,
    /// Content of the item
    pub content: LessonItemContent,
}

/// Content of a lesson item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LessonItemContent {
    /// Text from a `[Description]` card
    Text {
        /// Body text
        body: String,
    },
    /// Video link from a `[Video]` card
    Video {
        /// Video URL
        url: String,
    },
    /// Downloaded file from a `[PDF]` card
    Pdf {
        /// Stored file
        file: StoredFile,
    },
    /// Downloaded file from an `[Image]` card
    Image {
        /// Stored file
        file: StoredFile,
    },
}

/// A quiz to create, with its questions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDraft {
    /// Owning course
    pub course: CourseRef,
    /// Lesson the quiz follows, if one was created before it
    pub lesson: Option<LessonRef>,
    /// Title, the list name without its tag
    pub title: String,
    /// Text of the `[Description]` card
    pub description: Option<String>,
    /// Pass mark from the `Marks:` card
    pub pass_mark: Option<u32>,
    /// Questions in card order
    pub questions: Vec<QuestionDraft>,
}

/// One question of a quiz
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    /// Position within the quiz, starting at 1
    pub order: u32,
    /// Question text, the card name
    pub prompt: String,
    /// Expected answer, the card description
    pub answer: String,
    /// Image attached to the question
    pub image: Option<StoredFile>,
}
