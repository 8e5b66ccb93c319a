//! The sync pipeline and its task-target face

use super::classify::{CardTag, ClassifiedListType, classify_card, classify_list, parse_marks, strip_tags};
use super::factories::{CourseFactory, LessonFactory, QuizFactory, SectionFactory};
use super::guard::SyncLocks;
use super::model::{
    CourseDraft, CourseRef, ExternalAttachment, ExternalCard, ExternalList, LessonDraft,
    LessonItemContent, LessonItemDraft, LessonRef, QuestionDraft, QuizDraft, SectionDraft,
    SectionRef,
};
use super::trello::TrelloClient;
use crate::credentials::{CredentialStore, SyncCredential};
use crate::error::{Error, Result};
use crate::executor::{
    INLINE_EXECUTOR, MethodDescriptor, QUEUED_EXECUTOR, ServiceScope, TaskTarget, panic_message,
};
use crate::storage::{AttachmentStorage, FileKind, StoredFile};
use crate::types::{CredentialId, Event, SyncReport, SyncStage};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::broadcast;

/// The four content factories
#[derive(Clone)]
pub struct ContentFactories {
    /// Creates courses
    pub courses: Arc<dyn CourseFactory>,
    /// Creates sections
    pub sections: Arc<dyn SectionFactory>,
    /// Creates lessons
    pub lessons: Arc<dyn LessonFactory>,
    /// Creates quizzes
    pub quizzes: Arc<dyn QuizFactory>,
}

impl ContentFactories {
    /// Use one value for all four factories
    pub fn shared<T>(factory: Arc<T>) -> Self
    where
        T: CourseFactory + SectionFactory + LessonFactory + QuizFactory + 'static,
    {
        Self {
            courses: factory.clone(),
            sections: factory.clone(),
            lessons: factory.clone(),
            quizzes: factory,
        }
    }
}

/// Everything a pipeline run needs, shared across runs
#[derive(Clone)]
pub struct SyncDependencies {
    /// Board service client
    pub trello: TrelloClient,
    /// Credential store holding the syncing flag
    pub credentials: Arc<dyn CredentialStore>,
    /// Content factories
    pub factories: ContentFactories,
    /// Where downloaded attachments go
    pub storage: Arc<dyn AttachmentStorage>,
    /// In-process per-credential locks
    pub locks: SyncLocks,
    /// Event channel
    pub event_tx: broadcast::Sender<Event>,
}

/// Arguments of the `sync_board` task methods
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBoardArgs {
    /// Credential whose board is imported
    pub credential_id: CredentialId,
    /// Board to import
    pub board_id: String,
}

/// Imports one board as a course
pub struct ContentSyncPipeline {
    deps: SyncDependencies,
}

/// Parent context and counters while walking a board
struct ImportState<'a> {
    credential: &'a SyncCredential,
    course: Option<CourseRef>,
    section: Option<SectionRef>,
    lesson: Option<LessonRef>,
    section_order: u32,
    lesson_order: u32,
    report: SyncReport,
}

impl<'a> ImportState<'a> {
    fn new(credential: &'a SyncCredential) -> Self {
        Self {
            credential,
            course: None,
            section: None,
            lesson: None,
            section_order: 0,
            lesson_order: 0,
            report: SyncReport::default(),
        }
    }

    fn token(&self) -> &str {
        &self.credential.api_token
    }

    fn require_course(&self, list: &ExternalList) -> Result<CourseRef> {
        self.course.ok_or_else(|| Error::MissingParent {
            list: list.name.clone(),
            parent: "course",
        })
    }

    fn require_section(&self, list: &ExternalList) -> Result<SectionRef> {
        self.section.ok_or_else(|| Error::MissingParent {
            list: list.name.clone(),
            parent: "section",
        })
    }
}

impl ContentSyncPipeline {
    /// Create a pipeline over shared dependencies
    pub fn new(deps: SyncDependencies) -> Self {
        Self { deps }
    }

    /// Import `board_id` for `credential_id`
    ///
    /// # Errors
    /// - [`Error::SyncInProgress`] when another run holds the credential;
    ///   nothing has been touched in that case
    /// - [`Error::CredentialNotFound`] for an unknown credential
    /// - [`Error::SyncPipeline`] for any failure after the guard was taken,
    ///   a panicking collaborator included, returned after the syncing flag
    ///   has been cleared
    pub async fn run(&self, credential_id: CredentialId, board_id: &str) -> Result<SyncReport> {
        let Some(_lock) = self.deps.locks.try_acquire(credential_id) else {
            tracing::info!(credential_id = %credential_id, "sync already running in this process");
            return Err(Error::SyncInProgress(credential_id));
        };

        let credential = self.deps.credentials.get(credential_id).await?;
        let began = self
            .deps
            .credentials
            .try_begin_sync(credential_id)
            .await
            .map_err(|e| Error::SyncPipeline {
                stage: SyncStage::Guarding,
                credential: credential_id,
                source: Box::new(e),
            })?;
        if !began {
            tracing::info!(credential_id = %credential_id, "credential already flagged as syncing");
            return Err(Error::SyncInProgress(credential_id));
        }

        tracing::info!(credential_id = %credential_id, board_id, "sync started");
        self.emit(Event::SyncStarted {
            credential: credential_id,
            board_id: board_id.to_string(),
        });

        let mut stage = SyncStage::Fetching;
        let outcome = AssertUnwindSafe(self.import(&credential, board_id, &mut stage))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(Error::Other(format!(
                    "import panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });

        let released = self
            .deps
            .credentials
            .end_sync(credential_id, outcome.is_ok())
            .await;

        let failure = match (outcome, released) {
            (Ok(report), Ok(())) => {
                tracing::info!(
                    credential_id = %credential_id,
                    courses = report.courses,
                    sections = report.sections,
                    lessons = report.lessons,
                    quizzes = report.quizzes,
                    skipped_lists = report.skipped_lists,
                    "sync completed"
                );
                self.emit(Event::SyncCompleted {
                    credential: credential_id,
                    report: report.clone(),
                });
                return Ok(report);
            }
            (Ok(_), Err(e)) => (SyncStage::Releasing, e),
            (Err(e), released) => {
                if let Err(release_error) = released {
                    tracing::error!(
                        credential_id = %credential_id,
                        error = %release_error,
                        "failed to clear syncing flag"
                    );
                }
                (stage, e)
            }
        };

        let (stage, source) = failure;
        let error = Error::SyncPipeline {
            stage,
            credential: credential_id,
            source: Box::new(source),
        };
        tracing::error!(credential_id = %credential_id, %stage, error = %error, "sync failed");
        self.emit(Event::SyncFailed {
            credential: credential_id,
            stage,
            error: error.to_string(),
        });
        Err(error)
    }

    async fn import(
        &self,
        credential: &SyncCredential,
        board_id: &str,
        stage: &mut SyncStage,
    ) -> Result<SyncReport> {
        *stage = SyncStage::Fetching;
        let lists = self.deps.trello.lists(&credential.api_token, board_id).await?;

        *stage = SyncStage::Dispatching;
        let mut state = ImportState::new(credential);

        for list in &lists {
            let kind = if list.closed {
                ClassifiedListType::Other
            } else {
                classify_list(&list.name)
            };

            match kind {
                ClassifiedListType::Course => self.import_course(&mut state, list).await?,
                ClassifiedListType::Section => self.import_section(&mut state, list).await?,
                ClassifiedListType::Lesson => self.import_lesson(&mut state, list).await?,
                ClassifiedListType::Test => self.import_test(&mut state, list).await?,
                ClassifiedListType::Other => {
                    tracing::debug!(list = %list.name, "skipping list without a recognized tag");
                    state.report.skipped_lists += 1;
                }
            }
        }

        Ok(state.report)
    }

    async fn import_course(&self, state: &mut ImportState<'_>, list: &ExternalList) -> Result<()> {
        let cards = self.deps.trello.cards(state.token(), &list.id).await?;

        let cover = match find_tagged(&cards, CardTag::Image).and_then(ExternalCard::first_attachment) {
            Some(attachment) => Some(self.store_attachment(state, attachment).await?),
            None => None,
        };

        let draft = CourseDraft {
            credential: state.credential.id,
            source_list_id: list.id.clone(),
            title: title_of(&list.name),
            description: description_of(&cards),
            cover,
        };
        let title = draft.title.clone();
        let course = self.deps.factories.courses.create_course(draft).await?;

        state.course = Some(course);
        state.section = None;
        state.lesson = None;
        state.section_order = 0;
        state.lesson_order = 0;
        state.report.courses += 1;

        tracing::info!(course_id = %course, %title, "course created");
        Ok(())
    }

    async fn import_section(&self, state: &mut ImportState<'_>, list: &ExternalList) -> Result<()> {
        let course = state.require_course(list)?;
        let cards = self.deps.trello.cards(state.token(), &list.id).await?;

        let order = state.section_order + 1;
        let section = self
            .deps
            .factories
            .sections
            .create_section(SectionDraft {
                course,
                title: title_of(&list.name),
                description: description_of(&cards),
                order,
            })
            .await?;

        state.section_order = order;
        state.section = Some(section);
        state.lesson = None;
        state.lesson_order = 0;
        state.report.sections += 1;

        tracing::debug!(section_id = %section, order, "section created");
        Ok(())
    }

    async fn import_lesson(&self, state: &mut ImportState<'_>, list: &ExternalList) -> Result<()> {
        let section = state.require_section(list)?;
        let course = state.require_course(list)?;
        let cards = self.deps.trello.cards(state.token(), &list.id).await?;

        let mut items = Vec::new();
        for card in &cards {
            let content = match classify_card(&card.name) {
                CardTag::Description => card.description_text().map(|body| LessonItemContent::Text {
                    body: body.to_string(),
                }),
                CardTag::Video => card
                    .first_attachment()
                    .map(|a| a.url.clone())
                    .or_else(|| card.description_text().map(str::to_string))
                    .map(|url| LessonItemContent::Video { url }),
                CardTag::Pdf => match card.first_attachment() {
                    Some(attachment) => Some(LessonItemContent::Pdf {
                        file: self.store_attachment(state, attachment).await?,
                    }),
                    None => None,
                },
                CardTag::Image => match card.first_attachment() {
                    Some(attachment) => Some(LessonItemContent::Image {
                        file: self.store_attachment(state, attachment).await?,
                    }),
                    None => None,
                },
                CardTag::Marks | CardTag::Untagged => {
                    tracing::debug!(card = %card.name, "skipping card without a lesson item tag");
                    continue;
                }
            };

            let Some(content) = content else {
                tracing::warn!(card = %card.name, "tagged card has no content, skipping");
                continue;
            };

            items.push(LessonItemDraft {
                order: items.len() as u32 + 1,
                title: title_of(&card.name),
                content,
            });
        }

        let order = state.lesson_order + 1;
        let item_count = items.len() as u32;
        let lesson = self
            .deps
            .factories
            .lessons
            .create_lesson(LessonDraft {
                course,
                section,
                title: title_of(&list.name),
                order,
                items,
            })
            .await?;

        state.lesson_order = order;
        state.lesson = Some(lesson);
        state.report.lessons += 1;
        state.report.lesson_items += item_count;

        tracing::debug!(lesson_id = %lesson, order, items = item_count, "lesson created");
        Ok(())
    }

    async fn import_test(&self, state: &mut ImportState<'_>, list: &ExternalList) -> Result<()> {
        let course = state.require_course(list)?;
        let cards = self.deps.trello.cards(state.token(), &list.id).await?;

        let mut description = None;
        let mut pass_mark = None;
        let mut questions = Vec::new();

        for card in &cards {
            match classify_card(&card.name) {
                CardTag::Description => {
                    if description.is_none() {
                        description = card.description_text().map(str::to_string);
                    }
                }
                CardTag::Marks => {
                    pass_mark = parse_marks(&card.name)
                        .or_else(|| card.description_text().and_then(|d| d.parse().ok()));
                }
                _ => {
                    let image = match card.attachments.iter().find(|a| is_image(a)) {
                        Some(attachment) => Some(self.store_attachment(state, attachment).await?),
                        None => None,
                    };
                    questions.push(QuestionDraft {
                        order: questions.len() as u32 + 1,
                        prompt: title_of(&card.name),
                        answer: card.description.trim().to_string(),
                        image,
                    });
                }
            }
        }

        let question_count = questions.len() as u32;
        let quiz = self
            .deps
            .factories
            .quizzes
            .create_quiz(QuizDraft {
                course,
                lesson: state.lesson,
                title: title_of(&list.name),
                description,
                pass_mark,
                questions,
            })
            .await?;

        state.report.quizzes += 1;
        state.report.questions += question_count;

        tracing::debug!(quiz_id = %quiz, questions = question_count, "quiz created");
        Ok(())
    }

    async fn store_attachment(
        &self,
        state: &mut ImportState<'_>,
        attachment: &ExternalAttachment,
    ) -> Result<StoredFile> {
        let file = self
            .deps
            .trello
            .download_attachment(state.token(), attachment)
            .await?;
        let stored = self.deps.storage.store(file).await?;
        state.report.attachments += 1;
        Ok(stored)
    }

    fn emit(&self, event: Event) {
        // send() fails only when nobody is subscribed
        self.deps.event_tx.send(event).ok();
    }
}

/// Title of a list or card: its name without tags, or the raw name if only tags remain
fn title_of(name: &str) -> String {
    let stripped = strip_tags(name);
    if stripped.is_empty() {
        name.trim().to_string()
    } else {
        stripped
    }
}

fn find_tagged(cards: &[ExternalCard], tag: CardTag) -> Option<&ExternalCard> {
    cards.iter().find(|card| classify_card(&card.name) == tag)
}

fn description_of(cards: &[ExternalCard]) -> Option<String> {
    find_tagged(cards, CardTag::Description)
        .and_then(ExternalCard::description_text)
        .map(str::to_string)
}

fn is_image(attachment: &ExternalAttachment) -> bool {
    FileKind::classify(attachment.mime_type.as_deref(), &attachment.name) == FileKind::Image
}

#[async_trait]
impl TaskTarget for ContentSyncPipeline {
    const TARGET: &'static str = "ContentSyncPipeline";

    fn methods() -> &'static [MethodDescriptor] {
        const METHODS: &[MethodDescriptor] = &[
            MethodDescriptor::task("sync_board", QUEUED_EXECUTOR),
            MethodDescriptor::task("sync_board_now", INLINE_EXECUTOR),
        ];
        METHODS
    }

    fn from_scope(scope: &ServiceScope) -> Result<Self> {
        Ok(Self::new(scope.resolve::<SyncDependencies>()?))
    }

    async fn invoke(&self, method: &str, args: serde_json::Value) -> Result<()> {
        match method {
            "sync_board" | "sync_board_now" => {
                let args: SyncBoardArgs =
                    serde_json::from_value(args).map_err(|e| Error::InvalidArgs {
                        method: method.to_string(),
                        reason: e.to_string(),
                    })?;
                self.run(args.credential_id, &args.board_id).await.map(|_| ())
            }
            other => Err(Error::MethodNotFound {
                target: Self::TARGET.to_string(),
                method: other.to_string(),
            }),
        }
    }
}
