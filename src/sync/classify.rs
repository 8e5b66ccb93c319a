//! Naming conventions on the board
//!
//! A list's name carries a bracket tag saying what it becomes:
//! `[Course]`, `[Section]`, `[Lesson]` or `[Test]`, matched
//! case-insensitively anywhere in the name. Lists without one of these tags
//! are skipped.
//!
//! Card names carry their own tags. A card may carry several; the first match
//! in this order wins: `[Description]`, `Marks:`, `[Video]`, `[PDF]`, `[Image]`.

#![allow(clippy::expect_used)] // literal patterns, checked by the tests below

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static LIST_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*(course|section|lesson|test)\s*\]").expect("list tag pattern")
});

static CARD_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*(description|video|pdf|image)\s*\]").expect("card tag pattern")
});

static MARKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)marks\s*:\s*(\d+)?").expect("marks pattern"));

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("bracket pattern"));

/// What a board list turns into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedListType {
    /// A new course
    Course,
    /// A section of the current course
    Section,
    /// A lesson of the current section
    Lesson,
    /// A quiz for the current course
    Test,
    /// Not part of the course; skipped
    Other,
}

/// What a card turns into inside its list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardTag {
    /// Description text of the enclosing entity
    Description,
    /// Pass mark of a quiz
    Marks,
    /// Video item
    Video,
    /// PDF item
    Pdf,
    /// Image item
    Image,
    /// No recognized tag
    Untagged,
}

/// Classify a list by the first recognized bracket tag in its name
pub fn classify_list(name: &str) -> ClassifiedListType {
    let Some(captures) = LIST_TAG.captures(name) else {
        return ClassifiedListType::Other;
    };

    match captures[1].to_ascii_lowercase().as_str() {
        "course" => ClassifiedListType::Course,
        "section" => ClassifiedListType::Section,
        "lesson" => ClassifiedListType::Lesson,
        "test" => ClassifiedListType::Test,
        _ => ClassifiedListType::Other,
    }
}

/// Classify a card name; precedence is fixed, not positional
pub fn classify_card(name: &str) -> CardTag {
    let mut found = Vec::new();
    for captures in CARD_TAG.captures_iter(name) {
        found.push(match captures[1].to_ascii_lowercase().as_str() {
            "description" => CardTag::Description,
            "video" => CardTag::Video,
            "pdf" => CardTag::Pdf,
            _ => CardTag::Image,
        });
    }
    if MARKS.is_match(name) {
        found.push(CardTag::Marks);
    }

    [
        CardTag::Description,
        CardTag::Marks,
        CardTag::Video,
        CardTag::Pdf,
        CardTag::Image,
    ]
    .into_iter()
    .find(|tag| found.contains(tag))
    .unwrap_or(CardTag::Untagged)
}

/// Name with every bracket tag removed and whitespace collapsed
pub fn strip_tags(name: &str) -> String {
    ANY_TAG
        .replace_all(name, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number following `Marks:` in `text`, if any
pub fn parse_marks(text: &str) -> Option<u32> {
    MARKS
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
