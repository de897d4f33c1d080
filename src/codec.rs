//! Chapter and scene type encoding.
//!
//! yWriter stores "is this a normal / notes / todo / unused chapter or scene"
//! in up to four overlapping fields that accumulated over several releases:
//!
//! | Field | Where | Meaning |
//! |-------|-------|---------|
//! | `<Unused>` | chapter, scene | presence flag, oldest encoding |
//! | `<Type>` | chapter | `1` = notes (legacy) |
//! | `<ChapterType>` | chapter | `0` normal, `1` notes, `2` todo |
//! | `Fields/Field_SceneType` | scene | `0` unused, `1` notes, `2` todo |
//!
//! The fields are mutually inconsistent in files written by different
//! versions, so decoding applies a fixed priority (most specific first) and
//! encoding always writes every field from a fixed table. Both directions are
//! pure functions; the reader and writer do the element lookups.

use serde::Serialize;

/// The ordinal classification shared by chapters and scenes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum EntityType {
    #[default]
    Normal = 0,
    Notes = 1,
    Todo = 2,
    Unused = 3,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Normal,
        EntityType::Notes,
        EntityType::Todo,
        EntityType::Unused,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal)).copied()
    }

    pub fn is_normal(self) -> bool {
        self == EntityType::Normal
    }
}

/// Chapter type fields as they are written to a `CHAPTER` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterTypeEncoding {
    /// Whether an `<Unused>` marker element must be present.
    pub unused: bool,
    /// Text of the legacy `<Type>` element.
    pub legacy_type: &'static str,
    /// Text of the `<ChapterType>` element.
    pub chapter_type: &'static str,
}

/// Scene type fields as they are written to a `SCENE` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTypeEncoding {
    /// Whether an `<Unused>` marker element must be present.
    pub unused: bool,
    /// Text of `Fields/Field_SceneType`, or `None` if the field must be removed.
    pub scene_type: Option<&'static str>,
}

/// Decode a chapter's type from its raw fields.
///
/// `chapter_type` wins over `legacy_type`; the unused flag only matters when
/// the winning field does not already name notes or todo. Without either
/// type field the chapter is normal, whatever the unused flag says.
pub fn decode_chapter_type(
    unused: bool,
    legacy_type: Option<&str>,
    chapter_type: Option<&str>,
) -> EntityType {
    match (chapter_type, legacy_type) {
        (Some("2"), _) => EntityType::Todo,
        (Some("1"), _) => EntityType::Notes,
        (Some(_), _) if unused => EntityType::Unused,
        (Some(_), _) => EntityType::Normal,
        (None, Some("1")) => EntityType::Notes,
        (None, Some(_)) if unused => EntityType::Unused,
        _ => EntityType::Normal,
    }
}

pub fn encode_chapter_type(ch_type: EntityType) -> ChapterTypeEncoding {
    let (unused, legacy_type, chapter_type) = match ch_type {
        EntityType::Normal => (false, "0", "0"),
        EntityType::Notes => (true, "1", "1"),
        EntityType::Todo => (true, "1", "2"),
        EntityType::Unused => (true, "1", "0"),
    };
    ChapterTypeEncoding {
        unused,
        legacy_type,
        chapter_type,
    }
}

/// Decode a scene's type from its raw fields.
pub fn decode_scene_type(unused: bool, scene_type: Option<&str>) -> EntityType {
    match scene_type {
        Some("1") => EntityType::Notes,
        Some("2") => EntityType::Todo,
        _ if unused => EntityType::Unused,
        _ => EntityType::Normal,
    }
}

pub fn encode_scene_type(sc_type: EntityType) -> SceneTypeEncoding {
    let (unused, scene_type) = match sc_type {
        EntityType::Normal => (false, None),
        EntityType::Notes => (true, Some("1")),
        EntityType::Todo => (true, Some("2")),
        EntityType::Unused => (true, Some("0")),
    };
    SceneTypeEncoding { unused, scene_type }
}
