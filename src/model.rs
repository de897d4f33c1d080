//! The project entity model.
//!
//! A [`Project`] owns every entity of a yWriter project in five independent
//! id → entity maps (chapters, scenes, characters, locations, items, plus
//! project notes). Maps have no meaningful order; document order is defined
//! exclusively by the `srt_*` ordering lists and by each chapter's
//! `srt_scenes`.
//!
//! ## Unset vs. cleared
//!
//! Almost every field is an `Option`. `None` means "unknown / no opinion",
//! which is what a partial reader leaves behind and what the merge engine
//! skips. `Some("")` is an explicit value that overwrites. The two are never
//! collapsed.
//!
//! ## Scene content
//!
//! Scene text is private: it can only be changed through
//! [`Scene::set_content`], which re-derives the word and letter counts with
//! a fixed tokenization rule. Counts are never stored independently.

use crate::codec::EntityType;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Custom fields (`Fields/Field_*`) keyed by element name.
///
/// Registered field names are pre-inserted with `None` by the reader, so a
/// key with a `None` value means "known field, not present in the file".
pub type CustomFields = BTreeMap<String, Option<String>>;

/// Dashes that separate words.
static ADDITIONAL_WORD_LIMITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("--|—|–").expect("valid regex"));

/// Markup, comments, hyphens and quote markers that never separate words.
static NO_WORD_LIMITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\[.+?\]|/\*.+?\*/|-|^>").expect("valid regex"));

/// Markup, comments and line breaks that do not count as letters.
static NON_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.+?\]|/\*.+?\*/|\n|\r").expect("valid regex"));

/// `[lang=xx]` markup inside scene content.
static LANGUAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[lang=(.*?)\]").expect("valid regex"));

/// Number of words in scene content, ignoring inline markup and comments.
pub fn count_words(text: &str) -> usize {
    let text = ADDITIONAL_WORD_LIMITS.replace_all(text, " ");
    let text = NO_WORD_LIMITS.replace_all(&text, "");
    text.split_whitespace().count()
}

/// Number of characters in scene content, excluding markup and line breaks.
pub fn count_letters(text: &str) -> usize {
    NON_LETTERS.replace_all(text, "").chars().count()
}

/// Split a `;`-separated list into trimmed, non-empty entries.
///
/// Order is kept and duplicates are not removed. Returns `None` when the text
/// yields no entries at all.
pub fn string_to_list(text: &str, divider: char) -> Option<Vec<String>> {
    let list: Vec<String> = text
        .split(divider)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (!list.is_empty()).then_some(list)
}

pub fn list_to_string(list: &[String], divider: char) -> String {
    list.join(&divider.to_string())
}

/// Scene editing status. Absent (or `0` in the file) means "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SceneStatus {
    Outline = 1,
    Draft = 2,
    FirstEdit = 3,
    SecondEdit = 4,
    Done = 5,
}

impl SceneStatus {
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(SceneStatus::Outline),
            2 => Some(SceneStatus::Draft),
            3 => Some(SceneStatus::FirstEdit),
            4 => Some(SceneStatus::SecondEdit),
            5 => Some(SceneStatus::Done),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            SceneStatus::Outline => "Outline",
            SceneStatus::Draft => "Draft",
            SceneStatus::FirstEdit => "1st Edit",
            SceneStatus::SecondEdit => "2nd Edit",
            SceneStatus::Done => "Done",
        }
    }
}

/// Whether a chapter is a plain chapter or begins a new part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ChapterLevel {
    #[default]
    Chapter = 0,
    Part = 1,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectNote {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub kw_var: CustomFields,
}

/// Common fields of characters, locations and items.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorldElement {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Alternate name.
    pub aka: Option<String>,
    /// Image file path.
    pub image: Option<String>,
    pub kw_var: CustomFields,
}

pub type Location = WorldElement;
pub type Item = WorldElement;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Character {
    #[serde(flatten)]
    pub element: WorldElement,
    pub notes: Option<String>,
    pub bio: Option<String>,
    pub goals: Option<String>,
    pub full_name: Option<String>,
    pub is_major: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Chapter {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub ch_level: Option<ChapterLevel>,
    pub ch_type: Option<EntityType>,
    pub suppress_chapter_title: Option<bool>,
    pub suppress_chapter_break: Option<bool>,
    /// At most one chapter per project is the trash bin.
    pub is_trash: Option<bool>,
    /// Ordered ids of the scenes in this chapter.
    pub srt_scenes: Vec<String>,
    pub kw_var: CustomFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    pub title: Option<String>,
    pub desc: Option<String>,
    /// Only changed through [`Scene::set_content`], which keeps the counts in step.
    pub(crate) content: Option<String>,
    pub(crate) word_count: usize,
    pub(crate) letter_count: usize,
    pub sc_type: Option<EntityType>,
    pub status: Option<SceneStatus>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    /// The four user-titled rating fields: `"1"` means "not applicable",
    /// `"2"`..`"10"` is a rating.
    pub fields: [Option<String>; 4],
    /// ISO date (`YYYY-MM-DD`) of a specific date/time.
    pub date: Option<String>,
    /// Time of day (`HH:MM:SS`), used with either `date` or `day`.
    pub time: Option<String>,
    /// Relative day number of an unspecific date/time.
    pub day: Option<String>,
    pub lasts_days: Option<String>,
    pub lasts_hours: Option<String>,
    pub lasts_minutes: Option<String>,
    pub is_reaction_scene: Option<bool>,
    pub is_sub_plot: Option<bool>,
    pub goal: Option<String>,
    pub conflict: Option<String>,
    pub outcome: Option<String>,
    /// Character ids, viewpoint first. `None` means "not tracked".
    pub characters: Option<Vec<String>>,
    pub locations: Option<Vec<String>>,
    pub items: Option<Vec<String>>,
    pub image: Option<String>,
    pub do_not_export: Option<bool>,
    /// Suppresses the scene divider before this scene.
    pub append_to_prev: Option<bool>,
    pub kw_var: CustomFields,
}

impl Scene {
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Replace the scene text and re-derive word and letter counts.
    pub fn set_content(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.word_count = count_words(&text);
        self.letter_count = count_letters(&text);
        self.content = Some(text);
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn letter_count(&self) -> usize {
        self.letter_count
    }
}

/// The root of the entity model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Project {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub author_name: Option<String>,
    pub author_bio: Option<String>,
    /// User-defined titles of the four scene rating fields.
    pub field_titles: [Option<String>; 4],
    pub word_count_start: Option<i64>,
    pub word_target: Option<i64>,
    pub language_code: Option<String>,
    pub country_code: Option<String>,
    /// Languages used in `[lang=xx]` markup. `None` means "not yet scanned".
    pub languages: Option<Vec<String>>,
    pub kw_var: CustomFields,

    pub chapters: BTreeMap<String, Chapter>,
    pub scenes: BTreeMap<String, Scene>,
    pub characters: BTreeMap<String, Character>,
    pub locations: BTreeMap<String, Location>,
    pub items: BTreeMap<String, Item>,
    pub project_notes: BTreeMap<String, ProjectNote>,

    pub srt_chapters: Vec<String>,
    pub srt_characters: Vec<String>,
    pub srt_locations: Vec<String>,
    pub srt_items: Vec<String>,
    pub srt_prj_notes: Vec<String>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force every scene of a non-normal chapter to the chapter's type.
    pub fn adjust_scene_types(&mut self) {
        for ch_id in &self.srt_chapters {
            let Some(chapter) = self.chapters.get(ch_id) else {
                continue;
            };
            let ch_type = chapter.ch_type.unwrap_or_default();
            if ch_type.is_normal() {
                continue;
            }
            for sc_id in &chapter.srt_scenes {
                if let Some(scene) = self.scenes.get_mut(sc_id) {
                    scene.sc_type = Some(ch_type);
                }
            }
        }
    }

    /// The chapter whose scene list contains `sc_id`.
    pub fn chapter_of_scene(&self, sc_id: &str) -> Option<&str> {
        self.srt_chapters
            .iter()
            .chain(self.chapters.keys())
            .find(|ch_id| {
                self.chapters
                    .get(*ch_id)
                    .is_some_and(|ch| ch.srt_scenes.iter().any(|s| s == sc_id))
            })
            .map(String::as_str)
    }

    /// `(chapter id, scene id)` pairs in document order.
    pub fn scenes_in_order(&self) -> impl Iterator<Item = (&str, &str)> {
        self.srt_chapters.iter().flat_map(move |ch_id| {
            self.chapters
                .get(ch_id)
                .into_iter()
                .flat_map(|ch| ch.srt_scenes.iter())
                .filter(|sc_id| self.scenes.contains_key(*sc_id))
                .map(move |sc_id| (ch_id.as_str(), sc_id.as_str()))
        })
    }

    /// Titles of the characters referenced by a scene, viewpoint first.
    pub fn scene_character_titles(&self, sc_id: &str) -> Vec<String> {
        let refs = self.scenes.get(sc_id).and_then(|s| s.characters.as_ref());
        resolve_titles(refs, |id| {
            self.characters.get(id).and_then(|c| c.element.title.clone())
        })
    }

    pub fn scene_location_titles(&self, sc_id: &str) -> Vec<String> {
        let refs = self.scenes.get(sc_id).and_then(|s| s.locations.as_ref());
        resolve_titles(refs, |id| self.locations.get(id).and_then(|l| l.title.clone()))
    }

    pub fn scene_item_titles(&self, sc_id: &str) -> Vec<String> {
        let refs = self.scenes.get(sc_id).and_then(|s| s.items.as_ref());
        resolve_titles(refs, |id| self.items.get(id).and_then(|i| i.title.clone()))
    }

    /// Title of the scene's viewpoint character (the first one listed).
    pub fn viewpoint_character(&self, sc_id: &str) -> Option<String> {
        self.scene_character_titles(sc_id).into_iter().next()
    }

    /// Languages used in `[lang=xx]` markup across all scene content, in
    /// order of first appearance.
    pub fn detect_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = Vec::new();
        for scene in self.scenes.values() {
            let Some(text) = scene.content() else {
                continue;
            };
            for caps in LANGUAGE_TAG.captures_iter(text) {
                let code = &caps[1];
                if !languages.iter().any(|l| l == code) {
                    languages.push(code.to_string());
                }
            }
        }
        languages
    }

    /// Total word count of all normal scenes in document order.
    pub fn total_words(&self) -> usize {
        self.scenes_in_order()
            .filter_map(|(_, sc_id)| self.scenes.get(sc_id))
            .filter(|s| s.sc_type.unwrap_or_default().is_normal())
            .map(Scene::word_count)
            .sum()
    }
}

fn resolve_titles(
    refs: Option<&Vec<String>>,
    title_of: impl Fn(&str) -> Option<String>,
) -> Vec<String> {
    refs.map(|ids| ids.iter().filter_map(|id| title_of(id)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_ignore_markup_and_linebreaks() {
        let mut scene = Scene::default();
        scene.set_content("Hello [i]world[/i].\n");
        assert_eq!(scene.word_count(), 2);
        assert_eq!(scene.letter_count(), "Hello world.".len());
    }

    #[test]
    fn counts_are_independent_of_call_order() {
        let mut a = Scene::default();
        a.set_content("One two three.");
        a.set_content("Hello [i]world[/i].\n");
        let mut b = Scene::default();
        b.set_content("Hello [i]world[/i].\n");
        assert_eq!(a.word_count(), b.word_count());
        assert_eq!(a.letter_count(), b.letter_count());
    }

    #[test]
    fn dashes_separate_words_but_hyphens_do_not() {
        assert_eq!(count_words("well--known"), 2);
        assert_eq!(count_words("well—known"), 2);
        assert_eq!(count_words("well-known"), 1);
    }

    #[test]
    fn comments_are_not_counted() {
        assert_eq!(count_words("Visible /* hidden note */ text"), 2);
        assert_eq!(count_letters("ab/*cd*/\r\n"), 2);
    }

    #[test]
    fn quote_marker_at_line_start_is_ignored() {
        assert_eq!(count_words("> quoted line"), 2);
        assert_eq!(count_words(">"), 0);
    }

    #[test]
    fn letters_count_characters_not_bytes() {
        assert_eq!(count_letters("Grüße"), 5);
    }

    #[test]
    fn empty_content_has_zero_counts() {
        let mut scene = Scene::default();
        scene.set_content("");
        assert_eq!(scene.content(), Some(""));
        assert_eq!(scene.word_count(), 0);
        assert_eq!(scene.letter_count(), 0);
    }

    #[test]
    fn string_to_list_keeps_order_and_duplicates() {
        assert_eq!(
            string_to_list(" b; a ;;b ", ';'),
            Some(vec!["b".to_string(), "a".to_string(), "b".to_string()])
        );
        assert_eq!(string_to_list("", ';'), None);
        assert_eq!(string_to_list(" ; ", ';'), None);
    }

    #[test]
    fn status_ordinals() {
        assert_eq!(SceneStatus::from_ordinal(0), None);
        assert_eq!(SceneStatus::from_ordinal(3), Some(SceneStatus::FirstEdit));
        assert_eq!(SceneStatus::Done.ordinal(), 5);
        assert!(SceneStatus::SecondEdit > SceneStatus::Draft);
    }

    fn project_with_chapter(ch_type: EntityType) -> Project {
        let mut project = Project::new();
        project.chapters.insert(
            "1".into(),
            Chapter {
                ch_type: Some(ch_type),
                srt_scenes: vec!["1".into(), "2".into()],
                ..Chapter::default()
            },
        );
        project.srt_chapters.push("1".into());
        for id in ["1", "2"] {
            project.scenes.insert(
                id.into(),
                Scene {
                    sc_type: Some(EntityType::Normal),
                    ..Scene::default()
                },
            );
        }
        project
    }

    #[test]
    fn todo_chapter_forces_scene_type() {
        let mut project = project_with_chapter(EntityType::Todo);
        project.adjust_scene_types();
        for scene in project.scenes.values() {
            assert_eq!(scene.sc_type, Some(EntityType::Todo));
        }
    }

    #[test]
    fn normal_chapter_leaves_scene_types() {
        let mut project = project_with_chapter(EntityType::Normal);
        project.scenes.get_mut("2").unwrap().sc_type = Some(EntityType::Notes);
        project.adjust_scene_types();
        assert_eq!(project.scenes["1"].sc_type, Some(EntityType::Normal));
        assert_eq!(project.scenes["2"].sc_type, Some(EntityType::Notes));
    }

    #[test]
    fn cross_reference_accessors_resolve_titles() {
        let mut project = project_with_chapter(EntityType::Normal);
        for (id, name) in [("1", "Alice"), ("2", "Bob")] {
            let mut ch = Character::default();
            ch.element.title = Some(name.into());
            project.characters.insert(id.into(), ch);
        }
        project.locations.insert(
            "1".into(),
            Location {
                title: Some("Harbour".into()),
                ..Location::default()
            },
        );
        let scene = project.scenes.get_mut("1").unwrap();
        scene.characters = Some(vec!["2".into(), "1".into(), "9".into()]);
        scene.locations = Some(vec!["1".into()]);

        assert_eq!(project.scene_character_titles("1"), vec!["Bob", "Alice"]);
        assert_eq!(project.viewpoint_character("1").as_deref(), Some("Bob"));
        assert_eq!(project.scene_location_titles("1"), vec!["Harbour"]);
        assert!(project.scene_item_titles("1").is_empty());
        assert!(project.scene_character_titles("2").is_empty());
    }

    #[test]
    fn scenes_in_order_follows_ordering_lists() {
        let mut project = project_with_chapter(EntityType::Normal);
        project.chapters.get_mut("1").unwrap().srt_scenes = vec!["2".into(), "1".into()];
        let order: Vec<_> = project.scenes_in_order().collect();
        assert_eq!(order, vec![("1", "2"), ("1", "1")]);
        assert_eq!(project.chapter_of_scene("1"), Some("1"));
        assert_eq!(project.chapter_of_scene("9"), None);
    }

    #[test]
    fn detect_languages_in_order_of_appearance() {
        let mut project = project_with_chapter(EntityType::Normal);
        project
            .scenes
            .get_mut("1")
            .unwrap()
            .set_content("[lang=de]Hallo[/lang=de] [lang=fr]Salut[/lang=fr] [lang=de]");
        assert_eq!(project.detect_languages(), vec!["de", "fr"]);
    }

    #[test]
    fn total_words_skips_non_normal_scenes() {
        let mut project = project_with_chapter(EntityType::Normal);
        project.scenes.get_mut("1").unwrap().set_content("one two");
        let notes = project.scenes.get_mut("2").unwrap();
        notes.set_content("three four five");
        notes.sc_type = Some(EntityType::Notes);
        assert_eq!(project.total_words(), 2);
    }
}
