//! Shared test utilities for the yw-cnv test suite.
//!
//! Provides an in-memory sample project, fixture file setup, and lookup
//! helpers that panic with a clear message on miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let project = sample_project();
//! let scene = find_scene(&project, "Arrival");
//! assert_eq!(scene.tags.as_deref(), Some(&["opening".to_string()][..]));
//!
//! assert_chapter_shape(&project, &[
//!     ("Landfall", &["Arrival", "Harbour notes", "Fix the tide table", "Cut dialogue"]),
//!     ("Research", &["Ship rigging"]),
//!     ("Open questions", &["Who lit the lamp?"]),
//!     ("Trash", &["Old ending"]),
//! ]);
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::codec::EntityType;
use crate::model::{
    Chapter, ChapterLevel, Character, Item, Location, Project, ProjectNote, Scene, SceneStatus,
};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    for entry in std::fs::read_dir(&fixtures).unwrap() {
        let entry = entry.unwrap();
        if entry.path().is_file() {
            std::fs::copy(entry.path(), tmp.path().join(entry.file_name())).unwrap();
        }
    }
    tmp
}

/// Write `content` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// =========================================================================
// Sample project
// =========================================================================

fn scene(title: &str, sc_type: EntityType, content: &str) -> Scene {
    let mut scene = Scene {
        title: Some(title.into()),
        sc_type: Some(sc_type),
        ..Scene::default()
    };
    scene.set_content(content);
    scene
}

fn chapter(title: &str, ch_type: EntityType, scenes: &[&str]) -> Chapter {
    Chapter {
        title: Some(title.into()),
        ch_level: Some(ChapterLevel::Chapter),
        ch_type: Some(ch_type),
        srt_scenes: scenes.iter().map(|s| s.to_string()).collect(),
        ..Chapter::default()
    }
}

/// A small project covering every chapter and scene type.
///
/// ```text
/// 1 Landfall (Normal)         1 Arrival (Normal), 2 Notes, 3 Todo, 4 Unused
/// 2 Research (Notes)          5
/// 3 Open questions (Todo)     6
/// 4 Trash (Unused)            7
/// ```
///
/// Characters 1 and 2 are tagged `crew`, location 1 is tagged `coast`,
/// item 1 is never referenced. The highest scene id is `"7"`.
pub fn sample_project() -> Project {
    let mut project = Project {
        title: Some("The Sample Novel".into()),
        desc: Some("A ship reaches a harbour at night.".into()),
        author_name: Some("Jane Doe".into()),
        ..Project::default()
    };

    let mut arrival = scene(
        "Arrival",
        EntityType::Normal,
        "The ship came in [i]slowly[/i].\nNobody waited on the pier.",
    );
    arrival.desc = Some("The crew lands.".into());
    arrival.status = Some(SceneStatus::FirstEdit);
    arrival.tags = Some(vec!["opening".into()]);
    arrival.characters = Some(vec!["1".into(), "2".into()]);
    arrival.locations = Some(vec!["1".into()]);
    arrival.goal = Some("Find shelter".into());

    let mut notes = scene("Harbour notes", EntityType::Notes, "Harbour has two piers.");
    notes.characters = Some(vec!["1".into()]);

    let scenes = [
        ("1", arrival),
        ("2", notes),
        ("3", scene("Fix the tide table", EntityType::Todo, "Check tides.")),
        ("4", scene("Cut dialogue", EntityType::Unused, "\"Hello,\" she said.")),
        ("5", scene("Ship rigging", EntityType::Notes, "Brig, two masts.")),
        ("6", scene("Who lit the lamp?", EntityType::Todo, "Decide later.")),
        ("7", scene("Old ending", EntityType::Unused, "They sailed away.")),
    ];
    for (id, scene) in scenes {
        project.scenes.insert(id.into(), scene);
    }

    let chapters = [
        ("1", chapter("Landfall", EntityType::Normal, &["1", "2", "3", "4"])),
        ("2", chapter("Research", EntityType::Notes, &["5"])),
        ("3", chapter("Open questions", EntityType::Todo, &["6"])),
        ("4", chapter("Trash", EntityType::Unused, &["7"])),
    ];
    for (id, chapter) in chapters {
        project.chapters.insert(id.into(), chapter);
        project.srt_chapters.push(id.into());
    }

    for (id, name) in [("1", "Mara"), ("2", "Ivo")] {
        let mut character = Character {
            full_name: Some(format!("{name} Sample")),
            is_major: Some(id == "1"),
            ..Character::default()
        };
        character.element.title = Some(name.into());
        character.element.tags = Some(vec!["crew".into()]);
        project.characters.insert(id.into(), character);
        project.srt_characters.push(id.into());
    }

    project.locations.insert(
        "1".into(),
        Location {
            title: Some("Harbour".into()),
            tags: Some(vec!["coast".into()]),
            ..Location::default()
        },
    );
    project.srt_locations.push("1".into());

    project.items.insert(
        "1".into(),
        Item {
            title: Some("Lantern".into()),
            ..Item::default()
        },
    );
    project.srt_items.push("1".into());

    project.project_notes.insert(
        "1".into(),
        ProjectNote {
            title: Some("Tone".into()),
            desc: Some("Quiet, cold.".into()),
            ..ProjectNote::default()
        },
    );
    project.srt_prj_notes.push("1".into());

    project
}

// =========================================================================
// Project lookups (panic with a clear message on miss)
// =========================================================================

/// Find a scene by title. Panics if not found.
pub fn find_scene<'a>(project: &'a Project, title: &str) -> &'a Scene {
    project
        .scenes
        .values()
        .find(|s| s.title.as_deref() == Some(title))
        .unwrap_or_else(|| {
            let titles: Vec<_> = project.scenes.values().map(|s| s.title.as_deref()).collect();
            panic!("scene '{title}' not found. Available: {titles:?}")
        })
}

/// Find a chapter by title. Panics if not found.
pub fn find_chapter<'a>(project: &'a Project, title: &str) -> &'a Chapter {
    project
        .chapters
        .values()
        .find(|c| c.title.as_deref() == Some(title))
        .unwrap_or_else(|| {
            let titles: Vec<_> = project.chapters.values().map(|c| c.title.as_deref()).collect();
            panic!("chapter '{title}' not found. Available: {titles:?}")
        })
}

// =========================================================================
// Structure helpers
// =========================================================================

/// Chapter titles in document order.
pub fn chapter_titles(project: &Project) -> Vec<&str> {
    project
        .srt_chapters
        .iter()
        .filter_map(|id| project.chapters.get(id))
        .map(|c| c.title.as_deref().unwrap_or_default())
        .collect()
}

/// Scene titles of one chapter in order. Panics if the chapter is not found.
pub fn scene_titles<'a>(project: &'a Project, chapter_title: &str) -> Vec<&'a str> {
    find_chapter(project, chapter_title)
        .srt_scenes
        .iter()
        .filter_map(|id| project.scenes.get(id))
        .map(|s| s.title.as_deref().unwrap_or_default())
        .collect()
}

/// Assert that chapters and their scenes match an expected shape.
///
/// Each entry is `(chapter title, scene titles)`.
pub fn assert_chapter_shape(project: &Project, expected: &[(&str, &[&str])]) {
    let expected_titles: Vec<&str> = expected.iter().map(|(t, _)| *t).collect();
    assert_eq!(chapter_titles(project), expected_titles, "chapter titles mismatch");

    for (title, scenes) in expected {
        assert_eq!(
            scene_titles(project, title),
            scenes.to_vec(),
            "scenes of chapter '{title}' mismatch"
        );
    }
}
