//! CLI output formatting for all commands.
//!
//! # Information-First Display
//!
//! Every entity leads with its positional index and title. Ids, types and
//! counts are secondary and shown in brackets or on indented context lines,
//! so the output reads like the table of contents of the novel.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! The Sample Novel by Jane Doe
//!     Source: novel.yw7
//! 001 Landfall
//!     001 Arrival [1st Edit] (10 words)
//!     002 Harbour notes (Notes)
//! 002 Research (Notes)
//!     001 Ship rigging (Notes)
//!
//! 2 characters, 1 location, 1 item, 1 project note
//! 10 words in 1 normal scene
//! ```
//!
//! ## Import
//!
//! ```text
//! edited.yw7 → novel.yw7
//!     Split: yes
//!     New: 1 scene
//!     Updated: 4 chapters, 8 scenes
//!     Moved: 1 scene
//! ```
//!
//! ## Cross references
//!
//! ```text
//! Characters
//! 001 Mara
//!     001 Arrival (Ch 1)
//!     002 Harbour notes (Ch 1)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure, no I/O, no side effects.

use crate::codec::EntityType;
use crate::convert::{ImportOutcome, ProjectEntry, SplitOutcome};
use crate::model::{ChapterLevel, Project};
use crate::xref::CrossReferences;
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 scene`, `2 scenes`
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Title, or the id in parens when there is none.
///
/// ```text
/// 001 Arrival        // titled
/// 001 (ID 12)        // untitled, the id is the identity
/// ```
fn title_or_id(title: Option<&str>, id: &str) -> String {
    match title {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => format!("(ID {id})"),
    }
}

fn type_suffix(entity_type: Option<EntityType>) -> Option<&'static str> {
    match entity_type.unwrap_or_default() {
        EntityType::Normal => None,
        EntityType::Notes => Some("(Notes)"),
        EntityType::Todo => Some("(ToDo)"),
        EntityType::Unused => Some("(Unused)"),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Check
// ============================================================================

/// Format the structure of a project: chapters, their scenes, and totals.
pub fn format_project_summary(project: &Project, source: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    let title = project.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("(untitled)");
    match project.author_name.as_deref().filter(|a| !a.is_empty()) {
        Some(author) => lines.push(format!("{title} by {author}")),
        None => lines.push(title.to_string()),
    }
    lines.push(format!("{}Source: {}", indent(1), file_name(source)));

    for (i, ch_id) in project.srt_chapters.iter().enumerate() {
        let Some(chapter) = project.chapters.get(ch_id) else {
            continue;
        };
        let mut header = format!(
            "{} {}",
            format_index(i + 1),
            title_or_id(chapter.title.as_deref(), ch_id)
        );
        if chapter.ch_level == Some(ChapterLevel::Part) {
            header.push_str(" [Part]");
        }
        if let Some(suffix) = type_suffix(chapter.ch_type) {
            header.push(' ');
            header.push_str(suffix);
        }
        lines.push(header);

        let scenes = chapter
            .srt_scenes
            .iter()
            .filter_map(|id| project.scenes.get(id).map(|s| (id, s)));
        for (j, (sc_id, scene)) in scenes.enumerate() {
            let mut line = format!(
                "{}{} {}",
                indent(1),
                format_index(j + 1),
                title_or_id(scene.title.as_deref(), sc_id)
            );
            if let Some(status) = scene.status {
                line.push_str(&format!(" [{}]", status.label()));
            }
            match type_suffix(scene.sc_type) {
                Some(suffix) => {
                    line.push(' ');
                    line.push_str(suffix);
                }
                None => line.push_str(&format!(" ({})", plural(scene.word_count(), "word"))),
            }
            lines.push(line);
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{}, {}, {}, {}",
        plural(project.characters.len(), "character"),
        plural(project.locations.len(), "location"),
        plural(project.items.len(), "item"),
        plural(project.project_notes.len(), "project note"),
    ));
    let normal_scenes = project
        .scenes_in_order()
        .filter_map(|(_, id)| project.scenes.get(id))
        .filter(|s| s.sc_type.unwrap_or_default().is_normal())
        .count();
    lines.push(format!(
        "{} in {}",
        plural(project.total_words(), "word"),
        plural(normal_scenes, "normal scene")
    ));
    lines
}

pub fn print_project_summary(project: &Project, source: &Path) {
    for line in format_project_summary(project, source) {
        println!("{}", line);
    }
}

// ============================================================================
// Split
// ============================================================================

pub fn format_split_outcome(outcome: &SplitOutcome) -> Vec<String> {
    let mut lines = vec![file_name(&outcome.path)];
    if outcome.changed {
        lines.push(format!(
            "{}Split into {}, {}",
            indent(1),
            plural(outcome.chapters, "chapter"),
            plural(outcome.scenes, "scene")
        ));
    } else {
        lines.push(format!("{}No dividers found", indent(1)));
    }
    lines
}

pub fn print_split_outcome(outcome: &SplitOutcome) {
    for line in format_split_outcome(outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// Import
// ============================================================================

pub fn format_import_outcome(outcome: &ImportOutcome) -> Vec<String> {
    let report = &outcome.report;
    let mut lines = vec![format!(
        "{} → {}",
        file_name(&outcome.incoming),
        file_name(&outcome.base)
    )];
    lines.push(format!(
        "{}Split: {}",
        indent(1),
        if outcome.split { "yes" } else { "no" }
    ));

    let new: Vec<String> = [
        (report.new_chapters.len(), "chapter"),
        (report.new_scenes.len(), "scene"),
        (report.new_characters.len(), "character"),
        (report.new_locations.len(), "location"),
        (report.new_items.len(), "item"),
        (report.new_notes.len(), "project note"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, noun)| plural(n, noun))
    .collect();
    if !new.is_empty() {
        lines.push(format!("{}New: {}", indent(1), new.join(", ")));
    }
    lines.push(format!(
        "{}Updated: {}, {}",
        indent(1),
        plural(report.updated_chapters, "chapter"),
        plural(report.updated_scenes, "scene")
    ));
    if !report.moved_scenes.is_empty() {
        lines.push(format!(
            "{}Moved: {}",
            indent(1),
            plural(report.moved_scenes.len(), "scene")
        ));
    }
    lines
}

pub fn print_import_outcome(outcome: &ImportOutcome) {
    for line in format_import_outcome(outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// Cross references
// ============================================================================

/// One section per index: entity header, then its scenes with their chapter.
pub fn format_xref(project: &Project, xref: &CrossReferences) -> Vec<String> {
    let scene_line = |sc_id: &str| {
        let title = project.scenes.get(sc_id).and_then(|s| s.title.as_deref());
        let number = xref.scene_number(sc_id).unwrap_or_default();
        let chapter = xref
            .chp_per_scn
            .get(sc_id)
            .and_then(|ch_id| project.srt_chapters.iter().position(|c| c == ch_id))
            .map_or(0, |i| i + 1);
        format!(
            "{}{} {} (Ch {chapter})",
            indent(1),
            format_index(number),
            title_or_id(title, sc_id)
        )
    };

    let mut lines = Vec::new();
    push_xref_section(
        &mut lines,
        "Characters",
        entries_in_order(&project.srt_characters, &xref.scn_per_chr, |id| {
            project.characters.get(id).and_then(|c| c.element.title.clone())
        }),
        &scene_line,
    );
    push_xref_section(
        &mut lines,
        "Locations",
        entries_in_order(&project.srt_locations, &xref.scn_per_loc, |id| {
            project.locations.get(id).and_then(|l| l.title.clone())
        }),
        &scene_line,
    );
    push_xref_section(
        &mut lines,
        "Items",
        entries_in_order(&project.srt_items, &xref.scn_per_itm, |id| {
            project.items.get(id).and_then(|i| i.title.clone())
        }),
        &scene_line,
    );
    let tags = xref
        .scn_per_tag
        .iter()
        .map(|(tag, scenes)| (tag.clone(), scenes))
        .collect();
    push_xref_section(&mut lines, "Tags", tags, &scene_line);
    lines
}

/// Indexed entities in their ordering list, labelled by title.
fn entries_in_order<'a>(
    order: &[String],
    index: &'a BTreeMap<String, Vec<String>>,
    title: impl Fn(&str) -> Option<String>,
) -> Vec<(String, &'a Vec<String>)> {
    order
        .iter()
        .filter_map(|id| {
            index
                .get(id)
                .map(|scenes| (title_or_id(title(id).as_deref(), id), scenes))
        })
        .collect()
}

fn push_xref_section(
    lines: &mut Vec<String>,
    heading: &str,
    entries: Vec<(String, &Vec<String>)>,
    scene_line: &dyn Fn(&str) -> String,
) {
    if entries.is_empty() {
        return;
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(heading.to_string());
    for (i, (name, scenes)) in entries.into_iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), name));
        lines.extend(scenes.iter().map(|s| scene_line(s)));
    }
}

pub fn print_xref(project: &Project, xref: &CrossReferences) {
    for line in format_xref(project, xref) {
        println!("{}", line);
    }
}

// ============================================================================
// List
// ============================================================================

pub fn format_project_list(entries: &[ProjectEntry], root: &Path) -> Vec<String> {
    if entries.is_empty() {
        return vec![format!("No projects found in {}", root.display())];
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let shown = entry.path.strip_prefix(root).unwrap_or(&entry.path);
            let lock = if entry.locked { " [locked]" } else { "" };
            format!("{} {}{lock}", format_index(i + 1), shown.display())
        })
        .collect()
}

pub fn print_project_list(entries: &[ProjectEntry], root: &Path) {
    for line in format_project_list(entries, root) {
        println!("{}", line);
    }
}
