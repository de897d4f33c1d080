//! Merge engine: fold a partial project into an authoritative one.
//!
//! The incoming project is typically produced from an edited external
//! document and only knows some of the fields. The rule for every field is
//! the same:
//!
//! - `None` in the incoming project means "no opinion", the base keeps its value.
//! - `Some(v)` overwrites, including `Some("")`.
//!
//! Titles are the exception: an empty incoming title never blanks a title.
//!
//! Ordering lists are replaced only by non-empty incoming lists, and only
//! with ids that exist in the base after the merge. A scene can be claimed by
//! one chapter only; the first chapter in incoming order wins, and the scene
//! is taken out of any base chapter the incoming project did not rewrite.
//!
//! New ids are inserted. Nothing is ever removed from the base maps.

use crate::ids::sort_ids;
use crate::model::{Character, Chapter, CustomFields, Project, ProjectNote, Scene, WorldElement};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub new_chapters: Vec<String>,
    pub new_scenes: Vec<String>,
    pub new_characters: Vec<String>,
    pub new_locations: Vec<String>,
    pub new_items: Vec<String>,
    pub new_notes: Vec<String>,
    pub updated_chapters: usize,
    pub updated_scenes: usize,
    /// Scenes taken out of a chapter because another chapter claimed them.
    pub moved_scenes: Vec<String>,
}

impl MergeReport {
    pub fn added(&self) -> usize {
        self.new_chapters.len()
            + self.new_scenes.len()
            + self.new_characters.len()
            + self.new_locations.len()
            + self.new_items.len()
            + self.new_notes.len()
    }
}

pub fn merge(base: &mut Project, incoming: &Project) -> MergeReport {
    let mut report = MergeReport::default();

    report.new_locations = merge_map(&mut base.locations, &incoming.locations, merge_world_element);
    report.new_items = merge_map(&mut base.items, &incoming.items, merge_world_element);
    report.new_characters = merge_map(&mut base.characters, &incoming.characters, merge_character);
    report.new_notes = merge_map(&mut base.project_notes, &incoming.project_notes, merge_note);

    for (sc_id, theirs) in &incoming.scenes {
        let ours = base.scenes.entry(sc_id.clone()).or_insert_with(|| {
            report.new_scenes.push(sc_id.clone());
            Scene::default()
        });
        merge_scene(ours, theirs);
        report.updated_scenes += 1;
    }
    for sc_id in incoming.scenes.keys() {
        if let Some(scene) = base.scenes.get_mut(sc_id) {
            retain_known(&mut scene.characters, |id| base.characters.contains_key(id));
            retain_known(&mut scene.locations, |id| base.locations.contains_key(id));
            retain_known(&mut scene.items, |id| base.items.contains_key(id));
        }
    }

    merge_chapters(base, incoming, &mut report);
    merge_project(base, incoming);

    replace_order(&mut base.srt_chapters, &incoming.srt_chapters, &base.chapters);
    replace_order(&mut base.srt_characters, &incoming.srt_characters, &base.characters);
    replace_order(&mut base.srt_locations, &incoming.srt_locations, &base.locations);
    replace_order(&mut base.srt_items, &incoming.srt_items, &base.items);
    replace_order(&mut base.srt_prj_notes, &incoming.srt_prj_notes, &base.project_notes);

    append_unlisted(&mut base.srt_chapters, &report.new_chapters);
    append_unlisted(&mut base.srt_characters, &report.new_characters);
    append_unlisted(&mut base.srt_locations, &report.new_locations);
    append_unlisted(&mut base.srt_items, &report.new_items);
    append_unlisted(&mut base.srt_prj_notes, &report.new_notes);

    base.adjust_scene_types();

    info!(
        added = report.added(),
        updated_chapters = report.updated_chapters,
        updated_scenes = report.updated_scenes,
        moved_scenes = report.moved_scenes.len(),
        "Merged project"
    );
    report
}

fn set<T: Clone>(ours: &mut Option<T>, theirs: &Option<T>) {
    if let Some(value) = theirs {
        *ours = Some(value.clone());
    }
}

fn set_title(ours: &mut Option<String>, theirs: &Option<String>) {
    if let Some(title) = theirs
        && !title.is_empty()
    {
        *ours = Some(title.clone());
    }
}

/// Values overwrite, unset incoming fields only register the name.
fn merge_custom_fields(ours: &mut CustomFields, theirs: &CustomFields) {
    for (name, value) in theirs {
        match value {
            Some(v) => {
                ours.insert(name.clone(), Some(v.clone()));
            }
            None => {
                ours.entry(name.clone()).or_insert(None);
            }
        }
    }
}

/// Merge every incoming entity into `ours`, returning the ids that were new.
fn merge_map<T: Default>(
    ours: &mut BTreeMap<String, T>,
    theirs: &BTreeMap<String, T>,
    merge_one: fn(&mut T, &T),
) -> Vec<String> {
    let mut added = Vec::new();
    for (id, entity) in theirs {
        let target = ours.entry(id.clone()).or_insert_with(|| {
            added.push(id.clone());
            T::default()
        });
        merge_one(target, entity);
    }
    added
}

fn merge_world_element(ours: &mut WorldElement, theirs: &WorldElement) {
    set_title(&mut ours.title, &theirs.title);
    set(&mut ours.desc, &theirs.desc);
    set(&mut ours.tags, &theirs.tags);
    set(&mut ours.aka, &theirs.aka);
    set(&mut ours.image, &theirs.image);
    merge_custom_fields(&mut ours.kw_var, &theirs.kw_var);
}

fn merge_character(ours: &mut Character, theirs: &Character) {
    merge_world_element(&mut ours.element, &theirs.element);
    set(&mut ours.notes, &theirs.notes);
    set(&mut ours.bio, &theirs.bio);
    set(&mut ours.goals, &theirs.goals);
    set(&mut ours.full_name, &theirs.full_name);
    set(&mut ours.is_major, &theirs.is_major);
}

fn merge_note(ours: &mut ProjectNote, theirs: &ProjectNote) {
    set_title(&mut ours.title, &theirs.title);
    set(&mut ours.desc, &theirs.desc);
    merge_custom_fields(&mut ours.kw_var, &theirs.kw_var);
}

fn merge_scene(ours: &mut Scene, theirs: &Scene) {
    set_title(&mut ours.title, &theirs.title);
    set(&mut ours.desc, &theirs.desc);
    if let Some(text) = theirs.content() {
        ours.set_content(text);
    }
    set(&mut ours.sc_type, &theirs.sc_type);
    set(&mut ours.status, &theirs.status);
    set(&mut ours.notes, &theirs.notes);
    set(&mut ours.tags, &theirs.tags);
    for (field, value) in ours.fields.iter_mut().zip(&theirs.fields) {
        set(field, value);
    }
    set(&mut ours.date, &theirs.date);
    set(&mut ours.time, &theirs.time);
    set(&mut ours.day, &theirs.day);
    set(&mut ours.lasts_days, &theirs.lasts_days);
    set(&mut ours.lasts_hours, &theirs.lasts_hours);
    set(&mut ours.lasts_minutes, &theirs.lasts_minutes);
    set(&mut ours.is_reaction_scene, &theirs.is_reaction_scene);
    set(&mut ours.is_sub_plot, &theirs.is_sub_plot);
    set(&mut ours.goal, &theirs.goal);
    set(&mut ours.conflict, &theirs.conflict);
    set(&mut ours.outcome, &theirs.outcome);
    set(&mut ours.characters, &theirs.characters);
    set(&mut ours.locations, &theirs.locations);
    set(&mut ours.items, &theirs.items);
    set(&mut ours.image, &theirs.image);
    set(&mut ours.do_not_export, &theirs.do_not_export);
    set(&mut ours.append_to_prev, &theirs.append_to_prev);
    merge_custom_fields(&mut ours.kw_var, &theirs.kw_var);
}

fn retain_known(list: &mut Option<Vec<String>>, known: impl Fn(&str) -> bool) {
    if let Some(ids) = list {
        ids.retain(|id| known(id));
    }
}

fn merge_chapter_fields(ours: &mut Chapter, theirs: &Chapter) {
    set_title(&mut ours.title, &theirs.title);
    set(&mut ours.desc, &theirs.desc);
    set(&mut ours.ch_level, &theirs.ch_level);
    set(&mut ours.ch_type, &theirs.ch_type);
    set(&mut ours.suppress_chapter_title, &theirs.suppress_chapter_title);
    set(&mut ours.suppress_chapter_break, &theirs.suppress_chapter_break);
    set(&mut ours.is_trash, &theirs.is_trash);
    merge_custom_fields(&mut ours.kw_var, &theirs.kw_var);
}

/// Incoming chapters in incoming document order, then the unlisted ones.
fn incoming_chapter_order(incoming: &Project) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut order: Vec<String> = incoming
        .srt_chapters
        .iter()
        .filter(|id| incoming.chapters.contains_key(*id) && seen.insert(id.as_str()))
        .cloned()
        .collect();
    let mut rest: Vec<String> = incoming
        .chapters
        .keys()
        .filter(|id| !order.contains(id))
        .cloned()
        .collect();
    sort_ids(&mut rest);
    order.extend(rest);
    order
}

fn merge_chapters(base: &mut Project, incoming: &Project, report: &mut MergeReport) {
    let mut claimed: HashSet<String> = HashSet::new();
    let mut rewritten: HashSet<String> = HashSet::new();

    for ch_id in incoming_chapter_order(incoming) {
        let Some(theirs) = incoming.chapters.get(&ch_id) else {
            continue;
        };
        let ours = base.chapters.entry(ch_id.clone()).or_insert_with(|| {
            report.new_chapters.push(ch_id.clone());
            Chapter::default()
        });
        merge_chapter_fields(ours, theirs);
        report.updated_chapters += 1;

        if theirs.srt_scenes.is_empty() {
            continue;
        }
        ours.srt_scenes = theirs
            .srt_scenes
            .iter()
            .filter(|sc_id| base.scenes.contains_key(*sc_id) && claimed.insert((*sc_id).clone()))
            .cloned()
            .collect();
        rewritten.insert(ch_id);
    }

    for (ch_id, chapter) in base.chapters.iter_mut() {
        if rewritten.contains(ch_id) {
            continue;
        }
        let before = chapter.srt_scenes.len();
        chapter.srt_scenes.retain(|sc_id| {
            let keep = !claimed.contains(sc_id);
            if !keep {
                report.moved_scenes.push(sc_id.clone());
            }
            keep
        });
        if chapter.srt_scenes.len() != before {
            debug!(chapter = %ch_id, "Released scenes claimed by another chapter");
        }
    }
}

fn merge_project(base: &mut Project, incoming: &Project) {
    set_title(&mut base.title, &incoming.title);
    set(&mut base.desc, &incoming.desc);
    set(&mut base.author_name, &incoming.author_name);
    set(&mut base.author_bio, &incoming.author_bio);
    for (title, value) in base.field_titles.iter_mut().zip(&incoming.field_titles) {
        set(title, value);
    }
    set(&mut base.word_count_start, &incoming.word_count_start);
    set(&mut base.word_target, &incoming.word_target);
    set(&mut base.language_code, &incoming.language_code);
    set(&mut base.country_code, &incoming.country_code);
    set(&mut base.languages, &incoming.languages);
    merge_custom_fields(&mut base.kw_var, &incoming.kw_var);
}

/// Accept a non-empty incoming order, restricted to known ids.
fn replace_order<T>(ours: &mut Vec<String>, theirs: &[String], known: &BTreeMap<String, T>) {
    if theirs.is_empty() {
        return;
    }
    let mut seen = HashSet::new();
    *ours = theirs
        .iter()
        .filter(|id| known.contains_key(*id) && seen.insert((*id).clone()))
        .cloned()
        .collect();
}

fn append_unlisted(order: &mut Vec<String>, new_ids: &[String]) {
    for id in new_ids {
        if !order.contains(id) {
            order.push(id.clone());
        }
    }
}
