//! Entity model → XML tree.
//!
//! The writer patches a previously parsed tree instead of building a fresh
//! one, so elements it does not manage are kept. For every managed field:
//!
//! - `Some(value)` sets the element text, creating the element if needed.
//! - `None` leaves the element as it is.
//! - Marker flags are added for `Some(true)` and removed for `Some(false)`.
//!
//! Ordered children (a chapter's `Scenes`, a scene's `Characters`) and the
//! chapter sequence are rebuilt from the model's ordering lists on every
//! write.

use crate::codec::{EntityType, encode_chapter_type, encode_scene_type};
use crate::config::LocaleConfig;
use crate::ids::{create_id, sort_ids};
use crate::model::{
    Chapter, ChapterLevel, Character, CustomFields, Project, ProjectNote, Scene, WorldElement,
    count_letters, count_words, list_to_string,
};
use crate::xml::Element;
use std::collections::HashMap;

pub const ROOT_TAG: &str = "YWRITER7";
const FILE_VERSION: &str = "7";
const MARKER: &str = "-1";

/// Custom fields holding the locale in older files, moved to `PROJECTVARS`.
const LOCALE_FIELDS: [&str; 2] = ["Field_LanguageCode", "Field_CountryCode"];

/// An empty document with all sections.
pub fn new_document() -> Element {
    let mut root = Element::new(ROOT_TAG);
    for section in [
        "PROJECT",
        "LOCATIONS",
        "ITEMS",
        "CHARACTERS",
        "PROJECTNOTES",
        "SCENES",
        "CHAPTERS",
    ] {
        root.push(Element::new(section));
    }
    root
}

/// Apply the project to `root`.
pub fn build_tree(root: &mut Element, project: &Project, locale: &LocaleConfig) {
    build_project(section(root, "PROJECT"), project);

    rebuild_entities(
        section(root, "LOCATIONS"),
        "LOCATION",
        &project.srt_locations,
        |id| project.locations.get(id),
        build_world_element,
    );
    rebuild_entities(
        section(root, "ITEMS"),
        "ITEM",
        &project.srt_items,
        |id| project.items.get(id),
        build_world_element,
    );
    rebuild_entities(
        section(root, "CHARACTERS"),
        "CHARACTER",
        &project.srt_characters,
        |id| project.characters.get(id),
        build_character,
    );

    if project.srt_prj_notes.is_empty() {
        root.remove_all("PROJECTNOTES");
    } else {
        let index = root.position("SCENES").unwrap_or(root.children.len());
        let notes = root.get_or_insert("PROJECTNOTES", index);
        rebuild_entities(
            notes,
            "PROJECTNOTE",
            &project.srt_prj_notes,
            |id| project.project_notes.get(id),
            build_project_note,
        );
    }

    build_project_vars(root, project, locale);
    build_scenes(section(root, "SCENES"), project);
    build_chapters(section(root, "CHAPTERS"), project);
}

fn section<'a>(root: &'a mut Element, name: &str) -> &'a mut Element {
    let end = root.children.len();
    root.get_or_insert(name, end)
}

// =============================================================================
// Element helpers
// =============================================================================

/// Set `tag` if `text` is given, creating it at `index` when missing.
///
/// Returns the position following the element, or `index` if there is none.
fn set_element(parent: &mut Element, tag: &str, text: Option<&str>, index: usize) -> usize {
    match (parent.position(tag), text) {
        (Some(pos), Some(text)) => {
            parent.children[pos].set_text(text);
            pos + 1
        }
        (Some(pos), None) => pos + 1,
        (None, Some(text)) => {
            let at = index.min(parent.children.len());
            parent.insert(at, Element::with_text(tag, text));
            at + 1
        }
        (None, None) => index,
    }
}

/// Set `tag` if `text` is given, appending it when missing.
fn set_optional(parent: &mut Element, tag: &str, text: Option<&str>) {
    let end = parent.children.len();
    set_element(parent, tag, text, end);
}

fn set_flag(parent: &mut Element, tag: &str, flag: Option<bool>) {
    match flag {
        Some(true) if !parent.has_child(tag) => parent.push(Element::with_text(tag, MARKER)),
        Some(false) => parent.remove_all(tag),
        _ => {}
    }
}

fn set_tags(parent: &mut Element, tags: Option<&Vec<String>>) {
    let text = tags.map(|t| list_to_string(t, ';'));
    set_optional(parent, "Tags", text.as_deref());
}

/// Write non-empty custom fields into `<Fields>` and drop empty ones.
fn set_custom_fields(parent: &mut Element, kw_var: &CustomFields) {
    for (name, value) in kw_var {
        match value.as_deref().filter(|v| !v.is_empty()) {
            Some(value) => {
                let end = parent.children.len();
                set_optional(parent.get_or_insert("Fields", end), name, Some(value));
            }
            None => {
                if let Some(fields) = parent.find_mut("Fields") {
                    fields.remove_all(name);
                }
            }
        }
    }
}

fn set_references(parent: &mut Element, container: &str, tag: &str, ids: Option<&Vec<String>>) {
    let Some(ids) = ids else {
        return;
    };
    let end = parent.children.len();
    let list = parent.get_or_insert(container, end);
    list.remove_all(tag);
    for id in ids {
        list.push(Element::with_text(tag, id.as_str()));
    }
}

fn new_entity(tag: &str, id: &str) -> Element {
    let mut element = Element::new(tag);
    element.push(Element::with_text("ID", id));
    element
}

/// Take all `tag` children out of `parent`, keyed by their ID.
fn detach_by_id(parent: &mut Element, tag: &str) -> (Vec<String>, HashMap<String, Element>) {
    let mut order = Vec::new();
    let mut by_id = HashMap::new();
    let (detached, kept): (Vec<_>, Vec<_>) = parent
        .children
        .drain(..)
        .partition(|child| child.name == tag);
    parent.children = kept;
    for element in detached {
        if let Some(id) = element.child_text("ID").map(|id| id.trim().to_string()) {
            order.push(id.clone());
            by_id.insert(id, element);
        }
    }
    (order, by_id)
}

/// Re-emit the entities of one section in ordering-list order with a fresh
/// `SortOrder`. Entities not listed are dropped.
fn rebuild_entities<'p, T: 'p>(
    section: &mut Element,
    tag: &str,
    order: &[String],
    lookup: impl Fn(&str) -> Option<&'p T>,
    build: impl Fn(&mut Element, &T, usize),
) {
    let (_, mut existing) = detach_by_id(section, tag);
    for (i, id) in order.iter().enumerate() {
        let Some(entity) = lookup(id.as_str()) else {
            continue;
        };
        let mut element = existing.remove(id).unwrap_or_else(|| new_entity(tag, id));
        build(&mut element, entity, i + 1);
        section.push(element);
    }
}

// =============================================================================
// Project, world elements, notes
// =============================================================================

fn build_project(xml_project: &mut Element, project: &Project) {
    let end = xml_project.children.len();
    xml_project.get_or_insert("Ver", end).set_text(FILE_VERSION);
    set_optional(xml_project, "Title", project.title.as_deref());
    set_optional(xml_project, "Desc", project.desc.as_deref());
    set_optional(xml_project, "AuthorName", project.author_name.as_deref());
    set_optional(xml_project, "Bio", project.author_bio.as_deref());
    for (i, title) in project.field_titles.iter().enumerate() {
        set_optional(xml_project, &format!("FieldTitle{}", i + 1), title.as_deref());
    }
    let word_count_start = project.word_count_start.map(|n| n.to_string());
    set_optional(xml_project, "WordCountStart", word_count_start.as_deref());
    let word_target = project.word_target.map(|n| n.to_string());
    set_optional(xml_project, "WordTarget", word_target.as_deref());

    let mut kw_var = project.kw_var.clone();
    for field in LOCALE_FIELDS {
        kw_var.insert(field.to_string(), None);
    }
    set_custom_fields(xml_project, &kw_var);
}

fn build_world_element(xml: &mut Element, element: &WorldElement, sort_order: usize) {
    set_optional(xml, "Title", element.title.as_deref());
    set_optional(xml, "ImageFile", element.image.as_deref());
    set_optional(xml, "Desc", element.desc.as_deref());
    set_optional(xml, "AKA", element.aka.as_deref());
    set_tags(xml, element.tags.as_ref());
    set_optional(xml, "SortOrder", Some(sort_order.to_string().as_str()));
    set_custom_fields(xml, &element.kw_var);
}

fn build_character(xml: &mut Element, character: &Character, sort_order: usize) {
    let element = &character.element;
    set_optional(xml, "Title", element.title.as_deref());
    set_optional(xml, "Desc", element.desc.as_deref());
    set_optional(xml, "ImageFile", element.image.as_deref());
    set_optional(xml, "SortOrder", Some(sort_order.to_string().as_str()));
    set_optional(xml, "Notes", character.notes.as_deref());
    set_optional(xml, "AKA", element.aka.as_deref());
    set_tags(xml, element.tags.as_ref());
    set_optional(xml, "Bio", character.bio.as_deref());
    set_optional(xml, "Goals", character.goals.as_deref());
    set_optional(xml, "FullName", character.full_name.as_deref());
    set_flag(xml, "Major", character.is_major);
    set_custom_fields(xml, &element.kw_var);
}

fn build_project_note(xml: &mut Element, note: &ProjectNote, sort_order: usize) {
    set_optional(xml, "Title", note.title.as_deref());
    set_optional(xml, "Desc", note.desc.as_deref());
    set_optional(xml, "SortOrder", Some(sort_order.to_string().as_str()));
    set_custom_fields(xml, &note.kw_var);
}

// =============================================================================
// Locale (PROJECTVARS)
// =============================================================================

/// Language and country codes to write: the configured default when the
/// project has none, `zxx`/`none` when the codes are not two letters.
pub fn normalize_locale(
    language: Option<&str>,
    country: Option<&str>,
    default: &LocaleConfig,
) -> (String, String) {
    let language = language.unwrap_or_default();
    if language.is_empty() {
        return (default.language.clone(), default.country.clone());
    }
    let country = country.unwrap_or_default();
    if language.chars().count() == 2 && country.chars().count() == 2 {
        (language.to_string(), country.to_string())
    } else {
        ("zxx".to_string(), "none".to_string())
    }
}

fn build_project_vars(root: &mut Element, project: &Project, locale: &LocaleConfig) {
    let mut languages = project
        .languages
        .clone()
        .unwrap_or_else(|| project.detect_languages());
    let has_code = |code: &Option<String>| code.as_deref().is_some_and(|c| !c.is_empty());
    if languages.is_empty() && !has_code(&project.language_code) && !has_code(&project.country_code)
    {
        return;
    }

    let (language_code, country_code) = normalize_locale(
        project.language_code.as_deref(),
        project.country_code.as_deref(),
        locale,
    );

    let xml_vars = section(root, "PROJECTVARS");
    let mut var_ids = Vec::new();
    let mut has_language = false;
    let mut has_country = false;
    for var in xml_vars.children.iter_mut().filter(|c| c.name == "PROJECTVAR") {
        if let Some(id) = var.child_text("ID") {
            var_ids.push(id.trim().to_string());
        }
        let title = var.child_text("Title").unwrap_or_default().to_string();
        if let Some(code) = title.strip_prefix("lang=") {
            languages.retain(|l| l != code);
        } else if title == "Language" {
            let end = var.children.len();
            var.get_or_insert("Desc", end).set_text(language_code.as_str());
            has_language = true;
        } else if title == "Country" {
            let end = var.children.len();
            var.get_or_insert("Desc", end).set_text(country_code.as_str());
            has_country = true;
        }
    }

    let mut add_var = |title: &str, desc: &str| {
        let id = create_id(&var_ids);
        let mut var = new_entity("PROJECTVAR", &id);
        var.push(Element::with_text("Title", title));
        var.push(Element::with_text("Desc", desc));
        var.push(Element::with_text("Tags", "0"));
        xml_vars.push(var);
        var_ids.push(id);
    };
    if !has_language {
        add_var("Language", &language_code);
    }
    if !has_country {
        add_var("Country", &country_code);
    }
    for code in &languages {
        add_var(
            &format!("lang={code}"),
            &format!("<HTM <SPAN LANG=\"{code}\"> /HTM>"),
        );
        add_var(&format!("/lang={code}"), "<HTM </SPAN> /HTM>");
    }
}

// =============================================================================
// Scenes
// =============================================================================

/// Scenes keep their position in the file; new ones follow in id order.
fn build_scenes(xml_scenes: &mut Element, project: &Project) {
    let (file_order, mut existing) = detach_by_id(xml_scenes, "SCENE");
    let mut new_ids: Vec<String> = project
        .scenes
        .keys()
        .filter(|id| !existing.contains_key(*id))
        .cloned()
        .collect();
    sort_ids(&mut new_ids);

    for id in file_order.iter().chain(new_ids.iter()) {
        let Some(scene) = project.scenes.get(id) else {
            continue;
        };
        let mut element = existing.remove(id).unwrap_or_else(|| new_entity("SCENE", id));
        build_scene(&mut element, id, scene, project);
        xml_scenes.push(element);
    }
}

fn build_scene(xml: &mut Element, sc_id: &str, scene: &Scene, project: &Project) {
    set_element(xml, "Title", scene.title.as_deref(), 1);

    set_optional(xml, "BelongsToChID", project.chapter_of_scene(sc_id));

    set_optional(xml, "Desc", scene.desc.as_deref());
    build_scene_content(xml, scene);
    build_scene_type(xml, scene.sc_type.unwrap_or_default());

    if let Some(do_not_export) = scene.do_not_export {
        if do_not_export {
            if !xml.has_child("ExportCondSpecific") {
                xml.push(Element::new("ExportCondSpecific"));
            }
            xml.remove_all("ExportWhenRTF");
        } else if xml.has_child("ExportCondSpecific") && !xml.has_child("ExportWhenRTF") {
            xml.push(Element::with_text("ExportWhenRTF", MARKER));
        }
    }

    set_custom_fields(xml, &scene.kw_var);

    let status = scene.status.map(|s| s.ordinal().to_string());
    set_optional(xml, "Status", status.as_deref());
    set_optional(xml, "Notes", scene.notes.as_deref());
    set_tags(xml, scene.tags.as_ref());
    for (i, field) in scene.fields.iter().enumerate() {
        set_optional(xml, &format!("Field{}", i + 1), field.as_deref());
    }
    set_flag(xml, "AppendToPrev", scene.append_to_prev);

    build_scene_date_time(xml, scene);

    set_optional(xml, "LastsDays", scene.lasts_days.as_deref());
    set_optional(xml, "LastsHours", scene.lasts_hours.as_deref());
    set_optional(xml, "LastsMinutes", scene.lasts_minutes.as_deref());
    set_flag(xml, "ReactionScene", scene.is_reaction_scene);
    set_flag(xml, "SubPlot", scene.is_sub_plot);
    set_optional(xml, "Goal", scene.goal.as_deref());
    set_optional(xml, "Conflict", scene.conflict.as_deref());
    set_optional(xml, "Outcome", scene.outcome.as_deref());
    set_optional(xml, "ImageFile", scene.image.as_deref());

    set_references(xml, "Characters", "CharID", scene.characters.as_ref());
    set_references(xml, "Locations", "LocID", scene.locations.as_ref());
    set_references(xml, "Items", "ItemID", scene.items.as_ref());

    xml.remove_all("RTFFile");
}

/// Content and counts; counts are derived from the content being written.
fn build_scene_content(xml: &mut Element, scene: &Scene) {
    match scene.content() {
        Some(content) => {
            set_optional(xml, "SceneContent", Some(content));
            set_optional(xml, "WordCount", Some(count_words(content).to_string().as_str()));
            set_optional(xml, "LetterCount", Some(count_letters(content).to_string().as_str()));
        }
        None => {
            if !xml.has_child("SceneContent") {
                xml.push(Element::new("SceneContent"));
            }
            for tag in ["WordCount", "LetterCount"] {
                if !xml.has_child(tag) {
                    xml.push(Element::with_text(tag, "0"));
                }
            }
        }
    }
}

fn build_scene_type(xml: &mut Element, sc_type: EntityType) {
    let encoding = encode_scene_type(sc_type);
    set_flag(xml, "Unused", Some(encoding.unused));
    match encoding.scene_type {
        Some(value) => {
            let end = xml.children.len();
            set_optional(xml.get_or_insert("Fields", end), "Field_SceneType", Some(value));
        }
        None => {
            if let Some(fields) = xml.find_mut("Fields") {
                fields.remove_all("Field_SceneType");
            }
        }
    }
}

fn remove_date_time(xml: &mut Element) {
    for tag in ["SpecificDateTime", "SpecificDateMode", "Day", "Hour", "Minute"] {
        xml.remove_all(tag);
    }
}

/// Specific and unspecific date/time are exclusive; writing one removes the
/// elements of the other.
fn build_scene_date_time(xml: &mut Element, scene: &Scene) {
    let is_blank = |v: &Option<String>| v.as_deref().is_none_or(str::is_empty);

    if let (Some(date), Some(time)) = (&scene.date, &scene.time) {
        if date.is_empty() && time.is_empty() {
            remove_date_time(xml);
            return;
        }
        let time = if time.is_empty() { "00:00:00" } else { time.as_str() };
        let mut date_time = format!("{date} {time}");
        if date_time.matches(':').count() < 2 {
            date_time.push_str(":00");
        }
        if !xml.has_child("SpecificDateTime") {
            xml.push(Element::new("SpecificDateTime"));
            xml.push(Element::with_text("SpecificDateMode", MARKER));
        }
        set_optional(xml, "SpecificDateTime", Some(date_time.as_str()));
        for tag in ["Day", "Hour", "Minute"] {
            xml.remove_all(tag);
        }
    } else if scene.day.is_some() || scene.time.is_some() {
        if is_blank(&scene.day) && is_blank(&scene.time) {
            remove_date_time(xml);
            return;
        }
        xml.remove_all("SpecificDateTime");
        xml.remove_all("SpecificDateMode");
        set_optional(xml, "Day", scene.day.as_deref());
        if let Some(time) = scene.time.as_deref() {
            let mut parts = time.split(':');
            let hours = parts.next().filter(|p| !p.is_empty()).unwrap_or("00");
            let minutes = parts.next().filter(|p| !p.is_empty()).unwrap_or("00");
            set_optional(xml, "Hour", Some(hours));
            set_optional(xml, "Minute", Some(minutes));
        }
    }
}

// =============================================================================
// Chapters
// =============================================================================

fn build_chapters(xml_chapters: &mut Element, project: &Project) {
    let (_, mut existing) = detach_by_id(xml_chapters, "CHAPTER");
    for (i, ch_id) in project.srt_chapters.iter().enumerate() {
        let Some(chapter) = project.chapters.get(ch_id) else {
            continue;
        };
        let mut element = existing
            .remove(ch_id)
            .unwrap_or_else(|| new_entity("CHAPTER", ch_id));
        build_chapter(&mut element, chapter, i + 1);
        xml_chapters.push(element);
    }
    if xml_chapters.children.is_empty() {
        xml_chapters.set_text("");
    }
}

/// Index just after `tag`, or `index` if it is absent.
fn after(parent: &Element, tag: &str, index: usize) -> usize {
    parent.position(tag).map_or(index, |pos| pos + 1)
}

fn build_chapter(xml: &mut Element, chapter: &Chapter, sort_order: usize) {
    let encoding = encode_chapter_type(chapter.ch_type.unwrap_or_default());

    let mut i = 1;
    i = set_element(xml, "Title", chapter.title.as_deref(), i);
    i = set_element(xml, "Desc", chapter.desc.as_deref(), i);

    if encoding.unused {
        if !xml.has_child("Unused") {
            xml.insert(i, Element::with_text("Unused", MARKER));
        }
    } else {
        xml.remove_all("Unused");
    }
    i = after(xml, "Unused", i);

    i = set_element(xml, "SortOrder", Some(sort_order.to_string().as_str()), i);

    build_chapter_field(xml, "Field_SuppressChapterTitle", chapter.suppress_chapter_title, i, false);
    build_chapter_field(xml, "Field_SuppressChapterBreak", chapter.suppress_chapter_break, i, false);
    build_chapter_field(xml, "Field_IsTrash", chapter.is_trash, i, true);
    if chapter.kw_var.values().any(|v| v.as_deref().is_some_and(|v| !v.is_empty())) {
        xml.get_or_insert("Fields", i);
    }
    set_custom_fields(xml, &chapter.kw_var);
    i = after(xml, "Fields", i);

    match chapter.ch_level {
        Some(ChapterLevel::Part) if !xml.has_child("SectionStart") => {
            xml.insert(i, Element::with_text("SectionStart", MARKER));
        }
        Some(ChapterLevel::Chapter) => xml.remove_all("SectionStart"),
        _ => {}
    }
    i = after(xml, "SectionStart", i);

    i = set_element(xml, "Type", Some(encoding.legacy_type), i);
    i = set_element(xml, "ChapterType", Some(encoding.chapter_type), i);

    xml.remove_all("Scenes");
    if !chapter.srt_scenes.is_empty() {
        let mut list = Element::new("Scenes");
        for sc_id in &chapter.srt_scenes {
            list.push(Element::with_text("ScID", sc_id.as_str()));
        }
        xml.insert(i, list);
    }
}

/// A `Fields/<name>` switch: `"1"` when set. When cleared, the field is
/// either removed or set to `"0"`.
fn build_chapter_field(
    xml: &mut Element,
    name: &str,
    value: Option<bool>,
    index: usize,
    remove_when_cleared: bool,
) {
    match value {
        Some(true) => {
            let fields = xml.get_or_insert("Fields", index);
            set_optional(fields, name, Some("1"));
        }
        Some(false) => {
            if let Some(fields) = xml.find_mut("Fields") {
                if remove_when_cleared {
                    fields.remove_all(name);
                } else if let Some(field) = fields.find_mut(name) {
                    field.set_text("0");
                }
            }
        }
        None => {}
    }
}
