//! XML tree → entity model.
//!
//! Missing optional elements stay `None`. Marker elements (`<Unused>`,
//! `<ReactionScene>`, ...) become `Some(true)` when present and
//! `Some(false)` when absent. Optional values that cannot be parsed fall
//! back to a default instead of failing the read; only a missing `PROJECT`
//! element or a missing entity `ID` is fatal.

use crate::codec::{decode_chapter_type, decode_scene_type};
use crate::config::FieldsConfig;
use crate::model::{
    Chapter, ChapterLevel, Character, CustomFields, Project, ProjectNote, Scene, SceneStatus,
    WorldElement, string_to_list,
};
use crate::xml::Element;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReadError {
    #[error("missing <{0}> element")]
    MissingElement(&'static str),
    #[error("<{0}> without ID")]
    MissingId(&'static str),
}

/// Accepted spellings of `SpecificDateTime`.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Build a project from the root element of a yWriter 7 document.
pub fn read_project(root: &Element, fields: &FieldsConfig) -> Result<Project, ReadError> {
    let xml_project = root
        .find("PROJECT")
        .ok_or(ReadError::MissingElement("PROJECT"))?;

    let mut project = Project::new();
    read_project_header(xml_project, fields, &mut project);

    if let Some(section) = root.find("LOCATIONS") {
        for xml_location in section.find_all("LOCATION") {
            let id = entity_id(xml_location, "LOCATION")?;
            let location = read_world_element(xml_location, &fields.location);
            project.srt_locations.push(id.clone());
            project.locations.insert(id, location);
        }
    }

    if let Some(section) = root.find("ITEMS") {
        for xml_item in section.find_all("ITEM") {
            let id = entity_id(xml_item, "ITEM")?;
            let item = read_world_element(xml_item, &fields.item);
            project.srt_items.push(id.clone());
            project.items.insert(id, item);
        }
    }

    if let Some(section) = root.find("CHARACTERS") {
        for xml_character in section.find_all("CHARACTER") {
            let id = entity_id(xml_character, "CHARACTER")?;
            let character = read_character(xml_character, &fields.character);
            project.srt_characters.push(id.clone());
            project.characters.insert(id, character);
        }
    }

    if let Some(section) = root.find("PROJECTVARS") {
        read_project_vars(section, &mut project);
    }

    if let Some(section) = root.find("PROJECTNOTES") {
        for xml_note in section.find_all("PROJECTNOTE") {
            let id = entity_id(xml_note, "PROJECTNOTE")?;
            let note = ProjectNote {
                title: text_of(xml_note, "Title"),
                desc: text_of(xml_note, "Desc"),
                kw_var: read_custom_fields(xml_note, &fields.project_note),
            };
            project.srt_prj_notes.push(id.clone());
            project.project_notes.insert(id, note);
        }
    }

    if let Some(section) = root.find("SCENES") {
        for xml_scene in section.find_all("SCENE") {
            let id = entity_id(xml_scene, "SCENE")?;
            let scene = read_scene(xml_scene, &fields.scene, &project);
            project.scenes.insert(id, scene);
        }
    }

    if let Some(section) = root.find("CHAPTERS") {
        for xml_chapter in section.find_all("CHAPTER") {
            let id = entity_id(xml_chapter, "CHAPTER")?;
            let chapter = read_chapter(xml_chapter, &fields.chapter, &project);
            project.srt_chapters.push(id.clone());
            project.chapters.insert(id, chapter);
        }
    }

    project.adjust_scene_types();
    Ok(project)
}

fn entity_id(element: &Element, kind: &'static str) -> Result<String, ReadError> {
    element
        .child_text("ID")
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(ReadError::MissingId(kind))
}

fn text_of(element: &Element, tag: &str) -> Option<String> {
    element.child_text(tag).map(String::from)
}

/// Presence of an element, with its text (empty for `<Tag />`).
fn presence_text<'a>(element: &'a Element, tag: &str) -> Option<&'a str> {
    element.find(tag).map(|e| e.text().unwrap_or(""))
}

fn tags_of(element: &Element) -> Option<Vec<String>> {
    element
        .child_text("Tags")
        .and_then(|text| string_to_list(text, ';'))
}

fn integer_or_zero(element: &Element, tag: &str) -> Option<i64> {
    element
        .find(tag)
        .map(|e| e.text().and_then(|t| t.trim().parse().ok()).unwrap_or(0))
}

/// Registered custom fields, pre-set to `None` and filled from `<Fields>`.
fn read_custom_fields(element: &Element, names: &[String]) -> CustomFields {
    let mut kw_var: CustomFields = names.iter().map(|n| (n.clone(), None)).collect();
    for xml_fields in element.find_all("Fields") {
        for name in names {
            if let Some(field) = xml_fields.find(name) {
                kw_var.insert(name.clone(), field.text.clone());
            }
        }
    }
    kw_var
}

fn read_project_header(xml_project: &Element, fields: &FieldsConfig, project: &mut Project) {
    project.title = text_of(xml_project, "Title");
    project.author_name = text_of(xml_project, "AuthorName");
    project.author_bio = text_of(xml_project, "Bio");
    project.desc = text_of(xml_project, "Desc");
    for (i, title) in project.field_titles.iter_mut().enumerate() {
        *title = text_of(xml_project, &format!("FieldTitle{}", i + 1));
    }
    project.word_count_start = integer_or_zero(xml_project, "WordCountStart");
    project.word_target = integer_or_zero(xml_project, "WordTarget");

    project.kw_var = read_custom_fields(xml_project, &fields.project);
    if let Some(Some(code)) = project.kw_var.get("Field_LanguageCode")
        && !code.is_empty()
    {
        project.language_code = Some(code.clone());
    }
    if let Some(Some(code)) = project.kw_var.get("Field_CountryCode")
        && !code.is_empty()
    {
        project.country_code = Some(code.clone());
    }
}

/// Locale settings stored as project variables override the custom fields.
fn read_project_vars(section: &Element, project: &mut Project) {
    for var in section.find_all("PROJECTVAR") {
        let Some(title) = var.child_text("Title") else {
            continue;
        };
        match title {
            "Language" => {
                if let Some(desc) = var.find("Desc") {
                    project.language_code = desc.text.clone();
                }
            }
            "Country" => {
                if let Some(desc) = var.find("Desc") {
                    project.country_code = desc.text.clone();
                }
            }
            _ => {
                if let Some(code) = title.strip_prefix("lang=")
                    && !code.contains('=')
                {
                    project
                        .languages
                        .get_or_insert_with(Vec::new)
                        .push(code.to_string());
                }
            }
        }
    }
}

fn read_world_element(element: &Element, field_names: &[String]) -> WorldElement {
    WorldElement {
        title: text_of(element, "Title"),
        desc: text_of(element, "Desc"),
        tags: tags_of(element),
        aka: text_of(element, "AKA"),
        image: text_of(element, "ImageFile"),
        kw_var: read_custom_fields(element, field_names),
    }
}

fn read_character(element: &Element, field_names: &[String]) -> Character {
    Character {
        element: read_world_element(element, field_names),
        notes: text_of(element, "Notes"),
        bio: text_of(element, "Bio"),
        goals: text_of(element, "Goals"),
        full_name: text_of(element, "FullName"),
        is_major: Some(element.has_child("Major")),
    }
}

fn read_scene(xml_scene: &Element, field_names: &[String], project: &Project) -> Scene {
    let mut scene = Scene {
        title: text_of(xml_scene, "Title"),
        desc: text_of(xml_scene, "Desc"),
        ..Scene::default()
    };
    if let Some(content) = xml_scene.child_text("SceneContent") {
        scene.set_content(content);
    }

    let scene_type = xml_scene
        .find_all("Fields")
        .find_map(|f| f.child_text("Field_SceneType"));
    scene.sc_type = Some(decode_scene_type(xml_scene.has_child("Unused"), scene_type));
    scene.kw_var = read_custom_fields(xml_scene, field_names);

    scene.do_not_export =
        Some(xml_scene.has_child("ExportCondSpecific") && !xml_scene.has_child("ExportWhenRTF"));

    scene.status = xml_scene
        .child_text("Status")
        .and_then(|s| s.trim().parse::<u8>().ok())
        .and_then(SceneStatus::from_ordinal);

    scene.notes = text_of(xml_scene, "Notes");
    scene.tags = tags_of(xml_scene);
    for (i, field) in scene.fields.iter_mut().enumerate() {
        *field = text_of(xml_scene, &format!("Field{}", i + 1));
    }
    scene.append_to_prev = Some(xml_scene.has_child("AppendToPrev"));

    read_scene_date_time(xml_scene, &mut scene);

    scene.lasts_days = text_of(xml_scene, "LastsDays");
    scene.lasts_hours = text_of(xml_scene, "LastsHours");
    scene.lasts_minutes = text_of(xml_scene, "LastsMinutes");
    scene.is_reaction_scene = Some(xml_scene.has_child("ReactionScene"));
    scene.is_sub_plot = Some(xml_scene.has_child("SubPlot"));
    scene.goal = text_of(xml_scene, "Goal");
    scene.conflict = text_of(xml_scene, "Conflict");
    scene.outcome = text_of(xml_scene, "Outcome");
    scene.image = text_of(xml_scene, "ImageFile");

    scene.characters = read_references(xml_scene, "Characters", "CharID", |id| {
        project.characters.contains_key(id)
    });
    scene.locations = read_references(xml_scene, "Locations", "LocID", |id| {
        project.locations.contains_key(id)
    });
    scene.items = read_references(xml_scene, "Items", "ItemID", |id| {
        project.items.contains_key(id)
    });
    scene
}

/// Specific date/time, or day plus hour and minute.
///
/// An unparseable `SpecificDateTime` yields empty date and time strings.
fn read_scene_date_time(xml_scene: &Element, scene: &mut Scene) {
    if let Some(text) = presence_text(xml_scene, "SpecificDateTime") {
        match parse_date_time(text) {
            Some(date_time) => {
                scene.date = Some(date_time.format("%Y-%m-%d").to_string());
                scene.time = Some(date_time.format("%H:%M:%S").to_string());
            }
            None => {
                scene.date = Some(String::new());
                scene.time = Some(String::new());
            }
        }
        return;
    }

    if let Some(day) = presence_text(xml_scene, "Day") {
        let day = if day.trim().parse::<i64>().is_ok() {
            day.to_string()
        } else {
            String::new()
        };
        scene.day = Some(day);
    }

    let hour = presence_text(xml_scene, "Hour");
    let minute = presence_text(xml_scene, "Minute");
    if hour.is_some() || minute.is_some() {
        let hour = zero_pad(hour.unwrap_or("00"));
        let minute = zero_pad(minute.unwrap_or("00"));
        scene.time = Some(format!("{hour}:{minute}:00"));
    }
}

fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn zero_pad(text: &str) -> String {
    format!("{:0>2}", text.trim())
}

/// A reference list element: `None` if absent, otherwise the known ids.
fn read_references(
    xml_scene: &Element,
    container: &str,
    tag: &str,
    known: impl Fn(&str) -> bool,
) -> Option<Vec<String>> {
    xml_scene.find(container).map(|list| {
        list.find_all(tag)
            .filter_map(Element::text)
            .map(str::trim)
            .filter(|id| known(id))
            .map(String::from)
            .collect()
    })
}

fn read_chapter(xml_chapter: &Element, field_names: &[String], project: &Project) -> Chapter {
    let mut chapter = Chapter {
        title: text_of(xml_chapter, "Title"),
        desc: text_of(xml_chapter, "Desc"),
        ..Chapter::default()
    };

    chapter.ch_level = Some(if xml_chapter.has_child("SectionStart") {
        ChapterLevel::Part
    } else {
        ChapterLevel::Chapter
    });
    chapter.ch_type = Some(decode_chapter_type(
        xml_chapter.has_child("Unused"),
        presence_text(xml_chapter, "Type"),
        presence_text(xml_chapter, "ChapterType"),
    ));

    let is_set = |name: &str| {
        xml_chapter
            .find_all("Fields")
            .any(|f| f.child_text(name) == Some("1"))
    };
    let title_suppressed = chapter
        .title
        .as_deref()
        .is_some_and(|t| t.starts_with('@'));
    chapter.suppress_chapter_title = Some(title_suppressed || is_set("Field_SuppressChapterTitle"));
    chapter.suppress_chapter_break = Some(is_set("Field_SuppressChapterBreak"));
    chapter.is_trash = Some(is_set("Field_IsTrash"));
    chapter.kw_var = read_custom_fields(xml_chapter, field_names);

    if let Some(list) = xml_chapter.find("Scenes") {
        chapter.srt_scenes = list
            .find_all("ScID")
            .filter_map(Element::text)
            .map(str::trim)
            .filter(|id| project.scenes.contains_key(*id))
            .map(String::from)
            .collect();
    }
    chapter
}
