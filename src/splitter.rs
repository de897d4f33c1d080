//! Turn inline dividers in imported scene text into chapters and scenes.
//!
//! An imported document may mark structure inside a scene's text with
//! divider lines (defaults shown):
//!
//! ```text
//! # Title|Description      new part
//! ## Title|Description     new chapter
//! ### Title|Description    new scene
//! ```
//!
//! Title and description are optional. A scene divider ends the current
//! scene and opens a new one in the same chapter. A chapter or part divider
//! ends the current scene and chapter; the scenes that follow, including the
//! remaining scenes of the original chapter, belong to the new chapter. Text
//! after a chapter divider but before any scene divider goes into a scene
//! created for it.
//!
//! New scenes get `max(scene id) + 1` and new chapters `max(chapter id) + 1`.
//! The scene that was split is flagged: a warning prefix goes in front of its
//! description, goal, conflict and outcome, and its status drops to draft.

use crate::codec::EntityType;
use crate::config::SplitterConfig;
use crate::ids::max_id;
use crate::messages::MessageCatalog;
use crate::model::{Chapter, ChapterLevel, Project, Scene, SceneStatus};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Divider {
    Scene,
    Chapter,
    Part,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Heading {
    title: String,
    desc: String,
}

pub struct Splitter<'a> {
    config: &'a SplitterConfig,
    messages: &'a MessageCatalog,
}

impl<'a> Splitter<'a> {
    pub fn new(config: &'a SplitterConfig, messages: &'a MessageCatalog) -> Self {
        Self { config, messages }
    }

    /// Split every scene of the project at its divider lines.
    ///
    /// Returns `true` if any chapter or scene was created.
    pub fn split(&self, project: &mut Project) -> bool {
        let mut last_chapter = max_id(project.chapters.keys());
        let mut last_scene = max_id(project.scenes.keys());
        let mut changed = false;
        let mut srt_chapters = Vec::with_capacity(project.srt_chapters.len());

        for ch_id in project.srt_chapters.clone() {
            srt_chapters.push(ch_id.clone());
            let Some(original_scenes) = project.chapters.get(&ch_id).map(|c| c.srt_scenes.clone())
            else {
                continue;
            };
            let mut chapter_id = ch_id;
            let mut srt_scenes = Vec::new();

            for sc_id in original_scenes {
                srt_scenes.push(sc_id.clone());
                let Some(text) = project
                    .scenes
                    .get(&sc_id)
                    .and_then(Scene::content)
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned)
                else {
                    continue;
                };

                let mut scene_id = sc_id.clone();
                let mut lines: Vec<&str> = Vec::new();
                let mut in_scene = true;
                let mut split_count = 0;

                for line in text.split('\n') {
                    match self.divider_of(line) {
                        Some(Divider::Scene) => {
                            if in_scene {
                                set_scene_text(project, &scene_id, &mut lines);
                            }
                            split_count += 1;
                            last_scene += 1;
                            scene_id = last_scene.to_string();
                            self.create_scene(project, &sc_id, &scene_id, split_count, &self.heading(line));
                            srt_scenes.push(scene_id.clone());
                            in_scene = true;
                            changed = true;
                        }
                        Some(divider) => {
                            if in_scene {
                                set_scene_text(project, &scene_id, &mut lines);
                                split_count = 0;
                                in_scene = false;
                            }
                            if let Some(chapter) = project.chapters.get_mut(&chapter_id) {
                                chapter.srt_scenes = std::mem::take(&mut srt_scenes);
                            }
                            last_chapter += 1;
                            chapter_id = last_chapter.to_string();
                            let level = if divider == Divider::Part {
                                ChapterLevel::Part
                            } else {
                                ChapterLevel::Chapter
                            };
                            self.create_chapter(project, &chapter_id, level, self.heading(line));
                            srt_chapters.push(chapter_id.clone());
                            changed = true;
                        }
                        None if !in_scene => {
                            lines.push(line);
                            split_count += 1;
                            last_scene += 1;
                            scene_id = last_scene.to_string();
                            self.create_scene(project, &sc_id, &scene_id, split_count, &Heading::default());
                            srt_scenes.push(scene_id.clone());
                            in_scene = true;
                            changed = true;
                        }
                        None => lines.push(line),
                    }
                }
                if in_scene {
                    set_scene_text(project, &scene_id, &mut lines);
                }
            }

            if let Some(chapter) = project.chapters.get_mut(&chapter_id) {
                chapter.srt_scenes = srt_scenes;
            }
        }
        project.srt_chapters = srt_chapters;

        if changed {
            info!(
                chapters = project.chapters.len(),
                scenes = project.scenes.len(),
                "Split scenes at dividers"
            );
        }
        changed
    }

    /// Scene dividers are checked first, so a longer marker wins over a
    /// shorter one it starts with.
    fn divider_of(&self, line: &str) -> Option<Divider> {
        [
            (Divider::Scene, &self.config.scene_marker),
            (Divider::Chapter, &self.config.chapter_marker),
            (Divider::Part, &self.config.part_marker),
        ]
        .into_iter()
        .find(|(_, marker)| line.starts_with(marker.as_str()))
        .map(|(divider, _)| divider)
    }

    fn heading(&self, line: &str) -> Heading {
        let marker_chars: Vec<char> = [
            &self.config.scene_marker,
            &self.config.chapter_marker,
            &self.config.part_marker,
        ]
        .iter()
        .flat_map(|m| m.chars())
        .chain([' '])
        .collect();
        let stripped = line.trim_matches(|c| marker_chars.contains(&c));
        let mut parts = stripped.split(self.config.desc_separator.as_str());
        Heading {
            title: parts.next().unwrap_or_default().to_string(),
            desc: parts.next().unwrap_or_default().to_string(),
        }
    }

    fn create_chapter(&self, project: &mut Project, ch_id: &str, level: ChapterLevel, heading: Heading) {
        let title = if heading.title.is_empty() {
            match level {
                ChapterLevel::Chapter => self.messages.new_chapter.clone(),
                ChapterLevel::Part => self.messages.new_part.clone(),
            }
        } else {
            heading.title
        };
        debug!(chapter = ch_id, ?level, %title, "Created chapter");
        project.chapters.insert(
            ch_id.to_string(),
            Chapter {
                title: Some(title),
                desc: (!heading.desc.is_empty()).then_some(heading.desc),
                ch_level: Some(level),
                ch_type: Some(EntityType::Normal),
                ..Chapter::default()
            },
        );
    }

    fn create_scene(
        &self,
        project: &mut Project,
        parent_id: &str,
        sc_id: &str,
        split_count: usize,
        heading: &Heading,
    ) {
        let mut scene = Scene {
            desc: (!heading.desc.is_empty()).then(|| heading.desc.clone()),
            ..Scene::default()
        };
        let parent_title = match project.scenes.get_mut(parent_id) {
            Some(parent) => {
                self.flag_parent(parent);
                scene.status = parent.status;
                scene.sc_type = parent.sc_type;
                scene.date = parent.date.clone();
                scene.time = parent.time.clone();
                scene.day = parent.day.clone();
                scene.lasts_days = parent.lasts_days.clone();
                scene.lasts_hours = parent.lasts_hours.clone();
                scene.lasts_minutes = parent.lasts_minutes.clone();
                parent.title.clone()
            }
            None => None,
        };
        scene.title = Some(self.scene_title(&heading.title, parent_title.as_deref(), split_count));
        debug!(scene = sc_id, parent = parent_id, "Created scene");
        project.scenes.insert(sc_id.to_string(), scene);
    }

    fn scene_title(&self, heading: &str, parent_title: Option<&str>, split_count: usize) -> String {
        if !heading.is_empty() {
            return heading.to_string();
        }
        match parent_title.filter(|t| !t.is_empty()) {
            Some(title) if title.chars().count() > self.config.clip_title => {
                let clipped: String = title.chars().take(self.config.clip_title).collect();
                format!("{clipped}... Split: {split_count}")
            }
            Some(title) => format!("{title} Split: {split_count}"),
            None => format!("{} Split: {split_count}", self.messages.new_scene),
        }
    }

    fn flag_parent(&self, parent: &mut Scene) {
        let warning = self.config.warning.as_str();
        for text in [
            &mut parent.desc,
            &mut parent.goal,
            &mut parent.conflict,
            &mut parent.outcome,
        ] {
            if let Some(t) = text
                && !t.is_empty()
                && !t.starts_with(warning)
            {
                t.insert_str(0, warning);
            }
        }
        if parent.status.is_some_and(|s| s > SceneStatus::Draft) {
            parent.status = Some(SceneStatus::Draft);
        }
    }
}

fn set_scene_text(project: &mut Project, sc_id: &str, lines: &mut Vec<&str>) {
    if let Some(scene) = project.scenes.get_mut(sc_id) {
        scene.set_content(lines.join("\n"));
    }
    lines.clear();
}
