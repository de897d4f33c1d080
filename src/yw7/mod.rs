//! yWriter 7 project files.
//!
//! A [`Yw7File`] binds a path to the settings needed to read and write it
//! and keeps the parsed element tree between a read and a later write, so
//! that elements the model does not manage are written back unchanged.
//!
//! ## Files next to the project
//!
//! ```text
//! novel.yw7        the project
//! novel.yw7.lock   created by yWriter while the project is open
//! novel.yw7.bak    previous version, kept by the last write
//! ```
//!
//! Both [`Yw7File::read`] and [`Yw7File::write`] refuse to run while the
//! lock marker exists. The marker is only checked once at the start; it is
//! advisory and owned by another program.
//!
//! Writing renames the current file to the backup before writing the new
//! text. If the write fails, the backup is renamed back.

pub mod reader;
pub mod writer;

use crate::config::{ConverterConfig, FieldsConfig, LocaleConfig};
use crate::error::YwError;
use crate::model::Project;
use crate::xml::{CdataRegistry, Element};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct Yw7File {
    path: PathBuf,
    lock_suffix: String,
    backup_suffix: String,
    fields: FieldsConfig,
    locale: LocaleConfig,
    cdata: CdataRegistry,
    tree: Option<Element>,
}

impl Yw7File {
    /// Bind a project path. Fails if the path does not carry the project
    /// file extension.
    pub fn new(path: impl Into<PathBuf>, config: &ConverterConfig) -> Result<Self, YwError> {
        let path = path.into();
        if !has_extension(&path, &config.files.extension) {
            return Err(YwError::UnsupportedFormat(path));
        }
        Ok(Self {
            path,
            lock_suffix: config.files.lock_suffix.clone(),
            backup_suffix: config.files.backup_suffix.clone(),
            fields: config.fields.clone(),
            locale: config.locale.clone(),
            cdata: CdataRegistry::with_extra(&config.xml.cdata_tags),
            tree: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        with_suffix(&self.path, &self.lock_suffix)
    }

    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.path, &self.backup_suffix)
    }

    pub fn is_locked(&self) -> bool {
        self.lock_path().is_file()
    }

    /// CDATA element names known for this file, including those found by
    /// the last read.
    pub fn cdata(&self) -> &CdataRegistry {
        &self.cdata
    }

    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub fn read(&mut self) -> Result<Project, YwError> {
        if self.is_locked() {
            warn!("Project is locked");
            return Err(YwError::Locked(self.path.clone()));
        }
        if !self.path.is_file() {
            return Err(YwError::NotFound(self.path.clone()));
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| YwError::Io {
            path: self.path.clone(),
            source,
        })?;
        let added = self.cdata.scan(&raw);
        if added > 0 {
            debug!(added, "Extended CDATA registry");
        }

        let root = Element::parse(&raw).map_err(|e| YwError::parse(&self.path, e.to_string()))?;
        let project = reader::read_project(&root, &self.fields)
            .map_err(|e| YwError::parse(&self.path, e.to_string()))?;
        self.tree = Some(root);

        info!(
            chapters = project.chapters.len(),
            scenes = project.scenes.len(),
            characters = project.characters.len(),
            "Read project"
        );
        Ok(project)
    }

    /// Write the project, patching the tree of the last read if there was one.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub fn write(&mut self, project: &Project) -> Result<(), YwError> {
        if self.is_locked() {
            warn!("Project is locked");
            return Err(YwError::Locked(self.path.clone()));
        }

        let mut root = self.tree.take().unwrap_or_else(writer::new_document);
        writer::build_tree(&mut root, project, &self.locale);
        let text = self.cdata.postprocess(&root.to_xml_string());
        self.tree = Some(root);

        self.replace_file(&text)?;
        info!(
            chapters = project.chapters.len(),
            scenes = project.scenes.len(),
            "Wrote project"
        );
        Ok(())
    }

    fn replace_file(&self, text: &str) -> Result<(), YwError> {
        self.replace_with(|path| fs::write(path, text))
    }

    /// Back up the current file, then run `write`. A failed write puts the
    /// backup back in place.
    fn replace_with(&self, write: impl FnOnce(&Path) -> io::Result<()>) -> Result<(), YwError> {
        let backup = self.backup_path();
        let backed_up = if self.path.is_file() {
            fs::rename(&self.path, &backup).map_err(|source| YwError::WriteProtected {
                path: self.path.clone(),
                source,
            })?;
            debug!(backup = %backup.display(), "Backed up project");
            true
        } else {
            false
        };

        if let Err(source) = write(&self.path) {
            if backed_up {
                match fs::rename(&backup, &self.path) {
                    Ok(()) => info!("Restored project from backup"),
                    Err(e) => warn!(error = %e, "Could not restore project from backup"),
                }
            }
            return Err(YwError::Io {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(wanted))
}

/// `novel.yw7` + `.lock` → `novel.yw7.lock`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EntityType;
    use crate::test_helpers::{sample_project, setup_fixtures, write_fixture};
    use tempfile::TempDir;

    fn open(path: &Path) -> Yw7File {
        Yw7File::new(path, &ConverterConfig::default()).unwrap()
    }

    #[test]
    fn new_rejects_other_extensions() {
        let config = ConverterConfig::default();
        assert!(matches!(
            Yw7File::new("novel.odt", &config),
            Err(YwError::UnsupportedFormat(_))
        ));
        assert!(Yw7File::new("NOVEL.YW7", &config).is_ok());
    }

    #[test]
    fn sibling_paths() {
        let file = open(Path::new("/tmp/novel.yw7"));
        assert_eq!(file.lock_path(), PathBuf::from("/tmp/novel.yw7.lock"));
        assert_eq!(file.backup_path(), PathBuf::from("/tmp/novel.yw7.bak"));
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let mut file = open(&tmp.path().join("missing.yw7"));
        assert!(matches!(file.read(), Err(YwError::NotFound(_))));
    }

    #[test]
    fn read_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_fixture(tmp.path(), "broken.yw7", "<YWRITER7><PROJECT>");
        let mut file = open(&path);
        assert!(matches!(file.read(), Err(YwError::Parse { .. })));
    }

    #[test]
    fn read_undecodable_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("binary.yw7");
        fs::write(&path, [0x3c, 0xff, 0xfe, 0x3e]).unwrap();
        let mut file = open(&path);
        assert!(matches!(file.read(), Err(YwError::Io { .. })));
    }

    #[test]
    fn lock_blocks_read_and_write_without_touching_files() {
        let tmp = TempDir::new().unwrap();
        let original = "<YWRITER7><PROJECT><Title>Novel</Title></PROJECT></YWRITER7>";
        let path = write_fixture(tmp.path(), "novel.yw7", original);
        let mut file = open(&path);
        fs::write(file.lock_path(), "").unwrap();

        assert!(matches!(file.read(), Err(YwError::Locked(_))));
        assert!(matches!(
            file.write(&sample_project()),
            Err(YwError::Locked(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
        assert!(!file.backup_path().exists());
    }

    #[test]
    fn write_then_read_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("novel.yw7");
        let project = sample_project();

        open(&path).write(&project).unwrap();
        let reread = open(&path).read().unwrap();

        assert_eq!(reread.title, project.title);
        assert_eq!(reread.srt_chapters, project.srt_chapters);
        for (id, scene) in &project.scenes {
            let back = &reread.scenes[id];
            assert_eq!(back.content(), scene.content(), "scene {id}");
            assert_eq!(back.word_count(), scene.word_count(), "scene {id}");
            assert_eq!(back.letter_count(), scene.letter_count(), "scene {id}");
            assert_eq!(back.sc_type, scene.sc_type, "scene {id}");
            assert_eq!(back.tags, scene.tags, "scene {id}");
            assert_eq!(back.characters, scene.characters, "scene {id}");
        }
        for (id, chapter) in &project.chapters {
            assert_eq!(reread.chapters[id].ch_type, chapter.ch_type, "chapter {id}");
            assert_eq!(reread.chapters[id].srt_scenes, chapter.srt_scenes, "chapter {id}");
        }
    }

    #[test]
    fn every_type_survives_a_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("types.yw7");
        let project = sample_project();
        open(&path).write(&project).unwrap();
        let reread = open(&path).read().unwrap();

        let scene_types: Vec<_> = reread.scenes.values().filter_map(|s| s.sc_type).collect();
        let chapter_types: Vec<_> = reread.chapters.values().filter_map(|c| c.ch_type).collect();
        for t in EntityType::ALL {
            assert!(scene_types.contains(&t), "scene type {t:?} missing");
            assert!(chapter_types.contains(&t), "chapter type {t:?} missing");
        }
    }

    #[test]
    fn second_write_keeps_a_backup() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("novel.yw7");
        let mut file = open(&path);
        file.write(&sample_project()).unwrap();
        assert!(!file.backup_path().exists());

        let first = fs::read_to_string(&path).unwrap();
        file.write(&sample_project()).unwrap();
        assert_eq!(fs::read_to_string(file.backup_path()).unwrap(), first);
    }

    #[test]
    fn unknown_elements_survive_read_and_write() {
        let tmp = TempDir::new().unwrap();
        let path = write_fixture(
            tmp.path(),
            "novel.yw7",
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<YWRITER7>\
             <PROJECT><Ver>7</Ver><Title><![CDATA[Novel]]></Title><Extra>kept</Extra></PROJECT>\
             <SCENES><SCENE><ID>1</ID><Title><![CDATA[Start]]></Title>\
             <Fields><Field_Mood><![CDATA[a < b]]></Field_Mood></Fields></SCENE></SCENES>\
             <CHAPTERS><CHAPTER><ID>1</ID><Scenes><ScID>1</ScID></Scenes></CHAPTER></CHAPTERS>\
             </YWRITER7>",
        );
        let mut file = open(&path);
        let project = file.read().unwrap();
        assert!(file.cdata().contains("Field_Mood"));
        file.write(&project).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("<Extra>kept</Extra>"));
        assert!(text.contains("<Field_Mood><![CDATA[a < b]]></Field_Mood>"));
        assert!(text.contains("<Title><![CDATA[Start]]></Title>"));
    }

    #[cfg(unix)]
    #[test]
    fn failed_backup_rename_is_write_protected() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("novel.yw7");
        let mut file = open(&path);
        file.write(&sample_project()).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let dir = tmp.path();
        fs::set_permissions(dir, fs::Permissions::from_mode(0o555)).unwrap();
        let result = file.write(&sample_project());
        fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();

        // Privileged users can rename in a read-only directory.
        if let Err(err) = result {
            assert!(matches!(err, YwError::WriteProtected { .. }));
            assert_eq!(fs::read_to_string(&path).unwrap(), before);
        }
    }

    #[test]
    fn checked_in_fixture_extends_cdata_registry() {
        let tmp = setup_fixtures();
        let mut file = open(&tmp.path().join("sample.yw7"));
        assert!(!file.cdata().contains("Field_Mood"));

        let project = file.read().unwrap();
        assert!(file.cdata().contains("Field_Mood"));
        assert!(file.cdata().contains("Field_SceneArcs"));
        assert_eq!(project.scenes.len(), 4);
        assert_eq!(project.srt_chapters.len(), 4);
    }

    #[test]
    fn failed_write_restores_previous_file() {
        let tmp = TempDir::new().unwrap();
        let original = "<YWRITER7><PROJECT><Title>Novel</Title></PROJECT></YWRITER7>";
        let path = write_fixture(tmp.path(), "novel.yw7", original);
        let file = open(&path);

        let err = file
            .replace_with(|_| Err(io::Error::other("disk full")))
            .unwrap_err();
        assert!(matches!(err, YwError::Io { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
        assert!(!file.backup_path().exists());
    }

    #[test]
    fn failed_first_write_leaves_nothing_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("novel.yw7");
        let file = open(&path);

        let err = file
            .replace_with(|_| Err(io::Error::other("disk full")))
            .unwrap_err();
        assert!(matches!(err, YwError::Io { .. }));
        assert!(!path.exists());
        assert!(!file.backup_path().exists());
    }

    #[test]
    fn custom_fields_notes_and_world_survive_a_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("novel.yw7");
        let mut project = sample_project();
        {
            let scene = project.scenes.get_mut("1").unwrap();
            scene
                .kw_var
                .insert("Field_SceneArcs".into(), Some("A & <b>".into()));
            scene.notes = Some("Check the ]]> marker & the <tide>.".into());
        }
        {
            let mara = project.characters.get_mut("1").unwrap();
            mara.notes = Some("Left-handed.".into());
            mara.bio = Some("Grew up on the pier.".into());
            mara.goals = Some("Find her brother.".into());
        }
        project.project_notes.get_mut("1").unwrap().desc = Some("Quiet, salt & rope.".into());

        open(&path).write(&project).unwrap();
        let reread = open(&path).read().unwrap();

        let scene = &reread.scenes["1"];
        assert_eq!(scene.kw_var["Field_SceneArcs"].as_deref(), Some("A & <b>"));
        assert_eq!(scene.notes, project.scenes["1"].notes);

        for (id, character) in &project.characters {
            let back = &reread.characters[id];
            assert_eq!(back.element.title, character.element.title, "character {id}");
            assert_eq!(back.element.tags, character.element.tags, "character {id}");
            assert_eq!(back.full_name, character.full_name, "character {id}");
            assert_eq!(back.notes, character.notes, "character {id}");
            assert_eq!(back.bio, character.bio, "character {id}");
            assert_eq!(back.goals, character.goals, "character {id}");
        }
        assert_eq!(reread.characters["1"].is_major, Some(true));
        assert_eq!(reread.srt_characters, project.srt_characters);

        assert_eq!(reread.project_notes["1"].title, project.project_notes["1"].title);
        assert_eq!(
            reread.project_notes["1"].desc.as_deref(),
            Some("Quiet, salt & rope.")
        );
        assert_eq!(reread.srt_prj_notes, project.srt_prj_notes);
    }
}
