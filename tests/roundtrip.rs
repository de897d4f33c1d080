//! Project file integration tests over `fixtures/sample.yw7`.
//!
//! Every test works on its own temp copy of the fixture, so files can be
//! rewritten, locked and backed up freely.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use yw_cnv::codec::EntityType;
use yw_cnv::config::ConverterConfig;
use yw_cnv::convert;
use yw_cnv::error::YwError;
use yw_cnv::model::{ChapterLevel, Project, SceneStatus};
use yw_cnv::xref::CrossReferences;
use yw_cnv::yw7::Yw7File;

// ===========================================================================
// Setup
// ===========================================================================

fn fixture_copy(tmp: &TempDir, name: &str) -> PathBuf {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample.yw7");
    let target = tmp.path().join(name);
    fs::copy(source, &target).unwrap();
    target
}

fn open(path: &Path) -> Yw7File {
    Yw7File::new(path, &ConverterConfig::default()).unwrap()
}

fn read(path: &Path) -> Project {
    open(path).read().unwrap()
}

// ===========================================================================
// Reading
// ===========================================================================

#[test]
fn fixture_reads_project_header_and_locale() {
    let tmp = TempDir::new().unwrap();
    let project = read(&fixture_copy(&tmp, "novel.yw7"));

    assert_eq!(project.title.as_deref(), Some("The Lighthouse Keeper"));
    assert_eq!(project.author_name.as_deref(), Some("Jane Doe"));
    assert_eq!(project.desc.as_deref(), Some("A keeper, a storm & a stranger."));
    assert_eq!(project.field_titles[0].as_deref(), Some("Suspense"));
    assert_eq!(project.word_target, Some(80000));
    assert_eq!(project.language_code.as_deref(), Some("en"));
    assert_eq!(project.country_code.as_deref(), Some("GB"));
    assert_eq!(project.languages, Some(vec!["de".to_string()]));
}

#[test]
fn fixture_reads_chapter_structure() {
    let tmp = TempDir::new().unwrap();
    let project = read(&fixture_copy(&tmp, "novel.yw7"));

    assert_eq!(project.srt_chapters, vec!["1", "2", "3", "4"]);
    assert_eq!(project.chapters["1"].ch_level, Some(ChapterLevel::Part));
    assert!(project.chapters["1"].srt_scenes.is_empty());
    assert_eq!(project.chapters["2"].srt_scenes, vec!["1", "2"]);
    assert_eq!(project.chapters["3"].ch_type, Some(EntityType::Notes));
    assert_eq!(project.chapters["4"].ch_type, Some(EntityType::Unused));
    assert_eq!(project.chapters["4"].is_trash, Some(true));
}

#[test]
fn fixture_reads_scene_details() {
    let tmp = TempDir::new().unwrap();
    let project = read(&fixture_copy(&tmp, "novel.yw7"));

    let storm = &project.scenes["1"];
    assert_eq!(storm.word_count(), 14);
    assert_eq!(storm.letter_count(), 80);
    assert_eq!(storm.status, Some(SceneStatus::FirstEdit));
    assert_eq!(storm.date.as_deref(), Some("1912-11-03"));
    assert_eq!(storm.time.as_deref(), Some("21:30:00"));
    assert_eq!(
        storm.tags,
        Some(vec!["storm".to_string(), "opening".to_string()])
    );
    assert_eq!(storm.fields[0].as_deref(), Some("8"));
    assert_eq!(storm.kw_var["Field_SceneArcs"].as_deref(), Some("A"));
    assert_eq!(storm.kw_var["Field_SceneStyle"], None);

    let stranger = &project.scenes["2"];
    assert_eq!(stranger.word_count(), 8);
    assert_eq!(stranger.day.as_deref(), Some("2"));
    assert_eq!(stranger.time.as_deref(), Some("06:45:00"));
    assert_eq!(stranger.is_reaction_scene, Some(true));
    assert_eq!(project.viewpoint_character("2").as_deref(), Some("Stranger"));

    assert_eq!(project.scenes["3"].sc_type, Some(EntityType::Notes));
    assert_eq!(project.scenes["4"].sc_type, Some(EntityType::Unused));
    assert_eq!(project.scenes["4"].do_not_export, Some(true));
}

// ===========================================================================
// Writing
// ===========================================================================

#[test]
fn rewrite_preserves_the_model() {
    let tmp = TempDir::new().unwrap();
    let path = fixture_copy(&tmp, "novel.yw7");
    let mut file = open(&path);
    let first = file.read().unwrap();
    file.write(&first).unwrap();

    let second = read(&path);
    assert_eq!(second, first);
}

#[test]
fn rewrite_keeps_unmanaged_content() {
    let tmp = TempDir::new().unwrap();
    let path = fixture_copy(&tmp, "novel.yw7");
    let mut file = open(&path);
    let project = file.read().unwrap();
    file.write(&project).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(text.contains("<AutoBackup>-1</AutoBackup>"));
    assert!(text.contains("<Field_Mood><![CDATA[grim & wet]]></Field_Mood>"));
    assert!(text.contains("<Desc><![CDATA[<HTM <SPAN LANG=\"de\"> /HTM>]]></Desc>"));
    assert_eq!(text.matches("<Title><![CDATA[lang=de]]></Title>").count(), 1);

    let backup = fs::read_to_string(tmp.path().join("novel.yw7.bak")).unwrap();
    assert!(backup.contains("<WordCount>14</WordCount>"));
}

#[test]
fn edited_content_rewrites_counts() {
    let tmp = TempDir::new().unwrap();
    let path = fixture_copy(&tmp, "novel.yw7");
    let mut file = open(&path);
    let mut project = file.read().unwrap();
    project.scenes.get_mut("3").unwrap().set_content("Low tide at noon, high tide at night.");
    file.write(&project).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("<WordCount>8</WordCount>"));
    assert_eq!(read(&path).scenes["3"].word_count(), 8);
}

#[test]
fn locked_project_is_left_alone() {
    let tmp = TempDir::new().unwrap();
    let path = fixture_copy(&tmp, "novel.yw7");
    let before = fs::read_to_string(&path).unwrap();
    fs::write(tmp.path().join("novel.yw7.lock"), "").unwrap();

    let mut file = open(&path);
    assert!(matches!(file.read(), Err(YwError::Locked(_))));
    assert!(matches!(file.write(&Project::new()), Err(YwError::Locked(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
    assert!(!tmp.path().join("novel.yw7.bak").exists());
}

// ===========================================================================
// Import and cross references
// ===========================================================================

#[test]
fn import_applies_edits_and_dividers() {
    let tmp = TempDir::new().unwrap();
    let config = ConverterConfig::default();
    let base = fixture_copy(&tmp, "novel.yw7");
    let incoming = fixture_copy(&tmp, "edited.yw7");

    let mut edit_file = open(&incoming);
    let mut edited = edit_file.read().unwrap();
    edited
        .scenes
        .get_mut("2")
        .unwrap()
        .set_content("Someone knocked.\n### Morning|The storm is over\nThe sea was calm.");
    edited.scenes.get_mut("1").unwrap().desc = Some(String::new());
    edit_file.write(&edited).unwrap();

    let outcome = convert::import(&incoming, &base, &config, true).unwrap();
    assert!(outcome.split);
    assert_eq!(outcome.report.new_scenes, vec!["5"]);

    let merged = read(&base);
    assert_eq!(merged.chapters["2"].srt_scenes, vec!["1", "2", "5"]);
    assert_eq!(merged.scenes["5"].title.as_deref(), Some("Morning"));
    assert_eq!(merged.scenes["5"].content(), Some("The sea was calm."));
    assert_eq!(merged.scenes["2"].content(), Some("Someone knocked."));
    assert_eq!(merged.scenes["1"].desc.as_deref(), Some(""));
    assert_eq!(merged.title.as_deref(), Some("The Lighthouse Keeper"));
}

#[test]
fn xref_over_fixture() {
    let tmp = TempDir::new().unwrap();
    let project = read(&fixture_copy(&tmp, "novel.yw7"));
    let xref = CrossReferences::generate(&project);

    assert_eq!(xref.srt_scenes, vec!["1", "2", "3", "4"]);
    assert_eq!(xref.scn_per_chr["1"], vec!["1", "2"]);
    assert_eq!(xref.scn_per_chr["2"], vec!["2"]);
    assert!(xref.scn_per_loc["2"].is_empty());
    assert_eq!(xref.scn_per_tag["storm"], vec!["1"]);
    assert_eq!(xref.loc_per_tag["building"], vec!["1"]);
    assert_eq!(xref.chp_per_scn["4"], "4");
}

#[test]
fn list_finds_the_fixture() {
    let tmp = TempDir::new().unwrap();
    fixture_copy(&tmp, "novel.yw7");
    let found = convert::find_projects(tmp.path(), &ConverterConfig::default());
    assert_eq!(found.len(), 1);
    assert!(!found[0].locked);
}
