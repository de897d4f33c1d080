//! Cross-reference index over a project.
//!
//! Built once from a read-only project and then queried. Scene lists are in
//! document order (chapter order, then scene order within the chapter).
//! References to ids that no longer exist are skipped.

use crate::model::Project;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossReferences {
    /// Character id → scenes. Every listed character has an entry.
    pub scn_per_chr: BTreeMap<String, Vec<String>>,
    pub scn_per_loc: BTreeMap<String, Vec<String>>,
    pub scn_per_itm: BTreeMap<String, Vec<String>>,
    /// Scene tag → scenes.
    pub scn_per_tag: BTreeMap<String, Vec<String>>,
    pub chr_per_tag: BTreeMap<String, Vec<String>>,
    pub loc_per_tag: BTreeMap<String, Vec<String>>,
    pub itm_per_tag: BTreeMap<String, Vec<String>>,
    /// Scene id → chapter id.
    pub chp_per_scn: BTreeMap<String, String>,
    /// All scenes in document order.
    pub srt_scenes: Vec<String>,
}

impl CrossReferences {
    pub fn generate(project: &Project) -> Self {
        let mut xref = Self::default();

        for cr_id in &project.srt_characters {
            let Some(character) = project.characters.get(cr_id) else {
                continue;
            };
            xref.scn_per_chr.insert(cr_id.clone(), Vec::new());
            index_tags(&mut xref.chr_per_tag, character.element.tags.as_deref(), cr_id);
        }
        for lc_id in &project.srt_locations {
            let Some(location) = project.locations.get(lc_id) else {
                continue;
            };
            xref.scn_per_loc.insert(lc_id.clone(), Vec::new());
            index_tags(&mut xref.loc_per_tag, location.tags.as_deref(), lc_id);
        }
        for it_id in &project.srt_items {
            let Some(item) = project.items.get(it_id) else {
                continue;
            };
            xref.scn_per_itm.insert(it_id.clone(), Vec::new());
            index_tags(&mut xref.itm_per_tag, item.tags.as_deref(), it_id);
        }

        for (ch_id, sc_id) in project.scenes_in_order() {
            let Some(scene) = project.scenes.get(sc_id) else {
                continue;
            };
            xref.srt_scenes.push(sc_id.to_string());
            xref.chp_per_scn.insert(sc_id.to_string(), ch_id.to_string());

            index_refs(&mut xref.scn_per_chr, scene.characters.as_deref(), sc_id);
            index_refs(&mut xref.scn_per_loc, scene.locations.as_deref(), sc_id);
            index_refs(&mut xref.scn_per_itm, scene.items.as_deref(), sc_id);
            index_tags(&mut xref.scn_per_tag, scene.tags.as_deref(), sc_id);
        }
        xref
    }

    /// Position of a scene in document order, counting from 1.
    pub fn scene_number(&self, sc_id: &str) -> Option<usize> {
        self.srt_scenes.iter().position(|s| s == sc_id).map(|i| i + 1)
    }
}

fn index_tags(index: &mut BTreeMap<String, Vec<String>>, tags: Option<&[String]>, id: &str) {
    for tag in tags.unwrap_or_default() {
        index.entry(tag.clone()).or_default().push(id.to_string());
    }
}

/// Only ids that already have an entry are indexed.
fn index_refs(index: &mut BTreeMap<String, Vec<String>>, refs: Option<&[String]>, sc_id: &str) {
    for id in refs.unwrap_or_default() {
        if let Some(scenes) = index.get_mut(id) {
            scenes.push(sc_id.to_string());
        }
    }
}
