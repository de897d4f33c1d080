//! # yw-cnv
//!
//! Read, merge, split and write yWriter 7 novel projects.
//!
//! A yWriter project is one XML file holding the whole novel: chapters,
//! scenes with their full text, characters, locations, items and project
//! notes. This crate reads it into a typed entity model, lets other code
//! change that model, and writes it back without disturbing anything it
//! does not understand.
//!
//! # Architecture: Read, Change, Patch
//!
//! ```text
//! novel.yw7 ──scan──▶ CDATA registry
//!           ──parse─▶ element tree ──read──▶ Project
//!                                              │ merge / split
//!           ◀─patch── element tree ◀─build─────┘
//! ```
//!
//! The element tree from the last read is kept and patched on write:
//! elements the model manages are updated, created or removed, every other
//! element is left exactly where it was. XML comments and processing
//! instructions are not part of the tree and are dropped on rewrite.
//! CDATA sections are not representable in the tree either, so they are
//! restored by a text pass after serialization.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | The entity model: `Project` and its chapters, scenes, characters, locations, items, notes |
//! | [`codec`] | Chapter and scene type encoding (Normal, Notes, ToDo, Unused) |
//! | [`ids`] | Id allocation and numeric id ordering |
//! | [`xml`] | Generic element tree and the CDATA registry |
//! | [`yw7`] | `Yw7File`: lock check, read, atomic write with backup |
//! | [`merge`] | Fold a partial project into an authoritative one |
//! | [`splitter`] | Turn divider lines in scene text into chapters and scenes |
//! | [`xref`] | Scenes per character, location, item and tag |
//! | [`convert`] | File-level import, split and project discovery |
//! | [`config`] | `yw-cnv.toml` loading, validation, and merging |
//! | [`messages`] | User-facing message texts |
//! | [`error`] | The error type shared by all file operations |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Unset Is Not Empty
//!
//! Every model field is an `Option`. `None` means "no opinion" and is
//! skipped by [`merge`]; `Some("")` is a value and overwrites. A partial
//! project produced from an external document can therefore only ever set
//! fields, never clear them by accident.
//!
//! ## Order Lives In Lists
//!
//! Entities are stored in id-keyed maps. Document order is held separately
//! in the `srt_*` lists and in each chapter's scene list, and ordered XML
//! children are rebuilt from those lists on every write.
//!
//! ## No Global State
//!
//! Message texts, registered custom fields, locale defaults and splitter
//! markers all come from [`config::ConverterConfig`] and are passed in
//! explicitly.

pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod ids;
pub mod merge;
pub mod messages;
pub mod model;
pub mod output;
pub mod splitter;
pub mod xml;
pub mod xref;
pub mod yw7;

#[cfg(test)]
pub(crate) mod test_helpers;
