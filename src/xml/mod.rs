//! Generic XML handling for project files.
//!
//! Reading and writing a project is a two-layer affair:
//!
//! - [`tree`] is a plain mutable element tree. It knows nothing about
//!   yWriter; it parses text into [`Element`]s, supports targeted find /
//!   insert / remove, and serializes back to indented text. Elements the
//!   typed layer never touches survive a read/write cycle unchanged.
//! - [`cdata`] handles CDATA sections, which the tree does not model. A raw
//!   text scan before parsing discovers which elements carry CDATA, and a
//!   text patch pass after serialization puts the wrappers back.

pub mod cdata;
pub mod tree;

pub use cdata::CdataRegistry;
pub use tree::{Element, TreeError};
