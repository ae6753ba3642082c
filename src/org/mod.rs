//! Organization chart subsystem
//!
//! The spreadsheet reader turns an uploaded workbook into a flat list of
//! typed row records; the tree assembler validates the batch, rebuilds the
//! persisted hierarchy in one transaction, and reconstructs the nested tree
//! for display.

pub mod assembler;
pub mod reader;

use serde::{Deserialize, Serialize};

use crate::entity::organization_node::NodeType;

/// One (name, optional position) pair from a personnel cell
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonnelMember {
    pub name: String,
    pub position: Option<String>,
}

/// One parsed spreadsheet data row. Parent references stay as raw names;
/// the assembler resolves them to identifiers during the replace pass.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRow {
    pub name: String,
    pub node_type: NodeType,
    pub level: i32,
    pub order_index: i32,
    pub leader_name: Option<String>,
    pub parent_name: Option<String>,
    pub personnel: Option<Vec<PersonnelMember>>,
}

pub use assembler::TreeAssembler;
