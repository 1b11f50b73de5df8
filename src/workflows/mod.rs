//! Workflow modules: the recruitment aggregate and the roster import
//! pipeline built on top of it.

pub mod import;
pub mod recruitment;
