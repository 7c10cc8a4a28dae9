//! File boundary for PV sizing inputs.
//!
//! Project descriptions and LV/HT cable catalogs are read from YAML or JSON.
//! Catalog exports disagree on field names (`voc`, `voc_v`,
//! `open_circuit_voltage`, ...); the record types here accept every known
//! spelling and resolve to the canonical `pv-core` types, so nothing past
//! this crate ever sees an alias.

pub mod catalog;
pub mod document;
pub mod project;

pub use catalog::{
    load_cable_catalog, load_ht_cable_catalog, CableCatalogFile, CableRecord, HtCableCatalogFile,
    HtCableRecord,
};
pub use document::read_document;
pub use project::{
    load_project, load_project_input, resolve, InverterRecord, ModuleRecord, ProjectFile,
    SiteRecord,
};
