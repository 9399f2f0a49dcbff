//! Import pipeline services
//!
//! Parsing, existing-record matching, structure building and editing,
//! linking, export and the audit trail. Each is usable on its own; the
//! wizard engine sequences them.

pub mod audit_trail;
pub mod csv_exporter;
pub mod csv_parser;
pub mod hierarchy_builder;
pub mod linker;
pub mod normalize;
pub mod record_matcher;
pub mod structure_editor;

pub use audit_trail::AuditTrail;
pub use csv_exporter::{export_csv, ExportError, ExportSnapshot};
pub use csv_parser::{parse_csv, ParseError, ParsedCsv};
pub use hierarchy_builder::{build_from_remote, build_from_rows, LegislationDraft};
pub use linker::{parse_id_list, LinkBoard, LinkCatalog};
pub use record_matcher::RecordMatcher;
pub use structure_editor::{
    CommandOutcome, DropOutcome, Pool, Slot, StructureBoard, StructureCommand, StructureError,
};
