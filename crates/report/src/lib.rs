pub mod mapping;
pub mod schema;

pub use mapping::{MappedReport, MappingDefault, map_report};
pub use schema::{
    Assumption, Claim, Confidence, Evidence, Gap, GapKind, Question, ReportData, Section,
    SectionRole,
};
