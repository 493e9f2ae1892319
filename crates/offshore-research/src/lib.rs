pub mod admin;
pub mod allocation;
pub mod browse;
pub mod error;
pub mod pdf;
pub mod report;
pub mod scoring;
pub mod timeline;

pub mod test_support;

pub use admin::{AdminConsole, AdminSession};
pub use allocation::{AllocationResolver, ResolvedAllocation};
pub use browse::ResearchBrowser;
pub use error::{ErrorKind, Invalid, Missing, ResearchError};
pub use pdf::{PdfRenderer, ReportError};
pub use report::{report_file_name, Report, ReportAssembler, ReportEntry, ReportFilters, ReportSection};
pub use scoring::{score, Answers, RiskAssessment};
pub use timeline::{stance_timeline, TimelinePoint};
