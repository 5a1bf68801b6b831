pub mod aggregator;
pub mod report;
pub mod window;

pub use report::ReportAssembler;
