pub mod directory;
pub mod timeline;
pub mod transfer;

pub use directory::PatientDirectoryService;
pub use timeline::TimelineService;
pub use transfer::CsvTransferService;
