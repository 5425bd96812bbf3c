pub mod profile;
pub mod theme;

pub use profile::ProfileService;
pub use theme::ThemeCache;
