pub mod agenda;
pub mod booking;
pub mod feed;
pub mod layout;
pub mod lifecycle;
pub mod store;

pub use agenda::{AgendaService, AgendaSnapshot};
pub use booking::BookingService;
pub use feed::ChangeFeedHub;
pub use lifecycle::LifecycleService;
pub use store::ScheduleStore;
