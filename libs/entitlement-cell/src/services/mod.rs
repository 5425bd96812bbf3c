pub mod access;
pub mod cache;

pub use access::AccessService;
pub use cache::AccessCache;
