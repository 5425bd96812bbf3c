pub mod pricelist;

pub use pricelist::PriceListService;
