pub mod record;
pub mod resolver;

pub use record::{NewRate, RateBook, RateRecord};
pub use resolver::{FallbackRates, RateResolver, RateSource, ResolvedRate, ResolvedRates};
