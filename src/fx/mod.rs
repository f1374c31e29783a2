mod book;
mod rate;

pub use book::{FxResolver, RateBook, ResolveMode};
pub use rate::{parse_scaled_rate, Rate, RateOrigin};
