mod numeric;

pub use numeric::*;
