mod coerce;
mod reading;
mod summary;
mod timestamp;

pub use coerce::*;
pub use reading::*;
pub use summary::*;
pub use timestamp::*;
