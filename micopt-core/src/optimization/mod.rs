pub mod fitness;
pub mod genetic;
pub mod gradient;
pub mod layout;
pub mod params;
pub mod progress;
pub mod result;
