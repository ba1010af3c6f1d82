pub mod display;
pub mod report;
pub mod widgets;

pub use widgets::*;
