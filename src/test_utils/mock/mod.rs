mod scripted_source;

pub use scripted_source::*;
