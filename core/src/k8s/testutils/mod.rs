mod objs;

pub use objs::*;
