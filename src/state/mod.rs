pub mod path;
pub mod sections;
pub mod tree;

pub use path::{get, update, Path, Segment};
pub use sections::{SectionId, SectionVisibility};
pub use tree::Node;
