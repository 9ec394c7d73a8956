pub mod completion;
pub mod content;

pub use completion::*;
pub use content::*;
