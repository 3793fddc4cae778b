pub mod fill;
pub mod insight;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use fill::{FillError, PageFill};
pub use insight::InsightResponder;
pub use traits::{PageRepo, ProfileSource};
