pub mod browser;
pub mod clock;
pub mod traversal;
pub mod webdriver;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use browser::{Browser, ElementHandle, Locator};
pub use clock::{Sleeper, TokioSleeper};
pub use traversal::{Convergence, ExtractionTally, PageTraversal, TraversalConfig, TraversalOutcome, TraversalState};
pub use webdriver::{WebDriverConfig, WebDriverSession};
