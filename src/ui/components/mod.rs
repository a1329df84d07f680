mod key_result;
mod priority_tabs;

pub use key_result::KeyResult;
pub use priority_tabs::{PriorityEvent, PriorityTabs};
