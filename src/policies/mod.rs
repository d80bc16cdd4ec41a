//! Assigned DR policy listing.

pub mod paginator;
pub mod view;

pub use paginator::{DEFAULT_PER_PAGE, INITIAL_PAGE};
pub use view::{PolicyListInput, PolicyListView};
