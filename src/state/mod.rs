mod app_state;
pub mod selection;
mod store;

pub use app_state::{AppState, LoadStatus, TabRecord, WindowBounds, ZoomStep};
pub use store::{StateChangeEvent, StateStore, SubscriptionId};
