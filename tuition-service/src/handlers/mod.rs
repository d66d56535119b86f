pub mod billing;

pub use billing::AppState;
