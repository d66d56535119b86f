pub mod database;
pub mod ledger;
pub mod metrics;
pub mod proration;
pub mod reconciler;
pub mod schedule;
pub mod store;

pub use database::Database;
pub use ledger::LedgerService;
pub use metrics::{get_metrics, init_metrics};
pub use proration::{prorate, FALLBACK_CLASSES_PER_WEEK, FULL_MONTH_CLASSES};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use schedule::{normalize_weekday, weekday_name, ScheduleResolver};
pub use store::{LedgerStore, RosterStore};
