//! Data models for the tuition billing ledger.

mod billing;
mod caller;
mod month;
mod roster;

pub use billing::{
    field_validation_error, BillingRecord, BillingRecordDetail, BillingStats, BillingStatus,
    CreateBillingRecord, CreateBillingRequest, ListBillingFilter, MarkPaid, UpdateBillingRecord,
    UpdateBillingRequest,
};
pub use caller::{CallerIdentity, CallerRole, CALLER_EMAIL_HEADER, CALLER_ROLE_HEADER};
pub use month::{validate_month_key, InvalidMonthKey, MonthKey};
pub use roster::{Course, Group, ScheduleEntry, Student};
