pub mod payment;

pub use payment::{
    Payment, PaymentJob, PaymentRequest, PaymentSummary, PersistedPayment, ProcessorSummary,
};
