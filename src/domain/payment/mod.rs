pub mod payment;
pub mod value_objects;

pub use payment::PaymentRecord;
