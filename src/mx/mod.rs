//! DNS MX resolution.
//!
//! [`check_mx`] performs a synchronous lookup using the system resolver and
//! returns the sorted record list. [`has_mail_exchange`] is the pipeline's
//! view of it: every failure at the DNS layer collapses to `false` ("no mail
//! route") and never propagates upward.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{check_mx, has_mail_exchange};
pub use types::{MxRecord, MxStatus};
