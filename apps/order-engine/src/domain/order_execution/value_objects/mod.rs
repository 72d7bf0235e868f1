//! Order Execution Value Objects
//!
//! Immutable types describing venue orders and the calls made against them.

mod call_reason;
mod order_params;
mod order_side;
mod order_snapshot;
mod order_state;

pub use call_reason::{CallReason, CallRequest};
pub use order_params::OrderParams;
pub use order_side::OrderSide;
pub use order_snapshot::OrderSnapshot;
pub use order_state::OrderState;
