//! Request-scoped identity types shared by the gate and the HTTP pipeline.

mod identity;
mod request_details;
mod security_context;
mod switch_event;

pub use identity::{Identity, Role};
pub use request_details::RequestDetails;
pub use security_context::{SecurityContext, SlotState};
pub use switch_event::{SwitchEvent, SwitchKind};
