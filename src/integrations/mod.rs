//! Third-party integrations: the eSewa payment gateway and the hosted
//! identity provider's webhooks.

pub mod esewa;
pub mod identity;
