//! Entities module - one struct per database table.

pub mod appointment;
pub mod catalog;
pub mod employee;
pub mod enums;
pub mod notification;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;
pub mod vehicle;

pub use appointment::Appointment;
pub use catalog::{Category, Feature, Service};
pub use employee::{Employee, StaffReview};
pub use enums::{
    AppointmentStatus, NotificationKind, OrderPaymentStatus, OrderStatus, PaymentProvider,
    PaymentStatus, UserRole,
};
pub use notification::Notification;
pub use order::{Order, OrderItem};
pub use payment::Payment;
pub use product::Product;
pub use user::User;
pub use vehicle::Vehicle;
