//! Repositories module - one repository per table
//!
//! Every repository owns a clone of the `MySqlPool` and exposes the
//! queries its handlers need. Queries are written with
//! `sqlx::query_as::<_, T>` over `#[derive(sqlx::FromRow)]` entities so the
//! crate builds without a live database; the schema lives in `migrations/`.
//!
//! Methods return `sqlx::Error` and let the service layer turn it into an
//! `AppError` through `?`. Single-row lookups return `Option`, writes read
//! the row back after `last_insert_id()`, and multi-row writes run inside
//! one transaction.

pub mod appointment;
pub mod catalog;
pub mod notification;
pub mod order;
pub mod payment;
pub mod product;
pub mod staff;
pub mod traits;
pub mod user;
pub mod vehicle;

pub use traits::{Create, Delete, Read, Update};

pub use appointment::AppointmentRepository;
pub use catalog::{CategoryRepository, ServiceRepository};
pub use notification::NotificationRepository;
pub use order::{OrderRepository, PlaceOrderError};
pub use payment::{NewPayment, PaymentRepository, Settlement};
pub use product::{ProductFilter, ProductRepository};
pub use staff::{EmployeeRepository, NewReview, ReviewRepository};
pub use user::UserRepository;
pub use vehicle::{NewVehicle, VehicleRepository};
