//! DTOs module - Data Transfer Objects
//!
//! Request bodies, query strings and response shapes. DTOs keep the API
//! representation apart from the entities: money leaves as strings and the
//! identity-provider id never leaves at all.

pub mod appointment;
pub mod catalog;
pub mod notification;
pub mod order;
pub mod payment;
pub mod product;
pub mod staff;
pub mod user;
pub mod validation;
pub mod vehicle;

pub use appointment::{
    AppointmentDTO, AppointmentQuery, AssignEmployeeDTO, CreateAppointmentDTO, NewAppointment,
    UpdateAppointmentStatusDTO,
};
pub use catalog::{
    CategoryDTO, CreateCategoryDTO, CreateServiceDTO, ServiceDTO, ServiceQuery,
    UpdateCategoryDTO, UpdateServiceDTO,
};
pub use notification::{NewNotification, NotificationDTO, NotificationQuery, UnreadCountDTO};
pub use order::{
    CreateOrderDTO, OrderDTO, OrderItemDTO, OrderLineDTO, OrderQuery, UpdateOrderStatusDTO,
};
pub use payment::{CallbackQuery, EsewaFormDTO, InitiatePaymentDTO, PaymentDTO};
pub use product::{CreateProductDTO, PageDTO, ProductDTO, ProductQuery, UpdateProductDTO};
pub use staff::{
    CreateEmployeeDTO, CreateReviewDTO, EmployeeDTO, ReviewDTO, ReviewSummaryDTO, StaffQuery,
    StaffTasksDTO, UpdateEmployeeDTO,
};
pub use user::{UpdateProfileDTO, UpdateRoleDTO, UpsertUserDTO, UserDTO, UserQuery};
pub use vehicle::{CreateVehicleDTO, VehicleDTO};
