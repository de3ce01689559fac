//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod attendance_record;
pub mod card_order;
pub mod card_transaction;
pub mod course;
pub mod course_group;
pub mod course_session;
pub mod enrollment;
pub mod leave_request;
pub mod makeup_request;
pub mod profile;
pub mod system_config;
pub mod transfer_request;

// Re-export specific types to avoid conflicts
pub use attendance_record::{Entity as AttendanceRecord, Model as AttendanceRecordModel};
pub use card_order::{Entity as CardOrder, Model as CardOrderModel};
pub use card_transaction::{Entity as CardTransaction, Model as CardTransactionModel};
pub use course::{Entity as Course, Model as CourseModel};
pub use course_group::{Entity as CourseGroup, Model as CourseGroupModel};
pub use course_session::{Entity as CourseSession, Model as CourseSessionModel};
pub use enrollment::{Entity as Enrollment, Model as EnrollmentModel};
pub use leave_request::{Entity as LeaveRequest, Model as LeaveRequestModel};
pub use makeup_request::{Entity as MakeupRequest, Model as MakeupRequestModel};
pub use profile::{Entity as Profile, Model as ProfileModel};
pub use system_config::{
    Column as SystemConfigColumn, Entity as SystemConfig, Model as SystemConfigModel,
};
pub use transfer_request::{Entity as TransferRequest, Model as TransferRequestModel};
