pub mod complaint;
pub mod dashboard;
pub mod fee;
pub mod inquiry;
pub mod leave_request;
pub mod room;
pub mod student;
