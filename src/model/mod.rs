pub mod complaint;
pub mod fee_record;
pub mod inquiry;
pub mod leave_request;
pub mod role;
pub mod room;
pub mod status;
pub mod student;
