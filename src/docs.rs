use crate::api::complaint::{ComplaintListResponse, ComplaintQuery, CreateComplaint};
use crate::api::dashboard::DashboardStats;
use crate::api::fee::{CreateFee, FeeListResponse, FeeQuery, UpdateFee};
use crate::api::inquiry::{CreateInquiry, InquiryListResponse, InquiryQuery};
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::room::{CreateRoom, RoomListResponse, RoomQuery, UpdateRoom};
use crate::api::student::{CreateStudent, StudentListResponse, StudentQuery, UpdateStudent};
use crate::model::{
    complaint::Complaint,
    fee_record::{FeeRecord, FeeStudent},
    inquiry::Inquiry,
    leave_request::LeaveRequest,
    role::Role,
    room::Room,
    status::{ComplaintStatus, FeeStatus, InquiryStatus, LeaveStatus, RoomStatus},
    student::Student,
};
use crate::models::{AdminLoginReq, LoginResponse, SessionProfile, StudentLoginReq, TokenPair};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hostel Management API",
        version = "1.0.0",
        description = r#"
## Hostel Management System

Backend for a student hostel: residents, rooms, requests and billing.

### Key Features
- **Students and Rooms**
  - Create, update, list, search and remove residents and rooms
- **Leave Requests**
  - Public submission, admin approve/reject, students see their own history
- **Complaints**
  - Public submission, admin resolve, students see their own complaints
- **Inquiries**
  - Public contact form, admin marks messages as read
- **Fees**
  - Per-student fee records, marked paid with a payment date
- **Dashboard**
  - Headline counts for the admin home page

### Security
Protected endpoints need a **JWT Bearer** access token from `/auth/admin/login`
or `/auth/student/login`. Refresh tokens rotate through `/auth/refresh`.

### Response Format
- JSON bodies; errors are `{"message": "..."}`
- List endpoints return `{data, page, per_page, total}`
"#,
    ),
    paths(
        crate::auth::handlers::admin_login,
        crate::auth::handlers::student_login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::leave_request::create_leave,
        crate::api::complaint::create_complaint,
        crate::api::inquiry::create_inquiry,

        crate::api::dashboard::dashboard,

        crate::api::student::create_student,
        crate::api::student::list_students,
        crate::api::student::get_student,
        crate::api::student::update_student,
        crate::api::student::delete_student,

        crate::api::room::create_room,
        crate::api::room::list_rooms,
        crate::api::room::get_room,
        crate::api::room::update_room,
        crate::api::room::delete_room,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::my_leave_list,

        crate::api::complaint::list_complaints,
        crate::api::complaint::get_complaint,
        crate::api::complaint::resolve_complaint,
        crate::api::complaint::delete_complaint,
        crate::api::complaint::my_complaints,

        crate::api::inquiry::list_inquiries,
        crate::api::inquiry::get_inquiry,
        crate::api::inquiry::mark_inquiry_read,
        crate::api::inquiry::delete_inquiry,

        crate::api::fee::list_fees,
        crate::api::fee::get_fee,
        crate::api::fee::create_fee,
        crate::api::fee::update_fee,
        crate::api::fee::mark_fee_paid,
        crate::api::fee::delete_fee
    ),
    components(
        schemas(
            AdminLoginReq,
            StudentLoginReq,
            LoginResponse,
            TokenPair,
            SessionProfile,
            Role,
            RoomStatus,
            LeaveStatus,
            ComplaintStatus,
            InquiryStatus,
            FeeStatus,
            Student,
            CreateStudent,
            UpdateStudent,
            StudentQuery,
            StudentListResponse,
            Room,
            CreateRoom,
            UpdateRoom,
            RoomQuery,
            RoomListResponse,
            LeaveRequest,
            CreateLeave,
            LeaveFilter,
            LeaveListResponse,
            Complaint,
            CreateComplaint,
            ComplaintQuery,
            ComplaintListResponse,
            Inquiry,
            CreateInquiry,
            InquiryQuery,
            InquiryListResponse,
            FeeRecord,
            FeeStudent,
            CreateFee,
            UpdateFee,
            FeeQuery,
            FeeListResponse,
            DashboardStats
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Admin and student sign-in, token rotation"),
        (name = "Public", description = "Anonymous forms: leave, complaint, inquiry"),
        (name = "Student", description = "Views for the logged-in student"),
        (name = "Dashboard", description = "Admin summary counts"),
        (name = "Students", description = "Resident management APIs"),
        (name = "Rooms", description = "Room management APIs"),
        (name = "Leave", description = "Leave request APIs"),
        (name = "Complaints", description = "Complaint APIs"),
        (name = "Inquiries", description = "Inquiry APIs"),
        (name = "Fees", description = "Fee record APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_family_is_documented() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in [
            "/auth/admin/login",
            "/public/leave",
            "/api/dashboard",
            "/api/students/{student_id}",
            "/api/fees/{fee_id}/pay",
            "/api/student/complaints",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }

        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
