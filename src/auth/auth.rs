use crate::model::role::Role;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorForbidden,
    error::ErrorUnauthorized,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<String>,
}

/// Reads the user the auth middleware attached to the request.
impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(ErrorUnauthorized("Not authenticated"))),
        }
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.manages_payroll() {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    /// Returns true if the user is an employee
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// Employee id of a self-service caller; forbidden without a linked profile.
    pub fn own_employee_id(&self) -> actix_web::Result<&str> {
        self.employee_id
            .as_deref()
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }
}
