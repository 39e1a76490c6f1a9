//! Request extension trait for handler-side access to the caller
//!
//! The gate has already enforced the method policy; these helpers exist for
//! handlers that want the identity or a finer-grained role check.

use crate::claims::AuthContext;
use tonic::{Request, Status};

pub trait AuthContextExt {
    /// Caller stored by the gate
    ///
    /// ## Errors
    ///
    /// `Status::unauthenticated` if the service is not behind `RbacLayer`
    fn auth_context(&self) -> Result<&AuthContext, Status>;

    /// Caller, provided it holds `role`
    ///
    /// ## Errors
    ///
    /// - `Status::unauthenticated` if no context is present
    /// - `Status::permission_denied` if the role is missing
    fn require_role(&self, role: &str) -> Result<&AuthContext, Status>;
}

impl<T> AuthContextExt for Request<T> {
    fn auth_context(&self) -> Result<&AuthContext, Status> {
        self.extensions()
            .get::<AuthContext>()
            .ok_or_else(|| Status::unauthenticated("No auth context found. Ensure RbacLayer is attached."))
    }

    fn require_role(&self, role: &str) -> Result<&AuthContext, Status> {
        let context = self.auth_context()?;

        if !context.has_role(role) {
            return Err(Status::permission_denied(crate::error::REJECTION_MESSAGE));
        }

        Ok(context)
    }
}
