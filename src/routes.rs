//! The identity gateway's route table.
//!
//! Routing is exact-match over (method, path) pairs: no patterns, no path
//! parameters. Anything not in the table is a 404, which callers are allowed
//! to hit (probes, stale clients), so a miss is not an error condition.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOp {
    SignUp,
    Confirm,
    Resend,
    Login,
    Refresh,
    Forgot,
    Reset,
}

static ROUTES: &[(&str, &str, AuthOp)] = &[
    ("POST", "/auth/signup", AuthOp::SignUp),
    ("POST", "/auth/confirm", AuthOp::Confirm),
    ("POST", "/auth/resend", AuthOp::Resend),
    ("POST", "/auth/login", AuthOp::Login),
    ("POST", "/auth/refresh", AuthOp::Refresh),
    ("POST", "/auth/forgot", AuthOp::Forgot),
    ("POST", "/auth/reset", AuthOp::Reset),
];

pub fn lookup(method: &str, path: &str) -> Option<AuthOp> {
    ROUTES
        .iter()
        .find(|(m, p, _)| *m == method && *p == path)
        .map(|(_, _, op)| *op)
}
