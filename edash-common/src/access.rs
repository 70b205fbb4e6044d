//! Access policy
//!
//! Role membership decides two things: whether a caller may use an endpoint
//! at all ([`evaluate`]), and which work records the caller may see
//! ([`Scope`]). Handlers never scan role lists themselves.

use serde::{Deserialize, Serialize};

/// Access group codes known to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    /// Roles that see every employee's records
    pub const ELEVATED: &'static [Role] = &[Role::Admin, Role::Manager];

    /// Access group code as stored in `access_groups.code`
    pub const fn code(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }

    /// Parse an access group code (case-insensitive)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

/// Outcome of a policy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Allow iff the caller holds at least one of the required roles.
///
/// Unknown role codes held by the caller are ignored. An empty `required`
/// list denies everyone.
pub fn evaluate<S: AsRef<str>>(caller_roles: &[S], required: &[Role]) -> Decision {
    let allowed = caller_roles
        .iter()
        .filter_map(|code| Role::from_code(code.as_ref()))
        .any(|role| required.contains(&role));

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// True when the caller holds an elevated role
pub fn is_elevated<S: AsRef<str>>(caller_roles: &[S]) -> bool {
    evaluate(caller_roles, Role::ELEVATED).is_allowed()
}

/// Which employees' records a caller may read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Unfiltered (elevated callers)
    All,
    /// Only rows of this employee
    Employee(i64),
    /// Caller has no linked employee and no elevated role
    Nobody,
}

impl Scope {
    pub fn for_caller<S: AsRef<str>>(caller_roles: &[S], own_employee: Option<i64>) -> Self {
        if is_elevated(caller_roles) {
            Scope::All
        } else {
            match own_employee {
                Some(id) => Scope::Employee(id),
                None => Scope::Nobody,
            }
        }
    }

    pub fn can_access(self, employee_id: i64) -> bool {
        match self {
            Scope::All => true,
            Scope::Employee(own) => own == employee_id,
            Scope::Nobody => false,
        }
    }

    /// Bind values for a `(? = 1 OR <employee column> = ?)` filter.
    ///
    /// `Nobody` binds a NULL employee id, which matches no row.
    pub fn sql_params(self) -> (bool, Option<i64>) {
        match self {
            Scope::All => (true, None),
            Scope::Employee(id) => (false, Some(id)),
            Scope::Nobody => (false, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_allows_on_intersection() {
        let roles = vec!["employee".to_string(), "manager".to_string()];
        assert_eq!(evaluate(&roles, &[Role::Manager]), Decision::Allow);
        assert_eq!(evaluate(&roles, &[Role::Admin]), Decision::Deny);
    }

    #[test]
    fn test_evaluate_is_case_insensitive_and_ignores_unknown() {
        assert!(evaluate(&["ADMIN"], &[Role::Admin]).is_allowed());
        assert!(!evaluate(&["auditor"], Role::ELEVATED).is_allowed());
    }

    #[test]
    fn test_evaluate_empty_required_denies() {
        assert_eq!(evaluate(&["admin"], &[]), Decision::Deny);
    }

    #[test]
    fn test_scope_for_caller() {
        assert_eq!(Scope::for_caller(&["admin"], None), Scope::All);
        assert_eq!(Scope::for_caller(&["manager"], Some(3)), Scope::All);
        assert_eq!(Scope::for_caller(&["employee"], Some(3)), Scope::Employee(3));
        assert_eq!(Scope::for_caller::<&str>(&[], None), Scope::Nobody);
    }

    #[test]
    fn test_scope_can_access() {
        assert!(Scope::All.can_access(9));
        assert!(Scope::Employee(9).can_access(9));
        assert!(!Scope::Employee(9).can_access(10));
        assert!(!Scope::Nobody.can_access(9));
    }

    #[test]
    fn test_scope_sql_params() {
        assert_eq!(Scope::All.sql_params(), (true, None));
        assert_eq!(Scope::Employee(4).sql_params(), (false, Some(4)));
        assert_eq!(Scope::Nobody.sql_params(), (false, None));
    }
}
