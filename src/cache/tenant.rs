//! Tenant Module
//!
//! Tenant context supplied by the host application.

// == Tenant Context ==
/// Answers "who is the current tenant" for key scoping.
pub trait TenantContext: Send + Sync {
    /// True once the tenant identifier can be trusted.
    fn is_resolved(&self) -> bool;

    /// Opaque tenant identifier. Only meaningful when resolved.
    fn id(&self) -> String;

    /// Namespace mixed into every key (e.g. the site database name).
    fn namespace(&self) -> String;
}

// == Static Tenant ==
/// Fixed tenant context, resolved iff an id was given.
#[derive(Debug, Clone)]
pub struct StaticTenant {
    id: Option<String>,
    namespace: String,
}

impl StaticTenant {
    /// A tenant whose identity is known.
    pub fn resolved(id: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            namespace: namespace.into(),
        }
    }

    /// A tenant whose identity is not known yet.
    pub fn unresolved(namespace: impl Into<String>) -> Self {
        Self {
            id: None,
            namespace: namespace.into(),
        }
    }
}

impl TenantContext for StaticTenant {
    fn is_resolved(&self) -> bool {
        self.id.is_some()
    }

    fn id(&self) -> String {
        self.id.clone().unwrap_or_default()
    }

    fn namespace(&self) -> String {
        self.namespace.clone()
    }
}
