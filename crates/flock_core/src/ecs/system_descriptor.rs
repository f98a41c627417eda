use crate::ecs::{ComponentMask, ComponentQuery, QueryComparison};

/// How a system is matched, dispatched and ordered.
///
/// ```ignore
/// let boids = SystemDescriptor::new("boid_wall_avoid")
///     .all(boid)
///     .max_threads(8)
///     .order(300);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    query: ComponentQuery,
    max_threads: u32,
    order: i32,
}

impl SystemDescriptor {
    /// Create a descriptor for a global (`QueryComparison::None`) pass that
    /// runs inline at order 0.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: ComponentQuery::none(),
            max_threads: 0,
            order: 0,
        }
    }

    /// Replace the query.
    pub fn query(mut self, query: ComponentQuery) -> Self {
        self.query = query;
        self
    }

    /// Match entities with every component in `mask`.
    pub fn all(self, mask: ComponentMask) -> Self {
        self.query(ComponentQuery::all(mask))
    }

    /// Match entities with at least one component in `mask`.
    pub fn any(self, mask: ComponentMask) -> Self {
        self.query(ComponentQuery::any(mask))
    }

    /// Upper bound on concurrent chunks; `0` runs on the scheduling thread.
    pub fn max_threads(mut self, max_threads: u32) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Execution-order key. Lower runs first.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Unique system name; doubles as the system's identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component_query(&self) -> &ComponentQuery {
        &self.query
    }

    pub fn comparison(&self) -> QueryComparison {
        self.query.comparison
    }

    pub fn thread_limit(&self) -> u32 {
        self.max_threads
    }

    pub fn execution_order(&self) -> i32 {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_an_inline_global_pass() {
        let descriptor = SystemDescriptor::new("clear");
        assert_eq!(descriptor.comparison(), QueryComparison::None);
        assert_eq!(descriptor.thread_limit(), 0);
        assert_eq!(descriptor.execution_order(), 0);
    }

    #[test]
    fn builder_sets_every_field() {
        let mask = ComponentMask::bit(3);
        let descriptor = SystemDescriptor::new("cohesion")
            .all(mask)
            .max_threads(8)
            .order(400);
        assert_eq!(descriptor.name(), "cohesion");
        assert_eq!(descriptor.component_query(), &ComponentQuery::all(mask));
        assert_eq!(descriptor.thread_limit(), 8);
        assert_eq!(descriptor.execution_order(), 400);
    }
}
