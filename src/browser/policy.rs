use std::collections::HashSet;

/// Category of a sub-resource requested while a page renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Font,
    Stylesheet,
    Script,
    Document,
    Xhr,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Allow,
    Abort,
}

/// Per-request allow/abort policy installed on a browser session before any
/// page opens. Aborting decorative resources (images, fonts, styles, scripts)
/// cuts page-load latency without affecting price extraction.
#[derive(Debug, Clone)]
pub struct ResourceFilterPolicy {
    blocked: HashSet<ResourceKind>,
}

impl ResourceFilterPolicy {
    pub fn new(blocked: HashSet<ResourceKind>) -> Self {
        Self { blocked }
    }

    pub fn decide(&self, kind: ResourceKind) -> FilterDecision {
        if self.blocked.contains(&kind) {
            FilterDecision::Abort
        } else {
            FilterDecision::Allow
        }
    }

    pub fn blocked_kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.blocked.iter().copied()
    }
}

impl Default for ResourceFilterPolicy {
    fn default() -> Self {
        Self::new(HashSet::from([
            ResourceKind::Image,
            ResourceKind::Font,
            ResourceKind::Stylesheet,
            ResourceKind::Script,
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_aborts_decorative_resources() {
        let policy = ResourceFilterPolicy::default();
        for kind in [
            ResourceKind::Image,
            ResourceKind::Font,
            ResourceKind::Stylesheet,
            ResourceKind::Script,
        ] {
            assert_eq!(policy.decide(kind), FilterDecision::Abort, "{kind:?}");
        }
    }

    #[test]
    fn default_policy_allows_everything_else() {
        let policy = ResourceFilterPolicy::default();
        for kind in [ResourceKind::Document, ResourceKind::Xhr, ResourceKind::Other] {
            assert_eq!(policy.decide(kind), FilterDecision::Allow, "{kind:?}");
        }
    }

    #[test]
    fn decisions_are_stable_across_calls() {
        let policy = ResourceFilterPolicy::default();
        assert_eq!(policy.decide(ResourceKind::Image), FilterDecision::Abort);
        assert_eq!(policy.decide(ResourceKind::Image), FilterDecision::Abort);
        assert_eq!(policy.decide(ResourceKind::Document), FilterDecision::Allow);
    }

    #[test]
    fn custom_blocked_set_is_honored() {
        let policy = ResourceFilterPolicy::new(HashSet::from([ResourceKind::Xhr]));
        assert_eq!(policy.decide(ResourceKind::Xhr), FilterDecision::Abort);
        assert_eq!(policy.decide(ResourceKind::Image), FilterDecision::Allow);
    }
}
