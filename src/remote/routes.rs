//! Reverse-proxy route table
//!
//! An ordered list of path rules consulted once per inbound request; the
//! first matching rule wins. Routes whose handlers broadcast events to the
//! local front end are marked [`Disposition::LocalHandle`]; forwarding them
//! would make the remote broadcast to its own (empty) front end, which is
//! useless.

use serde::Serialize;

use crate::LoraBridgeError;
use crate::Result;

/// Path pattern of a route rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePattern {
    /// Matches the path exactly, tolerating one trailing slash
    Exact(String),
    /// Matches any path starting with the prefix
    Prefix(String),
}

impl RoutePattern {
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact || path.trim_end_matches('/') == exact,
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// Locally handled gateway operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalAction {
    GetTriggerWords,
    UpdateLoraCode,
    UpdateNodeWidget,
    RegisterNodes,
}

/// What to do with a matched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Proxy to the remote instance
    Forward,
    /// Answer locally and broadcast the result as an event
    LocalHandle(LocalAction),
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteRule {
    pub pattern: RoutePattern,
    pub disposition: Disposition,
}

impl RouteRule {
    #[must_use]
    pub fn exact(path: impl Into<String>, disposition: Disposition) -> Self {
        Self {
            pattern: RoutePattern::Exact(path.into()),
            disposition,
        }
    }

    #[must_use]
    pub fn prefix(prefix: impl Into<String>, disposition: Disposition) -> Self {
        Self {
            pattern: RoutePattern::Prefix(prefix.into()),
            disposition,
        }
    }
}

/// Ordered, first-match-wins route table.
#[derive(Debug, Clone, Serialize)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    #[must_use]
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// The route table matching the LoRA manager deployment this gateway
    /// fronts: event-broadcasting API routes are handled locally, the rest
    /// of the manager's API, static assets and UI pages are forwarded.
    #[must_use]
    pub fn lora_manager_defaults() -> Self {
        Self::new(vec![
            RouteRule::exact(
                "/api/lm/loras/get_trigger_words",
                Disposition::LocalHandle(LocalAction::GetTriggerWords),
            ),
            RouteRule::exact(
                "/api/lm/update-lora-code",
                Disposition::LocalHandle(LocalAction::UpdateLoraCode),
            ),
            RouteRule::exact(
                "/api/lm/update-node-widget",
                Disposition::LocalHandle(LocalAction::UpdateNodeWidget),
            ),
            RouteRule::exact(
                "/api/lm/register-nodes",
                Disposition::LocalHandle(LocalAction::RegisterNodes),
            ),
            RouteRule::prefix("/api/lm/", Disposition::Forward),
            RouteRule::prefix("/loras_static/", Disposition::Forward),
            RouteRule::prefix("/locales/", Disposition::Forward),
            RouteRule::prefix("/example_images_static/", Disposition::Forward),
            RouteRule::exact("/loras", Disposition::Forward),
            RouteRule::exact("/checkpoints", Disposition::Forward),
            RouteRule::exact("/embeddings", Disposition::Forward),
            RouteRule::exact("/loras/recipes", Disposition::Forward),
            RouteRule::exact("/statistics", Disposition::Forward),
        ])
    }

    /// Find the first rule matching `path`.
    pub fn route(&self, path: &str) -> Result<&RouteRule> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .ok_or_else(|| LoraBridgeError::RouteNotFound(path.to_string()))
    }

    #[must_use]
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::lora_manager_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_handle_takes_precedence_over_forward_prefix() {
        let table = RouteTable::lora_manager_defaults();

        let rule = table.route("/api/lm/loras/get_trigger_words").unwrap();
        assert_eq!(
            rule.disposition,
            Disposition::LocalHandle(LocalAction::GetTriggerWords)
        );

        let rule = table.route("/api/lm/loras/list").unwrap();
        assert_eq!(rule.disposition, Disposition::Forward);
    }

    #[test]
    fn page_routes_tolerate_trailing_slash() {
        let table = RouteTable::lora_manager_defaults();
        assert!(table.route("/loras/").is_ok());
        assert!(table.route("/statistics").is_ok());
    }

    #[test]
    fn unmatched_path_is_route_not_found() {
        let table = RouteTable::lora_manager_defaults();
        let err = table.route("/api/prompt").unwrap_err();
        assert!(matches!(err, LoraBridgeError::RouteNotFound(_)));
    }

    #[test]
    fn first_match_wins_in_custom_tables() {
        let table = RouteTable::new(vec![
            RouteRule::prefix("/a/b/", Disposition::Forward),
            RouteRule::prefix(
                "/a/",
                Disposition::LocalHandle(LocalAction::RegisterNodes),
            ),
        ]);
        assert_eq!(table.route("/a/b/c").unwrap().disposition, Disposition::Forward);
        assert_eq!(
            table.route("/a/x").unwrap().disposition,
            Disposition::LocalHandle(LocalAction::RegisterNodes)
        );
    }

    #[test]
    fn static_asset_prefixes_forward() {
        let table = RouteTable::lora_manager_defaults();
        assert_eq!(
            table.route("/loras_static/js/widget.js").unwrap().disposition,
            Disposition::Forward
        );
        assert_eq!(
            table.route("/locales/en.json").unwrap().disposition,
            Disposition::Forward
        );
    }
}
