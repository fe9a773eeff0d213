use crate::types::{Diagnostics, Dynamic};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub state: Dynamic,
    pub plan: Dynamic,
    pub config: Dynamic,
    pub attribute_path: String,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

/// Adjusts the planned value of a single attribute
///
/// Modifiers run during PlanResourceChange after defaults are applied and
/// computed attributes are marked unknown. They can:
/// - rewrite the planned value
/// - flag the attribute as forcing replacement
/// - add warnings or errors to the plan
pub trait PlanModifier: Send + Sync {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplaceIfChanged;

impl PlanModifier for RequiresReplaceIfChanged {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = !matches!(
            (&request.state, &request.plan),
            (Dynamic::Null, Dynamic::Null) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && !values_equal(&request.state, &request.plan);

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Keeps the prior state value for a computed attribute that would otherwise
/// be planned as unknown, e.g. an ARN or id that never changes after create
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match (&request.plan, &request.state) {
            (Dynamic::Unknown, Dynamic::Null) => request.plan,
            (Dynamic::Unknown, state) => state.clone(),
            _ => request.plan,
        };

        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    pub fn new(predicate: F, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let mut diagnostics = Diagnostics::new();
        let requires_replace = (self.predicate)(&request);

        if requires_replace {
            diagnostics.add_warning(
                format!(
                    "Attribute '{}' requires resource replacement",
                    request.attribute_path
                ),
                Some(&self.description),
            );
        }

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics,
        }
    }
}

fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifyRequest {
        PlanModifyRequest {
            config: plan.clone(),
            state,
            plan,
            attribute_path: "domain_identifier".to_string(),
        }
    }

    #[test]
    fn requires_replace_if_changed_does_not_trigger_on_same_value() {
        let response = RequiresReplaceIfChanged.modify_plan(request(
            Dynamic::from("dzd_abc123"),
            Dynamic::from("dzd_abc123"),
        ));

        assert!(!response.requires_replace);
        assert_eq!(response.diagnostics.errors.len(), 0);
    }

    #[test]
    fn requires_replace_if_changed_triggers_on_different_value() {
        let response = RequiresReplaceIfChanged.modify_plan(request(
            Dynamic::from("dzd_abc123"),
            Dynamic::from("dzd_def456"),
        ));

        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_null_to_null() {
        let response = RequiresReplaceIfChanged.modify_plan(request(Dynamic::Null, Dynamic::Null));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_unknown_values() {
        let response =
            RequiresReplaceIfChanged.modify_plan(request(Dynamic::Unknown, Dynamic::from("x")));
        assert!(!response.requires_replace);

        let response =
            RequiresReplaceIfChanged.modify_plan(request(Dynamic::from("x"), Dynamic::Unknown));
        assert!(!response.requires_replace);
    }

    #[test]
    fn values_equal_handles_nested_values() {
        assert!(values_equal(&Dynamic::Number(42.0), &Dynamic::Number(42.0)));
        assert!(!values_equal(&Dynamic::Bool(true), &Dynamic::Bool(false)));

        let tags = |v: &str| {
            Dynamic::Map(HashMap::from([("Environment".to_string(), Dynamic::from(v))]))
        };
        assert!(values_equal(&tags("prod"), &tags("prod")));
        assert!(!values_equal(&tags("prod"), &tags("dev")));

        let terms = Dynamic::List(vec![Dynamic::from("a"), Dynamic::from("b")]);
        assert!(!values_equal(&terms, &Dynamic::List(vec![Dynamic::from("a")])));
    }

    #[test]
    fn use_state_for_unknown_preserves_state_when_unknown() {
        let response = UseStateForUnknown.modify_plan(request(
            Dynamic::from("arn:aws:athena:us-west-2:123456789012:workgroup/primary"),
            Dynamic::Unknown,
        ));

        assert_eq!(
            response.plan_value.as_str(),
            Some("arn:aws:athena:us-west-2:123456789012:workgroup/primary")
        );
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_stays_unknown_on_create() {
        let response = UseStateForUnknown.modify_plan(request(Dynamic::Null, Dynamic::Unknown));
        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn use_state_for_unknown_uses_plan_when_known() {
        let response =
            UseStateForUnknown.modify_plan(request(Dynamic::from("old"), Dynamic::from("new")));
        assert_eq!(response.plan_value.as_str(), Some("new"));
    }

    #[test]
    fn requires_replace_if_triggers_on_condition() {
        let modifier = RequiresReplaceIf::new(
            |req| {
                matches!((&req.state, &req.plan),
                    (Dynamic::String(old), Dynamic::String(new)) if !old.is_empty() && new.is_empty()
                )
            },
            "Clearing the value forces a new resource",
        );

        let response = modifier.modify_plan(request(Dynamic::from("has-value"), Dynamic::from("")));
        assert!(response.requires_replace);
        assert_eq!(response.diagnostics.warnings.len(), 1);

        let response = modifier.modify_plan(request(Dynamic::from(""), Dynamic::from("new")));
        assert!(!response.requires_replace);
        assert_eq!(response.diagnostics.warnings.len(), 0);
    }
}
