use crate::context::Context;
use crate::types::{AttributePath, Config, Diagnostics, State};

#[derive(Clone)]
pub struct ConfigureRequest {
    pub context: Context,
    pub terraform_version: String,
    pub config: Config,
}

#[derive(Clone)]
pub struct ConfigureResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct CreateRequest {
    pub context: Context,
    pub config: Config,
    pub planned_state: State,
}

#[derive(Clone)]
pub struct CreateResponse {
    pub state: State,
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct ReadRequest {
    pub context: Context,
    pub current_state: State,
}

#[derive(Clone)]
pub struct ReadResponse {
    pub state: Option<State>,
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct UpdateRequest {
    pub context: Context,
    pub config: Config,
    pub planned_state: State,
    pub current_state: State,
}

#[derive(Clone)]
pub struct UpdateResponse {
    pub state: State,
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct DeleteRequest {
    pub context: Context,
    pub current_state: State,
}

#[derive(Clone)]
pub struct DeleteResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct ImportStateRequest {
    pub context: Context,
    pub id: String,
}

#[derive(Clone)]
pub struct ImportStateResponse {
    pub state: Option<State>,
    pub diagnostics: Diagnostics,
}

/// Plan for a create or update; `prior_state` is `None` on create.
#[derive(Clone)]
pub struct ModifyPlanRequest {
    pub context: Context,
    pub config: Config,
    pub prior_state: Option<State>,
    pub planned_state: State,
}

#[derive(Clone)]
pub struct ModifyPlanResponse {
    pub planned_state: State,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dynamic;

    #[test]
    fn read_request_contains_current_state() {
        let mut current_state = State::new();
        current_state.set("id", "dzd_abc123");

        let req = ReadRequest {
            context: Context::new(),
            current_state,
        };

        assert_eq!(req.current_state.values.len(), 1);
        assert_eq!(
            req.current_state
                .values
                .get("id")
                .and_then(|v| v.as_string()),
            Some(&"dzd_abc123".to_string())
        );
    }

    #[test]
    fn modify_plan_request_marks_create_with_missing_prior_state() {
        let mut planned_state = State::new();
        planned_state.set("tags_all", Dynamic::Unknown);

        let req = ModifyPlanRequest {
            context: Context::new(),
            config: Config::new(),
            prior_state: None,
            planned_state,
        };

        assert!(req.prior_state.is_none());
        assert!(req.planned_state.get("tags_all").is_some_and(Dynamic::is_unknown));
    }
}
