use serde::{Deserialize, Serialize};

use super::{Profile, Reducer};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminState {
    pub is_authenticated: bool,
    pub loading: bool,
    pub admin: Option<Profile>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum AdminAction {
    LoadRequest,
    LoadSuccess(Profile),
    LoadFail(String),
    ClearErrors,
}

impl Reducer for AdminState {
    type Action = AdminAction;

    fn reduce(self, action: AdminAction) -> Self {
        match action {
            AdminAction::LoadRequest => Self {
                loading: true,
                ..self
            },
            AdminAction::LoadSuccess(admin) => Self {
                is_authenticated: true,
                loading: false,
                admin: Some(admin),
                error: None,
            },
            AdminAction::LoadFail(error) => Self {
                is_authenticated: false,
                loading: false,
                admin: None,
                error: Some(error),
            },
            AdminAction::ClearErrors => Self {
                error: None,
                ..self
            },
        }
    }
}
