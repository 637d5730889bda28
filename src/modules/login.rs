use crate::store::Module;
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginState {
    pub username: Option<String>,
    pub token: Option<String>,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginMutation {
    LoggedIn {
        username: String,
        token: String,
        roles: Vec<String>,
    },
    LoggedOut,
}

impl LoginMutation {
    pub fn name(&self) -> &'static str {
        match self {
            LoginMutation::LoggedIn { .. } => "LOGGED_IN",
            LoginMutation::LoggedOut => "LOGGED_OUT",
        }
    }
}

impl LoginState {
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ROLE_ADMIN)
    }
}

impl Module for LoginState {
    const NAME: &'static str = "login";
    type Mutation = LoginMutation;

    fn apply(&mut self, mutation: &LoginMutation) {
        match mutation {
            LoginMutation::LoggedIn {
                username,
                token,
                roles,
            } => {
                self.username = Some(username.clone());
                self.token = Some(token.clone());
                self.roles = roles.clone();
            }
            LoginMutation::LoggedOut => *self = LoginState::default(),
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.token.is_some() != self.username.is_some() {
            return Err("token and username must be set together".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_and_logout() {
        let mut state = LoginState::default();
        state.apply(&LoginMutation::LoggedIn {
            username: "dealer".to_string(),
            token: "jwt".to_string(),
            roles: vec!["ROLE_USER".to_string(), ROLE_ADMIN.to_string()],
        });

        assert!(state.is_logged_in());
        assert!(state.is_admin());
        assert!(state.check().is_ok());

        state.apply(&LoginMutation::LoggedOut);
        assert_eq!(state, LoginState::default());
    }

    #[test]
    fn token_without_user_is_invalid() {
        let state = LoginState {
            token: Some("jwt".to_string()),
            ..LoginState::default()
        };
        assert!(state.check().is_err());
    }
}
