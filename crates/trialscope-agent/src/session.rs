//! Per-user session state and page routing.
//!
//! Each session starts on the login page. Transitions are a pure function
//! of the current session and an action, so the shell loop only renders
//! whatever page `navigate` returns.

use trialscope_ingestion::TrialDataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Login,
    Register,
    Trials,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub page: Page,
    /// Set once a login succeeds.
    pub user: Option<String>,
    /// Most recent fetch result for this session.
    pub dataset: Option<TrialDataset>,
}

impl Session {
    pub fn new() -> Self { Self::default() }

    pub fn is_logged_in(&self) -> bool { self.user.is_some() }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ShowRegister,
    ShowLogin,
    LoginSucceeded(String),
    LoginFailed,
    Registered,
    RegistrationFailed,
    DatasetLoaded(TrialDataset),
    Logout,
}

pub fn navigate(session: Session, action: Action) -> Session {
    match action {
        Action::ShowRegister if !session.is_logged_in() => Session { page: Page::Register, ..session },
        Action::ShowLogin if !session.is_logged_in() => Session { page: Page::Login, ..session },
        Action::LoginSucceeded(user) => Session { page: Page::Trials, user: Some(user), dataset: None },
        Action::LoginFailed if !session.is_logged_in() => Session { page: Page::Login, ..session },
        Action::Registered if !session.is_logged_in() => Session { page: Page::Login, ..session },
        Action::RegistrationFailed if !session.is_logged_in() => {
            Session { page: Page::Register, ..session }
        }
        Action::DatasetLoaded(dataset) if session.is_logged_in() => {
            Session { dataset: Some(dataset), ..session }
        }
        Action::Logout => Session::new(),
        // Login-page outcomes while logged in, datasets while logged out
        _ => session,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logged_in() -> Session {
        navigate(Session::new(), Action::LoginSucceeded("ada".into()))
    }

    #[test]
    fn test_new_session_starts_on_login() {
        let s = Session::new();
        assert_eq!(s.page, Page::Login);
        assert!(!s.is_logged_in());
        assert!(s.dataset.is_none());
    }

    #[test]
    fn test_register_round_trip() {
        let s = navigate(Session::new(), Action::ShowRegister);
        assert_eq!(s.page, Page::Register);
        let s = navigate(s, Action::RegistrationFailed);
        assert_eq!(s.page, Page::Register);
        let s = navigate(s, Action::Registered);
        assert_eq!(s.page, Page::Login);
        assert!(!s.is_logged_in());
    }

    #[test]
    fn test_login_success_and_failure() {
        let s = navigate(Session::new(), Action::LoginFailed);
        assert_eq!(s.page, Page::Login);
        assert!(s.user.is_none());

        let s = logged_in();
        assert_eq!(s.page, Page::Trials);
        assert_eq!(s.user.as_deref(), Some("ada"));
    }

    #[test]
    fn test_page_switch_ignored_while_logged_in() {
        let s = navigate(logged_in(), Action::ShowRegister);
        assert_eq!(s.page, Page::Trials);
    }

    #[test]
    fn test_login_page_outcomes_ignored_while_logged_in() {
        for action in [Action::LoginFailed, Action::Registered, Action::RegistrationFailed] {
            let s = navigate(logged_in(), action.clone());
            assert_eq!(s.page, Page::Trials, "{action:?} moved a logged-in session");
            assert_eq!(s.user.as_deref(), Some("ada"));

            // Still able to leave through the normal path
            let s = navigate(s, Action::Logout);
            assert_eq!(navigate(s, Action::ShowRegister).page, Page::Register);
        }
    }

    #[test]
    fn test_every_reachable_state_is_consistent() {
        let actions = [
            Action::ShowRegister,
            Action::ShowLogin,
            Action::LoginSucceeded("ada".into()),
            Action::LoginFailed,
            Action::Registered,
            Action::RegistrationFailed,
            Action::DatasetLoaded(TrialDataset::default()),
            Action::Logout,
        ];
        let starts = [Session::new(), navigate(Session::new(), Action::ShowRegister), logged_in()];
        for start in starts {
            for action in actions.iter().cloned() {
                let s = navigate(start.clone(), action);
                assert_eq!(s.is_logged_in(), s.page == Page::Trials, "inconsistent {s:?}");
            }
        }
    }

    #[test]
    fn test_dataset_requires_login() {
        let data = TrialDataset::new(vec!["Asthma".into()], Vec::new());
        let s = navigate(Session::new(), Action::DatasetLoaded(data.clone()));
        assert!(s.dataset.is_none());

        let s = navigate(logged_in(), Action::DatasetLoaded(data.clone()));
        assert_eq!(s.dataset, Some(data));
        assert_eq!(s.page, Page::Trials);
    }

    #[test]
    fn test_logout_clears_everything() {
        let data = TrialDataset::new(vec!["Asthma".into()], Vec::new());
        let s = navigate(logged_in(), Action::DatasetLoaded(data));
        let s = navigate(s, Action::Logout);
        assert_eq!(s, Session::new());
    }
}
