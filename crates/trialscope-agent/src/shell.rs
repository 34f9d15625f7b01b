//! Interactive login / register / trials loop.

use std::path::Path;
use std::time::Duration;

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info};
use trialscope_ingestion::export::export_csv;
use trialscope_ingestion::pipeline::{run_pipeline, FetchNotifier, PipelineResult};
use trialscope_ingestion::sources::clinicaltrials::ClinicalTrialsClient;
use trialscope_ingestion::sources::ConditionSource;
use trialscope_ingestion::{StudyFilter, TrialDataset};
use trialscope_llm::query::DatasetQueryService;
use trialscope_security::CredentialStore;

use crate::config::Config;
use crate::display::{render_table, summary_line, ConsoleNotifier};
use crate::session::{navigate, Action, Page, Session};

pub struct Shell<'a> {
    pub config: &'a Config,
    pub source: &'a ClinicalTrialsClient,
    pub store: &'a dyn CredentialStore,
    pub query: &'a DatasetQueryService,
}

enum Step {
    Continue(Session),
    Quit,
}

impl Shell<'_> {
    pub async fn run(&self) -> anyhow::Result<()> {
        let theme = ColorfulTheme::default();
        let mut session = Session::new();
        loop {
            let step = match session.page {
                Page::Login => self.login_page(&theme, session).await?,
                Page::Register => self.register_page(&theme, session).await?,
                Page::Trials => self.trials_page(&theme, session).await?,
            };
            match step {
                Step::Continue(next) => session = next,
                Step::Quit => return Ok(()),
            }
        }
    }

    async fn login_page(&self, theme: &ColorfulTheme, session: Session) -> anyhow::Result<Step> {
        println!("\n{}", style("Login").bold());
        let choice = Select::with_theme(theme)
            .items(&["Login", "Register", "Quit"])
            .default(0)
            .interact()?;
        match choice {
            0 => {}
            1 => return Ok(Step::Continue(navigate(session, Action::ShowRegister))),
            _ => return Ok(Step::Quit),
        }

        let username: String = Input::with_theme(theme).with_prompt("Username").interact_text()?;
        let password = SecretString::from(Password::with_theme(theme).with_prompt("Password").interact()?);

        let action = match self.store.verify(username.trim(), password.expose_secret()).await {
            Ok(true) => {
                println!("{}", style("Login successful!").green());
                Action::LoginSucceeded(username.trim().to_string())
            }
            Ok(false) => {
                println!("{}", style("Invalid username or password.").red());
                Action::LoginFailed
            }
            Err(e) => {
                error!("Login failed: {e}");
                println!("{}", style("Login failed. Please try again later.").red());
                Action::LoginFailed
            }
        };
        Ok(Step::Continue(navigate(session, action)))
    }

    async fn register_page(&self, theme: &ColorfulTheme, session: Session) -> anyhow::Result<Step> {
        println!("\n{}", style("Register").bold());
        let choice = Select::with_theme(theme)
            .items(&["Register", "Back to login"])
            .default(0)
            .interact()?;
        if choice == 1 {
            return Ok(Step::Continue(navigate(session, Action::ShowLogin)));
        }

        let action = match register_prompt(theme, self.store, None).await? {
            true => Action::Registered,
            false => Action::RegistrationFailed,
        };
        Ok(Step::Continue(navigate(session, action)))
    }

    async fn trials_page(&self, theme: &ColorfulTheme, session: Session) -> anyhow::Result<Step> {
        let user = session.user.clone().unwrap_or_default();
        println!("\n{} {}", style("Clinical Trials").bold(), style(format!("({user})")).dim());

        let mut items = vec!["Fetch trials", "View dataset", "Ask a question"];
        if self.config.export.enabled {
            items.push("Export CSV");
        }
        items.push("Logout");

        let choice = Select::with_theme(theme).items(&items).default(0).interact()?;
        match items[choice] {
            "Fetch trials" => {
                let Some(dataset) = self.fetch(theme).await? else {
                    return Ok(Step::Continue(session));
                };
                Ok(Step::Continue(navigate(session, Action::DatasetLoaded(dataset))))
            }
            "View dataset" => {
                if let Some(dataset) = loaded(&session) {
                    let filter = StudyFilter::ALL[Select::with_theme(theme)
                        .with_prompt("Show")
                        .items(&StudyFilter::ALL)
                        .default(0)
                        .interact()?];
                    let rows = dataset.filter(filter);
                    println!("{} ({} rows)", style(filter).bold(), rows.len());
                    print!("{}", render_table(&rows));
                }
                Ok(Step::Continue(session))
            }
            "Ask a question" => {
                if let Some(dataset) = loaded(&session) {
                    self.ask(theme, &user, dataset).await?;
                }
                Ok(Step::Continue(session))
            }
            "Export CSV" => {
                if let Some(dataset) = loaded(&session) {
                    export(dataset, &self.config.export.directory);
                }
                Ok(Step::Continue(session))
            }
            _ => {
                info!(user = %user, "Logged out");
                Ok(Step::Continue(navigate(session, Action::Logout)))
            }
        }
    }

    async fn fetch(&self, theme: &ColorfulTheme) -> anyhow::Result<Option<TrialDataset>> {
        let presets = &self.config.conditions.presets;
        let picked = MultiSelect::with_theme(theme)
            .with_prompt("Select conditions (space to toggle)")
            .items(&presets[..])
            .interact()?;
        let extra: String = Input::with_theme(theme)
            .with_prompt("Other conditions (comma separated)")
            .allow_empty(true)
            .interact_text()?;

        let conditions = chosen_conditions(presets, &picked, &extra);
        if conditions.is_empty() {
            println!("{}", style("Please select at least one condition.").yellow());
            return Ok(None);
        }

        let spinner = spinner("Fetching trials...")?;
        let result = run_pipeline(self.source, &conditions, &ConsoleNotifier).await;
        spinner.finish_and_clear();

        println!("{}", style(summary_line(&result.dataset)).green());
        Ok(Some(result.dataset))
    }

    async fn ask(&self, theme: &ColorfulTheme, user: &str, dataset: &TrialDataset) -> anyhow::Result<()> {
        let question: String = Input::with_theme(theme)
            .with_prompt("Question")
            .allow_empty(true)
            .interact_text()?;

        let spinner = spinner("Thinking...")?;
        let answer = self.query.answer_for(Some(user), &question, dataset).await;
        spinner.finish_and_clear();

        match answer {
            Ok(text) => println!("{text}"),
            Err(e) => println!("{}", style(format!("Could not answer: {e}")).red()),
        }
        Ok(())
    }
}

/// Prompt for a new account and register it. Returns whether it was created.
pub async fn register_prompt(
    theme: &ColorfulTheme,
    store: &dyn CredentialStore,
    username: Option<String>,
) -> anyhow::Result<bool> {
    let username = match username {
        Some(name) => name,
        None => Input::with_theme(theme).with_prompt("Username").interact_text()?,
    };
    let password = SecretString::from(
        Password::with_theme(theme)
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    );

    match store.register(username.trim(), password.expose_secret()).await {
        Ok(true) => {
            println!("{}", style("Registration successful! Please log in.").green());
            Ok(true)
        }
        Ok(false) => {
            println!("{}", style("Username already exists or is invalid.").red());
            Ok(false)
        }
        Err(e) => {
            error!("Registration failed: {e}");
            println!("{}", style("Registration failed. Please try again later.").red());
            Ok(false)
        }
    }
}

/// Log `username` in, then run the pipeline. Nothing is requested from
/// `source` unless the credentials verify.
pub async fn fetch_as<S>(
    store: &dyn CredentialStore,
    source: &S,
    username: &str,
    password: &SecretString,
    conditions: &[String],
    notifier: &dyn FetchNotifier,
) -> anyhow::Result<PipelineResult>
where
    S: ConditionSource + ?Sized,
{
    let username = username.trim();
    match store.verify(username, password.expose_secret()).await {
        Ok(true) => info!(user = %username, "Logged in"),
        Ok(false) => anyhow::bail!("Invalid username or password."),
        Err(e) => {
            error!("Login failed: {e}");
            anyhow::bail!("Login failed: {e}");
        }
    }
    Ok(run_pipeline(source, conditions, notifier).await)
}

/// Selected presets in list order, then free-text entries.
pub fn chosen_conditions(presets: &[String], picked: &[usize], extra: &str) -> Vec<String> {
    let mut picked = picked.to_vec();
    picked.sort_unstable();
    picked
        .into_iter()
        .filter_map(|i| presets.get(i).cloned())
        .chain(
            extra
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
        )
        .collect()
}

pub fn export(dataset: &TrialDataset, dir: impl AsRef<Path>) {
    match export_csv(dataset, dir) {
        Ok(path) => println!("{} {}", style("Saved").green(), path.display()),
        Err(e) => println!("{}", style(format!("Export failed: {e}")).red()),
    }
}

fn loaded(session: &Session) -> Option<&TrialDataset> {
    if session.dataset.is_none() {
        println!("{}", style("Fetch trials first.").yellow());
    }
    session.dataset.as_ref()
}

pub fn spinner(message: &'static str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use trialscope_ingestion::sources::{ConditionFetch, FetchOutcome};
    use trialscope_security::SecurityError;

    enum Verdict {
        Accept,
        Reject,
        Unreachable,
    }

    struct StubStore(Verdict);

    #[async_trait]
    impl CredentialStore for StubStore {
        async fn verify(&self, username: &str, secret: &str) -> trialscope_security::error::Result<bool> {
            match self.0 {
                Verdict::Accept => Ok(username == "ada" && secret == "s3cret"),
                Verdict::Reject => Ok(false),
                Verdict::Unreachable => Err(SecurityError::Hashing("database down".into())),
            }
        }

        async fn register(&self, _: &str, _: &str) -> trialscope_security::error::Result<bool> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ConditionSource for CountingSource {
        async fn fetch_condition(&self, condition: &str) -> ConditionFetch {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ConditionFetch::new(condition, FetchOutcome::Success(vec![]))
        }
    }

    struct Quiet;

    impl FetchNotifier for Quiet {
        fn condition_failed(&self, _: &ConditionFetch) {}
    }

    fn two_conditions() -> Vec<String> {
        vec!["Asthma".to_string(), "Diabetes".to_string()]
    }

    #[tokio::test]
    async fn test_rejected_login_never_reaches_registry() {
        let source = CountingSource::default();
        let password = SecretString::from("wrong".to_string());
        let err = fetch_as(&StubStore(Verdict::Reject), &source, "ada", &password, &two_conditions(), &Quiet)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid username or password.");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_error_never_reaches_registry() {
        let source = CountingSource::default();
        let password = SecretString::from("s3cret".to_string());
        let err = fetch_as(&StubStore(Verdict::Unreachable), &source, "ada", &password, &two_conditions(), &Quiet)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Login failed:"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_verified_login_fetches_each_condition() {
        let source = CountingSource::default();
        let password = SecretString::from("s3cret".to_string());
        let result = fetch_as(&StubStore(Verdict::Accept), &source, " ada ", &password, &two_conditions(), &Quiet)
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.dataset.conditions, two_conditions());
        assert_eq!(result.failed_conditions(), 0);
    }

    fn presets() -> Vec<String> {
        ["Diabetes", "Asthma", "COVID-19"].into_iter().map(String::from).collect()
    }

    #[test]
    fn test_chosen_conditions_keep_preset_order() {
        let c = chosen_conditions(&presets(), &[2, 0], "");
        assert_eq!(c, vec!["Diabetes".to_string(), "COVID-19".to_string()]);
    }

    #[test]
    fn test_chosen_conditions_append_free_text() {
        let c = chosen_conditions(&presets(), &[1], " Migraine , ,Lupus");
        assert_eq!(c, vec!["Asthma".to_string(), "Migraine".to_string(), "Lupus".to_string()]);
    }

    #[test]
    fn test_chosen_conditions_can_be_empty() {
        assert!(chosen_conditions(&presets(), &[], "  ").is_empty());
    }

    #[test]
    fn test_export_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let data = TrialDataset::new(vec!["Asthma".into()], Vec::new());
        export(&data, dir.path());
        assert!(dir.path().join("Asthma_clinical_trials_data.csv").exists());
    }
}
