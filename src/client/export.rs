/// Message of the modal password prompt.
pub const EXPORT_PROMPT: &str = "Enter a password to encrypt this note:";

/// A synchronous modal prompt. `None` means the user cancelled.
pub trait PasswordPrompt {
    fn ask(&self, message: &str) -> Option<String>;
}

/// The export form and its hidden password field.
pub trait ExportForm {
    fn set_password(&mut self, password: &str);
    fn submit(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Submitted,
    /// Prompt cancelled or answered with an empty string
    Abandoned,
}

/// Handles clicks on the export button.
pub struct ExportTrigger<P, F> {
    prompt: P,
    form: F,
}

impl<P: PasswordPrompt, F: ExportForm> ExportTrigger<P, F> {
    /// Binds the trigger. Without a form there is nothing to submit, so the
    /// feature stays inert.
    pub fn bind(prompt: P, form: Option<F>) -> Option<Self> {
        form.map(|form| Self { prompt, form })
    }

    pub fn on_click(&mut self) -> ExportOutcome {
        match self.prompt.ask(EXPORT_PROMPT) {
            Some(password) if !password.is_empty() => {
                self.form.set_password(&password);
                self.form.submit();
                ExportOutcome::Submitted
            }
            _ => ExportOutcome::Abandoned,
        }
    }

    pub fn form(&self) -> &F {
        &self.form
    }
}
