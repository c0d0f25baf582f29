//! Application form definition: body, mail templates and messages.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::form_tag::{FormTag, scan_form_tags};

/// One mail template (`mail` or the optional secondary `mail_2`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailTemplate {
    /// Only meaningful for secondary templates, which are ignored unless active.
    pub active: bool,
    pub subject: String,
    pub sender: String,
    pub recipient: String,
    pub additional_headers: String,
    pub body: String,
}

impl MailTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    pub fn additional_headers(mut self, headers: impl Into<String>) -> Self {
        self.additional_headers = headers.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// A form as stored by the site: the tagged body plus its mail settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationForm {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Form body containing `[type name ...]` tags.
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub mail: Option<MailTemplate>,
    #[serde(default)]
    pub mail_2: Option<MailTemplate>,
    /// User-facing messages keyed by purpose (`mail_sent_ok`, ...).
    #[serde(default)]
    pub messages: IndexMap<String, String>,
}

impl ApplicationForm {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            form: String::new(),
            mail: None,
            mail_2: None,
            messages: IndexMap::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn form(mut self, body: impl Into<String>) -> Self {
        self.form = body.into();
        self
    }

    pub fn mail(mut self, template: MailTemplate) -> Self {
        self.mail = Some(template);
        self
    }

    pub fn mail_2(mut self, template: MailTemplate) -> Self {
        self.mail_2 = Some(template);
        self
    }

    pub fn message(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(key.into(), text.into());
        self
    }

    /// Parse a form definition from JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Look up a mail template by property name.
    pub fn mail_template(&self, template: &str) -> Option<&MailTemplate> {
        match template {
            "mail" => self.mail.as_ref(),
            "mail_2" => self.mail_2.as_ref(),
            _ => None,
        }
    }

    /// Every tag of the form body.
    pub fn scan_form_tags(&self) -> Vec<FormTag> {
        scan_form_tags(&self.form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_json_with_defaults() {
        let form = ApplicationForm::from_json(
            r#"{
                "id": "42",
                "form": "[text* your-name]",
                "mail": { "subject": "Hi", "recipient": "a@example.com" },
                "messages": { "mail_sent_ok": "Thanks" }
            }"#,
        )
        .unwrap();

        assert_eq!(form.id, "42");
        assert_eq!(form.title, "");
        let mail = form.mail_template("mail").unwrap();
        assert_eq!(mail.subject, "Hi");
        assert_eq!(mail.body, "");
        assert!(form.mail_template("mail_2").is_none());
        assert_eq!(form.messages["mail_sent_ok"], "Thanks");
    }

    #[test]
    fn scans_body_tags() {
        let form = ApplicationForm::new("1")
            .form(r#"[text* your-name] [email* your-email] [select menu "A"]"#);

        let types: Vec<_> = form.scan_form_tags().into_iter().map(|t| t.basetype).collect();
        assert_eq!(types, vec!["text", "email", "select"]);
    }

    #[test]
    fn unknown_template_names() {
        let form = ApplicationForm::new("1").mail(MailTemplate::new().subject("x"));
        assert!(form.mail_template("mail_3").is_none());
    }
}
