//! Substitution for the boilerplate CREATE templates.
//!
//! OpenKO-db templates are positional: each `%s` takes the next value in the
//! template's fixed argument order and `%%` is a literal percent sign.
//! Named placeholders (`{database}`, `{schema}`, `{user}`, `{login}`,
//! `{password}`) are accepted as well.

use crate::error::{KodbError, Result};

const POSITIONAL: &str = "%s";

/// Template files under `Templates/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    CreateDatabase,
    CreateSchema,
    CreateUser,
    CreateLogin,
}

impl Template {
    pub fn file_name(self) -> &'static str {
        match self {
            Template::CreateDatabase => "CreateDatabase.sqltemplate",
            Template::CreateSchema => "CreateSchema.sqltemplate",
            Template::CreateUser => "CreateUser.sqltemplate",
            Template::CreateLogin => "CreateLogin.sqltemplate",
        }
    }

    /// Values consumed by successive `%s` markers.
    ///
    /// - database: `(database)`
    /// - schema: `(schema, database)`
    /// - user: `(user, schema, database)`
    /// - login: `(login, database, password)`
    fn positional_args<'a>(self, vars: &TemplateVars<'a>) -> Vec<Option<&'a str>> {
        let database = Some(vars.database);
        match self {
            Template::CreateDatabase => vec![database],
            Template::CreateSchema => vec![vars.schema, database],
            Template::CreateUser => vec![vars.user, vars.schema, database],
            Template::CreateLogin => vec![vars.login, database, vars.password],
        }
    }

    /// Render `text` for this template.
    ///
    /// Fails when a `%s` has no value to take, rather than sending the
    /// marker to the server.
    pub fn render(self, text: &str, vars: &TemplateVars<'_>) -> Result<String> {
        let named = vars.apply(text);
        if !named.contains(POSITIONAL) {
            return Ok(named);
        }

        let args = self.positional_args(vars);
        let mut next = args.iter();
        let mut out = String::with_capacity(named.len());
        let mut rest = named.as_str();
        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with("%%") {
                out.push('%');
                rest = &tail[2..];
            } else if tail.starts_with(POSITIONAL) {
                let value = next.next().copied().flatten().ok_or_else(|| {
                    KodbError::Config(format!(
                        "{} has more %s markers than values ({})",
                        self.file_name(),
                        args.len()
                    ))
                })?;
                out.push_str(value);
                rest = &tail[2..];
            } else {
                out.push('%');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Values for one rendered template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub database: &'a str,
    pub schema: Option<&'a str>,
    pub user: Option<&'a str>,
    pub login: Option<&'a str>,
    pub password: Option<&'a str>,
}

impl<'a> TemplateVars<'a> {
    pub fn database(database: &'a str) -> Self {
        Self {
            database,
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: &'a str) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_user(mut self, user: &'a str) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_login(mut self, login: &'a str, password: &'a str) -> Self {
        self.login = Some(login);
        self.password = Some(password);
        self
    }

    /// Named placeholder replacement; values are not escaped and unset
    /// placeholders stay in the text.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.replace("{database}", self.database);
        let optional = [
            ("{schema}", self.schema),
            ("{user}", self.user),
            ("{login}", self.login),
            ("{password}", self.password),
        ];
        for (placeholder, value) in optional {
            if let Some(value) = value {
                out = out.replace(placeholder, value);
            }
        }
        out
    }
}
