//! Template substitution: replaces `{{key}}` tokens in a template body.

use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use regex::{Captures, Regex};
use serde::Serialize;

use crate::placeholder::{PlaceholderKey, ReplacementData};

static TOKEN: OnceLock<Regex> = OnceLock::new();

fn token_regex() -> &'static Regex {
    TOKEN.get_or_init(|| Regex::new(r"\{\{([^}]*)\}\}").expect("placeholder pattern is valid"))
}

/// Substitute every placeholder in `template`, dating `date.*` keys today.
pub fn substitute(template: &str, data: &ReplacementData<'_>) -> String {
    substitute_on(template, data, Local::now().date_naive())
}

/// Substitute every placeholder in `template` using `today` for `date.*` keys.
///
/// One left-to-right pass: resolved values are never scanned again, and a
/// token whose key does not resolve is kept verbatim, braces included.
pub fn substitute_on(template: &str, data: &ReplacementData<'_>, today: NaiveDate) -> String {
    token_regex()
        .replace_all(template, |caps: &Captures<'_>| {
            let key = caps[1].trim();
            match PlaceholderKey::parse(key).and_then(|k| k.resolve(data, today)) {
                Some(value) => value,
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// A placeholder token found in a template body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderUse {
    /// Token text as written, braces included
    pub token: String,
    /// Trimmed key
    pub key: String,
    pub recognized: bool,
    /// Byte offset of the token in the template
    pub offset: usize,
}

/// List every placeholder token in `template`, in order of appearance.
pub fn scan_placeholders(template: &str) -> Vec<PlaceholderUse> {
    token_regex()
        .captures_iter(template)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps[1].trim().to_string();
            Some(PlaceholderUse {
                token: whole.as_str().to_string(),
                recognized: PlaceholderKey::parse(&key).is_some(),
                key,
                offset: whole.start(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::fixtures;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_known_key() {
        let client = fixtures::client();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);
        assert_eq!(substitute_on("{{client.name}}", &data, today()), "Ana Silva");
    }

    #[test]
    fn test_unknown_key_is_preserved() {
        let client = fixtures::client();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);
        assert_eq!(
            substitute_on("Hello {{unknown.key}}", &data, today()),
            "Hello {{unknown.key}}"
        );
    }

    #[test]
    fn test_key_is_trimmed() {
        let client = fixtures::client();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);
        assert_eq!(
            substitute_on("<p>{{ property.zipCode }}</p>", &data, today()),
            "<p>30130-000</p>"
        );
    }

    #[test]
    fn test_missing_notary_office_is_empty() {
        let client = fixtures::client();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);
        assert_eq!(substitute_on("{{notaryOffice.name}}", &data, today()), "");
    }

    #[test]
    fn test_empty_field_keeps_token() {
        let client = crate::entity::Client::new("Carla");
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);
        assert_eq!(
            substitute_on("E-mail: {{client.email}}", &data, today()),
            "E-mail: {{client.email}}"
        );
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut client = fixtures::client();
        client.name = "{{client.cpf}}".to_string();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);
        assert_eq!(
            substitute_on("Nome: {{client.name}}", &data, today()),
            "Nome: {{client.cpf}}"
        );
    }

    #[test]
    fn test_substitution_is_idempotent() {
        let client = fixtures::client();
        let property = fixtures::property();
        let office = fixtures::notary_office();
        let data = ReplacementData::new(&client, &property, Some(&office));
        let template = "<p>{{client.name}}, CPF {{client.cpf}}, residente em {{property.address}}, \
                        {{property.city}}/{{property.state}}. {{foo.bar}} {{date.currentExtended}}</p>";
        let once = substitute_on(template, &data, today());
        let twice = substitute_on(&once, &data, today());
        assert_eq!(once, twice);
        assert!(once.contains("{{foo.bar}}"));
        assert!(once.contains("18 de outubro de 2026"));
    }

    #[test]
    fn test_template_is_not_mutated() {
        let client = fixtures::client();
        let property = fixtures::property();
        let data = ReplacementData::new(&client, &property, None);
        let template = String::from("{{client.name}}");
        let result = substitute_on(&template, &data, today());
        assert_eq!(template, "{{client.name}}");
        assert_eq!(result, "Ana Silva");
    }

    #[test]
    fn test_scan_placeholders() {
        let uses = scan_placeholders("A {{client.name}} B {{ nope.x }} C {{}}");
        assert_eq!(uses.len(), 3);
        assert_eq!(uses[0].key, "client.name");
        assert!(uses[0].recognized);
        assert_eq!(uses[0].offset, 2);
        assert_eq!(uses[1].key, "nope.x");
        assert_eq!(uses[1].token, "{{ nope.x }}");
        assert!(!uses[1].recognized);
        assert_eq!(uses[2].key, "");
        assert!(!uses[2].recognized);
    }
}
