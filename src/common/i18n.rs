// src/common/i18n.rs

use std::collections::HashMap;

use anyhow::Context;

pub const DEFAULT_LANG: &str = "fr";

// Catálogos embutidos no binário
const CATALOGS: [(&str, &str); 2] = [
    ("fr", include_str!("../../locales/fr.json")),
    ("en", include_str!("../../locales/en.json")),
];

/// Mensagens por idioma: lang -> (chave -> texto).
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .with_context(|| format!("catálogo de mensagens '{lang}' inválido"))?;
            catalogs.insert(lang.to_string(), messages);
        }
        Ok(Self { catalogs })
    }

    /// Idioma pedido, depois o padrão, depois a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        [lang, DEFAULT_LANG]
            .iter()
            .find_map(|l| self.catalogs.get(*l).and_then(|c| c.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Igual a `translate`, substituindo `{nome}` pelos argumentos.
    pub fn translate_with(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        args.iter().fold(self.translate(lang, key), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_share_the_same_keys() {
        let store = I18nStore::load().unwrap();
        let fr = &store.catalogs["fr"];
        let en = &store.catalogs["en"];
        let mut missing: Vec<&String> = fr.keys().filter(|k| !en.contains_key(*k)).collect();
        missing.extend(en.keys().filter(|k| !fr.contains_key(*k)));
        assert!(missing.is_empty(), "chaves ausentes: {missing:?}");
    }

    #[test]
    fn unknown_language_falls_back_to_french() {
        let store = I18nStore::load().unwrap();
        assert_eq!(store.translate("de", "errors.forbidden"), store.translate("fr", "errors.forbidden"));
    }

    #[test]
    fn unknown_key_is_returned_as_is() {
        let store = I18nStore::load().unwrap();
        assert_eq!(store.translate("fr", "nope.nothing"), "nope.nothing");
    }

    #[test]
    fn placeholders_are_replaced() {
        let store = I18nStore::load().unwrap();
        let text = store.translate_with("en", "booking.already_reserved", &[("product", "Room 12")]);
        assert!(text.contains("Room 12"));
        assert!(!text.contains("{product}"));
    }
}
