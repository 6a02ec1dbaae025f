//! Validation message tables.
//!
//! Every language has a complete, typed table; unknown language codes fall
//! back to English once, at lookup time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::French => "fr",
        }
    }

    /// Parse a code like `es` or `fr-CA`; anything else is English.
    pub fn from_code(code: &str) -> Self {
        let primary = code.split(['-', '_']).next().unwrap_or("").to_ascii_lowercase();
        match primary.as_str() {
            "es" => Language::Spanish,
            "fr" => Language::French,
            _ => Language::English,
        }
    }
}

/// Message templates. `{min}` and `{max}` are substituted by the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessages {
    pub required: &'static str,
    pub too_short: &'static str,
    pub too_long: &'static str,
    pub invalid_email: &'static str,
    pub invalid_nickname: &'static str,
    pub weak_password: &'static str,
    pub email_taken: &'static str,
    pub nickname_taken: &'static str,
}

const EN: ValidationMessages = ValidationMessages {
    required: "This field is required",
    too_short: "Must be at least {min} characters",
    too_long: "Must be at most {max} characters",
    invalid_email: "Enter a valid email address",
    invalid_nickname: "Use letters, numbers, dots, dashes or underscores",
    weak_password: "Password must include a letter and a number",
    email_taken: "This email is already registered",
    nickname_taken: "This nickname is already taken",
};

const ES: ValidationMessages = ValidationMessages {
    required: "Este campo es obligatorio",
    too_short: "Debe tener al menos {min} caracteres",
    too_long: "Debe tener como máximo {max} caracteres",
    invalid_email: "Introduce un correo electrónico válido",
    invalid_nickname: "Usa letras, números, puntos, guiones o guiones bajos",
    weak_password: "La contraseña debe incluir una letra y un número",
    email_taken: "Este correo ya está registrado",
    nickname_taken: "Este apodo ya está en uso",
};

const FR: ValidationMessages = ValidationMessages {
    required: "Ce champ est obligatoire",
    too_short: "Doit contenir au moins {min} caractères",
    too_long: "Doit contenir au plus {max} caractères",
    invalid_email: "Saisissez une adresse e-mail valide",
    invalid_nickname: "Utilisez des lettres, chiffres, points, tirets ou tirets bas",
    weak_password: "Le mot de passe doit contenir une lettre et un chiffre",
    email_taken: "Cette adresse e-mail est déjà utilisée",
    nickname_taken: "Ce pseudo est déjà pris",
};

impl ValidationMessages {
    pub fn for_language(language: Language) -> &'static ValidationMessages {
        match language {
            Language::English => &EN,
            Language::Spanish => &ES,
            Language::French => &FR,
        }
    }
}

impl Default for ValidationMessages {
    fn default() -> Self {
        EN
    }
}

/// Replace `{name}` placeholders in `template`.
pub(crate) fn render(template: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}
