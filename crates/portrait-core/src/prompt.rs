//! Prompt Templating

use crate::style::PortraitStyle;

/// Appended to every style so the pet stays recognisable
pub const ACCURACY_CLAUSE: &str = "Make sure the likeness of the pet is preserved, keeping its \
     breed, markings, fur colors, and eye color accurate.";

/// Full name used on the portrait's name plaque.
///
/// Each submitted name part falls back to the one recorded at checkout.
pub fn persona(
    first_name: Option<&str>,
    last_name: Option<&str>,
    fallback_first: Option<&str>,
    fallback_last: Option<&str>,
) -> String {
    let pick = |primary: Option<&str>, fallback: Option<&str>| {
        primary
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| fallback.map(str::trim))
            .unwrap_or_default()
            .to_string()
    };

    format!("{} {}", pick(first_name, fallback_first), pick(last_name, fallback_last))
        .trim()
        .to_string()
}

/// Build the image-edit prompt for one style
pub fn build_prompt(style: PortraitStyle, persona: &str) -> String {
    let mut prompt = format!("{} {}", style.prompt_template(), ACCURACY_CLAUSE);

    let persona = persona.trim();
    if !persona.is_empty() {
        prompt.push_str(&format!(
            " Incorporate an elegant name plaque that reads \"{}\".",
            persona
        ));
    }

    prompt
}
