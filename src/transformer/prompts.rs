//! System instructions and fallback values per language and style.

use crate::config::{Language, Style};

/// Base rewrite instruction for the target language.
fn rewrite_instruction(language: Language) -> &'static str {
    match language {
        Language::Dutch => "Herschrijf de volgende Nederlandse tekst in het Nederlands",
        Language::English => "Rewrite the following text in English",
        Language::German => "Schreibe den folgenden Text auf Deutsch um",
    }
}

fn style_modifier(style: Style, language: Language) -> &'static str {
    match (style, language) {
        (Style::Technical, Language::Dutch) => {
            "in een technische en gedetailleerde stijl met vakjargon en precisieterminologie"
        }
        (Style::Technical, Language::English) => {
            "in a technical and detailed style with professional jargon and precision terminology"
        }
        (Style::Technical, Language::German) => {
            "in einem technischen und detaillierten Stil mit Fachsprache und präziser Terminologie"
        }
        (Style::Normal, Language::Dutch) => {
            "in een duidelijke en toegankelijke stijl voor het algemene publiek"
        }
        (Style::Normal, Language::English) => "in a clear and accessible style for the general public",
        (Style::Normal, Language::German) => {
            "in einem klaren und zugänglichen Stil für die Allgemeinheit"
        }
        (Style::Easy, Language::Dutch) => {
            "in een eenvoudige stijl die iedereen kan begrijpen, vermijd moeilijke woorden en gebruik korte zinnen"
        }
        (Style::Easy, Language::English) => {
            "in a simple style that everyone can understand, avoid difficult words and use short sentences"
        }
        (Style::Easy, Language::German) => {
            "in einem einfachen Stil, den jeder verstehen kann, vermeide schwierige Wörter und verwende kurze Sätze"
        }
    }
}

fn keep_facts(language: Language) -> &'static str {
    match language {
        Language::Dutch => "Behoud de belangrijkste informatie en feiten.",
        Language::English => "Keep the key information and facts.",
        Language::German => "Behalte die wichtigsten Informationen und Fakten bei.",
    }
}

/// System instruction for one rewrite chunk.
pub fn rewrite(style: Style, language: Language) -> String {
    format!(
        "{} {}. {}",
        rewrite_instruction(language),
        style_modifier(style, language),
        keep_facts(language)
    )
}

/// System instruction for the headline call.
pub fn title(language: Language, max_chars: usize) -> String {
    match language {
        Language::Dutch => format!(
            "Maak een pakkende Nederlandse titel van maximaal {max_chars} karakters voor de volgende tekst. Geef alleen de titel."
        ),
        Language::English => format!(
            "Create a compelling English title of maximum {max_chars} characters for the following text. Reply with the title only."
        ),
        Language::German => format!(
            "Erstelle einen ansprechenden deutschen Titel von maximal {max_chars} Zeichen für den folgenden Text. Antworte nur mit dem Titel."
        ),
    }
}

/// System instruction for the single-word category call.
pub fn category(language: Language) -> String {
    let choices = categories(language).join(", ");
    match language {
        Language::Dutch => format!(
            "Classificeer de categorie van de volgende Nederlandse tekst met één woord in het Nederlands. Kies uit: {choices}."
        ),
        Language::English => format!(
            "Classify the category of the following text with one word in English. Choose from: {choices}."
        ),
        Language::German => format!(
            "Klassifiziere die Kategorie des folgenden Textes mit einem Wort auf Deutsch. Wähle aus: {choices}."
        ),
    }
}

/// System instruction asking for exactly `count` comma-separated tags.
pub fn tags(language: Language, count: usize) -> String {
    match language {
        Language::Dutch => format!(
            "Genereer precies {count} Nederlandse tags gescheiden door komma's. Bijvoorbeeld: 'Politiek, Nederland, Verkiezingen'. Gebruik korte woorden van 1-3 woorden elk."
        ),
        Language::English => format!(
            "Generate exactly {count} English tags separated by commas. Example: 'Politics, Elections, Government'. Use short words of 1-3 words each."
        ),
        Language::German => format!(
            "Generiere genau {count} deutsche Tags getrennt durch Kommas. Beispiel: 'Politik, Deutschland, Wahlen'. Verwende kurze Wörter von 1-3 Wörtern."
        ),
    }
}

/// The closed category vocabulary. The last entry is the default.
pub fn categories(language: Language) -> &'static [&'static str] {
    match language {
        Language::Dutch => &[
            "Politiek",
            "Sport",
            "Economie",
            "Gezondheid",
            "Technologie",
            "Cultuur",
            "Onderwijs",
            "Milieu",
            "Internationaal",
            "Nieuws",
        ],
        Language::English => &[
            "Politics",
            "Sports",
            "Economy",
            "Health",
            "Technology",
            "Culture",
            "Education",
            "Environment",
            "International",
            "News",
        ],
        Language::German => &[
            "Politik",
            "Sport",
            "Wirtschaft",
            "Gesundheit",
            "Technologie",
            "Kultur",
            "Bildung",
            "Umwelt",
            "International",
            "Nachrichten",
        ],
    }
}

pub fn default_category(language: Language) -> &'static str {
    match language {
        Language::Dutch => "Nieuws",
        Language::English => "News",
        Language::German => "Nachrichten",
    }
}

/// Fallback tags, long enough for the largest allowed `num_tags`.
pub fn default_tags(language: Language) -> &'static [&'static str] {
    match language {
        Language::Dutch => &["Nederland", "Nieuws", "Actueel", "Binnenland", "Samenleving"],
        Language::English => &["News", "Current", "Events", "World", "Society"],
        Language::German => &["Nachrichten", "Aktuell", "Deutschland", "Welt", "Gesellschaft"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANGUAGES: [Language; 3] = [Language::Dutch, Language::English, Language::German];

    #[test]
    fn test_rewrite_instruction_combines_language_and_style() {
        let prompt = rewrite(Style::Easy, Language::Dutch);
        assert!(prompt.starts_with("Herschrijf de volgende Nederlandse tekst"));
        assert!(prompt.contains("korte zinnen"));
        assert!(prompt.ends_with("feiten."));

        let prompt = rewrite(Style::Technical, Language::English);
        assert!(prompt.contains("professional jargon"));
    }

    #[test]
    fn test_tag_instruction_carries_count() {
        assert!(tags(Language::Dutch, 5).contains("precies 5"));
        assert!(tags(Language::German, 2).contains("genau 2"));
    }

    #[test]
    fn test_defaults_cover_largest_tag_count() {
        for language in LANGUAGES {
            assert_eq!(default_tags(language).len(), 5);
            assert_eq!(categories(language).last(), Some(&default_category(language)));
            assert!(category(language).contains(default_category(language)));
        }
    }

    #[test]
    fn test_title_instruction_carries_limit() {
        assert!(title(Language::English, 120).contains("maximum 120"));
    }
}
