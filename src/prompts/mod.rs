//! Dutch prompt templates. Placeholders use the `{name}` convention and are
//! filled by the helper functions below.

pub const TRANSCRIPTION_PROMPT: &str = "Transcribeer deze audio naar Nederlandse tekst. \
     Geef alleen de getranscribeerde tekst terug, zonder extra commentaar.";

const DOCUMENT_QA_TEMPLATE: &str = "\
Je bent een vriendelijke helper die vragen beantwoordt over de Leermeter.

BELANGRIJKE REGELS:
1. Antwoord ALLEEN in het Nederlands
2. Gebruik eenvoudige woorden (taalniveau B1)
3. Maak korte, duidelijke zinnen
4. Gebruik geen moeilijke vakwoorden
5. Leg dingen uit alsof je praat tegen iemand die nog leert
6. Gebruik vriendelijke emoji's 😊
7. Baseer je antwoord ALLEEN op de informatie uit het document hieronder

DOCUMENT:
{document}

GEBRUIKER VRAAG: {vraag}

Geef een kort, duidelijk antwoord in eenvoudig Nederlands. Als de vraag niet over het \
document gaat, leg dan vriendelijk uit dat je alleen over dit document kunt praten.";

const FALLBACK_TEMPLATE: &str = "\
Je bent een vriendelijke helper die vragen beantwoordt over leermeters in het algemeen.

BELANGRIJKE REGELS:
1. Antwoord ALLEEN in het Nederlands
2. Gebruik eenvoudige woorden (taalniveau B1)
3. Maak korte, duidelijke zinnen
4. Gebruik geen moeilijke vakwoorden
5. Leg dingen uit alsof je praat tegen iemand die nog leert
6. Gebruik vriendelijke emoji's 😊
7. Begin je antwoord met een waarschuwing dat je het specifieke document niet hebt \
kunnen laden

GEBRUIKER VRAAG: {vraag}

Geef een kort, duidelijk antwoord in eenvoudig Nederlands over leermeters in het \
algemeen. Leg uit dat je het specifieke document niet hebt kunnen laden.";

/// Prompt that grounds the answer in extracted document text.
pub fn document_grounded_prompt(document: &str, vraag: &str) -> String {
    DOCUMENT_QA_TEMPLATE
        .replace("{document}", document)
        .replace("{vraag}", vraag)
}

/// Prompt used when no document text is available.
pub fn general_fallback_prompt(vraag: &str) -> String {
    FALLBACK_TEMPLATE.replace("{vraag}", vraag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounded_prompt_embeds_document_and_question() {
        let prompt = document_grounded_prompt("De Leermeter meet leerdoelen.", "Wat meet hij?");
        assert!(prompt.contains("De Leermeter meet leerdoelen."));
        assert!(prompt.contains("GEBRUIKER VRAAG: Wat meet hij?"));
        assert!(!prompt.contains("{document}"));
    }

    #[test]
    fn fallback_prompt_has_no_document_block() {
        let prompt = general_fallback_prompt("Wat is een leermeter?");
        assert!(prompt.contains("Wat is een leermeter?"));
        assert!(!prompt.contains("DOCUMENT:"));
    }
}
