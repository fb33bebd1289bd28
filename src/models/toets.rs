use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VraagType {
    Meerkeuze,
    JuistOnjuist,
    Open,
    Invulvragen,
    Matching,
    Gemengd,
}

impl VraagType {
    pub fn label(&self) -> &'static str {
        match self {
            VraagType::Meerkeuze => "Meerkeuzevragen (A, B, C, D)",
            VraagType::JuistOnjuist => "Juist/Onjuist vragen",
            VraagType::Open => "Open vragen",
            VraagType::Invulvragen => "Invulvragen (fill-in-the-blank)",
            VraagType::Matching => "Koppelvragen (matching)",
            VraagType::Gemengd => "Gemengde vraagtypen",
        }
    }
}

impl FromStr for VraagType {
    type Err = ToetsConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "meerkeuze" => Ok(VraagType::Meerkeuze),
            "juist-onjuist" => Ok(VraagType::JuistOnjuist),
            "open" => Ok(VraagType::Open),
            "invulvragen" => Ok(VraagType::Invulvragen),
            "matching" => Ok(VraagType::Matching),
            "gemengd" => Ok(VraagType::Gemengd),
            _ => Err(ToetsConfigError::InvalidField(format!(
                "Onbekend vraagtype: '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnderwijsNiveau {
    Vmbo,
    Havo,
    Vwo,
    Mbo,
    Hbo,
    Wo,
}

impl fmt::Display for OnderwijsNiveau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OnderwijsNiveau::Vmbo => "VMBO",
            OnderwijsNiveau::Havo => "HAVO",
            OnderwijsNiveau::Vwo => "VWO",
            OnderwijsNiveau::Mbo => "MBO",
            OnderwijsNiveau::Hbo => "HBO",
            OnderwijsNiveau::Wo => "WO",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OnderwijsNiveau {
    type Err = ToetsConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vmbo" => Ok(OnderwijsNiveau::Vmbo),
            "havo" => Ok(OnderwijsNiveau::Havo),
            "vwo" => Ok(OnderwijsNiveau::Vwo),
            "mbo" => Ok(OnderwijsNiveau::Mbo),
            "hbo" => Ok(OnderwijsNiveau::Hbo),
            "wo" => Ok(OnderwijsNiveau::Wo),
            _ => Err(ToetsConfigError::InvalidField(format!(
                "Onbekend onderwijsniveau: '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloomNiveau {
    Kennis,
    Begrip,
    Toepassing,
    Analyse,
    Evaluatie,
    Creatie,
}

impl BloomNiveau {
    pub fn label(&self) -> &'static str {
        match self {
            BloomNiveau::Kennis => "Kennis",
            BloomNiveau::Begrip => "Begrip",
            BloomNiveau::Toepassing => "Toepassing",
            BloomNiveau::Analyse => "Analyse",
            BloomNiveau::Evaluatie => "Evaluatie",
            BloomNiveau::Creatie => "Creatie",
        }
    }

    pub fn beschrijving(&self) -> &'static str {
        match self {
            BloomNiveau::Kennis => "Feiten onthouden",
            BloomNiveau::Begrip => "Betekenis begrijpen",
            BloomNiveau::Toepassing => "Kennis toepassen",
            BloomNiveau::Analyse => "Informatie analyseren",
            BloomNiveau::Evaluatie => "Oordelen vellen",
            BloomNiveau::Creatie => "Nieuwe ideeën creëren",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToetsConfigError {
    #[error("Vul eerst een onderwerp in")]
    MissingOnderwerp,
    #[error("Selecteer minimaal één Bloom taxonomie niveau")]
    MissingBloomNiveau,
    #[error("Aantal vragen moet tussen {min} en {max} liggen")]
    AantalVragenBuitenBereik { min: u8, max: u8 },
    #[error("{0}")]
    InvalidField(String),
}

pub const MIN_VRAGEN: u8 = 5;
pub const MAX_VRAGEN: u8 = 50;

/// Configuration for one quiz-generation run. Built up by the caller,
/// consumed once to render the generation prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToetsConfig {
    pub vraag_type: VraagType,
    pub aantal_vragen: u8,
    pub onderwijs_niveau: OnderwijsNiveau,
    pub bloom_niveaus: Vec<BloomNiveau>,
    pub met_casus: bool,
    pub onderwerp: String,
    pub context_tekst: String,
}

impl Default for ToetsConfig {
    fn default() -> Self {
        Self {
            vraag_type: VraagType::Meerkeuze,
            aantal_vragen: 10,
            onderwijs_niveau: OnderwijsNiveau::Havo,
            bloom_niveaus: vec![BloomNiveau::Kennis, BloomNiveau::Begrip],
            met_casus: false,
            onderwerp: String::new(),
            context_tekst: String::new(),
        }
    }
}

impl ToetsConfig {
    pub fn validate(&self) -> Result<(), ToetsConfigError> {
        if self.onderwerp.trim().is_empty() {
            return Err(ToetsConfigError::MissingOnderwerp);
        }
        if self.bloom_niveaus.is_empty() {
            return Err(ToetsConfigError::MissingBloomNiveau);
        }
        if !(MIN_VRAGEN..=MAX_VRAGEN).contains(&self.aantal_vragen) {
            return Err(ToetsConfigError::AantalVragenBuitenBereik {
                min: MIN_VRAGEN,
                max: MAX_VRAGEN,
            });
        }
        Ok(())
    }

    pub fn build_prompt(&self) -> String {
        let bloom = self
            .bloom_niveaus
            .iter()
            .map(|n| format!("{} ({})", n.label(), n.beschrijving()))
            .collect::<Vec<_>>()
            .join(", ");

        let casus_regel = if self.met_casus {
            "Ja, voeg relevante casussen toe"
        } else {
            "Nee, directe vragen"
        };

        let casus_instructie = if self.met_casus {
            "\n**CASUS INSTRUCTIE:** Begin relevante vragen met een korte, realistische casus \
             die aansluit bij het onderwijsniveau.\n"
        } else {
            ""
        };

        format!(
            "Je bent een expert toetsmaker met specialisatie in kwalitatieve kennistoetsen. \
             Maak een professionele toets volgens de volgende specificaties:\n\n\
             **TOETS SPECIFICATIES:**\n\
             - Type vragen: {vraag_type}\n\
             - Aantal vragen: {aantal}\n\
             - Onderwijsniveau: {niveau}\n\
             - Bloom taxonomie niveaus: {bloom}\n\
             - Met casus: {casus}\n\
             - Onderwerp: {onderwerp}\n\n\
             **CONTEXT INFORMATIE:**\n\
             {context}\n\n\
             **KWALITEITSEISEN:**\n\
             1. Formuleer vragen eenduidig en zakelijk\n\
             2. Elke vraag bevat één duidelijk probleem\n\
             3. Bij meerkeuzevragen: exact één juist antwoord\n\
             4. Vermijd \"alle/geen van bovenstaande\" opties\n\
             5. Alle antwoordopties ongeveer even lang\n\
             6. Geen ontkennende vraagstellingen\n\
             7. Passend bij het opgegeven onderwijsniveau\n\
             8. Duidelijke verdeling over de gekozen Bloom-niveaus\n\n\
             **GEWENSTE OUTPUT STRUCTUUR:**\n\
             Voor elke vraag:\n\
             - Vraagnummer\n\
             - Bloom-niveau tussen haakjes\n\
             - De vraag zelf\n\
             - Antwoordopties (indien van toepassing)\n\
             - Juiste antwoord\n\
             - Korte uitleg van het juiste antwoord\n\
             {casus_instructie}\n\
             Maak nu de toets volgens deze specificaties. Zorg voor een goede mix van \
             moeilijkheidsgraden binnen het gekozen niveau.",
            vraag_type = self.vraag_type.label(),
            aantal = self.aantal_vragen,
            niveau = self.onderwijs_niveau,
            bloom = bloom,
            casus = casus_regel,
            onderwerp = self.onderwerp,
            context = self.context_tekst,
            casus_instructie = casus_instructie,
        )
    }
}
