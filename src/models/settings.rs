use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    #[default]
    MuslimWorldLeague,
    Isna,
    Egyptian,
    UmmAlQura,
    Karachi,
    Tehran,
    Jafari,
    Gulf,
    MoonsightingCommittee,
    NorthAmerica,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JuristicMethod {
    #[default]
    Shafii,
    Hanafi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// User settings. Only `enable_notifications` affects alert triggering, the
/// rest is stored on behalf of clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub calculation_method: CalculationMethod,
    pub juristic_method: JuristicMethod,
    pub audio_theme: String,
    pub is_24_hour_format: bool,
    pub enable_notifications: bool,
    pub enable_vibration: bool,
    pub theme: Theme,
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calculation_method: CalculationMethod::MuslimWorldLeague,
            juristic_method: JuristicMethod::Shafii,
            audio_theme: "default".to_string(),
            is_24_hour_format: false,
            enable_notifications: true,
            enable_vibration: true,
            theme: Theme::System,
            language: "en".to_string(),
        }
    }
}
