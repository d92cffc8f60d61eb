//! Typed classification results.
//!
//! The analysis service answers with a loosely shaped [`PlantReport`]. It is
//! mapped once, at completion or load time, into a [`Classification`] that
//! the rest of the crate works with.

use remote_collection_client::PlantReport;
use serde::{Deserialize, Serialize};

const NOT_A_PLANT: &str = "Not a Plant";
const UNKNOWN_PLANT: &str = "Unknown Plant";
const UNKNOWN: &str = "Unknown";
const NOT_A_PLANT_DESCRIPTION: &str = "Our system analyzed the image and determined it does not \
     contain a plant. No further analysis was performed.";
const NOT_A_PLANT_REASONING: &str =
    "The AI filter determined this image does not contain a plant.";
const NOT_A_PLANT_GUIDANCE: &str = "Please upload a valid plant image.";

/// Scientific names with a well-known common name.
const KNOWN_COMMON_NAMES: &[(&str, &str)] = &[("Juniperus ashei", "Ashe Juniper")];

/// Species that are native but spread aggressively.
const NATIVE_INVASIVE_SCIENTIFIC: &[&str] = &["juniperus ashei"];
const NATIVE_INVASIVE_COMMON: &[&str] = &["ashe juniper"];

struct NameOverride {
    patterns: &'static [&'static str],
    common_name: &'static str,
    scientific_name: &'static str,
}

const NAME_OVERRIDES: &[NameOverride] = &[NameOverride {
    patterns: &["quercus virginiana", "virginiana quercus", "live oak"],
    common_name: "Live Oak",
    scientific_name: "Quercus virginiana",
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvasiveStatus {
    Invasive,
    Native,
    /// Native to the scan region yet spreading there.
    NativeInvasive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeAlternative {
    pub common_name: String,
    pub scientific_name: String,
    pub description: String,
    pub benefits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantIdentification {
    pub common_name: String,
    pub scientific_name: String,
    pub is_invasive: bool,
    pub invasive_status: InvasiveStatus,
    pub confidence_score: Option<f64>,
    pub confidence_reasoning: Option<String>,
    pub description: String,
    pub impact: String,
    pub native_alternatives: Vec<NativeAlternative>,
    pub control_methods: Vec<String>,
    pub region: String,
    pub native_region: String,
}

/// Result attached to a completed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    NotAPlant {
        confidence_score: f64,
        reasoning: String,
        guidance: String,
    },
    Plant(PlantIdentification),
}

impl Classification {
    /// Map an analysis report. `scan_region` stands in when the report
    /// does not echo the region back.
    pub fn from_report(report: &PlantReport, scan_region: &str) -> Self {
        if report.specie_identified.as_deref() == Some(NOT_A_PLANT) {
            return Classification::NotAPlant {
                confidence_score: report.confidence_score.unwrap_or(0.0),
                reasoning: non_empty(report.confidence_reasoning.as_deref())
                    .unwrap_or(NOT_A_PLANT_REASONING)
                    .to_string(),
                guidance: non_empty(Some(report.remove_instructions.as_str()))
                    .unwrap_or(NOT_A_PLANT_GUIDANCE)
                    .to_string(),
            };
        }

        let names = normalize_species_names(report.specie_identified.as_deref());
        let native_region = non_empty(report.native_region.as_deref()).unwrap_or(UNKNOWN);
        let region = non_empty(report.region.as_deref())
            .or_else(|| non_empty(Some(scan_region)))
            .unwrap_or(UNKNOWN);

        let description = match non_empty(report.specie_identified.as_deref()) {
            Some(identified) => format!(
                "Identified as {}. Native region: {}.",
                identified, native_region
            ),
            None => "Plant identification failed.".to_string(),
        };

        let invasive_status = invasive_status(
            &names.scientific_name,
            &names.common_name,
            report.invasive_or_not,
            region,
            native_region,
        );

        Classification::Plant(PlantIdentification {
            common_name: names.common_name,
            scientific_name: names.scientific_name,
            is_invasive: report.invasive_or_not,
            invasive_status,
            confidence_score: report.confidence_score,
            confidence_reasoning: report.confidence_reasoning.clone(),
            description,
            impact: report.invasive_effects.clone(),
            native_alternatives: report
                .native_alternatives
                .iter()
                .map(|alt| NativeAlternative {
                    common_name: alt.common_name.clone(),
                    scientific_name: alt.scientific_name.clone(),
                    description: alt.characteristics.clone(),
                    benefits: alt
                        .characteristics
                        .split(". ")
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                })
                .collect(),
            control_methods: non_empty(Some(report.remove_instructions.as_str()))
                .map(|s| vec![s.to_string()])
                .unwrap_or_default(),
            region: region.to_string(),
            native_region: native_region.to_string(),
        })
    }

    pub fn is_plant(&self) -> bool {
        matches!(self, Classification::Plant(_))
    }

    pub fn plant(&self) -> Option<&PlantIdentification> {
        match self {
            Classification::Plant(plant) => Some(plant),
            Classification::NotAPlant { .. } => None,
        }
    }

    /// Display species: common name, else scientific name.
    pub fn species_summary(&self) -> Option<String> {
        match self {
            Classification::NotAPlant { .. } => Some(NOT_A_PLANT.to_string()),
            Classification::Plant(plant) => non_empty(Some(plant.common_name.as_str()))
                .or_else(|| non_empty(Some(plant.scientific_name.as_str())))
                .map(str::to_string),
        }
    }

    pub fn description_summary(&self) -> Option<String> {
        match self {
            Classification::NotAPlant { .. } => Some(NOT_A_PLANT_DESCRIPTION.to_string()),
            Classification::Plant(plant) => {
                non_empty(Some(plant.description.as_str())).map(str::to_string)
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Capitalized genus, a space, then a lowercase epithet.
pub fn is_likely_scientific_name(name: &str) -> bool {
    let mut chars = name.trim().chars().peekable();
    if !chars.next().is_some_and(|c| c.is_ascii_uppercase()) {
        return false;
    }
    let mut genus_tail = 0;
    while chars.peek().is_some_and(|c| c.is_ascii_lowercase()) {
        chars.next();
        genus_tail += 1;
    }
    if genus_tail == 0 || chars.next() != Some(' ') {
        return false;
    }
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesNames {
    pub scientific_name: String,
    pub common_name: String,
}

/// Split `"Common (Scientific)"` or `"Scientific (Common)"` into both names.
pub fn normalize_species_names(specie_identified: Option<&str>) -> SpeciesNames {
    let Some(raw) = specie_identified.filter(|s| !s.is_empty()) else {
        return SpeciesNames {
            scientific_name: UNKNOWN.to_string(),
            common_name: UNKNOWN_PLANT.to_string(),
        };
    };

    let mut parts = raw.split(" (");
    let first = parts.next().unwrap_or_default().trim().to_string();
    let second = parts
        .next()
        .map(|p| p.replacen(')', "", 1).trim().to_string())
        .unwrap_or_default();

    let first_is_scientific = is_likely_scientific_name(&first);
    let second_is_scientific = !second.is_empty() && is_likely_scientific_name(&second);

    let (mut common_name, mut scientific_name) = if first_is_scientific && !second.is_empty() {
        (second, first)
    } else if second_is_scientific && !first_is_scientific {
        (first, second)
    } else if second.is_empty() {
        let words: Vec<&str> = first.split(' ').collect();
        let tail = words[words.len().saturating_sub(2)..].join(" ");
        (first, tail)
    } else {
        (first, second)
    };

    let lowered = collapse_whitespace(&raw.to_lowercase());
    if let Some(rule) = NAME_OVERRIDES
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| lowered.contains(p)))
    {
        common_name = rule.common_name.to_string();
        scientific_name = rule.scientific_name.to_string();
    }

    let common_name = display_name(&scientific_name, &common_name);
    SpeciesNames {
        scientific_name,
        common_name,
    }
}

/// Friendly name for display, preferring a distinct common name.
pub fn display_name(scientific_name: &str, common_name: &str) -> String {
    let common = common_name.trim();
    let scientific = scientific_name.trim();

    if !common.is_empty() && (scientific.is_empty() || common != scientific) {
        return common.to_string();
    }
    if !scientific.is_empty() && is_likely_scientific_name(scientific) {
        return friendly_name_from_scientific(scientific);
    }
    [common, scientific]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_PLANT)
        .to_string()
}

fn friendly_name_from_scientific(scientific_name: &str) -> String {
    let trimmed = scientific_name.trim();
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.len() < 2 {
        return if trimmed.is_empty() {
            UNKNOWN_PLANT.to_string()
        } else {
            trimmed.to_string()
        };
    }

    let (genus, epithet) = (parts[0], parts[1]);
    let key = format!("{} {}", genus, epithet);
    if let Some((_, common)) = KNOWN_COMMON_NAMES.iter().find(|(sci, _)| *sci == key) {
        return common.to_string();
    }

    let genus_display = if genus == "Juniperus" { "Juniper" } else { genus };

    let lowered = epithet.to_lowercase();
    let stripped = lowered
        .strip_suffix("ii")
        .or_else(|| lowered.strip_suffix('i'))
        .filter(|s| !s.is_empty())
        .unwrap_or(&lowered);

    let mut chars = stripped.chars();
    let epithet_display = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{} {}", epithet_display, genus_display)
}

fn invasive_status(
    scientific_name: &str,
    common_name: &str,
    is_invasive: bool,
    scan_region: &str,
    native_region: &str,
) -> InvasiveStatus {
    let scientific = scientific_name.to_lowercase();
    let common = common_name.to_lowercase();

    let explicit = NATIVE_INVASIVE_SCIENTIFIC
        .iter()
        .any(|name| scientific.contains(name))
        || NATIVE_INVASIVE_COMMON.iter().any(|name| common.contains(name));
    if explicit {
        return InvasiveStatus::NativeInvasive;
    }
    if !is_invasive {
        return InvasiveStatus::Native;
    }

    let scan = known_region(scan_region);
    let native = known_region(native_region);
    match (scan, native) {
        (Some(scan), Some(native)) if native.contains(&scan) || scan.contains(&native) => {
            InvasiveStatus::NativeInvasive
        }
        _ => InvasiveStatus::Invasive,
    }
}

fn known_region(region: &str) -> Option<String> {
    let lowered = region.trim().to_lowercase();
    if lowered.is_empty() || lowered == UNKNOWN.to_lowercase() {
        None
    } else {
        Some(lowered)
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
