//! The attribute battery
//!
//! Twenty-five connector attributes, in display order. Each carries a
//! document-mode reasoning chain and a shorter web-mode rule set. A catalog
//! can also be loaded from TOML so instructions can be tuned without a
//! rebuild.

use crate::error::ExtractorError;
use serde::{Deserialize, Serialize};
use sheetwise_domain::AttributeSpec;
use std::collections::HashSet;

/// Display names of the built-in attributes, in display order
pub const CONNECTOR_ATTRIBUTES: [&str; 25] = [
    "Material Filling",
    "Material Name",
    "Pull-To-Seat",
    "Gender",
    "Height [MM]",
    "Length [MM]",
    "Width [MM]",
    "Number Of Cavities",
    "Number Of Rows",
    "Mechanical Coding",
    "Colour",
    "Colour Coding",
    "Working Temperature",
    "Housing Seal",
    "Wire Seal",
    "Sealing",
    "Sealing Class",
    "Contact Systems",
    "Terminal Position Assurance",
    "Connector Position Assurance",
    "Closed Cavities",
    "Pre-Assembled",
    "Type Of Connector",
    "Set/Kit",
    "HV Qualified",
];

/// Attributes whose instructions use `999` for an unknown dimension
pub const DIMENSION_ATTRIBUTES: [&str; 3] = ["Height [MM]", "Length [MM]", "Width [MM]"];

/// Value the dimension instructions reserve for "not stated"
pub const UNKNOWN_DIMENSION: &str = "999";

const MATERIAL_FILLING: &str = r#"Extract material filling additives using this reasoning chain:
    STEP 1: ADDITIVE IDENTIFICATION
    - Scan document sections for:
      * Explicit additive declarations (GF, GB, MF, T)
      * Mechanical property context clues: "reinforced with...", "improved [strength/stiffness] using...", "contains X% [additive]"
      * Negative statements: "no additives", "unfilled"
    STEP 2: CONTEXT VALIDATION
    - Keep an additive only when it serves a mechanical purpose:
      * "GF30 for stiffness" -> valid
      * "GB colorant" -> rejected (non-mechanical)
      * "MF manufacturing facility" -> rejected (incidental mention)
    STEP 3: NEGATION CHECK
    - If an explicit "no additives" statement is found and nothing contradicts it, return "none".
    STEP 4: STANDARDIZATION
    - Convert equivalents to standard abbreviations:
      * "Glass fiber" -> GF
      * "Glass beads" -> GB
      * "Mineral-filled" or "Mica-filled" -> MF
      * "Talc-filled" -> T
    - Non-standard or ambiguous terms such as "Carbon additives" -> NOT FOUND
    STEP 5: CERTAINTY ASSESSMENT
    - Require at least one valid additive with mechanical context, no ambiguous terms and no conflicting information.
    - If any doubt remains -> NOT FOUND.
    Examples:
    - "PA66-GF30-T15 (improved impact resistance)" -> GF, T
    - "Unfilled PPS compound" -> none
    - "Contains 5% specialty reinforcement" -> NOT FOUND
    Answer with the comma-separated abbreviations, "none" or "NOT FOUND"."#;

const MATERIAL_FILLING_WEB: &str = "Determine the material filling: the additives added to the base material to influence its mechanical characteristics. The most common additives are GF (glass fiber), GB (glass balls), MF (mineral fiber) and T (talcum). Answer with the comma-separated abbreviations, \"none\" when the material is explicitly unfilled, or \"NOT FOUND\".";

const MATERIAL_NAME: &str = r#"Extract the primary polymer material using this reasoning chain:
    STEP 1: MATERIAL IDENTIFICATION
    - Scan for explicit polymer declarations (PA66, PBT, ...), composite notations (PA6-GF30, PPS-MF15), additive markers (GF, GB, MF, T) and weight percentages (PA(70%), PBT(30%)).
    STEP 2: BASE MATERIAL ISOLATION
    - Remove additives and fillers from composite names: PA66-GF30 -> PA66, LCP-MF45 -> LCP.
    - If only additives are mentioned (GF40), look for the base polymer elsewhere in the context; otherwise NOT FOUND.
    STEP 3: WEIGHT HIERARCHY
    - Compare weights when present: PA66(55%)/PA6(45%) -> PA66.
    - Without weights use declaration order: "Primary material: PPS, Secondary: LCP" -> PPS.
    STEP 4: SPECIFICITY
    - Prefer exact grades: PA66 over PA6 over PA, PPSU over PPS.
    STEP 5: VALIDATION
    - Answer only when a single base polymer satisfies steps 2 to 4; if uncertain -> NOT FOUND.
    Examples:
    - "Connector: PA6-GF30 (60% resin)" -> PA6
    - "Housing: GF40 Polymer" -> NOT FOUND
    Answer with the material name in UPPERCASE or "NOT FOUND"."#;

const MATERIAL_NAME_WEB: &str = "Determine the material name: the material with the greatest share by weight of the whole connector. Strip filler suffixes (PA66-GF30 -> PA66). Answer in UPPERCASE or \"NOT FOUND\".";

const PULL_TO_SEAT: &str = r#"Determine the Pull-To-Seat requirement using this reasoning chain:
    STEP 1: ACTION IDENTIFICATION
    - Scan for explicit "pull-to-seat" mentions and terminal insertion descriptions such as "pull-back assembly required", "tug-lock mechanism", "retract-to-secure".
    - Note alternative methods: "pre-inserted terminals", "tool-free insertion", "push-fit design".
    STEP 2: OPERATIONAL CONTEXT
    - Only count mentions about primary assembly (terminal or wire installation, final seating). Ignore maintenance, removal and secondary locking.
    STEP 3: NEGATION HANDLING
    - Explicit denials ("no pull-to-seat required", "self-retaining terminals", "zero-stroke insertion") mean No.
    STEP 4: ASSEMBLY CONFIRMATION
    - The pull action must be the final assembly step, needed for terminal retention and done by the installer. A tool-assisted pull counts as No.
    STEP 5: FINAL VERIFICATION
    - Any ambiguity defaults to No.
    Examples:
    - "Terminals require pull-back action for seating" -> Yes
    - "Pre-inserted contacts with CPA secondary lock" -> No
    - "Secure insertion method" -> No
    Answer with "Yes" or "No"."#;

const GENDER: &str = r#"Determine the connector gender using this reasoning chain:
    STEP 1: Look for explicit statements: "male", "female", "plug", "header", "receptacle", "socket".
    STEP 2: Map the terms: plug, header, tab housing or pin housing -> Male; receptacle, socket or terminal (female contacts) housing -> Female.
    STEP 3: When the document describes both halves of a mating pair, answer for the part the document is about, not its counterpart.
    STEP 4: Conflicting or missing statements -> NOT FOUND.
    Answer with "Male", "Female" or "NOT FOUND"."#;

const HEIGHT_MM: &str = r#"Extract the overall connector height in millimetres:
    STEP 1: Look for dimension tables or drawing callouts labelled height, H or overall height.
    STEP 2: Convert inches to millimetres (1 in = 25.4 mm) and keep one decimal place.
    STEP 3: When several heights are given, use the largest overall outer dimension of the housing, not of a single feature.
    STEP 4: If no height is stated, answer "999".
    Answer with the number only, without units (e.g. "7.2")."#;

const LENGTH_MM: &str = r#"Extract the overall connector length in millimetres:
    STEP 1: Look for dimension tables or drawing callouts labelled length, L or depth in mating direction.
    STEP 2: Convert inches to millimetres (1 in = 25.4 mm) and keep one decimal place.
    STEP 3: When several lengths are given, use the largest overall outer dimension of the housing.
    STEP 4: If no length is stated, answer "999".
    Answer with the number only, without units (e.g. "21.5")."#;

const WIDTH_MM: &str = r#"Extract the overall connector width in millimetres:
    STEP 1: Look for dimension tables or drawing callouts labelled width or W.
    STEP 2: Convert inches to millimetres (1 in = 25.4 mm) and keep one decimal place.
    STEP 3: When several widths are given, use the largest overall outer dimension of the housing.
    STEP 4: If no width is stated, answer "999".
    Answer with the number only, without units (e.g. "14.8")."#;

const NUMBER_OF_CAVITIES: &str = r#"Determine the number of cavities (positions, ways, pins) of the connector:
    STEP 1: Look for "N-way", "N-pos", "N positions", "N cavities", "N pins" or a cavity count in the part description.
    STEP 2: Count every cavity of the housing, including closed or unused ones.
    STEP 3: If several variants are listed, answer only when the context identifies the variant in question.
    STEP 4: If the count cannot be determined with certainty -> NOT FOUND.
    Answer with the number only (e.g. "12")."#;

const NUMBER_OF_ROWS: &str = r#"Determine the number of cavity rows of the connector:
    STEP 1: Look for "single row", "double row", "dual row", "2-row", or a row count in the cavity layout.
    STEP 2: Map words to numbers: single -> 1, double or dual -> 2, triple -> 3.
    STEP 3: If the layout is not described -> NOT FOUND.
    Answer with the number only (e.g. "2")."#;

const MECHANICAL_CODING: &str = r#"Determine the mechanical coding of the connector:
    STEP 1: Look for coding or keying statements such as "Coding A", "Code B", "keyed", "polarization".
    STEP 2: Valid codings are A, B, C, D. A universal (neutral, 0-coded) connector that accepts all codings of its family is Z.
    STEP 3: If coding features are drawn but never named, answer "no naming".
    STEP 4: If the connector explicitly has no coding, answer "none".
    STEP 5: If the context says nothing about coding -> NOT FOUND.
    Answer with "A", "B", "C", "D", "Z", "no naming", "none" or "NOT FOUND"."#;

const MECHANICAL_CODING_WEB: &str = r#"Determine the Mechanical Coding value. A mechanical coding is designed on the plugged connector and its counterpart to avoid failures while mating. The location of tongue and groove on the plastic parts varies with the coding (A/B/C/D).
If the coding is only drawn and never named, use the value "no naming".
If all codings of a connector family fit a universal (neutral or 0-coded) connector, that connector has the coding value Z.
If the connector has no coding, the value is "none"."#;

const COLOUR: &str = r#"Determine the housing colour:
    STEP 1: Look for "colour", "color" or RAL/Pantone references for the housing.
    STEP 2: Translate codes to names where obvious (RAL 9005 -> black).
    STEP 3: Report the colour of the main housing, not of seals, CPA or TPA parts.
    STEP 4: If several colour variants are listed and the context does not identify one -> NOT FOUND.
    Answer with the colour name in lowercase (e.g. "black")."#;

const COLOUR_CODING: &str = r#"Determine Colour Coding using this reasoning chain:
    STEP 1: MECHANICAL CODING PREREQUISITE
    - Confirm a mechanical coding exists (Coding A/B/C/D/Z or physical keying). No mechanical coding -> "none".
    STEP 2: COMPONENT FOCUS
    - Look at the coding components: CPA latches, TPA inserts, coding keys, polarization features. Ignore non-coding parts such as the housing base and seals.
    STEP 3: COLOUR DIFFERENTIATION
    - A coding component coloured differently from the base housing proceeds; identical colours -> "none".
    STEP 4: DOMINANT COLOUR
    - Use, in order: explicit coding statements ("Red denotes Type B"), the majority of coding components, the highest contrast against the housing, the first colour mentioned.
    STEP 5: CONSISTENCY
    - Reject isolated colour mentions that are not tied to variant identification.
    Examples:
    - "Type A (Blue CPA) vs Type B (Red CPA)" -> Blue/Red (depending on variant)
    - "Black housing with black CPA/TPA" -> none
    Answer with the colour, "none" or "NOT FOUND"."#;

const WORKING_TEMPERATURE: &str = r#"Extract the working (operating) temperature range:
    STEP 1: Look for "operating temperature", "working temperature", "temperature range" or a class such as T2/T3.
    STEP 2: Report minimum and maximum in degrees Celsius, formatted "-40 to 125".
    STEP 3: Convert Fahrenheit to Celsius when only Fahrenheit is given.
    STEP 4: Storage or soldering temperatures are not working temperatures. Nothing applicable -> NOT FOUND."#;

const HOUSING_SEAL: &str = r#"Determine the housing seal type (the seal between the connector and its counterpart):
    STEP 1: Look for "interface seal", "mat seal", "radial seal", "peripheral seal", "gasket".
    STEP 2: Radial seal around the mating interface -> "radial seal"; flat interface gasket -> "interface seal".
    STEP 3: Explicitly unsealed or no housing seal -> "none".
    STEP 4: Nothing stated -> NOT FOUND."#;

const WIRE_SEAL: &str = r#"Determine the wire seal type (sealing where wires enter the housing):
    STEP 1: Look for "single wire seal", "individual seal", "mat seal", "family seal", "gel seal".
    STEP 2: One seal per wire -> "single wire seal"; one seal for all wires -> "mat seal"; gel or potting -> "gel".
    STEP 3: Explicitly no wire seal -> "none".
    STEP 4: Nothing stated -> NOT FOUND."#;

const SEALING: &str = r#"Determine whether the connector is sealed:
    STEP 1: Look for "sealed", "waterproof", an IP rating, a housing seal or a wire seal.
    STEP 2: Any sealing feature or an IP rating of IPx4 or better -> "sealed".
    STEP 3: "unsealed", "non-sealed" or an explicitly dry-area connector -> "unsealed".
    STEP 4: Nothing stated -> NOT FOUND.
    Answer with "sealed", "unsealed" or "NOT FOUND"."#;

const SEALING_CLASS: &str = r#"Extract the sealing class as IP code(s):
    STEP 1: Look for "IP" followed by two characters (IP67, IP6K9K, IPX7).
    STEP 2: List every IP code that applies to the mated connector, comma-separated, in the order given.
    STEP 3: Classes for other parts (e.g. the counterpart only) do not count.
    STEP 4: No IP code present -> NOT FOUND."#;

const CONTACT_SYSTEMS: &str = r#"Extract the contact (terminal) systems used with the connector:
    STEP 1: Look for terminal family names and tab sizes: "MQS", "MLK", "JPT", "0.64", "1.5", "2.8", "MCP", "NanoMQS".
    STEP 2: List every system the housing accepts, comma-separated, in the order given.
    STEP 3: Wire cross-sections alone are not contact systems.
    STEP 4: Nothing stated -> NOT FOUND."#;

const TERMINAL_POSITION_ASSURANCE: &str = r#"Determine the Terminal Position Assurance (TPA):
    STEP 1: Look for "TPA", "terminal position assurance", "secondary lock", "terminal lock".
    STEP 2: Present, whether integrated or as a separate part -> "Yes". Note "pre-assembled" if stated: "Yes, pre-assembled".
    STEP 3: Explicitly without TPA -> "No".
    STEP 4: Nothing stated -> NOT FOUND."#;

const CONNECTOR_POSITION_ASSURANCE: &str = r#"Determine the Connector Position Assurance (CPA):
    STEP 1: Look for "CPA", "connector position assurance", "secondary latch", "locking slide".
    STEP 2: Present on this connector -> "Yes". Note "pre-assembled" if stated: "Yes, pre-assembled".
    STEP 3: Explicitly without CPA -> "No".
    STEP 4: Nothing stated -> NOT FOUND."#;

const CLOSED_CAVITIES: &str = r#"Identify closed (blocked, unused) cavities:
    STEP 1: Look for "closed cavity", "blocked position", "plugged", "cavity plug", or a pin-out marking positions as not used.
    STEP 2: List the closed cavity numbers, comma-separated (e.g. "3, 7").
    STEP 3: All cavities open -> "none".
    STEP 4: Nothing stated -> NOT FOUND."#;

const PRE_ASSEMBLED: &str = r#"Determine whether the connector is delivered pre-assembled:
    STEP 1: Look for "pre-assembled", "delivered assembled", "supplied with seal/TPA/CPA fitted".
    STEP 2: Delivered with secondary parts already fitted -> "Yes"; delivered as loose parts or requiring assembly before use -> "No".
    STEP 3: Nothing stated -> NOT FOUND."#;

const TYPE_OF_CONNECTOR: &str = r#"Determine the type of connector, describing roughly the application area it is designed for:
    STEP 1: Look for statements about use: standard harness connector, contact carrier, actuator connection, sensor connection, inline, header.
    STEP 2: Map to one of: "Standard", "Contact Carrier", "Actuator", "Sensor", "Inline", "Header".
    STEP 3: Prefer the most specific type explicitly stated.
    STEP 4: Nothing stated -> NOT FOUND."#;

const TYPE_OF_CONNECTOR_WEB: &str = "Determine the type of connector. The type describes roughly the application area the connector is designed for: Standard, Contact Carrier, Actuator...";

const SET_KIT: &str = r#"Determine whether the part is sold as a set or kit:
    STEP 1: Look for "kit", "set", "assortment", or a bill of materials bundling housing, terminals and seals under one part number.
    STEP 2: Bundled -> "Yes"; single component -> "No".
    STEP 3: Nothing stated -> NOT FOUND."#;

const HV_QUALIFIED: &str = r#"Determine whether the connector is qualified for high voltage:
    STEP 1: Look for "HV", "high voltage", voltage ratings above 60 V DC, LV215 or similar HV qualification standards.
    STEP 2: Qualified or rated above 60 V DC -> "Yes"; rated 60 V DC or below, or explicitly low voltage -> "No".
    STEP 3: Nothing stated -> NOT FOUND."#;

fn web_extract(label: &str) -> String {
    format!("Extract {} value", label)
}

/// The built-in connector attribute battery
pub fn connector_attributes() -> Vec<AttributeSpec> {
    vec![
        AttributeSpec::new("Material Filling", MATERIAL_FILLING)
            .with_web_instructions(MATERIAL_FILLING_WEB),
        AttributeSpec::new("Material Name", MATERIAL_NAME).with_web_instructions(MATERIAL_NAME_WEB),
        AttributeSpec::new("Pull-To-Seat", PULL_TO_SEAT).with_web_instructions(web_extract("Pull-to-Seat")),
        AttributeSpec::new("Gender", GENDER).with_web_instructions(web_extract("Gender")),
        AttributeSpec::new("Height [MM]", HEIGHT_MM).with_web_instructions(web_extract("Height [MM]")),
        AttributeSpec::new("Length [MM]", LENGTH_MM).with_web_instructions(web_extract("Length [MM]")),
        AttributeSpec::new("Width [MM]", WIDTH_MM).with_web_instructions(web_extract("Width [MM]")),
        AttributeSpec::new("Number Of Cavities", NUMBER_OF_CAVITIES)
            .with_web_instructions(web_extract("Number of Cavities")),
        AttributeSpec::new("Number Of Rows", NUMBER_OF_ROWS)
            .with_web_instructions(web_extract("Number of Rows")),
        AttributeSpec::new("Mechanical Coding", MECHANICAL_CODING)
            .with_web_instructions(MECHANICAL_CODING_WEB),
        AttributeSpec::new("Colour", COLOUR).with_web_instructions(web_extract("Colour")),
        // The colour coding chain works as-is on key/value text
        AttributeSpec::new("Colour Coding", COLOUR_CODING),
        AttributeSpec::new("Working Temperature", WORKING_TEMPERATURE)
            .with_web_instructions("Extract Working Temperature value(s)"),
        AttributeSpec::new("Housing Seal", HOUSING_SEAL).with_web_instructions(web_extract("Housing Seal")),
        AttributeSpec::new("Wire Seal", WIRE_SEAL).with_web_instructions(web_extract("Wire Seal")),
        AttributeSpec::new("Sealing", SEALING).with_web_instructions(web_extract("Sealing")),
        AttributeSpec::new("Sealing Class", SEALING_CLASS)
            .with_web_instructions("Extract Sealing Class value (IP Code)"),
        AttributeSpec::new("Contact Systems", CONTACT_SYSTEMS)
            .with_web_instructions("Extract Contact Systems value(s)"),
        AttributeSpec::new("Terminal Position Assurance", TERMINAL_POSITION_ASSURANCE)
            .with_web_instructions(web_extract("Terminal Position Assurance")),
        AttributeSpec::new("Connector Position Assurance", CONNECTOR_POSITION_ASSURANCE)
            .with_web_instructions(web_extract("Connector Position Assurance")),
        AttributeSpec::new("Closed Cavities", CLOSED_CAVITIES)
            .with_web_instructions("Extract Closed Cavities value(s)"),
        AttributeSpec::new("Pre-Assembled", PRE_ASSEMBLED).with_web_instructions(web_extract("Pre-Assembled")),
        AttributeSpec::new("Type Of Connector", TYPE_OF_CONNECTOR)
            .with_web_instructions(TYPE_OF_CONNECTOR_WEB),
        AttributeSpec::new("Set/Kit", SET_KIT).with_web_instructions(web_extract("Set/Kit")),
        AttributeSpec::new("HV Qualified", HV_QUALIFIED).with_web_instructions(web_extract("HV Qualified")),
    ]
}

/// TOML shape of one catalog entry
#[derive(Debug, Serialize, Deserialize)]
struct AttributeEntry {
    name: String,
    instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    web_instructions: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(rename = "attribute", default)]
    attributes: Vec<AttributeEntry>,
}

/// Ordered, name-unique set of attributes
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeCatalog {
    attributes: Vec<AttributeSpec>,
}

impl AttributeCatalog {
    /// Build a catalog, rejecting blank or duplicate names
    pub fn new(attributes: Vec<AttributeSpec>) -> Result<Self, ExtractorError> {
        let mut seen = HashSet::new();
        for spec in &attributes {
            if spec.name.trim().is_empty() {
                return Err(ExtractorError::Config("attribute name must not be empty".to_string()));
            }
            if !seen.insert(spec.name.to_lowercase()) {
                return Err(ExtractorError::Config(format!(
                    "duplicate attribute: {}",
                    spec.name
                )));
            }
        }
        Ok(Self { attributes })
    }

    /// Load a catalog from `[[attribute]]` tables
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetwise_extractor::AttributeCatalog;
    ///
    /// let catalog = AttributeCatalog::from_toml(r#"
    ///     [[attribute]]
    ///     name = "Gender"
    ///     instructions = "Male or Female."
    /// "#).unwrap();
    /// assert_eq!(catalog.len(), 1);
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        let file: CatalogFile = toml::from_str(toml_str)
            .map_err(|e| ExtractorError::Config(format!("Failed to parse catalog: {}", e)))?;
        let attributes = file
            .attributes
            .into_iter()
            .map(|entry| AttributeSpec {
                name: entry.name,
                instructions: entry.instructions,
                web_instructions: entry.web_instructions,
            })
            .collect();
        Self::new(attributes)
    }

    /// Serialize to the same TOML layout `from_toml` reads
    pub fn to_toml(&self) -> Result<String, ExtractorError> {
        let file = CatalogFile {
            attributes: self
                .attributes
                .iter()
                .map(|spec| AttributeEntry {
                    name: spec.name.clone(),
                    instructions: spec.instructions.clone(),
                    web_instructions: spec.web_instructions.clone(),
                })
                .collect(),
        };
        toml::to_string_pretty(&file)
            .map_err(|e| ExtractorError::Config(format!("Failed to serialize catalog: {}", e)))
    }

    /// Attributes in display order
    pub fn iter(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.iter()
    }

    /// Look up an attribute by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when the catalog has no attributes
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Resolve a name filter against the catalog
    ///
    /// `None` selects everything. The result is always in catalog order,
    /// whatever order the filter lists names in.
    pub fn select(&self, filter: Option<&[String]>) -> Result<Vec<&AttributeSpec>, ExtractorError> {
        let Some(names) = filter else {
            return Ok(self.attributes.iter().collect());
        };

        for name in names {
            if self.get(name).is_none() {
                return Err(ExtractorError::UnknownAttribute(name.clone()));
            }
        }

        Ok(self
            .attributes
            .iter()
            .filter(|spec| names.iter().any(|n| spec.name.eq_ignore_ascii_case(n.trim())))
            .collect())
    }
}

impl Default for AttributeCatalog {
    fn default() -> Self {
        Self {
            attributes: connector_attributes(),
        }
    }
}
