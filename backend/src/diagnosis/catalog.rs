use rand::Rng;
use shared::{Category, Severity};

/// One known condition with its recommended treatment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disease {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub category: Category,
    pub severity: Severity,
    pub treatment: &'static str,
    pub description: &'static str,
    pub base_confidence: f32,
}

pub const DISEASES: &[Disease] = &[
    Disease {
        name: "Healthy Plant",
        aliases: &["Healthy"],
        category: Category::Healthy,
        severity: Severity::Low,
        treatment: "Continue current care routine. Monitor regularly for any changes.",
        description: "Plant appears healthy with no visible signs of disease or stress.",
        base_confidence: 94.2,
    },
    Disease {
        name: "Early Blight (Alternaria solani)",
        aliases: &["Early Blight", "Tomato Early Blight", "Potato Early Blight"],
        category: Category::Fungal,
        severity: Severity::Medium,
        treatment: "Apply copper-based fungicide. Remove affected leaves. Improve air circulation.",
        description: "Fungal disease causing dark spots with concentric rings on leaves.",
        base_confidence: 87.5,
    },
    Disease {
        name: "Late Blight (Phytophthora infestans)",
        aliases: &["Late Blight", "Tomato Late Blight", "Potato Late Blight"],
        category: Category::Fungal,
        severity: Severity::High,
        treatment: "Apply systemic fungicide immediately. Remove all affected plant material. Ensure proper drainage.",
        description: "Serious fungal disease that can destroy entire plants quickly.",
        base_confidence: 91.3,
    },
    Disease {
        name: "Septoria Leaf Spot",
        aliases: &["Tomato Septoria Leaf Spot"],
        category: Category::Fungal,
        severity: Severity::Medium,
        treatment: "Remove infected leaves. Apply fungicide. Avoid overhead watering.",
        description: "Small circular spots with dark borders and grey centres on lower leaves.",
        base_confidence: 84.6,
    },
    Disease {
        name: "Yellow Leaf Curl Virus",
        aliases: &["Tomato Yellow Leaf Curl"],
        category: Category::Viral,
        severity: Severity::High,
        treatment: "Remove infected plants. Control whitefly population. Use insecticide if needed.",
        description: "Upward curling and yellowing of leaves with stunted growth.",
        base_confidence: 86.8,
    },
    Disease {
        name: "Common Rust",
        aliases: &["Corn Common Rust"],
        category: Category::Fungal,
        severity: Severity::Low,
        treatment: "Apply fungicide if severe. Remove infected leaves. Improve air circulation.",
        description: "Cinnamon-brown pustules scattered on both leaf surfaces.",
        base_confidence: 82.4,
    },
    Disease {
        name: "Northern Leaf Blight",
        aliases: &["Corn Northern Leaf Blight"],
        category: Category::Fungal,
        severity: Severity::Medium,
        treatment: "Apply fungicide. Remove infected leaves. Plant resistant varieties.",
        description: "Long cigar-shaped grey-green lesions on leaves.",
        base_confidence: 85.7,
    },
    Disease {
        name: "Nitrogen Deficiency",
        aliases: &[],
        category: Category::Nutrient,
        severity: Severity::Medium,
        treatment: "Apply nitrogen-rich fertilizer (10-5-5 NPK ratio). Monitor soil pH.",
        description: "Yellowing of older leaves starting from leaf tips and edges.",
        base_confidence: 83.7,
    },
    Disease {
        name: "Potassium Deficiency",
        aliases: &[],
        category: Category::Nutrient,
        severity: Severity::Medium,
        treatment: "Apply potassium sulfate fertilizer. Ensure proper soil drainage.",
        description: "Brown scorching along leaf edges, often with yellowing.",
        base_confidence: 79.4,
    },
    Disease {
        name: "Powdery Mildew",
        aliases: &[],
        category: Category::Fungal,
        severity: Severity::Medium,
        treatment: "Apply neem oil or sulfur-based fungicide. Reduce humidity around plants.",
        description: "White powdery coating on leaves and stems.",
        base_confidence: 88.9,
    },
    Disease {
        name: "Bacterial Spot",
        aliases: &[],
        category: Category::Bacterial,
        severity: Severity::High,
        treatment: "Apply copper bactericide. Remove affected leaves. Avoid overhead watering.",
        description: "Small dark spots with yellow halos on leaves.",
        base_confidence: 85.1,
    },
    Disease {
        name: "Mosaic Virus",
        aliases: &[],
        category: Category::Viral,
        severity: Severity::High,
        treatment: "Remove infected plants immediately. Control aphid vectors. Use resistant varieties.",
        description: "Mottled yellow and green patterns on leaves with stunted growth.",
        base_confidence: 92.6,
    },
];

/// Treatment advice for a condition the catalog does not know.
pub const GENERIC_TREATMENT: &str = "Monitor plant closely. If symptoms persist, consult a local agricultural expert. \
Consider applying general fungicide if fungal infection is suspected.";

fn names_match(candidate: &str, query: &str) -> bool {
    let candidate = candidate.to_lowercase();
    candidate.contains(query) || query.contains(&candidate)
}

/// Finds the catalog entry whose name or alias contains, or is contained in, `name`.
pub fn lookup(name: &str) -> Option<&'static Disease> {
    let query = name.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    DISEASES.iter().find(|disease| {
        names_match(disease.name, &query) || disease.aliases.iter().any(|alias| names_match(alias, &query))
    })
}

/// Which keywords a symptom description must contain for a rule to fire.
#[derive(Debug, Clone, Copy)]
enum Keywords {
    All(&'static [&'static str]),
    Any(&'static [&'static str]),
}

impl Keywords {
    fn matches(self, text: &str) -> bool {
        match self {
            Keywords::All(words) => words.iter().all(|w| text.contains(w)),
            Keywords::Any(words) => words.iter().any(|w| text.contains(w)),
        }
    }
}

/// Checked in order; the first rule whose keywords match wins.
const SYMPTOM_RULES: &[(Keywords, Disease)] = &[
    (
        Keywords::All(&["yellow", "spot"]),
        Disease {
            name: "Possible Leaf Spot Disease",
            aliases: &[],
            category: Category::Fungal,
            severity: Severity::Medium,
            treatment: "Apply fungicide spray. Improve air circulation. Remove affected leaves.",
            description: "Fungal infection causing yellow spots on leaf surfaces.",
            base_confidence: 85.0,
        },
    ),
    (
        Keywords::Any(&["wilt", "droop"]),
        Disease {
            name: "Water Stress or Root Issues",
            aliases: &[],
            category: Category::Environmental,
            severity: Severity::High,
            treatment: "Check soil moisture and drainage. Inspect roots for rot. Adjust watering schedule.",
            description: "Plant showing signs of water stress or root system problems.",
            base_confidence: 78.0,
        },
    ),
    (
        Keywords::All(&["brown", "edge"]),
        Disease {
            name: "Nutrient Deficiency (Potassium)",
            aliases: &[],
            category: Category::Nutrient,
            severity: Severity::Low,
            treatment: "Apply potassium-rich fertilizer. Monitor soil pH levels.",
            description: "Potassium deficiency causing brown leaf edges.",
            base_confidence: 82.0,
        },
    ),
    (
        Keywords::Any(&["curl", "twist"]),
        Disease {
            name: "Possible Viral Infection",
            aliases: &[],
            category: Category::Viral,
            severity: Severity::High,
            treatment: "Isolate affected plants. Remove infected material. Monitor for spread.",
            description: "Viral infection causing leaf deformation.",
            base_confidence: 73.0,
        },
    ),
];

static GENERAL_STRESS: Disease = Disease {
    name: "General Plant Stress",
    aliases: &[],
    category: Category::Environmental,
    severity: Severity::Low,
    treatment: "Monitor environmental conditions. Ensure proper watering and nutrition.",
    description: "Plant showing general signs of stress.",
    base_confidence: 65.0,
};

/// Offline diagnosis of a symptom description by keyword, case-insensitive.
/// Unmatched descriptions get `General Plant Stress`.
pub fn match_symptoms(symptoms: &str) -> &'static Disease {
    let text = symptoms.to_lowercase();
    SYMPTOM_RULES
        .iter()
        .find(|(keywords, _)| keywords.matches(&text))
        .map(|(_, disease)| disease)
        .unwrap_or(&GENERAL_STRESS)
}

/// Picks a random catalog entry and jitters its confidence the way the CNN stub always has:
/// ±5 points, clamped to [75, 95], one decimal.
pub fn simulate_cnn_analysis<R: Rng + ?Sized>(rng: &mut R) -> (&'static Disease, f32) {
    let disease = &DISEASES[rng.random_range(0..DISEASES.len())];
    let jitter = (rng.random::<f32>() - 0.5) * 10.0;
    let confidence = (disease.base_confidence + jitter).clamp(75.0, 95.0);
    (disease, (confidence * 10.0).round() / 10.0)
}
