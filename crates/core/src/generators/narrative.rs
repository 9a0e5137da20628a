use std::collections::BTreeMap;

use tera::{Context, Tera};

use crate::errors::GenerationError;
use crate::sampling::PhaseRng;

pub const INTAKE_SUMMARY: &str = "intake_summary";
pub const INTAKE_NARRATIVE: &str = "intake_narrative";
pub const CORROBORATING_NARRATIVE: &str = "corroborating_narrative";
pub const CASE_TITLE: &str = "case_title";
pub const CASE_SUMMARY: &str = "case_summary";
pub const FINDINGS_SUBSTANTIATED: &str = "findings_substantiated";
pub const FINDINGS_UNSUBSTANTIATED: &str = "findings_unsubstantiated";
pub const FINDINGS_INCONCLUSIVE: &str = "findings_inconclusive";
pub const FINDINGS_IN_PROGRESS: &str = "findings_in_progress";
pub const ROOT_CAUSE: &str = "root_cause";
pub const LESSONS_LEARNED: &str = "lessons_learned";
pub const AI_EXCHANGE: &str = "ai_exchange";

const BUILTIN_TEMPLATES: &[(&str, &[&str])] = &[
    (
        INTAKE_SUMMARY,
        &[
            "{{ category }} reported at {{ location }}",
            "{{ channel_label }} report of {{ category | lower }} in {{ city }}",
            "Concern raised about {{ category | lower }} ({{ root_category }})",
        ],
    ),
    (
        INTAKE_NARRATIVE,
        &[
            "{{ reporter }} described {{ category | lower }} at the {{ location }} site. \
             The reporter believes the conduct has continued for several weeks and asked that \
             {{ root_category | lower }} be reviewed.",
            "Via {{ channel_label | lower }}, {{ reporter }} reported {{ category | lower }} \
             within the {{ city }} office and named the team involved. Supporting detail was \
             offered on request.",
            "{{ reporter }} raised {{ category | lower }} concerns. The events took place in \
             {{ city }} and the reporter is unsure whether management is aware.",
        ],
    ),
    (
        CORROBORATING_NARRATIVE,
        &[
            "{{ reporter }} independently describes the same {{ category | lower }} incident \
             in {{ city }} and adds that colleagues witnessed it.",
            "A further account from {{ reporter }} corroborates an earlier report of \
             {{ category | lower }} at {{ location }}.",
        ],
    ),
    (
        CASE_TITLE,
        &[
            "{{ category }} - {{ city }}",
            "{{ root_category }}: {{ category | lower }} ({{ city }})",
        ],
    ),
    (
        CASE_SUMMARY,
        &[
            "Case opened from {{ intake_reference }} covering {{ category | lower }} at \
             {{ location }}.{% if linked > 1 %} {{ linked }} intake records consolidated.{% endif %}",
            "{{ root_category }} matter triaged as {{ priority | lower }} priority.\
             {% if linked > 1 %} Includes {{ linked }} related reports.{% endif %}",
        ],
    ),
    (
        FINDINGS_SUBSTANTIATED,
        &[
            "Evidence supports the allegation of {{ category | lower }}; corrective action \
             recommended.",
            "Interviews and documents substantiate {{ category | lower }} by the subject.",
        ],
    ),
    (
        FINDINGS_UNSUBSTANTIATED,
        &[
            "No evidence found to support the reported {{ category | lower }}.",
            "Review of records contradicts the account; allegation not substantiated.",
        ],
    ),
    (
        FINDINGS_INCONCLUSIVE,
        &[
            "Available evidence neither confirms nor refutes the {{ category | lower }} \
             allegation.",
            "Witnesses unavailable; matter closed as inconclusive.",
        ],
    ),
    (
        FINDINGS_IN_PROGRESS,
        &[
            "Evidence collection under way for {{ category | lower }}.",
            "Interviews scheduled; preliminary review of {{ category | lower }} ongoing.",
        ],
    ),
    (
        ROOT_CAUSE,
        &[
            "Control gap in {{ root_category | lower }} oversight",
            "Inadequate manager training on {{ category | lower }}",
            "Approval workflow allowed a single person to act unchecked",
        ],
    ),
    (
        LESSONS_LEARNED,
        &[
            "Refresh {{ root_category | lower }} training for affected teams",
            "Add a secondary review step for similar transactions",
            "Communicate reporting channels again after the outcome",
        ],
    ),
    (
        AI_EXCHANGE,
        &[
            "Summary for {{ case_reference }}: {{ category }} matter at {{ priority | lower }} \
             priority; status {{ status | lower }}.",
            "{{ case_reference }} concerns {{ category | lower }}. Suggested next step: \
             {% if status == \"CLOSED\" %}confirm remediation{% else %}schedule interviews{% endif %}.",
        ],
    ),
];

/// Registered text templates, each with several phrasing variants picked by the caller's
/// stream.
#[derive(Debug)]
pub struct NarrativeLibrary {
    tera: Tera,
    variants: BTreeMap<&'static str, usize>,
}

impl NarrativeLibrary {
    pub fn builtin() -> Result<Self, GenerationError> {
        let mut tera = Tera::default();
        let mut variants = BTreeMap::new();
        for (kind, bodies) in BUILTIN_TEMPLATES {
            for (variant, body) in bodies.iter().enumerate() {
                tera.add_raw_template(&format!("{kind}.{variant}"), body)
                    .map_err(|error| GenerationError::Template(format!("{kind}.{variant}: {error}")))?;
            }
            variants.insert(*kind, bodies.len());
        }
        Ok(Self { tera, variants })
    }

    pub fn variant_count(&self, kind: &str) -> usize {
        self.variants.get(kind).copied().unwrap_or(0)
    }

    /// Picks a variant of `kind` with one draw from `rng` and renders it.
    pub fn render(
        &self,
        kind: &str,
        rng: &mut PhaseRng,
        context: &Context,
    ) -> Result<String, GenerationError> {
        let count = self.variant_count(kind);
        if count == 0 {
            return Err(GenerationError::Template(format!("unknown narrative template `{kind}`")));
        }
        let variant = rng.index(count);
        self.tera
            .render(&format!("{kind}.{variant}"), context)
            .map_err(|error| GenerationError::Template(format!("{kind}.{variant}: {error}")))
    }
}
